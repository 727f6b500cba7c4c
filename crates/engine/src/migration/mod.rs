//! Schema migration engine
//!
//! Runs inside the single version-change transaction opened by
//! [`DatabaseRegistry::open`](crate::database::DatabaseRegistry::open):
//!
//! ```text
//! stored == 0  -> initialize the current layout
//! stored  > 0  -> apply steps stored->stored+1 .. target-1->target, in order
//! ```
//!
//! Any step error propagates out of [`Migrator::run`], which makes the
//! registry abort the version-change transaction. Nothing a partial chain
//! did survives, and the stored version stays where it was.

mod steps;

pub use steps::{AddLifecycleState, AddSyncFlag, RebuildIndexes, RemoveNonCompositeAssets};

use assetcache_concurrency::{Cursor, Transaction};
use assetcache_core::{Direction, Error, ErrorCode, KeyRange, Result};
use serde_json::Value;

use crate::schema::{self, CURRENT_VERSION};

// ============================================================================
// Steps
// ============================================================================

/// One upgrade from `from_version()` to `to_version()`
pub trait MigrationStep: Send + Sync {
    /// Version this step upgrades from
    fn from_version(&self) -> u32;

    /// Version this step upgrades to
    fn to_version(&self) -> u32 {
        self.from_version() + 1
    }

    /// Short description used in logs
    fn name(&self) -> &str;

    /// Apply the step inside the version-change transaction
    fn apply(&self, txn: &mut Transaction<'_>) -> Result<()>;
}

/// The four upgrades of the asset schema, in order
pub fn standard_steps() -> Vec<Box<dyn MigrationStep>> {
    vec![
        Box::new(AddSyncFlag),
        Box::new(AddLifecycleState),
        Box::new(RebuildIndexes),
        Box::new(RemoveNonCompositeAssets),
    ]
}

// ============================================================================
// Driver
// ============================================================================

/// What a migration run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Stored version before the run
    pub from: u32,
    /// Version after the run
    pub to: u32,
    /// `true` if the database was created from scratch
    pub initialized: bool,
    /// Target version of every applied step, in application order
    pub applied: Vec<u32>,
}

/// Ordered chain of migration steps up to a target version
pub struct Migrator {
    steps: Vec<Box<dyn MigrationStep>>,
    target: u32,
}

impl Migrator {
    /// Standard steps up to `target`
    pub fn new(target: u32) -> Self {
        let steps = standard_steps()
            .into_iter()
            .filter(|step| step.to_version() <= target)
            .collect();
        Self { steps, target }
    }

    /// Custom steps; the chain must hold exactly `target - 1` steps
    pub fn with_steps(mut steps: Vec<Box<dyn MigrationStep>>, target: u32) -> Self {
        steps.sort_by_key(|step| step.from_version());
        Self { steps, target }
    }

    /// Version the chain ends at
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Step names in application order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Bring the database at `stored` up to the target version
    pub fn run(&self, txn: &mut Transaction<'_>, stored: u32) -> Result<MigrationReport> {
        let expected = self.target.saturating_sub(1) as usize;
        if self.steps.len() != expected {
            tracing::error!(
                steps = self.steps.len(),
                expected,
                target = self.target,
                "migration chain does not match target version"
            );
            return Err(Error::abort(
                ErrorCode::Unknown,
                format!(
                    "{} upgrade steps defined for target version {}, expected {}",
                    self.steps.len(),
                    self.target,
                    expected
                ),
            ));
        }

        let mut report = MigrationReport {
            from: stored,
            to: self.target,
            initialized: false,
            applied: Vec::new(),
        };

        if stored == 0 {
            tracing::info!(target_version = self.target, "initializing schema");
            initialize(txn)?;
            report.initialized = true;
            return Ok(report);
        }

        tracing::info!(from = stored, to = self.target, "migration started");
        for step in self
            .steps
            .iter()
            .filter(|step| step.from_version() >= stored && step.to_version() <= self.target)
        {
            tracing::info!(
                from = step.from_version(),
                to = step.to_version(),
                step = step.name(),
                "applying migration step"
            );
            step.apply(txn)?;
            report.applied.push(step.to_version());
        }
        tracing::info!(
            from = stored,
            to = self.target,
            applied = report.applied.len(),
            "migration finished"
        );
        Ok(report)
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new(CURRENT_VERSION)
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("target", &self.target)
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Create both tables with their current keys and indexes
pub fn initialize(txn: &mut Transaction<'_>) -> Result<()> {
    for (name, table) in schema::current_schemas() {
        schema::create_table(txn, &name, &table)?;
    }
    Ok(())
}

// ============================================================================
// Record helpers
// ============================================================================

/// Rewrite every record of `table` with `update`; returns how many were visited
pub fn update_properties_in_all_records<F>(
    txn: &mut Transaction<'_>,
    table: &str,
    mut update: F,
) -> Result<usize>
where
    F: FnMut(&mut serde_json::Map<String, Value>),
{
    let mut cursor = Cursor::open(txn, table, KeyRange::all(), Direction::Next)?;
    let mut visited = 0;
    while let Some(mut value) = cursor.advance(txn)? {
        let Some(fields) = value.as_object_mut() else {
            return Err(Error::Internal(format!(
                "record in {} is not an object",
                table
            )));
        };
        update(fields);
        cursor.update(txn, value)?;
        visited += 1;
    }
    tracing::debug!(table, visited, "updated all records");
    Ok(visited)
}

/// Delete every record of `table` matching `predicate`; returns the deleted records
pub fn remove_records<F>(
    txn: &mut Transaction<'_>,
    table: &str,
    mut predicate: F,
) -> Result<Vec<Value>>
where
    F: FnMut(&Value) -> bool,
{
    let mut cursor = Cursor::open(txn, table, KeyRange::all(), Direction::Next)?;
    let mut removed = Vec::new();
    while let Some(value) = cursor.advance(txn)? {
        if predicate(&value) {
            cursor.delete(txn)?;
            tracing::debug!(table, key = ?cursor.primary_key(), "removed record");
            removed.push(value);
        }
    }
    Ok(removed)
}
