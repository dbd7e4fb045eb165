//! # Migration Rollback
//!
//! Reverses applied migrations back to a target version using the
//! down-scripts directory, then prunes the registry.
//!
//! Down-scripts run newest first, each in its own transaction. The
//! registry is only touched after every down-script has committed; a
//! failure part-way leaves the ledger as it was and reports which
//! versions were already reversed.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::errors::{MigrationError, MigrationResult};
use super::registry::MigrationRegistry;
use super::scanner::MigrationScanner;
use super::version::{VersionId, VersionManager};
use super::MigrationFile;
use crate::config::MigrateConfig;
use crate::db::{rollback_quietly, Connection};

/// Where a rollback currently is
///
/// `Idle -> Scanning -> Reversing -> CleaningRegistry -> Done`. A failure
/// while reversing or cleaning the registry ends in `Failed`, as does a
/// down-scripts directory that cannot be read. An unparseable target is
/// rejected before leaving `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackPhase {
    Idle,
    Scanning,
    Reversing,
    CleaningRegistry,
    Done,
    Failed,
}

impl fmt::Display for RollbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RollbackPhase::Idle => "idle",
            RollbackPhase::Scanning => "scanning",
            RollbackPhase::Reversing => "reversing",
            RollbackPhase::CleaningRegistry => "cleaning_registry",
            RollbackPhase::Done => "done",
            RollbackPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed rollback
#[derive(Debug)]
pub struct RollbackReport {
    pub target: VersionId,
    /// Versions whose down-scripts ran, in execution order
    pub reversed: Vec<VersionId>,
    /// Ledger rows deleted
    pub removed_from_registry: usize,
}

/// Rolls the schema back to a target version
pub struct MigrationRollback {
    scanner: MigrationScanner,
    registry: MigrationRegistry,
    version_manager: VersionManager,
    phase: RollbackPhase,
}

impl MigrationRollback {
    /// Create a rollback over the down-scripts in `down_dir`
    pub fn new(down_dir: impl Into<PathBuf>, registry: MigrationRegistry) -> Self {
        Self {
            scanner: MigrationScanner::new(down_dir),
            registry,
            version_manager: VersionManager::new(),
            phase: RollbackPhase::Idle,
        }
    }

    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::new(config.down_dir(), MigrationRegistry::from_config(config))
    }

    pub fn phase(&self) -> RollbackPhase {
        self.phase
    }

    fn enter(&mut self, phase: RollbackPhase) {
        debug!(from = %self.phase, to = %phase, "Rollback phase change");
        self.phase = phase;
    }

    /// Roll back every migration newer than `target`.
    ///
    /// `target` may be a migration filename, `V<number>` or a bare number.
    /// The target itself stays applied.
    pub fn rollback(&mut self, target: &str) -> MigrationResult<RollbackReport> {
        let target = self.version_manager.parse_target(target)?;

        self.enter(RollbackPhase::Scanning);

        let mut scripts: Vec<MigrationFile> = match self.scanner.discover_migrations() {
            Ok(files) => files.into_iter().filter(|m| m.version > target).collect(),
            Err(e) => return Err(self.fail(e)),
        };
        scripts.reverse();

        info!(to = %target, count = scripts.len(), "Rolling back migrations");

        self.enter(RollbackPhase::Reversing);
        let reversed = if scripts.is_empty() {
            Vec::new()
        } else {
            let mut conn = match self.registry.get_connection() {
                Ok(conn) => conn,
                Err(e) => return Err(self.fail(e)),
            };
            let mut reversed = Vec::with_capacity(scripts.len());
            for script in &scripts {
                if let Err(e) = reverse(conn.as_mut(), script) {
                    if !reversed.is_empty() {
                        let done: Vec<String> = reversed.iter().map(ToString::to_string).collect();
                        warn!(reversed = ?done, "Rollback stopped part-way, registry left unchanged");
                    }
                    return Err(self.fail(e));
                }
                reversed.push(script.version.clone());
            }
            reversed
        };

        self.enter(RollbackPhase::CleaningRegistry);
        let removed = match self.registry.remove_migrations_after(&target) {
            Ok(removed) => removed,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(RollbackPhase::Done);
        info!(to = %target, reversed = reversed.len(), removed, "Rollback complete");

        Ok(RollbackReport {
            target,
            reversed,
            removed_from_registry: removed,
        })
    }

    fn fail(&mut self, error: MigrationError) -> MigrationError {
        warn!(phase = %self.phase, error = %error, "Rollback failed");
        self.enter(RollbackPhase::Failed);
        error
    }
}

/// Run one down-script and commit it
fn reverse(conn: &mut dyn Connection, script: &MigrationFile) -> MigrationResult<()> {
    let sql = script.read_sql()?;

    if let Err(source) = conn.execute_batch(&sql).and_then(|_| conn.commit()) {
        rollback_quietly(conn);
        return Err(MigrationError::RollbackExecutionError {
            version: script.version.clone(),
            source,
        });
    }

    info!(version = %script.version, file = %script.filename, "Reversed migration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::runner::MigrationRunner;
    use crate::migrations::test_support::Workspace;

    /// Three forward migrations where each later one depends on the earlier
    fn setup() -> Workspace {
        let ws = Workspace::new();
        ws.write_up("V1__create_users.sql", "CREATE TABLE users (id INTEGER PRIMARY KEY);");
        ws.write_up(
            "V2__create_orders.sql",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id));",
        );
        ws.write_up(
            "V3__create_order_log.sql",
            "CREATE TABLE order_log (order_id INTEGER);
             CREATE TRIGGER order_audit AFTER INSERT ON orders
             BEGIN INSERT INTO order_log VALUES (NEW.id); END;",
        );

        ws.write_down("V1__create_users.sql", "DROP TABLE users;");
        ws.write_down("V2__create_orders.sql", "DROP TABLE orders;");
        // Fails if V2 already dropped orders along with its trigger
        ws.write_down(
            "V3__create_order_log.sql",
            "DROP TRIGGER order_audit; DROP TABLE order_log;",
        );

        MigrationRunner::new(ws.migrations_dir.clone(), ws.registry())
            .run_migrations()
            .unwrap();
        ws
    }

    fn applied(registry: &MigrationRegistry) -> Vec<String> {
        registry
            .get_applied_migrations()
            .unwrap()
            .keys()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn test_rollback_to_target() {
        let ws = setup();
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());
        assert_eq!(rollback.phase(), RollbackPhase::Idle);

        let report = rollback.rollback("V1").unwrap();

        let reversed: Vec<String> = report.reversed.iter().map(|v| v.to_string()).collect();
        assert_eq!(reversed, ["V3", "V2"]);
        assert_eq!(report.removed_from_registry, 2);
        assert_eq!(rollback.phase(), RollbackPhase::Done);

        assert_eq!(applied(&ws.registry()), ["V1"]);
        assert_eq!(ws.tables(), ["schema_migrations", "users"]);
    }

    #[test]
    fn test_rollback_accepts_filename_target() {
        let ws = setup();
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());

        let report = rollback.rollback("V2__create_orders.sql").unwrap();
        assert_eq!(report.target.to_string(), "V2");
        assert_eq!(report.reversed.len(), 1);
        assert_eq!(applied(&ws.registry()), ["V1", "V2"]);
    }

    #[test]
    fn test_rollback_descending_order_matters() {
        let ws = setup();
        // V3 now requires V2's table, so running V2 first would fail
        ws.write_down(
            "V3__create_order_log.sql",
            "DROP TRIGGER order_audit; DROP TABLE order_log; DELETE FROM orders;",
        );
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());

        rollback.rollback("1").unwrap();
        assert_eq!(ws.tables(), ["schema_migrations", "users"]);
    }

    #[test]
    fn test_rollback_failure_leaves_registry() {
        let ws = setup();
        ws.write_down("V2__create_orders.sql", "DROP TABLE no_such_table;");
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());

        match rollback.rollback("V1").unwrap_err() {
            MigrationError::RollbackExecutionError { version, .. } => {
                assert_eq!(version.to_string(), "V2")
            }
            other => panic!("expected RollbackExecutionError, got {:?}", other),
        }
        assert_eq!(rollback.phase(), RollbackPhase::Failed);

        // V3 was reversed and committed, the ledger was never pruned
        assert_eq!(applied(&ws.registry()), ["V1", "V2", "V3"]);
        assert_eq!(ws.tables(), ["orders", "schema_migrations", "users"]);
    }

    #[test]
    fn test_rollback_nothing_newer() {
        let ws = setup();
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());

        let report = rollback.rollback("V3").unwrap();
        assert!(report.reversed.is_empty());
        assert_eq!(report.removed_from_registry, 0);
        assert_eq!(applied(&ws.registry()), ["V1", "V2", "V3"]);
    }

    #[test]
    fn test_rollback_invalid_target() {
        let ws = setup();
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());

        let err = rollback.rollback("latest").unwrap_err();
        assert!(matches!(err, MigrationError::InvalidFormat { .. }));
        assert_eq!(rollback.phase(), RollbackPhase::Idle);
    }

    #[test]
    fn test_rollback_registry_cleanup_failure() {
        let ws = setup();
        // Reverses fine but leaves nothing for the registry to prune
        ws.write_down(
            "V3__create_order_log.sql",
            "DROP TRIGGER order_audit; DROP TABLE order_log; DROP TABLE schema_migrations;",
        );
        let mut rollback = MigrationRollback::new(ws.down_dir.clone(), ws.registry());

        let err = rollback.rollback("V2").unwrap_err();
        assert!(matches!(err, MigrationError::RegistryCleanupError { .. }));
        assert_eq!(err.code(), "REGISTRY_CLEANUP_ERROR");
        assert_eq!(rollback.phase(), RollbackPhase::Failed);
        assert_eq!(ws.tables(), ["orders", "users"]);
    }
}
