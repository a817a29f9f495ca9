use crate::error::{DevinfraError, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// One undo step recorded after a side effect that must be reversed if the
/// surrounding operation is abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Recursively delete a directory this operation created.
    RemoveDir(PathBuf),
    /// Delete the contents of a pre-existing directory, keeping the directory.
    ClearDir(PathBuf),
    RemoveFile(PathBuf),
    /// Revoke the certificates and routing descriptors issued for a project.
    RevokeCerts(String),
    /// Drop a project from the persisted registry.
    Unregister(String),
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compensation::RemoveDir(p) => write!(f, "remove directory {}", p.display()),
            Compensation::ClearDir(p) => write!(f, "clear directory {}", p.display()),
            Compensation::RemoveFile(p) => write!(f, "remove file {}", p.display()),
            Compensation::RevokeCerts(name) => write!(f, "revoke certificates for {name}"),
            Compensation::Unregister(name) => write!(f, "unregister {name}"),
        }
    }
}

/// Ordered compensations for a single create/import.
///
/// Steps are appended as side effects succeed. On failure the caller hands
/// the ledger to [`Ledger::unwind`], which applies them newest first; on
/// success [`Ledger::disarm`] drops them unapplied. Dropping a ledger runs
/// nothing.
#[derive(Debug, Default)]
pub struct Ledger {
    steps: Vec<Compensation>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Compensation) {
        debug!(%step, "rollback step recorded");
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Compensation] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn disarm(self) {
        debug!(steps = self.steps.len(), "rollback disarmed");
    }

    /// Apply every step in reverse order. A failing step is logged and
    /// skipped; the rest still run. Returns the failures.
    pub fn unwind<F>(self, mut apply: F) -> Vec<(Compensation, DevinfraError)>
    where
        F: FnMut(&Compensation) -> Result<()>,
    {
        let mut failures = Vec::new();
        for step in self.steps.into_iter().rev() {
            debug!(%step, "rolling back");
            if let Err(e) = apply(&step) {
                warn!(%step, error = %e, "rollback step failed");
                failures.push((step, e));
            }
        }
        failures
    }
}
