//! Backup boundary.
//!
//! Persisting intermediate artifacts is an external concern; the gateway
//! only fires backups after key steps and must never let a backup failure
//! touch a workflow's outcome. Backup calls run through the run's task bag,
//! so failures are logged during the final drain and go no further.

use anyhow::Result;
use crossport_common::CodeProject;

#[async_trait::async_trait]
pub trait BackupService: Send + Sync {
    async fn backup_project(
        &self,
        project: &CodeProject,
        trace_id: &str,
        workflow: &str,
        label: &str,
    ) -> Result<()>;

    async fn backup_candidates(
        &self,
        candidates: &[CodeProject],
        trace_id: &str,
        workflow: &str,
        label: &str,
    ) -> Result<()>;
}

/// Discards everything. Default for the CLI and for tests.
pub struct NoopBackup;

#[async_trait::async_trait]
impl BackupService for NoopBackup {
    async fn backup_project(
        &self,
        _project: &CodeProject,
        _trace_id: &str,
        _workflow: &str,
        _label: &str,
    ) -> Result<()> {
        Ok(())
    }

    async fn backup_candidates(
        &self,
        _candidates: &[CodeProject],
        _trace_id: &str,
        _workflow: &str,
        _label: &str,
    ) -> Result<()> {
        Ok(())
    }
}
