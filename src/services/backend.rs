use async_trait::async_trait;

use crate::models::Snapshot;
use crate::services::BackendError;

/// The OS process collaborator: one read-only snapshot call and one kill call.
#[async_trait]
pub trait ProcessBackend: Send + Sync {
    async fn get_processes(&self) -> Result<Snapshot, BackendError>;

    /// `Ok(false)` means termination was attempted and did not succeed.
    async fn kill_process(&self, pid: u32) -> Result<bool, BackendError>;
}
