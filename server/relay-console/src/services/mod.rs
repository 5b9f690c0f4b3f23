pub mod audit_trail;

pub use audit_trail::AuditTrail;

use std::future::Future;
use tracing::{error, Instrument};

use crate::error::{ApiError, ApiResult};

/// Run a mutation together with its audit append on a task of its own
///
/// The handler only awaits the task. When the handler future is dropped by
/// the request timeout or a closed connection, the task still finishes, so a
/// directory write that was applied always gets its audit entry.
pub async fn run_detached<F, T>(work: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(work.in_current_span()).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Mutation task did not complete");
            Err(ApiError::internal("The mutation did not complete"))
        }
    }
}
