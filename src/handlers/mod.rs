pub mod auth;
pub mod health;
pub mod user;
pub mod video;

use tokio::task;

use crate::error::AppError;

/// Runs a synchronous service call off the async workers; the stores and
/// bcrypt both block.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::internal(format!("task join error: {err}")))?
}
