//! Timeout wrapper for browser operations that can hang

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Run a page operation under a deadline
///
/// # Arguments
/// * `operation` - The async operation to run
/// * `timeout` - Upper bound on its runtime
/// * `operation_name` - Human-readable name for error messages
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err` - Either the operation failed or the deadline passed
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {} seconds",
            timeout.as_secs()
        )),
    }
}
