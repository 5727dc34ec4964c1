//! Runtime lifecycle for the binary.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

/// How long blocking-pool work may delay exit once the relay has finished.
///
/// `tokio::io::stdin()` reads on a blocking thread that cannot be cancelled,
/// so without a bound an idle stdin would keep the process alive.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Run `future` on a new multi-threaded runtime, then shut the runtime down
/// without waiting longer than `grace` for blocking tasks.
pub fn block_on<F, T>(future: F, grace: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let rt = Runtime::new().context("Failed to start the async runtime")?;
    let result = rt.block_on(future);
    rt.shutdown_timeout(grace);
    result
}
