//! Blocking waits for stack operations to reach a terminal state.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{StackDescription, StackOperation, StackStatus, WaitConfig};
use std::thread;
use std::time::{Duration, Instant};

/// Callback trait for wait progress notifications.
pub trait WaitCallback {
    /// Called after each poll that found the operation still running.
    ///
    /// # Arguments
    /// * `stack` - Stack being waited on
    /// * `status` - Status reported by the last poll
    /// * `elapsed` - Time spent waiting so far
    fn on_poll(&self, stack: &str, status: &StackStatus, elapsed: Duration);
}

/// Callback that logs each poll at debug level.
pub struct LogCallback;

impl WaitCallback for LogCallback {
    fn on_poll(&self, stack: &str, status: &StackStatus, elapsed: Duration) {
        log::debug!("{stack} - Still {status} after {}s.", elapsed.as_secs());
    }
}

/// Block until `operation` on `name` reaches a terminal state.
///
/// Returns the final description on success. A terminal status other than
/// the operation's success status becomes [`Error::OperationFailed`]. For
/// deletes, the stack disappearing counts as success. Query errors while
/// polling are returned as-is.
pub fn wait_for(
    backend: &dyn Backend,
    name: &str,
    operation: StackOperation,
    config: &WaitConfig,
    callback: Option<&dyn WaitCallback>,
) -> Result<StackDescription> {
    let started = Instant::now();
    let success = operation.success_status();

    loop {
        let desc = match backend.describe_stack(name) {
            Ok(desc) => desc,
            Err(e) if e.is_not_found() && operation == StackOperation::Delete => {
                return Ok(StackDescription {
                    name: name.to_string(),
                    status: success,
                    status_reason: None,
                });
            }
            Err(e) => return Err(e),
        };

        if desc.status == success {
            return Ok(desc);
        }

        if desc.status.is_terminal() {
            return Err(Error::OperationFailed {
                stack: name.to_string(),
                operation,
                status: desc.status,
                reason: desc.status_reason,
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= config.timeout {
            return Err(Error::WaitTimeout {
                stack: name.to_string(),
                operation,
                waited: elapsed,
            });
        }

        if let Some(cb) = callback {
            cb.on_poll(name, &desc.status, elapsed);
        }

        thread::sleep(config.poll_interval);
    }
}
