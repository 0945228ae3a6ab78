//! Backend abstraction for the remote stack manager.
//!
//! The [`Backend`] trait is the raw CloudFormation contract: issue an
//! operation or run a query, nothing more. Waiting, logging and
//! reconciliation decisions live above it in [`crate::Client`].
//!
//! # Testing
//!
//! Use [`MockBackend`] to exercise reconciliation without AWS access:
//!
//! ```
//! use stackkit::backend::{Backend, MockBackend};
//! use stackkit::StackStatus;
//!
//! let mock = MockBackend::new();
//! mock.add_stack("cassandra-network", StackStatus::CreateComplete, "Resources: {}");
//!
//! let desc = mock.describe_stack("cassandra-network").unwrap();
//! assert_eq!(desc.status, StackStatus::CreateComplete);
//! ```

pub mod aws_cli;
pub mod mock;

pub use aws_cli::{AwsCliBackend, AwsOptions};
pub use mock::{Call, MockBackend};

use crate::error::Result;
use crate::types::{StackDefinition, StackDescription};

/// Backend trait for stack operations.
///
/// Mutating calls only issue the request. They return as soon as the
/// remote system has accepted it; use [`crate::wait::wait_for`] to block
/// until a terminal state.
pub trait Backend: Send + Sync {
    /// Describe a stack by name.
    ///
    /// Returns `Error::StackNotFound` when no such stack exists.
    fn describe_stack(&self, name: &str) -> Result<StackDescription>;

    /// Start creating a stack.
    fn create_stack(&self, definition: &StackDefinition) -> Result<()>;

    /// Start updating a stack in place.
    fn update_stack(&self, definition: &StackDefinition) -> Result<()>;

    /// Start deleting a stack.
    fn delete_stack(&self, name: &str) -> Result<()>;

    /// Fetch the template body currently stored for a stack.
    fn get_template(&self, name: &str) -> Result<String>;
}

/// Get the default backend (real `aws` CLI).
pub fn default_backend(options: AwsOptions) -> Result<AwsCliBackend> {
    AwsCliBackend::new(options)
}
