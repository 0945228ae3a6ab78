//! # stackkit
//!
//! Stack lifecycle reconciliation over CloudFormation.
//!
//! This crate provides:
//! - A [`Backend`](backend::Backend) trait over the remote stack manager,
//!   with a real `aws` CLI implementation and an in-memory mock
//! - Blocking waits that poll until an operation reaches a terminal state
//! - Template digests for drift detection
//! - Reconciliation policies that decide between create, update, replace
//!   and no-op for a declared stack
//!
//! ## Example
//!
//! ```no_run
//! use stackkit::{Client, StackDefinition, UpdateInPlace, ReconcilePolicy};
//! use stackkit::backend::{AwsCliBackend, AwsOptions};
//!
//! let backend = AwsCliBackend::new(AwsOptions::default()).unwrap();
//! let client = Client::with_backend(Box::new(backend));
//!
//! let network = StackDefinition::new("cassandra-network", "Resources: {}")
//!     .with_parameter("AllowedIPAddress", "203.0.113.0/24");
//!
//! let action = UpdateInPlace::new(network).apply(&client).unwrap();
//! println!("network: {action}");
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod digest;
pub mod error;
pub mod reconcile;
pub mod types;
pub mod wait;

pub use error::{Error, ErrorCategory, Result};
pub use reconcile::{
    Action, BoxedPolicy, CreateOnly, PolicyKind, ReconcilePolicy, SetupTeardown, UpdateInPlace,
    UpdateViaReplacement,
};
pub use types::{
    Parameter, StackDefinition, StackDescription, StackOperation, StackStatus, WaitConfig,
};

use backend::Backend;

/// How to treat query errors while checking whether a stack exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistenceCheck {
    /// Any error other than "not found" is logged and treated as absent
    #[default]
    FailOpen,
    /// Any error other than "not found" is returned to the caller
    FailClosed,
}

/// High-level client for stack operations.
///
/// Wraps a backend and adds blocking waits and per-phase logging. All
/// operations block until the remote side reaches a terminal state.
pub struct Client {
    backend: Box<dyn Backend>,
    wait: WaitConfig,
    existence: ExistenceCheck,
}

impl Client {
    /// Create a client with a custom backend and default settings.
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            wait: WaitConfig::default(),
            existence: ExistenceCheck::default(),
        }
    }

    /// Override polling behavior.
    pub fn wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Override existence check behavior.
    pub fn existence_check(mut self, existence: ExistenceCheck) -> Self {
        self.existence = existence;
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check whether a stack exists.
    ///
    /// Under [`ExistenceCheck::FailOpen`] this never returns an error: a
    /// failed query is logged as a warning and reported as absent. That can
    /// turn a transient network error into a create attempt against an
    /// existing stack, which then fails with "already exists".
    pub fn exists(&self, name: &str) -> Result<bool> {
        log::info!("{name} - Checking if stack exists.");
        match self.backend.describe_stack(name) {
            Ok(_) => {
                log::info!("{name} - Stack exists.");
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                log::info!("{name} - Stack does not exist.");
                Ok(false)
            }
            Err(e) => match self.existence {
                ExistenceCheck::FailOpen => {
                    log::warn!("{name} - Existence check failed ({e}); treating stack as absent.");
                    Ok(false)
                }
                ExistenceCheck::FailClosed => Err(e),
            },
        }
    }

    /// Get the current status of a stack.
    pub fn status(&self, name: &str) -> Result<StackStatus> {
        log::info!("{name} - Checking stack status.");
        Ok(self.backend.describe_stack(name)?.status)
    }

    /// Whether the stack can be updated in place (not in the failed set).
    pub fn is_updatable(&self, name: &str) -> Result<bool> {
        let status = self.status(name)?;
        if status.is_failed() {
            log::info!("{name} - Stack is {status} and requires replacement.");
            Ok(false)
        } else {
            log::info!("{name} - Stack can be updated.");
            Ok(true)
        }
    }

    /// Get the template body currently stored for a stack.
    pub fn template(&self, name: &str) -> Result<String> {
        log::info!("{name} - Getting template for stack.");
        let template = self.backend.get_template(name)?;
        log::info!("{name} - Template for stack retrieved.");
        Ok(template)
    }

    /// Whether the remote template differs from `local`.
    pub fn is_dirty(&self, name: &str, local: &str) -> Result<bool> {
        log::info!("{name} - Checking if template is dirty.");
        let remote = digest::digest(&self.template(name)?);
        log::info!("{name} - Remote template digest {remote}.");
        let local = digest::digest(local);
        log::info!("{name} - Local template digest {local}.");

        if remote == local {
            log::info!("{name} - Stack template is up to date.");
            Ok(false)
        } else {
            log::info!("{name} - Stack template is dirty.");
            Ok(true)
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Create a stack and wait for it to finish.
    pub fn create(&self, definition: &StackDefinition) -> Result<()> {
        let name = definition.name();
        log::info!("{name} - Creating stack.");
        self.backend.create_stack(definition)?;
        self.wait_until_done(name, StackOperation::Create)?;
        log::info!("{name} - Stack created.");
        Ok(())
    }

    /// Update a stack in place and wait for it to finish.
    pub fn update(&self, definition: &StackDefinition) -> Result<()> {
        let name = definition.name();
        log::info!("{name} - Updating stack.");
        self.backend.update_stack(definition)?;
        self.wait_until_done(name, StackOperation::Update)?;
        log::info!("{name} - Stack updated.");
        Ok(())
    }

    /// Delete a stack and wait for it to disappear.
    pub fn delete(&self, name: &str) -> Result<()> {
        log::info!("{name} - Deleting stack.");
        self.backend.delete_stack(name)?;
        self.wait_until_done(name, StackOperation::Delete)?;
        log::info!("{name} - Stack deleted.");
        Ok(())
    }

    /// Delete then recreate a stack.
    pub fn replace(&self, definition: &StackDefinition) -> Result<()> {
        let name = definition.name();
        log::info!("{name} - Replacing stack.");
        self.delete(name)?;
        self.create(definition)?;
        log::info!("{name} - Stack replaced.");
        Ok(())
    }

    fn wait_until_done(&self, name: &str, operation: StackOperation) -> Result<StackDescription> {
        log::info!("{name} - Waiting for stack {}...", operation.noun());
        wait::wait_for(
            self.backend.as_ref(),
            name,
            operation,
            &self.wait,
            Some(&wait::LogCallback),
        )
    }
}
