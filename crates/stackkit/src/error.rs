//! Error types for stack operations.
//!
//! Errors are categorized so callers can tell a failed query apart from a
//! failed stack operation, and give the user appropriate feedback.

use crate::types::{StackOperation, StackStatus};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Categories of stack errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A describe/get-template style query failed
    Query,
    /// The stack does not exist
    NotFound,
    /// The stack already exists or has nothing to update
    Conflict,
    /// A create/update/delete reached a failed terminal state
    Operation,
    /// A wait did not reach a terminal state in time
    Timeout,
    /// The `aws` CLI is not installed
    ToolNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Query => "Stack query failed",
            Self::NotFound => "Stack not found",
            Self::Conflict => "Stack conflict",
            Self::Operation => "Stack operation failed",
            Self::Timeout => "Timed out waiting for stack",
            Self::ToolNotFound => "AWS CLI not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Query => "Check your AWS credentials, region and network connectivity",
            Self::NotFound => "Verify the stack name and region",
            Self::Conflict => "Inspect the existing stack before re-running",
            Self::Operation => "Inspect the stack events in the CloudFormation console",
            Self::Timeout => "Increase --timeout or check the stack events for a stuck resource",
            Self::ToolNotFound => "Install the AWS CLI from https://aws.amazon.com/cli/",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while managing stacks.
#[derive(Debug, Error)]
pub enum Error {
    /// The named stack does not exist
    #[error("stack does not exist: {stack}")]
    StackNotFound {
        /// Name of the missing stack
        stack: String,
    },

    /// A stack with this name already exists
    #[error("stack already exists: {stack}")]
    AlreadyExists {
        /// Name of the existing stack
        stack: String,
    },

    /// The update would not change anything
    #[error("no updates are to be performed on {stack}")]
    NoUpdates {
        /// Name of the unchanged stack
        stack: String,
    },

    /// A stack operation finished in a non-success terminal state
    #[error("{stack} - {operation} failed with status {status}{}", reason_suffix(.reason))]
    OperationFailed {
        /// Name of the stack
        stack: String,
        /// Operation that was being waited on
        operation: StackOperation,
        /// Terminal status the stack ended up in
        status: StackStatus,
        /// Status reason reported by the remote system
        reason: Option<String>,
    },

    /// The stack stayed in progress past the configured timeout
    #[error("{stack} - timed out after {}s waiting for {operation} to complete", .waited.as_secs())]
    WaitTimeout {
        /// Name of the stack
        stack: String,
        /// Operation that was being waited on
        operation: StackOperation,
        /// How long we waited
        waited: Duration,
    },

    /// The `aws` executable could not be located
    #[error("AWS CLI not found. Install it from https://aws.amazon.com/cli/")]
    AwsCliNotFound,

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// The `aws` process could not be spawned
    #[error("failed to execute aws: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::StackNotFound { .. } => ErrorCategory::NotFound,
            Error::AlreadyExists { .. } | Error::NoUpdates { .. } => ErrorCategory::Conflict,
            Error::OperationFailed { .. } => ErrorCategory::Operation,
            Error::WaitTimeout { .. } => ErrorCategory::Timeout,
            Error::AwsCliNotFound => ErrorCategory::ToolNotFound,
            Error::CommandFailed { .. } | Error::Json(_) => ErrorCategory::Query,
            Error::Io(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error means the stack is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::StackNotFound { .. })
    }

    /// Create an error from `aws cloudformation` stderr.
    pub fn from_aws_output(stderr: &str, stack: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();

        // Other ValidationErrors also say "does not exist" (missing exports,
        // unknown parameters); only the stack lookup means absent
        if stderr_lower.contains("stack with id") && stderr_lower.contains("does not exist") {
            return Error::StackNotFound {
                stack: stack.to_string(),
            };
        }

        if stderr_lower.contains("alreadyexistsexception") || stderr_lower.contains("already exists")
        {
            return Error::AlreadyExists {
                stack: stack.to_string(),
            };
        }

        if stderr_lower.contains("no updates are to be performed") {
            return Error::NoUpdates {
                stack: stack.to_string(),
            };
        }

        Error::CommandFailed {
            message: format!("aws cloudformation failed for {stack}"),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for stack operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_aws_output_not_found() {
        let err = Error::from_aws_output(
            "An error occurred (ValidationError) when calling the DescribeStacks operation: Stack with id cassandra-network does not exist",
            "cassandra-network",
        );
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_from_aws_output_unrelated_does_not_exist() {
        let err = Error::from_aws_output(
            "An error occurred (ValidationError) when calling the CreateStack operation: No export named cassandra-network-SubnetPublicA found. Parameter 'VpcId' does not exist",
            "cassandra-deployment-instance-a1",
        );
        assert!(!err.is_not_found());
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn test_io_error_category() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(err.to_string().starts_with("failed to execute aws"));
    }

    #[test]
    fn test_from_aws_output_already_exists() {
        let err = Error::from_aws_output(
            "An error occurred (AlreadyExistsException) when calling the CreateStack operation: Stack [cassandra-network] already exists",
            "cassandra-network",
        );
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_from_aws_output_no_updates() {
        let err = Error::from_aws_output(
            "An error occurred (ValidationError) when calling the UpdateStack operation: No updates are to be performed.",
            "cassandra-network",
        );
        assert!(matches!(err, Error::NoUpdates { .. }));
    }

    #[test]
    fn test_from_aws_output_other() {
        let err = Error::from_aws_output("Unable to locate credentials", "cassandra-network");
        assert_eq!(err.category(), ErrorCategory::Query);
        assert!(err.to_string().contains("cassandra-network"));
    }

    #[test]
    fn test_operation_failed_message() {
        let err = Error::OperationFailed {
            stack: "cassandra-network".to_string(),
            operation: StackOperation::Create,
            status: StackStatus::RollbackComplete,
            reason: Some("The following resource(s) failed to create: [Vpc]".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("cassandra-network - create failed with status ROLLBACK_COMPLETE"));
        assert!(msg.contains("[Vpc]"));
    }

    #[test]
    fn test_wait_timeout_message() {
        let err = Error::WaitTimeout {
            stack: "cassandra-network".to_string(),
            operation: StackOperation::Delete,
            waited: Duration::from_secs(90),
        };
        assert_eq!(
            err.to_string(),
            "cassandra-network - timed out after 90s waiting for delete to complete"
        );
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }
}
