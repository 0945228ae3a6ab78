//! Core types for stack management.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A single stack parameter.
///
/// Serializes to the `ParameterKey`/`ParameterValue` shape the
/// CloudFormation API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name as declared in the template
    #[serde(rename = "ParameterKey")]
    pub key: String,
    /// Parameter value
    #[serde(rename = "ParameterValue")]
    pub value: String,
}

impl Parameter {
    /// Create a new parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Local desired state of one stack: its name, template body and parameters.
///
/// The name is the join key against remote state. Values are never mutated
/// once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    name: String,
    template_body: String,
    parameters: Vec<Parameter>,
}

impl StackDefinition {
    /// Create a definition with no parameters.
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_body: template_body.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter, preserving declaration order.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(key, value));
        self
    }

    /// Stack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template document text, exactly as loaded.
    pub fn template_body(&self) -> &str {
        &self.template_body
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Look up a parameter value by key.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

/// Remote stack status as reported by CloudFormation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    RollbackInProgress,
    RollbackFailed,
    RollbackComplete,
    DeleteInProgress,
    DeleteFailed,
    DeleteComplete,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateFailed,
    UpdateRollbackInProgress,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
    UpdateRollbackComplete,
    ReviewInProgress,
    ImportInProgress,
    ImportComplete,
    ImportRollbackInProgress,
    ImportRollbackFailed,
    ImportRollbackComplete,
    /// A status this version does not know about
    Other(String),
}

impl StackStatus {
    /// Wire representation, e.g. `CREATE_COMPLETE`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateFailed => "CREATE_FAILED",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackCompleteCleanupInProgress => {
                "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            }
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::ReviewInProgress => "REVIEW_IN_PROGRESS",
            Self::ImportInProgress => "IMPORT_IN_PROGRESS",
            Self::ImportComplete => "IMPORT_COMPLETE",
            Self::ImportRollbackInProgress => "IMPORT_ROLLBACK_IN_PROGRESS",
            Self::ImportRollbackFailed => "IMPORT_ROLLBACK_FAILED",
            Self::ImportRollbackComplete => "IMPORT_ROLLBACK_COMPLETE",
            Self::Other(s) => s,
        }
    }

    /// Whether the stack is in the failed set and cannot be updated in place.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::DeleteFailed | Self::RollbackFailed | Self::UpdateRollbackFailed
        )
    }

    /// Whether an operation is still running.
    pub fn is_in_progress(&self) -> bool {
        self.as_str().ends_with("_IN_PROGRESS")
    }

    /// Whether the stack will stay in this status without new intervention.
    pub fn is_terminal(&self) -> bool {
        !self.is_in_progress()
    }
}

impl From<&str> for StackStatus {
    fn from(s: &str) -> Self {
        match s {
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_FAILED" => Self::CreateFailed,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "ROLLBACK_IN_PROGRESS" => Self::RollbackInProgress,
            "ROLLBACK_FAILED" => Self::RollbackFailed,
            "ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_FAILED" => Self::DeleteFailed,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "UPDATE_IN_PROGRESS" => Self::UpdateInProgress,
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => Self::UpdateCompleteCleanupInProgress,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_FAILED" => Self::UpdateFailed,
            "UPDATE_ROLLBACK_IN_PROGRESS" => Self::UpdateRollbackInProgress,
            "UPDATE_ROLLBACK_FAILED" => Self::UpdateRollbackFailed,
            "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Self::UpdateRollbackCompleteCleanupInProgress
            }
            "UPDATE_ROLLBACK_COMPLETE" => Self::UpdateRollbackComplete,
            "REVIEW_IN_PROGRESS" => Self::ReviewInProgress,
            "IMPORT_IN_PROGRESS" => Self::ImportInProgress,
            "IMPORT_COMPLETE" => Self::ImportComplete,
            "IMPORT_ROLLBACK_IN_PROGRESS" => Self::ImportRollbackInProgress,
            "IMPORT_ROLLBACK_FAILED" => Self::ImportRollbackFailed,
            "IMPORT_ROLLBACK_COMPLETE" => Self::ImportRollbackComplete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for StackStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote stack returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    pub name: String,
    pub status: StackStatus,
    pub status_reason: Option<String>,
}

/// A mutating operation that can be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackOperation {
    Create,
    Update,
    Delete,
}

impl StackOperation {
    /// The status that marks this operation as successfully finished.
    pub fn success_status(&self) -> StackStatus {
        match self {
            Self::Create => StackStatus::CreateComplete,
            Self::Update => StackStatus::UpdateComplete,
            Self::Delete => StackStatus::DeleteComplete,
        }
    }

    /// Noun used in progress messages ("Waiting for stack creation...").
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Create => "creation",
            Self::Update => "update",
            Self::Delete => "deletion",
        }
    }
}

impl fmt::Display for StackOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Polling behavior while waiting for an operation to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(60 * 60),
        }
    }
}

impl WaitConfig {
    /// Create a wait config with custom settings.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_known() {
        let status: StackStatus = "UPDATE_ROLLBACK_FAILED".parse().unwrap();
        assert_eq!(status, StackStatus::UpdateRollbackFailed);
        assert_eq!(status.to_string(), "UPDATE_ROLLBACK_FAILED");
    }

    #[test]
    fn test_status_unknown_preserved() {
        let status: StackStatus = "SOMETHING_NEW".parse().unwrap();
        assert_eq!(status, StackStatus::Other("SOMETHING_NEW".to_string()));
        assert_eq!(status.as_str(), "SOMETHING_NEW");
        assert!(status.is_terminal());
    }

    #[test]
    fn test_failed_set() {
        assert!(StackStatus::CreateFailed.is_failed());
        assert!(StackStatus::DeleteFailed.is_failed());
        assert!(StackStatus::RollbackFailed.is_failed());
        assert!(StackStatus::UpdateRollbackFailed.is_failed());

        assert!(!StackStatus::CreateComplete.is_failed());
        assert!(!StackStatus::UpdateComplete.is_failed());
        assert!(!StackStatus::RollbackComplete.is_failed());
        assert!(!StackStatus::UpdateFailed.is_failed());
    }

    #[test]
    fn test_in_progress() {
        assert!(StackStatus::CreateInProgress.is_in_progress());
        assert!(StackStatus::UpdateRollbackCompleteCleanupInProgress.is_in_progress());
        assert!(!StackStatus::CreateComplete.is_in_progress());
        assert!(StackStatus::DeleteFailed.is_terminal());
    }

    #[test]
    fn test_definition_parameters_keep_order() {
        let def = StackDefinition::new("stack", "body")
            .with_parameter("B", "2")
            .with_parameter("A", "1");

        let keys: Vec<_> = def.parameters().iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert_eq!(def.parameter("A"), Some("1"));
        assert_eq!(def.parameter("C"), None);
    }

    #[test]
    fn test_parameter_serializes_to_api_shape() {
        let json = serde_json::to_string(&Parameter::new("AllowedIPAddress", "10.0.0.0/8")).unwrap();
        assert_eq!(
            json,
            r#"{"ParameterKey":"AllowedIPAddress","ParameterValue":"10.0.0.0/8"}"#
        );
    }

    #[test]
    fn test_wait_config_default_matches_provider_waiter() {
        let config = WaitConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(3600));
    }
}
