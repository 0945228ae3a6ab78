//! In-memory backend for tests.
//!
//! Stacks live in a shared table and every backend call is recorded in a
//! journal, so tests can assert on exactly which remote calls a policy
//! issued. Clones share state: keep one handle for assertions and box
//! another into a [`crate::Client`].

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Parameter, StackDefinition, StackDescription, StackOperation, StackStatus};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe(String),
    Create(String),
    Update(String),
    Delete(String),
    GetTemplate(String),
}

impl Call {
    /// Stack the call was made against.
    pub fn stack(&self) -> &str {
        match self {
            Call::Describe(s)
            | Call::Create(s)
            | Call::Update(s)
            | Call::Delete(s)
            | Call::GetTemplate(s) => s,
        }
    }

    /// Whether the call changes remote state.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Update(_) | Call::Delete(_))
    }
}

#[derive(Debug, Clone)]
struct MockStack {
    template: String,
    parameters: Vec<Parameter>,
    status: StackStatus,
    reason: Option<String>,
    /// Describes left before `settle` replaces `status`
    pending_polls: u32,
    settle: StackStatus,
}

#[derive(Debug, Default)]
struct MockState {
    stacks: HashMap<String, MockStack>,
    calls: Vec<Call>,
    failing_queries: HashSet<String>,
    outcomes: HashMap<(String, StackOperation), StackStatus>,
    in_progress_polls: u32,
}

/// Mock backend for testing without AWS access.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new mock with no stacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing stack in a settled status.
    pub fn add_stack(&self, name: &str, status: StackStatus, template: &str) {
        let mut state = self.state.lock().unwrap();
        state.stacks.insert(
            name.to_string(),
            MockStack {
                template: template.to_string(),
                parameters: Vec::new(),
                status: status.clone(),
                reason: None,
                pending_polls: 0,
                settle: status,
            },
        );
    }

    /// Make describe and get-template fail for this stack with a query error.
    pub fn fail_queries(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_queries.insert(name.to_string());
    }

    /// Choose the terminal status an operation on this stack settles in.
    ///
    /// Defaults to the operation's success status.
    pub fn set_outcome(&self, name: &str, operation: StackOperation, status: StackStatus) {
        let mut state = self.state.lock().unwrap();
        state.outcomes.insert((name.to_string(), operation), status);
    }

    /// Number of describes that report an operation as still in progress.
    pub fn set_in_progress_polls(&self, polls: u32) {
        let mut state = self.state.lock().unwrap();
        state.in_progress_polls = polls;
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the create/update/delete calls, in order.
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    /// Current status of a stack, without recording a call.
    pub fn stack_status(&self, name: &str) -> Option<StackStatus> {
        let state = self.state.lock().unwrap();
        state.stacks.get(name).map(|s| s.status.clone())
    }

    /// Current template of a stack, without recording a call.
    pub fn stack_template(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.stacks.get(name).map(|s| s.template.clone())
    }

    /// Current parameters of a stack, without recording a call.
    pub fn stack_parameters(&self, name: &str) -> Option<Vec<Parameter>> {
        let state = self.state.lock().unwrap();
        state.stacks.get(name).map(|s| s.parameters.clone())
    }
}

impl MockState {
    fn begin(&mut self, name: &str, operation: StackOperation, in_progress: StackStatus) {
        let settle = self
            .outcomes
            .get(&(name.to_string(), operation))
            .cloned()
            .unwrap_or_else(|| operation.success_status());
        let polls = self.in_progress_polls;

        if let Some(stack) = self.stacks.get_mut(name) {
            stack.reason = (settle != operation.success_status())
                .then(|| format!("mock {operation} settled in {settle}"));
            stack.pending_polls = polls;
            stack.settle = settle.clone();
            stack.status = if polls > 0 { in_progress } else { settle };
        }
    }

    fn query_error(name: &str) -> Error {
        Error::CommandFailed {
            message: format!("aws cloudformation failed for {name}"),
            stderr: "Could not connect to the endpoint URL".to_string(),
        }
    }
}

impl Backend for MockBackend {
    fn describe_stack(&self, name: &str) -> Result<StackDescription> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Describe(name.to_string()));

        if state.failing_queries.contains(name) {
            return Err(MockState::query_error(name));
        }

        let not_found = || Error::StackNotFound {
            stack: name.to_string(),
        };
        let stack = state.stacks.get_mut(name).ok_or_else(not_found)?;

        if stack.pending_polls > 0 {
            stack.pending_polls -= 1;
            if stack.pending_polls == 0 {
                stack.status = stack.settle.clone();
            }
        }

        // Deleted stacks are no longer visible by name
        if stack.status == StackStatus::DeleteComplete {
            state.stacks.remove(name);
            return Err(not_found());
        }

        Ok(StackDescription {
            name: name.to_string(),
            status: stack.status.clone(),
            status_reason: stack.reason.clone(),
        })
    }

    fn create_stack(&self, definition: &StackDefinition) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let name = definition.name();
        state.calls.push(Call::Create(name.to_string()));

        if state.stacks.contains_key(name) {
            return Err(Error::AlreadyExists {
                stack: name.to_string(),
            });
        }

        state.stacks.insert(
            name.to_string(),
            MockStack {
                template: definition.template_body().to_string(),
                parameters: definition.parameters().to_vec(),
                status: StackStatus::CreateInProgress,
                reason: None,
                pending_polls: 0,
                settle: StackStatus::CreateInProgress,
            },
        );
        state.begin(name, StackOperation::Create, StackStatus::CreateInProgress);
        Ok(())
    }

    fn update_stack(&self, definition: &StackDefinition) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let name = definition.name();
        state.calls.push(Call::Update(name.to_string()));

        let stack = state.stacks.get_mut(name).ok_or_else(|| Error::StackNotFound {
            stack: name.to_string(),
        })?;

        if stack.template == definition.template_body() && stack.parameters == definition.parameters()
        {
            return Err(Error::NoUpdates {
                stack: name.to_string(),
            });
        }

        stack.template = definition.template_body().to_string();
        stack.parameters = definition.parameters().to_vec();
        state.begin(name, StackOperation::Update, StackStatus::UpdateInProgress);
        Ok(())
    }

    fn delete_stack(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(name.to_string()));

        // Deleting an unknown stack succeeds silently, as CloudFormation does
        state.begin(name, StackOperation::Delete, StackStatus::DeleteInProgress);
        Ok(())
    }

    fn get_template(&self, name: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetTemplate(name.to_string()));

        if state.failing_queries.contains(name) {
            return Err(MockState::query_error(name));
        }

        state
            .stacks
            .get(name)
            .map(|s| s.template.clone())
            .ok_or_else(|| Error::StackNotFound {
                stack: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_missing_stack() {
        let mock = MockBackend::new();
        let err = mock.describe_stack("nope").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.calls(), vec![Call::Describe("nope".to_string())]);
    }

    #[test]
    fn test_create_settles_after_polls() {
        let mock = MockBackend::new();
        mock.set_in_progress_polls(2);
        mock.create_stack(&StackDefinition::new("s", "body")).unwrap();

        assert_eq!(mock.describe_stack("s").unwrap().status, StackStatus::CreateInProgress);
        assert_eq!(mock.describe_stack("s").unwrap().status, StackStatus::CreateComplete);
        assert_eq!(mock.describe_stack("s").unwrap().status, StackStatus::CreateComplete);
    }

    #[test]
    fn test_create_existing_stack_conflicts() {
        let mock = MockBackend::new();
        mock.add_stack("s", StackStatus::CreateComplete, "body");
        let err = mock.create_stack(&StackDefinition::new("s", "body")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_delete_removes_stack_on_describe() {
        let mock = MockBackend::new();
        mock.add_stack("s", StackStatus::CreateFailed, "body");
        mock.delete_stack("s").unwrap();

        assert!(mock.describe_stack("s").unwrap_err().is_not_found());
        assert_eq!(mock.stack_status("s"), None);
    }

    #[test]
    fn test_update_without_changes_is_rejected() {
        let mock = MockBackend::new();
        mock.add_stack("s", StackStatus::CreateComplete, "body");
        let err = mock.update_stack(&StackDefinition::new("s", "body")).unwrap_err();
        assert!(matches!(err, Error::NoUpdates { .. }));
    }

    #[test]
    fn test_outcome_override() {
        let mock = MockBackend::new();
        mock.set_outcome("s", StackOperation::Create, StackStatus::RollbackComplete);
        mock.create_stack(&StackDefinition::new("s", "body")).unwrap();

        let desc = mock.describe_stack("s").unwrap();
        assert_eq!(desc.status, StackStatus::RollbackComplete);
        assert!(desc.status_reason.is_some());
    }

    #[test]
    fn test_failing_queries() {
        let mock = MockBackend::new();
        mock.add_stack("s", StackStatus::CreateComplete, "body");
        mock.fail_queries("s");

        assert!(!mock.describe_stack("s").unwrap_err().is_not_found());
        assert!(mock.get_template("s").is_err());
    }
}
