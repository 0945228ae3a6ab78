//! Reconciliation policies.
//!
//! A policy is bound to one [`StackDefinition`] and decides which remote
//! calls bring the stack in line with it. Policies hold no remote state:
//! every decision re-queries the [`Client`], so applying the same policy
//! twice is safe.
//!
//! | Policy | Absent | Present, failed | Present, dirty | Present, clean |
//! |--------|--------|-----------------|----------------|----------------|
//! | [`UpdateInPlace`] | create | replace | update | no-op |
//! | [`UpdateViaReplacement`] | create | replace | replace | replace |
//! | [`CreateOnly`] | create | create | create | create |
//!
//! [`SetupTeardown`] has no single `apply`; it exposes `setup` and
//! `teardown` for a driver to call explicitly.

use crate::error::Result;
use crate::types::StackDefinition;
use crate::Client;
use std::fmt;

/// What a policy did, or would do, to a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoChange,
    Create,
    Update,
    Replace,
    Delete,
}

impl Action {
    /// Whether the action changes remote state.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => write!(f, "no change"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// The reconciliation strategy a stack is managed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    UpdateInPlace,
    UpdateViaReplacement,
    CreateOnly,
    SetupTeardown,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateInPlace => write!(f, "update-in-place"),
            Self::UpdateViaReplacement => write!(f, "update-via-replacement"),
            Self::CreateOnly => write!(f, "create-only"),
            Self::SetupTeardown => write!(f, "setup-teardown"),
        }
    }
}

/// Core trait for stack reconciliation strategies.
pub trait ReconcilePolicy: fmt::Debug {
    /// The local definition this policy converges towards.
    fn definition(&self) -> &StackDefinition;

    /// Which strategy this is.
    fn kind(&self) -> PolicyKind;

    /// Decide what `apply` would do, using queries only.
    fn plan(&self, client: &Client) -> Result<Action>;

    /// Bring the remote stack in line with the definition.
    ///
    /// Returns the action that was taken. Any remote failure aborts and is
    /// returned unchanged.
    fn apply(&self, client: &Client) -> Result<Action> {
        let action = self.plan(client)?;
        execute(client, self.definition(), action)?;
        Ok(action)
    }

    /// Stack name.
    fn name(&self) -> &str {
        self.definition().name()
    }
}

/// A boxed policy for type-erased storage.
pub type BoxedPolicy = Box<dyn ReconcilePolicy>;

/// Run the remote calls for a decided action.
fn execute(client: &Client, definition: &StackDefinition, action: Action) -> Result<()> {
    match action {
        Action::NoChange => {
            log::info!("{} - Nothing to do.", definition.name());
            Ok(())
        }
        Action::Create => client.create(definition),
        Action::Update => client.update(definition),
        Action::Replace => client.replace(definition),
        Action::Delete => client.delete(definition.name()),
    }
}

// ============================================================================
// Update in place
// ============================================================================

/// Create when absent, replace when failed, update when dirty.
///
/// The only policy that looks at template drift. Suited to stacks whose
/// updates are safe to apply in place.
#[derive(Debug, Clone)]
pub struct UpdateInPlace {
    definition: StackDefinition,
}

impl UpdateInPlace {
    pub fn new(definition: StackDefinition) -> Self {
        Self { definition }
    }
}

impl ReconcilePolicy for UpdateInPlace {
    fn definition(&self) -> &StackDefinition {
        &self.definition
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::UpdateInPlace
    }

    fn plan(&self, client: &Client) -> Result<Action> {
        let name = self.definition.name();
        if !client.exists(name)? {
            Ok(Action::Create)
        } else if !client.is_updatable(name)? {
            Ok(Action::Replace)
        } else if client.is_dirty(name, self.definition.template_body())? {
            Ok(Action::Update)
        } else {
            Ok(Action::NoChange)
        }
    }
}

// ============================================================================
// Update via replacement
// ============================================================================

/// Create when absent, otherwise always replace.
#[derive(Debug, Clone)]
pub struct UpdateViaReplacement {
    definition: StackDefinition,
}

impl UpdateViaReplacement {
    pub fn new(definition: StackDefinition) -> Self {
        Self { definition }
    }
}

impl ReconcilePolicy for UpdateViaReplacement {
    fn definition(&self) -> &StackDefinition {
        &self.definition
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::UpdateViaReplacement
    }

    fn plan(&self, client: &Client) -> Result<Action> {
        if client.exists(self.definition.name())? {
            Ok(Action::Replace)
        } else {
            Ok(Action::Create)
        }
    }
}

// ============================================================================
// Create only
// ============================================================================

/// Always create, without checking existence.
///
/// A second apply against an existing stack surfaces the remote
/// "already exists" error.
#[derive(Debug, Clone)]
pub struct CreateOnly {
    definition: StackDefinition,
}

impl CreateOnly {
    pub fn new(definition: StackDefinition) -> Self {
        Self { definition }
    }
}

impl ReconcilePolicy for CreateOnly {
    fn definition(&self) -> &StackDefinition {
        &self.definition
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::CreateOnly
    }

    fn plan(&self, _client: &Client) -> Result<Action> {
        Ok(Action::Create)
    }
}

// ============================================================================
// Setup / teardown
// ============================================================================

/// Explicit create-if-missing and delete-if-present entry points.
#[derive(Debug, Clone)]
pub struct SetupTeardown {
    definition: StackDefinition,
}

impl SetupTeardown {
    pub fn new(definition: StackDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &StackDefinition {
        &self.definition
    }

    pub fn kind(&self) -> PolicyKind {
        PolicyKind::SetupTeardown
    }

    /// What `setup` would do.
    pub fn plan_setup(&self, client: &Client) -> Result<Action> {
        if client.exists(self.definition.name())? {
            Ok(Action::NoChange)
        } else {
            Ok(Action::Create)
        }
    }

    /// Create the stack if it does not exist.
    pub fn setup(&self, client: &Client) -> Result<Action> {
        let action = self.plan_setup(client)?;
        execute(client, &self.definition, action)?;
        Ok(action)
    }

    /// What `teardown` would do.
    pub fn plan_teardown(&self, client: &Client) -> Result<Action> {
        if client.exists(self.definition.name())? {
            Ok(Action::Delete)
        } else {
            Ok(Action::NoChange)
        }
    }

    /// Delete the stack if it exists.
    pub fn teardown(&self, client: &Client) -> Result<Action> {
        let action = self.plan_teardown(client)?;
        execute(client, &self.definition, action)?;
        Ok(action)
    }
}
