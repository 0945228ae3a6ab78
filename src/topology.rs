//! Deployment topology: the network stack and the instance stacks built on it.
//!
//! The topology is plain data so it can be overridden from the config file
//! and replaced with fixtures in tests. [`Topology::default`] is the
//! five-instance Cassandra layout across three public subnets.

use serde::{Deserialize, Serialize};
use stackkit::{
    Action, Client, ReconcilePolicy, Result, SetupTeardown, StackDefinition, UpdateInPlace,
    UpdateViaReplacement,
};
use std::collections::HashSet;

use crate::config::ConfigError;

/// One compute instance and the named resources it attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Short code used in the stack name, e.g. `a1`
    pub suffix: String,
    /// Human-readable instance name
    pub name: String,
    /// Exported subnet name from the network stack
    pub subnet: String,
    pub public_ip_allocation: String,
    pub volume: String,
    pub private_ip: String,
}

impl InstanceSpec {
    fn new(suffix: &str, subnet: &str, allocation: &str) -> Self {
        let upper = suffix.to_uppercase();
        Self {
            suffix: suffix.to_string(),
            name: format!("cassandra-{suffix}"),
            subnet: subnet.to_string(),
            public_ip_allocation: format!("PublicIPAllocation{allocation}"),
            volume: format!("Volume{upper}"),
            private_ip: format!("PrivateIP{upper}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topology {
    /// Name of the network stack instances reference
    pub network_stack: String,
    /// Instance stacks are named `{prefix}-{suffix}`
    pub instance_stack_prefix: String,
    /// Instances in apply order
    pub instances: Vec<InstanceSpec>,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            network_stack: "cassandra-network".to_string(),
            instance_stack_prefix: "cassandra-deployment-instance".to_string(),
            instances: vec![
                InstanceSpec::new("a1", "SubnetPublicA", "A"),
                InstanceSpec::new("a2", "SubnetPublicA", "B"),
                InstanceSpec::new("b1", "SubnetPublicB", "C"),
                InstanceSpec::new("b2", "SubnetPublicB", "D"),
                InstanceSpec::new("c1", "SubnetPublicC", "E"),
            ],
        }
    }
}

impl Topology {
    /// Stack name for an instance.
    pub fn instance_stack_name(&self, instance: &InstanceSpec) -> String {
        format!("{}-{}", self.instance_stack_prefix, instance.suffix)
    }

    /// Reject topologies whose stack names would collide.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::InvalidTopology(
                "no instances declared".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        seen.insert(self.network_stack.clone());
        for instance in &self.instances {
            let stack = self.instance_stack_name(instance);
            if !seen.insert(stack.clone()) {
                return Err(ConfigError::InvalidTopology(format!(
                    "duplicate stack name {stack}"
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Network
// ============================================================================

/// The shared network stack, updated in place.
#[derive(Debug)]
pub struct NetworkStack {
    policy: UpdateInPlace,
}

impl NetworkStack {
    pub fn new(name: &str, template_body: &str, allowed_ip: &str) -> Self {
        let definition = StackDefinition::new(name, template_body)
            .with_parameter("AllowedIPAddress", allowed_ip);
        Self {
            policy: UpdateInPlace::new(definition),
        }
    }

    pub fn policy(&self) -> &dyn ReconcilePolicy {
        &self.policy
    }

    pub fn apply(&self, client: &Client) -> Result<Action> {
        self.policy.apply(client)
    }

    pub fn plan(&self, client: &Client) -> Result<Action> {
        self.policy.plan(client)
    }

    /// Create-if-missing / delete-if-present view of the same stack.
    pub fn lifecycle(&self) -> SetupTeardown {
        SetupTeardown::new(self.policy.definition().clone())
    }
}

// ============================================================================
// Instances
// ============================================================================

/// One instance stack, always replaced on re-apply.
#[derive(Debug)]
pub struct DeploymentInstance {
    policy: UpdateViaReplacement,
}

impl DeploymentInstance {
    pub fn new(topology: &Topology, instance: &InstanceSpec, template_body: &str) -> Self {
        let definition = StackDefinition::new(topology.instance_stack_name(instance), template_body)
            .with_parameter("NetworkStack", &topology.network_stack)
            .with_parameter("SubnetName", &instance.subnet)
            .with_parameter("Name", &instance.name)
            .with_parameter("IPAllocationName", &instance.public_ip_allocation)
            .with_parameter("VolumeName", &instance.volume)
            .with_parameter("PrivateIPName", &instance.private_ip);
        Self {
            policy: UpdateViaReplacement::new(definition),
        }
    }

    pub fn policy(&self) -> &dyn ReconcilePolicy {
        &self.policy
    }

    pub fn name(&self) -> &str {
        self.policy.name()
    }

    pub fn lifecycle(&self) -> SetupTeardown {
        SetupTeardown::new(self.policy.definition().clone())
    }
}

/// All instance stacks, applied one after another in declaration order.
#[derive(Debug)]
pub struct Deployment {
    instances: Vec<DeploymentInstance>,
}

impl Deployment {
    pub fn new(topology: &Topology, template_body: &str) -> Self {
        let instances = topology
            .instances
            .iter()
            .map(|spec| DeploymentInstance::new(topology, spec, template_body))
            .collect();
        Self { instances }
    }

    pub fn instances(&self) -> &[DeploymentInstance] {
        &self.instances
    }

    /// Apply every instance in order. The first failure stops the run;
    /// instances already applied stay applied.
    pub fn apply(&self, client: &Client) -> Result<Vec<(String, Action)>> {
        let mut applied = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let action = instance.policy.apply(client)?;
            applied.push((instance.name().to_string(), action));
        }
        Ok(applied)
    }

    /// What `apply` would do to each instance. Read-only.
    pub fn plan(&self, client: &Client) -> Result<Vec<(String, Action)>> {
        self.instances
            .iter()
            .map(|i| Ok((i.name().to_string(), i.policy.plan(client)?)))
            .collect()
    }

    /// Create missing instances, in order.
    pub fn setup(&self, client: &Client) -> Result<Vec<(String, Action)>> {
        let mut done = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let action = instance.lifecycle().setup(client)?;
            done.push((instance.name().to_string(), action));
        }
        Ok(done)
    }

    /// Delete existing instances, in reverse order.
    pub fn teardown(&self, client: &Client) -> Result<Vec<(String, Action)>> {
        let mut done = Vec::with_capacity(self.instances.len());
        for instance in self.instances.iter().rev() {
            let action = instance.lifecycle().teardown(client)?;
            done.push((instance.name().to_string(), action));
        }
        Ok(done)
    }
}
