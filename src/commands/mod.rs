//! Stack commands.
//!
//! Every command starts from [`prepare`], which resolves settings and
//! builds the client before any remote call is made.

pub mod apply;
pub mod diff;
pub mod lifecycle;
pub mod status;

use anyhow::{Context as _, Result};
use stackkit::backend::{self, AwsOptions, Backend};
use stackkit::{Client, ReconcilePolicy};

use crate::cli::GlobalArgs;
use crate::config::Settings;
use crate::topology::{Deployment, NetworkStack};

/// The client plus every stack it manages.
pub struct Stacks {
    pub client: Client,
    pub network: NetworkStack,
    pub deployment: Deployment,
}

impl Stacks {
    /// Network first, then instances in apply order.
    pub fn policies(&self) -> Vec<&dyn ReconcilePolicy> {
        std::iter::once(self.network.policy())
            .chain(self.deployment.instances().iter().map(|i| i.policy()))
            .collect()
    }
}

/// Resolve settings and build the stacks.
///
/// `backend_factory` is only called once settings are valid, so a
/// configuration error never reaches the remote side.
pub fn prepare<F>(args: &GlobalArgs, backend_factory: F) -> Result<Stacks>
where
    F: FnOnce(&AwsOptions) -> stackkit::Result<Box<dyn Backend>>,
{
    let settings = Settings::resolve(args)?;
    log::debug!(
        "Resolved settings: region={:?} profile={:?} wait={:?} existence={:?}",
        settings.aws.region,
        settings.aws.profile,
        settings.wait,
        settings.existence
    );

    let backend = backend_factory(&settings.aws).context("Failed to initialize AWS backend")?;
    let client = Client::with_backend(backend)
        .wait_config(settings.wait)
        .existence_check(settings.existence);

    let network = NetworkStack::new(
        &settings.topology.network_stack,
        &settings.network_template,
        &settings.allow_ip,
    );
    let deployment = Deployment::new(&settings.topology, &settings.instance_template);

    Ok(Stacks {
        client,
        network,
        deployment,
    })
}

/// Backend factory for real runs.
pub fn aws_backend(options: &AwsOptions) -> stackkit::Result<Box<dyn Backend>> {
    Ok(Box::new(backend::default_backend(options.clone())?))
}
