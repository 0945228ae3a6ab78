use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use stackkit::{Action, ReconcilePolicy};

use super::Stacks;
use crate::{Context, ui};

/// Create whichever stacks are missing. Existing stacks are left alone.
pub fn setup(ctx: &Context, stacks: &Stacks) -> Result<()> {
    let network = stacks.network.policy().name();
    let network_action = stacks
        .network
        .lifecycle()
        .setup(&stacks.client)
        .with_context(|| format!("{network} - Setup failed"))?;

    let instances = stacks
        .deployment
        .setup(&stacks.client)
        .context("Instance setup aborted")?;

    report(ctx, "Setup", (network, network_action), &instances);
    Ok(())
}

/// Delete instance stacks in reverse order, then the network stack.
pub fn teardown(ctx: &Context, stacks: &Stacks, yes: bool) -> Result<()> {
    let network = stacks.network.policy().name();

    if !yes {
        ui::warn(&format!(
            "This deletes {} instance stack(s) and {network}.",
            stacks.deployment.instances().len()
        ));
        let confirmed = Confirm::new()
            .with_prompt("Tear down the deployment?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            ui::info("Teardown cancelled");
            return Ok(());
        }
    }

    let instances = stacks
        .deployment
        .teardown(&stacks.client)
        .context("Instance teardown aborted")?;

    let network_action = stacks
        .network
        .lifecycle()
        .teardown(&stacks.client)
        .with_context(|| format!("{network} - Teardown failed"))?;

    report(ctx, "Teardown", (network, network_action), &instances);
    Ok(())
}

fn report(ctx: &Context, title: &str, network: (&str, Action), instances: &[(String, Action)]) {
    if !ctx.quiet {
        ui::header(title);
        ui::kv(network.0, &ui::action(network.1));
        for (name, action) in instances {
            ui::kv(name, &ui::action(*action));
        }
        println!();
    }

    let changed = instances.iter().filter(|(_, a)| a.is_change()).count()
        + usize::from(network.1.is_change());
    ui::success(&format!("{title} complete ({changed} stack(s) changed)"));
}
