use anyhow::{Context as _, Result};
use stackkit::{Action, ReconcilePolicy};

use super::Stacks;
use crate::{Context, ui};

/// Reconcile the network stack, then each instance stack in order.
///
/// The first failure aborts the run. Stacks already reconciled are left
/// as they are.
pub fn run(ctx: &Context, stacks: &Stacks, dry_run: bool) -> Result<()> {
    if dry_run {
        return plan(stacks);
    }

    let network = stacks.network.policy().name();
    let network_action = stacks
        .network
        .apply(&stacks.client)
        .with_context(|| format!("{network} - Reconciliation failed"))?;

    let instances = stacks
        .deployment
        .apply(&stacks.client)
        .context("Instance deployment aborted")?;

    if !ctx.quiet {
        ui::header("Applied");
        ui::kv(network, &ui::action(network_action));
        for (name, action) in &instances {
            ui::kv(name, &ui::action(*action));
        }
        println!();
    }

    let changed = std::iter::once(network_action)
        .chain(instances.iter().map(|(_, a)| *a))
        .filter(Action::is_change)
        .count();
    ui::success(&format!("Deployment converged ({changed} stack(s) changed)"));
    Ok(())
}

/// Print what `apply` would do without touching any stack.
pub fn plan(stacks: &Stacks) -> Result<()> {
    let network = stacks.network.policy();
    let network_action = stacks
        .network
        .plan(&stacks.client)
        .with_context(|| format!("{} - Planning failed", network.name()))?;
    let instance_actions = stacks
        .deployment
        .plan(&stacks.client)
        .context("Instance planning failed")?;

    let mut planned = vec![(network, network_action)];
    planned.extend(
        stacks
            .deployment
            .instances()
            .iter()
            .zip(instance_actions)
            .map(|(instance, (_, action))| (instance.policy(), action)),
    );

    ui::header("Planned changes (dry run)");
    for (policy, action) in &planned {
        println!(
            "  {:<40} {:<24} {}",
            policy.name(),
            policy.kind().to_string(),
            ui::action(*action)
        );
    }
    println!();

    let changes = planned.iter().filter(|(_, a)| a.is_change()).count();
    if changes == 0 {
        ui::success("Nothing to do");
    } else {
        ui::info(&format!("{changes} stack(s) would change. Run without --dry-run to apply."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, NETWORK, instance};
    use stackkit::StackStatus;
    use stackkit::backend::{Call, MockBackend};

    fn ctx() -> Context {
        Context {
            verbose: 0,
            quiet: true,
        }
    }

    #[test]
    fn test_apply_creates_everything_in_order() {
        let mock = MockBackend::new();
        let stacks = testing::stacks(&mock);

        run(&ctx(), &stacks, false).unwrap();

        let created: Vec<_> = mock.mutating_calls();
        assert_eq!(created.len(), 6);
        assert_eq!(created[0], Call::Create(NETWORK.to_string()));
        assert_eq!(created[5], Call::Create(instance("c1")));
        assert_eq!(
            mock.stack_parameters(NETWORK).unwrap()[0].value,
            "203.0.113.7/32"
        );
    }

    #[test]
    fn test_apply_network_failure_skips_instances() {
        let mock = MockBackend::new();
        mock.add_stack(NETWORK, StackStatus::CreateComplete, "old template");
        mock.set_outcome(
            NETWORK,
            stackkit::StackOperation::Update,
            StackStatus::UpdateRollbackComplete,
        );
        let stacks = testing::stacks(&mock);

        let err = run(&ctx(), &stacks, false).unwrap_err();
        assert!(err.downcast_ref::<stackkit::Error>().is_some());
        assert_eq!(mock.mutating_calls(), vec![Call::Update(NETWORK.to_string())]);
    }

    #[test]
    fn test_dry_run_makes_no_mutating_calls() {
        let mock = MockBackend::new();
        mock.add_stack(NETWORK, StackStatus::CreateComplete, testing::NETWORK_TEMPLATE);
        mock.add_stack(&instance("a1"), StackStatus::CreateFailed, "x");
        let stacks = testing::stacks(&mock);

        run(&ctx(), &stacks, true).unwrap();
        assert!(mock.mutating_calls().is_empty());
        assert!(!mock.calls().is_empty());
    }
}
