use anyhow::{Context as _, Result};
use colored::Colorize;
use stackkit::{ReconcilePolicy, digest};

use super::Stacks;
use crate::ui;

/// Show a line diff between the deployed and local template of every
/// deployed stack whose template has drifted.
pub fn run(stacks: &Stacks) -> Result<()> {
    let mut dirty = 0;

    for policy in stacks.policies() {
        let definition = policy.definition();
        let name = definition.name();

        if !stacks.client.exists(name)? {
            ui::section(name);
            ui::dim("not deployed");
            continue;
        }

        let remote = stacks
            .client
            .template(name)
            .with_context(|| format!("{name} - Could not fetch deployed template"))?;

        ui::section(name);
        if digest::is_dirty(&remote, definition.template_body()) {
            dirty += 1;
            show_text_diff(&remote, definition.template_body());
        } else {
            ui::dim("up to date");
        }
    }

    println!();
    if dirty == 0 {
        ui::success("No template drift");
    } else {
        ui::warn(&format!("{dirty} stack(s) differ from local templates"));
    }
    Ok(())
}

/// Print changed lines, `-` for deployed and `+` for local.
pub fn show_text_diff(remote: &str, local: &str) {
    let diff = similar::TextDiff::from_lines(remote, local);
    let mut has_changes = false;

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            similar::ChangeTag::Delete => format!("- {change}").red(),
            similar::ChangeTag::Insert => format!("+ {change}").green(),
            similar::ChangeTag::Equal => continue,
        };
        has_changes = true;
        print!("    {line}");
        if change.missing_newline() {
            println!();
        }
    }

    // Digests differ but no line changed: trailing newline only
    if !has_changes {
        println!("    {}", "(whitespace only)".dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, NETWORK};
    use stackkit::{ExistenceCheck, StackStatus};
    use stackkit::backend::{Call, MockBackend};

    #[test]
    fn test_diff_fetches_only_deployed_templates() {
        let mock = MockBackend::new();
        mock.add_stack(NETWORK, StackStatus::CreateComplete, "Resources: {}\n");
        let stacks = testing::stacks(&mock);

        run(&stacks).unwrap();

        let fetched: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::GetTemplate(_)))
            .collect();
        assert_eq!(fetched, vec![Call::GetTemplate(NETWORK.to_string())]);
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_diff_query_errors() {
        let mock = MockBackend::new();
        mock.add_stack(NETWORK, StackStatus::CreateComplete, "x");
        mock.fail_queries(NETWORK);

        // Fail-open reports the stack as not deployed
        let mut stacks = testing::stacks(&mock);
        run(&stacks).unwrap();
        assert!(!mock.calls().contains(&Call::GetTemplate(NETWORK.to_string())));

        stacks.client = stacks.client.existence_check(ExistenceCheck::FailClosed);
        assert!(run(&stacks).is_err());
    }
}
