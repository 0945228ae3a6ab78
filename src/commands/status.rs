use anyhow::{Context as _, Result};
use colored::Colorize;
use serde::Serialize;
use stackkit::{Client, ReconcilePolicy, digest};

use super::Stacks;
use crate::{Context, ui};

/// Observed state of one stack.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StackReport {
    pub name: String,
    pub policy: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updatable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
    pub local_digest: String,
}

/// Query one stack. Never issues a mutating call.
pub fn inspect(client: &Client, policy: &dyn ReconcilePolicy) -> Result<StackReport> {
    let definition = policy.definition();
    let name = definition.name();
    let local_digest = digest::digest(definition.template_body());

    let mut report = StackReport {
        name: name.to_string(),
        policy: policy.kind().to_string(),
        exists: client.exists(name)?,
        status: None,
        updatable: None,
        dirty: None,
        local_digest,
    };

    if report.exists {
        let status = client.status(name)?;
        report.updatable = Some(!status.is_failed());
        report.status = Some(status.to_string());
        report.dirty = Some(client.is_dirty(name, definition.template_body())?);
    }

    Ok(report)
}

pub fn run(ctx: &Context, stacks: &Stacks, json: bool) -> Result<()> {
    let reports = stacks
        .policies()
        .into_iter()
        .map(|policy| {
            inspect(&stacks.client, policy)
                .with_context(|| format!("{} - Status query failed", policy.name()))
        })
        .collect::<Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    ui::header("Stack Status");
    for report in &reports {
        print_report(ctx, report);
    }
    println!();

    let missing = reports.iter().filter(|r| !r.exists).count();
    let dirty = reports.iter().filter(|r| r.dirty == Some(true)).count();
    let broken = reports.iter().filter(|r| r.updatable == Some(false)).count();

    if missing == 0 && dirty == 0 && broken == 0 {
        ui::success("All stacks deployed and up to date");
    } else {
        ui::warn(&format!(
            "{missing} missing, {dirty} dirty, {broken} requiring replacement"
        ));
    }
    Ok(())
}

fn print_report(ctx: &Context, report: &StackReport) {
    let state = match (&report.status, report.dirty) {
        (None, _) => "not deployed".dimmed().to_string(),
        (Some(status), dirty) => {
            let status = ui::status(&status.as_str().into());
            match dirty {
                Some(true) => format!("{status} {}", "(dirty)".yellow()),
                _ => status,
            }
        }
    };
    println!("  {:<40} {state}", report.name);

    if ctx.verbose > 0 {
        ui::dim(&format!("policy: {}", report.policy));
        ui::dim(&format!("local digest: {}", report.local_digest));
    }
}
