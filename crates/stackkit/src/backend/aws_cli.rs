//! Real CloudFormation backend using `aws cloudformation` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{StackDefinition, StackDescription, StackStatus};
use serde::Deserialize;
use std::process::{Command, Output};

/// Connection options forwarded to every `aws` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsOptions {
    /// `--region`, falls back to the CLI's own resolution when unset
    pub region: Option<String>,
    /// `--profile`, falls back to the CLI's own resolution when unset
    pub profile: Option<String>,
}

/// Backend that executes real `aws cloudformation` commands.
pub struct AwsCliBackend {
    /// Path to the aws executable
    aws_path: String,
    options: AwsOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksOutput {
    stacks: Vec<StackSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackSummary {
    stack_name: String,
    stack_status: String,
    #[serde(default)]
    stack_status_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTemplateOutput {
    template_body: serde_json::Value,
}

impl AwsCliBackend {
    /// Create a new AwsCliBackend.
    ///
    /// Returns an error if the AWS CLI is not installed.
    pub fn new(options: AwsOptions) -> Result<Self> {
        let aws_path = which::which("aws")
            .map_err(|_| Error::AwsCliNotFound)?
            .to_string_lossy()
            .to_string();
        log::debug!("Using aws CLI at {aws_path}");
        Ok(Self { aws_path, options })
    }

    /// Run an `aws cloudformation` subcommand and return output.
    fn run_aws(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(&self.aws_path);
        cmd.arg("cloudformation").args(args).args(["--output", "json"]);

        if let Some(region) = &self.options.region {
            cmd.args(["--region", region.as_str()]);
        }
        if let Some(profile) = &self.options.profile {
            cmd.args(["--profile", profile.as_str()]);
        }

        log::trace!("aws cloudformation {}", args.first().unwrap_or(&""));

        Ok(cmd.output()?)
    }

    /// Run a subcommand and check for success.
    fn run_aws_checked(&self, args: &[&str], stack: &str) -> Result<String> {
        let output = self.run_aws(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_aws_output(&stderr, stack));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Issue create-stack or update-stack with the definition's body and parameters.
    fn submit(&self, subcommand: &str, definition: &StackDefinition) -> Result<()> {
        let parameters = serde_json::to_string(definition.parameters())?;
        let mut args = vec![
            subcommand,
            "--stack-name",
            definition.name(),
            "--template-body",
            definition.template_body(),
        ];
        if !definition.parameters().is_empty() {
            args.push("--parameters");
            args.push(&parameters);
        }

        self.run_aws_checked(&args, definition.name())?;
        Ok(())
    }
}

impl Backend for AwsCliBackend {
    fn describe_stack(&self, name: &str) -> Result<StackDescription> {
        let stdout = self.run_aws_checked(&["describe-stacks", "--stack-name", name], name)?;
        parse_describe_output(&stdout, name)
    }

    fn create_stack(&self, definition: &StackDefinition) -> Result<()> {
        self.submit("create-stack", definition)
    }

    fn update_stack(&self, definition: &StackDefinition) -> Result<()> {
        self.submit("update-stack", definition)
    }

    fn delete_stack(&self, name: &str) -> Result<()> {
        self.run_aws_checked(&["delete-stack", "--stack-name", name], name)?;
        Ok(())
    }

    fn get_template(&self, name: &str) -> Result<String> {
        let stdout = self.run_aws_checked(&["get-template", "--stack-name", name], name)?;
        parse_template_output(&stdout)
    }
}

fn parse_describe_output(stdout: &str, name: &str) -> Result<StackDescription> {
    let output: DescribeStacksOutput = serde_json::from_str(stdout)?;
    let stack = output
        .stacks
        .into_iter()
        .next()
        .ok_or_else(|| Error::StackNotFound {
            stack: name.to_string(),
        })?;

    Ok(StackDescription {
        name: stack.stack_name,
        status: StackStatus::from(stack.stack_status.as_str()),
        status_reason: stack.stack_status_reason,
    })
}

/// The CLI decodes JSON templates into objects; YAML ones stay strings.
/// Re-encoded objects no longer match the local bytes, so [`crate::digest`]
/// compares JSON documents by value.
fn parse_template_output(stdout: &str) -> Result<String> {
    let output: GetTemplateOutput = serde_json::from_str(stdout)?;
    match output.template_body {
        serde_json::Value::String(body) => Ok(body),
        other => Ok(serde_json::to_string_pretty(&other)?),
    }
}
