mod invoke;

use anyhow::{bail, Result};
use clap::Parser;
use killswitch_protocol::Request;

use invoke::Invocation;

#[derive(Parser, Debug)]
#[command(name = "killswitch-cli")]
#[command(about = "Trigger incident-response actions through the kill switch function")]
struct Args {
    /// Action to perform: apply_scp, delete_role, detach_policies or revoke_sessions
    #[arg(long)]
    action: Option<String>,

    /// Lambda function name or ARN
    #[arg(long)]
    lambda: Option<String>,

    /// AWS target account ID to perform the action on
    #[arg(long = "target_account", visible_alias = "target-account")]
    target_account: Option<String>,

    /// Role to assume when performing the action
    #[arg(long = "role_to_assume", visible_alias = "role-to-assume")]
    role_to_assume: Option<String>,

    /// IAM role to delete, detach, or revoke sessions on (ALL revokes every role, revoke_sessions only)
    #[arg(long = "target_role", visible_alias = "target-role")]
    target_role: Option<String>,

    /// AWS Organizations management account ID (apply_scp only)
    #[arg(
        long = "org_management_account",
        visible_alias = "org-management-account"
    )]
    org_management_account: Option<String>,

    /// AWS region of the Lambda function, also forwarded with the request
    #[arg(long)]
    region: Option<String>,
}

const LONG_FLAGS: [&str; 7] = [
    "action",
    "lambda",
    "target_account",
    "role_to_assume",
    "target_role",
    "org_management_account",
    "region",
];

/// Rewrites single-dash long flags (`-action apply_scp`, `-region=eu-west-1`)
/// to their `--` form.
fn normalize_flags<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.strip_prefix('-') {
            Some(rest) if !rest.starts_with('-') => {
                let name = rest.split('=').next().unwrap_or(rest).replace('-', "_");
                if LONG_FLAGS.contains(&name.as_str()) {
                    format!("-{}", arg)
                } else {
                    arg
                }
            }
            _ => arg,
        })
        .collect()
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl Args {
    /// Builds the envelope and runs the same validation the function runs.
    fn into_invocation(self) -> Result<Invocation> {
        let (Some(action), Some(function_name), Some(target_account_id), Some(role_to_assume)) = (
            required(self.action),
            required(self.lambda),
            required(self.target_account),
            required(self.role_to_assume),
        ) else {
            bail!("Required flags not provided. 'action', 'lambda', 'target_account', and 'role_to_assume' are mandatory.");
        };

        let request = Request {
            action,
            target_account_id,
            role_to_assume,
            target_role_name: self.target_role,
            org_management_account_id: self.org_management_account,
            region: self.region.clone(),
        };
        request.validate()?;

        Ok(Invocation {
            function_name,
            region: required(self.region),
            request,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse_from(normalize_flags(std::env::args()));

    let invocation = args.into_invocation()?;
    let result = invoke::invoke_function(&invocation).await?;

    println!("Lambda invocation result:");
    println!("{}", result);

    Ok(())
}
