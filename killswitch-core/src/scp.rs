use killswitch_protocol::Target;
use tracing::info;

use crate::broker;
use crate::cloud::{OrganizationsApi, Session};
use crate::config::SwitchConfig;
use crate::error::{KillSwitchError, Result};

pub const SCP_NAME: &str = "HighlyRestrictiveSCP";
pub const SCP_DESCRIPTION: &str = "Highly Restrictive SCP";

/// Create the restrictive SCP in the management account and attach it to the
/// target account.
///
/// No rollback: if the attach fails the created policy is left in place,
/// unattached, for the operator to retry or remove.
pub async fn apply_scp<S: Session>(
    session: &S,
    target: &Target,
    management_account_id: &str,
    switch_config: &SwitchConfig,
) -> Result<String> {
    let credentials =
        broker::assume(session, management_account_id, &target.role_to_assume).await?;
    let organizations = session.organizations(credentials);

    let policy_id = organizations
        .create_policy(SCP_NAME, SCP_DESCRIPTION, switch_config.scp_policy())
        .await
        .map_err(|e| KillSwitchError::remote("creating SCP", management_account_id, e))?;
    info!("Created SCP {} in account {}", policy_id, management_account_id);

    organizations
        .attach_policy(&policy_id, &target.account_id)
        .await
        .map_err(|e| {
            KillSwitchError::remote(
                format!("attaching SCP {} to account {}", policy_id, target.account_id),
                management_account_id,
                e,
            )
        })?;
    info!("Attached SCP {} to account {}", policy_id, target.account_id);

    Ok(format!(
        "SCP applied to account {} with policy ID {}",
        target.account_id, policy_id
    ))
}
