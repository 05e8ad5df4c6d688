use killswitch_protocol::Target;
use tracing::info;

use crate::broker;
use crate::cloud::{IamApi, Session};
use crate::error::{KillSwitchError, Result};

/// What [`sanitize_role`] removed from a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitized {
    pub detached: Vec<String>,
    pub deleted_inline: Vec<String>,
}

/// Detach every managed policy, then delete every inline policy, from
/// `role_name`.
///
/// Fail-fast: the first failing call aborts the remaining steps. Whatever was
/// already removed stays removed.
pub async fn sanitize_role<I: IamApi>(
    iam: &I,
    account_id: &str,
    role_name: &str,
) -> Result<Sanitized> {
    let mut sanitized = Sanitized::default();

    let attached = iam
        .list_attached_role_policies(role_name)
        .await
        .map_err(|e| {
            KillSwitchError::remote(
                format!("listing attached policies for role {}", role_name),
                account_id,
                e,
            )
        })?;

    for policy_arn in attached {
        iam.detach_role_policy(role_name, &policy_arn)
            .await
            .map_err(|e| {
                KillSwitchError::remote(
                    format!("detaching policy {} from role {}", policy_arn, role_name),
                    account_id,
                    e,
                )
            })?;
        info!("Detached {} from role {}", policy_arn, role_name);
        sanitized.detached.push(policy_arn);
    }

    let inline = iam.list_role_policies(role_name).await.map_err(|e| {
        KillSwitchError::remote(
            format!("listing inline policies for role {}", role_name),
            account_id,
            e,
        )
    })?;

    for policy_name in inline {
        iam.delete_role_policy(role_name, &policy_name)
            .await
            .map_err(|e| {
                KillSwitchError::remote(
                    format!(
                        "deleting inline policy {} from role {}",
                        policy_name, role_name
                    ),
                    account_id,
                    e,
                )
            })?;
        info!("Deleted inline policy {} from role {}", policy_name, role_name);
        sanitized.deleted_inline.push(policy_name);
    }

    Ok(sanitized)
}

pub async fn detach_policies<S: Session>(
    session: &S,
    target: &Target,
    role_name: &str,
) -> Result<String> {
    let credentials = broker::assume(session, &target.account_id, &target.role_to_assume).await?;
    let iam = session.iam(credentials);

    let sanitized = sanitize_role(&iam, &target.account_id, role_name).await?;
    info!(
        "Role {} stripped: {} managed, {} inline",
        role_name,
        sanitized.detached.len(),
        sanitized.deleted_inline.len()
    );

    Ok(format!(
        "Policies detached from role {} in account {}",
        role_name, target.account_id
    ))
}

/// Strip the role, then delete it. Deleting the role also invalidates its
/// active sessions.
pub async fn delete_role<S: Session>(
    session: &S,
    target: &Target,
    role_name: &str,
) -> Result<String> {
    let credentials = broker::assume(session, &target.account_id, &target.role_to_assume).await?;
    let iam = session.iam(credentials);

    sanitize_role(&iam, &target.account_id, role_name).await?;

    iam.delete_role(role_name).await.map_err(|e| {
        KillSwitchError::remote(format!("deleting role {}", role_name), &target.account_id, e)
    })?;
    info!("Deleted role {} in account {}", role_name, target.account_id);

    Ok(format!(
        "Role {} and its policies are detached and deleted in account {}",
        role_name, target.account_id
    ))
}
