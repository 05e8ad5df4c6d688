use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use killswitch_protocol::{RevocationScope, Target};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::broker;
use crate::cloud::{IamApi, Session};
use crate::error::{KillSwitchError, ProviderError, Result};

pub const REVOCATION_POLICY_PREFIX: &str = "TokenInvalidationPolicy";
pub const REVOCATION_POLICY_DESCRIPTION: &str =
    "Policy to invalidate all tokens at time of creation";

pub fn revocation_policy_name(now: DateTime<Utc>) -> String {
    format!("{}-{}", REVOCATION_POLICY_PREFIX, now.format("%Y%m%d-%H%M%S"))
}

/// Deny everything to any session issued before `issued_before`.
pub fn revocation_policy_document(issued_before: DateTime<Utc>) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Deny",
            "Action": "*",
            "Resource": "*",
            "Condition": {
                "DateLessThan": {
                    "aws:TokenIssueTime": issued_before.to_rfc3339_opts(SecondsFormat::Secs, true)
                }
            }
        }]
    })
    .to_string()
}

#[derive(Debug, Clone, Default)]
pub struct RevocationReport {
    pub policy_arn: String,
    /// In listing order.
    pub attached: Vec<String>,
    pub failed: Vec<(String, ProviderError)>,
}

impl RevocationReport {
    /// One line per modified role. Failures are not part of the summary.
    pub fn summary(&self, account_id: &str) -> String {
        if self.attached.is_empty() {
            return format!("No roles were modified in account {}", account_id);
        }
        self.attached
            .iter()
            .map(|role_name| format!("Policy attached to role {}", role_name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn revoke_sessions<S: Session>(
    session: &S,
    target: &Target,
    scope: &RevocationScope,
    now: DateTime<Utc>,
    concurrency: usize,
) -> Result<String> {
    let credentials = broker::assume(session, &target.account_id, &target.role_to_assume).await?;
    let iam = session.iam(credentials);

    let policy_name = revocation_policy_name(now);
    let policy_arn = iam
        .create_policy(
            &policy_name,
            REVOCATION_POLICY_DESCRIPTION,
            &revocation_policy_document(now),
        )
        .await
        .map_err(|e| {
            KillSwitchError::remote(
                format!("creating policy {}", policy_name),
                &target.account_id,
                e,
            )
        })?;
    info!("Created revocation policy {}", policy_arn);

    match scope {
        RevocationScope::Role(role_name) => {
            iam.attach_role_policy(role_name, &policy_arn)
                .await
                .map_err(|e| {
                    KillSwitchError::remote(
                        format!("attaching policy {} to role {}", policy_arn, role_name),
                        &target.account_id,
                        e,
                    )
                })?;
            info!("Attached {} to role {}", policy_arn, role_name);

            Ok(format!(
                "New token revocation policy attached to role {} in account {}",
                role_name, target.account_id
            ))
        }
        RevocationScope::AllRoles => {
            let report = revoke_all_roles(
                &iam,
                &target.account_id,
                &target.role_to_assume,
                policy_arn,
                concurrency,
            )
            .await?;
            info!(
                "Revocation policy {} attached to {} roles in account {}",
                report.policy_arn,
                report.attached.len(),
                target.account_id
            );
            Ok(report.summary(&target.account_id))
        }
    }
}

pub async fn list_all_roles<I: IamApi>(iam: &I, account_id: &str) -> Result<Vec<String>> {
    let mut role_names = Vec::new();
    let mut marker = None;
    loop {
        let page = iam
            .list_roles(marker.take())
            .await
            .map_err(|e| KillSwitchError::remote("listing roles", account_id, e))?;
        debug!("Fetched {} roles", page.role_names.len());
        role_names.extend(page.role_names);

        match page.next_marker {
            Some(next) => marker = Some(next),
            None => break,
        }
    }
    Ok(role_names)
}

/// Attach `policy_arn` to every role except `assumed_role`. A failed attach
/// is recorded and the remaining roles are still attempted.
pub async fn revoke_all_roles<I: IamApi>(
    iam: &I,
    account_id: &str,
    assumed_role: &str,
    policy_arn: String,
    concurrency: usize,
) -> Result<RevocationReport> {
    let assumed_role = broker::bare_role_name(assumed_role);
    let candidates: Vec<String> = list_all_roles(iam, account_id)
        .await?
        .into_iter()
        .filter(|role_name| role_name != assumed_role)
        .collect();
    info!(
        "Attaching {} to {} roles in account {}",
        policy_arn,
        candidates.len(),
        account_id
    );

    let arn: &str = &policy_arn;
    let outcomes: Vec<_> = stream::iter(candidates)
        .map(move |role_name| async move {
            let outcome = iam.attach_role_policy(&role_name, arn).await;
            (role_name, outcome)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = RevocationReport::default();
    for (role_name, outcome) in outcomes {
        match outcome {
            Ok(()) => report.attached.push(role_name),
            Err(e) => {
                warn!("Error attaching policy to role {}: {}", role_name, e);
                report.failed.push((role_name, e));
            }
        }
    }

    if !report.failed.is_empty() {
        warn!(
            "Revocation incomplete in account {}: {} attached, {} failed",
            account_id,
            report.attached.len(),
            report.failed.len()
        );
    }

    report.policy_arn = policy_arn;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_policy_name_embeds_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 11, 2, 23, 59, 7).unwrap();
        assert_eq!(
            revocation_policy_name(now),
            "TokenInvalidationPolicy-20241102-235907"
        );
    }

    #[test]
    fn test_policy_denies_sessions_issued_before_now() {
        let now = Utc.with_ymd_and_hms(2024, 11, 2, 23, 59, 7).unwrap();
        let document: serde_json::Value =
            serde_json::from_str(&revocation_policy_document(now)).unwrap();

        let statement = &document["Statement"][0];
        assert_eq!(statement["Effect"], "Deny");
        assert_eq!(statement["Action"], "*");
        assert_eq!(statement["Resource"], "*");
        assert_eq!(
            statement["Condition"]["DateLessThan"]["aws:TokenIssueTime"],
            "2024-11-02T23:59:07Z"
        );
    }

    #[test]
    fn test_summary_lists_only_successes() {
        let report = RevocationReport {
            policy_arn: "arn:aws:iam::111111111111:policy/p".to_string(),
            attached: vec!["app".to_string(), "ci".to_string()],
            failed: vec![("locked".to_string(), ProviderError::new("AccessDenied"))],
        };
        let summary = report.summary("111111111111");
        assert_eq!(
            summary,
            "Policy attached to role app\nPolicy attached to role ci"
        );
        assert!(!summary.contains("locked"));
    }

    #[test]
    fn test_summary_when_nothing_modified() {
        let report = RevocationReport::default();
        assert_eq!(
            report.summary("111111111111"),
            "No roles were modified in account 111111111111"
        );
    }
}
