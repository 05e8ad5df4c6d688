use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::cloud::Session;
use crate::credentials::Credentials;
use crate::error::{KillSwitchError, Result};

pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}

/// Role name without its IAM path, as the role listing reports it.
pub fn bare_role_name(role: &str) -> &str {
    role.rsplit('/').next().unwrap_or(role)
}

/// Session names show up in CloudTrail, so they carry the time of assumption.
pub fn session_name(now: DateTime<Utc>) -> String {
    format!("killswitch-{}", now.format("%Y%m%d%H%M%S"))
}

/// Assume `role_name` in `account_id`. No caching: every call is a fresh
/// assumption.
pub async fn assume<S: Session>(
    session: &S,
    account_id: &str,
    role_name: &str,
) -> Result<Credentials> {
    info!("Assuming role {} in account {}", role_name, account_id);

    match session.assume_role(account_id, role_name).await {
        Ok(credentials) => {
            info!(
                "Assumed role {} in account {}, expires {:?}",
                credentials.role_name(),
                credentials.account_id(),
                credentials.expiration()
            );
            Ok(credentials)
        }
        Err(source) => {
            error!(
                "Failed to assume role {} in account {}: {}",
                role_name, account_id, source
            );
            Err(KillSwitchError::Credential {
                account: account_id.to_string(),
                role: role_name.to_string(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_role_arn() {
        assert_eq!(
            role_arn("111111111111", "IncidentResponse"),
            "arn:aws:iam::111111111111:role/IncidentResponse"
        );
    }

    #[test]
    fn test_bare_role_name_strips_path() {
        assert_eq!(bare_role_name("IncidentResponse"), "IncidentResponse");
        assert_eq!(
            bare_role_name("responders/IncidentResponse"),
            "IncidentResponse"
        );
        assert_eq!(bare_role_name("a/b/c/Responder"), "Responder");
    }

    #[test]
    fn test_session_name_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let name = session_name(now);
        assert_eq!(name, "killswitch-20240309070501");
        assert!(name.len() <= 64);
    }
}
