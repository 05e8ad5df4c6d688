use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Region used when a request does not name one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Sentinel target role name meaning "every role in the account"
pub const ALL_ROLES: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ApplyScp,
    DetachPolicies,
    DeleteRole,
    RevokeSessions,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::ApplyScp,
        Action::DetachPolicies,
        Action::DeleteRole,
        Action::RevokeSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ApplyScp => "apply_scp",
            Action::DetachPolicies => "detach_policies",
            Action::DeleteRole => "delete_role",
            Action::RevokeSessions => "revoke_sessions",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target_account_id and role_to_assume are required")]
    MissingTarget,
    #[error("org_management_account is required for apply_scp action")]
    MissingOrgManagementAccount,
    #[error("target_role_name is required for {0} action")]
    MissingTargetRole(Action),
    #[error("target_role_name ALL is only valid for revoke_sessions, not {0}")]
    AllRolesNotAllowed(Action),
    #[error("invalid action '{0}'")]
    UnknownAction(String),
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw request envelope as sent by the CLI or any other invoker.
///
/// Missing and `null` fields read as empty so that they surface as a
/// [`ValidationError`] rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub target_account_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub role_to_assume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role_name: Option<String>,
    #[serde(
        rename = "org_management_account",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub org_management_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// The account and role every handler assumes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub account_id: String,
    pub role_to_assume: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationScope {
    Role(String),
    AllRoles,
}

/// A request whose action-specific fields have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    ApplyScp {
        target: Target,
        org_management_account_id: String,
    },
    DetachPolicies {
        target: Target,
        role_name: String,
    },
    DeleteRole {
        target: Target,
        role_name: String,
    },
    RevokeSessions {
        target: Target,
        scope: RevocationScope,
    },
}

impl ActionRequest {
    pub fn action(&self) -> Action {
        match self {
            ActionRequest::ApplyScp { .. } => Action::ApplyScp,
            ActionRequest::DetachPolicies { .. } => Action::DetachPolicies,
            ActionRequest::DeleteRole { .. } => Action::DeleteRole,
            ActionRequest::RevokeSessions { .. } => Action::RevokeSessions,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            ActionRequest::ApplyScp { target, .. }
            | ActionRequest::DetachPolicies { target, .. }
            | ActionRequest::DeleteRole { target, .. }
            | ActionRequest::RevokeSessions { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub action: ActionRequest,
    pub region: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Request {
    pub fn new(
        action: Action,
        target_account_id: impl Into<String>,
        role_to_assume: impl Into<String>,
    ) -> Self {
        Self {
            action: action.to_string(),
            target_account_id: target_account_id.into(),
            role_to_assume: role_to_assume.into(),
            ..Default::default()
        }
    }

    pub fn with_target_role(mut self, role_name: impl Into<String>) -> Self {
        self.target_role_name = Some(role_name.into());
        self
    }

    pub fn with_org_management_account(mut self, account_id: impl Into<String>) -> Self {
        self.org_management_account_id = Some(account_id.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Check the always-required fields, then the fields the action needs.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        if self.target_account_id.is_empty() || self.role_to_assume.is_empty() {
            return Err(ValidationError::MissingTarget);
        }

        let action: Action = self.action.parse()?;
        let target = Target {
            account_id: self.target_account_id.clone(),
            role_to_assume: self.role_to_assume.clone(),
        };

        let action = match action {
            Action::ApplyScp => {
                let org_management_account_id = non_empty(&self.org_management_account_id)
                    .ok_or(ValidationError::MissingOrgManagementAccount)?;
                ActionRequest::ApplyScp {
                    target,
                    org_management_account_id: org_management_account_id.to_string(),
                }
            }
            Action::DetachPolicies | Action::DeleteRole => {
                let role_name = non_empty(&self.target_role_name)
                    .ok_or(ValidationError::MissingTargetRole(action))?;
                if role_name == ALL_ROLES {
                    return Err(ValidationError::AllRolesNotAllowed(action));
                }
                let role_name = role_name.to_string();
                if action == Action::DeleteRole {
                    ActionRequest::DeleteRole { target, role_name }
                } else {
                    ActionRequest::DetachPolicies { target, role_name }
                }
            }
            Action::RevokeSessions => {
                let scope = match non_empty(&self.target_role_name) {
                    Some(ALL_ROLES) => RevocationScope::AllRoles,
                    Some(role_name) => RevocationScope::Role(role_name.to_string()),
                    None => return Err(ValidationError::MissingTargetRole(action)),
                };
                ActionRequest::RevokeSessions { target, scope }
            }
        };

        Ok(ValidatedRequest {
            action,
            region: non_empty(&self.region).unwrap_or(DEFAULT_REGION).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLES: [&str; 5] = [
        r#"{"action":"apply_scp","target_account_id":"111111111111","role_to_assume":"IncidentResponse","org_management_account":"999999999999"}"#,
        r#"{"action":"detach_policies","target_account_id":"111111111111","role_to_assume":"IncidentResponse","target_role_name":"Compromised"}"#,
        r#"{"action":"delete_role","target_account_id":"111111111111","role_to_assume":"IncidentResponse","target_role_name":"Compromised","region":"eu-west-1"}"#,
        r#"{"action":"revoke_sessions","target_account_id":"111111111111","role_to_assume":"IncidentResponse","target_role_name":"Compromised"}"#,
        r#"{"action":"revoke_sessions","target_account_id":"111111111111","role_to_assume":"IncidentResponse","target_role_name":"ALL"}"#,
    ];

    #[test]
    fn test_examples_round_trip_without_field_loss() {
        for example in EXAMPLES {
            let request: Request = serde_json::from_str(example).unwrap();
            let serialized = serde_json::to_string(&request).unwrap();
            let reparsed: Request = serde_json::from_str(&serialized).unwrap();
            assert_eq!(request, reparsed);

            let original: serde_json::Value = serde_json::from_str(example).unwrap();
            let emitted: serde_json::Value = serde_json::from_str(&serialized).unwrap();
            assert_eq!(original, emitted);

            let validated = reparsed.validate().unwrap();
            assert_eq!(validated.action.action().as_str(), request.action);
        }
    }

    #[test]
    fn test_examples_route_to_expected_variants() {
        let parsed: Vec<ValidatedRequest> = EXAMPLES
            .iter()
            .map(|e| serde_json::from_str::<Request>(e).unwrap().validate().unwrap())
            .collect();

        assert!(matches!(
            &parsed[0].action,
            ActionRequest::ApplyScp { org_management_account_id, .. } if org_management_account_id == "999999999999"
        ));
        assert!(matches!(
            &parsed[1].action,
            ActionRequest::DetachPolicies { role_name, .. } if role_name == "Compromised"
        ));
        assert!(matches!(&parsed[2].action, ActionRequest::DeleteRole { .. }));
        assert_eq!(parsed[2].region, "eu-west-1");
        assert_eq!(
            parsed[3].action,
            ActionRequest::RevokeSessions {
                target: Target {
                    account_id: "111111111111".to_string(),
                    role_to_assume: "IncidentResponse".to_string(),
                },
                scope: RevocationScope::Role("Compromised".to_string()),
            }
        );
        assert!(matches!(
            &parsed[4].action,
            ActionRequest::RevokeSessions { scope: RevocationScope::AllRoles, .. }
        ));
    }

    #[test]
    fn test_missing_target_rejected_for_every_action() {
        for action in Action::ALL {
            let request = Request::new(action, "", "IncidentResponse")
                .with_target_role("Compromised")
                .with_org_management_account("999999999999");
            assert_eq!(request.validate(), Err(ValidationError::MissingTarget));

            let request = Request::new(action, "111111111111", "")
                .with_target_role("Compromised")
                .with_org_management_account("999999999999");
            assert_eq!(request.validate(), Err(ValidationError::MissingTarget));
        }
    }

    #[test]
    fn test_apply_scp_requires_management_account() {
        let request = Request::new(Action::ApplyScp, "111111111111", "IncidentResponse");
        assert_eq!(
            request.validate(),
            Err(ValidationError::MissingOrgManagementAccount)
        );

        let request = request.with_org_management_account("");
        assert_eq!(
            request.validate(),
            Err(ValidationError::MissingOrgManagementAccount)
        );
    }

    #[test]
    fn test_role_actions_require_target_role() {
        for action in [
            Action::DetachPolicies,
            Action::DeleteRole,
            Action::RevokeSessions,
        ] {
            let request = Request::new(action, "111111111111", "IncidentResponse");
            assert_eq!(
                request.validate(),
                Err(ValidationError::MissingTargetRole(action))
            );

            let request = request.with_target_role("");
            assert_eq!(
                request.validate(),
                Err(ValidationError::MissingTargetRole(action))
            );
        }
    }

    #[test]
    fn test_all_roles_only_for_revoke_sessions() {
        for action in [Action::DetachPolicies, Action::DeleteRole] {
            let request = Request::new(action, "111111111111", "IncidentResponse")
                .with_target_role(ALL_ROLES);
            assert_eq!(
                request.validate(),
                Err(ValidationError::AllRolesNotAllowed(action))
            );
        }
    }

    #[test]
    fn test_unknown_action() {
        let request = Request {
            action: "format_disk".to_string(),
            target_account_id: "111111111111".to_string(),
            role_to_assume: "IncidentResponse".to_string(),
            ..Default::default()
        };
        assert_eq!(
            request.validate(),
            Err(ValidationError::UnknownAction("format_disk".to_string()))
        );

        let request = Request {
            action: String::new(),
            ..request
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_missing_fields_deserialize_then_fail_validation() {
        let request: Request = serde_json::from_str(r#"{"action":"delete_role"}"#).unwrap();
        assert_eq!(request.validate(), Err(ValidationError::MissingTarget));
    }

    #[test]
    fn test_null_fields_fail_validation_not_parsing() {
        let request: Request = serde_json::from_str(
            r#"{"action":"delete_role","target_account_id":null,"role_to_assume":"IncidentResponse","target_role_name":"Compromised"}"#,
        )
        .unwrap();
        assert_eq!(request.target_account_id, "");
        assert_eq!(request.validate(), Err(ValidationError::MissingTarget));

        let request: Request = serde_json::from_str(
            r#"{"action":null,"target_account_id":"111111111111","role_to_assume":"IncidentResponse","target_role_name":null}"#,
        )
        .unwrap();
        assert_eq!(
            request.validate(),
            Err(ValidationError::UnknownAction(String::new()))
        );
    }

    #[test]
    fn test_region_defaults() {
        let request = Request::new(Action::RevokeSessions, "111111111111", "IncidentResponse")
            .with_target_role("Compromised");
        assert_eq!(request.validate().unwrap().region, DEFAULT_REGION);

        let request = request.with_region("");
        assert_eq!(request.validate().unwrap().region, DEFAULT_REGION);

        let request = request.with_region("ap-southeast-2");
        assert_eq!(request.validate().unwrap().region, "ap-southeast-2");
    }

    #[test]
    fn test_action_parsing() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        assert!("APPLY_SCP".parse::<Action>().is_err());
    }
}
