use chrono::{DateTime, Utc};
use std::fmt;
use std::time::SystemTime;

/// Temporary credentials for one assumed role in one account.
///
/// Not `Clone` and not serializable. A value is handed to exactly one client
/// constructor and dropped with it.
pub struct Credentials {
    account_id: String,
    role_name: String,
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(
        account_id: impl Into<String>,
        role_name: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            role_name: role_name.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    pub(crate) fn into_provider(self) -> aws_credential_types::Credentials {
        aws_credential_types::Credentials::new(
            self.access_key_id,
            self.secret_access_key,
            Some(self.session_token),
            self.expiration.map(SystemTime::from),
            "killswitch-assume-role",
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("role_name", &self.role_name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_secrets() {
        let creds = Credentials::new(
            "111111111111",
            "IncidentResponse",
            "ASIAEXAMPLE",
            "very-secret-key",
            "very-secret-token",
            None,
        );
        let printed = format!("{:?}", creds);
        assert!(printed.contains("ASIAEXAMPLE"));
        assert!(printed.contains("111111111111"));
        assert!(!printed.contains("very-secret-key"));
        assert!(!printed.contains("very-secret-token"));
    }
}
