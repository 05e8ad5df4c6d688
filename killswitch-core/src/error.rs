use killswitch_protocol::ValidationError;
use thiserror::Error;

/// A single provider API call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum KillSwitchError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("error assuming role {role} in account {account}: {source}")]
    Credential {
        account: String,
        role: String,
        #[source]
        source: ProviderError,
    },

    /// `action` reads as a gerund phrase, e.g. "detaching policy X from role Y".
    #[error("error {action} in account {account}: {source}")]
    Remote {
        action: String,
        account: String,
        #[source]
        source: ProviderError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KillSwitchError>;

impl KillSwitchError {
    pub fn remote(action: impl Into<String>, account: &str, source: ProviderError) -> Self {
        Self::Remote {
            action: action.into(),
            account: account.to_string(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
