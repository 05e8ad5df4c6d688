use chrono::Utc;
use killswitch_protocol::{ActionRequest, Request, ValidatedRequest};
use tracing::info;

use crate::cloud::Connector;
use crate::config::SwitchConfig;
use crate::error::{KillSwitchError, Result};
use crate::{revoke, role, scp};

/// Routes one request to one handler.
///
/// Holds no state between invocations apart from the switch config loaded by
/// the caller; every dispatch opens its own session and assumes fresh
/// credentials.
pub struct Engine<C> {
    connector: C,
    switch_config: Option<SwitchConfig>,
    revoke_concurrency: usize,
}

impl<C: Connector> Engine<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            switch_config: None,
            revoke_concurrency: 1,
        }
    }

    pub fn with_switch_config(mut self, switch_config: Option<SwitchConfig>) -> Self {
        self.switch_config = switch_config;
        self
    }

    pub fn with_revoke_concurrency(mut self, concurrency: usize) -> Self {
        self.revoke_concurrency = concurrency.max(1);
        self
    }

    /// Validate then dispatch. Nothing remote happens on a validation failure.
    pub async fn handle(&self, request: &Request) -> Result<String> {
        let validated = request.validate()?;
        self.dispatch(validated).await
    }

    pub async fn dispatch(&self, request: ValidatedRequest) -> Result<String> {
        let ValidatedRequest { action, region } = request;
        info!(
            "Dispatching {} against account {} in {}",
            action.action(),
            action.target().account_id,
            region
        );

        match action {
            ActionRequest::ApplyScp {
                target,
                org_management_account_id,
            } => {
                let switch_config = self.switch_config.as_ref().ok_or_else(|| {
                    KillSwitchError::config("no SCP policy is configured for apply_scp")
                })?;
                let session = self.connector.connect(&region).await;
                scp::apply_scp(&session, &target, &org_management_account_id, switch_config).await
            }
            ActionRequest::DetachPolicies { target, role_name } => {
                let session = self.connector.connect(&region).await;
                role::detach_policies(&session, &target, &role_name).await
            }
            ActionRequest::DeleteRole { target, role_name } => {
                let session = self.connector.connect(&region).await;
                role::delete_role(&session, &target, &role_name).await
            }
            ActionRequest::RevokeSessions { target, scope } => {
                let session = self.connector.connect(&region).await;
                revoke::revoke_sessions(
                    &session,
                    &target,
                    &scope,
                    Utc::now(),
                    self.revoke_concurrency,
                )
                .await
            }
        }
    }
}
