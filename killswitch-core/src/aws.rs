use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_iam::Client as IamClient;
use aws_sdk_organizations::types::PolicyType;
use aws_sdk_organizations::Client as OrganizationsClient;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::broker::{role_arn, session_name};
use crate::cloud::{Connector, IamApi, OrganizationsApi, ProviderResult, RolePage, Session};
use crate::credentials::Credentials;
use crate::error::ProviderError;

fn provider_error<E: std::error::Error>(err: E) -> ProviderError {
    ProviderError::new(DisplayErrorContext(err).to_string())
}

/// Builds AWS sessions from the ambient environment credentials.
#[derive(Debug, Clone)]
pub struct AwsConnector {
    max_attempts: u32,
}

impl AwsConnector {
    /// `max_attempts` of 1 disables SDK retries.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Connector for AwsConnector {
    type Session = AwsSession;

    async fn connect(&self, region: &str) -> AwsSession {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts))
            .load()
            .await;

        AwsSession {
            sts: StsClient::new(&config),
            config,
        }
    }
}

pub struct AwsSession {
    config: SdkConfig,
    sts: StsClient,
}

impl Session for AwsSession {
    type Iam = AwsIam;
    type Organizations = AwsOrganizations;

    async fn assume_role(&self, account_id: &str, role_name: &str) -> ProviderResult<Credentials> {
        let role_arn = role_arn(account_id, role_name);
        let output = self
            .sts
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(session_name(Utc::now()))
            .send()
            .await
            .map_err(provider_error)?;

        let creds = output.credentials().ok_or_else(|| {
            ProviderError::new(format!("AssumeRole for {} returned no credentials", role_arn))
        })?;
        let expiration = creds.expiration();

        Ok(Credentials::new(
            account_id,
            role_name,
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token(),
            DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos()),
        ))
    }

    fn iam(&self, credentials: Credentials) -> AwsIam {
        let config = aws_sdk_iam::config::Builder::from(&self.config)
            .credentials_provider(credentials.into_provider())
            .build();
        AwsIam {
            client: IamClient::from_conf(config),
        }
    }

    fn organizations(&self, credentials: Credentials) -> AwsOrganizations {
        let config = aws_sdk_organizations::config::Builder::from(&self.config)
            .credentials_provider(credentials.into_provider())
            .build();
        AwsOrganizations {
            client: OrganizationsClient::from_conf(config),
        }
    }
}

pub struct AwsIam {
    client: IamClient,
}

impl IamApi for AwsIam {
    async fn list_attached_role_policies(&self, role_name: &str) -> ProviderResult<Vec<String>> {
        let mut arns = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .client
                .list_attached_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(provider_error)?;

            arns.extend(
                page.attached_policies()
                    .iter()
                    .filter_map(|p| p.policy_arn())
                    .map(str::to_string),
            );

            match page.marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }
        Ok(arns)
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn list_role_policies(&self, role_name: &str) -> ProviderResult<Vec<String>> {
        let mut names = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .client
                .list_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(provider_error)?;

            names.extend(page.policy_names().iter().cloned());

            match page.marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> ProviderResult<()> {
        self.client
            .delete_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> ProviderResult<()> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn create_policy(
        &self,
        policy_name: &str,
        description: &str,
        document: &str,
    ) -> ProviderResult<String> {
        let output = self
            .client
            .create_policy()
            .policy_name(policy_name)
            .description(description)
            .policy_document(document)
            .send()
            .await
            .map_err(provider_error)?;

        output
            .policy()
            .and_then(|p| p.arn())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new("CreatePolicy response missing policy ARN"))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn list_roles(&self, marker: Option<String>) -> ProviderResult<RolePage> {
        let page = self
            .client
            .list_roles()
            .set_marker(marker)
            .send()
            .await
            .map_err(provider_error)?;

        let role_names: Vec<String> = page
            .roles()
            .iter()
            .map(|role| role.role_name().to_string())
            .collect();
        debug!(count = role_names.len(), more = page.marker().is_some(), "Listed roles page");

        Ok(RolePage {
            role_names,
            next_marker: page.marker().map(str::to_string),
        })
    }
}

pub struct AwsOrganizations {
    client: OrganizationsClient,
}

impl OrganizationsApi for AwsOrganizations {
    async fn create_policy(
        &self,
        name: &str,
        description: &str,
        content: &str,
    ) -> ProviderResult<String> {
        let output = self
            .client
            .create_policy()
            .name(name)
            .description(description)
            .content(content)
            .r#type(PolicyType::ServiceControlPolicy)
            .send()
            .await
            .map_err(provider_error)?;

        output
            .policy()
            .and_then(|p| p.policy_summary())
            .and_then(|s| s.id())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new("CreatePolicy response missing policy ID"))
    }

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> ProviderResult<()> {
        self.client
            .attach_policy()
            .policy_id(policy_id)
            .target_id(target_id)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}
