use crate::credentials::Credentials;
use crate::error::ProviderError;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// `next_marker` is `None` on the last page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePage {
    pub role_names: Vec<String>,
    pub next_marker: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: Session;

    async fn connect(&self, region: &str) -> Self::Session;
}

#[allow(async_fn_in_trait)]
pub trait Session {
    type Iam: IamApi;
    type Organizations: OrganizationsApi;

    async fn assume_role(&self, account_id: &str, role_name: &str)
        -> ProviderResult<Credentials>;

    /// Consumes the credentials; each client gets its own assumption.
    fn iam(&self, credentials: Credentials) -> Self::Iam;

    fn organizations(&self, credentials: Credentials) -> Self::Organizations;
}

#[allow(async_fn_in_trait)]
pub trait IamApi {
    async fn list_attached_role_policies(&self, role_name: &str) -> ProviderResult<Vec<String>>;

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()>;

    async fn list_role_policies(&self, role_name: &str) -> ProviderResult<Vec<String>>;

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> ProviderResult<()>;

    async fn delete_role(&self, role_name: &str) -> ProviderResult<()>;

    async fn create_policy(
        &self,
        policy_name: &str,
        description: &str,
        document: &str,
    ) -> ProviderResult<String>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()>;

    async fn list_roles(&self, marker: Option<String>) -> ProviderResult<RolePage>;
}

#[allow(async_fn_in_trait)]
pub trait OrganizationsApi {
    async fn create_policy(
        &self,
        name: &str,
        description: &str,
        content: &str,
    ) -> ProviderResult<String>;

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> ProviderResult<()>;
}
