pub mod aws;
pub mod broker;
pub mod cloud;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod revoke;
pub mod role;
pub mod scp;


pub use aws::AwsConnector;
pub use config::{PolicySource, Settings, SwitchConfig};
pub use credentials::Credentials;
pub use engine::Engine;
pub use error::{KillSwitchError, ProviderError, Result};
