//! Certificate deployment for hosting control panels
//!
//! This crate is the deployment state machine between a CA client and a
//! panel's management API: it installs a certificate into the panel's
//! certificate pool, binds it to a site, optionally secures the panel's own
//! admin interface, and can commit or roll back those steps as a unit. All
//! durable state lives in the panel; an instance only tracks what the panel
//! has confirmed for the current attempt.

mod deployer;
pub mod naming;
pub mod types;

pub use deployer::{CertDeployer, deployed_name};
pub use types::{CertificateMaterial, DeployError, DeployResult, DeploymentState};
