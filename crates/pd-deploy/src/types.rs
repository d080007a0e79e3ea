use pd_panel::PanelError;
use thiserror::Error;

/// PEM material for one deployment, captured once at `init_cert` and held
/// for the lifetime of the deployer instance.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    pub cert_pem: String,
    pub key_pem: String,
    pub chain_pem: Option<String>,
}

/// What the panel has confirmed for the current deployment attempt.
///
/// Each flag turns true only after the corresponding operation succeeded, so
/// after a mid-deployment failure the flags describe exactly what is
/// committed on the panel side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploymentState {
    pub installed: bool,
    pub assigned: bool,
    pub secured: bool,
}

#[derive(Error, Debug)]
pub enum DeployError {
    /// Certificate or key material did not parse.
    #[error("invalid certificate material: {0}")]
    InvalidMaterial(String),

    /// A remote-facing operation was called before `init_cert`.
    #[error("certificate material not initialized")]
    NotInitialized,

    /// The panel rejected an operation or could not be reached.
    #[error("panel operation failed: {0}")]
    Panel(String),
}

impl From<PanelError> for DeployError {
    fn from(err: PanelError) -> Self {
        // Logical and transport failures collapse into one kind; callers get
        // the panel's own message whenever it supplied one.
        match err {
            PanelError::Api(msg) | PanelError::Transport(msg) => DeployError::Panel(msg),
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
