use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::types::{CommandOutput, PanelError, PanelRequest, PanelResponse, PanelResult};

/// Capability interface for one management channel to the panel.
///
/// The panel session context is stateful per connection, so a client instance
/// is owned by a single deployment at a time; the `&mut self` receivers make
/// that explicit.
#[async_trait]
pub trait PanelClient: Send {
    /// Execute one structured request and decode the response envelope.
    async fn request(&mut self, request: PanelRequest) -> PanelResult<PanelResponse>;

    /// Run one of the panel's administration tools on the panel host.
    async fn execute(&mut self, program: &str, args: &[String]) -> PanelResult<CommandOutput>;
}

/// HTTP transport for the panel management API.
pub struct HttpPanelClient {
    http: reqwest::Client,
    base_url: String,
    bin_dir: PathBuf,
}

impl HttpPanelClient {
    /// `bin_dir` is the directory holding the panel's administration tools,
    /// used to resolve `execute` program names.
    pub fn new(base_url: impl Into<String>, bin_dir: impl Into<PathBuf>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            bin_dir: bin_dir.into(),
        }
    }
}

#[async_trait]
impl PanelClient for HttpPanelClient {
    async fn request(&mut self, request: PanelRequest) -> PanelResult<PanelResponse> {
        let url = format!("{}/api", self.base_url);

        debug!(operation = %request.operation, "Sending panel API request");

        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PanelError::Transport(format!("HTTP request failed: {}", e)))?;

        let response: PanelResponse = resp
            .json()
            .await
            .map_err(|e| PanelError::Transport(format!("Failed to parse response: {}", e)))?;

        Ok(response)
    }

    async fn execute(&mut self, program: &str, args: &[String]) -> PanelResult<CommandOutput> {
        let path = self.bin_dir.join(program);

        debug!(program = %path.display(), ?args, "Running panel administration tool");

        let output = tokio::process::Command::new(&path)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                PanelError::Transport(format!("Failed to run {}: {}", path.display(), e))
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
