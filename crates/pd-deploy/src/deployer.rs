use std::io::BufReader;

use pd_panel::{PanelClient, PanelRequest, PoolEntry};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::naming;
use crate::types::{CertificateMaterial, DeployError, DeployResult, DeploymentState};

/// Panel administration tool that reconfigures the admin interface.
const ADMIN_CERT_TOOL: &str = "panelctl";

const OP_POOL_LIST: &str = "certificate-pool-list";
const OP_INSTALL: &str = "certificate-install";
const OP_ASSIGN: &str = "site-set-certificate";
const OP_REMOVE: &str = "certificate-remove";

/// Deploys one certificate into a hosting panel: pool install, site
/// assignment, and optionally the panel's own admin interface.
///
/// One instance per deployment attempt. Confirmation flags only advance
/// after the panel acknowledges the corresponding operation, so [`revert`]
/// can be called unconditionally after a failed [`save`] and will undo
/// exactly what was committed.
///
/// [`save`]: CertDeployer::save
/// [`revert`]: CertDeployer::revert
pub struct CertDeployer<C: PanelClient> {
    client: C,
    domain: String,
    material: Option<CertificateMaterial>,
    cert_name: Option<String>,
    state: DeploymentState,
}

impl<C: PanelClient> CertDeployer<C> {
    pub fn new(client: C, domain: impl Into<String>) -> Self {
        Self {
            client,
            domain: domain.into(),
            material: None,
            cert_name: None,
            state: DeploymentState::default(),
        }
    }

    /// What the panel has confirmed so far.
    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Pool name computed for the captured material, once `init_cert` ran.
    pub fn cert_name(&self) -> Option<&str> {
        self.cert_name.as_deref()
    }

    /// Capture certificate material and derive its pool name.
    ///
    /// Performs no remote calls; malformed certificate or key PEM is
    /// rejected here, before any panel state is touched.
    pub fn init_cert(&mut self, material: CertificateMaterial) -> DeployResult<()> {
        let leaf = parse_leaf_der(&material.cert_pem)?;
        validate_private_key(&material.key_pem)?;

        let name = naming::cert_name(&self.domain, &leaf);
        debug!(domain = %self.domain, name = %name, "Captured certificate material");

        self.cert_name = Some(name);
        self.material = Some(material);
        Ok(())
    }

    /// Names currently registered in the panel's certificate pool, in the
    /// order the panel reports them.
    pub async fn installed_cert_names(&mut self) -> DeployResult<Vec<String>> {
        let request = PanelRequest::new(OP_POOL_LIST, json!({ "domain": self.domain }));
        let data = self.client.request(request).await?.into_result()?;

        if data.is_null() {
            return Ok(Vec::new());
        }
        let entries: Vec<PoolEntry> = serde_json::from_value(data)
            .map_err(|e| DeployError::Panel(format!("unexpected pool listing payload: {}", e)))?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    /// Upload the certificate into the panel's pool.
    ///
    /// No-op once `installed` is set; [`save`](CertDeployer::save) marks
    /// certificates it finds already present without re-uploading.
    pub async fn install_cert(&mut self) -> DeployResult<()> {
        if self.state.installed {
            return Ok(());
        }
        let name = self.require_name()?.to_string();
        let material = self.require_material()?;
        let params = json!({
            "domain": self.domain,
            "name": name,
            "certificate": material.cert_pem,
            "key": material.key_pem,
            "chain": material.chain_pem,
        });

        let request = PanelRequest::new(OP_INSTALL, params);
        self.client.request(request).await?.into_result()?;

        self.state.installed = true;
        info!(domain = %self.domain, name = %name, "Certificate installed in panel pool");
        Ok(())
    }

    /// Bind the installed certificate to the site for this domain.
    pub async fn assign_cert(&mut self) -> DeployResult<()> {
        if self.state.assigned {
            return Ok(());
        }
        let name = self.require_name()?.to_string();
        let request = PanelRequest::new(
            OP_ASSIGN,
            json!({ "domain": self.domain, "name": name }),
        );
        self.client.request(request).await?.into_result()?;

        self.state.assigned = true;
        info!(domain = %self.domain, name = %name, "Certificate assigned to site");
        Ok(())
    }

    /// Point the panel's own admin interface at the deployed certificate.
    ///
    /// Runs the panel administration tool on the panel host rather than
    /// going through the management API.
    pub async fn secure_admin(&mut self) -> DeployResult<()> {
        if self.state.secured {
            return Ok(());
        }
        let name = self.require_name()?.to_string();
        let args = vec!["--secure-admin".to_string(), name.clone()];
        let output = self.client.execute(ADMIN_CERT_TOOL, &args).await?;

        if !output.success {
            let code = output
                .code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(DeployError::Panel(format!(
                "{} failed (exit {}): {}",
                ADMIN_CERT_TOOL,
                code,
                output.stderr.trim()
            )));
        }

        self.state.secured = true;
        info!(name = %name, "Panel admin interface secured");
        Ok(())
    }

    /// Remove a certificate from the panel pool.
    ///
    /// Removal invalidates any site assignment along with the installation,
    /// so both flags clear together.
    pub async fn remove_cert(&mut self, name: &str) -> DeployResult<()> {
        let request = PanelRequest::new(
            OP_REMOVE,
            json!({ "domain": self.domain, "name": name }),
        );
        self.client.request(request).await?.into_result()?;

        self.state.installed = false;
        self.state.assigned = false;
        info!(domain = %self.domain, name = %name, "Certificate removed from panel pool");
        Ok(())
    }

    /// Commit the deployment: install, assign, and (optionally) secure the
    /// admin interface, skipping every step the panel already confirmed.
    ///
    /// A previously deployed certificate for this domain whose content no
    /// longer matches (a renewal) is removed before the fresh install. On
    /// error the remaining steps are abandoned with the flags reflecting
    /// what actually committed; call [`revert`](CertDeployer::revert) to
    /// undo those steps.
    pub async fn save(&mut self, secure: bool) -> DeployResult<()> {
        if !self.state.installed {
            let name = self.require_name()?.to_string();
            let pool = self.installed_cert_names().await?;

            if pool.iter().any(|n| *n == name) {
                debug!(name = %name, "Certificate already present in pool");
                self.state.installed = true;
            } else if let Some(stale) =
                pool.iter().find(|n| naming::name_belongs_to(n, &self.domain))
            {
                let stale = stale.clone();
                info!(old = %stale, new = %name, "Replacing renewed certificate");
                self.remove_cert(&stale).await?;
            }

            self.install_cert().await?;
        }

        self.assign_cert().await?;

        if secure {
            self.secure_admin().await?;
        }
        Ok(())
    }

    /// Undo whatever this deployment confirmed so far.
    ///
    /// Meant for unwinding after a failed [`save`](CertDeployer::save); a
    /// removal failure here is logged rather than raised so it cannot mask
    /// the error that triggered the rollback. All flags are cleared either
    /// way.
    pub async fn revert(&mut self) {
        if self.state.installed || self.state.assigned {
            if let Some(name) = self.cert_name.clone() {
                if let Err(err) = self.remove_cert(&name).await {
                    warn!(
                        domain = %self.domain,
                        name = %name,
                        error = %err,
                        "Failed to remove certificate during revert"
                    );
                }
            }
        }
        self.state = DeploymentState::default();
    }

    fn require_name(&self) -> DeployResult<&str> {
        self.cert_name.as_deref().ok_or(DeployError::NotInitialized)
    }

    fn require_material(&self) -> DeployResult<&CertificateMaterial> {
        self.material.as_ref().ok_or(DeployError::NotInitialized)
    }
}

/// Pool name a certificate would be deployed under for `domain`.
pub fn deployed_name(domain: &str, cert_pem: &str) -> DeployResult<String> {
    let leaf = parse_leaf_der(cert_pem)?;
    Ok(naming::cert_name(domain, &leaf))
}

fn parse_leaf_der(cert_pem: &str) -> DeployResult<Vec<u8>> {
    let mut reader = BufReader::new(cert_pem.as_bytes());
    match rustls_pemfile::certs(&mut reader).next() {
        Some(Ok(der)) => Ok(der.as_ref().to_vec()),
        Some(Err(e)) => Err(DeployError::InvalidMaterial(format!(
            "failed to parse certificate PEM: {}",
            e
        ))),
        None => Err(DeployError::InvalidMaterial(
            "no certificate found in PEM".to_string(),
        )),
    }
}

fn validate_private_key(key_pem: &str) -> DeployResult<()> {
    let mut reader = BufReader::new(key_pem.as_bytes());
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(DeployError::InvalidMaterial(
            "no private key found in PEM".to_string(),
        )),
        Err(e) => Err(DeployError::InvalidMaterial(format!(
            "failed to parse private key PEM: {}",
            e
        ))),
    }
}
