use async_trait::async_trait;
use pd_deploy::{CertDeployer, CertificateMaterial};
use pd_panel::{CommandOutput, PanelClient, PanelRequest, PanelResponse, PanelResult};
use std::sync::{Arc, Mutex};

/// Everything the deployer asked the panel to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PanelCall {
    Request(String),
    Command(String, Vec<String>),
}

/// Panel stand-in that behaves like a live pool: install and remove mutate
/// the pool listing, so consecutive deployments observe each other.
struct FakePanel {
    pool: Vec<String>,
    calls: Arc<Mutex<Vec<PanelCall>>>,
}

impl FakePanel {
    fn new(calls: Arc<Mutex<Vec<PanelCall>>>, pool: Vec<String>) -> Self {
        Self { pool, calls }
    }
}

#[async_trait]
impl PanelClient for FakePanel {
    async fn request(&mut self, request: PanelRequest) -> PanelResult<PanelResponse> {
        self.calls
            .lock()
            .unwrap()
            .push(PanelCall::Request(request.operation.clone()));

        match request.operation.as_str() {
            "certificate-pool-list" => {
                let entries: Vec<_> = self
                    .pool
                    .iter()
                    .map(|n| serde_json::json!({ "name": n }))
                    .collect();
                Ok(PanelResponse::ok(serde_json::Value::Array(entries)))
            }
            "certificate-install" => {
                let name = request.params["name"].as_str().unwrap().to_string();
                self.pool.push(name);
                Ok(PanelResponse::ok(serde_json::Value::Null))
            }
            "certificate-remove" => {
                let name = request.params["name"].as_str().unwrap();
                self.pool.retain(|n| n != name);
                Ok(PanelResponse::ok(serde_json::Value::Null))
            }
            "site-set-certificate" => Ok(PanelResponse::ok(serde_json::Value::Null)),
            other => Ok(PanelResponse::error(format!("unknown operation {}", other))),
        }
    }

    async fn execute(&mut self, program: &str, args: &[String]) -> PanelResult<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push(PanelCall::Command(program.to_string(), args.to_vec()));
        Ok(CommandOutput {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn material_for(domain: &str) -> CertificateMaterial {
    let key = rcgen::KeyPair::generate().unwrap();
    let params = rcgen::CertificateParams::new(vec![domain.to_string()]).unwrap();
    let cert = params.self_signed(&key).unwrap();
    CertificateMaterial {
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
        chain_pem: None,
    }
}

fn requests(calls: &Arc<Mutex<Vec<PanelCall>>>) -> Vec<PanelCall> {
    calls.lock().unwrap().clone()
}

#[tokio::test]
async fn test_fresh_domain_full_deployment() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let panel = FakePanel::new(calls.clone(), Vec::new());

    let mut deployer = CertDeployer::new(panel, "example.com");
    deployer.init_cert(material_for("example.com")).unwrap();
    deployer.save(true).await.unwrap();

    let name = deployer.cert_name().unwrap().to_string();
    assert_eq!(
        requests(&calls),
        vec![
            PanelCall::Request("certificate-pool-list".to_string()),
            PanelCall::Request("certificate-install".to_string()),
            PanelCall::Request("site-set-certificate".to_string()),
            PanelCall::Command(
                "panelctl".to_string(),
                vec!["--secure-admin".to_string(), name]
            ),
        ]
    );
    let state = deployer.state();
    assert!(state.installed && state.assigned && state.secured);
}

#[tokio::test]
async fn test_renewal_replaces_previous_deployment() {
    let calls = Arc::new(Mutex::new(Vec::new()));

    // first deployment
    let panel = FakePanel::new(calls.clone(), Vec::new());
    let mut deployer = CertDeployer::new(panel, "example.com");
    deployer.init_cert(material_for("example.com")).unwrap();
    deployer.save(false).await.unwrap();
    let old_name = deployer.cert_name().unwrap().to_string();
    let pool = deployer.installed_cert_names().await.unwrap();
    assert_eq!(pool, vec![old_name.clone()]);

    // renewal with fresh material against the same pool
    calls.lock().unwrap().clear();
    let panel = FakePanel::new(calls.clone(), pool);
    let mut deployer = CertDeployer::new(panel, "example.com");
    deployer.init_cert(material_for("example.com")).unwrap();
    deployer.save(false).await.unwrap();

    let new_name = deployer.cert_name().unwrap().to_string();
    assert_ne!(new_name, old_name);
    assert_eq!(
        requests(&calls),
        vec![
            PanelCall::Request("certificate-pool-list".to_string()),
            PanelCall::Request("certificate-remove".to_string()),
            PanelCall::Request("certificate-install".to_string()),
            PanelCall::Request("site-set-certificate".to_string()),
        ]
    );
    assert_eq!(deployer.installed_cert_names().await.unwrap(), vec![new_name]);
}

#[tokio::test]
async fn test_rerun_against_current_panel_uploads_nothing() {
    let calls = Arc::new(Mutex::new(Vec::new()));

    let panel = FakePanel::new(calls.clone(), Vec::new());
    let mut deployer = CertDeployer::new(panel, "example.com");
    let material = material_for("example.com");
    deployer.init_cert(material.clone()).unwrap();
    deployer.save(false).await.unwrap();
    let pool = deployer.installed_cert_names().await.unwrap();

    // same material, fresh process: the pool entry is recognized as current
    calls.lock().unwrap().clear();
    let panel = FakePanel::new(calls.clone(), pool);
    let mut deployer = CertDeployer::new(panel, "example.com");
    deployer.init_cert(material).unwrap();
    deployer.save(false).await.unwrap();

    assert_eq!(
        requests(&calls),
        vec![
            PanelCall::Request("certificate-pool-list".to_string()),
            PanelCall::Request("site-set-certificate".to_string()),
        ]
    );
    assert!(deployer.state().installed);
}

#[tokio::test]
async fn test_revert_leaves_pool_empty() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let panel = FakePanel::new(calls.clone(), Vec::new());

    let mut deployer = CertDeployer::new(panel, "example.com");
    deployer.init_cert(material_for("example.com")).unwrap();
    deployer.save(false).await.unwrap();

    deployer.revert().await;

    assert_eq!(deployer.state(), pd_deploy::DeploymentState::default());
    assert_eq!(deployer.installed_cert_names().await.unwrap(), Vec::<String>::new());
}
