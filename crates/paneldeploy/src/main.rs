use anyhow::Context;
use clap::{Parser, Subcommand};
use pd_deploy::{CertDeployer, CertificateMaterial};
use pd_panel::HttpPanelClient;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Deploy CA-issued TLS certificates into a hosting control panel
#[derive(Parser, Debug)]
#[command(name = "paneldeploy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Panel management API base URL
    #[arg(long = "url", env = "PANELDEPLOY_URL", default_value = "https://127.0.0.1:8443")]
    url: String,

    /// Directory holding the panel's administration tools
    #[arg(
        long = "bin-dir",
        env = "PANELDEPLOY_BIN_DIR",
        default_value = "/usr/local/panel/bin"
    )]
    bin_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install a certificate and bind it to the site for a domain
    Deploy {
        /// Site domain the certificate was issued for
        domain: String,

        /// Certificate PEM file
        #[arg(long)]
        cert: PathBuf,

        /// Private key PEM file
        #[arg(long)]
        key: PathBuf,

        /// Issuer chain PEM file
        #[arg(long)]
        chain: Option<PathBuf>,

        /// Also point the panel's own admin interface at this certificate
        #[arg(long = "secure-admin")]
        secure_admin: bool,
    },

    /// Remove a previously deployed certificate from the panel pool
    Remove {
        /// Site domain the certificate was deployed for
        domain: String,

        /// Certificate PEM file the pool name was derived from
        #[arg(long)]
        cert: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpPanelClient::new(cli.url, cli.bin_dir);

    match cli.command {
        Command::Deploy {
            domain,
            cert,
            key,
            chain,
            secure_admin,
        } => deploy(client, domain, &cert, &key, chain.as_deref(), secure_admin).await,
        Command::Remove { domain, cert } => remove(client, domain, &cert).await,
    }
}

async fn deploy(
    client: HttpPanelClient,
    domain: String,
    cert: &Path,
    key: &Path,
    chain: Option<&Path>,
    secure_admin: bool,
) -> anyhow::Result<()> {
    let material = CertificateMaterial {
        cert_pem: read_pem(cert)?,
        key_pem: read_pem(key)?,
        chain_pem: chain.map(read_pem).transpose()?,
    };

    let mut deployer = CertDeployer::new(client, &domain);
    deployer
        .init_cert(material)
        .with_context(|| format!("unusable certificate material for {}", domain))?;

    match deployer.save(secure_admin).await {
        Ok(()) => {
            info!(
                domain = %domain,
                name = deployer.cert_name().unwrap_or_default(),
                secured = deployer.state().secured,
                "Certificate deployed"
            );
            Ok(())
        }
        // The site deployment committed; only the admin-interface step
        // failed. Keep the certificate live and let the operator retry.
        Err(err) if deployer.state().assigned => {
            warn!(
                domain = %domain,
                error = %err,
                "Certificate deployed, but securing the panel admin interface failed"
            );
            Ok(())
        }
        Err(err) => {
            error!(domain = %domain, error = %err, "Deployment failed, rolling back");
            deployer.revert().await;
            Err(err).with_context(|| format!("failed to deploy certificate for {}", domain))
        }
    }
}

async fn remove(client: HttpPanelClient, domain: String, cert: &Path) -> anyhow::Result<()> {
    let cert_pem = read_pem(cert)?;
    let name = pd_deploy::deployed_name(&domain, &cert_pem)
        .with_context(|| format!("unusable certificate material for {}", domain))?;

    let mut deployer = CertDeployer::new(client, &domain);
    deployer
        .remove_cert(&name)
        .await
        .with_context(|| format!("failed to remove certificate {}", name))?;

    info!(domain = %domain, name = %name, "Certificate removed");
    Ok(())
}

fn read_pem(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
