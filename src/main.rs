use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use beacon::auth::{self, AuthStorage, oauth};
use beacon::config::WorkspaceConfig;
use beacon::consts::{DEFAULT_SERVICE_NAME, DEFAULT_TENANT, default_db_path};
use beacon::control::azure::AzureControlPlane;
use beacon::logging::init_logging;
use beacon::toggle;

#[derive(Parser)]
#[command(
    name = "beacon",
    version,
    about = "Enable Application Insights on a deployed Azure ML web service."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Name of the deployed web service
    #[arg(short, long, default_value = DEFAULT_SERVICE_NAME)]
    service: String,

    /// Workspace config file (default: search for config.json upwards from the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database for stored credentials (default: ~/.beacon/beacon.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log in to Azure and store the credentials
    Login {
        /// Azure AD tenant (id or domain)
        #[arg(long, default_value = DEFAULT_TENANT)]
        tenant: String,

        /// Store a service principal instead of logging in interactively
        #[arg(long, default_value_t = false)]
        service_principal: bool,

        /// Application (client) id of the service principal
        #[arg(long)]
        client_id: Option<String>,
    },
    /// Remove stored credentials
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db_path = cli.db.clone().unwrap_or_else(default_db_path);
    let db_path = db_path.to_string_lossy().into_owned();

    match cli.command {
        Some(Command::Login {
            tenant,
            service_principal,
            client_id,
        }) => {
            return match (service_principal, client_id) {
                (true, Some(client_id)) => {
                    handle_login_service_principal(&db_path, &tenant, &client_id).await
                }
                (true, None) => anyhow::bail!("--service-principal requires --client-id"),
                (false, _) => handle_login(&db_path, &tenant).await,
            };
        }
        Some(Command::Logout) => {
            auth::logout(&db_path)?;
            eprintln!("✓ Logged out from Azure.");
            return Ok(());
        }
        None => {}
    }

    let workspace = match &cli.config {
        Some(path) => WorkspaceConfig::from_file(path)?,
        None => {
            let cwd = std::env::current_dir().context("cannot determine current directory")?;
            WorkspaceConfig::discover(&cwd)?
        }
    };
    tracing::debug!(workspace = %workspace.workspace_name, "loaded workspace config");

    let storage = AuthStorage::open(&db_path)?;
    let token = auth::require_token(&storage).await?;
    let plane = AzureControlPlane::new(token);

    let confirmation = toggle::run(&plane, &workspace, &cli.service).await?;
    println!("{confirmation}");
    Ok(())
}

async fn handle_login(db_path: &str, tenant: &str) -> anyhow::Result<()> {
    eprintln!("Logging in to Azure...\n");

    let (url, verifier) = oauth::build_authorize_url(tenant);

    // Try to open browser, silently ignore failures (e.g. headless/SSH)
    let _ = open::that(&url);

    eprintln!("Open this URL to authenticate:\n");
    eprintln!("  {url}\n");
    eprintln!("After signing in the browser lands on a localhost page that fails to load.");
    eprint!("Paste its full URL (or just the code): ");
    io::stderr().flush()?;

    let mut pasted = String::new();
    io::stdin().read_line(&mut pasted)?;

    eprintln!("\nExchanging code for tokens...");
    auth::login(db_path, tenant, &pasted, &verifier).await?;

    eprintln!("✓ Logged in to Azure successfully!");
    eprintln!("  Credentials saved to {db_path}");
    Ok(())
}

async fn handle_login_service_principal(
    db_path: &str,
    tenant: &str,
    client_id: &str,
) -> anyhow::Result<()> {
    eprint!("Client secret for {client_id}: ");
    io::stderr().flush()?;
    let mut secret = String::new();
    io::stdin().read_line(&mut secret)?;

    auth::login_service_principal(db_path, tenant, client_id, secret.trim()).await?;

    eprintln!("✓ Service principal {client_id} saved to {db_path}");
    Ok(())
}
