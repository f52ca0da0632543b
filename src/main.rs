use std::sync::Arc;

use tracing::{error, info, warn};

use classdrive::auth::{
    GoogleIdentityProvider, IdentityProvider, ServiceAccount, ServiceCredentials, StaticToken,
};
use classdrive::drive::{DriveConnector, HttpDriveConnector, MemoryConnector, MemoryDrive};
use classdrive::web::{AppState, WebServer};
use classdrive::{Config, Database};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let mut config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = classdrive::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        classdrive::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> classdrive::Result<()> {
    config.validate()?;
    info!("classdrive starting");

    let db = Database::open(&config.database.path).await?;
    info!(path = %config.database.path, "Database ready");

    let http = reqwest::Client::new();
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(GoogleIdentityProvider::new(&config.oauth, http.clone())?);

    let (connector, service_credentials): (
        Arc<dyn DriveConnector>,
        Option<Arc<dyn ServiceCredentials>>,
    ) = match config.drive.backend.as_str() {
        "memory" => {
            warn!("Using the in-memory drive, nothing is persisted");
            let drive = Arc::new(MemoryDrive::new());
            (
                Arc::new(MemoryConnector::new(drive)) as Arc<dyn DriveConnector>,
                Some(Arc::new(StaticToken::new("memory")) as Arc<dyn ServiceCredentials>),
            )
        }
        _ => {
            let service = ServiceAccount::from_config(&config.service_account, http.clone())?;
            match &service {
                Some(account) => info!(account = %account.client_email(), "Service account loaded"),
                None => warn!("No service account configured, student uploads are disabled"),
            }
            (
                Arc::new(HttpDriveConnector::new(http, &config.drive)) as Arc<dyn DriveConnector>,
                service.map(|s| Arc::new(s) as Arc<dyn ServiceCredentials>),
            )
        }
    };

    if config.oauth.allowed_teachers.is_empty() {
        warn!("oauth.allowed_teachers is empty, no teacher can log in");
    }

    let state = Arc::new(AppState::new(
        db,
        &config,
        identity,
        connector,
        service_credentials,
    ));
    let server = WebServer::new(&config.web, state)?;
    info!("Web server configured on {}", server.addr());

    server.run().await?;
    Ok(())
}
