use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inventory_ledger::alert::{AlertDispatcher, HttpMailer};
use inventory_ledger::api::{self, AppState};
use inventory_ledger::config::AppConfig;
use inventory_ledger::crypto::SignatureService;
use inventory_ledger::database::Database;
use inventory_ledger::ledger::{ChainVerifier, LedgerEntryFactory};
use inventory_ledger::scheduler::VerificationScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting inventory audit ledger");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded");
    if config.uses_insecure_secret() {
        warn!("Running with the insecure default signing key");
    }

    // Initialize database
    let database = Database::connect(&config.database_url).await?;
    info!("Database connected");

    // Run migrations
    database.run_migrations().await?;
    info!("Database migrations completed");

    // Wire the ledger components
    let signer = Arc::new(SignatureService::new(&config.hmac_secret));
    let factory = Arc::new(LedgerEntryFactory::new(
        database.clone(),
        Arc::clone(&signer),
    ));
    let verifier = ChainVerifier::new(database.clone(), Arc::clone(&signer));

    let dispatcher = match &config.alert {
        Some(alert_config) => match HttpMailer::new(alert_config.clone()) {
            Ok(mailer) => {
                info!("Tamper alerting enabled via {}", alert_config.api_url);
                AlertDispatcher::new(Some(Arc::new(mailer)))
            }
            Err(e) => {
                warn!("Failed to build alert mailer, alerting disabled: {}", e);
                AlertDispatcher::disabled()
            }
        },
        None => {
            info!("No alert channel configured, tamper alerting disabled");
            AlertDispatcher::disabled()
        }
    };

    // Start scheduled verification
    let scheduler = Arc::new(VerificationScheduler::with_schedule(
        verifier.clone(),
        dispatcher,
        Duration::from_secs(config.verification_interval_secs),
        Duration::from_secs(5),
    ));
    scheduler.start();

    // Build application
    let state = AppState {
        config: config.clone(),
        database,
        factory,
        verifier,
        scheduler,
    };
    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .into_inner(),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
