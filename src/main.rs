use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use text_classifier::config::{AuditBackend, AuditSettings, LoggingSettings, ModelSettings, Settings, StoreKind};
use text_classifier::routes::{self, classify::AppState};
use text_classifier::services::{
    ArtifactStore, AuditLogger, AuditSink, FsArtifactStore, HttpArtifactStore, ModelCache,
    PostgresAuditSink, RedisAuditSink, SinkError, StoreError,
};
use text_classifier::{ArtifactKey, ClassificationHandler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.json().init(),
    }
}

fn build_store(model: &ModelSettings) -> Result<Arc<dyn ArtifactStore>, StoreError> {
    match model.store {
        StoreKind::Http => {
            let endpoint = model.endpoint.clone().ok_or_else(|| {
                StoreError::Config("model.endpoint is required for the http store".into())
            })?;
            let timeout = Duration::from_secs(model.timeout_secs.unwrap_or(30));
            info!("Using HTTP artifact store at {}", endpoint);
            Ok(Arc::new(HttpArtifactStore::new(endpoint, model.auth_token.clone(), timeout)?))
        }
        StoreKind::Fs => {
            let root = model.root.clone().unwrap_or_else(|| ".".to_string());
            info!("Using filesystem artifact store at {}", root);
            Ok(Arc::new(FsArtifactStore::new(root)))
        }
    }
}

async fn build_sink(audit: &AuditSettings) -> Result<Option<Arc<dyn AuditSink>>, SinkError> {
    let sink: Arc<dyn AuditSink> = match audit.backend {
        AuditBackend::None => return Ok(None),
        AuditBackend::Postgres => {
            let url = audit.database_url.as_deref().ok_or_else(|| {
                SinkError::Config("audit.database_url is required for the postgres backend".into())
            })?;
            Arc::new(
                PostgresAuditSink::new(
                    url,
                    &audit.table,
                    audit.max_connections.unwrap_or(5),
                    Duration::from_secs(audit.acquire_timeout_secs.unwrap_or(5)),
                )
                .await?,
            )
        }
        AuditBackend::Redis => {
            let url = audit.redis_url.as_deref().ok_or_else(|| {
                SinkError::Config("audit.redis_url is required for the redis backend".into())
            })?;
            Arc::new(RedisAuditSink::new(url, &audit.table, audit.ttl_secs).await?)
        }
    };

    Ok(Some(sink))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging);

    info!("Starting text classification service...");

    let store = build_store(&settings.model).map_err(|e| {
        error!("Failed to initialise artifact store: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let cache = Arc::new(ModelCache::new(store));

    // Audit is best-effort: a sink that cannot start disables auditing
    let audit = match build_sink(&settings.audit).await {
        Ok(Some(sink)) => {
            info!("Audit sink '{}' initialized (detached: {})", sink.name(), settings.audit.detached);
            AuditLogger::new(sink).detached(settings.audit.detached)
        }
        Ok(None) => {
            warn!("Audit backend is 'none', classifications will not be recorded");
            AuditLogger::disabled()
        }
        Err(e) => {
            error!("Failed to initialise audit sink ({}), running without audit logging", e);
            AuditLogger::disabled()
        }
    };

    let model = ArtifactKey::new(settings.model.bucket.clone(), settings.model.key.clone());
    info!("Serving model {}", model);

    let handler = ClassificationHandler::new(cache, audit, model)
        .expose_internal_errors(settings.server.expose_internal_errors);

    let app_state = AppState {
        handler: Arc::new(handler),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
