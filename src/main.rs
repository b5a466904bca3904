use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use yatube::openapi::ApiDoc;
use yatube::repo::Repo;
use yatube::storage::build_image_store;
use yatube::{config, AppState, SecurityHeaders, Settings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment itself.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping yatube server");
    let settings = Settings::from_env();

    let repo = match build_repo(&settings).await {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Failed to initialise storage: {e:#}");
            std::process::exit(1);
        }
    };
    let image_store = build_image_store(&settings)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let openapi = ApiDoc::openapi();
    info!("OpenAPI document generated");

    let bind = (settings.bind_addr.clone(), settings.port);
    let security = SecurityHeaders::from_settings(&settings);
    let cors_origins = settings.cors_origins.clone();
    let state = web::Data::new(AppState::new(repo, image_store, settings));
    info!(
        ttl_secs = state.page_cache.ttl().as_secs(),
        max_entries = state.page_cache.max_entries(),
        "index page cache ready"
    );

    let server = HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |c, origin| c.allowed_origin(origin))
            .allow_any_header()
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(state.clone())
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
            .configure(config)
    })
    .bind(bind.clone())?;

    info!("Listening on http://{}:{}", bind.0, bind.1);

    server.run().await
}

#[cfg(feature = "postgres-store")]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    use yatube::repo::pg::PgRepo;

    let db_url = settings
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
    let pool = PgPoolOptions::new().max_connections(5).connect(db_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(PgRepo::new(pool)))
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use yatube::repo::inmem::InMemRepo;

    Ok(match &settings.data_dir {
        Some(dir) => {
            info!("Using in-memory repository backend with snapshot in '{}'", dir.display());
            Arc::new(InMemRepo::with_snapshot(dir.join("yatube.json")))
        }
        None => {
            info!("Using in-memory repository backend");
            Arc::new(InMemRepo::new())
        }
    })
}

/// Validate that required environment variables are set
fn validate_env_vars() {
    use std::env;

    let Ok(secret) = env::var("JWT_SECRET") else {
        eprintln!("Missing required environment variable: JWT_SECRET");
        eprintln!("Please copy .env.example to .env and configure it");
        std::process::exit(1);
    };
    if secret.len() < 32 {
        eprintln!("JWT_SECRET must be at least 32 characters long for security");
        std::process::exit(1);
    }
}
