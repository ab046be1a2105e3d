use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use fortune_core::{CoreConfig, Fortune};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod identity;
mod routes;

use identity::{IDENTITY_ID_HEADER, IDENTITY_NAME_HEADER};

pub struct AppState {
    pub fortune: Fortune,
    pub gateway_key: String,
}

/// Listener and edge settings; everything the core needs lives in [`CoreConfig`].
struct ServerSettings {
    bind: String,
    gateway_key: String,
    webapp_origin: Option<String>,
}

impl ServerSettings {
    fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            bind: var("BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            gateway_key: var("GATEWAY_KEY").unwrap_or_else(|| "dev-key".into()),
            webapp_origin: var("WEBAPP_ORIGIN"),
        }
    }
}

fn cors(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let allow_origin = match origin {
        Some(origin) => AllowOrigin::exact(HeaderValue::from_str(origin)?),
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(IDENTITY_ID_HEADER),
            HeaderName::from_static(IDENTITY_NAME_HEADER),
        ]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CoreConfig::from_env()?;
    let settings = ServerSettings::from_env();
    if config.admin_ids.is_empty() {
        warn!("ADMIN_IDS is empty; only existing roster members can use the admin surface");
    }
    if settings.gateway_key == "dev-key" {
        warn!("GATEWAY_KEY not set, using the development key");
    }

    let fortune = Fortune::open(&config).await?;
    let state = Arc::new(AppState {
        fortune,
        gateway_key: settings.gateway_key,
    });

    let app = routes::router(state).layer(cors(settings.webapp_origin.as_deref())?);

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(
        bind = %settings.bind,
        min_active = config.bounds.min_active,
        max_active = config.bounds.max_active,
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
