use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, StatusCode},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    TravelianError,
    api::{self, AppState},
    config::{ServerConfig, TravelianConfig},
    llm::TextGenerator,
};

fn cors(origins: &[String]) -> crate::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| TravelianError::config(format!("Invalid allowed origin: {origin}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Full application router with middleware
pub fn app(server: &ServerConfig, state: AppState) -> crate::Result<Router> {
    let mut app = api::router(state);
    if let Some(dir) = &server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app
        .layer(RequestBodyLimitLayer::new(server.body_limit_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_seconds),
        ))
        .layer(cors(&server.allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

pub async fn run(
    config: &TravelianConfig,
    generator: Arc<dyn TextGenerator>,
) -> crate::Result<()> {
    let server = &config.server;
    let state = AppState::new(generator, config.planner.clone());
    let app = app(server, state)?;
    let addr = format!("{}:{}", server.host, server.port);

    match (&server.tls_cert_path, &server.tls_key_path) {
        (Some(cert), Some(key)) => serve_tls(app, &addr, cert, key).await,
        (None, None) => {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Web server running at http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Web server stopped");
            Ok(())
        }
        _ => Err(TravelianError::general(
            "TLS needs both tls_cert_path and tls_key_path",
        )),
    }
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: &str, cert: &str, key: &str) -> crate::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| TravelianError::config(format!("Invalid listen address {addr}: {e}")))?;
    let tls = RustlsConfig::from_pem_file(cert, key).await?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(socket_addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    info!("Web server stopped");
    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_app: Router, _addr: &str, _cert: &str, _key: &str) -> crate::Result<()> {
    Err(TravelianError::general(
        "TLS certificates configured but the binary was built without the `tls` feature",
    ))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_rejects_invalid_origin() {
        let origins = vec!["http://localhost:3000".to_string(), "bad\norigin".to_string()];
        assert!(cors(&origins).is_err());
        assert!(cors(&origins[..1]).is_ok());
    }
}
