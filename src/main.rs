// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cognito_api_server::{
    api::router,
    auth::{KeySetCache, KeySetRefresher, SignatureAuthenticator, TokenVerifier},
    config::Config,
    identity::CognitoClient,
    state::AppState,
    telemetry,
};

/// How long in-flight requests may run after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "server failed");
        eprintln!("cognito-api-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    telemetry::init_tracing(config.log_format)?;

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let keys = KeySetCache::from_url(config.cognito.jwks_url())?;
    let verifier = TokenVerifier::new(keys.clone(), config.cognito.issuer());
    match keys.prime().await {
        Ok(count) => info!(key_count = count, "JWKS cache primed"),
        Err(e) => warn!(error = %e, "could not prime JWKS cache, retrying on demand"),
    }

    let identity = CognitoClient::new(
        &config.cognito.region,
        config.cognito.client_id.clone(),
        config.cognito.client_secret.clone(),
    )?;
    let signer = SignatureAuthenticator::new(
        config.signing.credentials.clone(),
        config.signing.region.clone(),
        config.signing.service.clone(),
    );
    if config.signing.credentials.is_empty() {
        warn!("no signing credentials configured, signed routes will reject every request");
    }

    let state = AppState::new(verifier, Arc::new(identity), signer);
    let app = router(state);

    let shutdown = CancellationToken::new();
    let handle: Handle<SocketAddr> = Handle::new();

    tokio::spawn(KeySetRefresher::new(keys).run(shutdown.clone()));
    tokio::spawn(cancel_on_signal(shutdown.clone()));
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let addr = config.bind_addr()?;
    let served = match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
            info!(%addr, "Cognito API server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            info!(%addr, "Cognito API server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    served?;
    info!("server stopped");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
    shutdown.cancel();
}
