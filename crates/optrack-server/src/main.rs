//! Server binary: session pipeline plus HTTP/WS surface.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use optrack_media::ClipEncoder;
use optrack_ml_client::{GeminiPlacement, RemoteDetector};
use optrack_server::{
    router, AppState, ArtifactSink, ClipSink, DetectorBackend, HttpFrameSource, NullSink,
    PlacementBackend, ServerConfig, Session, SessionConfig,
};
use optrack_storage::R2Client;
use optrack_vision::{Detector, MaskPlacement, PlacementStrategy, StubDetector};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("optrack=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting optrack-server");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Server config: host={}, port={}, session={}",
        config.host, config.port, config.session_id
    );

    let detector: Arc<dyn Detector> = match config.detector_backend {
        DetectorBackend::Remote => match RemoteDetector::from_env() {
            Ok(detector) => Arc::new(detector),
            Err(e) => {
                error!("Failed to create detector client: {}", e);
                std::process::exit(1);
            }
        },
        DetectorBackend::Stub => {
            warn!("Using stub detector, no real detections will be produced");
            Arc::new(StubDetector::empty())
        }
    };

    let placement: Arc<dyn PlacementStrategy> = match config.placement_backend {
        PlacementBackend::Mask => Arc::new(MaskPlacement::new(
            config.mask_range,
            config.confidence_threshold,
        )),
        PlacementBackend::Semantic => match GeminiPlacement::from_env() {
            Ok(placement) => Arc::new(placement),
            Err(e) => {
                error!("Failed to create semantic placement client: {}", e);
                std::process::exit(1);
            }
        },
    };

    // Clip persistence needs both FFmpeg and R2; without either the
    // session still runs, reports just never gain artifact references.
    let sink: Arc<dyn ArtifactSink> = match build_clip_sink(&config.session_id).await {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!("Clip persistence disabled: {}", e);
            Arc::new(NullSink)
        }
    };

    let state = AppState::new(config.clone());

    let session = Session::new(
        SessionConfig {
            report_interval: config.report_interval,
            clip_interval: config.clip_interval,
            confidence_threshold: config.confidence_threshold,
            max_consecutive_failures: config.max_consecutive_failures,
        },
        detector,
        placement,
        sink,
        Arc::clone(&state.tracker),
        state.events(),
        state.latest_report_slot(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let source = HttpFrameSource::new(config.frame_source_url.clone(), config.frame_rate);
    let session_handle = tokio::spawn(async move {
        if let Err(e) = session.run(Box::new(source), shutdown_rx).await {
            error!("Session failed: {}", e);
        }
    });

    let app = router(state);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .expect("Invalid bind address");
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    let _ = shutdown_tx.send(true);
    let _ = session_handle.await;
    info!("Server shutdown complete");
}

async fn build_clip_sink(session_id: &str) -> anyhow::Result<ClipSink> {
    let encoder = ClipEncoder::new()?;
    let storage = R2Client::from_env().await?;
    Ok(ClipSink::new(encoder, storage, session_id))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
