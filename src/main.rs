use std::sync::Arc;

use text_to_video::backends::{
    DisabledImageBackend, ElevenLabsClient, FfmpegCompositionBackend, FileMusicProvider,
    PexelsClient, SilentNarrationBackend,
};
use text_to_video::config::AppConfig;
use text_to_video::stages::{
    ImageBackend, NarrationBackend, NarrationSynthesizer, SceneSynthesizer, SentenceSegmenter,
    TextSegmenter, VideoComposer,
};
use text_to_video::{artifacts::ArtifactStore, build_router, AppState, JobManager, Orchestrator};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize production-grade logging
    init_logging().expect("Failed to initialize logging");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = text_to_video::utils::check_ffmpeg_available() {
        tracing::warn!("⚠️ {}. Narration fallback and video composition will fail.", e);
    }

    for dir in [&config.output_dir, &config.work_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!("Failed to create directory {}: {}", dir.display(), e);
        } else {
            tracing::info!("Directory ready: {}", dir.display());
        }
    }

    let orchestrator = build_orchestrator(&config);
    let job_manager = Arc::new(JobManager::new(orchestrator, config.limits));
    tracing::info!(
        "🎬 Job manager initialized ({} workers, {} pending max)",
        config.limits.max_concurrent,
        config.limits.max_pending
    );

    // Evict old terminal jobs when a TTL is configured
    if let Some(hours) = config.job_ttl_hours {
        let manager = job_manager.clone();
        tokio::spawn(async move {
            tracing::info!("🧹 Evicting finished jobs older than {}h", hours);
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                let evicted = manager
                    .evict_terminal_jobs(chrono::Duration::hours(hours))
                    .await;
                if evicted > 0 {
                    tracing::info!("🗑️ Evicted {} old jobs", evicted);
                }
            }
        });
    }

    let shared_state = Arc::new(AppState::new(job_manager));
    let app = build_router(shared_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await.expect("Server error");
}

/// Wire stage backends from configuration; missing keys fall back to offline backends
fn build_orchestrator(config: &AppConfig) -> Orchestrator {
    let narration: Arc<dyn NarrationBackend> = match &config.eleven_labs_api_key {
        Some(api_key) => {
            tracing::info!("Initializing Eleven Labs narration client...");
            Arc::new(ElevenLabsClient::new(
                api_key.clone(),
                config.eleven_labs_voice_id.clone(),
            ))
        }
        None => {
            tracing::warn!("ELEVEN_LABS_API_KEY not found. Narration will be a silent track.");
            Arc::new(SilentNarrationBackend)
        }
    };

    let images: Arc<dyn ImageBackend> = match &config.pexels_api_key {
        Some(api_key) => {
            tracing::info!("Initializing Pexels stock media client...");
            Arc::new(PexelsClient::new(api_key.clone()))
        }
        None => {
            tracing::warn!("PEXELS_API_KEY not found. Every scene will use a placeholder image.");
            Arc::new(DisabledImageBackend)
        }
    };

    let mut composer = VideoComposer::new(Arc::new(FfmpegCompositionBackend))
        .with_cost_model(config.cost);
    if let Some(path) = &config.background_music_path {
        tracing::info!("🎵 Background music track: {}", path.display());
        composer = composer.with_background_music(Arc::new(FileMusicProvider::new(path.clone())));
    }

    Orchestrator::new(
        TextSegmenter::new(Arc::new(SentenceSegmenter), config.max_segment_length),
        NarrationSynthesizer::new(narration),
        SceneSynthesizer::new(images),
        composer,
        ArtifactStore::new(config.work_dir.clone(), config.output_dir.clone()),
    )
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment or default to INFO for production
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,text_to_video=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,text_to_video=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production (easier for log aggregation)
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎬 Text-to-video service starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    let tts_configured = std::env::var("ELEVEN_LABS_API_KEY").is_ok();
    let pexels_configured = std::env::var("PEXELS_API_KEY").is_ok();
    tracing::info!(
        "Configuration - Eleven Labs: {}, Pexels: {}",
        if tts_configured { "✅" } else { "❌" },
        if pexels_configured { "✅" } else { "❌" }
    );

    Ok(())
}
