use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use synthscholar::{
    audio, config, script,
    types::{
        ErrorResponse, InitializeRequest, InitializeResponse, ResearchError, ResearchRequest,
        ResearchResponse, ResearchTopic,
    },
    AppState,
};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

fn port_from_env() -> Option<u16> {
    for k in ["SYNTHSCHOLAR_PORT", "PORT"] {
        if let Ok(v) = std::env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("🚀 Starting SynthScholar server");

    let app_config = config::load_app_config();
    if app_config.resolve_demo_mode() {
        info!("🎭 Running in DEMO MODE — serving pre-researched data");
    } else {
        info!("🌐 Running in production mode — live browser research");
    }

    let http_timeout = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(http_timeout))
        .connect_timeout(std::time::Duration::from_secs(connect_timeout))
        .build()?;

    let state = Arc::new(AppState::new(http_client, app_config));

    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/initialize", post(initialize_handler))
        .route("/api/research", post(research_handler))
        .route("/api/download/{filename}", get(download_handler))
        .route("/api/demo-topics", get(demo_topics_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let port: u16 = parse_port_from_args().or_else(port_from_env).unwrap_or(5000);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/SYNTHSCHOLAR_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("📍 SynthScholar listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    // The browser handle must be released on every exit path.
    state.provider.lock().await.close().await;
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "synthscholar",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "mode": if state.config.resolve_demo_mode() { "demo" } else { "production" },
    }))
}

async fn initialize_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitializeRequest>,
) -> Result<Json<InitializeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let email = request.email.trim().to_string();
    if email.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Email is required".to_string(),
            }),
        ));
    }

    let demo_mode = state.config.resolve_demo_mode();
    info!("🔄 Initializing research session...");

    let mut provider = state.provider.lock().await;
    let started = provider.initialize().await.unwrap_or(false);
    if !started {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to initialize browser session".to_string(),
            }),
        ));
    }

    // Soft failure: the session may already be usable without a fresh login.
    let authenticated = provider.authenticate(&email).await.unwrap_or(false);
    if !authenticated {
        warn!("⚠️ Login could not be confirmed; continuing with the existing session");
    }

    Ok(Json(InitializeResponse {
        success: true,
        message: if demo_mode {
            "Research session initialized in demo mode".to_string()
        } else if authenticated {
            "Research session initialized".to_string()
        } else {
            "Research session initialized; login unconfirmed".to_string()
        },
        demo_mode,
    }))
}

async fn research_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, (StatusCode, Json<ErrorResponse>)> {
    let topic = ResearchTopic::new(&request.topic).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    info!("🎯 Processing research topic: {}", topic);

    let sections = {
        let mut provider = state.provider.lock().await;
        provider.research(&topic).await
    }
    .map_err(|e| match e {
        ResearchError::NoFindings => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Research produced no usable findings. Please try a different topic."
                    .to_string(),
            }),
        ),
        ResearchError::SessionFault(cause) => {
            error!("❌ Research session fault: {:#}", cause);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Could not start research. Please try again.".to_string(),
                }),
            )
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: other.to_string(),
            }),
        ),
    })?;

    info!("✍️ Synthesizing narration script...");
    let narration = script::synthesize_script(&state, &topic, &sections).await;

    info!("🔊 Rendering audio...");
    let audio_path = audio::render_narration(&state, &narration).await.map_err(|e| {
        error!("❌ Audio generation failed: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Audio generation failed".to_string(),
            }),
        )
    })?;

    let filename = audio_path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let preview: String = narration.chars().take(400).collect();

    Ok(Json(ResearchResponse {
        success: true,
        topic: topic.as_str().to_string(),
        audio_url: format!("/api/download/{}", filename),
        script_preview: if narration.chars().count() > 400 {
            format!("{}...", preview)
        } else {
            preview
        },
        script_length: narration.chars().count(),
        research_summary: format!("Researched {} key aspects", sections.len()),
        demo_mode: state.config.resolve_demo_mode(),
    }))
}

async fn download_handler(
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    // Artifacts are flat uuid-named files; anything with a path separator is
    // not ours.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid filename".to_string(),
            }),
        ));
    }

    let path = std::env::temp_dir().join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((
            [
                (header::CONTENT_TYPE, "audio/mpeg".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"synthscholar_research.mp3\"".to_string(),
                ),
            ],
            bytes,
        )),
        Err(_) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Audio file not found".to_string(),
            }),
        )),
    }
}

async fn demo_topics_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "topics": [
            {"id": "ai", "name": "Artificial Intelligence", "description": "AI benefits and challenges"},
            {"id": "climate", "name": "Climate Change Solutions", "description": "Renewable energy and sustainability"},
            {"id": "quantum", "name": "Quantum Computing", "description": "Next-gen computing revolution"},
            {"id": "biotech", "name": "Biotechnology", "description": "Medical and agricultural advances"}
        ]
    }))
}
