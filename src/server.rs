use crate::{
    actions::upload::store_upload,
    browse::Browser,
    config::Config,
    dispatch::{
        registry::ActionRegistry,
        types::{ActionRequest, Flash, FlashKind, Outcome},
    },
    errors::{AppError, AppResult},
    render::{self, EditorView, Page, Row, SearchView},
    resolver::PathResolver,
    security::{self, RateLimiters},
};
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub resolver: Arc<PathResolver>,
    pub browser: Browser,
    pub registry: Arc<ActionRegistry>,
    pub rls: RateLimiters,
}

impl AppState {
    pub fn new(cfg: Config) -> anyhow::Result<Self> {
        let resolver = Arc::new(PathResolver::new(&cfg.root.root_dir).context("resolving root_dir")?);
        let browser = Browser::new(resolver.clone(), cfg.limits.clone());
        let registry = ActionRegistry::new(&cfg, resolver.clone())?;
        let (rate, burst) = (cfg.limits.rate_per_sec, cfg.limits.rate_burst);
        Ok(Self {
            rls: RateLimiters::new(rate, burst, rate.saturating_mul(5), burst.saturating_mul(5)),
            cfg: Arc::new(cfg),
            resolver,
            browser,
            registry: Arc::new(registry),
        })
    }
}

pub async fn serve(shared: AppState) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", shared.cfg.server.bind_addr, shared.cfg.server.port)
        .parse()
        .context("parsing bind address")?;
    let app = build_router(shared);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(shared: AppState) -> Router {
    let base = shared.cfg.server.base_path.clone();
    let limit_bytes = shared.cfg.limits.max_request_kb * 1024;
    // multipart framing on top of the file itself
    let upload_bytes = shared.cfg.limits.max_upload_kb * 1024 + 64 * 1024;
    let mut router = Router::new()
        .route("/healthz", get(health))
        .route(&format!("{base}/"), get(index))
        .route(&format!("{base}/"), post(action).layer(RequestBodyLimitLayer::new(limit_bytes)))
        .route(&format!("{base}/upload"), post(upload).layer(DefaultBodyLimit::max(upload_bytes)));
    if !base.is_empty() {
        let slash = format!("{base}/");
        router = router.route(
            &base,
            get(move || {
                let slash = slash.clone();
                async move { Redirect::permanent(&slash) }
            }),
        );
    }
    router.layer(TraceLayer::new_for_http()).with_state(shared)
}

async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(()) => Json(json!({"status": "ok"})).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub dir: Option<String>,
    pub view: Option<String>,
    pub search: Option<String>,
    pub flash: Option<String>,
    pub flash_type: Option<String>,
}

async fn index(State(state): State<AppState>, headers: HeaderMap, Query(q): Query<IndexQuery>) -> Response {
    if let Err(e) = authorize(&state, &headers) {
        return e.into_response();
    }
    let resolver = state.browser.resolver();
    let mut flash = q
        .flash
        .filter(|m| !m.is_empty())
        .map(|message| Flash { message, kind: FlashKind::parse(q.flash_type.as_deref().unwrap_or("")) });

    let requested = q.dir.as_deref().unwrap_or(".");
    let dir = match resolver.contained_dir(requested) {
        Ok(path) => resolver.display(&path),
        Err(e) => {
            flash = Some(Flash::error(format!("Error: {e}")));
            ".".to_string()
        }
    };

    let search = match q.search.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => match search_view(term, state.browser.search(&dir, term).await) {
            Ok(view) => Some(view),
            Err(f) => {
                flash = Some(f);
                None
            }
        },
        _ => None,
    };

    let editor = match q.view.as_deref() {
        Some(view) => Some(EditorView {
            file: resolver.contained(view).map(|p| resolver.display(&p)).unwrap_or_else(|_| view.to_string()),
            content: state.browser.read_file(view).await.map_err(|e| e.to_string()),
        }),
        None => None,
    };

    let mut rows = Vec::new();
    if editor.is_none() {
        match state.browser.list_dir(&dir).await {
            Ok(entries) => {
                for entry in entries {
                    let preview = if entry.is_dir { None } else { state.browser.preview(&entry.display).await };
                    rows.push(Row { entry, preview });
                }
            }
            Err(e) => flash = Some(Flash::error(format!("Error: {e}"))),
        }
    }

    let page = Page { base_path: &state.cfg.server.base_path, dir: &dir, flash, search, editor, rows };
    Html(render::render(&page)).into_response()
}

async fn action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let req = ActionRequest::from_form(form);
    if let Err(e) = authorize_post(&state, &headers, state.cfg.limits.max_request_kb) {
        audit(&request_id, &req.action, "deny", e.code(), started);
        return e.into_response();
    }
    let res = state.registry.dispatch(&req).await;
    audit_result(&request_id, &req.action, &res, started);
    redirect_with_flash(&state, req.dir(), Flash::from_result(&res))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub dir: Option<String>,
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<UploadQuery>,
    multipart: Multipart,
) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let dir = q.dir.unwrap_or_else(|| ".".to_string());
    // allow for multipart framing around the file
    if let Err(e) = authorize_post(&state, &headers, state.cfg.limits.max_upload_kb + 64) {
        audit(&request_id, "upload", "deny", e.code(), started);
        return e.into_response();
    }
    let res = store_upload(&state.resolver, &dir, multipart, state.cfg.limits.max_upload_kb).await;
    audit_result(&request_id, "upload", &res, started);
    redirect_with_flash(&state, &dir, Flash::from_result(&res))
}

/// A failed search surfaces as an error flash rather than an empty result.
fn search_view(term: &str, res: AppResult<Vec<String>>) -> Result<SearchView, Flash> {
    res.map(|hits| SearchView { term: term.to_string(), hits })
        .map_err(|e| Flash::error(format!("Error: {e}")))
}

/// Post-redirect-get back to the folder the form was posted from, which is
/// re-validated so a bogus `dir` lands on the base.
fn redirect_with_flash(state: &AppState, dir: &str, flash: Flash) -> Response {
    let dir = state
        .resolver
        .contained_dir(dir)
        .map(|p| state.resolver.display(&p))
        .unwrap_or_else(|_| ".".to_string());
    let location = render::link(
        &state.cfg.server.base_path,
        &[("dir", &dir), ("flash", &flash.message), ("flash_type", flash.kind.as_str())],
    );
    Redirect::to(&location).into_response()
}

fn audit_result(request_id: &str, action: &str, res: &AppResult<Outcome>, started: Instant) {
    match res {
        Ok(out) => {
            tracing::info!(path = %out.path.display(), "{}", out.message);
            audit(request_id, action, "allow", "OK", started);
        }
        Err(e) => audit(request_id, action, "error", e.code(), started),
    }
}

fn audit(request_id: &str, action: &str, decision: &str, code: &str, started: Instant) {
    tracing::info!(
        request_id = request_id,
        action = action,
        decision = decision,
        code = code,
        duration_ms = started.elapsed().as_millis() as u64,
        "audit"
    );
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    security::require_credential(headers, &state.cfg.auth.bearer_token)?;
    let credential = security::extract_credential(headers);
    state.rls.check(credential.as_deref())?;
    Ok(())
}

fn authorize_post(state: &AppState, headers: &HeaderMap, max_kb: usize) -> Result<(), AppError> {
    authorize(state, headers)?;
    security::check_origin(headers, &state.cfg.auth.allowed_origins)?;
    security::content_length_ok(headers, max_kb)?;
    Ok(())
}
