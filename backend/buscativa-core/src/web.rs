// src/web.rs
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use std::io::ErrorKind;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::AppError;
use crate::ledger::{self, AbsenceForm, Ledger};
use crate::monitors::MonitorDirectory;
use crate::notifier::{Notifier, NotifyOutcome};
use crate::pages::{self, StatusView};
use crate::pipeline::register_absence;
use crate::session::{
    clear_cookie, set_cookie, Flash, FlashLevel, SessionIdentity, SessionKeys, FLASH_COOKIE,
    SESSION_COOKIE,
};

const FLASH_MAX_AGE_SECS: u64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub monitors: Arc<MonitorDirectory>,
    pub ledger: Arc<Ledger>,
    pub notifier: Arc<Notifier>,
    pub sessions: Arc<SessionKeys>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/login", get(handle_login_page).post(handle_login))
        .route("/logout", get(handle_logout))
        .route("/registro", get(handle_registro_page).post(handle_registro))
        .route("/baixar", get(handle_download))
        .route("/status", get(handle_status))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    usuario: String,
    #[serde(default)]
    senha: String,
}

// --- Response helpers ---

fn flash_cookie(flash: &Flash) -> HeaderValue {
    set_cookie(FLASH_COOKIE, &flash.encode(), FLASH_MAX_AGE_SECS)
}

fn redirect_with(location: &str, cookies: &[HeaderValue]) -> Response {
    let mut response = Redirect::to(location).into_response();
    for cookie in cookies {
        response
            .headers_mut()
            .append(header::SET_COOKIE, cookie.clone());
    }
    response
}

/// Renders a page and consumes the pending flash, if any.
fn render_page(html: String, flash: Option<&Flash>) -> Response {
    let mut response = Html(html).into_response();
    if flash.is_some() {
        response
            .headers_mut()
            .append(header::SET_COOKIE, clear_cookie(FLASH_COOKIE));
    }
    response
}

fn content_disposition(file_name: &str) -> HeaderValue {
    let ascii_name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' { c } else { '_' })
        .collect();
    let mut encoded = String::new();
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_name, encoded
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// --- Handlers ---

async fn handle_index(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if state.sessions.identity_from_headers(&headers).is_some() {
        Redirect::to("/registro")
    } else {
        Redirect::to("/login")
    }
}

async fn handle_login_page(headers: HeaderMap) -> Response {
    let flash = Flash::from_headers(&headers);
    render_page(pages::login_page(flash.as_ref()), flash.as_ref())
}

async fn handle_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.usuario.trim();
    match state.monitors.authenticate(username, form.senha.trim())? {
        Some(profile) => {
            info!("Monitor {} logged in", profile.username);
            let identity = SessionIdentity::from(profile);
            let token = state.sessions.issue(&identity)?;
            Ok(redirect_with(
                "/registro",
                &[
                    set_cookie(SESSION_COOKIE, &token, state.sessions.ttl_secs()),
                    flash_cookie(&Flash::new(FlashLevel::Success, "Login feito com sucesso")),
                ],
            ))
        }
        None => {
            info!("Rejected login for '{}'", username);
            Ok(redirect_with(
                "/login",
                &[flash_cookie(&Flash::new(
                    FlashLevel::Danger,
                    "Usuário ou senha inválidos",
                ))],
            ))
        }
    }
}

async fn handle_logout() -> Response {
    redirect_with(
        "/login",
        &[
            clear_cookie(SESSION_COOKIE),
            flash_cookie(&Flash::new(FlashLevel::Info, "Desconectado")),
        ],
    )
}

async fn handle_registro_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(identity) = state.sessions.identity_from_headers(&headers) else {
        return Redirect::to("/login").into_response();
    };
    let flash = Flash::from_headers(&headers);
    render_page(pages::registro_page(&identity, flash.as_ref()), flash.as_ref())
}

async fn handle_registro(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AbsenceForm>,
) -> Result<Response, AppError> {
    let Some(identity) = state.sessions.identity_from_headers(&headers) else {
        return Ok(Redirect::to("/login").into_response());
    };

    let registration = register_absence(&state.ledger, &state.notifier, &identity, form).await?;
    if let NotifyOutcome::Failed(_) = &registration.notification {
        debug!(
            "Absence kept in {} without notification",
            registration.recorded.ledger_path.display()
        );
    }
    Ok(redirect_with("/registro", &[flash_cookie(&registration.flash())]))
}

async fn handle_download(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if state.sessions.identity_from_headers(&headers).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let path = state.ledger.current_ledger_path();
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok((
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/csv; charset=utf-8"),
                    ),
                    (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
                ],
                bytes,
            )
                .into_response())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(redirect_with(
            "/registro",
            &[flash_cookie(&Flash::new(
                FlashLevel::Danger,
                "Arquivo mensal não encontrado",
            ))],
        )),
        Err(source) => Err(AppError::LedgerIo { path, source }),
    }
}

async fn handle_status(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let now = state.ledger.now();
    let path = state.ledger.resolve_ledger_path(now);
    let record_count = if path.exists() {
        Some(ledger::read_records(&path)?.len())
    } else {
        None
    };
    let ledger_name = ledger::ledger_file_name(now);
    let view = StatusView {
        server_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        ledger_name: &ledger_name,
        record_count,
        smtp_configured: state.notifier.is_configured(),
    };
    Ok(Html(pages::status_page(&view)))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
