use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::MultipartError,
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::aggregate::UserSummary;
use crate::config::Config;
use crate::conversion::CONVERSION_TABLE;
use crate::dashboard::Dashboard;
use crate::downloader;
use crate::error::DashboardError;
use crate::graph::{self, GraphOptions};
use crate::login::{LocalAuth, UserCredentials};
use crate::saving;
use crate::session::{SessionContext, SessionStore};
use crate::store::FileStore;

const SESSION_COOKIE: &str = "session";

pub struct AppState {
    pub dashboard: Dashboard,
    pub sessions: SessionStore,
}

#[derive(Deserialize)]
struct SubmitRecord {
    category: String,
    quantity: f64,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct MeResponse {
    email: String,
    name: String,
    /// `None` until the user submits a first record
    summary: Option<UserSummary>,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::UnknownCategory(_)
            | DashboardError::InvalidQuantity(_)
            | DashboardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DashboardError::Auth(_) => StatusCode::UNAUTHORIZED,
            DashboardError::MalformedRecord(_) | DashboardError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}", self);
        }

        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

/// Build the router over an existing application state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/categories", get(list_categories))
        .route("/api/signup", post(handle_signup))
        .route("/api/login", post(handle_login))
        .route("/api/logout", post(handle_logout))
        .route("/api/me", get(current_user))
        .route("/api/records", post(submit_record))
        .route("/api/community", get(community))
        .route("/charts/categories.png", get(category_chart))
        .route("/charts/users.png", get(user_chart))
        .route("/export/records.csv", get(export_csv))
        .route("/export/records.xlsx", get(export_xlsx))
        .route("/api/backup", get(download_backup))
        .route("/api/restore", post(restore_backup))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

/// Open the file-backed store and account file and serve until shutdown.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open(&config.data_dir)?);
    let auth = Arc::new(LocalAuth::open(&config.data_dir)?);

    let app_state = Arc::new(AppState {
        dashboard: Dashboard::new(store, auth),
        sessions: SessionStore::new(config.session_lifetime),
    });

    let app = router(app_state);

    let listener = TcpListener::bind(config.addr).await?;
    info!(
        "Listening on http://{} (data in {})",
        config.addr,
        config.data_dir.display()
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn current_session(state: &AppState, jar: &CookieJar) -> Option<SessionContext> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.get(cookie.value()))
}

fn require_session(state: &AppState, jar: &CookieJar) -> Result<SessionContext, DashboardError> {
    current_session(state, jar)
        .ok_or_else(|| DashboardError::Auth("Please log in before submitting data".to_string()))
}

fn redirect_with_error(err: &DashboardError) -> Redirect {
    Redirect::to(&format!("/?error={}", urlencoding::encode(&err.to_string())))
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn list_categories() -> impl IntoResponse {
    Json(CONVERSION_TABLE)
}

async fn handle_signup(
    State(state): State<Arc<AppState>>,
    Form(credentials): Form<UserCredentials>,
) -> Redirect {
    match state
        .dashboard
        .signup(&credentials.email, &credentials.password, &credentials.name)
    {
        Ok(_) => Redirect::to("/?registered=true"),
        Err(e) => {
            warn!("signup failed for {}: {}", credentials.email.trim(), e);
            redirect_with_error(&e)
        }
    }
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    match state
        .dashboard
        .login(&credentials.email, &credentials.password)
    {
        Ok(context) => {
            let session_id = state.sessions.create(context);
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(e) => redirect_with_error(&e).into_response(),
    }
}

async fn handle_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(context) = state.sessions.remove(cookie.value()) {
            info!("{} logged out", context.email);
        }
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<MeResponse>, DashboardError> {
    let session = current_session(&state, &jar)
        .ok_or_else(|| DashboardError::Auth("Not logged in".to_string()))?;
    let summary = state.dashboard.sidebar(&session)?;

    Ok(Json(MeResponse {
        email: session.email,
        name: session.name,
        summary,
    }))
}

async fn submit_record(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SubmitRecord>,
) -> Result<Response, DashboardError> {
    let session = require_session(&state, &jar)?;
    let record = state
        .dashboard
        .submit(&session, &payload.category, payload.quantity)?;

    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn community(State(state): State<Arc<AppState>>) -> Result<Response, DashboardError> {
    Ok(Json(state.dashboard.community()?).into_response())
}

fn png_response(result: Result<Vec<u8>, Box<dyn std::error::Error>>) -> Response {
    match result {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => DashboardError::Store(format!("failed to render chart: {}", e)).into_response(),
    }
}

async fn category_chart(State(state): State<Arc<AppState>>) -> Result<Response, DashboardError> {
    let view = state.dashboard.community()?;
    Ok(png_response(graph::category_chart(
        &view.by_category,
        &GraphOptions::categories(),
    )))
}

async fn user_chart(State(state): State<Arc<AppState>>) -> Result<Response, DashboardError> {
    let view = state.dashboard.community()?;
    Ok(png_response(graph::user_chart(
        &view.by_user,
        &GraphOptions::contributors(),
    )))
}

async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, DashboardError> {
    let view = state.dashboard.community()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ethanol_records.csv\"",
            ),
        ],
        downloader::to_csv(&view.records),
    )
        .into_response())
}

async fn export_xlsx(State(state): State<Arc<AppState>>) -> Result<Response, DashboardError> {
    let view = state.dashboard.community()?;
    let bytes = downloader::to_xlsx(&view.records)
        .map_err(|e| DashboardError::Store(format!("failed to build workbook: {}", e)))?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ethanol_records.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn download_backup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, DashboardError> {
    let session = require_session(&state, &jar)?;
    let snapshot = saving::export_snapshot(state.dashboard.store())?;
    let buffer = saving::save_snapshot(&snapshot)?;
    info!(
        "{} downloaded a backup of {} records",
        session.email,
        snapshot.records.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ethanol_backup.bin.gz\"",
            ),
        ],
        Bytes::from(buffer),
    )
        .into_response())
}

fn upload_error(err: MultipartError) -> DashboardError {
    DashboardError::InvalidInput(format!("Backup upload failed: {}", err.body_text()))
}

async fn restore_backup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Response, DashboardError> {
    let session = require_session(&state, &jar)?;

    let mut file_data = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() == Some("backup") {
            file_data = field.bytes().await.map_err(upload_error)?.to_vec();
        }
    }

    if file_data.is_empty() {
        return Err(DashboardError::InvalidInput(
            "No backup file received".to_string(),
        ));
    }

    let snapshot = saving::load_snapshot(&file_data)
        .map_err(|e| DashboardError::InvalidInput(e.to_string()))?;
    let report = saving::import_snapshot(state.dashboard.store(), &snapshot)?;
    info!(
        "{} restored {} records and {} profiles",
        session.email, report.records_added, report.profiles_added
    );

    Ok(Json(report).into_response())
}
