use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::{RenderError, TemplateError};
use lazy_static::lazy_static;
use log::{error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::downloader::{self, XLSX_CONTENT_TYPE};
use crate::error::{DecodeError, ReviewError};
use crate::loader;
use crate::review::{self, Command, Navigation, Outcome, Summary};
use crate::session::{APPROVAL_COLUMN, Session};
use crate::table::CellValue;
use crate::view::{Notice, PreviewPage, Renderer, ReviewPage, UploadPage};

/// Name of the cookie carrying the browser's workspace id
pub const SESSION_COOKIE: &str = "review_session";

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._ -]").unwrap();
}

/// Most notices kept for a workspace between two renders of the review page
const MAX_NOTICES: usize = 5;

/// One browser's upload and review session
pub struct Workspace {
    /// Changes whenever a new file is uploaded into this workspace
    upload_id: Uuid,
    pub file_name: String,
    bytes: Bytes,
    pub sheet_names: Vec<String>,
    pub sheet: String,
    pub session: Session,
    notices: Vec<Notice>,
    last_seen: Instant,
}

impl Workspace {
    fn new(file_name: String, bytes: Bytes, decoded: loader::Decoded) -> Self {
        let mut workspace = Workspace {
            upload_id: Uuid::new_v4(),
            file_name,
            bytes,
            sheet_names: decoded.sheet_names,
            sheet: decoded.sheet,
            session: Session::load(decoded.table),
            notices: Vec::new(),
            last_seen: Instant::now(),
        };
        workspace.note_added_column();
        workspace
    }

    /// Swap in a freshly decoded sheet of the stored upload
    fn replace_session(&mut self, decoded: loader::Decoded) {
        self.sheet = decoded.sheet;
        self.sheet_names = decoded.sheet_names;
        self.session = Session::load(decoded.table);
        self.note_added_column();
    }

    fn note_added_column(&mut self) {
        if self.session.approval_column_added() {
            self.push_notice(Notice::info(format!(
                "Added '{}' column with default 'no' values",
                APPROVAL_COLUMN
            )));
        }
    }

    /// Queue a notice for the next review page, dropping the oldest past the cap
    fn push_notice(&mut self, notice: Notice) {
        if self.notices.len() >= MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(notice);
    }

    fn review_page(&mut self) -> ReviewPage {
        let notices = std::mem::take(&mut self.notices);
        ReviewPage::build(
            &self.session,
            &self.file_name,
            &self.sheet,
            &self.sheet_names,
            notices,
        )
    }
}

/// Shared server state: the template registry and every browser's workspace
pub struct AppState {
    workspaces: Mutex<HashMap<String, Workspace>>,
    renderer: Renderer,
    config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, TemplateError> {
        Ok(Arc::new(AppState {
            workspaces: Mutex::new(HashMap::new()),
            renderer: Renderer::new()?,
            config,
        }))
    }

    /// Lock the workspace map, dropping workspaces idle past the configured TTL
    fn workspaces(&self) -> MutexGuard<'_, HashMap<String, Workspace>> {
        let mut workspaces = self
            .workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ttl = self.config.session_ttl();
        let before = workspaces.len();
        workspaces.retain(|_, workspace| workspace.last_seen.elapsed() < ttl);
        if workspaces.len() < before {
            info!("Dropped {} idle review session(s)", before - workspaces.len());
        }
        workspaces
    }

    /// Run `f` on the caller's workspace and mark it as used
    ///
    /// The lock is released when this returns, so decoding, encoding and
    /// rendering happen on data copied out by `f`.
    ///
    /// # Returns
    /// * `Option<R>` - `None` when the cookie is missing or its workspace is gone
    fn with_workspace<R>(&self, jar: &CookieJar, f: impl FnOnce(&mut Workspace) -> R) -> Option<R> {
        let id = workspace_id(jar)?;
        let mut workspaces = self.workspaces();
        let workspace = workspaces.get_mut(&id)?;
        workspace.last_seen = Instant::now();
        Some(f(workspace))
    }
}

#[derive(Deserialize)]
struct NavigateForm {
    command: String,
}

#[derive(Deserialize)]
struct JumpForm {
    row: i64,
}

#[derive(Deserialize)]
struct ApprovalForm {
    value: String,
}

#[derive(Deserialize)]
struct SheetForm {
    sheet: String,
}

/// JSON snapshot served at `/api/state`
#[derive(Serialize, Deserialize, Debug)]
pub struct StateResponse {
    pub file_name: String,
    pub sheet: String,
    pub sheet_names: Vec<String>,
    pub navigation: Navigation,
    pub progress: Option<f64>,
    pub summary: Summary,
    pub approval: Option<String>,
    pub record: Vec<(String, CellValue)>,
}

impl StateResponse {
    fn build(workspace: &Workspace) -> Self {
        let session = &workspace.session;
        StateResponse {
            file_name: workspace.file_name.clone(),
            sheet: workspace.sheet.clone(),
            sheet_names: workspace.sheet_names.clone(),
            navigation: review::navigation(session),
            progress: review::progress(session),
            summary: review::summary(session),
            approval: review::current_approval(session)
                .ok()
                .map(|a| a.as_str().to_string()),
            record: session
                .working()
                .named_cells(session.cursor())
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReviewError::Decode(_) => StatusCode::BAD_REQUEST,
            ReviewError::InvalidValue(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ReviewError::IndexOutOfRange { .. } | ReviewError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

fn html(result: Result<String, RenderError>) -> Response {
    match result {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Rendering error").into_response()
        }
    }
}

fn workspace_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
}

/// Build the application router
///
/// # Arguments
/// * `state` - Shared state created with [`AppState::new`]
///
/// # Returns
/// * `Router` - All routes, with the upload size limit and request logging applied
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(serve_index))
        .route("/upload", post(handle_upload))
        .route("/sheet", post(handle_select_sheet))
        .route("/navigate", post(handle_navigate))
        .route("/jump", post(handle_jump))
        .route("/approval", post(handle_approval))
        .route("/preview", get(serve_preview))
        .route("/export", get(handle_export))
        .route("/api/state", get(get_state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Start the web server and serve until it fails
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.bind;
    let state = AppState::new(config)?;
    let app = router(state);

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        "{} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

async fn serve_index(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    match state.with_workspace(&jar, Workspace::review_page) {
        Some(page) => html(state.renderer.review(&page)),
        None => html(state.renderer.upload(&UploadPage::new(false))),
    }
}

fn task_failed(e: JoinError) -> Response {
    error!("Background task failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
}

struct Upload {
    file_name: String,
    bytes: Bytes,
    sheet: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, DecodeError> {
    let mut upload = Upload {
        file_name: String::new(),
        bytes: Bytes::new(),
        sheet: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DecodeError::Upload(e.body_text()))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();
        match field_name.as_str() {
            "spreadsheet" => {
                upload.file_name = field.file_name().unwrap_or_default().to_string();
                upload.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| DecodeError::Upload(e.body_text()))?;
            }
            "sheet" => {
                let sheet = field
                    .text()
                    .await
                    .map_err(|e| DecodeError::Upload(e.body_text()))?;
                if !sheet.trim().is_empty() {
                    upload.sheet = Some(sheet);
                }
            }
            _ => {}
        }
    }

    if upload.bytes.is_empty() {
        return Err(DecodeError::Upload("No file data received".to_string()));
    }
    Ok(upload)
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let has_session = state.with_workspace(&jar, |_| ()).is_some();

    let decoded = match read_upload(multipart).await {
        Ok(upload) => {
            let task = tokio::task::spawn_blocking(move || {
                let decoded =
                    loader::decode(&upload.bytes, &upload.file_name, upload.sheet.as_deref());
                decoded.map(|decoded| (upload, decoded))
            });
            match task.await {
                Ok(result) => result,
                Err(e) => return task_failed(e),
            }
        }
        Err(e) => Err(e),
    };

    let (upload, decoded) = match decoded {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            let page = UploadPage::with_error(has_session, format!("Error reading Excel file: {}", e));
            let mut response = html(state.renderer.upload(&page));
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return response;
        }
    };

    info!(
        "Loaded '{}' sheet '{}' with {} rows",
        upload.file_name,
        decoded.sheet,
        decoded.table.row_count()
    );

    let id = workspace_id(&jar).unwrap_or_else(|| Uuid::new_v4().to_string());
    let workspace = Workspace::new(upload.file_name, upload.bytes, decoded);
    state.workspaces().insert(id.clone(), workspace);

    let cookie = Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .build();
    (jar.add(cookie), Redirect::to("/")).into_response()
}

async fn handle_select_sheet(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SheetForm>,
) -> Response {
    // Re-selecting the current sheet keeps the review in progress
    let source = state.with_workspace(&jar, |workspace| {
        (workspace.sheet != form.sheet).then(|| {
            (
                workspace.upload_id,
                workspace.file_name.clone(),
                workspace.bytes.clone(),
            )
        })
    });
    let Some(Some((upload_id, file_name, bytes))) = source else {
        return Redirect::to("/").into_response();
    };

    let sheet = form.sheet;
    let task = tokio::task::spawn_blocking(move || loader::decode(&bytes, &file_name, Some(&sheet)));
    let decoded = match task.await {
        Ok(Ok(decoded)) => decoded,
        Ok(Err(e)) => {
            warn!("Sheet switch failed: {}", e);
            return ReviewError::from(e).into_response();
        }
        Err(e) => return task_failed(e),
    };

    // A new upload may have replaced the workbook while it was being decoded
    let switched = state.with_workspace(&jar, |workspace| {
        if workspace.upload_id != upload_id {
            return false;
        }
        workspace.replace_session(decoded);
        info!("Switched '{}' to sheet '{}'", workspace.file_name, workspace.sheet);
        true
    });
    if switched != Some(true) {
        warn!("Discarded sheet switch for a replaced or expired workspace");
    }
    Redirect::to("/").into_response()
}

/// Run one controller command against the caller's session, then redirect
/// back to the review page.
fn apply_command(state: &AppState, jar: &CookieJar, command: Command) -> Response {
    let result = state.with_workspace(jar, |workspace| -> Result<(), ReviewError> {
        let outcome = review::apply(&mut workspace.session, command)?;
        if let Outcome::ApprovalUpdated(approval) = outcome {
            workspace.push_notice(Notice::success(format!(
                "Updated approval status to '{}'",
                approval
            )));
        }
        Ok(())
    });

    match result {
        Some(Err(e)) => {
            warn!("Command rejected: {}", e);
            e.into_response()
        }
        _ => Redirect::to("/").into_response(),
    }
}

async fn handle_navigate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<NavigateForm>,
) -> Response {
    match Command::navigation(&form.command) {
        Some(command) => apply_command(&state, &jar, command),
        None => (
            StatusCode::BAD_REQUEST,
            format!("Unknown navigation command '{}'", form.command),
        )
            .into_response(),
    }
}

async fn handle_jump(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<JumpForm>,
) -> Response {
    apply_command(&state, &jar, Command::JumpTo(form.row))
}

async fn handle_approval(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<ApprovalForm>,
) -> Response {
    apply_command(&state, &jar, Command::SetApproval(form.value))
}

async fn serve_preview(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let page = state.with_workspace(&jar, |workspace| {
        PreviewPage::build(&workspace.session, &workspace.file_name, &workspace.sheet)
    });
    match page {
        Some(page) => html(state.renderer.preview(&page)),
        None => Redirect::to("/").into_response(),
    }
}

/// `Content-Disposition` value with an ASCII fallback and the exact UTF-8 name
fn attachment_header(file_name: &str) -> String {
    let fallback = UNSAFE_FILENAME_CHARS.replace_all(file_name, "_");
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

async fn handle_export(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let snapshot = state.with_workspace(&jar, |workspace| {
        (
            workspace.session.working().clone(),
            workspace.sheet.clone(),
            workspace.file_name.clone(),
        )
    });
    let Some((table, sheet, original_name)) = snapshot else {
        return (StatusCode::NOT_FOUND, "No spreadsheet loaded").into_response();
    };

    let task = tokio::task::spawn_blocking(move || downloader::to_xlsx(&table, &sheet));
    let bytes = match task.await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            error!("Export of '{}' failed: {}", original_name, e);
            return e.into_response();
        }
        Err(e) => return task_failed(e),
    };

    let file_name = downloader::export_file_name(&original_name);
    info!("Exported {} ({} bytes)", file_name, bytes.len());

    let disposition = HeaderValue::from_str(&attachment_header(&file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

async fn get_state(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    match state.with_workspace(&jar, |workspace| StateResponse::build(workspace)) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "status": "error", "message": "No spreadsheet loaded" })),
        )
            .into_response(),
    }
}
