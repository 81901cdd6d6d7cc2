#![cfg(feature = "web")]
//! HTTP/JSON front end: routing, cookie sessions and response mapping.

use axum::{
    Extension, Json, Router,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{Local, NaiveDate};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::cache::SnapshotCache;
use crate::config::Config;
use crate::downloader;
use crate::error::Error;
use crate::graph::{GraphOptions, create_line_graph};
use crate::inventory::{InventoryRow, Snapshot};
use crate::login::{CredentialStore, Page, Session, login};
use crate::pages::{
    DailyLookup, DailyView, Evolution, EvolutionQuery, daily_lookup, stock_evolution,
};
use crate::preprocess::normalize;

const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

struct SessionEntry {
    session: Session,
    expires_at: SystemTime,
}

/// Live sessions keyed by cookie id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn create(&self, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            session,
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        };
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, e| e.expires_at > SystemTime::now());
        sessions.insert(id.clone(), entry);
        id
    }

    /// The session for `id`, if it exists, has not expired and is logged in.
    pub fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(id)
            .filter(|e| e.expires_at > SystemTime::now() && e.session.is_logged_in())
            .map(|e| e.session.clone())
    }

    pub fn set_page(&self, id: &str, page: Page) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = sessions.get_mut(id) {
            entry.session.set_page(page);
        }
    }

    pub fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(id);
    }
}

pub struct AppState {
    config: Config,
    store: CredentialStore,
    cache: Mutex<SnapshotCache>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            store: CredentialStore::new(config.users_file.clone()),
            config,
            cache: Mutex::new(SnapshotCache::new()),
            sessions: SessionStore::default(),
        }
    }

    /// Loads (through the cache) and normalizes the configured sheet.
    fn snapshot(&self) -> Result<Snapshot, Error> {
        let table = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.load_current(&self.config.data_file, &self.config.sheet_name)?
        };
        normalize(&table)
    }
}

#[derive(Clone, Debug)]
struct SessionId(String);

#[derive(Debug, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct SessionInfo {
    logged_in: bool,
    username: Option<String>,
    page: Page,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        SessionInfo {
            logged_in: session.is_logged_in(),
            username: session.username().map(str::to_string),
            page: session.page(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConsultaParams {
    date: Option<NaiveDate>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvolucaoParams {
    year: Option<i32>,
    month: Option<u32>,
    code: Option<String>,
    search: Option<String>,
    choice: Option<String>,
}

impl From<EvolucaoParams> for EvolutionQuery {
    fn from(p: EvolucaoParams) -> Self {
        EvolutionQuery {
            year: p.year,
            month: p.month,
            code: p.code,
            search: p.search,
            choice: p.choice,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Schema { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Parse(_) => StatusCode::BAD_REQUEST,
            Error::Auth => StatusCode::UNAUTHORIZED,
            Error::Read(_) | Error::Store(_) | Error::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/session", get(get_session))
        .route("/api/consulta", get(get_consulta))
        .route("/api/consulta/export.csv", get(export_csv))
        .route("/api/consulta/export.xlsx", get(export_xlsx))
        .route("/api/evolucao", get(get_evolucao))
        .route("/api/evolucao/chart.png", get(get_chart))
        .route("/api/evolucao/export.csv", get(export_series_csv))
        .route("/api/evolucao/export.xlsx", get(export_series_xlsx))
        .route("/logout", post(handle_logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/login", post(handle_login))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(config.clone()));
    state.store.init()?;

    let app = router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "serving {} on http://{}",
        config.data_file.display(),
        config.bind_addr
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Authentication middleware
///
/// Lets the request through with its [`SessionId`] when the cookie names a
/// live, logged-in session; answers 401 otherwise.
async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.get(cookie.value()).is_some() {
            request
                .extensions_mut()
                .insert(SessionId(cookie.value().to_string()));
            return next.run(request).await;
        }
    }
    debug!("rejecting unauthenticated {}", request.uri().path());
    Error::Auth.into_response()
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<UserCredentials>,
) -> Result<(CookieJar, Json<SessionInfo>), Error> {
    let mut session = Session::new();
    login(
        &state.store,
        &mut session,
        &credentials.username,
        &credentials.password,
    )?;

    let info = SessionInfo::from(&session);
    let id = state.sessions.create(session);
    let mut cookie = Cookie::new(SESSION_COOKIE, id);
    cookie.set_path("/");
    cookie.set_http_only(true);

    Ok((jar.add(cookie), Json(info)))
}

async fn handle_logout(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(id)): Extension<SessionId>,
    jar: CookieJar,
) -> (CookieJar, Json<SessionInfo>) {
    state.sessions.remove(&id);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(SessionInfo::from(&Session::new())))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Json<SessionInfo> {
    let session = state.sessions.get(&id).unwrap_or_default();
    Json(SessionInfo::from(&session))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn consulta(state: &AppState, params: &ConsultaParams) -> Result<(Snapshot, DailyLookup), Error> {
    let snapshot = state.snapshot()?;
    let page = daily_lookup(&snapshot, today(), params.date, params.code.as_deref())?;
    Ok((snapshot, page))
}

async fn get_consulta(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(id)): Extension<SessionId>,
    Query(params): Query<ConsultaParams>,
) -> Result<Json<DailyLookup>, Error> {
    state.sessions.set_page(&id, Page::Lookup);
    let (_, page) = consulta(&state, &params)?;
    Ok(Json(page))
}

/// Rows the daily page is showing, with the sheet's columns.
fn shown_rows(snapshot: &Snapshot, page: DailyLookup) -> (Vec<String>, Vec<InventoryRow>) {
    match page.view {
        DailyView::DayTable { columns, rows } => (columns, rows),
        DailyView::Item(summary) => (snapshot.columns.clone(), summary.rows),
        DailyView::NoMatch { .. } | DailyView::NoData => (snapshot.columns.clone(), Vec::new()),
    }
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConsultaParams>,
) -> Result<Response, Error> {
    let (snapshot, page) = consulta(&state, &params)?;
    let (columns, rows) = shown_rows(&snapshot, page);
    let csv = downloader::table_to_csv(&columns, &rows);
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConsultaParams>,
) -> Result<Response, Error> {
    let (snapshot, page) = consulta(&state, &params)?;
    let (columns, rows) = shown_rows(&snapshot, page);
    let xlsx = downloader::table_to_xlsx(&columns, &rows)?;
    Ok(([(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)], xlsx).into_response())
}

async fn get_evolucao(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(id)): Extension<SessionId>,
    Query(params): Query<EvolucaoParams>,
) -> Result<Json<Evolution>, Error> {
    state.sessions.set_page(&id, Page::Evolution);
    let snapshot = state.snapshot()?;
    let evolution = stock_evolution(&snapshot, &params.into())?;
    Ok(Json(evolution))
}

async fn export_series_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvolucaoParams>,
) -> Result<Response, Error> {
    let snapshot = state.snapshot()?;
    let evolution = stock_evolution(&snapshot, &params.into())?;
    let csv = downloader::series_to_csv(evolution.series());
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

async fn export_series_xlsx(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvolucaoParams>,
) -> Result<Response, Error> {
    let snapshot = state.snapshot()?;
    let evolution = stock_evolution(&snapshot, &params.into())?;
    let xlsx = downloader::series_to_xlsx(evolution.series())?;
    Ok(([(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)], xlsx).into_response())
}

async fn get_chart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvolucaoParams>,
) -> Result<Response, Error> {
    let snapshot = state.snapshot()?;
    let evolution = stock_evolution(&snapshot, &params.into())?;
    if evolution.series().is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let options = GraphOptions {
        title: evolution.title(),
        ..GraphOptions::default()
    };
    let png = create_line_graph(evolution.series(), &options)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
