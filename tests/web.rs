#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use wms_lookup::app::{AppState, router};
use wms_lookup::{Config, CredentialStore};

const DATA: &str = "datasalva,codigo,Descrição,Qtd,Endereço\n\
                    2024-10-01 08:00:00,101,Parafuso M6,5,A-01\n\
                    2024-10-01 08:00:00,101,Parafuso M6,3,B-02\n\
                    2024-10-01 08:00:00,202,Porca M6,4,A-03\n";

fn app(dir: &tempfile::TempDir) -> Router {
    app_with_data(dir, Some(DATA))
}

// `None` leaves the data file missing.
fn app_with_data(dir: &tempfile::TempDir, data: Option<&str>) -> Router {
    let data_file: PathBuf = dir.path().join("wms.csv");
    if let Some(data) = data {
        fs::write(&data_file, data).unwrap();
    }

    let users_file = dir.path().join("database").join("users.json");
    CredentialStore::new(users_file.clone())
        .add_user("alice", "s3nha")
        .unwrap();

    let config = Config {
        data_file,
        users_file,
        ..Config::default()
    };
    router(Arc::new(AppState::new(config)))
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({ "username": username, "password": password });
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn session_cookie(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(login_request("alice", "s3nha"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn api_requires_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, _) = get(&app, "/api/consulta", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/api/consulta", Some("session=not-a-session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let wrong = app
        .clone()
        .oneshot(login_request("alice", "errada"))
        .await
        .unwrap();
    let unknown = app
        .clone()
        .oneshot(login_request("bob", "s3nha"))
        .await
        .unwrap();

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong.headers().get(header::SET_COOKIE).is_none());

    let wrong = to_bytes(wrong.into_body(), usize::MAX).await.unwrap();
    let unknown = to_bytes(unknown.into_body(), usize::MAX).await.unwrap();
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn logged_in_user_can_look_up_an_item() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let cookie = session_cookie(&app).await;

    let (status, body) = get(
        &app,
        "/api/consulta?date=2024-10-01&code=101",
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["view"]["kind"], "item");
    assert_eq!(json["view"]["total_quantity"], 8.0);
    assert_eq!(json["view"]["addresses"], serde_json::json!(["A-01", "B-02"]));

    let (status, body) = get(&app, "/api/session", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["username"], "alice");
    assert_eq!(json["page"], "lookup");
}

#[tokio::test]
async fn bad_code_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let cookie = session_cookie(&app).await;

    let (status, _) = get(
        &app,
        "/api/consulta?date=2024-10-01&code=abc",
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn evolution_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let cookie = session_cookie(&app).await;

    let (status, body) = get(&app, "/api/evolucao?search=porca", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["resolution"]["kind"], "candidates");
    assert_eq!(json["resolution"]["value"][0]["code"], 202);

    let (status, body) = get(&app, "/api/evolucao/export.csv", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "Data,Estoque\n2024-10-01,12\n");

    let (status, body) = get(
        &app,
        "/api/consulta/export.csv?date=2024-10-01&code=202",
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("datasalva,codigo,Descrição,Qtd,Endereço\n"));
    assert_eq!(csv.lines().count(), 2);
}

#[tokio::test]
async fn missing_data_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_data(&dir, None);
    let cookie = session_cookie(&app).await;

    let (status, body) = get(&app, "/api/consulta", Some(&cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("wms.csv"));
}

#[tokio::test]
async fn sheet_without_required_column_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_data(&dir, Some("codigo,Descrição,Qtd\n101,Parafuso M6,5\n"));
    let cookie = session_cookie(&app).await;

    let (status, body) = get(&app, "/api/evolucao", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "required column(s) missing: datasalva");
}

#[tokio::test]
async fn chart_is_served_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let cookie = session_cookie(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/evolucao/chart.png?year=2024&month=10")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"\x89PNG"));

    // An empty month has nothing to draw.
    let (status, _) = get(&app, "/api/evolucao/chart.png?year=2024&month=3", Some(&cookie)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let cookie = session_cookie(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = get(&app, "/api/session", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
