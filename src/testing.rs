//! In-process stand-in for the GoatCounter and GitHub APIs.

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub struct FakeUpstream {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone)]
struct Shared {
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/:site/api/v0/stats/total", get(total))
            .route("/:site/api/v0/stats/hits", get(hits))
            .route("/users/:user", get(profile))
            .route("/html", get(|| async { "<html>not json</html>" }))
            .route("/slow", get(slow))
            .with_state(Shared {
                requests: requests.clone(),
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn site_url(&self, site: &str) -> String {
        format!("{}/{site}", self.base())
    }

    pub fn profile_url(&self) -> String {
        format!("{}/users/someone", self.base())
    }

    pub fn token(site: &str) -> String {
        format!("token-{site}")
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn record(shared: &Shared, path: String) {
    shared.requests.lock().unwrap().push(path);
}

fn authorized(headers: &HeaderMap, site: &str) -> bool {
    let expected = format!("Bearer {}", FakeUpstream::token(site));
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

async fn total(
    State(shared): State<Shared>,
    Path(site): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&shared, format!("{site}/total"));
    if !authorized(&headers, &site) {
        return unauthorized();
    }
    let body: Value = match site.as_str() {
        "alpha" => json!({ "count": "1,234" }),
        "beta" => json!({ "count": "100" }),
        "e2e" => json!({ "count": "100" }),
        "big" => json!({ "count": "1,234,567" }),
        "numeric" => json!({ "count": 77 }),
        "gamma" => json!({ "total": 7 }),
        "garbled" => json!({ "count": "n/a" }),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            json!({ "count": "999" })
        }
        "broken" => return "<html>maintenance</html>".into_response(),
        _ => {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "no such site" })))
                .into_response()
        }
    };
    Json(body).into_response()
}

async fn hits(
    State(shared): State<Shared>,
    Path(site): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record(&shared, format!("{site}/hits"));
    if !authorized(&headers, &site) {
        return unauthorized();
    }
    if query.get("days").map(String::as_str) != Some("7") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "days" }))).into_response();
    }
    let body: Value = match site.as_str() {
        "alpha" => json!({ "stats": [
            { "day": "2024-01-01", "count": 5 },
            { "day": "2024-01-02", "count": 3 },
        ]}),
        "beta" => json!({ "stats": [
            { "day": "2024-01-01", "count": 5 },
            { "day": "2024-01-03" },
            { "count": 9 },
        ]}),
        "e2e" => json!({ "stats": [
            { "day": "2024-05-01", "count": 10 },
            { "day": "2024-05-02", "count": 5 },
        ]}),
        "gamma" => json!({ "stats": "not-a-list" }),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            json!({ "stats": [{ "day": "2024-01-01", "count": 1000 }] })
        }
        "broken" => return "<html>maintenance</html>".into_response(),
        _ => json!({ "stats": [] }),
    };
    Json(body).into_response()
}

async fn profile(State(shared): State<Shared>, Path(user): Path<String>) -> Response {
    record(&shared, format!("users/{user}"));
    match user.as_str() {
        "nobody" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Not Found" })),
        )
            .into_response(),
        "weird" => Json(json!({ "login": user, "followers": "many" })).into_response(),
        _ => Json(json!({ "login": user, "followers": 42 })).into_response(),
    }
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "late": true }))
}
