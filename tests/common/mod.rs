#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use expl::config::{Config, Settings, WebhookSecrets};
use expl::router::{AppState, expl_router};
use expl::security::Clock;
use expl::{ExplDb, TokenCodec};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADD_SECRET: &str = "add-secret";
pub const EXPL_SECRET: &str = "expl-secret";
pub const DEL_SECRET: &str = "del-secret";
pub const FIND_SECRET: &str = "find-secret";
pub const TOP_SECRET: &str = "top-secret";

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

/// A fresh SQLite file under the temp dir; the caller removes it.
pub fn temp_db(tag: &str) -> (String, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut path = std::env::temp_dir();
    path.push(format!("expl-{tag}-{}-{nanos}.sqlite", std::process::id()));
    (format!("sqlite:{}?mode=rwc", path.display()), path)
}

pub fn test_config(connect_string: String) -> Config {
    Config {
        connect_string,
        use_proxy_headers: false,
        secrets: WebhookSecrets {
            add: ADD_SECRET.to_string(),
            expl: EXPL_SECRET.to_string(),
            del: DEL_SECRET.to_string(),
            find: FIND_SECRET.to_string(),
            top: TOP_SECRET.to_string(),
        },
        settings: Settings::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub db: ExplDb,
    pub config: Config,
    path: PathBuf,
}

impl TestApp {
    pub async fn spawn(tag: &str) -> Self {
        Self::spawn_with(tag, |_| {}).await
    }

    pub async fn spawn_with(tag: &str, tweak: impl FnOnce(&mut Config)) -> Self {
        let (url, path) = temp_db(tag);
        let mut config = test_config(url);
        tweak(&mut config);

        let db = ExplDb::init(&config.connect_string)
            .await
            .expect("database init failed");
        let clock = Arc::new(ManualClock::new(start_time()));
        let codec = Arc::new(TokenCodec::generate().expect("key generation failed"));
        let state = AppState::new(db.clone(), codec, clock.clone(), config.settings.clone())
            .expect("invalid settings");
        let router = expl_router(state, &config);

        Self {
            router,
            clock,
            db,
            config,
            path,
        }
    }

    pub async fn webhook(&self, op: &str, token: &str, text: &str) -> (StatusCode, Value) {
        let body = json!({ "token": token, "user_name": "alice", "text": text });
        let resp = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/{op}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed");
        let status = resp.status();
        (status, json_body(resp).await)
    }

    /// Reply text of a webhook call that must succeed.
    pub async fn reply(&self, op: &str, token: &str, text: &str) -> String {
        let (status, body) = self.webhook(op, token, text).await;
        assert_eq!(status, StatusCode::OK, "unexpected reply: {body}");
        body["text"].as_str().expect("reply without text").to_string()
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let resp = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed");
        let status = resp.status();
        (status, text_body(resp).await)
    }

    pub async fn close(self) {
        self.db.close().await;
        let _ = std::fs::remove_file(&self.path);
    }
}

pub async fn text_body(resp: Response<Body>) -> String {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(body.to_vec()).expect("response body was not utf-8")
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let text = text_body(resp).await;
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// The path of the link in a reply, e.g. `/expl/<token>`.
pub fn link_path(reply: &str) -> String {
    reply
        .lines()
        .find_map(|line| line.strip_prefix("Full list: "))
        .expect("reply carries no link")
        .to_string()
}
