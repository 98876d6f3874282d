use std::time::Duration;

use axum::http::StatusCode;

mod common;
use common::{ADD_SECRET, DEL_SECRET, EXPL_SECRET, FIND_SECRET, TOP_SECRET, TestApp, link_path};

#[tokio::test]
async fn add_reports_the_new_entry_with_its_index() {
    let app = TestApp::spawn("api-add").await;

    let first = app.reply("add", ADD_SECRET, "rust a systems language").await;
    assert_eq!(first, "rust[1]: a systems language (alice, 2024-03-01 09:30)");

    let second = app.reply("add", ADD_SECRET, "Rust  also a fungus").await;
    assert_eq!(second, "Rust[2]: also a fungus (alice, 2024-03-01 09:30)");

    app.close().await;
}

#[tokio::test]
async fn add_rejects_bad_input() {
    let app = TestApp::spawn("api-add-invalid").await;

    let (status, body) = app.webhook("add", ADD_SECRET, "lonely").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let long_key = "k".repeat(51);
    let (status, _) = app.webhook("add", ADD_SECRET, &format!("{long_key} v")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long_value = "v".repeat(501);
    let (status, _) = app.webhook("add", ADD_SECRET, &format!("k {long_value}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.reply("expl", EXPL_SECRET, "lonely").await, "No entries found.");
    app.close().await;
}

#[tokio::test]
async fn each_operation_only_accepts_its_own_secret() {
    let app = TestApp::spawn("api-secrets").await;

    for token in [EXPL_SECRET, "", "add-secre", "add-secret "] {
        let (status, body) = app.webhook("add", token, "rust fast").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token:?}");
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
    assert_eq!(app.reply("expl", EXPL_SECRET, "rust").await, "No entries found.");

    let (status, _) = app.webhook("top", ADD_SECRET, "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.close().await;
}

#[tokio::test]
async fn expl_selects_by_index_spec() {
    let app = TestApp::spawn("api-expl").await;
    for value in ["one", "two", "three", "four"] {
        app.reply("add", ADD_SECRET, &format!("num {value}")).await;
    }

    let reply = app.reply("expl", EXPL_SECRET, "NUM 2,-1").await;
    let lines: Vec<_> = reply.lines().collect();
    assert_eq!(lines[0], "num[2]: two (alice, 2024-03-01 09:30)");
    assert_eq!(lines[1], "num[4]: four (alice, 2024-03-01 09:30)");
    assert!(lines[2].starts_with("Full list: /expl/"), "{reply}");

    let reply = app.reply("expl", EXPL_SECRET, "num 3:9").await;
    assert!(reply.contains("num[3]: three"));
    assert!(reply.contains("num[4]: four"));
    assert!(!reply.contains("num[2]"));

    assert_eq!(app.reply("expl", EXPL_SECRET, "num 7").await, "No entries found.");

    let (status, _) = app.webhook("expl", EXPL_SECRET, "num 0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.close().await;
}

#[tokio::test]
async fn expl_truncates_long_lists() {
    let app = TestApp::spawn("api-expl-many").await;
    for i in 1..=7 {
        app.reply("add", ADD_SECRET, &format!("many entry{i}")).await;
    }

    let reply = app.reply("expl", EXPL_SECRET, "many").await;
    assert!(reply.contains("many[5]: entry5"));
    assert!(!reply.contains("many[6]"));
    assert!(reply.contains("... and 2 more"), "{reply}");

    app.close().await;
}

#[tokio::test]
async fn expl_link_shows_full_list_until_it_expires() {
    let app = TestApp::spawn("api-expl-link").await;
    app.reply("add", ADD_SECRET, "rust fast").await;
    app.reply("add", ADD_SECRET, "rust safe").await;
    app.reply("add", ADD_SECRET, "go simple").await;

    let reply = app.reply("expl", EXPL_SECRET, "rust").await;
    let path = link_path(&reply);
    assert!(path.starts_with("/expl/"), "{path}");

    let (status, body) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "rust[1]: fast (alice, 2024-03-01 09:30)\nrust[2]: safe (alice, 2024-03-01 09:30)"
    );

    app.clock.advance(Duration::from_secs(24 * 60 * 60));
    let (status, body) = app.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "not found");

    app.close().await;
}

#[tokio::test]
async fn tampered_link_is_not_found() {
    let app = TestApp::spawn("api-tampered").await;
    app.reply("add", ADD_SECRET, "rust fast").await;

    let path = link_path(&app.reply("expl", EXPL_SECRET, "rust").await);
    let (head, signature) = path.rsplit_once('.').expect("token without signature");
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let forged = format!("{head}.{flipped}{}", &signature[1..]);

    let (status, body) = app.get(&forged).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "not found");

    let (status, _) = app.get("/expl/not-a-token").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.close().await;
}

#[tokio::test]
async fn link_to_emptied_key_is_not_found() {
    let app = TestApp::spawn("api-emptied").await;
    app.reply("add", ADD_SECRET, "gone soon").await;
    let path = link_path(&app.reply("expl", EXPL_SECRET, "gone").await);

    app.reply("del", DEL_SECRET, "gone 1").await;

    let (status, body) = app.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "not found");

    app.close().await;
}

#[tokio::test]
async fn del_removes_selected_entries_and_renumbers() {
    let app = TestApp::spawn("api-del").await;
    for value in ["a", "b", "c"] {
        app.reply("add", ADD_SECRET, &format!("letters {value}")).await;
    }

    let reply = app.reply("del", DEL_SECRET, "letters 1 3").await;
    assert_eq!(
        reply,
        "letters[1]: a (alice, 2024-03-01 09:30)\nletters[3]: c (alice, 2024-03-01 09:30)"
    );

    let reply = app.reply("expl", EXPL_SECRET, "letters").await;
    assert!(reply.starts_with("letters[1]: b (alice, 2024-03-01 09:30)\n"), "{reply}");

    assert_eq!(app.reply("del", DEL_SECRET, "letters 5").await, "No entries found.");

    let (status, _) = app.webhook("del", DEL_SECRET, "letters").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.close().await;
}

#[tokio::test]
async fn find_matches_keys_and_values() {
    let app = TestApp::spawn("api-find").await;
    app.reply("add", ADD_SECRET, "rust borrow checker").await;
    app.reply("add", ADD_SECRET, "go garbage collected").await;
    app.reply("add", ADD_SECRET, "zig no hidden control flow").await;

    let reply = app.reply("find", FIND_SECRET, "RUST").await;
    assert!(reply.contains("rust[1]: borrow checker"));
    assert!(!reply.contains("go[1]"));

    let reply = app.reply("find", FIND_SECRET, "co").await;
    assert!(reply.contains("go[1]: garbage collected"));
    assert!(reply.contains("zig[1]: no hidden control flow"));

    let path = link_path(&reply);
    assert!(path.starts_with("/find/"), "{path}");
    let (status, body) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.lines().count(), 2);

    app.clock.advance(Duration::from_secs(60 * 60));
    let (status, _) = app.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.reply("find", FIND_SECRET, "haskell").await, "No entries found.");
    app.close().await;
}

#[tokio::test]
async fn top_ranks_keys_by_entry_count() {
    let app = TestApp::spawn("api-top").await;
    assert_eq!(app.reply("top", TOP_SECRET, "").await, "No entries found.");

    for text in ["b 1", "a 1", "b 2", "c 1", "B 3", "a 2"] {
        app.reply("add", ADD_SECRET, text).await;
    }

    let reply = app.reply("top", TOP_SECRET, "").await;
    let lines: Vec<_> = reply.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("(3)"), "{reply}");
    assert!(lines[0].eq_ignore_ascii_case("b (3)"));
    assert_eq!(lines[1], "a (2)");
    assert_eq!(lines[2], "c (1)");

    app.close().await;
}

#[tokio::test]
async fn links_use_the_public_url() {
    let app = TestApp::spawn_with("api-public-url", |config| {
        config.settings.public_url = "https://expl.example.org/".to_string();
    })
    .await;
    app.reply("add", ADD_SECRET, "rust fast").await;

    let reply = app.reply("expl", EXPL_SECRET, "rust").await;
    assert!(reply.contains("Full list: https://expl.example.org/expl/"), "{reply}");

    app.close().await;
}

#[tokio::test]
async fn trigger_word_is_stripped_from_form_payloads() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = TestApp::spawn("api-form").await;
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/add")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "token=add-secret&user_name=bob&trigger_word=%21add&text=%21add+tea+hot",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = common::json_body(resp).await;
    assert_eq!(body["text"], "tea[1]: hot (bob, 2024-03-01 09:30)");

    app.close().await;
}
