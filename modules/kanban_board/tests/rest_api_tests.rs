use std::time::Duration;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::time::timeout;
use tower::ServiceExt;

use kanban_board::{
    api::rest::{dto::BoardViewDto, error::APPLICATION_PROBLEM_JSON},
    config::{KanbanBoardConfig, UserEntry},
    contract::model::UserId,
    KanbanBoard,
};

fn test_module() -> KanbanBoard {
    KanbanBoard::new(KanbanBoardConfig {
        users: vec![UserEntry {
            user_id: "alice".into(),
            display_name: Some("Alice".into()),
        }],
        allow_unknown_users: false,
        ..KanbanBoardConfig::default()
    })
}

fn router(module: &KanbanBoard) -> Router {
    module
        .register_rest(Router::new())
        .expect("Failed to register routes")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, content_type, body)
}

fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare_req(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn sign_in(app: &Router, user_id: &str) -> String {
    let (status, _, body) = send(
        app,
        json_req("POST", "/auth/sign-in", None, json!({ "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
    body["session"].as_str().expect("session token").to_owned()
}

/// Poll `GET /board` until `pred` holds.
async fn board_until(app: &Router, token: &str, pred: impl Fn(&BoardViewDto) -> bool) -> BoardViewDto {
    timeout(Duration::from_secs(2), async {
        loop {
            let (status, _, body) = send(app, bare_req("GET", "/board", token)).await;
            assert_eq!(status, StatusCode::OK);
            let view: BoardViewDto = serde_json::from_value(body).expect("board view");
            if pred(&view) {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("board did not converge")
}

#[tokio::test]
async fn sign_in_returns_session_and_user() {
    let module = test_module();
    let app = router(&module);

    let (status, _, body) = send(
        &app,
        json_req("POST", "/auth/sign-in", None, json!({ "user_id": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["display_name"], "Alice");
    assert!(body["session"].is_string());
    assert_eq!(module.sessions().len(), 1);
}

#[tokio::test]
async fn unknown_user_gets_problem_response() {
    let app = router(&test_module());
    let (status, content_type, body) = send(
        &app,
        json_req("POST", "/auth/sign-in", None, json!({ "user_id": "mallory" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(content_type.as_deref(), Some(APPLICATION_PROBLEM_JSON));
    assert_eq!(body["code"], "SIGN_IN_REJECTED");
}

#[tokio::test]
async fn board_requires_a_session() {
    let app = router(&test_module());
    let (status, _, _) = send(
        &app,
        Request::builder().uri("/board").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, bare_req("GET", "/board", "not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        &app,
        bare_req("GET", "/board", "00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["title"], "Unauthorized");
}

#[tokio::test]
async fn full_board_flow_over_http() -> Result<()> {
    let app = router(&test_module());
    let token = sign_in(&app, "alice").await;

    let (status, _, body) = send(
        &app,
        json_req("POST", "/board/columns", Some(&token), json!({ "title": "Todo" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let column_id = body["id"].as_str().expect("column id").to_owned();

    let (status, _, _) = send(
        &app,
        json_req(
            "POST",
            &format!("/board/columns/{column_id}/tasks"),
            Some(&token),
            json!({ "text": "Draft outline" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let view = board_until(&app, &token, |v| {
        v.columns.len() == 1 && v.columns[0].tasks.len() == 1
    })
    .await;
    assert_eq!(view.columns[0].title, "Todo");
    assert_eq!(view.columns[0].tasks[0].text, "Draft outline");
    let task_id = view.columns[0].tasks[0].id.clone();

    let (status, _, _) = send(
        &app,
        bare_req(
            "DELETE",
            &format!("/board/columns/{column_id}/tasks/{task_id}"),
            &token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    board_until(&app, &token, |v| v.columns[0].tasks.is_empty()).await;

    let (status, _, _) = send(
        &app,
        bare_req("DELETE", &format!("/board/columns/{column_id}"), &token),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    board_until(&app, &token, |v| v.columns.is_empty()).await;
    Ok(())
}

#[tokio::test]
async fn blank_inputs_are_bad_requests() {
    let app = router(&test_module());
    let token = sign_in(&app, "alice").await;

    let (status, content_type, body) = send(
        &app,
        json_req("POST", "/board/columns", Some(&token), json!({ "title": " \t " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some(APPLICATION_PROBLEM_JSON));
    assert_eq!(body["code"], "EMPTY_COLUMN_TITLE");

    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/board/columns/c1/tasks",
            Some(&token),
            json!({ "text": "" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_TASK_TEXT");
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = router(&test_module());
    let token = sign_in(&app, "alice").await;

    for uri in ["/board/columns/%20", "/board/columns/a%2Fb", "/board/columns/c1/tasks/%20"] {
        let (status, content_type, body) = send(&app, bare_req("DELETE", uri, &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert_eq!(content_type.as_deref(), Some(APPLICATION_PROBLEM_JSON));
        assert_eq!(body["code"], "INVALID_ID", "{uri}");
    }

    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/board/columns/%20/tasks",
            Some(&token),
            json!({ "text": "Draft outline" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ID");
}

#[tokio::test]
async fn sign_out_invalidates_the_token() {
    let module = test_module();
    let app = router(&module);
    let token = sign_in(&app, "alice").await;

    let (status, _, _) = send(&app, bare_req("POST", "/auth/sign-out", &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, bare_req("POST", "/auth/sign-out", &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, bare_req("GET", "/board", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(module.sessions().is_empty());
}

#[tokio::test]
async fn event_stream_starts_with_current_view() {
    let app = router(&test_module());
    let token = sign_in(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(bare_req("GET", "/board/events", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("text/event-stream"));

    let mut body = resp.into_body().into_data_stream();
    let first = timeout(Duration::from_secs(2), futures::StreamExt::next(&mut body))
        .await
        .expect("no event")
        .expect("stream ended")
        .expect("body error");
    let text = String::from_utf8_lossy(&first);
    assert!(text.contains("event: board_view"), "unexpected frame: {text}");
    assert!(text.contains(r#""columns":[]"#), "unexpected frame: {text}");
}

async fn open_events(app: &Router, token: &str) -> axum::body::BodyDataStream {
    let resp = app
        .clone()
        .oneshot(bare_req("GET", "/board/events", token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut body = resp.into_body().into_data_stream();
    timeout(Duration::from_secs(2), futures::StreamExt::next(&mut body))
        .await
        .expect("no event")
        .expect("stream ended")
        .expect("body error");
    body
}

async fn assert_stream_ends(body: &mut axum::body::BodyDataStream) {
    let next = timeout(Duration::from_secs(2), futures::StreamExt::next(body))
        .await
        .expect("event stream still open");
    assert!(next.is_none(), "unexpected frame after close");
}

#[tokio::test]
async fn sign_out_ends_the_event_stream() {
    let app = router(&test_module());
    let token = sign_in(&app, "alice").await;
    let mut events = open_events(&app, &token).await;

    let (status, _, _) = send(&app, bare_req("POST", "/auth/sign-out", &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_stream_ends(&mut events).await;
}

#[tokio::test]
async fn module_shutdown_signs_everyone_out() {
    let module = test_module();
    let app = router(&module);
    let first = sign_in(&app, "alice").await;
    let second = sign_in(&app, "alice").await;
    let mut first_events = open_events(&app, &first).await;
    let mut second_events = open_events(&app, &second).await;

    module.shutdown().await;
    assert!(module.sessions().is_empty());
    assert_stream_ends(&mut first_events).await;
    assert_stream_ends(&mut second_events).await;
}

#[tokio::test]
async fn abandoned_sessions_expire() {
    let module = KanbanBoard::new(KanbanBoardConfig {
        session_idle_ttl_secs: 1,
        ..KanbanBoardConfig::default()
    });
    let app = router(&module);
    let token = sign_in(&app, "alice").await;
    let session = module
        .sessions()
        .get(&token.parse().expect("uuid token"))
        .expect("session");

    timeout(Duration::from_secs(5), async {
        while !module.sessions().is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("idle session was not reaped");

    assert_eq!(session.subscriptions().open_count(), 0);
    let (status, _, _) = send(&app, bare_req("GET", "/board", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn local_client_sees_rest_writes() {
    let module = test_module();
    let app = router(&module);
    let token = sign_in(&app, "alice").await;

    let (status, _, _) = send(
        &app,
        json_req("POST", "/board/columns", Some(&token), json!({ "title": "Inbox" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let client = module.client();
    let user = UserId::new("alice");
    let columns = tokio_test::assert_ok!(client.list_columns(&user).await);
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].title, "Inbox");
    tokio_test::assert_err!(client.add_column(&user, "").await);
}

#[test]
fn zero_keepalive_is_rejected() {
    let module = KanbanBoard::new(KanbanBoardConfig {
        sse_keepalive_secs: 0,
        ..KanbanBoardConfig::default()
    });
    assert!(module.register_rest(Router::new()).is_err());
}
