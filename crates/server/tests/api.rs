use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tower::ServiceExt;
use uuid::Uuid;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router, types::events::RoomEvent};

async fn state() -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .default_room("Lobby")
        .build()
        .await
        .unwrap();
    ServerState::new(engine)
}

async fn app() -> Router {
    router(state().await)
}

/// Router plus a receiver subscribed before any request is made.
async fn app_with_events() -> (Router, broadcast::Receiver<RoomEvent>) {
    let state = state().await;
    let events = state.events.subscribe();
    (router(state), events)
}

fn parse_id(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Sign up and return `(user_id, token)`.
async fn sign_up(app: &Router, first_name: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "first_name": first_name,
            "last_name": "Tester",
            "email": format!("{}@example.com", first_name.to_lowercase()),
            "password": "correct horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("missing bearer token"));

    let (status, body) = send(&app, "GET", "/user/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("invalid session"));

    let (_, token) = sign_up(&app, "Ann").await;
    let (status, me) = send(&app, "GET", "/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ann@example.com");

    let (status, _) = send(&app, "DELETE", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_in_and_duplicate_sign_up() {
    let app = app().await;
    sign_up(&app, "Ann").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "first_name": "Ann",
            "last_name": "Again",
            "email": "ANN@example.com",
            "password": "pw",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signin",
        None,
        Some(json!({ "email": "ann@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/auth/signin",
        None,
        Some(json!({ "email": "ann@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn new_users_land_in_the_default_room() {
    let app = app().await;
    let (ann_id, ann) = sign_up(&app, "Ann").await;

    let (status, body) = send(&app, "GET", &format!("/room/{ann_id}/rooms"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rooms"][0]["name"], "Lobby");
}

#[tokio::test]
async fn expense_lifecycle_over_http() {
    let app = app().await;
    let (ann_id, ann) = sign_up(&app, "Ann").await;
    let (bob_id, bob) = sign_up(&app, "Bob").await;

    let (status, room) = send(&app, "POST", "/room", Some(&ann), Some(json!({ "name": "Flat" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = room["id"].as_str().unwrap().to_string();

    let (status, added) = send(
        &app,
        "POST",
        &format!("/room/{room_id}/users"),
        Some(&ann),
        Some(json!({ "user_ids": [bob_id, ann_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["user_ids"], json!([bob_id]));

    let (status, account) = send(
        &app,
        "POST",
        "/account",
        Some(&bob),
        Some(json!({ "name": "Checking", "balance_minor": 10_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let account_id = account["id"].as_str().unwrap().to_string();

    let (status, expense) = send(
        &app,
        "POST",
        "/expense",
        Some(&ann),
        Some(json!({
            "room_id": room_id,
            "name": "Groceries",
            "amount_minor": 4_000,
            "split_with": [bob_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{expense}");
    let expense_id = expense["id"].as_str().unwrap().to_string();
    assert_eq!(expense["shares"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "PUT", &format!("/expense/{expense_id}/settle"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/expense/{expense_id}"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let pay_uri = format!("/expense/room/{room_id}/expense/{expense_id}");
    let (status, _) = send(
        &app,
        "PUT",
        &pay_uri,
        Some(&bob),
        Some(json!({ "account_id": account_id, "amount_minor": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, paid) = send(
        &app,
        "PUT",
        &pay_uri,
        Some(&bob),
        Some(json!({ "account_id": account_id, "amount_minor": 4_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bob_share = paid["shares"]
        .as_array()
        .unwrap()
        .iter()
        .find(|share| share["user_id"] == bob_id)
        .unwrap();
    assert_eq!(bob_share["is_settled"], true);

    let (status, settled) = send(&app, "PUT", &format!("/expense/{expense_id}/settle"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["is_settled"], true);

    let (status, list) = send(&app, "GET", &format!("/expense/room/{room_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["expenses"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/expense/{expense_id}"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, accounts) = send(&app, "GET", &format!("/account/user/{bob_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts["accounts"][0]["balance_minor"], 6_000);
}

#[tokio::test]
async fn expense_validation_errors() {
    let app = app().await;
    let (_, ann) = sign_up(&app, "Ann").await;
    let (eve_id, _) = sign_up(&app, "Eve").await;
    let (status, room) = send(&app, "POST", "/room", Some(&ann), Some(json!({ "name": "Flat" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = room["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/expense",
        Some(&ann),
        Some(json!({ "name": "Pizza", "amount_minor": 100, "split_with": [eve_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/expense",
        Some(&ann),
        Some(json!({ "room_id": room_id, "amount_minor": 100, "split_with": [eve_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/expense",
        Some(&ann),
        Some(json!({
            "room_id": room_id,
            "name": "Pizza",
            "amount_minor": 100,
            "split_with": [eve_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("borrowers not part of the room"));
}

#[tokio::test]
async fn rooms_and_accounts_permissions() {
    let app = app().await;
    let (ann_id, ann) = sign_up(&app, "Ann").await;
    let (_, bob) = sign_up(&app, "Bob").await;

    let (_, room) = send(&app, "POST", "/room", Some(&ann), Some(json!({ "name": "Flat" }))).await;
    let room_id = room["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/room", Some(&bob), Some(json!({ "name": "flat" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/room/{room_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", &format!("/account/user/{ann_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(&app, "GET", &format!("/room/{room_id}/users"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["users"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/room/{room_id}"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/room/{room_id}"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sign_up_publishes_join_default_room() {
    let (app, mut events) = app_with_events().await;
    let (ann_id, ann) = sign_up(&app, "Ann").await;

    let (_, rooms) = send(&app, "GET", &format!("/room/{ann_id}/rooms"), Some(&ann), None).await;
    let lobby = parse_id(rooms["rooms"][0]["id"].as_str().unwrap());
    assert_eq!(
        events.try_recv().unwrap(),
        RoomEvent::JoinDefaultRoom {
            room_id: lobby,
            user_id: parse_id(&ann_id),
        }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn room_and_expense_changes_are_published() {
    let (app, mut events) = app_with_events().await;
    let (ann_id, ann) = sign_up(&app, "Ann").await;
    let (bob_id, _) = sign_up(&app, "Bob").await;
    while events.try_recv().is_ok() {}

    let (status, room) = send(&app, "POST", "/room", Some(&ann), Some(json!({ "name": "Flat" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = parse_id(room["id"].as_str().unwrap());
    assert_eq!(
        events.try_recv().unwrap(),
        RoomEvent::RoomCreated {
            room_id,
            created_by: parse_id(&ann_id),
        }
    );

    let (status, _) = send(
        &app,
        "POST",
        &format!("/room/{room_id}/users"),
        Some(&ann),
        Some(json!({ "user_ids": [bob_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        events.try_recv().unwrap(),
        RoomEvent::UsersAdded {
            room_id,
            user_ids: vec![parse_id(&bob_id)],
        }
    );

    let (status, expense) = send(
        &app,
        "POST",
        "/expense",
        Some(&ann),
        Some(json!({
            "room_id": room_id,
            "name": "Pizza",
            "amount_minor": 1_200,
            "split_with": [bob_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        events.try_recv().unwrap(),
        RoomEvent::ExpenseCreated {
            room_id,
            expense_id: parse_id(expense["id"].as_str().unwrap()),
        }
    );

    let (status, _) = send(&app, "POST", "/room", Some(&ann), Some(json!({ "name": "flat" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(events.try_recv().is_err());
}
