use axum::{
    Json, Router, middleware,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{friends, intel, messages, users};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/messages", get(messages::list_messages).post(messages::send_message))
        .route(
            "/messages/{message_id}",
            patch(messages::edit_message).delete(messages::delete_message),
        )
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/{user_id}/ban", post(users::set_banned))
        .route("/friends", get(friends::list_friends).post(friends::request_friend))
        .route("/friends/{user_id}", axum::routing::delete(friends::remove_friend))
        .route("/friends/{user_id}/accept", post(friends::accept_friend))
        .route("/intel", get(intel::list_intel))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use ksb_chat::ChatService;
    use ksb_db::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{AppStateInner, hash_password};

    const SECRET: &str = "test-secret";

    fn test_state() -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Arc::new(AppStateInner {
            chat: ChatService::new(db),
            jwt_secret: SECRET.to_string(),
            token_ttl_days: 1,
        })
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, username: &str) -> (i64, String) {
        let (status, body) = call(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": username, "password": "correct-horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Admin accounts are never created through the API; seed one directly.
    async fn admin(app: &Router, state: &AppState) -> (i64, String) {
        let hash = hash_password("admin-password").unwrap();
        let id = state.db().create_user("command", &hash, "Komuta", true).unwrap().unwrap().id;
        let (status, body) = call(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "command", "password": "admin-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (id, body["token"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let app = router(test_state());
        let (status, _) = call(&app, "GET", "/messages", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, "GET", "/messages", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = router(test_state());
        let (status, body) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_login_checks_password() {
        let app = router(test_state());
        register(&app, "ghost").await;

        let (status, _) = call(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "GHOST", "password": "another-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "ghost", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn send_and_poll_group_channel() {
        let app = router(test_state());
        let (alpha, alpha_token) = register(&app, "alpha").await;
        let (_, bravo_token) = register(&app, "bravo").await;

        let (status, sent) = call(
            &app,
            "POST",
            "/messages",
            Some(&alpha_token),
            Some(json!({ "kind": "text", "content": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(sent["author_id"], alpha);

        let (status, list) = call(&app, "GET", "/messages", Some(&bravo_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["content"], "hello");
        assert_eq!(list[0]["sender"]["code_name"], "alpha");
        assert!(list[0]["reply_to"].is_null());
    }

    #[tokio::test]
    async fn direct_thread_via_target_id() {
        let app = router(test_state());
        let (alpha, alpha_token) = register(&app, "alpha").await;
        let (bravo, bravo_token) = register(&app, "bravo").await;
        let (_, charlie_token) = register(&app, "charlie").await;

        let (status, _) = call(
            &app,
            "POST",
            "/messages",
            Some(&alpha_token),
            Some(json!({ "kind": "image", "url": "https://cdn/x.png", "receiver_id": bravo })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, thread) = call(
            &app,
            "GET",
            &format!("/messages?target_id={alpha}"),
            Some(&bravo_token),
            None,
        )
        .await;
        let thread = thread.as_array().unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0]["media"]["kind"], "image");

        let (_, group) = call(&app, "GET", "/messages", Some(&charlie_token), None).await;
        assert!(group.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let app = router(test_state());
        let (_, token) = register(&app, "alpha").await;

        let (status, body) = call(
            &app,
            "POST",
            "/messages",
            Some(&token),
            Some(json!({ "kind": "text", "content": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (_, list) = call(&app, "GET", "/messages", Some(&token), None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_input_gets_error_envelope() {
        let app = router(test_state());
        let (_, token) = register(&app, "alpha").await;

        for payload in [
            json!({ "kind": "image" }),
            json!({ "content": "no kind" }),
            json!({ "kind": "sticker", "url": "https://cdn/s.png" }),
        ] {
            let (status, body) =
                call(&app, "POST", "/messages", Some(&token), Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "BAD_REQUEST");
        }

        let (status, body) =
            call(&app, "GET", "/messages?target_id=abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, body) = call(
            &app,
            "PATCH",
            "/messages/not-a-number",
            Some(&token),
            Some(json!({ "content": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (_, list) = call(&app, "GET", "/messages", Some(&token), None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_and_delete_authorization() {
        let state = test_state();
        let app = router(state.clone());
        let (_, alpha_token) = register(&app, "alpha").await;
        let (_, bravo_token) = register(&app, "bravo").await;
        let (_, admin_token) = admin(&app, &state).await;

        let (_, sent) = call(
            &app,
            "POST",
            "/messages",
            Some(&alpha_token),
            Some(json!({ "kind": "text", "content": "original" })),
        )
        .await;
        let uri = format!("/messages/{}", sent["id"]);

        let (status, _) = call(&app, "PATCH", &uri, Some(&bravo_token), Some(json!({ "content": "x" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, "PATCH", &uri, Some(&admin_token), Some(json!({ "content": "x" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, edited) =
            call(&app, "PATCH", &uri, Some(&alpha_token), Some(json!({ "content": "edited" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["content"], "edited");

        let (status, _) = call(&app, "DELETE", &uri, Some(&bravo_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = call(&app, "DELETE", &uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);

        let (status, _) = call(&app, "DELETE", &uri, Some(&alpha_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn banned_user_can_read_but_not_write() {
        let state = test_state();
        let app = router(state.clone());
        let (alpha, _) = register(&app, "alpha").await;
        let (bravo, bravo_token) = register(&app, "bravo").await;
        let (_, admin_token) = admin(&app, &state).await;

        let (status, _) = call(
            &app,
            "POST",
            "/messages",
            Some(&bravo_token),
            Some(json!({ "kind": "text", "content": "before" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(
            &app,
            "POST",
            "/friends",
            Some(&bravo_token),
            Some(json!({ "friend_id": alpha })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(
            &app,
            "POST",
            &format!("/users/{bravo}/ban"),
            Some(&bravo_token),
            Some(json!({ "banned": true })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, user) = call(
            &app,
            "POST",
            &format!("/users/{bravo}/ban"),
            Some(&admin_token),
            Some(json!({ "banned": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["is_banned"], true);

        let (status, _) = call(
            &app,
            "POST",
            "/messages",
            Some(&bravo_token),
            Some(json!({ "kind": "text", "content": "after" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &app,
            "DELETE",
            &format!("/friends/{alpha}"),
            Some(&bravo_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, friends) = call(&app, "GET", "/friends", Some(&bravo_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(friends.as_array().unwrap().len(), 1);

        let (status, list) = call(&app, "GET", "/messages", Some(&bravo_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn friend_request_flow() {
        let app = router(test_state());
        let (alpha, alpha_token) = register(&app, "alpha").await;
        let (bravo, bravo_token) = register(&app, "bravo").await;

        let (status, friend) = call(
            &app,
            "POST",
            "/friends",
            Some(&alpha_token),
            Some(json!({ "friend_id": bravo })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(friend["status"], "pending");
        assert_eq!(friend["outgoing"], true);

        let (status, _) = call(
            &app,
            "POST",
            "/friends",
            Some(&bravo_token),
            Some(json!({ "friend_id": alpha })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, accepted) = call(
            &app,
            "POST",
            &format!("/friends/{alpha}/accept"),
            Some(&bravo_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "accepted");
        assert_eq!(accepted["user"]["id"], alpha);

        let (_, list) = call(&app, "GET", "/friends", Some(&alpha_token), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["user"]["id"], bravo);
    }

    #[tokio::test]
    async fn profile_update_and_intel_feed() {
        let state = test_state();
        ksb_db::seed::seed_intel_links(state.db()).unwrap();
        let app = router(state);
        let (_, token) = register(&app, "alpha").await;

        let (status, me) = call(
            &app,
            "PATCH",
            "/users/me",
            Some(&token),
            Some(json!({ "code_name": "Gölge_01", "status": "Gizli" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["code_name"], "Gölge_01");
        assert_eq!(me["status"], "Gizli");

        let (status, intel) = call(&app, "GET", "/intel", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!intel.as_array().unwrap().is_empty());
    }
}
