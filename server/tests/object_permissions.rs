mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{TestApp, bearer, principal};
use platform_authn::{Principal, TokenRegistry};
use platform_authz::RbacPermission;
use serde_json::json;
use server::store::{Schedule, Shift, Store};

struct Fixture {
    app: TestApp,
    owner: Arc<Principal>,
    schedule: Arc<Schedule>,
    shift: Arc<Shift>,
}

/// `owner` holds a schedule with one shift; `reader`, `writer` and `nobody`
/// are strangers to it.
async fn fixture(owner_perms: &[RbacPermission]) -> Fixture {
    let owner = principal("owner", owner_perms);
    let reader = principal("reader", &[RbacPermission::SchedulesRead]);
    let writer = principal(
        "writer",
        &[RbacPermission::SchedulesRead, RbacPermission::SchedulesWrite],
    );
    let nobody = principal("nobody", &[]);

    let store = Store::default();
    let schedule = store.insert_schedule("primary", owner.clone()).await;
    let shift = store.insert_shift("on-call", schedule.clone()).await;

    let registry = TokenRegistry::default()
        .with_token("owner", owner.clone())
        .with_token("reader", reader)
        .with_token("writer", writer)
        .with_token("nobody", nobody);
    Fixture {
        app: TestApp::new(registry, store),
        owner,
        schedule,
        shift,
    }
}

fn schedule_uri(fx: &Fixture) -> String {
    format!("/api/internal/v1/schedules/{}", fx.schedule.id)
}

fn shift_uri(fx: &Fixture) -> String {
    format!(
        "/api/internal/v1/schedules/{}/shifts/{}",
        fx.schedule.id, fx.shift.id
    )
}

#[tokio::test]
async fn list_requires_schedules_read() {
    let fx = fixture(&[RbacPermission::SchedulesRead]).await;
    let uri = "/api/internal/v1/schedules";

    let (status, body) = fx.app.send(Method::GET, uri, bearer("reader"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = fx.app.send(Method::GET, uri, bearer("nobody"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("FORBIDDEN"));
}

#[tokio::test]
async fn retrieve_allows_owner_or_schedules_write() {
    let fx = fixture(&[RbacPermission::SchedulesRead]).await;
    let uri = schedule_uri(&fx);

    let (status, body) = fx.app.send(Method::GET, &uri, bearer("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], json!(fx.owner.id.to_string()));

    let (status, _) = fx.app.send(Method::GET, &uri, bearer("writer"), None).await;
    assert_eq!(status, StatusCode::OK);

    // passes the request check, fails the object check
    let (status, _) = fx.app.send(Method::GET, &uri, bearer("reader"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = fx.app.send(Method::GET, &uri, bearer("nobody"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn retrieve_unknown_schedule_is_not_found() {
    let fx = fixture(&[]).await;
    let uri = format!("/api/internal/v1/schedules/{}", uuid::Uuid::new_v4());
    let (status, _) = fx.app.send(Method::GET, &uri, bearer("writer"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn destroy_is_owner_only() {
    let fx = fixture(&[RbacPermission::SchedulesWrite]).await;
    let uri = schedule_uri(&fx);

    let (status, _) = fx
        .app
        .send(Method::DELETE, &uri, bearer("writer"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = fx
        .app
        .send(Method::DELETE, &uri, bearer("owner"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(fx.app.state.store.schedule(fx.schedule.id).await.is_none());
}

#[tokio::test]
async fn destroy_still_requires_schedules_write_for_the_owner() {
    let fx = fixture(&[RbacPermission::SchedulesRead]).await;
    let (status, _) = fx
        .app
        .send(Method::DELETE, &schedule_uri(&fx), bearer("owner"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(fx.app.state.store.schedule(fx.schedule.id).await.is_some());
}

#[tokio::test]
async fn shift_ownership_follows_the_schedule() {
    let fx = fixture(&[RbacPermission::SchedulesRead]).await;
    let uri = shift_uri(&fx);

    let (status, body) = fx.app.send(Method::GET, &uri, bearer("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"], json!(fx.schedule.id.to_string()));

    let (status, _) = fx.app.send(Method::GET, &uri, bearer("writer"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = fx.app.send(Method::GET, &uri, bearer("reader"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn shift_under_another_schedule_is_not_found() {
    let fx = fixture(&[RbacPermission::SchedulesRead]).await;
    let uri = format!(
        "/api/internal/v1/schedules/{}/shifts/{}",
        uuid::Uuid::new_v4(),
        fx.shift.id
    );
    let (status, _) = fx.app.send(Method::GET, &uri, bearer("owner"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn export_token_uri(user: &Principal) -> String {
    format!("/api/internal/v1/users/{}/export_token", user.id)
}

#[tokio::test]
async fn export_token_lifecycle() {
    let user = principal("u", &[RbacPermission::UserSettingsWrite]);
    let app = TestApp::single("t", user.clone());
    let uri = export_token_uri(&user);

    let (status, _) = app.send(Method::GET, &uri, bearer("t"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send(Method::POST, &uri, bearer("t"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(body["export_url"].as_str().unwrap().ends_with(&token));

    let (status, body) = app.send(Method::POST, &uri, bearer("t"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("CONFLICT"));

    let (status, body) = app.send(Method::GET, &uri, bearer("t"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], json!(true));

    let (status, _) = app.send(Method::DELETE, &uri, bearer("t"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &uri, bearer("t"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_token_requires_user_settings_write() {
    for perm in [
        RbacPermission::UserSettingsRead,
        RbacPermission::UserSettingsAdmin,
        RbacPermission::Testing,
    ] {
        let user = principal("u", &[perm]);
        let app = TestApp::single("t", user.clone());
        let uri = export_token_uri(&user);
        for method in [Method::GET, Method::POST, Method::DELETE] {
            let (status, _) = app.send(method.clone(), &uri, bearer("t"), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{perm} {method}");
        }
    }
}

#[tokio::test]
async fn export_token_of_another_user_is_hidden() {
    let me = principal("me", &[RbacPermission::UserSettingsWrite]);
    let other = principal("other", &[RbacPermission::UserSettingsWrite]);
    let app = TestApp::new(
        TokenRegistry::default()
            .with_token("me", me)
            .with_token("other", other.clone()),
        Store::default(),
    );
    let uri = export_token_uri(&other);

    let (status, _) = app.send(Method::POST, &uri, bearer("other"), None).await;
    assert_eq!(status, StatusCode::CREATED);

    for method in [Method::GET, Method::POST, Method::DELETE] {
        let (status, _) = app.send(method.clone(), &uri, bearer("me"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
    }
    assert!(app.state.store.export_token(other.id).await.is_some());
}
