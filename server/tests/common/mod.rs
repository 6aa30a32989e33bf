#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use platform_authn::{GrantedPermission, Principal, TokenRegistry};
use platform_authz::RbacPermission;
use serde_json::Value;
use server::{
    config::AppConfig,
    http::{AppState, build_router},
    store::Store,
};
use tower::ServiceExt;

pub fn principal(name: &str, perms: &[RbacPermission]) -> Arc<Principal> {
    Arc::new(Principal::new(
        name,
        perms
            .iter()
            .map(|p| GrantedPermission::new(p.as_str()))
            .collect(),
    ))
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(registry: TokenRegistry, store: Store) -> Self {
        let state = AppState::new(Arc::new(AppConfig::default()), registry, store)
            .expect("view declarations are valid");
        Self::from_state(state)
    }

    pub fn from_state(state: AppState) -> Self {
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// A single principal reachable with the bearer token `token`.
    pub fn single(token: &str, principal: Arc<Principal>) -> Self {
        Self::new(TokenRegistry::default().with_token(token, principal), Store::default())
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<String>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = authorization {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn bearer(token: &str) -> Option<String> {
    Some(format!("Bearer {token}"))
}

pub fn basic(username: &str, password: &str) -> Option<String> {
    Some(format!(
        "Basic {}",
        STANDARD.encode(format!("{username}:{password}"))
    ))
}
