//! RBAC-gated HTTP API.
//!
//! Every endpoint declares its permission tables in [`views`] and runs them
//! through `platform-api` guards before touching [`store`].

pub mod config;
pub mod http;
pub mod store;
pub mod views;

use std::sync::Arc;

use anyhow::Result;
use platform_authn::{GrantedPermission, Principal, PrincipalId, TokenRegistry};
use tracing::info;

use crate::{config::AppConfig, http::AppState, store::Store};

/// Build the application state from configuration, seeding principals and
/// their schedules.
pub async fn bootstrap(config: Arc<AppConfig>) -> Result<AppState> {
    let mut registry = TokenRegistry::default();
    let store = Store::default();

    for seed in &config.principals {
        let principal = Arc::new(Principal {
            id: PrincipalId::new(),
            name: seed.name.clone(),
            permissions: seed
                .permissions
                .iter()
                .map(|perm| GrantedPermission::new(perm.as_str()))
                .collect(),
            is_staff: seed.is_staff,
        });
        registry = registry.with_token(seed.token.clone(), principal.clone());
        if let Some(basic) = &seed.basic {
            registry = registry.with_basic(
                basic.username.clone(),
                basic.password.clone(),
                principal.clone(),
            );
        }
        for name in &seed.schedules {
            let schedule = store.insert_schedule(name.clone(), principal.clone()).await;
            store.insert_shift("on-call", schedule).await;
        }
        info!(
            principal = %principal.id,
            name = %principal.name,
            permissions = principal.permissions.len(),
            "principal registered"
        );
    }

    AppState::new(config, registry, store)
}
