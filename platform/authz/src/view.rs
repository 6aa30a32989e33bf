//! Handler declarations consumed by the gate.
//!
//! A handler is either a [`ViewSet`] (collection style, dispatching on a named
//! action such as `list` or `retrieve`) or an [`ApiView`] (one operation per
//! HTTP method). Both read their tables from a shared [`ViewConfig`].

use std::{collections::HashMap, fmt, sync::Arc};

use http::Method;
use platform_authn::{AuthMethod, Principal};

use crate::{gate::RbacGate, permission::RbacPermission, policy::PermissionCheck};

/// What the gate needs to know about the incoming request.
#[derive(Clone, Debug)]
pub struct Request<'a> {
    pub principal: &'a Principal,
    pub method: Method,
    pub auth_method: AuthMethod,
}

impl<'a> Request<'a> {
    pub fn new(principal: &'a Principal, method: Method) -> Self {
        Self {
            principal,
            method,
            auth_method: AuthMethod::PluginToken,
        }
    }

    pub fn with_auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }
}

/// Action name -> permissions required to perform it.
///
/// Actions without an entry require nothing.
#[derive(Clone, Debug, Default)]
pub struct RbacPermissions {
    by_action: HashMap<String, Vec<RbacPermission>>,
}

impl RbacPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl Into<String>, required: &[RbacPermission]) -> Self {
        self.by_action.insert(action.into(), required.to_vec());
        self
    }

    pub fn required_for(&self, action: &str) -> &[RbacPermission] {
        self.by_action
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Instance-level policies, each governing a set of actions.
///
/// Entries are consulted in declaration order and the first one naming the
/// action decides.
#[derive(Clone, Default)]
pub struct RbacObjectPermissions {
    entries: Vec<(Arc<dyn PermissionCheck>, Vec<String>)>,
}

impl RbacObjectPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy<P, I, S>(mut self, policy: P, actions: I) -> Self
    where
        P: PermissionCheck + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push((
            Arc::new(policy),
            actions.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn policy_for(&self, action: &str) -> Option<&dyn PermissionCheck> {
        self.entries
            .iter()
            .find(|(_, actions)| actions.iter().any(|a| a == action))
            .map(|(policy, _)| policy.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RbacObjectPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(policy, actions)| (policy, actions)))
            .finish()
    }
}

/// Declarations attached to a handler at registration time.
#[derive(Clone, Debug)]
pub struct ViewConfig {
    name: String,
    rbac_permissions: Option<RbacPermissions>,
    rbac_object_permissions: Option<RbacObjectPermissions>,
    permission_classes: Vec<Arc<dyn PermissionCheck>>,
}

impl ViewConfig {
    /// A view guarded by [`RbacGate`] with no tables declared yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rbac_permissions: None,
            rbac_object_permissions: None,
            permission_classes: vec![Arc::new(RbacGate)],
        }
    }

    pub fn rbac_permissions(mut self, table: RbacPermissions) -> Self {
        self.rbac_permissions = Some(table);
        self
    }

    pub fn rbac_object_permissions(mut self, table: RbacObjectPermissions) -> Self {
        self.rbac_object_permissions = Some(table);
        self
    }

    pub fn permission_classes(mut self, classes: Vec<Arc<dyn PermissionCheck>>) -> Self {
        self.permission_classes = classes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub trait View: Send + Sync {
    fn config(&self) -> &ViewConfig;

    /// The key used to look up both permission tables.
    fn resolve_action(&self, request: &Request<'_>) -> String;

    fn name(&self) -> &str {
        self.config().name()
    }

    fn rbac_permissions(&self) -> Option<&RbacPermissions> {
        self.config().rbac_permissions.as_ref()
    }

    fn rbac_object_permissions(&self) -> Option<&RbacObjectPermissions> {
        self.config().rbac_object_permissions.as_ref()
    }

    fn permission_classes(&self) -> &[Arc<dyn PermissionCheck>] {
        &self.config().permission_classes
    }
}

/// Collection-style handler bound to the action being dispatched.
#[derive(Clone, Debug)]
pub struct ViewSet {
    config: Arc<ViewConfig>,
    action: String,
}

impl ViewSet {
    pub fn new(config: Arc<ViewConfig>, action: impl Into<String>) -> Self {
        Self {
            config,
            action: action.into(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl View for ViewSet {
    fn config(&self) -> &ViewConfig {
        &self.config
    }

    fn resolve_action(&self, _request: &Request<'_>) -> String {
        self.action.clone()
    }
}

/// Single-operation handler; the HTTP method is the action.
#[derive(Clone, Debug)]
pub struct ApiView {
    config: Arc<ViewConfig>,
}

impl ApiView {
    pub fn new(config: Arc<ViewConfig>) -> Self {
        Self { config }
    }
}

impl View for ApiView {
    fn config(&self) -> &ViewConfig {
        &self.config
    }

    fn resolve_action(&self, request: &Request<'_>) -> String {
        request.method.as_str().to_ascii_lowercase()
    }
}
