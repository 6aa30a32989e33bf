use tracing::debug;

use crate::{
    errors::{AuthzError, AuthzResult},
    evaluate::has_permissions,
    policy::PermissionCheck,
    record::Record,
    view::{Request, View},
};

/// Table-driven RBAC check.
///
/// Request level: the view must declare `rbac_permissions`; an action missing
/// from it requires nothing. Object level: a view without
/// `rbac_object_permissions` adds no restriction, but once that table is
/// declared any action it does not name is denied.
#[derive(Clone, Copy, Debug, Default)]
pub struct RbacGate;

impl PermissionCheck for RbacGate {
    fn has_permission(&self, request: &Request<'_>, view: &dyn View) -> AuthzResult<bool> {
        let action = view.resolve_action(request);
        let table = view
            .rbac_permissions()
            .ok_or_else(|| AuthzError::MissingRbacPermissions {
                view: view.name().to_string(),
            })?;
        let required = table.required_for(&action);
        let allowed = has_permissions(&request.principal.permissions, required);
        debug!(
            view = view.name(),
            action = %action,
            principal = %request.principal.id,
            required = required.len(),
            allowed,
            "rbac request check"
        );
        Ok(allowed)
    }

    fn has_object_permission(
        &self,
        request: &Request<'_>,
        view: &dyn View,
        object: &dyn Record,
    ) -> AuthzResult<bool> {
        let Some(table) = view.rbac_object_permissions() else {
            return Ok(true);
        };
        let action = view.resolve_action(request);
        let allowed = match table.policy_for(&action) {
            Some(policy) => policy.has_object_permission(request, view, object)?,
            None => false,
        };
        debug!(
            view = view.name(),
            action = %action,
            principal = %request.principal.id,
            allowed,
            "rbac object check"
        );
        Ok(allowed)
    }
}
