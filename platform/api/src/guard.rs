use platform_authz::{Record, Request, View};
use tracing::warn;

use crate::{ApiError, ApiResult};

/// Run every permission class of `view` against the request.
///
/// The first class answering `false` ends the check with 403. A class that
/// errors aborts with a misconfiguration (500), never with a denial.
pub fn check_permissions(request: &Request<'_>, view: &dyn View) -> ApiResult<()> {
    for class in view.permission_classes() {
        if !class.has_permission(request, view)? {
            warn!(
                view = view.name(),
                action = %view.resolve_action(request),
                principal = %request.principal.id,
                check = ?class,
                "request denied"
            );
            return Err(ApiError::Forbidden);
        }
    }
    Ok(())
}

/// Instance-level counterpart of [`check_permissions`]; call after loading the
/// object and before touching it.
pub fn check_object_permissions(
    request: &Request<'_>,
    view: &dyn View,
    object: &dyn Record,
) -> ApiResult<()> {
    for class in view.permission_classes() {
        if !class.has_object_permission(request, view, object)? {
            warn!(
                view = view.name(),
                action = %view.resolve_action(request),
                principal = %request.principal.id,
                check = ?class,
                "object access denied"
            );
            return Err(ApiError::Forbidden);
        }
    }
    Ok(())
}
