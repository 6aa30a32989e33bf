//! Access policies.
//!
//! Every policy answers two questions, either of which may be left at its
//! permissive default: may this request reach the view at all, and may it act
//! on this particular object.

use std::fmt;

use platform_authn::AuthMethod;

use crate::{
    errors::AuthzResult,
    evaluate::has_permissions,
    permission::RbacPermission,
    record::{OwnershipPath, Record},
    view::{Request, View},
};

pub trait PermissionCheck: fmt::Debug + Send + Sync {
    fn has_permission(&self, _request: &Request<'_>, _view: &dyn View) -> AuthzResult<bool> {
        Ok(true)
    }

    fn has_object_permission(
        &self,
        _request: &Request<'_>,
        _view: &dyn View,
        _object: &dyn Record,
    ) -> AuthzResult<bool> {
        Ok(true)
    }
}

/// The requester must be the object, or the principal found at `field`.
#[derive(Clone, Debug, Default)]
pub struct IsOwner {
    field: Option<OwnershipPath>,
}

impl IsOwner {
    /// Compare the object itself with the requester.
    pub fn new() -> Self {
        Self { field: None }
    }

    /// Compare the record at a dotted path (`schedule.user`) with the requester.
    pub fn field(path: &str) -> AuthzResult<Self> {
        Ok(Self {
            field: Some(OwnershipPath::parse(path)?),
        })
    }

    fn owns(&self, request: &Request<'_>, object: &dyn Record) -> AuthzResult<bool> {
        let owner = match &self.field {
            Some(path) => path.resolve(object)?,
            None => object,
        };
        Ok(owner.principal_id() == Some(request.principal.id))
    }
}

impl PermissionCheck for IsOwner {
    fn has_object_permission(
        &self,
        request: &Request<'_>,
        _view: &dyn View,
        object: &dyn Record,
    ) -> AuthzResult<bool> {
        self.owns(request, object)
    }
}

/// Blanket permission over every instance, regardless of ownership.
#[derive(Clone, Debug)]
pub struct HasRbacPermissions {
    required: Vec<RbacPermission>,
}

impl HasRbacPermissions {
    pub fn new(required: impl IntoIterator<Item = RbacPermission>) -> Self {
        Self {
            required: required.into_iter().collect(),
        }
    }

    fn granted(&self, request: &Request<'_>) -> bool {
        has_permissions(&request.principal.permissions, &self.required)
    }
}

impl PermissionCheck for HasRbacPermissions {
    fn has_object_permission(
        &self,
        request: &Request<'_>,
        _view: &dyn View,
        _object: &dyn Record,
    ) -> AuthzResult<bool> {
        Ok(self.granted(request))
    }
}

#[derive(Clone, Debug)]
pub struct IsOwnerOrHasRbacPermissions {
    is_owner: IsOwner,
    has_rbac_permissions: HasRbacPermissions,
}

impl IsOwnerOrHasRbacPermissions {
    pub fn new(
        required: impl IntoIterator<Item = RbacPermission>,
        ownership_field: Option<&str>,
    ) -> AuthzResult<Self> {
        let is_owner = match ownership_field {
            Some(path) => IsOwner::field(path)?,
            None => IsOwner::new(),
        };
        Ok(Self {
            is_owner,
            has_rbac_permissions: HasRbacPermissions::new(required),
        })
    }
}

impl PermissionCheck for IsOwnerOrHasRbacPermissions {
    fn has_object_permission(
        &self,
        request: &Request<'_>,
        _view: &dyn View,
        object: &dyn Record,
    ) -> AuthzResult<bool> {
        // A broken ownership path must error even for principals holding the
        // blanket permission.
        if self.is_owner.owns(request, object)? {
            return Ok(true);
        }
        Ok(self.has_rbac_permissions.granted(request))
    }
}

/// Staff members authenticated interactively (basic auth or session).
#[derive(Clone, Copy, Debug, Default)]
pub struct IsStaff;

impl IsStaff {
    pub const STAFF_AUTH_METHODS: [AuthMethod; 2] = [AuthMethod::Basic, AuthMethod::Session];
}

impl PermissionCheck for IsStaff {
    fn has_permission(&self, request: &Request<'_>, _view: &dyn View) -> AuthzResult<bool> {
        if !Self::STAFF_AUTH_METHODS.contains(&request.auth_method) {
            return Ok(false);
        }
        Ok(request.principal.is_staff)
    }
}
