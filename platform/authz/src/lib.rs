//! Authorization primitives for the API layer.
//!
//! Two decisions are made here. [`RbacGate::has_permission`] answers whether a
//! principal may reach a handler at all, using the handler's
//! [`RbacPermissions`] table. [`RbacGate::has_object_permission`] answers
//! whether it may act on a specific instance, delegating to the policies in the
//! handler's [`RbacObjectPermissions`] table ([`IsOwner`],
//! [`HasRbacPermissions`], [`IsOwnerOrHasRbacPermissions`]).
//!
//! Decisions are `Ok(bool)`. An `Err` is always a declaration mistake and must
//! never be read as allow or deny.

mod errors;
mod evaluate;
mod gate;
mod permission;
mod policy;
mod record;
mod view;

pub use errors::{AuthzError, AuthzResult};
pub use evaluate::has_permissions;
pub use gate::RbacGate;
pub use permission::{ACTION_PREFIX, ALL_PERMISSIONS, Action, RbacPermission, Resource, compose};
pub use policy::{
    HasRbacPermissions, IsOwner, IsOwnerOrHasRbacPermissions, IsStaff, PermissionCheck,
};
pub use record::{OwnershipPath, Record};
pub use view::{
    ApiView, RbacObjectPermissions, RbacPermissions, Request, View, ViewConfig, ViewSet,
};
