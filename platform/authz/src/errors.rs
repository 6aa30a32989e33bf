use thiserror::Error;

pub type AuthzResult<T> = Result<T, AuthzError>;

/// Failures that are not access decisions.
///
/// A denied request is `Ok(false)`. Every variant here means the caller's
/// declarations are wrong and must not be treated as either allow or deny.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("view `{view}` uses RbacGate without declaring rbac_permissions")]
    MissingRbacPermissions { view: String },
    #[error("ownership path `{path}` has no attribute `{segment}` on the supplied object")]
    UnresolvedOwnershipPath { path: String, segment: String },
    #[error("invalid ownership path `{0}`")]
    InvalidOwnershipPath(String),
    #[error("unknown permission identifier `{0}`")]
    UnknownPermission(String),
}

impl AuthzError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::MissingRbacPermissions { .. } => "MISSING_RBAC_PERMISSIONS",
            AuthzError::UnresolvedOwnershipPath { .. } => "UNRESOLVED_OWNERSHIP_PATH",
            AuthzError::InvalidOwnershipPath(_) => "INVALID_OWNERSHIP_PATH",
            AuthzError::UnknownPermission(_) => "UNKNOWN_PERMISSION",
        }
    }
}
