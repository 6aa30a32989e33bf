use std::fmt;

use platform_authn::{Principal, PrincipalId};

use crate::errors::{AuthzError, AuthzResult};

/// An object an ownership check can walk.
///
/// `attribute` exposes named nested records (`schedule`, `user`, ...).
/// `principal_id` is set on records that *are* a principal.
pub trait Record {
    fn attribute(&self, _name: &str) -> Option<&dyn Record> {
        None
    }

    fn principal_id(&self) -> Option<PrincipalId> {
        None
    }
}

impl Record for Principal {
    fn principal_id(&self) -> Option<PrincipalId> {
        Some(self.id)
    }
}

impl Record for PrincipalId {
    fn principal_id(&self) -> Option<PrincipalId> {
        Some(*self)
    }
}

impl Record for () {}

impl<T: Record + ?Sized> Record for std::sync::Arc<T> {
    fn attribute(&self, name: &str) -> Option<&dyn Record> {
        (**self).attribute(name)
    }

    fn principal_id(&self) -> Option<PrincipalId> {
        (**self).principal_id()
    }
}

/// Dotted attribute path such as `schedule.user`.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnershipPath {
    raw: String,
    segments: Vec<String>,
}

impl OwnershipPath {
    pub fn parse(raw: &str) -> AuthzResult<Self> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty() || s.trim() != s) {
            return Err(AuthzError::InvalidOwnershipPath(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn resolve<'a>(&self, object: &'a dyn Record) -> AuthzResult<&'a dyn Record> {
        self.segments.iter().try_fold(object, |current, segment| {
            current
                .attribute(segment)
                .ok_or_else(|| AuthzError::UnresolvedOwnershipPath {
                    path: self.raw.clone(),
                    segment: segment.clone(),
                })
        })
    }
}

impl fmt::Debug for OwnershipPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnershipPath").field(&self.raw).finish()
    }
}
