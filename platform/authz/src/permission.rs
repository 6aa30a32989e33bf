//! Permission identifiers.
//!
//! Every identifier has the shape `<prefix>.<resource>:<action>`. The catalog is
//! closed: only the pairs declared in [`RbacPermission`] exist, which is not the
//! full resource x action product (`user-settings` is the only resource with an
//! `admin` level).

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::errors::AuthzError;

pub const ACTION_PREFIX: &str = "grafana-oncall-app";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    AlertGroups,
    Integrations,
    EscalationChains,
    Schedules,
    Chatops,
    OutgoingWebhooks,
    Maintenance,
    ApiKeys,
    NotificationSettings,
    UserSettings,
    OtherSettings,
    /// Test scaffolding only.
    ImpossibleTesting,
}

impl Resource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Resource::AlertGroups => "alert-groups",
            Resource::Integrations => "integrations",
            Resource::EscalationChains => "escalation-chains",
            Resource::Schedules => "schedules",
            Resource::Chatops => "chatops",
            Resource::OutgoingWebhooks => "outgoing-webhooks",
            Resource::Maintenance => "maintenance",
            Resource::ApiKeys => "api-keys",
            Resource::NotificationSettings => "notification-settings",
            Resource::UserSettings => "user-settings",
            Resource::OtherSettings => "other-settings",
            Resource::ImpossibleTesting => "impossible-testing",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Read,
    Write,
    Admin,
    /// Test scaffolding only.
    ImpossibleTesting,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Admin => "admin",
            Action::ImpossibleTesting => "impossible-testing",
        }
    }
}

/// Build the identifier string for a (resource, action) pair.
pub fn compose(resource: Resource, action: Action, include_prefix: bool) -> String {
    if include_prefix {
        format!("{ACTION_PREFIX}.{}:{}", resource.as_str(), action.as_str())
    } else {
        format!("{}:{}", resource.as_str(), action.as_str())
    }
}

macro_rules! declare_permissions {
    ($( $(#[$meta:meta])* $variant:ident = $resource:ident : $action:ident => $id:literal ),+ $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RbacPermission {
            $( $(#[$meta])* $variant ),+
        }

        impl RbacPermission {
            /// Every declared identifier, sentinel included.
            pub const DECLARED: &'static [RbacPermission] = &[$( RbacPermission::$variant ),+];

            pub const fn resource(self) -> Resource {
                match self {
                    $( RbacPermission::$variant => Resource::$resource ),+
                }
            }

            pub const fn action(self) -> Action {
                match self {
                    $( RbacPermission::$variant => Action::$action ),+
                }
            }

            /// Full prefixed identifier.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( RbacPermission::$variant => $id ),+
                }
            }
        }
    };
}

declare_permissions! {
    AlertGroupsRead = AlertGroups:Read => "grafana-oncall-app.alert-groups:read",
    AlertGroupsWrite = AlertGroups:Write => "grafana-oncall-app.alert-groups:write",

    IntegrationsRead = Integrations:Read => "grafana-oncall-app.integrations:read",
    IntegrationsWrite = Integrations:Write => "grafana-oncall-app.integrations:write",

    EscalationChainsRead = EscalationChains:Read => "grafana-oncall-app.escalation-chains:read",
    EscalationChainsWrite = EscalationChains:Write => "grafana-oncall-app.escalation-chains:write",

    SchedulesRead = Schedules:Read => "grafana-oncall-app.schedules:read",
    SchedulesWrite = Schedules:Write => "grafana-oncall-app.schedules:write",

    ChatopsRead = Chatops:Read => "grafana-oncall-app.chatops:read",
    ChatopsWrite = Chatops:Write => "grafana-oncall-app.chatops:write",

    OutgoingWebhooksRead = OutgoingWebhooks:Read => "grafana-oncall-app.outgoing-webhooks:read",
    OutgoingWebhooksWrite = OutgoingWebhooks:Write => "grafana-oncall-app.outgoing-webhooks:write",

    MaintenanceRead = Maintenance:Read => "grafana-oncall-app.maintenance:read",
    MaintenanceWrite = Maintenance:Write => "grafana-oncall-app.maintenance:write",

    ApiKeysRead = ApiKeys:Read => "grafana-oncall-app.api-keys:read",
    ApiKeysWrite = ApiKeys:Write => "grafana-oncall-app.api-keys:write",

    NotificationSettingsRead = NotificationSettings:Read => "grafana-oncall-app.notification-settings:read",
    NotificationSettingsWrite = NotificationSettings:Write => "grafana-oncall-app.notification-settings:write",

    UserSettingsRead = UserSettings:Read => "grafana-oncall-app.user-settings:read",
    UserSettingsWrite = UserSettings:Write => "grafana-oncall-app.user-settings:write",
    UserSettingsAdmin = UserSettings:Admin => "grafana-oncall-app.user-settings:admin",

    OtherSettingsRead = OtherSettings:Read => "grafana-oncall-app.other-settings:read",
    OtherSettingsWrite = OtherSettings:Write => "grafana-oncall-app.other-settings:write",

    /// Never granted by a real role and never required by a real view.
    Testing = ImpossibleTesting:ImpossibleTesting => "grafana-oncall-app.impossible-testing:impossible-testing",
}

/// Catalog shown to administrators; excludes [`RbacPermission::Testing`].
pub static ALL_PERMISSIONS: Lazy<Vec<RbacPermission>> = Lazy::new(|| {
    RbacPermission::DECLARED
        .iter()
        .copied()
        .filter(|perm| *perm != RbacPermission::Testing)
        .collect()
});

impl RbacPermission {
    /// Identifier without the namespace prefix, e.g. `schedules:read`.
    pub fn unprefixed(self) -> String {
        compose(self.resource(), self.action(), false)
    }

    pub fn parse(value: &str) -> Result<Self, AuthzError> {
        Self::DECLARED
            .iter()
            .copied()
            .find(|perm| perm.as_str() == value)
            .ok_or_else(|| AuthzError::UnknownPermission(value.to_string()))
    }
}

impl fmt::Display for RbacPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RbacPermission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RbacPermission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RbacPermission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RbacPermission::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn compose_with_and_without_prefix() {
        let suffix = "alert-groups:write";
        assert_eq!(
            compose(Resource::AlertGroups, Action::Write, true),
            format!("grafana-oncall-app.{suffix}")
        );
        assert_eq!(compose(Resource::AlertGroups, Action::Write, false), suffix);
    }

    #[test]
    fn declared_identifiers_match_their_pair() {
        for perm in RbacPermission::DECLARED {
            assert_eq!(perm.as_str(), compose(perm.resource(), perm.action(), true));
            assert_eq!(
                perm.as_str(),
                format!("{ACTION_PREFIX}.{}", perm.unprefixed())
            );
        }
    }

    #[test]
    fn identifiers_are_unique() {
        let ids: HashSet<&str> = RbacPermission::DECLARED.iter().map(|p| p.as_str()).collect();
        assert_eq!(ids.len(), RbacPermission::DECLARED.len());
        let pairs: HashSet<(Resource, Action)> = RbacPermission::DECLARED
            .iter()
            .map(|p| (p.resource(), p.action()))
            .collect();
        assert_eq!(pairs.len(), RbacPermission::DECLARED.len());
    }

    #[test]
    fn catalog_excludes_the_testing_sentinel() {
        assert!(!ALL_PERMISSIONS.contains(&RbacPermission::Testing));
        assert_eq!(ALL_PERMISSIONS.len(), RbacPermission::DECLARED.len() - 1);
        assert!(ALL_PERMISSIONS.contains(&RbacPermission::UserSettingsAdmin));
    }

    #[test]
    fn admin_level_only_exists_for_user_settings() {
        let admins: Vec<_> = ALL_PERMISSIONS
            .iter()
            .filter(|p| p.action() == Action::Admin)
            .collect();
        assert_eq!(admins, vec![&RbacPermission::UserSettingsAdmin]);
        assert!(RbacPermission::parse("grafana-oncall-app.schedules:admin").is_err());
    }

    #[test]
    fn parse_requires_the_prefix() {
        assert_eq!(
            "grafana-oncall-app.chatops:read".parse::<RbacPermission>(),
            Ok(RbacPermission::ChatopsRead)
        );
        assert_eq!(
            "chatops:read".parse::<RbacPermission>(),
            Err(AuthzError::UnknownPermission("chatops:read".into()))
        );
    }

    #[test]
    fn serializes_as_identifier_string() {
        let json = serde_json::to_string(&RbacPermission::SchedulesWrite).unwrap();
        assert_eq!(json, "\"grafana-oncall-app.schedules:write\"");
        let back: RbacPermission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RbacPermission::SchedulesWrite);
    }
}
