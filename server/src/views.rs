//! Permission declarations for every gated endpoint.

use std::sync::Arc;

use platform_authz::{
    AuthzResult, IsOwner, IsOwnerOrHasRbacPermissions, IsStaff, PermissionCheck, RbacGate,
    RbacObjectPermissions, RbacPermission, RbacPermissions, ViewConfig,
};

#[derive(Debug)]
pub struct Views {
    pub permissions: Arc<ViewConfig>,
    pub slack_settings: Arc<ViewConfig>,
    pub organization: Arc<ViewConfig>,
    pub user_export_token: Arc<ViewConfig>,
    pub schedules: Arc<ViewConfig>,
    pub staff_principals: Arc<ViewConfig>,
}

impl Views {
    pub fn declare() -> AuthzResult<Self> {
        Ok(Self {
            permissions: Arc::new(
                ViewConfig::new("permissions").rbac_permissions(RbacPermissions::new()),
            ),
            slack_settings: Arc::new(
                ViewConfig::new("slack_settings").rbac_permissions(
                    RbacPermissions::new()
                        .action("get", &[RbacPermission::ChatopsRead])
                        .action("put", &[RbacPermission::ChatopsWrite]),
                ),
            ),
            organization: Arc::new(
                ViewConfig::new("organization").rbac_permissions(
                    RbacPermissions::new()
                        .action("get", &[])
                        .action("put", &[RbacPermission::OtherSettingsWrite]),
                ),
            ),
            user_export_token: Arc::new(
                ViewConfig::new("user_export_token").rbac_permissions(
                    RbacPermissions::new()
                        .action("get", &[RbacPermission::UserSettingsWrite])
                        .action("post", &[RbacPermission::UserSettingsWrite])
                        .action("delete", &[RbacPermission::UserSettingsWrite]),
                ),
            ),
            schedules: Arc::new(schedules()?),
            staff_principals: Arc::new(staff_principals()),
        })
    }
}

fn schedules() -> AuthzResult<ViewConfig> {
    Ok(ViewConfig::new("schedules")
        .rbac_permissions(
            RbacPermissions::new()
                .action("list", &[RbacPermission::SchedulesRead])
                .action("retrieve", &[RbacPermission::SchedulesRead])
                .action("shift", &[RbacPermission::SchedulesRead])
                .action("destroy", &[RbacPermission::SchedulesWrite]),
        )
        .rbac_object_permissions(
            RbacObjectPermissions::new()
                .policy(
                    IsOwnerOrHasRbacPermissions::new([RbacPermission::SchedulesWrite], Some("user"))?,
                    ["retrieve"],
                )
                .policy(
                    IsOwnerOrHasRbacPermissions::new(
                        [RbacPermission::SchedulesWrite],
                        Some("schedule.user"),
                    )?,
                    ["shift"],
                )
                .policy(IsOwner::field("user")?, ["destroy"]),
        ))
}

fn staff_principals() -> ViewConfig {
    let classes: Vec<Arc<dyn PermissionCheck>> = vec![Arc::new(RbacGate), Arc::new(IsStaff)];
    ViewConfig::new("staff_principals")
        .rbac_permissions(RbacPermissions::new().action("get", &[]))
        .permission_classes(classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_are_valid() {
        let views = Views::declare().unwrap();
        assert_eq!(views.schedules.name(), "schedules");
    }
}
