use platform_authn::GrantedPermission;

use crate::permission::RbacPermission;

/// True when every required permission appears among the granted ones.
///
/// An empty requirement list is always satisfied. Grant order and duplicate
/// grants do not matter.
pub fn has_permissions(granted: &[GrantedPermission], required: &[RbacPermission]) -> bool {
    required.iter().all(|required| {
        granted
            .iter()
            .any(|grant| grant.action == required.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grants(perms: &[RbacPermission]) -> Vec<GrantedPermission> {
        perms
            .iter()
            .map(|p| GrantedPermission::new(p.as_str()))
            .collect()
    }

    #[test]
    fn single_matching_grant() {
        let granted = grants(&[RbacPermission::AlertGroupsRead]);
        assert!(has_permissions(&granted, &[RbacPermission::AlertGroupsRead]));
    }

    #[test]
    fn all_required_present() {
        let granted = grants(&[
            RbacPermission::AlertGroupsRead,
            RbacPermission::AlertGroupsWrite,
        ]);
        assert!(has_permissions(
            &granted,
            &[RbacPermission::AlertGroupsRead, RbacPermission::AlertGroupsWrite]
        ));
    }

    #[test]
    fn unrelated_grant_does_not_satisfy() {
        let granted = grants(&[RbacPermission::Testing]);
        assert!(!has_permissions(&granted, &[RbacPermission::AlertGroupsRead]));
    }

    #[test]
    fn partial_coverage_is_denied() {
        let granted = grants(&[RbacPermission::AlertGroupsRead]);
        assert!(!has_permissions(
            &granted,
            &[RbacPermission::AlertGroupsRead, RbacPermission::AlertGroupsWrite]
        ));
    }

    #[test]
    fn nothing_required_is_always_allowed() {
        assert!(has_permissions(&[], &[]));
        assert!(has_permissions(&grants(&[RbacPermission::Testing]), &[]));
    }

    #[test]
    fn order_and_duplicates_are_irrelevant() {
        let required = [RbacPermission::SchedulesRead, RbacPermission::ChatopsWrite];
        let granted = grants(&[
            RbacPermission::ChatopsWrite,
            RbacPermission::ChatopsWrite,
            RbacPermission::SchedulesRead,
        ]);
        assert!(has_permissions(&granted, &required));
        let reversed: Vec<_> = required.iter().rev().copied().collect();
        assert!(has_permissions(&granted, &reversed));
        assert!(has_permissions(
            &granted,
            &[RbacPermission::SchedulesRead, RbacPermission::SchedulesRead]
        ));
    }

    #[test]
    fn unprefixed_grants_do_not_match() {
        let granted = vec![GrantedPermission::new("schedules:read")];
        assert!(!has_permissions(&granted, &[RbacPermission::SchedulesRead]));
    }
}
