//! Who may moderate whom.
//!
//! The ledger records flags; it never decides authority. Authority is
//! supplied by the embedding application through this trait, so the host's
//! real org structure (chat admin lists, an IAM call, a static file) can
//! plug in without touching ledger code.

use std::collections::HashSet;

use merit_types::{AccountId, ReviewerId};

/// Decides whether a reviewer may apply moderation actions to an account.
pub trait PermissionHierarchy: Send + Sync {
    fn can_manage(&self, actor: ReviewerId, target: AccountId) -> bool;
}

/// Hierarchy from two configured id sets.
///
/// Rules, in order: nobody manages their own account; supervisors manage
/// anyone else; operators manage only targets that are neither operators
/// nor supervisors. Reviewers and accounts share the host's id space, which
/// is what makes the self check meaningful.
#[derive(Clone, Debug, Default)]
pub struct StaticHierarchy {
    operators: HashSet<u64>,
    supervisors: HashSet<u64>,
}

impl StaticHierarchy {
    pub fn new(
        operators: impl IntoIterator<Item = u64>,
        supervisors: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            operators: operators.into_iter().collect(),
            supervisors: supervisors.into_iter().collect(),
        }
    }

    fn is_privileged(&self, id: u64) -> bool {
        self.operators.contains(&id) || self.supervisors.contains(&id)
    }
}

impl PermissionHierarchy for StaticHierarchy {
    fn can_manage(&self, actor: ReviewerId, target: AccountId) -> bool {
        if actor.raw() == target.raw() {
            return false;
        }
        if self.supervisors.contains(&actor.raw()) {
            return true;
        }
        self.operators.contains(&actor.raw()) && !self.is_privileged(target.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> StaticHierarchy {
        StaticHierarchy::new([10, 11], [20])
    }

    #[test]
    fn nobody_manages_themselves() {
        let h = hierarchy();
        assert!(!h.can_manage(ReviewerId::new(20), AccountId::new(20)));
        assert!(!h.can_manage(ReviewerId::new(10), AccountId::new(10)));
    }

    #[test]
    fn supervisors_manage_everyone_else() {
        let h = hierarchy();
        assert!(h.can_manage(ReviewerId::new(20), AccountId::new(5)));
        assert!(h.can_manage(ReviewerId::new(20), AccountId::new(10)));
        assert!(h.can_manage(ReviewerId::new(20), AccountId::new(11)));
    }

    #[test]
    fn operators_manage_only_unprivileged_targets() {
        let h = hierarchy();
        assert!(h.can_manage(ReviewerId::new(10), AccountId::new(5)));
        assert!(!h.can_manage(ReviewerId::new(10), AccountId::new(11)));
        assert!(!h.can_manage(ReviewerId::new(10), AccountId::new(20)));
    }

    #[test]
    fn unlisted_reviewers_manage_nobody() {
        let h = hierarchy();
        assert!(!h.can_manage(ReviewerId::new(99), AccountId::new(5)));
    }
}
