use std::fmt;

use crate::types::{Doc, Policy, User};

/// Kind of access requested on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Decides whether `user` may perform `access` on `doc`.
///
/// A doc without a policy is open to everyone. Otherwise the user must be
/// named in the policy directly or through one of their groups, and a
/// read-only policy refuses every write. Policies do not inherit along the
/// path hierarchy.
#[must_use]
pub fn can_access(user: &User, doc: &Doc, access: Access) -> bool {
    let Some(policy) = &doc.policy else {
        return true;
    };

    if access == Access::Write && policy.read_only {
        return false;
    }

    is_member(user, policy)
}

/// True if `policy` names `user` directly or through one of their groups.
#[must_use]
pub fn is_member(user: &User, policy: &Policy) -> bool {
    policy.users.contains(&user.id) || !policy.groups.is_disjoint(&user.groups)
}
