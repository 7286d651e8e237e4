//! Privacy guard: the access-control predicate applied per resource per
//! actor, uniformly across persons, events and media.
//!
//! Policy, evaluated in order:
//! 1. `public` is visible to everyone, anonymous included.
//! 2. No actor (or a banned one) sees nothing else.
//! 3. `admin` sees everything.
//! 4. `internal` is visible to any authenticated actor. This is global by
//!    current policy, branch membership is NOT required.
//! 5. `sensitive` is visible to `editor` actors, and to the owner or any
//!    listed member of the resource's branch.
//!
//! A node's visibility never implies anything about its neighbors; callers
//! evaluate the predicate once per node.

use crate::db::Db;
use crate::error::Result;
use crate::model::{Actor, Branch, Event, Media, Person, Privacy, Role};
use crate::store;

/// Resources the guard can evaluate: anything with a privacy level and an
/// owning branch.
pub trait Protected {
    fn privacy(&self) -> Privacy;
    fn branch_id(&self) -> Option<&str>;
}

impl Protected for Person {
    fn privacy(&self) -> Privacy {
        self.privacy
    }
    fn branch_id(&self) -> Option<&str> {
        Some(&self.branch_id)
    }
}

impl Protected for Event {
    fn privacy(&self) -> Privacy {
        self.privacy
    }
    fn branch_id(&self) -> Option<&str> {
        Some(&self.branch_id)
    }
}

impl Protected for Media {
    fn privacy(&self) -> Privacy {
        self.privacy
    }
    fn branch_id(&self) -> Option<&str> {
        Some(&self.branch_id)
    }
}

/// Pure visibility predicate. `branch` is the resource's owning branch,
/// pre-fetched by the caller; it is consulted only for `sensitive`
/// resources, so passing `None` elsewhere is fine.
///
/// Banned actors are treated as absent.
pub fn can_view<R: Protected + ?Sized>(
    resource: &R,
    actor: Option<&Actor>,
    branch: Option<&Branch>,
) -> bool {
    if resource.privacy() == Privacy::Public {
        return true;
    }

    let actor = match actor.filter(|a| !a.is_banned) {
        Some(a) => a,
        None => return false,
    };

    if actor.role == Role::Admin {
        return true;
    }

    match resource.privacy() {
        Privacy::Public => true,
        // Open to all logged-in users regardless of branch membership.
        Privacy::Internal => true,
        Privacy::Sensitive => {
            if actor.role == Role::Editor {
                return true;
            }
            match (resource.branch_id(), branch) {
                (Some(resource_branch), Some(branch)) if branch.id == resource_branch => {
                    branch.is_owner_or_member(&actor.id)
                }
                _ => false,
            }
        }
    }
}

/// Visibility check that lazily loads the resource's branch when the pure
/// predicate needs it (the single permitted lookup).
pub async fn check<R: Protected>(db: &Db, resource: &R, actor: Option<&Actor>) -> Result<bool> {
    // Only sensitive resources consult the branch ACL.
    if resource.privacy() != Privacy::Sensitive {
        return Ok(can_view(resource, actor, None));
    }

    let branch = match resource.branch_id() {
        Some(id) => store::branch::find_by_id(db, id).await?,
        None => None,
    };

    Ok(can_view(resource, actor, branch.as_ref()))
}
