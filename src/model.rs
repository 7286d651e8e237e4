//! Domain records for the genealogy service.
//!
//! Enum fields parse from the wire strings used throughout the store
//! (`public`/`internal`/`sensitive`, `parent_of`/`spouse_of`/...); a bad
//! value is an `InvalidParameter` error, rejected before any store access.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KintreeError;

/// Per-resource privacy level, evaluated by the privacy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Internal,
    Sensitive,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Internal => "internal",
            Privacy::Sensitive => "sensitive",
        }
    }
}

impl FromStr for Privacy {
    type Err = KintreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Privacy::Public),
            "internal" => Ok(Privacy::Internal),
            "sensitive" => Ok(Privacy::Sensitive),
            other => Err(KintreeError::InvalidParameter(format!(
                "unrecognized privacy value: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed relationship edge. `parent_of` is directed (from = parent,
/// to = child); `spouse_of` and `sibling_of` are undirected in effect but
/// stored as a single directed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    ParentOf,
    SpouseOf,
    SiblingOf,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::ParentOf => "parent_of",
            RelationType::SpouseOf => "spouse_of",
            RelationType::SiblingOf => "sibling_of",
        }
    }
}

impl FromStr for RelationType {
    type Err = KintreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent_of" => Ok(RelationType::ParentOf),
            "spouse_of" => Ok(RelationType::SpouseOf),
            "sibling_of" => Ok(RelationType::SiblingOf),
            other => Err(KintreeError::InvalidParameter(format!(
                "unrecognized relationship type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-wide user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Member,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Member => "member",
            Role::Guest => "guest",
        }
    }
}

impl FromStr for Role {
    type Err = KintreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "member" => Ok(Role::Member),
            "guest" => Ok(Role::Guest),
            other => Err(KintreeError::InvalidParameter(format!(
                "unrecognized role: {}",
                other
            ))),
        }
    }
}

/// The actor identity handed to the privacy guard: who is asking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub is_banned: bool,
}

/// A person record, exclusively owned by its branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub branch_id: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub phone: String,
    pub address: String,
    pub privacy: Privacy,
    pub note: String,
    pub avatar_media_id: Option<String>,
    pub generation: Option<i64>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A relationship edge between two persons in the same branch.
/// The tuple (branch_id, from_person_id, to_person_id, type) is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub branch_id: String,
    pub from_person_id: String,
    pub to_person_id: String,
    #[serde(rename = "type")]
    pub rel_type: RelationType,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Membership entry on a branch's access-control list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchMember {
    pub user_id: String,
    pub role_in_branch: String,
    pub joined_at: String,
}

/// An isolated genealogy collection with its own ACL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub members: Vec<BranchMember>,
    pub created_at: String,
    pub updated_at: String,
}

impl Branch {
    /// Whether the given user is the branch owner or on the member list.
    /// Any member role (owner/editor/viewer) qualifies.
    pub fn is_owner_or_member(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.members.iter().any(|m| m.user_id == user_id)
    }
}

/// A life event (birth, marriage, ...) linked to zero or more persons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub branch_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_date: Option<String>,
    pub location: String,
    pub description: String,
    pub person_ids: Vec<String>,
    pub privacy: Privacy,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A media record (image/video). Storage and streaming live outside this
/// service; only the metadata row is kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub branch_id: String,
    pub person_id: Option<String>,
    pub event_id: Option<String>,
    pub kind: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub privacy: Privacy,
    pub uploaded_by: String,
    pub created_at: String,
    pub updated_at: String,
}
