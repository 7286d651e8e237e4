//! The genealogy graph engine: bounded BFS expansion of the relationship
//! edge list, spouse resolution, privacy filtering and tree assembly.
//!
//! Requests flow discover -> filter -> assemble: both expansions finish,
//! spouses are resolved against the complete discovered set, every
//! candidate person gets a privacy verdict, rejected IDs are pruned from
//! all adjacency maps, and only then is the nested structure materialized.

mod assemble;
pub mod spouses;
pub mod traversal;

pub use assemble::{build_flat_tree, build_nested_tree, list_ancestors, list_descendants};
pub use traversal::{expand, Direction, Expansion};

use serde::Serialize;

use crate::error::{KintreeError, Result};
use crate::model::Person;

/// Hard ceiling on traversal depth.
pub const MAX_DEPTH: usize = 10;
/// Default depth for the nested tree format.
pub const DEFAULT_NESTED_DEPTH: usize = 3;
/// Default depth for the legacy flat ancestor/descendant endpoints.
pub const DEFAULT_LEGACY_DEPTH: usize = 5;

/// Requested output shape. Anything that is not `nested` renders flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFormat {
    Nested,
    Flat,
}

impl TreeFormat {
    pub fn parse(raw: Option<&str>) -> TreeFormat {
        match raw {
            None | Some("nested") => TreeFormat::Nested,
            Some(_) => TreeFormat::Flat,
        }
    }
}

/// Validate an explicit depth against the 0..=10 bound, falling back to
/// the endpoint default when absent. Out-of-range values are rejected
/// before any store access.
pub fn validate_depth(raw: Option<i64>, default: usize) -> Result<usize> {
    match raw {
        None => Ok(default),
        Some(d) if d >= 0 && d <= MAX_DEPTH as i64 => Ok(d as usize),
        Some(d) => Err(KintreeError::InvalidParameter(format!(
            "depth must be between 0 and {}, got {}",
            MAX_DEPTH, d
        ))),
    }
}

/// A node in the nested tree: the full person record plus computed
/// relative arrays. Arrays stop being expanded at the depth bound; leaves
/// carry empty arrays.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub person: Person,
    pub parents: Vec<TreeNode>,
    pub children: Vec<TreeNode>,
    pub spouses: Vec<TreeNode>,
}

impl TreeNode {
    pub(crate) fn leaf(person: Person) -> TreeNode {
        TreeNode {
            person,
            parents: Vec::new(),
            children: Vec::new(),
            spouses: Vec::new(),
        }
    }
}

/// Legacy single-level shape: the root's direct relatives, unmerged.
#[derive(Debug, Clone, Serialize)]
pub struct FlatTree {
    pub root: Person,
    pub parents: Vec<Person>,
    pub children: Vec<Person>,
    pub spouses: Vec<Person>,
}
