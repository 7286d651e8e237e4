pub mod config;
pub mod error;
pub mod db;
pub mod model;
pub mod privacy;
pub mod store;
pub mod tree;
pub mod http;

pub use config::Config;
pub use error::{KintreeError, Result};
pub use tree::{build_flat_tree, build_nested_tree, list_ancestors, list_descendants};
