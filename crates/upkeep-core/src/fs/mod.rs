//! Filesystem primitives shared across features.

pub mod copy;
pub mod tree_hash;

pub use copy::{copy_tree, copy_tree_filtered, remove_path_if_exists};
pub use tree_hash::hash_tree;
