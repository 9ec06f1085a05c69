//! Terminal user interface
//!
//! The search form, the foldable response viewer and their shared
//! rendering helpers.

pub mod json_tree;
pub mod search_tui;
