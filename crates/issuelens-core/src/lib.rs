//! Core domain model for issuelens.
//!
//! Pure data and transformations only: the analysis wire model, the
//! relevant-files flattener, the extension to display-language mapping and
//! the file-viewer projection. Nothing in this crate touches the network or
//! the filesystem.

pub mod language;
pub mod protocol;
pub mod tree;
pub mod viewer;

pub use language::language_for;
pub use protocol::*;
pub use tree::{flatten, flatten_under, FlatFile};
pub use viewer::{FileSelection, ViewerDocument};
