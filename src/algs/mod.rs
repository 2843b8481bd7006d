//! Dataset algorithms: piece decomposition, merging, and rank transport.

pub mod append;
pub mod communicator;
pub mod composite_append;
pub mod extent;
pub mod field_ledger;
pub mod ghost;
pub mod piece;
pub mod point_matcher;

pub use append::{MergeOptions, append_datasets};
pub use composite_append::append_composites;
pub use ghost::{GhostClassifier, PieceSelector, PieceSpec};
pub use piece::{extract_all_pieces, extract_piece};
