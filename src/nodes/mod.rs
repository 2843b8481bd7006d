//! Built-in pipeline nodes.

pub mod append;
pub mod extract_piece;
pub mod extract_voi;
pub mod gather;
pub mod grid_source;
pub mod producer;

pub use append::{AppendComposite, AppendDatasets};
pub use extract_piece::ExtractPiece;
pub use extract_voi::ExtractVoi;
pub use gather::GatherPieces;
pub use grid_source::{FieldFn, GridSource};
pub use producer::DataProducer;
