//! Information objects and update requests.
//!
//! An [`Information`] lives on each output port. RequestInformation fills in
//! what a node can say about its output before producing it (kind, whole
//! extent, bounds); the executive records on it which request the current
//! output satisfies and whether that run completed.

use serde::{Deserialize, Serialize};

use crate::algs::ghost::PieceSpec;
use crate::data::bounds::{Bounds, Extent};
use crate::data::object::DataKind;

/// What a consumer asks an output port to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub piece: PieceSpec,
    /// Structured sub-extent; `None` means "derive from the piece".
    pub update_extent: Option<Extent>,
}

impl UpdateRequest {
    /// Piece 0 of 1, no ghosts, whole extent.
    pub fn whole() -> Self {
        Self::default()
    }

    pub fn piece(piece: usize, num_pieces: usize, ghost_levels: usize) -> Self {
        Self {
            piece: PieceSpec::new(piece, num_pieces, ghost_levels),
            update_extent: None,
        }
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.update_extent = Some(extent);
        self
    }
}

/// Per-output-port metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Information {
    pub data_kind: Option<DataKind>,
    /// Full structured extent the port can produce, for grid outputs.
    pub whole_extent: Option<Extent>,
    pub bounds: Option<Bounds>,
    /// Per-leaf bounds for composite outputs, in depth-first leaf order.
    pub leaf_bounds: Vec<Option<Bounds>>,
    /// Upper limit on meaningful piece counts (`None`: unlimited).
    pub max_pieces: Option<usize>,
    /// Request the current output satisfies.
    pub last_request: Option<UpdateRequest>,
    /// False when the last run was aborted before finishing.
    pub data_complete: bool,
}

impl Information {
    /// Copy the upstream-derived fields of `src`, keeping this port's kind
    /// and execution record.
    pub fn copy_metadata_from(&mut self, src: &Information) {
        self.whole_extent = src.whole_extent;
        self.bounds = src.bounds;
        self.leaf_bounds = src.leaf_bounds.clone();
        self.max_pieces = src.max_pieces;
    }

    /// Forget everything RequestInformation would recompute.
    pub fn clear_metadata(&mut self) {
        self.whole_extent = None;
        self.bounds = None;
        self.leaf_bounds.clear();
        self.max_pieces = None;
    }
}
