//! Serializable option structs for the built-in nodes.
//!
//! Every struct has a `Default` and deserializes from partial input, so a
//! driver can load just the fields it cares about from JSON or TOML.

use serde::{Deserialize, Serialize};

use crate::algs::ghost::PieceSpec;
use crate::algs::piece::ExtractOptions;
use crate::data::bounds::Extent;
use crate::data::dataset::DatasetKind;
use crate::mesh_error::MeshFlowError;
use crate::pipeline::information::UpdateRequest;

pub use crate::algs::append::MergeOptions;

/// Piece request plus extraction behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceOptions {
    pub piece: usize,
    pub num_pieces: usize,
    pub ghost_levels: usize,
    /// Spread points used by no cell over the pieces instead of dropping them.
    pub distribute_orphan_points: bool,
    /// Attach `ghost_level` arrays to extracted pieces.
    pub ghost_arrays: bool,
}

impl Default for PieceOptions {
    fn default() -> Self {
        Self {
            piece: 0,
            num_pieces: 1,
            ghost_levels: 0,
            distribute_orphan_points: true,
            ghost_arrays: true,
        }
    }
}

impl PieceOptions {
    pub fn spec(&self) -> PieceSpec {
        PieceSpec::new(self.piece, self.num_pieces, self.ghost_levels)
    }

    /// The update request these options describe.
    pub fn request(&self) -> Result<UpdateRequest, MeshFlowError> {
        let spec = self.spec();
        spec.validate()?;
        Ok(UpdateRequest {
            piece: spec,
            update_extent: None,
        })
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            distribute_orphan_points: self.distribute_orphan_points,
            ghost_arrays: self.ghost_arrays,
        }
    }
}

/// Volume of interest and per-axis sample rate for structured grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiOptions {
    pub voi: Extent,
    pub sample_rate: [usize; 3],
}

impl Default for VoiOptions {
    fn default() -> Self {
        Self {
            voi: Extent([i32::MIN, i32::MAX, i32::MIN, i32::MAX, i32::MIN, i32::MAX]),
            sample_rate: [1, 1, 1],
        }
    }
}

impl VoiOptions {
    pub fn validate(&self) -> Result<(), MeshFlowError> {
        if self.sample_rate.contains(&0) {
            return Err(MeshFlowError::InvalidExtent(self.voi.0));
        }
        Ok(())
    }
}

/// Options of the append nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppendOptions {
    /// Kind of the merged output; `None` follows the first input.
    pub output_kind: Option<DatasetKind>,
    #[serde(flatten)]
    pub merge: MergeOptions,
}
