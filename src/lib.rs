#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-pipeline
//!
//! mesh-pipeline is a demand-driven dataset pipeline for scientific
//! visualization and analysis codes. Nodes are wired into a directed acyclic
//! graph; asking a node for its output negotiates, upstream, exactly what
//! must be produced (piece, structured extent, ghost layers) and then runs
//! only the nodes whose outputs are stale.
//!
//! ## Features
//! - Typed datasets: point clouds, polygonal surfaces, unstructured meshes,
//!   volume grids and tables, each with point and cell attribute sets
//! - Composite trees of datasets with structural-compatibility checks
//! - A four-pass executive (data object, information, update extent, data)
//!   with timestamp-based caching and per-branch failure isolation
//! - Piece decomposition with ghost-layer growth and `ghost_level` arrays
//! - Dataset merging with attribute-compatibility intersection and
//!   tolerance-based point welding
//! - Pluggable rank transports (in-process threads, MPI) for gathering pieces
//!
//! ## Determinism
//!
//! Pieces, ghost tags and merge order are pure functions of the inputs and
//! the request, so repeated runs produce identical outputs.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-pipeline = "0.3"
//! # Optional features:
//! # features = ["rayon", "mpi-support"]
//! ```
//!
//! ```
//! use mesh_pipeline::prelude::*;
//!
//! let mut p = Pipeline::new();
//! let src = p.add(GridSource::new(Extent::new(0, 9, 0, 9, 0, 0)));
//! let voi = p.add(ExtractVoi::new(VoiOptions {
//!     voi: Extent::new(0, 4, 0, 4, 0, 0),
//!     ..VoiOptions::default()
//! }));
//! p.connect(src, 0, voi, 0)?;
//! let out = p.update(voi)?;
//! assert_eq!(out.num_points(), 25);
//! # Ok::<(), MeshFlowError>(())
//! ```
//!
//! ## Shared outputs
//! Outputs travel downstream as `Arc`s. A consumer that needs to modify its
//! input calls [`DataObject::dataset_mut`](crate::data::object::DataObject::dataset_mut),
//! which copies only when the allocation is shared.

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod nodes;
pub mod pipeline;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mesh_error::{ErrorClass, MeshFlowError};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::append::{MergeOptions, append_datasets};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiTransport;
    pub use crate::algs::communicator::{LocalTransport, NoComm, Transport};
    pub use crate::algs::composite_append::append_composites;
    pub use crate::algs::extent::{extract_voi, split_extent};
    pub use crate::algs::field_ledger::FieldLedger;
    pub use crate::algs::ghost::{GhostClassifier, GhostTags, PieceSelector, PieceSpec};
    pub use crate::algs::piece::{ExtractOptions, extract_all_pieces, extract_piece};
    pub use crate::algs::point_matcher::PointMatcher;
    pub use crate::data::array::{DataArray, ElementType};
    pub use crate::data::attributes::{AttributeRole, AttributeSet, GHOST_ARRAY_NAME};
    pub use crate::data::bounds::{Bounds, Extent};
    pub use crate::data::cell_array::CellArray;
    pub use crate::data::composite::{CompositeDataset, CompositeNode};
    pub use crate::data::dataset::{Dataset, DatasetKind, GridGeometry, PolyCells};
    pub use crate::data::object::{DataKind, DataObject};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::{ErrorClass, MeshFlowError};
    pub use crate::nodes::{
        AppendComposite, AppendDatasets, DataProducer, ExtractPiece, ExtractVoi, GatherPieces,
        GridSource,
    };
    pub use crate::pipeline::{
        AbortHandle, Algorithm, AppendOptions, ExecutionContext, Information, NodeId,
        PieceOptions, Pipeline, PortSpec, UpdateRequest, VoiOptions,
    };
    pub use crate::topology::cell_type::{CellType, PolyClass};
}
