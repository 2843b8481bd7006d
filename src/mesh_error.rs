//! MeshFlowError: Unified error type for mesh-pipeline public APIs
//!
//! Every fallible operation in the crate returns this error. Variants are
//! grouped into an [`ErrorClass`] so the executive can decide whether a
//! failure is recovered locally, degrades one output, or aborts one branch.

use thiserror::Error;

use crate::data::object::DataKind;

/// Coarse classification used by the executive to route failures.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorClass {
    /// Output-kind or port negotiation failed; the branch is aborted.
    Negotiation,
    /// Missing rows or arrays; recovered by producing an empty output.
    Data,
    /// Broken invariants (indices out of range, mismatched lengths).
    Consistency,
    /// The transport collaborator failed.
    Transport,
}

/// Unified error type for mesh-pipeline operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshFlowError {
    // ----- negotiation -------------------------------------------------
    /// A node produced (or was asked for) an output kind it cannot provide.
    #[error("node `{node}` port {port}: incompatible output kind (expected {expected:?}, found {found:?})")]
    IncompatibleOutputKind {
        node: String,
        port: usize,
        expected: DataKind,
        found: Option<DataKind>,
    },
    /// A required input port has no connection.
    #[error("node `{node}`: required input port {port} is not connected")]
    MissingInputConnection { node: String, port: usize },
    /// Port index outside the node's declared ports.
    #[error("node `{node}`: no such {direction} port {port}")]
    NoSuchPort {
        node: String,
        direction: &'static str,
        port: usize,
    },
    /// Node id does not belong to this pipeline.
    #[error("unknown node id {0}")]
    UnknownNode(usize),
    /// `configure` was called with the wrong concrete node type.
    #[error("node `{0}` is not of the requested concrete type")]
    NodeTypeMismatch(String),
    /// The connection would close a cycle.
    #[error("connecting node {from} to node {to} would create a cycle")]
    CycleDetected { from: usize, to: usize },
    /// The input's data kind is not accepted by the port.
    #[error("node `{node}` port {port} does not accept {kind:?} input")]
    UnacceptedInputKind {
        node: String,
        port: usize,
        kind: DataKind,
    },
    /// An upstream branch failed, so the input is unavailable.
    #[error("upstream branch of node `{0}` failed")]
    UpstreamFailed(String),

    // ----- data --------------------------------------------------------
    /// An operation had nothing to work on.
    #[error("no input elements to process")]
    EmptyInput,
    /// A named array required by the operation is absent.
    #[error("required array `{0}` is absent")]
    MissingArray(String),
    /// Input kind does not fit the requested operation.
    #[error("{kind:?} data is not supported by {operation}")]
    UnsupportedKind {
        kind: DataKind,
        operation: &'static str,
    },
    /// Piece request is malformed (piece index out of range or zero pieces).
    #[error("invalid piece request: piece {piece} of {count}")]
    InvalidPiece { piece: usize, count: usize },

    // ----- consistency -------------------------------------------------
    /// A cell references a point outside the point buffer.
    #[error("cell {cell} references point {point}, but only {num_points} points exist")]
    CellIndexOutOfRange {
        cell: usize,
        point: usize,
        num_points: usize,
    },
    /// Array length does not match the owning element count.
    #[error("array `{name}` has {actual} tuples, expected {expected}")]
    AttributeLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// Flat value buffer is not a multiple of the component count.
    #[error("array `{name}` holds {values} values, not a multiple of {components} components")]
    RaggedArray {
        name: String,
        values: usize,
        components: usize,
    },
    /// Two arrays with the same name in one attribute set.
    #[error("duplicate array name `{0}`")]
    DuplicateArray(String),
    /// Copy between arrays of different element types or widths.
    #[error("array `{name}`: cannot copy {src} into {dst}")]
    ArrayTypeMismatch {
        name: String,
        src: String,
        dst: String,
    },
    /// Tuple index outside an array.
    #[error("array `{name}`: tuple {index} out of range (len {len})")]
    TupleOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },
    /// Cell offsets are not monotone or do not cover the connectivity buffer.
    #[error("malformed cell array: {0}")]
    MalformedCells(String),
    /// Composite inputs differ in shape or leaf presence.
    #[error("composite inputs are not structurally compatible")]
    StructureMismatch,
    /// Extent with max < min on some axis where a non-empty one is needed.
    #[error("invalid extent {0:?}")]
    InvalidExtent([i32; 6]),

    // ----- transport ---------------------------------------------------
    /// Rank outside the transport group.
    #[error("rank {rank} outside transport group of size {size}")]
    InvalidRank { rank: usize, size: usize },
    /// Peer hung up or the payload could not be decoded.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl MeshFlowError {
    /// Which recovery policy the executive applies to this error.
    pub fn class(&self) -> ErrorClass {
        use MeshFlowError::*;
        match self {
            IncompatibleOutputKind { .. }
            | MissingInputConnection { .. }
            | NoSuchPort { .. }
            | UnknownNode(_)
            | NodeTypeMismatch(_)
            | CycleDetected { .. }
            | UnacceptedInputKind { .. }
            | UpstreamFailed(_) => ErrorClass::Negotiation,
            EmptyInput | MissingArray(_) | UnsupportedKind { .. } | InvalidPiece { .. } => {
                ErrorClass::Data
            }
            CellIndexOutOfRange { .. }
            | AttributeLengthMismatch { .. }
            | RaggedArray { .. }
            | DuplicateArray(_)
            | ArrayTypeMismatch { .. }
            | TupleOutOfRange { .. }
            | MalformedCells(_)
            | StructureMismatch
            | InvalidExtent(_) => ErrorClass::Consistency,
            InvalidRank { .. } | Transport(_) => ErrorClass::Transport,
        }
    }
}
