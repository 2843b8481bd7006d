//! Demand-driven execution: node contract, request metadata, and the
//! executive that walks the graph.

pub mod algorithm;
pub mod context;
pub mod executive;
pub mod information;
pub mod options;
pub mod timestamp;

pub use algorithm::{Algorithm, InputData, InputInformation, InputKinds, PortSpec};
pub use context::{AbortHandle, ExecutionContext, ProgressFn, WarningLog};
pub use executive::{NodeId, Pipeline};
pub use information::{Information, UpdateRequest};
pub use options::{AppendOptions, MergeOptions, PieceOptions, VoiOptions};
pub use timestamp::{Clock, TimeStamp};
