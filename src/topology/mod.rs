//! Cell topology: cell types, point → cell incidence, and derived-topology
//! caches.

pub mod cache;
pub mod cell_type;
pub mod links;

pub use cache::{InvalidateCache, LinksCache};
pub use cell_type::{CellType, PolyClass};
pub use links::CellLinks;
