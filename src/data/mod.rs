//! Data module: attribute arrays, datasets, and composite trees.

pub mod array;
pub mod attributes;
pub mod bounds;
pub mod cell_array;
pub mod composite;
pub mod dataset;
pub mod object;

pub use array::{DataArray, ElementType};
pub use attributes::{AttributeRole, AttributeSet};
pub use composite::CompositeDataset;
pub use dataset::{Dataset, DatasetKind};
pub use object::{DataKind, DataObject};
