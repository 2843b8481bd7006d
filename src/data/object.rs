//! Data objects flowing along pipeline edges.
//!
//! Outputs are handed downstream as shared, read-only `Arc`s; a consumer that
//! must mutate calls [`DataObject::dataset_mut`], which copies on write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::bounds::Bounds;
use crate::data::composite::CompositeDataset;
use crate::data::dataset::{Dataset, DatasetKind};

/// Kind tag of any data object.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    PointCloud,
    PolygonalSurface,
    VolumeGrid,
    UnstructuredMesh,
    Table,
    Composite,
}

impl DataKind {
    pub fn dataset_kind(self) -> Option<DatasetKind> {
        match self {
            DataKind::PointCloud => Some(DatasetKind::PointCloud),
            DataKind::PolygonalSurface => Some(DatasetKind::PolygonalSurface),
            DataKind::VolumeGrid => Some(DatasetKind::VolumeGrid),
            DataKind::UnstructuredMesh => Some(DatasetKind::UnstructuredMesh),
            DataKind::Table => Some(DatasetKind::Table),
            DataKind::Composite => None,
        }
    }

    pub fn is_composite(self) -> bool {
        self == DataKind::Composite
    }

    pub fn has_cell_topology(self) -> bool {
        self.dataset_kind().is_some_and(DatasetKind::has_cell_topology)
    }

    pub fn has_regular_grid(self) -> bool {
        self.dataset_kind().is_some_and(DatasetKind::has_regular_grid)
    }
}

impl From<DatasetKind> for DataKind {
    fn from(k: DatasetKind) -> Self {
        match k {
            DatasetKind::PointCloud => DataKind::PointCloud,
            DatasetKind::PolygonalSurface => DataKind::PolygonalSurface,
            DatasetKind::VolumeGrid => DataKind::VolumeGrid,
            DatasetKind::UnstructuredMesh => DataKind::UnstructuredMesh,
            DatasetKind::Table => DataKind::Table,
        }
    }
}

/// A leaf dataset or a composite tree, shared by reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DataObject {
    Dataset(Arc<Dataset>),
    Composite(Arc<CompositeDataset>),
}

impl DataObject {
    /// Empty object of `kind`.
    pub fn empty(kind: DataKind) -> Self {
        match kind.dataset_kind() {
            Some(k) => DataObject::Dataset(Arc::new(Dataset::empty(k))),
            None => DataObject::Composite(Arc::new(CompositeDataset::new())),
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            DataObject::Dataset(d) => d.kind().into(),
            DataObject::Composite(_) => DataKind::Composite,
        }
    }

    pub fn as_dataset(&self) -> Option<&Arc<Dataset>> {
        match self {
            DataObject::Dataset(d) => Some(d),
            DataObject::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Arc<CompositeDataset>> {
        match self {
            DataObject::Composite(c) => Some(c),
            DataObject::Dataset(_) => None,
        }
    }

    /// Private mutable dataset, cloning if the `Arc` is shared.
    pub fn dataset_mut(&mut self) -> Option<&mut Dataset> {
        match self {
            DataObject::Dataset(d) => Some(Arc::make_mut(d)),
            DataObject::Composite(_) => None,
        }
    }

    pub fn composite_mut(&mut self) -> Option<&mut CompositeDataset> {
        match self {
            DataObject::Composite(c) => Some(Arc::make_mut(c)),
            DataObject::Dataset(_) => None,
        }
    }

    /// True when both handles share the same allocation.
    pub fn ptr_eq(&self, other: &DataObject) -> bool {
        match (self, other) {
            (DataObject::Dataset(a), DataObject::Dataset(b)) => Arc::ptr_eq(a, b),
            (DataObject::Composite(a), DataObject::Composite(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn num_points(&self) -> usize {
        match self {
            DataObject::Dataset(d) => d.num_points(),
            DataObject::Composite(c) => c.num_points(),
        }
    }

    pub fn num_cells(&self) -> usize {
        match self {
            DataObject::Dataset(d) => d.num_cells(),
            DataObject::Composite(c) => c.num_cells(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            DataObject::Dataset(d) => d.bounds(),
            DataObject::Composite(c) => c.bounds(),
        }
    }
}

impl From<Dataset> for DataObject {
    fn from(d: Dataset) -> Self {
        DataObject::Dataset(Arc::new(d))
    }
}

impl From<CompositeDataset> for DataObject {
    fn from(c: CompositeDataset) -> Self {
        DataObject::Composite(Arc::new(c))
    }
}
