//! Datasets: geometry plus point- and cell-associated attribute sets.
//!
//! The concrete dataset kinds form a closed set ([`DatasetKind`]); code that
//! needs kind-specific behaviour matches on [`Geometry`] rather than on a
//! runtime type. Capability queries ([`Dataset::has_cell_topology`],
//! [`Dataset::has_regular_grid`]) cover the common dispatch questions.

use serde::{Deserialize, Serialize};

use crate::data::attributes::AttributeSet;
use crate::data::bounds::{Bounds, Extent};
use crate::data::cell_array::CellArray;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;
use crate::topology::cell_type::{CellType, PolyClass};

/// Concrete leaf dataset kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    PointCloud,
    PolygonalSurface,
    VolumeGrid,
    UnstructuredMesh,
    Table,
}

impl DatasetKind {
    /// Kinds whose cells are stored as explicit point-index runs.
    pub fn has_cell_topology(self) -> bool {
        matches!(
            self,
            DatasetKind::PolygonalSurface | DatasetKind::UnstructuredMesh
        )
    }

    /// Kinds whose points and cells are implied by a structured extent.
    pub fn has_regular_grid(self) -> bool {
        matches!(self, DatasetKind::VolumeGrid)
    }

    /// Kinds that the merge engine concatenates (as opposed to passing through).
    pub fn is_mergeable(self) -> bool {
        matches!(
            self,
            DatasetKind::PointCloud | DatasetKind::PolygonalSurface | DatasetKind::UnstructuredMesh
        )
    }
}

/// The four cell classes of a polygonal surface.
///
/// Global cell ids run through verts, then lines, then polys, then strips.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyCells {
    classes: [CellArray; 4],
}

impl PolyCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_classes(verts: CellArray, lines: CellArray, polys: CellArray, strips: CellArray) -> Self {
        Self {
            classes: [verts, lines, polys, strips],
        }
    }

    pub fn class(&self, class: PolyClass) -> &CellArray {
        &self.classes[class.index()]
    }

    pub fn class_mut(&mut self, class: PolyClass) -> &mut CellArray {
        &mut self.classes[class.index()]
    }

    pub fn num_cells(&self) -> usize {
        self.classes.iter().map(CellArray::len).sum()
    }

    /// Global id of the first cell of `class`.
    pub fn class_offset(&self, class: PolyClass) -> usize {
        self.classes[..class.index()].iter().map(CellArray::len).sum()
    }

    /// Class and point ids of global cell `i`.
    pub fn cell(&self, mut i: usize) -> Option<(PolyClass, &[usize])> {
        for class in PolyClass::ALL {
            let arr = self.class(class);
            if i < arr.len() {
                return arr.cell(i).map(|c| (class, c));
            }
            i -= arr.len();
        }
        None
    }

    /// All cells in global order.
    pub fn iter(&self) -> impl Iterator<Item = (PolyClass, &[usize])> + '_ {
        PolyClass::ALL
            .into_iter()
            .flat_map(move |class| self.class(class).iter().map(move |c| (class, c)))
    }
}

/// Implicit geometry of a structured grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub extent: Extent,
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
}

impl GridGeometry {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            origin: [0.0; 3],
            spacing: [1.0; 3],
        }
    }

    /// Physical position of structured coordinate `ijk`.
    pub fn position(&self, ijk: [i32; 3]) -> [f64; 3] {
        [0, 1, 2].map(|a| self.origin[a] + self.spacing[a] * ijk[a] as f64)
    }

    /// Position of flat point `i` (x fastest).
    pub fn point(&self, i: usize) -> Option<[f64; 3]> {
        if i >= self.extent.num_points() {
            return None;
        }
        let d = self.extent.dimensions();
        let ijk = [i % d[0], (i / d[0]) % d[1], i / (d[0] * d[1])];
        let e = self.extent.0;
        Some(self.position([
            e[0] + ijk[0] as i32,
            e[2] + ijk[1] as i32,
            e[4] + ijk[2] as i32,
        ]))
    }

    pub fn bounds(&self) -> Bounds {
        if self.extent.is_empty() {
            return Bounds::empty();
        }
        let e = self.extent.0;
        let mut b = Bounds::empty();
        b.add_point(&self.position([e[0], e[2], e[4]]));
        b.add_point(&self.position([e[1], e[3], e[5]]));
        b
    }
}

/// Kind-specific geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    PointCloud {
        points: Vec<[f64; 3]>,
    },
    PolygonalSurface {
        points: Vec<[f64; 3]>,
        cells: PolyCells,
    },
    UnstructuredMesh {
        points: Vec<[f64; 3]>,
        cells: CellArray,
        types: Vec<CellType>,
    },
    VolumeGrid(GridGeometry),
    Table {
        rows: usize,
    },
}

/// A leaf dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    geometry: Geometry,
    point_data: AttributeSet,
    cell_data: AttributeSet,
}

impl Dataset {
    fn with_geometry(geometry: Geometry) -> Self {
        Self {
            geometry,
            point_data: AttributeSet::new(),
            cell_data: AttributeSet::new(),
        }
    }

    pub fn point_cloud(points: Vec<[f64; 3]>) -> Self {
        Self::with_geometry(Geometry::PointCloud { points })
    }

    pub fn polygonal(points: Vec<[f64; 3]>, cells: PolyCells) -> Result<Self, MeshFlowError> {
        let ds = Self::with_geometry(Geometry::PolygonalSurface { points, cells });
        ds.check_topology()?;
        Ok(ds)
    }

    pub fn unstructured(
        points: Vec<[f64; 3]>,
        cells: CellArray,
        types: Vec<CellType>,
    ) -> Result<Self, MeshFlowError> {
        let ds = Self::with_geometry(Geometry::UnstructuredMesh {
            points,
            cells,
            types,
        });
        ds.check_topology()?;
        Ok(ds)
    }

    pub fn volume_grid(grid: GridGeometry) -> Self {
        Self::with_geometry(Geometry::VolumeGrid(grid))
    }

    pub fn table(rows: usize) -> Self {
        Self::with_geometry(Geometry::Table { rows })
    }

    /// A dataset of `kind` with no elements.
    pub fn empty(kind: DatasetKind) -> Self {
        Self::with_geometry(match kind {
            DatasetKind::PointCloud => Geometry::PointCloud { points: Vec::new() },
            DatasetKind::PolygonalSurface => Geometry::PolygonalSurface {
                points: Vec::new(),
                cells: PolyCells::new(),
            },
            DatasetKind::UnstructuredMesh => Geometry::UnstructuredMesh {
                points: Vec::new(),
                cells: CellArray::new(),
                types: Vec::new(),
            },
            DatasetKind::VolumeGrid => Geometry::VolumeGrid(GridGeometry::new(Extent::EMPTY)),
            DatasetKind::Table => Geometry::Table { rows: 0 },
        })
    }

    /// Same kind and array layout as `self`, with no elements.
    pub fn empty_like(&self) -> Self {
        let mut out = Self::empty(self.kind());
        out.point_data = self.point_data.empty_like();
        out.cell_data = self.cell_data.empty_like();
        out
    }

    pub fn kind(&self) -> DatasetKind {
        match &self.geometry {
            Geometry::PointCloud { .. } => DatasetKind::PointCloud,
            Geometry::PolygonalSurface { .. } => DatasetKind::PolygonalSurface,
            Geometry::UnstructuredMesh { .. } => DatasetKind::UnstructuredMesh,
            Geometry::VolumeGrid(_) => DatasetKind::VolumeGrid,
            Geometry::Table { .. } => DatasetKind::Table,
        }
    }

    pub fn has_cell_topology(&self) -> bool {
        self.kind().has_cell_topology()
    }

    pub fn has_regular_grid(&self) -> bool {
        self.kind().has_regular_grid()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Point (or, for tables, row) count.
    pub fn num_points(&self) -> usize {
        match &self.geometry {
            Geometry::PointCloud { points }
            | Geometry::PolygonalSurface { points, .. }
            | Geometry::UnstructuredMesh { points, .. } => points.len(),
            Geometry::VolumeGrid(g) => g.extent.num_points(),
            Geometry::Table { rows } => *rows,
        }
    }

    pub fn num_cells(&self) -> usize {
        match &self.geometry {
            Geometry::PointCloud { .. } | Geometry::Table { .. } => 0,
            Geometry::PolygonalSurface { cells, .. } => cells.num_cells(),
            Geometry::UnstructuredMesh { cells, .. } => cells.len(),
            Geometry::VolumeGrid(g) => g.extent.num_cells(),
        }
    }

    /// True when the dataset holds neither points nor cells.
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0 && self.num_cells() == 0
    }

    /// Explicit point buffer; empty for grids and tables.
    pub fn points(&self) -> &[[f64; 3]] {
        match &self.geometry {
            Geometry::PointCloud { points }
            | Geometry::PolygonalSurface { points, .. }
            | Geometry::UnstructuredMesh { points, .. } => points,
            Geometry::VolumeGrid(_) | Geometry::Table { .. } => &[],
        }
    }

    /// Position of point `i`, computing it for grids.
    pub fn point(&self, i: usize) -> Option<[f64; 3]> {
        match &self.geometry {
            Geometry::VolumeGrid(g) => g.point(i),
            _ => self.points().get(i).copied(),
        }
    }

    /// Point ids of explicit cell `i`.
    pub fn cell_points(&self, i: usize) -> Option<&[usize]> {
        match &self.geometry {
            Geometry::PolygonalSurface { cells, .. } => cells.cell(i).map(|(_, c)| c),
            Geometry::UnstructuredMesh { cells, .. } => cells.cell(i),
            _ => None,
        }
    }

    /// Point ids of every explicit cell in global order (empty for implicit kinds).
    pub fn cells(&self) -> Box<dyn Iterator<Item = &[usize]> + '_> {
        match &self.geometry {
            Geometry::PolygonalSurface { cells, .. } => Box::new(cells.iter().map(|(_, c)| c)),
            Geometry::UnstructuredMesh { cells, .. } => Box::new(cells.iter()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Type of explicit cell `i`.
    pub fn cell_type(&self, i: usize) -> Option<CellType> {
        match &self.geometry {
            Geometry::PolygonalSurface { cells, .. } => cells
                .cell(i)
                .map(|(class, c)| CellType::from_poly_class(class, c.len())),
            Geometry::UnstructuredMesh { types, .. } => types.get(i).copied(),
            _ => None,
        }
    }

    pub fn poly_cells(&self) -> Option<&PolyCells> {
        match &self.geometry {
            Geometry::PolygonalSurface { cells, .. } => Some(cells),
            _ => None,
        }
    }

    pub fn grid(&self) -> Option<&GridGeometry> {
        match &self.geometry {
            Geometry::VolumeGrid(g) => Some(g),
            _ => None,
        }
    }

    pub fn point_data(&self) -> &AttributeSet {
        &self.point_data
    }

    pub fn point_data_mut(&mut self) -> &mut AttributeSet {
        &mut self.point_data
    }

    pub fn cell_data(&self) -> &AttributeSet {
        &self.cell_data
    }

    pub fn cell_data_mut(&mut self) -> &mut AttributeSet {
        &mut self.cell_data
    }

    /// Replace the point attributes, checking their length.
    pub fn set_point_data(&mut self, data: AttributeSet) -> Result<(), MeshFlowError> {
        data.check_len(self.num_points())?;
        self.point_data = data;
        Ok(())
    }

    /// Replace the cell attributes, checking their length.
    pub fn set_cell_data(&mut self, data: AttributeSet) -> Result<(), MeshFlowError> {
        data.check_len(self.num_cells())?;
        self.cell_data = data;
        Ok(())
    }

    /// True when either attribute set carries a ghost marker array.
    pub fn has_ghost_arrays(&self) -> bool {
        self.point_data.ghost_array().is_some() || self.cell_data.ghost_array().is_some()
    }

    pub fn bounds(&self) -> Bounds {
        match &self.geometry {
            Geometry::VolumeGrid(g) => g.bounds(),
            _ => Bounds::from_points(self.points()),
        }
    }

    fn check_topology(&self) -> Result<(), MeshFlowError> {
        let n = self.num_points();
        match &self.geometry {
            Geometry::PolygonalSurface { cells, .. } => {
                for class in PolyClass::ALL {
                    cells.class(class).validate(n, cells.class_offset(class))?;
                }
            }
            Geometry::UnstructuredMesh { cells, types, .. } => {
                cells.validate(n, 0)?;
                if types.len() != cells.len() {
                    return Err(MeshFlowError::MalformedCells(format!(
                        "{} cell types for {} cells",
                        types.len(),
                        cells.len()
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl DebugInvariants for Dataset {
    fn validate_invariants(&self) -> Result<(), MeshFlowError> {
        self.check_topology()?;
        self.point_data.validate_invariants()?;
        self.cell_data.validate_invariants()?;
        self.point_data.check_len(self.num_points())?;
        self.cell_data.check_len(self.num_cells())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::array::DataArray;

    fn quad_surface() -> Dataset {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let mut cells = PolyCells::new();
        cells.class_mut(PolyClass::Verts).push(&[0]);
        cells.class_mut(PolyClass::Polys).push(&[0, 1, 2, 3]);
        Dataset::polygonal(points, cells).unwrap()
    }

    #[test]
    fn polygonal_global_cell_order() {
        let ds = quad_surface();
        assert_eq!(ds.num_cells(), 2);
        assert_eq!(ds.cell_type(0), Some(CellType::Vertex));
        assert_eq!(ds.cell_type(1), Some(CellType::Quadrilateral));
        assert_eq!(ds.cell_points(1), Some(&[0usize, 1, 2, 3][..]));
    }

    #[test]
    fn out_of_range_topology_is_rejected() {
        let cells = CellArray::from_cells([[0, 1, 4]]);
        let err = Dataset::unstructured(vec![[0.0; 3]; 3], cells, vec![CellType::Triangle])
            .unwrap_err();
        assert!(matches!(err, MeshFlowError::CellIndexOutOfRange { point: 4, .. }));
    }

    #[test]
    fn attribute_lengths_track_counts() {
        let mut ds = quad_surface();
        let bad = {
            let mut set = AttributeSet::new();
            set.insert(DataArray::from_f64("t", 1, vec![1.0; 3]).unwrap());
            set
        };
        assert!(ds.set_point_data(bad).is_err());
        ds.point_data_mut()
            .insert(DataArray::from_f64("t", 1, vec![1.0; 4]).unwrap());
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn grid_points_are_implicit() {
        let mut g = GridGeometry::new(Extent::new(0, 2, 0, 1, 0, 0));
        g.spacing = [0.5, 2.0, 1.0];
        let ds = Dataset::volume_grid(g);
        assert_eq!(ds.num_points(), 6);
        assert_eq!(ds.num_cells(), 2);
        assert_eq!(ds.point(4), Some([0.5, 2.0, 0.0]));
        assert!(ds.has_regular_grid());
        assert!(!ds.has_cell_topology());
    }

    #[test]
    fn empty_like_keeps_array_layout() {
        let mut ds = quad_surface();
        ds.point_data_mut()
            .insert(DataArray::from_f64("t", 1, vec![1.0; 4]).unwrap());
        let e = ds.empty_like();
        assert!(e.is_empty());
        assert_eq!(e.point_data().get("t").unwrap().num_tuples(), 0);
        assert!(e.validate_invariants().is_ok());
    }
}
