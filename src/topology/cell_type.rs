//! Cell type metadata for dataset cells.

use serde::{Deserialize, Serialize};

/// Common cell types for unstructured meshes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    /// 0D vertex.
    #[default]
    Vertex,
    /// Several unconnected vertices in one cell.
    PolyVertex,
    /// 1D segment/edge.
    Segment,
    /// Connected chain of segments.
    PolyLine,
    /// 2D simplex (triangle).
    Triangle,
    /// Strip of triangles sharing edges.
    TriangleStrip,
    /// 2D tensor-product cell (quad).
    Quadrilateral,
    /// 2D polygon with any number of vertices.
    Polygon,
    /// 3D simplex (tet).
    Tetrahedron,
    /// 3D tensor-product cell (hex).
    Hexahedron,
    /// 3D wedge/prism.
    Prism,
    /// 3D pyramid.
    Pyramid,
    /// Generic polyhedron.
    Polyhedron,
}

/// Topology classes of a polygonal surface, in global cell order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PolyClass {
    Verts,
    Lines,
    Polys,
    Strips,
}

impl PolyClass {
    pub const ALL: [PolyClass; 4] = [
        PolyClass::Verts,
        PolyClass::Lines,
        PolyClass::Polys,
        PolyClass::Strips,
    ];

    /// Position of the class in [`PolyClass::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl CellType {
    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Vertex | CellType::PolyVertex => 0,
            CellType::Segment | CellType::PolyLine => 1,
            CellType::Triangle
            | CellType::TriangleStrip
            | CellType::Quadrilateral
            | CellType::Polygon => 2,
            CellType::Tetrahedron
            | CellType::Hexahedron
            | CellType::Prism
            | CellType::Pyramid
            | CellType::Polyhedron => 3,
        }
    }

    /// The polygonal-surface class this cell type can be stored in, if any.
    pub fn poly_class(self) -> Option<PolyClass> {
        match self {
            CellType::Vertex | CellType::PolyVertex => Some(PolyClass::Verts),
            CellType::Segment | CellType::PolyLine => Some(PolyClass::Lines),
            CellType::Triangle | CellType::Quadrilateral | CellType::Polygon => {
                Some(PolyClass::Polys)
            }
            CellType::TriangleStrip => Some(PolyClass::Strips),
            _ => None,
        }
    }

    /// Concrete cell type of an `n`-point cell stored in polygonal class `class`.
    pub fn from_poly_class(class: PolyClass, n: usize) -> CellType {
        match (class, n) {
            (PolyClass::Verts, 1) => CellType::Vertex,
            (PolyClass::Verts, _) => CellType::PolyVertex,
            (PolyClass::Lines, 2) => CellType::Segment,
            (PolyClass::Lines, _) => CellType::PolyLine,
            (PolyClass::Polys, 3) => CellType::Triangle,
            (PolyClass::Polys, 4) => CellType::Quadrilateral,
            (PolyClass::Polys, _) => CellType::Polygon,
            (PolyClass::Strips, _) => CellType::TriangleStrip,
        }
    }
}
