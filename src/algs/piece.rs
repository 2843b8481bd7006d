//! Piece extraction.
//!
//! Keeps every cell tagged ≥ 0 by the [`GhostClassifier`], renumbers the
//! points they use densely (first-use order, then orphan points), and carries
//! point and cell attributes across. When ghost layers were requested the
//! output gains `ghost_level` arrays on points and cells; [`strip_ghosts`]
//! removes them again.

use hashbrown::HashMap;

use crate::algs::ghost::{GhostClassifier, GhostTags, PieceSelector, PieceSpec};
use crate::data::array::DataArray;
use crate::data::attributes::GHOST_ARRAY_NAME;
use crate::data::cell_array::CellArray;
use crate::data::dataset::{Dataset, Geometry, PolyCells};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;
use crate::topology::links::CellLinks;

/// Options for [`extract_piece`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Spread points used by no cell round-robin over the pieces.
    pub distribute_orphan_points: bool,
    /// Attach `ghost_level` arrays when ghost layers were requested.
    pub ghost_arrays: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            distribute_orphan_points: true,
            ghost_arrays: true,
        }
    }
}

/// Extract one piece of `ds`.
///
/// Structured grids and tables pass through unchanged; their pieces are
/// negotiated as extents rather than cell subsets.
pub fn extract_piece(
    ds: &Dataset,
    spec: &PieceSpec,
    selector: Option<&dyn PieceSelector>,
    opts: ExtractOptions,
) -> Result<Dataset, MeshFlowError> {
    extract_piece_with_links(ds, None, spec, selector, opts)
}

/// [`extract_piece`] reusing point → cell `links` built earlier for `ds`.
pub fn extract_piece_with_links(
    ds: &Dataset,
    links: Option<&CellLinks>,
    spec: &PieceSpec,
    selector: Option<&dyn PieceSelector>,
    opts: ExtractOptions,
) -> Result<Dataset, MeshFlowError> {
    spec.validate()?;
    ds.validate_invariants()?;
    if !ds.kind().is_mergeable() {
        return Ok(ds.clone());
    }
    if spec.is_whole() && selector.is_none() {
        return Ok(ds.clone());
    }

    let classifier = match links {
        Some(links) => GhostClassifier::with_links(ds, links),
        None => GhostClassifier::new(ds),
    }
    .distribute_orphans(opts.distribute_orphan_points);
    let tags = classifier.classify(spec, selector)?;
    let (mut out, maps) = build_piece(ds, &tags)?;
    if opts.ghost_arrays && spec.ghost_levels > 0 && ds.has_cell_topology() {
        attach_ghost_arrays(&mut out, &tags, &maps)?;
    }
    log::debug!(
        "extracted piece {}/{} (+{} ghost levels): {} cells, {} points",
        spec.piece,
        spec.num_pieces,
        spec.ghost_levels,
        out.num_cells(),
        out.num_points()
    );
    Ok(out)
}

/// Remapped ids produced while building a piece.
struct PieceMaps {
    /// Old point id of each new point.
    points: Vec<usize>,
    /// Old cell id of each new cell.
    cells: Vec<usize>,
}

fn build_piece(ds: &Dataset, tags: &GhostTags) -> Result<(Dataset, PieceMaps), MeshFlowError> {
    let kept_cells = tags.kept_cells();
    let mut old_to_new: HashMap<usize, usize> = HashMap::new();
    let mut new_to_old: Vec<usize> = Vec::new();
    let mut map_point = |p: usize| {
        *old_to_new.entry(p).or_insert_with(|| {
            new_to_old.push(p);
            new_to_old.len() - 1
        })
    };

    // first pass assigns ids in first-use order
    let mut remapped: Vec<Vec<usize>> = Vec::with_capacity(kept_cells.len());
    for &c in &kept_cells {
        let ids = ds.cell_points(c).unwrap_or(&[]);
        remapped.push(ids.iter().map(|&p| map_point(p)).collect());
    }
    for p in tags.kept_points() {
        map_point(p);
    }

    let maps = PieceMaps {
        points: new_to_old,
        cells: kept_cells,
    };
    let points: Vec<[f64; 3]> = maps.points.iter().map(|&p| ds.points()[p]).collect();

    let mut out = match ds.geometry() {
        Geometry::PointCloud { .. } => Dataset::point_cloud(points),
        Geometry::UnstructuredMesh { types, .. } => {
            let cells = CellArray::from_cells(&remapped);
            let types = maps.cells.iter().map(|&c| types[c]).collect();
            Dataset::unstructured(points, cells, types)?
        }
        Geometry::PolygonalSurface { .. } => {
            let mut cells = PolyCells::new();
            for (&c, ids) in maps.cells.iter().zip(&remapped) {
                let class = ds
                    .poly_cells()
                    .and_then(|pc| pc.cell(c))
                    .map(|(class, _)| class)
                    .ok_or(MeshFlowError::MalformedCells(format!("missing cell {c}")))?;
                cells.class_mut(class).push(ids);
            }
            Dataset::polygonal(points, cells)?
        }
        Geometry::VolumeGrid(_) | Geometry::Table { .. } => {
            return Err(MeshFlowError::UnsupportedKind {
                kind: ds.kind().into(),
                operation: "cell-subset piece extraction",
            });
        }
    };

    out.set_point_data(ds.point_data().select(&maps.points)?)?;
    if ds.has_cell_topology() {
        out.set_cell_data(ds.cell_data().select(&maps.cells)?)?;
    }
    Ok((out, maps))
}

fn attach_ghost_arrays(
    out: &mut Dataset,
    tags: &GhostTags,
    maps: &PieceMaps,
) -> Result<(), MeshFlowError> {
    let to_u8 = |t: i32| t.clamp(0, u8::MAX as i32) as u8;
    let cells: Vec<u8> = maps.cells.iter().map(|&c| to_u8(tags.cells[c])).collect();
    let points: Vec<u8> = maps.points.iter().map(|&p| to_u8(tags.points[p])).collect();
    out.cell_data_mut()
        .insert(DataArray::from_u8(GHOST_ARRAY_NAME, 1, cells)?);
    out.point_data_mut()
        .insert(DataArray::from_u8(GHOST_ARRAY_NAME, 1, points)?);
    Ok(())
}

/// Drop every cell and point marked by a nonzero `ghost_level`, keeping the
/// points owned cells still use, and remove the ghost arrays.
///
/// Pieces stripped this way can be appended and welded back into their
/// source. Datasets without ghost arrays are returned unchanged.
pub fn strip_ghosts(ds: &Dataset) -> Result<Dataset, MeshFlowError> {
    if !ds.has_ghost_arrays() || !ds.kind().is_mergeable() {
        return Ok(ds.clone());
    }
    let tag = |array: Option<&DataArray>, n: usize| -> Vec<i32> {
        (0..n)
            .map(|i| match array.and_then(|a| a.component_f64(i, 0)) {
                Some(level) if level > 0.0 => -1,
                _ => 0,
            })
            .collect()
    };
    let tags = GhostTags {
        cells: tag(ds.cell_data().ghost_array(), ds.num_cells()),
        points: tag(ds.point_data().ghost_array(), ds.num_points()),
    };
    let (mut out, _) = build_piece(ds, &tags)?;
    out.point_data_mut().remove(GHOST_ARRAY_NAME);
    out.cell_data_mut().remove(GHOST_ARRAY_NAME);
    Ok(out)
}

/// Compute all `num_pieces` pieces of `ds`.
///
/// With the `rayon` feature the pieces are extracted in parallel; the result
/// is identical either way.
pub fn extract_all_pieces(
    ds: &Dataset,
    num_pieces: usize,
    ghost_levels: usize,
    opts: ExtractOptions,
) -> Result<Vec<Dataset>, MeshFlowError> {
    let one = |piece: usize| {
        extract_piece(ds, &PieceSpec::new(piece, num_pieces, ghost_levels), None, opts)
    };
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        (0..num_pieces).into_par_iter().map(one).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..num_pieces).map(one).collect()
    }
}
