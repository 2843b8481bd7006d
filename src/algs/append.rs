//! Geometry merge: concatenate N datasets into one of a target kind.
//!
//! Points are concatenated in source order, or deduplicated through a
//! [`PointMatcher`] when point merging is on. Cell topology is translated
//! through the per-source point map. Point and cell attributes that every
//! contributing source shares (per the [`FieldLedger`]) are carried over;
//! everything else is dropped.

use serde::{Deserialize, Serialize};

use crate::algs::field_ledger::FieldLedger;
use crate::algs::point_matcher::{PointMatcher, resolve_tolerance};
use crate::data::attributes::AttributeSet;
use crate::data::bounds::Bounds;
use crate::data::cell_array::CellArray;
use crate::data::dataset::{Dataset, DatasetKind, Geometry, PolyCells};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;
use crate::pipeline::context::WarningLog;
use crate::topology::cell_type::{CellType, PolyClass};

/// Point-merging settings for [`append_datasets`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Collapse coincident points.
    pub merge_points: bool,
    /// Merge distance; relative to the input bounds diagonal unless
    /// `tolerance_is_absolute`.
    pub tolerance: f64,
    pub tolerance_is_absolute: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            merge_points: false,
            tolerance: 0.0,
            tolerance_is_absolute: false,
        }
    }
}

/// Whether a `source` dataset can be merged into a `target` kind.
pub fn accepts(target: DatasetKind, source: DatasetKind) -> bool {
    use DatasetKind::*;
    match target {
        PointCloud => matches!(source, PointCloud | PolygonalSurface | UnstructuredMesh),
        PolygonalSurface => matches!(source, PointCloud | PolygonalSurface),
        UnstructuredMesh => matches!(source, PointCloud | PolygonalSurface | UnstructuredMesh),
        VolumeGrid | Table => false,
    }
}

/// Where each source point landed in the output.
enum PointMap {
    Offset(usize),
    Table(Vec<usize>),
}

impl PointMap {
    fn get(&self, p: usize) -> usize {
        match self {
            PointMap::Offset(o) => o + p,
            PointMap::Table(t) => t[p],
        }
    }
}

struct MergedPoints {
    points: Vec<[f64; 3]>,
    maps: Vec<PointMap>,
    data: AttributeSet,
}

/// Merge `inputs` into a single dataset of kind `target`.
///
/// Inputs that cannot be expressed as `target` are excluded with a warning.
/// Inputs without points or cells contribute nothing. When no input
/// contributes, the result is an empty dataset of `target`.
pub fn append_datasets(
    inputs: &[&Dataset],
    target: DatasetKind,
    opts: &MergeOptions,
    warnings: &mut WarningLog,
) -> Result<Dataset, MeshFlowError> {
    if !target.is_mergeable() {
        return Err(MeshFlowError::UnsupportedKind {
            kind: target.into(),
            operation: "append",
        });
    }

    let mut sources: Vec<&Dataset> = Vec::with_capacity(inputs.len());
    for (i, ds) in inputs.iter().enumerate() {
        if !accepts(target, ds.kind()) {
            warnings.warn(format!(
                "append: input {i} ({:?}) cannot be merged into {target:?}; excluded",
                ds.kind()
            ));
            continue;
        }
        ds.validate_invariants()?;
        if !ds.is_empty() {
            sources.push(ds);
        }
    }
    if sources.is_empty() {
        return Ok(Dataset::empty(target));
    }

    let mut dedup = opts.merge_points;
    if dedup && sources.iter().any(|d| d.has_ghost_arrays()) {
        warnings.warn("append: inputs carry ghost_level arrays; point merging disabled");
        dedup = false;
    }

    let merged = if dedup {
        merge_points_dedup(&sources, opts)?
    } else {
        concat_points(&sources)?
    };

    let cell_ledger = FieldLedger::build(sources.iter().map(|d| (d.cell_data(), d.num_cells())));
    let mut out = match target {
        DatasetKind::PointCloud => Dataset::point_cloud(merged.points),
        DatasetKind::PolygonalSurface => {
            let (cells, cell_data) = merge_poly_cells(&sources, &merged.maps, &cell_ledger)?;
            let mut ds = Dataset::polygonal(merged.points, cells)?;
            ds.set_cell_data(cell_data)?;
            ds
        }
        DatasetKind::UnstructuredMesh => {
            let (cells, types, cell_data) =
                merge_unstructured_cells(&sources, &merged.maps, &cell_ledger)?;
            let mut ds = Dataset::unstructured(merged.points, cells, types)?;
            ds.set_cell_data(cell_data)?;
            ds
        }
        DatasetKind::VolumeGrid | DatasetKind::Table => {
            return Err(MeshFlowError::UnsupportedKind {
                kind: target.into(),
                operation: "append",
            });
        }
    };
    out.set_point_data(merged.data)?;
    out.debug_assert_invariants();

    log::debug!(
        "append: {} sources -> {:?} with {} points, {} cells (dedup: {dedup})",
        sources.len(),
        target,
        out.num_points(),
        out.num_cells()
    );
    Ok(out)
}

fn concat_points(sources: &[&Dataset]) -> Result<MergedPoints, MeshFlowError> {
    let ledger = FieldLedger::build(sources.iter().map(|d| (d.point_data(), d.num_points())));
    let total: usize = sources.iter().map(|d| d.num_points()).sum();
    let mut points = Vec::with_capacity(total);
    let mut maps = Vec::with_capacity(sources.len());
    let mut data = ledger.allocate(total);
    for (s, ds) in sources.iter().enumerate() {
        let offset = points.len();
        ledger.copy_range(&mut data, s, ds.point_data(), 0, offset, ds.num_points())?;
        points.extend_from_slice(ds.points());
        maps.push(PointMap::Offset(offset));
    }
    Ok(MergedPoints { points, maps, data })
}

fn merge_points_dedup(
    sources: &[&Dataset],
    opts: &MergeOptions,
) -> Result<MergedPoints, MeshFlowError> {
    let ledger = FieldLedger::build(sources.iter().map(|d| (d.point_data(), d.num_points())));
    let bounds = sources
        .iter()
        .fold(Bounds::empty(), |b, d| b.union(&d.bounds()));
    let tol = resolve_tolerance(opts.tolerance, opts.tolerance_is_absolute, &bounds);
    let total: usize = sources.iter().map(|d| d.num_points()).sum();
    let mut matcher = PointMatcher::new(bounds, tol);
    let mut data = ledger.allocate(total);
    let mut maps = Vec::with_capacity(sources.len());

    for (s, ds) in sources.iter().enumerate() {
        // new ids are handed out densely, so this source's fresh points
        // occupy [start, start + fresh.len())
        let start = matcher.len();
        let mut fresh = Vec::new();
        let table: Vec<usize> = ds
            .points()
            .iter()
            .enumerate()
            .map(|(p, x)| {
                let (id, inserted) = matcher.insert_unique(*x);
                if inserted {
                    fresh.push(p);
                }
                id
            })
            .collect();
        ledger.copy_ids(&mut data, s, ds.point_data(), &fresh, start)?;
        maps.push(PointMap::Table(table));
    }

    data.resize(matcher.len());
    Ok(MergedPoints {
        points: matcher.into_points(),
        maps,
        data,
    })
}

fn merge_poly_cells(
    sources: &[&Dataset],
    maps: &[PointMap],
    ledger: &FieldLedger,
) -> Result<(PolyCells, AttributeSet), MeshFlowError> {
    let total: usize = sources.iter().map(|d| d.num_cells()).sum();
    let mut data = ledger.allocate(total);
    let mut cells = PolyCells::new();

    for class in PolyClass::ALL {
        let (n, conn) = sources
            .iter()
            .filter_map(|d| d.poly_cells())
            .map(|pc| pc.class(class))
            .fold((0, 0), |(n, c), a| (n + a.len(), c + a.connectivity_len()));
        *cells.class_mut(class) = CellArray::with_capacity(n, conn);
    }

    let mut dst = 0;
    for class in PolyClass::ALL {
        for (s, ds) in sources.iter().enumerate() {
            let Some(pc) = ds.poly_cells() else {
                continue;
            };
            let arr = pc.class(class);
            let map = &maps[s];
            cells.class_mut(class).extend_mapped(arr, |p| map.get(p));
            ledger.copy_range(&mut data, s, ds.cell_data(), pc.class_offset(class), dst, arr.len())?;
            dst += arr.len();
        }
    }
    Ok((cells, data))
}

fn merge_unstructured_cells(
    sources: &[&Dataset],
    maps: &[PointMap],
    ledger: &FieldLedger,
) -> Result<(CellArray, Vec<CellType>, AttributeSet), MeshFlowError> {
    let total: usize = sources.iter().map(|d| d.num_cells()).sum();
    let conn: usize = sources
        .iter()
        .map(|d| d.cells().map(<[usize]>::len).sum::<usize>())
        .sum();
    let mut cells = CellArray::with_capacity(total, conn);
    let mut types = Vec::with_capacity(total);
    let mut data = ledger.allocate(total);

    let mut dst = 0;
    for (s, ds) in sources.iter().enumerate() {
        let map = &maps[s];
        match ds.geometry() {
            Geometry::UnstructuredMesh {
                cells: c, types: t, ..
            } => {
                cells.extend_mapped(c, |p| map.get(p));
                types.extend_from_slice(t);
            }
            Geometry::PolygonalSurface { cells: pc, .. } => {
                for (class, ids) in pc.iter() {
                    cells.push_mapped(ids, |p| map.get(p));
                    types.push(CellType::from_poly_class(class, ids.len()));
                }
            }
            _ => {}
        }
        let n = ds.num_cells();
        ledger.copy_range(&mut data, s, ds.cell_data(), 0, dst, n)?;
        dst += n;
    }
    Ok((cells, types, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::array::{DataArray, ElementType};
    use crate::data::attributes::GHOST_ARRAY_NAME;

    fn quad(points: [[f64; 3]; 4]) -> Dataset {
        let mut cells = PolyCells::new();
        cells.class_mut(PolyClass::Polys).push(&[0, 1, 2, 3]);
        Dataset::polygonal(points.to_vec(), cells).unwrap()
    }

    fn merge(inputs: &[&Dataset], target: DatasetKind, opts: MergeOptions) -> Dataset {
        append_datasets(inputs, target, &opts, &mut WarningLog::new()).unwrap()
    }

    #[test]
    fn single_input_is_copied() {
        let mut a = quad([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        a.point_data_mut()
            .insert(DataArray::from_f64("t", 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap());
        let out = merge(&[&a], DatasetKind::PolygonalSurface, MergeOptions::default());
        assert_eq!(out, a);
    }

    #[test]
    fn shared_edge_is_welded() {
        let a = quad([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        let b = quad([
            [1.0 + 5e-7, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [1.0, 1.0 + 5e-7, 0.0],
        ]);
        let opts = MergeOptions {
            merge_points: true,
            tolerance: 1e-5,
            tolerance_is_absolute: true,
        };
        let out = merge(&[&a, &b], DatasetKind::PolygonalSurface, opts);
        assert_eq!(out.num_points(), 6);
        assert_eq!(out.num_cells(), 2);
        assert_eq!(out.cell_points(1), Some(&[1usize, 4, 5, 2][..]));

        let plain = merge(&[&a, &b], DatasetKind::PolygonalSurface, MergeOptions::default());
        assert_eq!(plain.num_points(), 8);
    }

    #[test]
    fn array_missing_from_one_input_is_dropped() {
        let mut a = quad([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        a.point_data_mut()
            .insert(DataArray::from_f64("temperature", 1, vec![0.0; 4]).unwrap());
        let b = quad([[2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 1.0, 0.0], [2.0, 1.0, 0.0]]);
        let out = merge(&[&a, &b], DatasetKind::PolygonalSurface, MergeOptions::default());
        assert!(out.point_data().is_empty());
    }

    #[test]
    fn classes_are_concatenated_separately() {
        let with_vert = |tag: i32| {
            let mut cells = PolyCells::new();
            cells.class_mut(PolyClass::Verts).push(&[0]);
            cells.class_mut(PolyClass::Polys).push(&[0, 1, 2, 3]);
            let pts = vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
            let mut ds = Dataset::polygonal(pts, cells).unwrap();
            ds.cell_data_mut()
                .insert(DataArray::from_i32("src", 1, vec![tag, tag + 1]).unwrap());
            ds
        };
        let (a, b) = (with_vert(10), with_vert(20));
        let out = merge(&[&a, &b], DatasetKind::PolygonalSurface, MergeOptions::default());
        // verts of a, verts of b, then polys of a, polys of b
        assert_eq!(out.cell_data().get("src").unwrap().as_i32().unwrap(), &[10, 20, 11, 21]);
        assert_eq!(out.cell_points(1), Some(&[4usize][..]));
        assert_eq!(out.cell_points(3), Some(&[4usize, 5, 6, 7][..]));
    }

    #[test]
    fn polygonal_inputs_convert_to_unstructured() {
        let a = quad([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        let pts = vec![[5.0, 0.0, 0.0], [6.0, 0.0, 0.0]];
        let b = Dataset::unstructured(pts, CellArray::from_cells([[0, 1]]), vec![CellType::Segment])
            .unwrap();
        let out = merge(&[&a, &b], DatasetKind::UnstructuredMesh, MergeOptions::default());
        assert_eq!(out.cell_type(0), Some(CellType::Quadrilateral));
        assert_eq!(out.cell_type(1), Some(CellType::Segment));
        assert_eq!(out.cell_points(1), Some(&[4usize, 5][..]));
    }

    #[test]
    fn incompatible_inputs_are_excluded() {
        let a = quad([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        let b = Dataset::unstructured(
            vec![[0.0; 3]; 2],
            CellArray::from_cells([[0, 1]]),
            vec![CellType::Segment],
        )
        .unwrap();
        let mut log = WarningLog::new();
        let out = append_datasets(
            &[&a, &b],
            DatasetKind::PolygonalSurface,
            &MergeOptions::default(),
            &mut log,
        )
        .unwrap();
        assert_eq!(out.num_cells(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn empty_inputs_give_empty_output() {
        let e = Dataset::empty(DatasetKind::PolygonalSurface);
        let out = merge(&[&e, &e], DatasetKind::PolygonalSurface, MergeOptions::default());
        assert!(out.is_empty());
        assert_eq!(out.kind(), DatasetKind::PolygonalSurface);
        let none = merge(&[], DatasetKind::UnstructuredMesh, MergeOptions::default());
        assert!(none.is_empty());
    }

    #[test]
    fn ghost_arrays_disable_point_merging() {
        let mut a = quad([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        a.point_data_mut()
            .insert(DataArray::zeros(GHOST_ARRAY_NAME, ElementType::U8, 1, 4));
        let opts = MergeOptions {
            merge_points: true,
            tolerance: 0.0,
            tolerance_is_absolute: true,
        };
        let mut log = WarningLog::new();
        let out =
            append_datasets(&[&a, &a], DatasetKind::PolygonalSurface, &opts, &mut log).unwrap();
        assert_eq!(out.num_points(), 8);
        assert_eq!(log.len(), 1);
        assert!(out.point_data().ghost_array().is_some());
    }

    #[test]
    fn first_write_wins_for_merged_points() {
        let mut a = Dataset::point_cloud(vec![[0.0; 3], [1.0, 0.0, 0.0]]);
        a.point_data_mut()
            .insert(DataArray::from_f64("v", 1, vec![1.0, 2.0]).unwrap());
        let mut b = Dataset::point_cloud(vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        b.point_data_mut()
            .insert(DataArray::from_f64("v", 1, vec![9.0, 3.0]).unwrap());
        let opts = MergeOptions {
            merge_points: true,
            ..MergeOptions::default()
        };
        let out = merge(&[&a, &b], DatasetKind::PointCloud, opts);
        assert_eq!(out.point_data().get("v").unwrap().as_f64().unwrap(), &[1.0, 2.0, 3.0]);
    }
}
