//! Structured extents: splitting into pieces, marking ghost padding and
//! sub-sampling a volume of interest.

use crate::algs::ghost::bucket_range;
use crate::data::array::DataArray;
use crate::data::attributes::GHOST_ARRAY_NAME;
use crate::data::bounds::Extent;
use crate::data::dataset::{Dataset, GridGeometry};
use crate::mesh_error::MeshFlowError;

/// Extent of piece `piece` of `count` when `whole` is cut into slabs along
/// its longest axis, grown by `ghost` layers and clamped to `whole`.
///
/// Pieces beyond the number of available cell layers are empty.
pub fn split_extent(whole: &Extent, piece: usize, count: usize, ghost: usize) -> Extent {
    if whole.is_empty() || count == 0 || piece >= count {
        return Extent::EMPTY;
    }
    if count == 1 {
        return *whole;
    }
    let e = whole.0;
    let layers = [0, 1, 2].map(|a| (e[2 * a + 1] - e[2 * a]) as usize);
    let axis = (0..3).max_by_key(|&a| (layers[a], std::cmp::Reverse(a))).unwrap_or(0);
    if layers[axis] == 0 {
        // a single point: only piece 0 gets it
        return if piece == 0 { *whole } else { Extent::EMPTY };
    }

    let cells = bucket_range(piece, count, layers[axis]);
    if cells.is_empty() {
        return Extent::EMPTY;
    }
    let mut out = e;
    out[2 * axis] = e[2 * axis] + cells.start as i32;
    out[2 * axis + 1] = e[2 * axis] + cells.end as i32;

    let g = ghost as i32;
    for a in 0..3 {
        out[2 * a] = (out[2 * a] - g).max(e[2 * a]);
        out[2 * a + 1] = (out[2 * a + 1] + g).min(e[2 * a + 1]);
    }
    Extent(out)
}

/// Indices kept along one axis: `(point offsets, cell offsets)` relative to
/// the input extent.
fn axis_samples(lo: i32, hi: i32, emin: i32, input_cells: usize, rate: usize) -> (Vec<usize>, Vec<usize>) {
    let points: Vec<usize> = (lo..=hi)
        .step_by(rate)
        .map(|i| (i - emin) as usize)
        .collect();
    let cells = if points.len() > 1 {
        points[..points.len() - 1].to_vec()
    } else {
        let first = points.first().copied().unwrap_or(0);
        vec![first.min(input_cells.saturating_sub(1))]
    };
    (points, cells)
}

/// Sub-grid of a `VolumeGrid` restricted to `voi` and sampled every `rate`
/// points per axis.
///
/// With unit rate the output keeps the input's index space, so its extent is
/// exactly `voi ∩ input`. Otherwise the output is re-indexed from the sampled
/// corner with spacing scaled by the rate.
pub fn extract_voi(ds: &Dataset, voi: &Extent, rate: [usize; 3]) -> Result<Dataset, MeshFlowError> {
    let grid = ds.grid().ok_or(MeshFlowError::UnsupportedKind {
        kind: ds.kind().into(),
        operation: "volume of interest extraction",
    })?;
    if rate.contains(&0) {
        return Err(MeshFlowError::InvalidExtent(voi.0));
    }
    let input = grid.extent;
    let clipped = input.intersect(voi);
    if clipped.is_empty() {
        let mut out = Dataset::volume_grid(GridGeometry {
            extent: Extent::EMPTY,
            ..*grid
        });
        *out.point_data_mut() = ds.point_data().empty_like();
        *out.cell_data_mut() = ds.cell_data().empty_like();
        return Ok(out);
    }

    let c = clipped.0;
    let e = input.0;
    let in_dims = input.dimensions();
    let in_cells = in_dims.map(|d| d.saturating_sub(1).max(1));
    let mut point_axes: [Vec<usize>; 3] = Default::default();
    let mut cell_axes: [Vec<usize>; 3] = Default::default();
    for a in 0..3 {
        let (p, cl) = axis_samples(c[2 * a], c[2 * a + 1], e[2 * a], in_cells[a], rate[a]);
        point_axes[a] = p;
        cell_axes[a] = cl;
    }

    let out_grid = if rate == [1, 1, 1] {
        GridGeometry {
            extent: clipped,
            ..*grid
        }
    } else {
        let dims = [0, 1, 2].map(|a| point_axes[a].len());
        GridGeometry {
            extent: Extent::from_dimensions(dims),
            origin: grid.position([c[0], c[2], c[4]]),
            spacing: [0, 1, 2].map(|a| grid.spacing[a] * rate[a] as f64),
        }
    };
    let mut out = Dataset::volume_grid(out_grid);

    let mut point_ids = Vec::with_capacity(out.num_points());
    for &k in &point_axes[2] {
        for &j in &point_axes[1] {
            for &i in &point_axes[0] {
                point_ids.push(i + in_dims[0] * (j + in_dims[1] * k));
            }
        }
    }
    out.set_point_data(ds.point_data().select(&point_ids)?)?;

    if out.num_cells() > 0 && ds.num_cells() > 0 {
        let mut cell_ids = Vec::with_capacity(out.num_cells());
        for &k in &cell_axes[2] {
            for &j in &cell_axes[1] {
                for &i in &cell_axes[0] {
                    cell_ids.push(i + in_cells[0] * (j + in_cells[1] * k));
                }
            }
        }
        out.set_cell_data(ds.cell_data().select(&cell_ids)?)?;
    } else {
        out.set_cell_data(ds.cell_data().empty_like())?;
    }
    Ok(out)
}

/// Layers between structured coordinate `i` and the owned range `[lo, hi]`.
fn layers_outside(i: i32, lo: i32, hi: i32) -> u8 {
    let d = if i < lo {
        lo - i
    } else if i > hi {
        i - hi
    } else {
        0
    };
    d.clamp(0, u8::MAX as i32) as u8
}

/// Ghost levels of every point and cell of `extent`, measured against the
/// owned, unpadded extent.
pub fn ghost_levels(extent: &Extent, owned: &Extent) -> (Vec<u8>, Vec<u8>) {
    let e = extent.0;
    let o = owned.0;
    let mut points = Vec::with_capacity(extent.num_points());
    for k in e[4]..=e[5] {
        for j in e[2]..=e[3] {
            for i in e[0]..=e[1] {
                let level = [i, j, k]
                    .iter()
                    .enumerate()
                    .map(|(a, &x)| layers_outside(x, o[2 * a], o[2 * a + 1]))
                    .max()
                    .unwrap_or(0);
                points.push(level);
            }
        }
    }

    // cell `c` on an axis spans points c..c+1; a flat axis has one cell at lo
    let cell_range = |a: usize| {
        if e[2 * a] == e[2 * a + 1] {
            e[2 * a]..=e[2 * a]
        } else {
            e[2 * a]..=e[2 * a + 1] - 1
        }
    };
    let cell_level = |a: usize, c: i32| {
        if o[2 * a] == o[2 * a + 1] {
            0
        } else {
            layers_outside(c, o[2 * a], o[2 * a + 1] - 1)
        }
    };
    let mut cells = Vec::with_capacity(extent.num_cells());
    if extent.num_cells() > 0 {
        for k in cell_range(2) {
            for j in cell_range(1) {
                for i in cell_range(0) {
                    let level = cell_level(0, i).max(cell_level(1, j)).max(cell_level(2, k));
                    cells.push(level);
                }
            }
        }
    }
    (points, cells)
}

/// Attach `ghost_level` point and cell arrays to a grid whose extent pads
/// `owned`.
pub fn mark_grid_ghosts(ds: &mut Dataset, owned: &Extent) -> Result<(), MeshFlowError> {
    let extent = ds.grid().map(|g| g.extent).ok_or(MeshFlowError::UnsupportedKind {
        kind: ds.kind().into(),
        operation: "grid ghost marking",
    })?;
    let (points, cells) = ghost_levels(&extent, owned);
    ds.point_data_mut()
        .insert(DataArray::from_u8(GHOST_ARRAY_NAME, 1, points)?);
    ds.cell_data_mut()
        .insert(DataArray::from_u8(GHOST_ARRAY_NAME, 1, cells)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slabs_follow_the_longest_axis() {
        let whole = Extent::new(0, 10, 0, 4, 0, 0);
        assert_eq!(split_extent(&whole, 0, 2, 0), Extent::new(0, 5, 0, 4, 0, 0));
        assert_eq!(split_extent(&whole, 1, 2, 0), Extent::new(5, 10, 0, 4, 0, 0));
        assert_eq!(split_extent(&whole, 0, 1, 3), whole);
    }

    #[test]
    fn ghost_padding_is_clamped() {
        let whole = Extent::new(0, 10, 0, 4, 0, 0);
        assert_eq!(split_extent(&whole, 0, 2, 1), Extent::new(0, 6, 0, 4, 0, 0));
        assert_eq!(split_extent(&whole, 1, 2, 2), Extent::new(3, 10, 0, 4, 0, 0));
    }

    #[test]
    fn too_many_pieces_yield_empty_extents() {
        let whole = Extent::new(0, 2, 0, 0, 0, 0);
        let pieces: Vec<Extent> = (0..4).map(|p| split_extent(&whole, p, 4, 0)).collect();
        assert_eq!(pieces.iter().filter(|e| e.is_empty()).count(), 2);
        assert!(split_extent(&whole, 4, 4, 0).is_empty());
    }

    fn ramp(extent: Extent) -> Dataset {
        let mut ds = Dataset::volume_grid(GridGeometry::new(extent));
        let n = ds.num_points();
        ds.point_data_mut()
            .insert(DataArray::from_f64("id", 1, (0..n).map(|i| i as f64).collect()).unwrap());
        let m = ds.num_cells();
        ds.cell_data_mut()
            .insert(DataArray::from_i32("cid", 1, (0..m as i32).collect()).unwrap());
        ds
    }

    #[test]
    fn voi_keeps_index_space_at_unit_rate() {
        let ds = ramp(Extent::new(0, 3, 0, 2, 0, 0));
        let out = extract_voi(&ds, &Extent::new(1, 2, 1, 5, 0, 0), [1, 1, 1]).unwrap();
        assert_eq!(out.grid().unwrap().extent, Extent::new(1, 2, 1, 2, 0, 0));
        assert_eq!(
            out.point_data().get("id").unwrap().as_f64().unwrap(),
            &[5.0, 6.0, 9.0, 10.0]
        );
        assert_eq!(out.cell_data().get("cid").unwrap().as_i32().unwrap(), &[4]);
    }

    #[test]
    fn voi_sampling_scales_spacing() {
        let ds = ramp(Extent::new(0, 4, 0, 0, 0, 0));
        let out = extract_voi(&ds, &Extent::new(0, 4, 0, 0, 0, 0), [2, 1, 1]).unwrap();
        let g = out.grid().unwrap();
        assert_eq!(g.extent, Extent::new(0, 2, 0, 0, 0, 0));
        assert_eq!(g.spacing[0], 2.0);
        assert_eq!(out.point_data().get("id").unwrap().as_f64().unwrap(), &[0.0, 2.0, 4.0]);
        assert_eq!(out.cell_data().get("cid").unwrap().as_i32().unwrap(), &[0, 2]);
    }

    #[test]
    fn disjoint_voi_is_empty() {
        let ds = ramp(Extent::new(0, 3, 0, 3, 0, 0));
        let out = extract_voi(&ds, &Extent::new(7, 9, 0, 3, 0, 0), [1, 1, 1]).unwrap();
        assert!(out.is_empty());
        assert!(out.point_data().get("id").is_some());
    }
}
