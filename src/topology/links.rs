//! Upward point → cell incidence.

use crate::data::dataset::Dataset;

/// For every point, the sorted list of cells that reference it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellLinks {
    offsets: Vec<usize>,
    cells: Vec<usize>,
}

impl CellLinks {
    /// Build links for the explicit cells of `ds`.
    ///
    /// Implicit kinds (grids, clouds, tables) yield links with no incidences.
    pub fn build(ds: &Dataset) -> Self {
        let n = ds.num_points();
        let mut counts = vec![0usize; n + 1];
        for cell in ds.cells() {
            for &p in cell {
                counts[p + 1] += 1;
            }
        }
        for i in 1..counts.len() {
            counts[i] += counts[i - 1];
        }
        let offsets = counts;
        let mut cursor = offsets.clone();
        let mut cells = vec![0usize; offsets[n]];
        for (c, ids) in ds.cells().enumerate() {
            for &p in ids {
                cells[cursor[p]] = c;
                cursor[p] += 1;
            }
        }
        // A cell listing the same point twice would appear twice in that run.
        let mut links = Self { offsets, cells };
        links.dedup_runs();
        links
    }

    fn dedup_runs(&mut self) {
        let mut out = Vec::with_capacity(self.cells.len());
        let mut offsets = Vec::with_capacity(self.offsets.len());
        offsets.push(0);
        for w in self.offsets.windows(2) {
            let run = &self.cells[w[0]..w[1]];
            let start = out.len();
            for &c in run {
                if out.len() == start || out[out.len() - 1] != c {
                    out.push(c);
                }
            }
            offsets.push(out.len());
        }
        self.cells = out;
        self.offsets = offsets;
    }

    pub fn num_points(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Cells incident to point `p`, ascending.
    pub fn cells_of(&self, p: usize) -> &[usize] {
        match (self.offsets.get(p), self.offsets.get(p + 1)) {
            (Some(&s), Some(&e)) => &self.cells[s..e],
            _ => &[],
        }
    }

    /// True when no cell references point `p`.
    pub fn is_orphan(&self, p: usize) -> bool {
        self.cells_of(p).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cell_array::CellArray;
    use crate::topology::cell_type::CellType;

    #[test]
    fn links_list_incident_cells() {
        let cells = CellArray::from_cells([vec![0, 1], vec![1, 2], vec![2, 2]]);
        let ds = Dataset::unstructured(
            vec![[0.0; 3]; 4],
            cells,
            vec![CellType::Segment, CellType::Segment, CellType::Segment],
        )
        .unwrap();
        let links = CellLinks::build(&ds);
        assert_eq!(links.cells_of(1), &[0, 1]);
        assert_eq!(links.cells_of(2), &[1, 2]);
        assert!(links.is_orphan(3));
        assert_eq!(links.cells_of(9), &[] as &[usize]);
    }
}
