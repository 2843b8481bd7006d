//! Variable-length cell runs in CSR layout.
//!
//! Cell `i` owns `connectivity[offsets[i]..offsets[i + 1]]`, a list of point
//! indices into the owning dataset's point buffer.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellArray {
    offsets: Vec<usize>,
    connectivity: Vec<usize>,
}

impl Default for CellArray {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            connectivity: Vec::new(),
        }
    }
}

impl CellArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for `cells` cells holding `ids` point indices in total.
    pub fn with_capacity(cells: usize, ids: usize) -> Self {
        let mut offsets = Vec::with_capacity(cells + 1);
        offsets.push(0);
        Self {
            offsets,
            connectivity: Vec::with_capacity(ids),
        }
    }

    /// Build from an iterator of point-index runs.
    pub fn from_cells<I, C>(cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[usize]>,
    {
        let mut out = Self::new();
        for c in cells {
            out.push(c.as_ref());
        }
        out
    }

    /// Build from raw CSR buffers, checking their shape.
    pub fn from_raw(offsets: Vec<usize>, connectivity: Vec<usize>) -> Result<Self, MeshFlowError> {
        let out = Self {
            offsets,
            connectivity,
        };
        out.check_shape()?;
        Ok(out)
    }

    pub fn push(&mut self, ids: &[usize]) {
        self.connectivity.extend_from_slice(ids);
        self.offsets.push(self.connectivity.len());
    }

    /// Append a cell whose ids are translated through `map`.
    pub fn push_mapped(&mut self, ids: &[usize], map: impl Fn(usize) -> usize) {
        self.connectivity.extend(ids.iter().map(|&i| map(i)));
        self.offsets.push(self.connectivity.len());
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of point indices over all cells.
    pub fn connectivity_len(&self) -> usize {
        self.connectivity.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }

    /// Point indices of cell `i`.
    pub fn cell(&self, i: usize) -> Option<&[usize]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        self.connectivity.get(start..end)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.offsets
            .iter()
            .tuple_windows()
            .map(move |(&s, &e)| &self.connectivity[s..e])
    }

    /// Append all cells of `other`, translating every id through `map`.
    pub fn extend_mapped(&mut self, other: &CellArray, map: impl Fn(usize) -> usize) {
        self.offsets.reserve(other.len());
        self.connectivity.reserve(other.connectivity_len());
        for c in other.iter() {
            self.push_mapped(c, &map);
        }
    }

    fn check_shape(&self) -> Result<(), MeshFlowError> {
        if self.offsets.first() != Some(&0) {
            return Err(MeshFlowError::MalformedCells(
                "offsets must start at 0".into(),
            ));
        }
        if let Some((i, _)) = self
            .offsets
            .iter()
            .tuple_windows()
            .find_position(|(a, b)| a > b)
        {
            return Err(MeshFlowError::MalformedCells(format!(
                "offsets decrease at cell {i}"
            )));
        }
        if self.offsets.last() != Some(&self.connectivity.len()) {
            return Err(MeshFlowError::MalformedCells(format!(
                "last offset {:?} does not match connectivity length {}",
                self.offsets.last(),
                self.connectivity.len()
            )));
        }
        Ok(())
    }

    /// Check shape and that every id is `< num_points`.
    ///
    /// `first_cell` is added to reported cell indices so callers holding
    /// several arrays can report dataset-global cell ids.
    pub fn validate(&self, num_points: usize, first_cell: usize) -> Result<(), MeshFlowError> {
        self.check_shape()?;
        for (i, c) in self.iter().enumerate() {
            if let Some(&bad) = c.iter().find(|&&p| p >= num_points) {
                return Err(MeshFlowError::CellIndexOutOfRange {
                    cell: first_cell + i,
                    point: bad,
                    num_points,
                });
            }
        }
        Ok(())
    }
}

impl DebugInvariants for CellArray {
    /// Offsets only; point ranges need the owning dataset.
    fn validate_invariants(&self) -> Result<(), MeshFlowError> {
        self.check_shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate() {
        let cells = CellArray::from_cells([vec![0, 1, 2], vec![2, 3]]);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells.cell(1), Some(&[2usize, 3][..]));
        assert_eq!(cells.iter().map(<[usize]>::len).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn extend_mapped_offsets_ids() {
        let mut a = CellArray::from_cells([[0, 1]]);
        let b = CellArray::from_cells([[0, 1], [1, 2]]);
        a.extend_mapped(&b, |i| i + 10);
        assert_eq!(a.connectivity(), &[0, 1, 10, 11, 11, 12]);
        assert_eq!(a.offsets(), &[0, 2, 4, 6]);
    }

    #[test]
    fn validate_catches_bad_ids_and_offsets() {
        let cells = CellArray::from_cells([[0, 5]]);
        assert!(matches!(
            cells.validate(3, 7),
            Err(MeshFlowError::CellIndexOutOfRange { cell: 7, point: 5, .. })
        ));
        assert!(CellArray::from_raw(vec![0, 3, 2], vec![0, 1, 2]).is_err());
        assert!(CellArray::from_raw(vec![1], vec![]).is_err());
    }
}
