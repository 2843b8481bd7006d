//! Field compatibility ledger: which attribute arrays survive a merge.
//!
//! Given K attribute sets, the ledger keeps every array whose name, element
//! type and component count appear in *all* non-empty sources, and records,
//! for each source, where that array lives. Sources contributing zero tuples
//! are skipped entirely, so an empty optional input cannot suppress an array
//! that every populated input shares.
//!
//! The surviving *set* does not depend on source order; the surviving *order*
//! follows the first non-empty source.

use crate::data::array::{DataArray, ElementType};
use crate::data::attributes::{AttributeRole, AttributeSet};
use crate::mesh_error::MeshFlowError;

/// One surviving array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub name: String,
    pub element_type: ElementType,
    pub components: usize,
    /// Index of the array inside each source's set; `None` for skipped sources.
    pub source_index: Vec<Option<usize>>,
}

/// Intersection of K attribute sets plus per-source lookup tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldLedger {
    entries: Vec<LedgerEntry>,
    roles: Vec<(AttributeRole, usize)>,
    participating: Vec<bool>,
}

impl FieldLedger {
    /// Build from `(set, element_count)` pairs, one per source.
    pub fn build<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = (&'a AttributeSet, usize)>,
    {
        let sources: Vec<(&AttributeSet, usize)> = sources.into_iter().collect();
        let participating: Vec<bool> = sources.iter().map(|&(_, n)| n > 0).collect();
        let k = sources.len();

        let Some(first) = participating.iter().position(|&p| p) else {
            return Self {
                entries: Vec::new(),
                roles: Vec::new(),
                participating,
            };
        };

        let mut entries: Vec<LedgerEntry> = sources[first]
            .0
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut source_index = vec![None; k];
                source_index[first] = Some(i);
                LedgerEntry {
                    name: a.name().to_string(),
                    element_type: a.element_type(),
                    components: a.components(),
                    source_index,
                }
            })
            .collect();

        for (s, &(set, _)) in sources.iter().enumerate().skip(first + 1) {
            if !participating[s] {
                continue;
            }
            entries.retain_mut(|e| {
                let found = set
                    .index_of(&e.name)
                    .and_then(|i| set.get_index(i).map(|a| (i, a)));
                match found {
                    Some((i, a))
                        if a.element_type() == e.element_type
                            && a.components() == e.components =>
                    {
                        e.source_index[s] = Some(i);
                        true
                    }
                    _ => false,
                }
            });
        }

        let mut roles = Vec::new();
        for (role, name) in sources[first].0.roles() {
            let Some(entry) = entries.iter().position(|e| e.name == name) else {
                continue;
            };
            let agreed = sources
                .iter()
                .zip(&participating)
                .filter(|(_, p)| **p)
                .all(|((set, _), _)| set.role_name(role) == Some(name));
            if agreed {
                roles.push((role, entry));
            }
        }

        Self {
            entries,
            roles,
            participating,
        }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_sources(&self) -> usize {
        self.participating.len()
    }

    /// Whether source `s` took part in the intersection.
    pub fn is_participating(&self, s: usize) -> bool {
        self.participating.get(s).copied().unwrap_or(false)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Output set with one zero-filled array per entry (in entry order) and
    /// the agreed roles.
    pub fn allocate(&self, tuples: usize) -> AttributeSet {
        let mut out = AttributeSet::new();
        for e in &self.entries {
            out.insert(DataArray::zeros(
                e.name.clone(),
                e.element_type,
                e.components,
                tuples,
            ));
        }
        for &(role, entry) in &self.roles {
            // allocate() just inserted this name
            let _ = out.set_role(role, &self.entries[entry].name);
        }
        out
    }

    fn check_source(&self, source: usize, count: usize) -> Result<bool, MeshFlowError> {
        if self.is_participating(source) {
            return Ok(true);
        }
        if count == 0 {
            return Ok(false);
        }
        Err(MeshFlowError::AttributeLengthMismatch {
            name: format!("<source {source}>"),
            expected: 0,
            actual: count,
        })
    }

    /// Copy `count` tuples starting at `src_start` of source `source` into
    /// `dst[dst_start..]`, for every surviving array.
    ///
    /// `dst` must have been produced by [`FieldLedger::allocate`].
    pub fn copy_range(
        &self,
        dst: &mut AttributeSet,
        source: usize,
        src: &AttributeSet,
        src_start: usize,
        dst_start: usize,
        count: usize,
    ) -> Result<(), MeshFlowError> {
        if !self.check_source(source, count)? {
            return Ok(());
        }
        for (j, e) in self.entries.iter().enumerate() {
            let (s, d) = self.pair(dst, j, e, source, src)?;
            d.copy_range_from(dst_start, s, src_start, count)?;
        }
        Ok(())
    }

    /// Copy source tuples `ids[k]` into `dst[dst_start + k]`.
    pub fn copy_ids(
        &self,
        dst: &mut AttributeSet,
        source: usize,
        src: &AttributeSet,
        ids: &[usize],
        dst_start: usize,
    ) -> Result<(), MeshFlowError> {
        if !self.check_source(source, ids.len())? {
            return Ok(());
        }
        for (j, e) in self.entries.iter().enumerate() {
            let (s, d) = self.pair(dst, j, e, source, src)?;
            d.copy_tuples_from_ids(dst_start, s, ids)?;
        }
        Ok(())
    }

    /// Copy one tuple.
    pub fn copy_tuple(
        &self,
        dst: &mut AttributeSet,
        source: usize,
        src: &AttributeSet,
        src_index: usize,
        dst_index: usize,
    ) -> Result<(), MeshFlowError> {
        self.copy_range(dst, source, src, src_index, dst_index, 1)
    }

    fn pair<'s, 'd>(
        &self,
        dst: &'d mut AttributeSet,
        j: usize,
        e: &LedgerEntry,
        source: usize,
        src: &'s AttributeSet,
    ) -> Result<(&'s DataArray, &'d mut DataArray), MeshFlowError> {
        let s = e.source_index[source]
            .and_then(|i| src.get_index(i))
            .ok_or_else(|| MeshFlowError::MissingArray(e.name.clone()))?;
        let d = dst
            .get_index_mut(j)
            .filter(|d| d.name() == e.name)
            .ok_or_else(|| MeshFlowError::MissingArray(e.name.clone()))?;
        Ok((s, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(arrays: &[(&str, usize)], tuples: usize) -> AttributeSet {
        let mut s = AttributeSet::new();
        for &(name, nc) in arrays {
            s.insert(DataArray::zeros(name, ElementType::F64, nc, tuples));
        }
        s
    }

    #[test]
    fn intersection_by_name_type_and_width() {
        let a = set(&[("temperature", 1), ("velocity", 3), ("id", 1)], 2);
        let mut b = set(&[("velocity", 3), ("id", 1)], 2);
        b.insert(DataArray::zeros("temperature", ElementType::F32, 1, 2));
        let c = set(&[("velocity", 2), ("id", 1)], 5);
        let ledger = FieldLedger::build([(&a, 2), (&b, 2), (&c, 5)]);
        assert_eq!(ledger.names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(ledger.entries()[0].source_index, vec![Some(2), Some(1), Some(1)]);
    }

    #[test]
    fn empty_sources_do_not_suppress_arrays() {
        let a = set(&[("temperature", 1)], 3);
        let empty = AttributeSet::new();
        let ledger = FieldLedger::build([(&empty, 0), (&a, 3), (&empty, 0)]);
        assert_eq!(ledger.names().collect::<Vec<_>>(), vec!["temperature"]);
        assert!(!ledger.is_participating(0));
        assert!(ledger.is_participating(1));
    }

    #[test]
    fn roles_survive_only_when_all_agree() {
        let mut a = set(&[("t", 1), ("u", 1)], 1);
        let mut b = a.clone();
        a.set_role(AttributeRole::Scalars, "t").unwrap();
        b.set_role(AttributeRole::Scalars, "t").unwrap();
        a.set_role(AttributeRole::GlobalIds, "u").unwrap();
        let ledger = FieldLedger::build([(&a, 1), (&b, 1)]);
        let out = ledger.allocate(2);
        assert_eq!(out.role_name(AttributeRole::Scalars), Some("t"));
        assert_eq!(out.role_name(AttributeRole::GlobalIds), None);
    }

    #[test]
    fn copy_range_writes_at_offsets() {
        let mut a = AttributeSet::new();
        a.insert(DataArray::from_f64("t", 1, vec![1.0, 2.0]).unwrap());
        let mut b = AttributeSet::new();
        b.insert(DataArray::from_f64("t", 1, vec![3.0]).unwrap());
        let ledger = FieldLedger::build([(&a, 2), (&b, 1)]);
        let mut out = ledger.allocate(3);
        ledger.copy_range(&mut out, 0, &a, 0, 0, 2).unwrap();
        ledger.copy_range(&mut out, 1, &b, 0, 2, 1).unwrap();
        assert_eq!(out.get("t").unwrap().as_f64().unwrap(), &[1.0, 2.0, 3.0]);
    }
}
