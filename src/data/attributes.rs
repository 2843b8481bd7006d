//! Attribute sets: ordered, uniquely named arrays attached to points or cells.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::array::DataArray;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;

/// Reserved name of the ghost marker array (`u8`, one component).
pub const GHOST_ARRAY_NAME: &str = "ghost_level";

/// Semantic role an array may play inside its attribute set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AttributeRole {
    Scalars,
    Vectors,
    Normals,
    TextureCoords,
    GlobalIds,
    PedigreeIds,
}

/// Ordered collection of named arrays sharing one tuple count.
///
/// Insertion order is preserved so merged outputs list arrays deterministically.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    arrays: Vec<DataArray>,
    roles: BTreeMap<AttributeRole, String>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Tuple count shared by every array (`None` when the set is empty).
    pub fn num_tuples(&self) -> Option<usize> {
        self.arrays.first().map(DataArray::num_tuples)
    }

    /// Add `array`, replacing an existing array of the same name in place.
    pub fn insert(&mut self, array: DataArray) {
        match self.index_of(array.name()) {
            Some(i) => self.arrays[i] = array,
            None => self.arrays.push(array),
        }
    }

    /// Add `array` and assign it `role`.
    pub fn insert_with_role(&mut self, array: DataArray, role: AttributeRole) {
        let name = array.name().to_string();
        self.insert(array);
        self.roles.insert(role, name);
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.arrays.iter().position(|a| a.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.arrays.iter_mut().find(|a| a.name() == name)
    }

    pub fn get_index(&self, i: usize) -> Option<&DataArray> {
        self.arrays.get(i)
    }

    pub(crate) fn get_index_mut(&mut self, i: usize) -> Option<&mut DataArray> {
        self.arrays.get_mut(i)
    }

    /// Remove and return an array, dropping any role that pointed at it.
    pub fn remove(&mut self, name: &str) -> Option<DataArray> {
        let i = self.index_of(name)?;
        self.roles.retain(|_, n| n != name);
        Some(self.arrays.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataArray> {
        self.arrays.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(DataArray::name)
    }

    /// Mark the existing array `name` as playing `role`.
    pub fn set_role(&mut self, role: AttributeRole, name: &str) -> Result<(), MeshFlowError> {
        if self.index_of(name).is_none() {
            return Err(MeshFlowError::MissingArray(name.to_string()));
        }
        self.roles.insert(role, name.to_string());
        Ok(())
    }

    pub fn clear_role(&mut self, role: AttributeRole) {
        self.roles.remove(&role);
    }

    /// Name of the array playing `role`.
    pub fn role_name(&self, role: AttributeRole) -> Option<&str> {
        self.roles.get(&role).map(String::as_str)
    }

    /// Array playing `role`.
    pub fn role(&self, role: AttributeRole) -> Option<&DataArray> {
        self.role_name(role).and_then(|n| self.get(n))
    }

    pub fn roles(&self) -> impl Iterator<Item = (AttributeRole, &str)> {
        self.roles.iter().map(|(r, n)| (*r, n.as_str()))
    }

    /// The ghost marker array, if present.
    pub fn ghost_array(&self) -> Option<&DataArray> {
        self.get(GHOST_ARRAY_NAME)
    }

    /// Resize every array to `tuples` tuples.
    pub fn resize(&mut self, tuples: usize) {
        for a in &mut self.arrays {
            a.resize(tuples);
        }
    }

    /// Empty set with the same arrays (zero tuples) and roles.
    pub fn empty_like(&self) -> Self {
        Self {
            arrays: self.arrays.iter().map(|a| a.empty_like(0)).collect(),
            roles: self.roles.clone(),
        }
    }

    /// New set holding tuple `ids[k]` of every array as tuple `k`.
    pub fn select(&self, ids: &[usize]) -> Result<Self, MeshFlowError> {
        let arrays = self
            .arrays
            .iter()
            .map(|a| a.select_tuples(ids))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            arrays,
            roles: self.roles.clone(),
        })
    }

    /// Check that every array has exactly `expected` tuples.
    pub fn check_len(&self, expected: usize) -> Result<(), MeshFlowError> {
        for a in &self.arrays {
            if a.num_tuples() != expected {
                return Err(MeshFlowError::AttributeLengthMismatch {
                    name: a.name().to_string(),
                    expected,
                    actual: a.num_tuples(),
                });
            }
        }
        Ok(())
    }
}

impl DebugInvariants for AttributeSet {
    fn validate_invariants(&self) -> Result<(), MeshFlowError> {
        for (i, a) in self.arrays.iter().enumerate() {
            if self.arrays[..i].iter().any(|b| b.name() == a.name()) {
                return Err(MeshFlowError::DuplicateArray(a.name().to_string()));
            }
        }
        if let Some(n) = self.num_tuples() {
            self.check_len(n)?;
        }
        for name in self.roles.values() {
            if self.index_of(name).is_none() {
                return Err(MeshFlowError::MissingArray(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temps(n: usize) -> DataArray {
        DataArray::from_f64("temperature", 1, (0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut set = AttributeSet::new();
        set.insert(temps(2));
        set.insert(DataArray::from_i32("id", 1, vec![1, 2]).unwrap());
        set.insert(temps(2));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["temperature", "id"]);
    }

    #[test]
    fn roles_follow_removal() {
        let mut set = AttributeSet::new();
        set.insert_with_role(temps(3), AttributeRole::Scalars);
        assert_eq!(set.role(AttributeRole::Scalars).unwrap().num_tuples(), 3);
        set.remove("temperature");
        assert!(set.role_name(AttributeRole::Scalars).is_none());
        assert!(set.set_role(AttributeRole::Vectors, "nope").is_err());
    }

    #[test]
    fn mismatched_lengths_are_reported() {
        let mut set = AttributeSet::new();
        set.insert(temps(3));
        set.insert(DataArray::from_i32("id", 1, vec![1]).unwrap());
        assert!(matches!(
            set.validate_invariants(),
            Err(MeshFlowError::AttributeLengthMismatch { .. })
        ));
    }

    #[test]
    fn select_keeps_roles() {
        let mut set = AttributeSet::new();
        set.insert_with_role(temps(4), AttributeRole::Scalars);
        let sub = set.select(&[3, 1]).unwrap();
        assert_eq!(sub.get("temperature").unwrap().as_f64().unwrap(), &[3.0, 1.0]);
        assert_eq!(sub.role_name(AttributeRole::Scalars), Some("temperature"));
    }
}
