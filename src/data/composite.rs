//! Composite containers: trees of optional datasets.
//!
//! Internal blocks carry no data; leaves hold an optional [`Dataset`]. An
//! absent leaf means "no data here", not an error. Leaves are addressed by a
//! flat index assigned in depth-first order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::bounds::Bounds;
use crate::data::dataset::Dataset;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;

/// One node of a composite tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CompositeNode {
    Block {
        name: Option<String>,
        children: Vec<CompositeNode>,
    },
    Leaf {
        name: Option<String>,
        data: Option<Arc<Dataset>>,
    },
}

impl CompositeNode {
    pub fn leaf(name: impl Into<String>, data: Option<Arc<Dataset>>) -> Self {
        CompositeNode::Leaf {
            name: Some(name.into()),
            data,
        }
    }

    pub fn block(name: impl Into<String>, children: Vec<CompositeNode>) -> Self {
        CompositeNode::Block {
            name: Some(name.into()),
            children,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CompositeNode::Block { name, .. } | CompositeNode::Leaf { name, .. } => {
                name.as_deref()
            }
        }
    }

    fn num_leaves(&self) -> usize {
        match self {
            CompositeNode::Leaf { .. } => 1,
            CompositeNode::Block { children, .. } => {
                children.iter().map(CompositeNode::num_leaves).sum()
            }
        }
    }

    fn same_shape(&self, other: &CompositeNode, check_presence: bool) -> bool {
        match (self, other) {
            (CompositeNode::Leaf { data: a, .. }, CompositeNode::Leaf { data: b, .. }) => {
                !check_presence || a.is_some() == b.is_some()
            }
            (
                CompositeNode::Block { children: a, .. },
                CompositeNode::Block { children: b, .. },
            ) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.same_shape(y, check_presence))
            }
            _ => false,
        }
    }

    fn copy_structure(&self) -> CompositeNode {
        match self {
            CompositeNode::Leaf { name, .. } => CompositeNode::Leaf {
                name: name.clone(),
                data: None,
            },
            CompositeNode::Block { name, children } => CompositeNode::Block {
                name: name.clone(),
                children: children.iter().map(CompositeNode::copy_structure).collect(),
            },
        }
    }

    fn fill_leaves(&mut self, data: &mut dyn Iterator<Item = Option<Arc<Dataset>>>) -> bool {
        match self {
            CompositeNode::Leaf { data: slot, .. } => match data.next() {
                Some(d) => {
                    *slot = d;
                    true
                }
                None => false,
            },
            CompositeNode::Block { children, .. } => {
                children.iter_mut().all(|c| c.fill_leaves(data))
            }
        }
    }

    fn leaf_slot_mut(&mut self, mut index: usize) -> Result<&mut Option<Arc<Dataset>>, usize> {
        match self {
            CompositeNode::Leaf { data, .. } => {
                if index == 0 {
                    Ok(data)
                } else {
                    Err(index - 1)
                }
            }
            CompositeNode::Block { children, .. } => {
                for child in children {
                    match child.leaf_slot_mut(index) {
                        Ok(slot) => return Ok(slot),
                        Err(rest) => index = rest,
                    }
                }
                Err(index)
            }
        }
    }
}

/// Leaf visited by [`LeafIter`].
#[derive(Clone, Copy, Debug)]
pub struct LeafRef<'a> {
    /// Depth-first flat index.
    pub index: usize,
    pub name: Option<&'a str>,
    pub data: Option<&'a Arc<Dataset>>,
}

/// Depth-first iterator over the leaves of a composite tree.
pub struct LeafIter<'a> {
    stack: Vec<std::slice::Iter<'a, CompositeNode>>,
    next_index: usize,
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = LeafRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(CompositeNode::Block { children, .. }) => {
                    self.stack.push(children.iter());
                }
                Some(CompositeNode::Leaf { name, data }) => {
                    let index = self.next_index;
                    self.next_index += 1;
                    return Some(LeafRef {
                        index,
                        name: name.as_deref(),
                        data: data.as_ref(),
                    });
                }
            }
        }
    }
}

/// A tree of datasets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeDataset {
    children: Vec<CompositeNode>,
}

impl CompositeDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(children: Vec<CompositeNode>) -> Self {
        Self { children }
    }

    /// Append a top-level leaf.
    pub fn push_leaf(&mut self, name: impl Into<String>, data: Option<Dataset>) {
        self.children
            .push(CompositeNode::leaf(name, data.map(Arc::new)));
    }

    /// Append a top-level node.
    pub fn push_node(&mut self, node: CompositeNode) {
        self.children.push(node);
    }

    pub fn children(&self) -> &[CompositeNode] {
        &self.children
    }

    pub fn num_leaves(&self) -> usize {
        self.children.iter().map(CompositeNode::num_leaves).sum()
    }

    /// Leaves in depth-first order.
    pub fn leaves(&self) -> LeafIter<'_> {
        LeafIter {
            stack: vec![self.children.iter()],
            next_index: 0,
        }
    }

    /// Data at flat leaf `index`.
    pub fn leaf(&self, index: usize) -> Option<&Arc<Dataset>> {
        self.leaves().nth(index).and_then(|l| l.data)
    }

    /// Replace the data at flat leaf `index`.
    pub fn set_leaf(
        &mut self,
        index: usize,
        data: Option<Arc<Dataset>>,
    ) -> Result<(), MeshFlowError> {
        let mut rest = index;
        for child in &mut self.children {
            match child.leaf_slot_mut(rest) {
                Ok(slot) => {
                    *slot = data;
                    return Ok(());
                }
                Err(r) => rest = r,
            }
        }
        Err(MeshFlowError::StructureMismatch)
    }

    /// Replace every leaf, in depth-first order. `data` must yield exactly
    /// [`num_leaves`](Self::num_leaves) items.
    pub fn set_leaves<I>(&mut self, data: I) -> Result<(), MeshFlowError>
    where
        I: IntoIterator<Item = Option<Arc<Dataset>>>,
    {
        let mut it = data.into_iter();
        let filled = self.children.iter_mut().all(|c| c.fill_leaves(&mut it));
        if !filled || it.next().is_some() {
            return Err(MeshFlowError::StructureMismatch);
        }
        Ok(())
    }

    /// Same tree shape, every leaf empty.
    pub fn copy_structure(&self) -> Self {
        Self {
            children: self.children.iter().map(CompositeNode::copy_structure).collect(),
        }
    }

    /// Identical shape and leaf-presence pattern.
    pub fn is_structurally_compatible(&self, other: &CompositeDataset) -> bool {
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b, true))
    }

    /// Identical shape, ignoring which leaves hold data.
    pub fn has_same_shape(&self, other: &CompositeDataset) -> bool {
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b, false))
    }

    /// Bounds of each leaf, `None` for absent or empty leaves.
    pub fn leaf_bounds(&self) -> Vec<Option<Bounds>> {
        self.leaves()
            .map(|l| l.data.map(|d| d.bounds()).filter(|b| !b.is_empty()))
            .collect()
    }

    pub fn bounds(&self) -> Bounds {
        self.leaf_bounds()
            .into_iter()
            .flatten()
            .fold(Bounds::empty(), |acc, b| acc.union(&b))
    }

    pub fn num_points(&self) -> usize {
        self.leaves()
            .filter_map(|l| l.data)
            .map(|d| d.num_points())
            .sum()
    }

    pub fn num_cells(&self) -> usize {
        self.leaves()
            .filter_map(|l| l.data)
            .map(|d| d.num_cells())
            .sum()
    }
}

impl DebugInvariants for CompositeDataset {
    fn validate_invariants(&self) -> Result<(), MeshFlowError> {
        for leaf in self.leaves() {
            if let Some(d) = leaf.data {
                d.validate_invariants()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(presence: [bool; 3]) -> CompositeDataset {
        let cloud = || Some(Arc::new(Dataset::point_cloud(vec![[0.0; 3]])));
        let pick = |p: bool| if p { cloud() } else { None };
        CompositeDataset::from_nodes(vec![
            CompositeNode::leaf("a", pick(presence[0])),
            CompositeNode::block(
                "inner",
                vec![
                    CompositeNode::leaf("b", pick(presence[1])),
                    CompositeNode::leaf("c", pick(presence[2])),
                ],
            ),
        ])
    }

    #[test]
    fn leaves_are_depth_first() {
        let t = tree([true, false, true]);
        let names: Vec<_> = t.leaves().map(|l| (l.index, l.name.unwrap())).collect();
        assert_eq!(names, vec![(0, "a"), (1, "b"), (2, "c")]);
        assert_eq!(t.num_leaves(), 3);
        assert!(t.leaf(1).is_none());
        assert!(t.leaf(2).is_some());
    }

    #[test]
    fn compatibility_checks_presence() {
        let a = tree([true, false, true]);
        assert!(a.is_structurally_compatible(&tree([true, false, true])));
        assert!(!a.is_structurally_compatible(&tree([true, true, true])));
        assert!(a.has_same_shape(&tree([true, true, true])));
        assert!(!a.has_same_shape(&CompositeDataset::new()));
    }

    #[test]
    fn set_leaf_and_copy_structure() {
        let mut t = tree([false, false, false]).copy_structure();
        t.set_leaf(1, Some(Arc::new(Dataset::table(3)))).unwrap();
        assert_eq!(t.leaf(1).unwrap().num_points(), 3);
        assert!(t.set_leaf(3, None).is_err());
        assert!(t.copy_structure().leaves().all(|l| l.data.is_none()));
    }

    #[test]
    fn set_leaves_requires_exact_count() {
        let mut t = tree([false, false, false]);
        let table = Some(Arc::new(Dataset::table(2)));
        t.set_leaves([None, table.clone(), None]).unwrap();
        assert_eq!(t.leaf(1).unwrap().num_points(), 2);
        assert!(t.set_leaves([None, None]).is_err());
        assert!(t.set_leaves([None, None, None, table]).is_err());
    }
}
