//! Tolerance-aware incremental point locator.
//!
//! [`PointMatcher`] keeps an octree of bounding regions over the points
//! inserted so far. [`PointMatcher::insert_unique`] answers "is there already
//! a point within `tolerance` of X?" and inserts X when there is not, in
//! amortized sub-linear time. Ids are assigned densely in insertion order.

use crate::data::bounds::Bounds;

const DEFAULT_LEAF_CAPACITY: usize = 16;
const MAX_DEPTH: usize = 24;

#[derive(Clone, Debug)]
struct OctNode {
    bounds: Bounds,
    depth: usize,
    /// Index of the first of eight contiguous children.
    first_child: Option<usize>,
    ids: Vec<usize>,
}

impl OctNode {
    fn leaf(bounds: Bounds, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            first_child: None,
            ids: Vec::new(),
        }
    }

    fn octant(&self, p: &[f64; 3]) -> usize {
        let c = self.bounds.center();
        (0..3).fold(0, |acc, k| acc | (usize::from(p[k] >= c[k]) << k))
    }
}

/// Incremental octree point locator with merge tolerance.
#[derive(Clone, Debug)]
pub struct PointMatcher {
    tolerance: f64,
    leaf_capacity: usize,
    nodes: Vec<OctNode>,
    points: Vec<[f64; 3]>,
    /// Points inserted outside the root region; scanned linearly.
    outside: Vec<usize>,
}

impl PointMatcher {
    /// Locator over `bounds` matching points closer than `tolerance`.
    ///
    /// Points outside `bounds` are still accepted; they are just not indexed
    /// by the tree.
    pub fn new(bounds: Bounds, tolerance: f64) -> Self {
        Self::with_leaf_capacity(bounds, tolerance, DEFAULT_LEAF_CAPACITY)
    }

    pub fn with_leaf_capacity(bounds: Bounds, tolerance: f64, leaf_capacity: usize) -> Self {
        let root = if bounds.is_empty() {
            Bounds {
                min: [0.0; 3],
                max: [1.0; 3],
            }
        } else {
            // keep the box non-degenerate so octants can split
            let pad = (bounds.diagonal_length() * 1e-6).max(f64::EPSILON) + tolerance.max(0.0);
            bounds.inflate(pad)
        };
        Self {
            tolerance: tolerance.max(0.0),
            leaf_capacity: leaf_capacity.max(1),
            nodes: vec![OctNode::leaf(root, 0)],
            points: Vec::new(),
            outside: Vec::new(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn into_points(self) -> Vec<[f64; 3]> {
        self.points
    }

    /// Closest inserted point within tolerance of `p` (lowest id on ties).
    pub fn find(&self, p: &[f64; 3]) -> Option<usize> {
        let tol2 = self.tolerance * self.tolerance;
        let query = Bounds {
            min: *p,
            max: *p,
        }
        .inflate(self.tolerance);

        let mut best: Option<(f64, usize)> = None;
        let consider = |id: usize, best: &mut Option<(f64, usize)>| {
            let d2 = dist2(&self.points[id], p);
            if d2 <= tol2 && best.is_none_or(|(bd, bid)| d2 < bd || (d2 == bd && id < bid)) {
                *best = Some((d2, id));
            }
        };

        let mut stack = vec![0usize];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            if !node.bounds.intersects(&query) {
                continue;
            }
            match node.first_child {
                Some(first) => stack.extend(first..first + 8),
                None => {
                    for &id in &node.ids {
                        consider(id, &mut best);
                    }
                }
            }
        }
        for &id in &self.outside {
            consider(id, &mut best);
        }
        best.map(|(_, id)| id)
    }

    /// Insert `p` unconditionally and return its id.
    pub fn insert(&mut self, p: [f64; 3]) -> usize {
        let id = self.points.len();
        self.points.push(p);
        if !self.nodes[0].bounds.contains(&p) {
            self.outside.push(id);
            return id;
        }
        let mut n = 0;
        while let Some(first) = self.nodes[n].first_child {
            n = first + self.nodes[n].octant(&p);
        }
        self.nodes[n].ids.push(id);
        if self.nodes[n].ids.len() > self.leaf_capacity && self.nodes[n].depth < MAX_DEPTH {
            self.split(n);
        }
        id
    }

    /// Return the id of a point within tolerance of `p`, inserting `p` if
    /// there is none. The flag is `true` when a new point was inserted.
    pub fn insert_unique(&mut self, p: [f64; 3]) -> (usize, bool) {
        match self.find(&p) {
            Some(id) => (id, false),
            None => (self.insert(p), true),
        }
    }

    fn split(&mut self, n: usize) {
        let bounds = self.nodes[n].bounds;
        let depth = self.nodes[n].depth;
        let c = bounds.center();
        let first = self.nodes.len();
        for oct in 0..8 {
            let mut b = bounds;
            for k in 0..3 {
                if oct & (1 << k) != 0 {
                    b.min[k] = c[k];
                } else {
                    b.max[k] = c[k];
                }
            }
            self.nodes.push(OctNode::leaf(b, depth + 1));
        }
        let ids = std::mem::take(&mut self.nodes[n].ids);
        self.nodes[n].first_child = Some(first);
        for id in ids {
            let oct = self.nodes[n].octant(&self.points[id]);
            self.nodes[first + oct].ids.push(id);
        }
    }
}

fn dist2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|k| (a[k] - b[k]).powi(2)).sum()
}

/// Resolve a merge tolerance against the bounds of the data being merged.
///
/// A relative tolerance is scaled by the bounds diagonal.
pub fn resolve_tolerance(tolerance: f64, absolute: bool, bounds: &Bounds) -> f64 {
    if absolute {
        tolerance.max(0.0)
    } else {
        (tolerance * bounds.diagonal_length()).max(0.0)
    }
}
