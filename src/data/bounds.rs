//! Axis-aligned bounding boxes and structured index extents.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. An empty box has `min > max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    pub const fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.add_point(p);
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|k| self.min[k] > self.max[k])
    }

    pub fn add_point(&mut self, p: &[f64; 3]) {
        for k in 0..3 {
            self.min[k] = self.min[k].min(p[k]);
            self.max[k] = self.max[k].max(p[k]);
        }
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut out = *self;
        for k in 0..3 {
            out.min[k] = out.min[k].min(other.min[k]);
            out.max[k] = out.max[k].max(other.max[k]);
        }
        out
    }

    /// Length of the box diagonal (0 for an empty box).
    pub fn diagonal_length(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (0..3)
            .map(|k| (self.max[k] - self.min[k]).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    pub fn center(&self) -> [f64; 3] {
        [0, 1, 2].map(|k| 0.5 * (self.min[k] + self.max[k]))
    }

    /// Grow by `pad` on every side.
    pub fn inflate(&self, pad: f64) -> Bounds {
        Bounds {
            min: [0, 1, 2].map(|k| self.min[k] - pad),
            max: [0, 1, 2].map(|k| self.max[k] + pad),
        }
    }

    /// Closed-box containment.
    pub fn contains(&self, p: &[f64; 3]) -> bool {
        (0..3).all(|k| p[k] >= self.min[k] && p[k] <= self.max[k])
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        (0..3).all(|k| self.min[k] <= other.max[k] && other.min[k] <= self.max[k])
    }
}

/// Structured index extent `[imin, imax, jmin, jmax, kmin, kmax]`, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent(pub [i32; 6]);

impl Extent {
    /// The canonical empty extent.
    pub const EMPTY: Extent = Extent([0, -1, 0, -1, 0, -1]);

    pub fn new(imin: i32, imax: i32, jmin: i32, jmax: i32, kmin: i32, kmax: i32) -> Self {
        Extent([imin, imax, jmin, jmax, kmin, kmax])
    }

    /// Extent of a grid with `dims` points per axis, starting at 0.
    pub fn from_dimensions(dims: [usize; 3]) -> Self {
        let m = dims.map(|d| d as i32 - 1);
        Extent([0, m[0], 0, m[1], 0, m[2]])
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|a| self.0[2 * a] > self.0[2 * a + 1])
    }

    /// Points per axis.
    pub fn dimensions(&self) -> [usize; 3] {
        [0, 1, 2].map(|a| (self.0[2 * a + 1] - self.0[2 * a] + 1).max(0) as usize)
    }

    pub fn num_points(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.dimensions().iter().product()
    }

    /// Cells per axis; a flat axis (one point) contributes one "layer".
    pub fn num_cells(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let dims = self.dimensions();
        if dims.iter().all(|&d| d <= 1) {
            return 0;
        }
        dims.iter().map(|&d| if d > 1 { d - 1 } else { 1 }).product()
    }

    pub fn intersect(&self, other: &Extent) -> Extent {
        let mut out = [0; 6];
        for a in 0..3 {
            out[2 * a] = self.0[2 * a].max(other.0[2 * a]);
            out[2 * a + 1] = self.0[2 * a + 1].min(other.0[2 * a + 1]);
        }
        Extent(out)
    }

    pub fn contains(&self, other: &Extent) -> bool {
        other.is_empty()
            || (0..3).all(|a| {
                self.0[2 * a] <= other.0[2 * a] && other.0[2 * a + 1] <= self.0[2 * a + 1]
            })
    }

    /// Flat point index of structured coordinate `ijk` inside this extent.
    pub fn point_index(&self, ijk: [i32; 3]) -> Option<usize> {
        let dims = self.dimensions();
        let mut local = [0usize; 3];
        for a in 0..3 {
            if ijk[a] < self.0[2 * a] || ijk[a] > self.0[2 * a + 1] {
                return None;
            }
            local[a] = (ijk[a] - self.0[2 * a]) as usize;
        }
        Some(local[0] + dims[0] * (local[1] + dims[1] * local[2]))
    }
}
