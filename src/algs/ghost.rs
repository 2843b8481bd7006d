//! Ghost classification for piece decomposition.
//!
//! Every cell receives a tag: `0` when it belongs to the requested piece,
//! `k > 0` when it is a ghost reached `k` point-adjacency hops across the
//! piece boundary, and `-1` when it is not part of the piece at all. Point
//! tags are derived from the cells that use them.
//!
//! Tags are a pure function of the dataset and the [`PieceSpec`], so pieces
//! are reproducible across runs.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::data::dataset::Dataset;
use crate::mesh_error::MeshFlowError;
use crate::topology::links::CellLinks;

/// Tag of an element that is not part of the piece.
pub const NOT_IN_PIECE: i32 = -1;

/// Which piece to produce and how many ghost layers to add around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceSpec {
    pub piece: usize,
    pub num_pieces: usize,
    pub ghost_levels: usize,
}

impl Default for PieceSpec {
    fn default() -> Self {
        Self::whole()
    }
}

impl PieceSpec {
    pub fn new(piece: usize, num_pieces: usize, ghost_levels: usize) -> Self {
        Self {
            piece,
            num_pieces,
            ghost_levels,
        }
    }

    /// Piece 0 of 1, no ghosts.
    pub const fn whole() -> Self {
        Self {
            piece: 0,
            num_pieces: 1,
            ghost_levels: 0,
        }
    }

    pub fn is_whole(&self) -> bool {
        self.num_pieces == 1
    }

    pub fn validate(&self) -> Result<(), MeshFlowError> {
        if self.num_pieces == 0 || self.piece >= self.num_pieces {
            return Err(MeshFlowError::InvalidPiece {
                piece: self.piece,
                count: self.num_pieces,
            });
        }
        Ok(())
    }
}

/// Replacement for the contiguous-bucket membership test.
pub trait PieceSelector: Send + Sync {
    /// Whether `cell` is owned by the requested piece.
    fn in_piece(&self, cell: usize) -> bool;
}

impl<F> PieceSelector for F
where
    F: Fn(usize) -> bool + Send + Sync,
{
    fn in_piece(&self, cell: usize) -> bool {
        self(cell)
    }
}

/// First element index of bucket `piece` when `n` elements are divided into
/// `num_pieces` contiguous buckets, with boundaries rounded to nearest.
pub fn bucket_start(piece: usize, num_pieces: usize, n: usize) -> usize {
    if num_pieces == 0 {
        return 0;
    }
    let x = piece as f64 * n as f64 / num_pieces as f64;
    ((x + 0.5).floor() as usize).min(n)
}

/// Element range `[start, end)` of bucket `piece`.
pub fn bucket_range(piece: usize, num_pieces: usize, n: usize) -> std::ops::Range<usize> {
    bucket_start(piece, num_pieces, n)..bucket_start(piece + 1, num_pieces, n)
}

/// Per-element ghost tags for one piece.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GhostTags {
    pub cells: Vec<i32>,
    pub points: Vec<i32>,
}

impl GhostTags {
    /// Cells with tag ≥ 0, ascending.
    pub fn kept_cells(&self) -> Vec<usize> {
        kept(&self.cells)
    }

    /// Points with tag ≥ 0, ascending.
    pub fn kept_points(&self) -> Vec<usize> {
        kept(&self.points)
    }
}

fn kept(tags: &[i32]) -> Vec<usize> {
    tags.iter()
        .enumerate()
        .filter(|(_, t)| **t >= 0)
        .map(|(i, _)| i)
        .collect()
}

/// Classifies cells and points of one dataset for a piece request.
pub struct GhostClassifier<'a> {
    ds: &'a Dataset,
    links: Cow<'a, CellLinks>,
    distribute_orphans: bool,
}

impl<'a> GhostClassifier<'a> {
    pub fn new(ds: &'a Dataset) -> Self {
        Self {
            ds,
            links: Cow::Owned(CellLinks::build(ds)),
            distribute_orphans: true,
        }
    }

    /// Classifier reusing links already built for `ds`.
    pub fn with_links(ds: &'a Dataset, links: &'a CellLinks) -> Self {
        debug_assert_eq!(links.num_points(), ds.num_points());
        Self {
            ds,
            links: Cow::Borrowed(links),
            distribute_orphans: true,
        }
    }

    /// Whether points used by no cell are spread round-robin over pieces
    /// (default) or dropped.
    pub fn distribute_orphans(mut self, on: bool) -> Self {
        self.distribute_orphans = on;
        self
    }

    pub fn links(&self) -> &CellLinks {
        &self.links
    }

    /// Tag cells and points for `spec`, using the bucket test or `selector`.
    pub fn classify(
        &self,
        spec: &PieceSpec,
        selector: Option<&dyn PieceSelector>,
    ) -> Result<GhostTags, MeshFlowError> {
        spec.validate()?;
        let n_cells = self.ds.num_cells();
        let n_points = self.ds.num_points();

        if !self.ds.has_cell_topology() {
            // point-only kinds: split the point index space, no ghosts
            let owned = bucket_range(spec.piece, spec.num_pieces, n_points);
            let points = (0..n_points)
                .map(|p| {
                    let mine = match selector {
                        Some(s) => s.in_piece(p),
                        None => owned.contains(&p),
                    };
                    if mine { 0 } else { NOT_IN_PIECE }
                })
                .collect();
            return Ok(GhostTags {
                cells: vec![NOT_IN_PIECE; n_cells],
                points,
            });
        }

        let cells = self.cell_tags(spec, selector);
        let points = self.point_tags(spec, &cells);
        Ok(GhostTags { cells, points })
    }

    fn cell_tags(&self, spec: &PieceSpec, selector: Option<&dyn PieceSelector>) -> Vec<i32> {
        let n = self.ds.num_cells();
        let owned = bucket_range(spec.piece, spec.num_pieces, n);
        let mut tags = vec![NOT_IN_PIECE; n];
        let mut seeds = Vec::new();
        for (c, tag) in tags.iter_mut().enumerate() {
            let mine = match selector {
                Some(s) => s.in_piece(c),
                None => owned.contains(&c),
            };
            if mine {
                *tag = 0;
                seeds.push(c);
            }
        }
        if spec.ghost_levels == 0 || n == 0 {
            return tags;
        }

        // level 1 neighbours come straight from the owned cells
        self.promote_neighbours(&seeds, 1, &mut tags);

        for level in 2..=spec.ghost_levels as i32 {
            let seeds: Vec<usize> = tags
                .iter()
                .enumerate()
                .filter(|(_, t)| **t == level - 1)
                .map(|(c, _)| c)
                .collect();
            if seeds.is_empty() {
                break;
            }
            self.promote_neighbours(&seeds, level, &mut tags);
        }
        tags
    }

    fn promote_neighbours(&self, seeds: &[usize], level: i32, tags: &mut [i32]) {
        for &c in seeds {
            let Some(ids) = self.ds.cell_points(c) else {
                continue;
            };
            for &p in ids {
                for &nb in self.links.cells_of(p) {
                    if tags[nb] == NOT_IN_PIECE {
                        tags[nb] = level;
                    }
                }
            }
        }
    }

    fn point_tags(&self, spec: &PieceSpec, cell_tags: &[i32]) -> Vec<i32> {
        let n = self.ds.num_points();
        let mut tags = vec![NOT_IN_PIECE; n];
        for p in 0..n {
            let min = self
                .links
                .cells_of(p)
                .iter()
                .map(|&c| cell_tags[c])
                .filter(|&t| t >= 0)
                .min();
            if let Some(t) = min {
                tags[p] = t;
            }
        }
        if self.distribute_orphans {
            let orphans: Vec<usize> = (0..n).filter(|&p| self.links.is_orphan(p)).collect();
            let m = orphans.len();
            for (j, &p) in orphans.iter().enumerate() {
                if j * spec.num_pieces / m == spec.piece {
                    tags[p] = 0;
                }
            }
        }
        tags
    }
}
