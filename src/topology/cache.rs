//! Cache invalidation for structures derived from a dataset.

use std::sync::{Arc, Weak};

use crate::data::dataset::Dataset;
use crate::topology::links::CellLinks;

/// Anything that memoises derived topology (point links, adjacency, …)
/// should implement this.
pub trait InvalidateCache {
    /// Drop *all* memoised state so future queries recompute.
    fn invalidate_cache(&mut self);
}

impl<T: InvalidateCache + ?Sized> InvalidateCache for Box<T> {
    #[inline]
    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}

/// Point → cell links memoised against one shared dataset.
///
/// The cache holds only a weak reference: once the dataset is dropped, or
/// detached by `Arc::make_mut`, the next lookup rebuilds.
#[derive(Debug, Default)]
pub struct LinksCache {
    source: Weak<Dataset>,
    links: Option<Arc<CellLinks>>,
}

impl LinksCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links of `ds`, rebuilt only when `ds` is not the dataset seen last.
    pub fn get(&mut self, ds: &Arc<Dataset>) -> Arc<CellLinks> {
        if let (Some(src), Some(links)) = (self.source.upgrade(), &self.links) {
            if Arc::ptr_eq(&src, ds) {
                return Arc::clone(links);
            }
        }
        log::debug!("links cache: building links for {} points", ds.num_points());
        let links = Arc::new(CellLinks::build(ds));
        self.source = Arc::downgrade(ds);
        self.links = Some(Arc::clone(&links));
        links
    }

    pub fn is_cached_for(&self, ds: &Arc<Dataset>) -> bool {
        self.links.is_some() && self.source.upgrade().is_some_and(|s| Arc::ptr_eq(&s, ds))
    }
}

impl InvalidateCache for LinksCache {
    fn invalidate_cache(&mut self) {
        self.source = Weak::new();
        self.links = None;
    }
}
