//! Lazy revision walk with predicates.

use crate::backend::{GitBackend, ObjectId, Revision, WalkRequest};
use crate::error::Result;
use crate::filter::WalkPredicates;
use std::sync::Arc;

/// Revisions of a walk that pass every predicate, in walk order.
///
/// The backend returns the ordered ids up front; metadata is loaded and
/// checked one revision at a time as the walk is consumed.
pub struct RevisionWalk {
    backend: Arc<dyn GitBackend>,
    ids: std::vec::IntoIter<ObjectId>,
    predicates: WalkPredicates,
    yielded: usize,
}

impl RevisionWalk {
    pub fn new(
        backend: Arc<dyn GitBackend>,
        request: &WalkRequest,
        predicates: WalkPredicates,
    ) -> Result<Self> {
        let ids = backend.walk(request)?;
        Ok(Self {
            backend,
            ids: ids.into_iter(),
            predicates,
            yielded: 0,
        })
    }

    fn on_ancestry_path(&self, revision: &Revision) -> Result<bool> {
        match &self.predicates.ancestry_path {
            Some(root) if *root != revision.id => self.backend.is_ancestor(root, &revision.id),
            _ => Ok(true),
        }
    }
}

impl Iterator for RevisionWalk {
    type Item = Result<Revision>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self
                .predicates
                .max_count
                .is_some_and(|max| self.yielded >= max)
            {
                return None;
            }

            let id = self.ids.next()?;
            let revision = match self.backend.revision(&id) {
                Ok(revision) => revision,
                Err(e) => return Some(Err(e)),
            };
            if !self.predicates.accepts(&revision) {
                continue;
            }
            match self.on_ancestry_path(&revision) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }

            self.yielded += 1;
            return Some(Ok(revision));
        }
    }
}
