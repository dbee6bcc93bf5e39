use std::convert::Infallible;
use std::sync::Arc;

use agentdesk_utils::Result;
use arc_swap::{ArcSwap, Guard};

use super::PaneTree;

/// Current layout, replaced whole on every change
#[derive(Debug, Clone, Default)]
pub struct SharedLayout {
    inner: Arc<ArcSwap<PaneTree>>,
}

impl SharedLayout {
    pub fn new(tree: PaneTree) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(tree)),
        }
    }

    pub fn load(&self) -> Arc<PaneTree> {
        self.inner.load_full()
    }

    /// Replace the tree with `f(current)`
    pub fn update(&self, mut f: impl FnMut(&PaneTree) -> PaneTree) -> Arc<PaneTree> {
        match self.swap_with(|tree| Ok::<_, Infallible>(f(tree))) {
            Ok(tree) => tree,
            Err(never) => match never {},
        }
    }

    /// Replace the tree with `f(current)` unless `f` fails
    pub fn try_update(
        &self,
        f: impl FnMut(&PaneTree) -> Result<PaneTree>,
    ) -> Result<Arc<PaneTree>> {
        self.swap_with(f)
    }

    fn swap_with<E>(
        &self,
        mut f: impl FnMut(&PaneTree) -> std::result::Result<PaneTree, E>,
    ) -> std::result::Result<Arc<PaneTree>, E> {
        let mut current = self.inner.load_full();
        loop {
            let next = Arc::new(f(&current)?);
            let previous = self.inner.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&*previous, &current) {
                return Ok(next);
            }
            current = Guard::into_inner(previous);
        }
    }
}
