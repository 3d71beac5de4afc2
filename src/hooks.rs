//! Finalize-hook dispatch.
//!
//! Runs after every root of a load has been bound. Each node's
//! [`Config::post_load`] is called once, parents before their fields,
//! including optional nodes and the elements of struct-shaped sequences and
//! maps. The first error stops the dispatch.

use tracing::trace;

use crate::error::StrataError;
use crate::path::{Field, FieldPath};
use crate::walk::{Config, Fields, NodeCollection, Visitor};

struct PostLoad;

impl Visitor for PostLoad {
    fn enter(&mut self, path: &FieldPath, node: &mut dyn Config) -> Result<(), StrataError> {
        trace!(%path, "post_load");
        node.post_load().map_err(StrataError::Hook)
    }

    fn collection(
        &mut self,
        _path: &FieldPath,
        _field: &Field,
        _items: &mut dyn NodeCollection,
    ) -> Result<bool, StrataError> {
        Ok(true)
    }
}

/// Call every finalize hook of `root`, mounted under `prefix`.
pub fn post_load(naming_key: &str, prefix: FieldPath, root: &mut dyn Config) -> Result<(), StrataError> {
    Fields::walk(&mut PostLoad, naming_key, prefix, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Hooked, HookedInner, HookedOuter};

    #[test]
    fn parent_runs_before_children() {
        let mut root = Hooked::default();
        post_load("config", FieldPath::root(), &mut root).unwrap();
        assert_eq!(root.log, ["root"]);
        assert_eq!(root.child.log, ["child saw parent=true"]);
    }

    #[test]
    fn inline_node_hooks_run_once_each() {
        let mut outer = HookedOuter::default();
        post_load("config", FieldPath::root(), &mut outer).unwrap();
        assert_eq!(outer.calls, 1);
        assert_eq!(outer.inner.calls, 1);
    }

    #[test]
    fn collection_elements_are_finalized() {
        let mut root = Hooked {
            items: vec![HookedInner::default(), HookedInner::default()],
            ..Default::default()
        };
        post_load("config", FieldPath::root(), &mut root).unwrap();
        assert!(root.items.iter().all(|i| i.calls == 1));
    }

    #[test]
    fn optional_node_is_instantiated_and_finalized() {
        let mut root = Hooked::default();
        assert!(root.maybe.is_none());
        post_load("config", FieldPath::root(), &mut root).unwrap();
        assert_eq!(root.maybe.as_ref().map(|m| m.calls), Some(1));
    }

    #[test]
    fn first_error_is_returned_verbatim() {
        let mut root = Hooked {
            fail: true,
            ..Default::default()
        };
        let err = post_load("config", FieldPath::root(), &mut root).unwrap_err();
        assert_eq!(err.to_string(), "root refused");
        // the walk stopped before the children
        assert!(root.child.log.is_empty());
    }
}
