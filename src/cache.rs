//! Name lookup cache owned by a graph.
//!
//! Registry mappings are append-only: a name never changes id and an id never
//! changes name. A cached entry therefore stays valid for the lifetime of the
//! graph; the cache is only ever populated on a miss and never invalidated.
//! Misses that the registry also cannot answer are not cached, since the name
//! may be registered later.
//!
//! Lookups happen behind `&self` (lazy views resolve names while the graph is
//! shared), so the maps sit in `RefCell`s. Graphs are single-threaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::id::NodeId;

#[derive(Debug, Default)]
pub struct NameCache {
    ids: RefCell<HashMap<Rc<str>, NodeId>>,
    names: RefCell<HashMap<NodeId, Rc<str>>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, asking `miss` only when it is not cached yet.
    pub fn node_id<F>(&self, name: &str, miss: F) -> Result<Option<NodeId>>
    where
        F: FnOnce(&str) -> Result<Option<NodeId>>,
    {
        if let Some(&id) = self.ids.borrow().get(name) {
            return Ok(Some(id));
        }
        let found = miss(name)?;
        if let Some(id) = found {
            self.insert(name, id);
        }
        Ok(found)
    }

    /// Name for `id`, asking `miss` only when it is not cached yet.
    pub fn node_name<F>(&self, id: NodeId, miss: F) -> Result<Option<Rc<str>>>
    where
        F: FnOnce(NodeId) -> Result<Option<String>>,
    {
        if let Some(name) = self.names.borrow().get(&id) {
            return Ok(Some(Rc::clone(name)));
        }
        Ok(miss(id)?.map(|name| self.insert(&name, id)))
    }

    /// Record a known mapping (after an upsert) in both directions.
    pub fn insert(&self, name: &str, id: NodeId) -> Rc<str> {
        let name: Rc<str> = Rc::from(name);
        self.ids.borrow_mut().insert(Rc::clone(&name), id);
        self.names.borrow_mut().insert(id, Rc::clone(&name));
        name
    }

    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_populates_on_miss_only() {
        let cache = NameCache::new();
        let calls = Cell::new(0);
        let lookup = |_: &str| -> Result<Option<NodeId>> {
            calls.set(calls.get() + 1);
            Ok(Some(NodeId(4)))
        };

        assert_eq!(cache.node_id("bob", lookup).unwrap(), Some(NodeId(4)));
        assert_eq!(cache.node_id("bob", lookup).unwrap(), Some(NodeId(4)));
        assert_eq!(calls.get(), 1);

        // Populated in both directions
        let name = cache.node_name(NodeId(4), |_| panic!("should be cached")).unwrap();
        assert_eq!(name.as_deref(), Some("bob"));
    }

    #[test]
    fn test_misses_are_not_cached() {
        let cache = NameCache::new();
        assert_eq!(cache.node_id("ghost", |_| Ok(None)).unwrap(), None);
        assert_eq!(
            cache.node_id("ghost", |_| Ok(Some(NodeId(1)))).unwrap(),
            Some(NodeId(1))
        );
        assert_eq!(cache.len(), 1);
    }
}
