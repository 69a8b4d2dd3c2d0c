//! Identity registry: names ↔ dense ids, and the edge id counter
//!
//! Every graph resolves node and relation names through an
//! [`IdentityRegistry`]. The registry is append-only: a name, once given an
//! id, keeps it forever, and edge ids are drawn from one monotonically
//! increasing counter for the whole graph. [`crate::cache::NameCache`]
//! relies on that to cache lookups without invalidation.
//!
//! [`MemoryRegistry`] is the in-process implementation. It can persist to a
//! single file as an rkyv archive, validated in place over a memory map on
//! load.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use memmap2::Mmap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{check_archived_root, Archive, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::id::{EdgeId, NodeId, NumericId, RelId};
use crate::relation::{Mode, RelationDescriptor};
use crate::weight::WeightType;

/// Node property bag
pub type Attrs = Map<String, Value>;

/// The registry contract a [`crate::Graph`] consumes.
///
/// All calls are blocking. Implementations backed by an external store
/// report failures through `Err`; the in-memory one never fails.
pub trait IdentityRegistry {
    /// Get or create the id for `name`. Idempotent.
    fn upsert_node(&mut self, name: &str) -> Result<NodeId>;

    fn get_node_id(&self, name: &str) -> Result<Option<NodeId>>;

    fn get_node_name(&self, id: NodeId) -> Result<Option<String>>;

    /// Merge `attrs` into the node's property bag.
    fn set_node_attrs(&mut self, id: NodeId, attrs: Attrs) -> Result<()>;

    fn get_node_attrs(&self, id: NodeId) -> Result<Option<Attrs>>;

    /// Get or create the id for relation `name`. Idempotent; the descriptor
    /// recorded at first registration is kept.
    fn upsert_relation(&mut self, name: &str, descriptor: RelationDescriptor) -> Result<RelId>;

    /// Every registered relation, in registration order
    fn relations(&self) -> Result<Vec<(RelId, String, RelationDescriptor)>>;

    /// Allocate a fresh, never reused edge id.
    fn new_edge_id(&mut self) -> Result<EdgeId>;

    /// The id the next `new_edge_id` call will hand out. Every id below it
    /// has been allocated.
    fn peek_edge_id(&self) -> Result<EdgeId>;
}

// ============================================================================
// PERSISTED FORM
// ============================================================================

#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
struct RelationEntry {
    name: String,
    weight_type: u8,
    incidence: bool,
}

#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
struct AttrsEntry {
    node: u64,
    /// JSON object text
    attrs: String,
}

/// Serializable form of the registry
#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
struct RegistryData {
    nodes: Vec<String>,
    relations: Vec<RelationEntry>,
    attrs: Vec<AttrsEntry>,
    next_edge: u64,
}

// ============================================================================
// MEMORY REGISTRY
// ============================================================================

/// Append-only in-process registry.
///
/// Node and relation ids are insertion indices into `IndexSet`/`IndexMap`,
/// so `id → name` is a direct index and `name → id` a hash lookup.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    nodes: IndexSet<String>,
    relations: IndexMap<String, RelationDescriptor>,
    attrs: HashMap<NodeId, Attrs>,
    next_edge: u64,
    /// Persistence path
    path: Option<PathBuf>,
    /// Whether there are unsaved changes
    dirty: bool,
}

impl MemoryRegistry {
    /// Create a new empty registry (in-memory only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty registry with a persistence path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            nodes: IndexSet::new(),
            relations: IndexMap::new(),
            attrs: HashMap::new(),
            next_edge: 0,
            path: Some(path.into()),
            dirty: false,
        }
    }

    /// Load a registry from disk, or create an empty one if the file doesn't exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self::with_path(path));
        }

        let file = File::open(&path)
            .map_err(|e| GraphError::registry(format!("failed to open registry: {}", e)))?;

        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| GraphError::registry(format!("failed to mmap registry: {}", e)))?;

        if mmap.is_empty() {
            return Ok(Self::with_path(path));
        }

        let archived = check_archived_root::<RegistryData>(&mmap)
            .map_err(|e| GraphError::registry(format!("failed to validate registry: {}", e)))?;

        let data: RegistryData = archived
            .deserialize(&mut rkyv::Infallible)
            .map_err(|_| GraphError::registry("failed to deserialize registry"))?;

        let mut registry = Self::with_path(path);
        registry.nodes = data.nodes.into_iter().collect();
        for entry in data.relations {
            let weight_type = WeightType::from_code(entry.weight_type).ok_or_else(|| {
                GraphError::registry(format!(
                    "relation {} has unknown weight type code {}",
                    entry.name, entry.weight_type
                ))
            })?;
            let mode = if entry.incidence {
                Mode::Incidence
            } else {
                Mode::Adjacency
            };
            registry
                .relations
                .insert(entry.name, RelationDescriptor { weight_type, mode });
        }
        for entry in data.attrs {
            let attrs: Attrs = serde_json::from_str(&entry.attrs)?;
            registry.attrs.insert(NodeId(entry.node), attrs);
        }
        registry.next_edge = data.next_edge;

        debug!(
            path = %registry.path_display(),
            nodes = registry.nodes.len(),
            relations = registry.relations.len(),
            "loaded registry"
        );
        Ok(registry)
    }

    /// Save the registry to disk
    pub fn save(&mut self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| GraphError::registry("registry has no persistence path"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut attrs = Vec::with_capacity(self.attrs.len());
        for (node, bag) in &self.attrs {
            attrs.push(AttrsEntry {
                node: node.index(),
                attrs: serde_json::to_string(bag)?,
            });
        }
        attrs.sort_by_key(|entry| entry.node);

        let data = RegistryData {
            nodes: self.nodes.iter().cloned().collect(),
            relations: self
                .relations
                .iter()
                .map(|(name, desc)| RelationEntry {
                    name: name.clone(),
                    weight_type: desc.weight_type.code(),
                    incidence: desc.mode == Mode::Incidence,
                })
                .collect(),
            attrs,
            next_edge: self.next_edge,
        };

        let mut serializer = AllocSerializer::<4096>::default();
        serializer
            .serialize_value(&data)
            .map_err(|e| GraphError::registry(format!("failed to serialize registry: {}", e)))?;
        let bytes = serializer.into_serializer().into_inner();

        // Write to a temp file then rename over the target
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;

        debug!(path = %path.display(), nodes = self.nodes.len(), "saved registry");
        self.dirty = false;
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn path_display(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

impl IdentityRegistry for MemoryRegistry {
    fn upsert_node(&mut self, name: &str) -> Result<NodeId> {
        if let Some(idx) = self.nodes.get_index_of(name) {
            return Ok(NodeId::from_usize(idx));
        }
        let (idx, _) = self.nodes.insert_full(name.to_string());
        self.dirty = true;
        Ok(NodeId::from_usize(idx))
    }

    fn get_node_id(&self, name: &str) -> Result<Option<NodeId>> {
        Ok(self.nodes.get_index_of(name).map(NodeId::from_usize))
    }

    fn get_node_name(&self, id: NodeId) -> Result<Option<String>> {
        Ok(usize::try_from(id.index())
            .ok()
            .and_then(|idx| self.nodes.get_index(idx))
            .cloned())
    }

    fn set_node_attrs(&mut self, id: NodeId, attrs: Attrs) -> Result<()> {
        if self.get_node_name(id)?.is_none() {
            return Err(GraphError::MissingNodeId(id));
        }
        if attrs.is_empty() {
            return Ok(());
        }
        self.attrs.entry(id).or_default().extend(attrs);
        self.dirty = true;
        Ok(())
    }

    fn get_node_attrs(&self, id: NodeId) -> Result<Option<Attrs>> {
        Ok(self.attrs.get(&id).cloned())
    }

    fn upsert_relation(&mut self, name: &str, descriptor: RelationDescriptor) -> Result<RelId> {
        if let Some(idx) = self.relations.get_index_of(name) {
            return Ok(RelId::from_usize(idx));
        }
        let (idx, _) = self.relations.insert_full(name.to_string(), descriptor);
        self.dirty = true;
        Ok(RelId::from_usize(idx))
    }

    fn relations(&self) -> Result<Vec<(RelId, String, RelationDescriptor)>> {
        Ok(self
            .relations
            .iter()
            .enumerate()
            .map(|(idx, (name, desc))| (RelId::from_usize(idx), name.clone(), *desc))
            .collect())
    }

    fn new_edge_id(&mut self) -> Result<EdgeId> {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.dirty = true;
        Ok(id)
    }

    fn peek_edge_id(&self) -> Result<EdgeId> {
        Ok(EdgeId(self.next_edge))
    }
}

impl Drop for MemoryRegistry {
    fn drop(&mut self) {
        // Flush unsaved changes
        if self.dirty && self.path.is_some() {
            if let Err(e) = self.save() {
                warn!(error = %e, "failed to save registry on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_is_idempotent() {
        let mut registry = MemoryRegistry::new();
        let bob = registry.upsert_node("bob").unwrap();
        let alice = registry.upsert_node("alice").unwrap();
        assert_ne!(bob, alice);
        assert_eq!(registry.upsert_node("bob").unwrap(), bob);
        assert_eq!(registry.node_count(), 2);
        assert_eq!(registry.get_node_name(alice).unwrap().as_deref(), Some("alice"));
        assert_eq!(registry.get_node_name(NodeId(99)).unwrap(), None);
    }

    #[test]
    fn test_edge_ids_are_monotonic() {
        let mut registry = MemoryRegistry::new();
        let a = registry.new_edge_id().unwrap();
        let b = registry.new_edge_id().unwrap();
        assert!(b > a);
        assert_eq!(registry.peek_edge_id().unwrap(), EdgeId(b.0 + 1));
    }

    #[test]
    fn test_attrs_merge() {
        let mut registry = MemoryRegistry::new();
        let jane = registry.upsert_node("jane").unwrap();

        let mut first = Attrs::new();
        first.insert("favorite_color".into(), Value::from("blue"));
        registry.set_node_attrs(jane, first).unwrap();

        let mut second = Attrs::new();
        second.insert("age".into(), Value::from(41));
        registry.set_node_attrs(jane, second).unwrap();

        let attrs = registry.get_node_attrs(jane).unwrap().unwrap();
        assert_eq!(attrs.get("favorite_color"), Some(&Value::from("blue")));
        assert_eq!(attrs.get("age"), Some(&Value::from(41)));

        assert!(registry.set_node_attrs(NodeId(7), Attrs::new()).is_err());
    }
}
