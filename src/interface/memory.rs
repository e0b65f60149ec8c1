//! In-memory host adapter.
//!
//! Used for headless tooling, for tests, and as the host of every split
//! result. Nodes are keyed by uuid; the uuid string is the persisted handle.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;
use uuid::Uuid;

use crate::error::{Result, SimplexError};
use crate::interface::{HostAdapter, HostHandle};
use crate::items::{FalloffKind, Points};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Shape,
    Slider,
    Mesh,
}

/// One host object.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub name: String,
    pub verts: Option<Points>,
    pub range: (f64, f64),
    pub weight: f64,
}

impl Node {
    fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            verts: None,
            range: (0.0, 1.0),
            weight: 0.0,
        }
    }
}

/// A host that lives entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    system: Option<String>,
    nodes: HashMap<Uuid, Node>,
    rest: Option<Uuid>,
    falloffs: BTreeMap<String, FalloffKind>,
    prog_falloffs: BTreeSet<(String, String)>,
    revision: u64,
    definition: Option<String>,
    undo_opened: usize,
    undo_closed: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name passed to the last `load_nodes` or `rename_system`.
    pub fn system_name(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn node(&self, handle: &HostHandle) -> Option<&Node> {
        self.nodes.get(&Self::key(handle).ok()?)
    }

    /// All nodes of one kind, sorted by name.
    pub fn names(&self, kind: NodeKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| n.kind == kind)
            .map(|n| n.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn falloff(&self, name: &str) -> Option<&FalloffKind> {
        self.falloffs.get(name)
    }

    pub fn prog_has_falloff(&self, prog: &str, falloff: &str) -> bool {
        self.prog_falloffs
            .contains(&(prog.to_string(), falloff.to_string()))
    }

    /// How many undo brackets were opened and closed.
    pub fn undo_brackets(&self) -> (usize, usize) {
        (self.undo_opened, self.undo_closed)
    }

    fn key(handle: &HostHandle) -> Result<Uuid> {
        Uuid::parse_str(handle.as_str()).map_err(|e| SimplexError::Host {
            reason: format!("'{}' is not a memory host handle: {}", handle, e),
        })
    }

    fn node_mut(&mut self, handle: &HostHandle) -> Result<&mut Node> {
        let key = Self::key(handle)?;
        self.nodes.get_mut(&key).ok_or_else(|| SimplexError::Host {
            reason: format!("no node for handle {}", handle),
        })
    }

    fn add_node(&mut self, node: Node) -> HostHandle {
        let id = Uuid::new_v4();
        self.nodes.insert(id, node);
        HostHandle::new(id.to_string())
    }

    fn find(&self, kind: NodeKind, name: &str) -> Option<HostHandle> {
        self.nodes
            .iter()
            .find(|(_, n)| n.kind == kind && n.name == name)
            .map(|(id, _)| HostHandle::new(id.to_string()))
    }
}

impl HostAdapter for MemoryHost {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn increment_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    fn load_nodes(&mut self, system: &str, create: bool) -> Result<()> {
        match &self.system {
            Some(existing) if existing != system && !create => {
                Err(SimplexError::MissingHostObject {
                    kind: "system",
                    name: system.to_string(),
                })
            }
            _ => {
                self.system = Some(system.to_string());
                Ok(())
            }
        }
    }

    fn rename_system(&mut self, name: &str) -> Result<()> {
        self.system = Some(name.to_string());
        Ok(())
    }

    fn create_shape(&mut self, name: &str, is_rest: bool) -> Result<HostHandle> {
        let handle = self.add_node(Node::new(NodeKind::Shape, name));
        if is_rest {
            self.rest = Some(Self::key(&handle)?);
        }
        Ok(handle)
    }

    fn find_shape(&self, name: &str) -> Option<HostHandle> {
        self.find(NodeKind::Shape, name)
    }

    fn shape_vertices(&mut self, shape: &HostHandle) -> Result<Option<Points>> {
        Ok(self.node_mut(shape)?.verts.clone())
    }

    fn push_shape_vertices(&mut self, shape: &HostHandle, verts: &Points) -> Result<()> {
        self.node_mut(shape)?.verts = Some(verts.clone());
        Ok(())
    }

    fn zero_shape(&mut self, shape: &HostHandle) -> Result<()> {
        let rest = self.rest.and_then(|r| self.nodes.get(&r)).and_then(|n| n.verts.clone());
        self.node_mut(shape)?.verts = rest;
        Ok(())
    }

    fn delete_shape(&mut self, shape: &HostHandle) -> Result<()> {
        let key = Self::key(shape)?;
        self.nodes.remove(&key);
        Ok(())
    }

    fn rename_shape(&mut self, shape: &HostHandle, name: &str) -> Result<()> {
        self.node_mut(shape)?.name = name.to_string();
        Ok(())
    }

    fn extract_shape(
        &mut self,
        shape: &HostHandle,
        _live: bool,
        offset: f64,
    ) -> Result<Option<HostHandle>> {
        let node = self.node_mut(shape)?;
        let name = format!("{}_Extract", node.name);
        let verts = node.verts.clone().map(|mut verts| {
            for v in verts.iter_mut() {
                v[0] += offset;
            }
            verts
        });
        let mut mesh = Node::new(NodeKind::Mesh, &name);
        mesh.verts = verts;
        Ok(Some(self.add_node(mesh)))
    }

    fn connect_shape(
        &mut self,
        shape: &HostHandle,
        mesh: Option<&HostHandle>,
        _live: bool,
        delete: bool,
    ) -> Result<()> {
        let mesh = match mesh {
            Some(mesh) => mesh.clone(),
            None => {
                let name = format!("{}_Extract", self.node_mut(shape)?.name);
                match self.find(NodeKind::Mesh, &name) {
                    Some(found) => found,
                    None => {
                        debug!("No mesh named '{}' to connect", name);
                        return Ok(());
                    }
                }
            }
        };
        let verts = self.node_mut(&mesh)?.verts.clone();
        self.node_mut(shape)?.verts = verts;
        if delete {
            self.nodes.remove(&Self::key(&mesh)?);
        }
        Ok(())
    }

    fn create_slider(&mut self, name: &str) -> Result<HostHandle> {
        Ok(self.add_node(Node::new(NodeKind::Slider, name)))
    }

    fn find_slider(&self, name: &str) -> Option<HostHandle> {
        self.find(NodeKind::Slider, name)
    }

    fn rename_slider(&mut self, slider: &HostHandle, name: &str) -> Result<()> {
        self.node_mut(slider)?.name = name.to_string();
        Ok(())
    }

    fn delete_slider(&mut self, slider: &HostHandle) -> Result<()> {
        let key = Self::key(slider)?;
        self.nodes.remove(&key);
        Ok(())
    }

    fn set_slider_range(&mut self, slider: &HostHandle, min: f64, max: f64) -> Result<()> {
        self.node_mut(slider)?.range = (min, max);
        Ok(())
    }

    fn set_slider_weight(&mut self, slider: &HostHandle, weight: f64) -> Result<()> {
        self.node_mut(slider)?.weight = weight;
        Ok(())
    }

    fn create_falloff(&mut self, name: &str, kind: &FalloffKind) -> Result<()> {
        self.falloffs.insert(name.to_string(), kind.clone());
        Ok(())
    }

    fn has_falloff(&self, name: &str) -> bool {
        self.falloffs.contains_key(name)
    }

    fn rename_falloff(&mut self, old: &str, new: &str) -> Result<()> {
        if let Some(kind) = self.falloffs.remove(old) {
            self.falloffs.insert(new.to_string(), kind);
        }
        self.prog_falloffs = std::mem::take(&mut self.prog_falloffs)
            .into_iter()
            .map(|(p, f)| if f == old { (p, new.to_string()) } else { (p, f) })
            .collect();
        Ok(())
    }

    fn set_falloff_data(&mut self, name: &str, kind: &FalloffKind) -> Result<()> {
        self.falloffs.insert(name.to_string(), kind.clone());
        Ok(())
    }

    fn delete_falloff(&mut self, name: &str) -> Result<()> {
        self.falloffs.remove(name);
        self.prog_falloffs.retain(|(_, f)| f != name);
        Ok(())
    }

    fn add_prog_falloff(&mut self, prog: &str, falloff: &str) -> Result<()> {
        self.prog_falloffs
            .insert((prog.to_string(), falloff.to_string()));
        Ok(())
    }

    fn remove_prog_falloff(&mut self, prog: &str, falloff: &str) -> Result<()> {
        self.prog_falloffs
            .remove(&(prog.to_string(), falloff.to_string()));
        Ok(())
    }

    fn persistent_name(&self, handle: &HostHandle) -> Option<String> {
        self.node(handle).map(|n| n.name.clone())
    }

    fn handle_for_name(&self, name: &str) -> Option<HostHandle> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| HostHandle::new(id.to_string()))
    }

    fn definition_string(&self) -> Option<String> {
        self.definition.clone()
    }

    fn set_definition_string(&mut self, definition: &str) -> Result<()> {
        self.definition = Some(definition.to_string());
        Ok(())
    }

    fn undo_open(&mut self) {
        self.undo_opened += 1;
    }

    fn undo_close(&mut self) {
        self.undo_closed += 1;
    }
}
