//! Blendshape targets.

use std::collections::BTreeSet;

use log::warn;

use crate::error::Result;
use crate::interface::HostHandle;
use crate::items::{Axis, Color, ItemId, ShapeId};
use crate::observer::ItemRef;
use crate::system::Simplex;

/// A single vertex position.
pub type Point = [f64; 3];

/// A full vertex buffer, one point per mesh vertex.
pub type Points = Vec<Point>;

/// One blendshape target.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub(crate) name: String,
    pub(crate) is_rest: bool,
    pub(crate) color: Color,
    /// Weak host-side reference. Never owned; resolved through the host.
    pub(crate) handle: Option<HostHandle>,
    /// Vertex buffer, pulled from the host on first use.
    pub(crate) verts: Option<Points>,
    pub(crate) split_applied: BTreeSet<Axis>,
}

impl Shape {
    pub(crate) fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            is_rest: false,
            color,
            handle: None,
            verts: None,
            split_applied: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_rest(&self) -> bool {
        self.is_rest
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn handle(&self) -> Option<&HostHandle> {
        self.handle.as_ref()
    }

    /// The cached vertex buffer, if it has been pulled or assigned.
    pub fn verts(&self) -> Option<&Points> {
        self.verts.as_ref()
    }

    /// The name without a trailing numeric field (`Smile_50` -> `Smile`).
    pub fn stripped_name(&self) -> String {
        let mut parts: Vec<&str> = self.name.split('_').collect();
        if parts.last().is_some_and(|last| is_number_field(last)) {
            parts.pop();
        }
        parts.join("_")
    }
}

/// A name field like `50` or `n25`.
pub fn is_number_field(value: &str) -> bool {
    let digits = value
        .strip_prefix('n')
        .or_else(|| value.strip_prefix('N'))
        .unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

impl Simplex {
    /// Rename a shape on the graph and on the host.
    pub fn rename_shape(&mut self, id: ShapeId, name: &str) -> Result<()> {
        self.transact(|sx| {
            let shape = sx.graph.shapes.require(id)?;
            if shape.name == name {
                return Ok(());
            }
            if let Some(handle) = shape.handle.clone() {
                sx.host.rename_shape(&handle, name)?;
            }
            sx.graph.shapes[id].name = name.to_string();
            sx.observers.data_changed(ItemRef::Item(ItemId::Shape(id)));
            Ok(())
        })
    }

    pub fn set_shape_color(&mut self, id: ShapeId, color: Color) -> Result<()> {
        self.transact(|sx| {
            sx.graph.shapes.require_mut(id)?.color = color;
            sx.observers.data_changed(ItemRef::Item(ItemId::Shape(id)));
            Ok(())
        })
    }

    /// Vertex buffer of a shape, pulled from the host and cached on first use.
    pub fn shape_vertices(&mut self, id: ShapeId) -> Result<Option<&Points>> {
        let shape = self.graph.shapes.require(id)?;
        if shape.verts.is_none() {
            if let Some(handle) = shape.handle.clone() {
                let pulled = self.host.shape_vertices(&handle)?;
                self.graph.shapes[id].verts = pulled;
            }
        }
        Ok(self.graph.shapes[id].verts.as_ref())
    }

    /// Pull every shape's vertex buffer into the cache.
    pub fn pull_all_shape_vertices(&mut self) -> Result<()> {
        for id in self.graph.shape_list.clone() {
            if self.shape_vertices(id)?.is_none() {
                warn!("Shape '{}' has no vertex data", self.graph.shapes[id].name);
            }
        }
        Ok(())
    }

    /// Replace a shape's vertex buffer and push it to the host.
    pub fn set_shape_vertices(&mut self, id: ShapeId, verts: Points) -> Result<()> {
        let shape = self.graph.shapes.require_mut(id)?;
        shape.verts = Some(verts);
        if let (Some(handle), Some(verts)) = (shape.handle.clone(), shape.verts.as_ref()) {
            self.host.push_shape_vertices(&handle, verts)?;
        }
        Ok(())
    }

    /// Push every cached vertex buffer to the host.
    pub fn push_all_shape_vertices(&mut self) -> Result<()> {
        for &id in &self.graph.shape_list {
            let shape = &self.graph.shapes[id];
            if let (Some(handle), Some(verts)) = (&shape.handle, &shape.verts) {
                self.host.push_shape_vertices(handle, verts)?;
            }
        }
        Ok(())
    }

    /// Reset a shape to the rest pose on the host.
    pub fn zero_shape(&mut self, id: ShapeId) -> Result<()> {
        let shape = self.graph.shapes.require(id)?;
        if shape.is_rest {
            return Ok(());
        }
        if let Some(handle) = shape.handle.clone() {
            self.host.zero_shape(&handle)?;
        }
        self.graph.shapes[id].verts = None;
        Ok(())
    }

    /// Extract a shape to a standalone host mesh.
    pub fn extract_shape(&mut self, id: ShapeId, live: bool, offset: f64) -> Result<Option<HostHandle>> {
        match self.graph.shapes.require(id)?.handle.clone() {
            Some(handle) => self.host.extract_shape(&handle, live, offset),
            None => Ok(None),
        }
    }

    /// Extract the rest shape, if the system has one.
    pub fn extract_rest_shape(&mut self, offset: f64) -> Result<Option<HostHandle>> {
        match self.graph.rest_shape {
            Some(rest) => self.extract_shape(rest, false, offset),
            None => Ok(None),
        }
    }

    /// Connect a host mesh back into a shape. The shape's cached vertices
    /// are dropped so the next read pulls the connected result.
    pub fn connect_shape(
        &mut self,
        id: ShapeId,
        mesh: Option<&HostHandle>,
        live: bool,
        delete: bool,
    ) -> Result<()> {
        if let Some(handle) = self.graph.shapes.require(id)?.handle.clone() {
            self.host.connect_shape(&handle, mesh, live, delete)?;
        }
        self.graph.shapes[id].verts = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripped_name() {
        assert_eq!(Shape::new("Smile_50", Color::GREY).stripped_name(), "Smile");
        assert_eq!(Shape::new("Smile_n25", Color::GREY).stripped_name(), "Smile");
        assert_eq!(Shape::new("Smile_X_", Color::GREY).stripped_name(), "Smile_X_");
    }

    #[test]
    fn test_number_field() {
        assert!(is_number_field("100"));
        assert!(is_number_field("n50"));
        assert!(!is_number_field("n"));
        assert!(!is_number_field("X"));
        assert!(!is_number_field(""));
    }
}
