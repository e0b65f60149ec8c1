//! Vertex cache files
//!
//! A container is a JSON file that carries a definition together with one
//! vertex buffer per shape (rest first, in shape order) and the weights of
//! every map falloff. A SHA-256 digest of the payload is stored alongside and
//! checked on load. A bare container holds the definition alone.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SimplexConfig;
use crate::error::{Result, SimplexError};
use crate::interface::MemoryHost;
use crate::items::Points;
use crate::system::Simplex;

/// On-disk cache of a system and its vertex data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Serialized definition, any supported version.
    pub definition: String,

    /// One buffer per shape in shape order. Empty in a bare container.
    #[serde(default)]
    pub shapes: Vec<Points>,

    /// Map falloff weights keyed by falloff name.
    #[serde(default)]
    pub falloff_weights: BTreeMap<String, Vec<f64>>,

    pub created_at: DateTime<Utc>,

    /// Hex SHA-256 of the payload.
    pub checksum: String,
}

impl Container {
    /// Snapshot a system, pulling every shape's vertex buffer from its host.
    pub fn from_system(sx: &mut Simplex) -> Result<Self> {
        sx.pull_all_shape_vertices()?;
        let mut shapes = Vec::with_capacity(sx.shapes().len());
        for &id in sx.shapes() {
            let shape = sx.shape(id)?;
            let verts = shape.verts().ok_or_else(|| SimplexError::InvalidValue {
                field: format!("shape '{}'", shape.name()),
                reason: "no vertex data to cache".to_string(),
            })?;
            shapes.push(verts.clone());
        }

        let mut falloff_weights = BTreeMap::new();
        for &id in sx.falloffs() {
            let falloff = sx.falloff(id)?;
            if !falloff.is_map() {
                continue;
            }
            if let Some(weights) = falloff.stored_weights() {
                falloff_weights.insert(falloff.name().to_string(), weights.to_vec());
            }
        }

        Ok(Self::sealed(sx.dump()?, shapes, falloff_weights))
    }

    /// A container without vertex data.
    pub fn bare(sx: &Simplex) -> Result<Self> {
        Ok(Self::sealed(sx.dump()?, Vec::new(), BTreeMap::new()))
    }

    fn sealed(
        definition: String,
        shapes: Vec<Points>,
        falloff_weights: BTreeMap<String, Vec<f64>>,
    ) -> Self {
        let mut container = Self {
            definition,
            shapes,
            falloff_weights,
            created_at: Utc::now(),
            checksum: String::new(),
        };
        container.checksum = container.digest();
        container
    }

    pub fn is_bare(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Digest over the definition, the vertex buffers and the weights.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.definition.as_bytes());
        hasher.update((self.shapes.len() as u64).to_le_bytes());
        for verts in &self.shapes {
            hasher.update((verts.len() as u64).to_le_bytes());
            for point in verts {
                for c in point {
                    hasher.update(c.to_le_bytes());
                }
            }
        }
        for (name, weights) in &self.falloff_weights {
            hasher.update(name.as_bytes());
            hasher.update((weights.len() as u64).to_le_bytes());
            for w in weights {
                hasher.update(w.to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string(self)?;
        fs::write(path, content).map_err(|e| SimplexError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(
            "Saved {} container with {} shapes to {}",
            if self.is_bare() { "bare" } else { "full" },
            self.shapes.len(),
            path.display()
        );
        Ok(())
    }

    /// Read a container and verify its checksum.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SimplexError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let container: Container = serde_json::from_str(&content)?;
        let found = container.digest();
        if found != container.checksum {
            return Err(SimplexError::Checksum {
                path: path.to_path_buf(),
                expected: container.checksum,
                found,
            });
        }
        Ok(container)
    }

    /// Rebuild the system on an in-memory host and push the cached vertex
    /// data into it.
    pub fn into_system(self, config: SimplexConfig) -> Result<Simplex> {
        let mut sx = Simplex::from_definition_str(
            &self.definition,
            Box::new(MemoryHost::new()),
            config,
        )?;
        if self.is_bare() {
            return Ok(sx);
        }

        let shape_ids = sx.shapes().to_vec();
        if shape_ids.len() != self.shapes.len() {
            return Err(SimplexError::MalformedDefinition {
                reason: format!(
                    "container holds {} vertex buffers for {} shapes",
                    self.shapes.len(),
                    shape_ids.len()
                ),
            });
        }
        for (id, verts) in shape_ids.into_iter().zip(self.shapes) {
            sx.set_shape_vertices(id, verts)?;
        }
        for (name, weights) in self.falloff_weights {
            let id = sx.find_falloff(&name).ok_or(SimplexError::UnknownItem {
                kind: "falloff",
                name,
            })?;
            sx.set_falloff_weights(id, weights)?;
        }
        Ok(sx)
    }
}

impl Simplex {
    /// Write this system and its vertex data to a container file.
    pub fn save_container(&mut self, path: &Path) -> Result<()> {
        Container::from_system(self)?.save(path)
    }

    /// Write the definition alone to a container file.
    pub fn save_bare(&self, path: &Path) -> Result<()> {
        Container::bare(self)?.save(path)
    }

    /// Load a container file into a system on an in-memory host.
    pub fn load_container(path: &Path, config: SimplexConfig) -> Result<Self> {
        Container::load(path)?.into_system(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rig() -> Simplex {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let rest = sx.rest_shape().unwrap();
        sx.set_shape_vertices(rest, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
            .unwrap();
        let slider = sx.create_slider("Smile", None, None, 1.0).unwrap();
        let prog = sx.slider(slider).unwrap().prog();
        let shape = sx.progression(prog).unwrap().shapes()[1];
        sx.set_shape_vertices(shape, vec![[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]])
            .unwrap();
        let fo = sx.create_map_falloff("Painted", "weights", None).unwrap();
        sx.set_falloff_weights(fo, vec![0.25, 0.75]).unwrap();
        sx
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("face.smpx");
        let mut sx = rig();
        sx.save_container(&path).unwrap();

        let loaded = Simplex::load_container(&path, SimplexConfig::default()).unwrap();
        let smile = loaded.find_shape("Smile").unwrap();
        assert_eq!(
            loaded.shape(smile).unwrap().verts(),
            Some(&vec![[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]])
        );
        let fo = loaded.find_falloff("Painted").unwrap();
        assert_eq!(
            loaded.falloff(fo).unwrap().stored_weights(),
            Some(&[0.25, 0.75][..])
        );
    }

    #[test]
    fn test_bare_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("face.smpx");
        rig().save_bare(&path).unwrap();

        let container = Container::load(&path).unwrap();
        assert!(container.is_bare());
        let loaded = container.into_system(SimplexConfig::default()).unwrap();
        assert!(loaded.find_slider("Smile").is_some());
    }

    #[test]
    fn test_tampered_file_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("face.smpx");
        let mut container = Container::from_system(&mut rig()).unwrap();
        container.shapes[1][0][1] = 5.0;
        container.save(&path).unwrap();

        let err = Container::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "CHECKSUM");
    }

    #[test]
    fn test_missing_vertex_data() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        sx.create_slider("Smile", None, None, 1.0).unwrap();
        let err = Container::from_system(&mut sx).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VALUE");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Container::load(&dir.path().join("nope.smpx")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_READ");
    }
}
