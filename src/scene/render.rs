//! In-memory render backend used as a playback target.

use std::collections::{BTreeMap, BTreeSet};

use super::{AssetResolver, BackendError, InstanceKey, InstancePose, LayerId, RenderBackend};
use crate::schema::{AssetInfo, Creation, Transform, Vec3};

/// An instance currently present in a [`RenderScene`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedInstance {
    pub asset: String,
    pub transform: Transform,
    pub scale: Option<Vec3>,
    pub semantic_id: Option<u32>,
}

/// Count of backend operations received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub instantiated: u64,
    pub repositioned: u64,
    pub destroyed: u64,
}

/// Render backend that keeps the pushed scene in memory.
///
/// Several players can share one `RenderScene`; their instances are kept
/// apart by [`LayerId`].
#[derive(Debug, Default)]
pub struct RenderScene {
    instances: BTreeMap<InstanceKey, RenderedInstance>,
    assets: BTreeSet<String>,
    /// Asset paths that fail to resolve.
    unavailable: BTreeSet<String>,
    stats: RenderStats,
}

impl RenderScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make resolution of `filepath` fail.
    pub fn with_unavailable_asset(mut self, filepath: impl Into<String>) -> Self {
        self.unavailable.insert(filepath.into());
        self
    }

    pub fn get(&self, key: InstanceKey) -> Option<&RenderedInstance> {
        self.instances.get(&key)
    }

    pub fn instances(&self) -> impl Iterator<Item = (&InstanceKey, &RenderedInstance)> {
        self.instances.iter()
    }

    /// Number of instances in all layers.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of instances pushed by one layer.
    pub fn layer_len(&self, layer: LayerId) -> usize {
        self.instances.keys().filter(|k| k.layer == layer).count()
    }

    pub fn is_asset_loaded(&self, filepath: &str) -> bool {
        self.assets.contains(filepath)
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}

impl AssetResolver for RenderScene {
    fn resolve(&mut self, asset: &AssetInfo) -> Result<(), BackendError> {
        if self.unavailable.contains(&asset.filepath) {
            return Err(BackendError::new(format!(
                "Asset not found: {}",
                asset.filepath
            )));
        }
        self.assets.insert(asset.filepath.clone());
        Ok(())
    }
}

impl RenderBackend for RenderScene {
    fn instantiate(
        &mut self,
        key: InstanceKey,
        creation: &Creation,
        pose: &InstancePose,
    ) -> Result<(), BackendError> {
        if !self.assets.contains(&creation.asset) {
            return Err(BackendError::new(format!(
                "Asset {} was not resolved before instantiation",
                creation.asset
            )));
        }
        self.instances.insert(
            key,
            RenderedInstance {
                asset: creation.asset.clone(),
                transform: pose.transform,
                scale: creation.scale,
                semantic_id: pose.semantic_id,
            },
        );
        self.stats.instantiated += 1;
        Ok(())
    }

    fn reposition(&mut self, key: InstanceKey, pose: &InstancePose) {
        match self.instances.get_mut(&key) {
            Some(instance) => {
                instance.transform = pose.transform;
                instance.semantic_id = pose.semantic_id;
                self.stats.repositioned += 1;
            }
            None => log::warn!("Reposition of unknown {:?}", key),
        }
    }

    fn destroy(&mut self, key: InstanceKey) {
        if self.instances.remove(&key).is_some() {
            self.stats.destroyed += 1;
        } else {
            log::warn!("Destroy of unknown {:?}", key);
        }
    }
}
