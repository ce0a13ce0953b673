//! Scene module - Interfaces to the simulation and rendering collaborators.
//!
//! Recording reads the live scene through [`SceneProvider`]; playback pushes
//! its reconstructed instance table through [`RenderBackend`]. [`SceneGraph`]
//! and [`RenderScene`] are in-memory implementations of both sides.

mod graph;
mod render;

use std::fmt;

use crate::schema::{AssetInfo, Creation, RenderInstanceId, Transform, Vec3};

pub use graph::*;
pub use render::*;

/// Stable reference to a node of the simulated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

/// Snapshot of one render instance as seen by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveInstance {
    pub instance: RenderInstanceId,
    pub asset: AssetInfo,
    pub transform: Transform,
    pub scale: Option<Vec3>,
    pub semantic_id: Option<u32>,
    pub light_setup_key: Option<String>,
}

/// Simulation-side view the recorder reads each tick.
pub trait SceneProvider {
    /// Enumerate every live render instance.
    fn live_instances(&self) -> Vec<LiveInstance>;

    /// Current transform of `node`, or `None` if it does not exist.
    fn node_transform(&self, node: NodeId) -> Option<Transform>;
}

/// Tag separating the instances of different players in one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LayerId(pub u32);

/// Backend-side key of a replayed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub layer: LayerId,
    pub instance: RenderInstanceId,
}

/// Pose and per-frame visual state pushed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstancePose {
    pub transform: Transform,
    pub semantic_id: Option<u32>,
}

/// Failure reported by a rendering collaborator.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Resolves asset references to loadable render resources.
pub trait AssetResolver {
    fn resolve(&mut self, asset: &AssetInfo) -> Result<(), BackendError>;
}

/// Rendering collaborator the player pushes reconstructed state into.
pub trait RenderBackend: AssetResolver {
    /// Create a renderable object. The asset has already been resolved.
    fn instantiate(
        &mut self,
        key: InstanceKey,
        creation: &Creation,
        pose: &InstancePose,
    ) -> Result<(), BackendError>;

    /// Move an existing renderable object.
    fn reposition(&mut self, key: InstanceKey, pose: &InstancePose);

    /// Remove a renderable object.
    fn destroy(&mut self, key: InstanceKey);
}
