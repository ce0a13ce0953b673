//! Node transform lookup and pending user transforms.

use crate::replay::{Reference, ReplayError, Result};
use crate::scene::{NodeId, SceneProvider};
use crate::schema::{Transform, UserTransform};

/// Resolves node transforms and collects named user transforms until the
/// next keyframe is built.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    /// Pending user transforms in first-set order, one per name.
    pending: Vec<UserTransform>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current transform of a scene node.
    pub fn get_current_transform<S: SceneProvider + ?Sized>(
        &self,
        scene: &S,
        node: NodeId,
    ) -> Result<Transform> {
        scene
            .node_transform(node)
            .map(normalize)
            .ok_or(ReplayError::InvalidReference(Reference::Node(node)))
    }

    /// Set a named transform for the next keyframe. Later calls with the
    /// same name overwrite earlier ones.
    ///
    /// Non-finite transforms are rejected and leave the pending set as is.
    pub fn set_user_transform(&mut self, name: impl Into<String>, transform: Transform) -> Result<()> {
        let name = name.into();
        if !transform.is_finite() {
            return Err(ReplayError::NonFinite {
                what: format!("user transform `{name}`"),
            });
        }
        let transform = normalize(transform);
        match self.pending.iter_mut().find(|u| u.name == name) {
            Some(existing) => existing.transform = transform,
            None => self.pending.push(UserTransform { name, transform }),
        }
        Ok(())
    }

    /// Snapshot the current transform of `node` under `name`.
    pub fn set_node_user_transform<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        name: impl Into<String>,
        node: NodeId,
    ) -> Result<()> {
        let transform = self.get_current_transform(scene, node)?;
        self.set_user_transform(name, transform)
    }

    pub fn pending(&self) -> &[UserTransform] {
        &self.pending
    }

    /// Drain the pending user transforms.
    pub fn take_pending(&mut self) -> Vec<UserTransform> {
        std::mem::take(&mut self.pending)
    }
}

/// Re-run rotation normalization on a transform from an outside source.
pub(crate) fn normalize(transform: Transform) -> Transform {
    Transform::new(transform.translation, transform.rotation)
}
