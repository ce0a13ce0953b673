//! In-memory simulation scene used as a recording source.

use std::collections::BTreeMap;

use super::{LiveInstance, NodeId, SceneProvider};
use crate::replay::{Reference, ReplayError};
use crate::schema::{AssetInfo, RenderInstanceId, Transform, Vec3};

/// Visual attachment that turns a node into a render instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderAttachment {
    pub asset: AssetInfo,
    pub scale: Option<Vec3>,
    pub semantic_id: Option<u32>,
    pub light_setup_key: Option<String>,
}

/// A node of the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub transform: Transform,
    /// `None` for plain nodes such as agents or sensors.
    pub render: Option<RenderAttachment>,
}

/// Flat scene graph keyed by stable node ids.
///
/// Node ids are allocated monotonically and never reused, and a render
/// node's [`RenderInstanceId`] equals its node id.
///
/// ```ignore
/// let mut scene = SceneGraph::new();
/// let agent = scene.add_node(Transform::IDENTITY);
/// let crate_node = scene.add_render_instance(AssetInfo::from_path("crate.glb"), Transform::IDENTITY);
/// scene.set_transform(crate_node, moved)?;
/// ```
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Add a node without visuals.
    pub fn add_node(&mut self, transform: Transform) -> NodeId {
        self.insert(SceneNode {
            transform,
            render: None,
        })
    }

    /// Add a node rendered with `asset`.
    pub fn add_render_instance(&mut self, asset: AssetInfo, transform: Transform) -> NodeId {
        self.add_render_node(
            RenderAttachment {
                asset,
                scale: None,
                semantic_id: None,
                light_setup_key: None,
            },
            transform,
        )
    }

    /// Add a node with a fully specified render attachment.
    pub fn add_render_node(&mut self, render: RenderAttachment, transform: Transform) -> NodeId {
        self.insert(SceneNode {
            transform,
            render: Some(render),
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, ReplayError> {
        self.nodes
            .get_mut(&id)
            .ok_or(ReplayError::InvalidReference(Reference::Node(id)))
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), ReplayError> {
        self.node_mut(id)?.transform = transform;
        Ok(())
    }

    /// Set the semantic id of a render node. Plain nodes are rejected.
    pub fn set_semantic_id(&mut self, id: NodeId, semantic_id: Option<u32>) -> Result<(), ReplayError> {
        match self.node_mut(id)?.render.as_mut() {
            Some(render) => {
                render.semantic_id = semantic_id;
                Ok(())
            }
            None => Err(ReplayError::InvalidReference(Reference::Node(id))),
        }
    }

    /// Remove a node from the scene.
    pub fn remove(&mut self, id: NodeId) -> Result<SceneNode, ReplayError> {
        self.nodes
            .remove(&id)
            .ok_or(ReplayError::InvalidReference(Reference::Node(id)))
    }

    /// Render instance id of a node.
    pub fn instance_id(id: NodeId) -> RenderInstanceId {
        RenderInstanceId(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SceneProvider for SceneGraph {
    fn live_instances(&self) -> Vec<LiveInstance> {
        self.nodes
            .iter()
            .filter_map(|(&id, node)| {
                node.render.as_ref().map(|render| LiveInstance {
                    instance: Self::instance_id(id),
                    asset: render.asset.clone(),
                    transform: node.transform,
                    scale: render.scale,
                    semantic_id: render.semantic_id,
                    light_setup_key: render.light_setup_key.clone(),
                })
            })
            .collect()
    }

    fn node_transform(&self, node: NodeId) -> Option<Transform> {
        self.nodes.get(&node).map(|n| n.transform)
    }
}
