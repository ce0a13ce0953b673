//! Keyframe record types for replay logs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Transform, Vec3};

/// Stable handle of one render instance across its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderInstanceId(pub u64);

impl fmt::Display for RenderInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance #{}", self.0)
    }
}

/// A render asset that playback must be able to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetInfo {
    /// Asset path or template reference.
    pub filepath: String,
    /// Whether the asset is shaded with scene lighting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_lighting: Option<bool>,
}

impl AssetInfo {
    pub fn from_path(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            requires_lighting: None,
        }
    }
}

/// A render instance appearing in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Creation {
    pub instance: RenderInstanceId,
    /// Asset path, matching an [`AssetInfo::filepath`].
    pub asset: String,
    /// Initial pose.
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_setup_key: Option<String>,
}

/// Pose change of a live instance since the previous keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateUpdate {
    pub instance: RenderInstanceId,
    pub transform: Transform,
    /// Semantic id of the instance after this update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<u32>,
}

/// Named pose not bound to a render instance (agent, sensor, camera).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserTransform {
    pub name: String,
    pub transform: Transform,
}

/// One tick's worth of scene delta records.
///
/// Records apply in field order: loads, creations, deletions, state
/// updates, then user transforms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyframe {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loads: Vec<AssetInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creations: Vec<Creation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<RenderInstanceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_updates: Vec<StateUpdate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_transforms: Vec<UserTransform>,
    /// Simulation time in seconds. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl Keyframe {
    /// Field names a document keyframe object may contain.
    pub const FIELDS: &'static [&'static str] = &[
        "loads",
        "creations",
        "deletions",
        "state_updates",
        "user_transforms",
        "time",
    ];

    /// True if the keyframe carries no records (metadata aside).
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
            && self.creations.is_empty()
            && self.deletions.is_empty()
            && self.state_updates.is_empty()
            && self.user_transforms.is_empty()
    }

    /// Total number of records.
    pub fn record_count(&self) -> usize {
        self.loads.len()
            + self.creations.len()
            + self.deletions.len()
            + self.state_updates.len()
            + self.user_transforms.len()
    }
}
