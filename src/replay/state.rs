//! Reconstructed scene state, derived by folding keyframes.

use std::collections::BTreeMap;

use super::{KeyframeLog, RecordRef};
use crate::scene::InstancePose;
use crate::schema::{Keyframe, RenderInstanceId, Transform};

/// Reconstructed state of one live instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceState {
    /// Creation record this instance came from.
    pub origin: RecordRef,
    pub transform: Transform,
    pub semantic_id: Option<u32>,
}

impl InstanceState {
    pub fn pose(&self) -> InstancePose {
        InstancePose {
            transform: self.transform,
            semantic_id: self.semantic_id,
        }
    }
}

/// Scene reconstructed from a log prefix.
///
/// Built only by [`SceneState::apply`] in keyframe order, starting from
/// `SceneState::default()`; two states folded over the same prefix compare
/// equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneState {
    instances: BTreeMap<RenderInstanceId, InstanceState>,
    user_transforms: BTreeMap<String, Transform>,
    /// Asset path -> first load record.
    assets: BTreeMap<String, RecordRef>,
}

impl SceneState {
    /// Fold keyframes `[0..=index]` from an empty scene.
    pub fn replay(log: &KeyframeLog, index: usize) -> Self {
        let mut state = Self::default();
        for (k, keyframe) in log.iter().enumerate().take(index.saturating_add(1)) {
            state.apply(k, keyframe);
        }
        state
    }

    /// Apply keyframe `index` on top of this state.
    ///
    /// Expects a validated log. Records naming instances that are not live
    /// are skipped.
    pub fn apply(&mut self, index: usize, keyframe: &Keyframe) {
        for (slot, asset) in keyframe.loads.iter().enumerate() {
            self.assets
                .entry(asset.filepath.clone())
                .or_insert(RecordRef {
                    keyframe: index,
                    slot,
                });
        }

        for (slot, creation) in keyframe.creations.iter().enumerate() {
            self.instances.insert(
                creation.instance,
                InstanceState {
                    origin: RecordRef {
                        keyframe: index,
                        slot,
                    },
                    transform: creation.transform,
                    semantic_id: creation.semantic_id,
                },
            );
        }

        for id in &keyframe.deletions {
            self.instances.remove(id);
        }

        for update in &keyframe.state_updates {
            if let Some(instance) = self.instances.get_mut(&update.instance) {
                instance.transform = update.transform;
                instance.semantic_id = update.semantic_id;
            }
        }

        for user in &keyframe.user_transforms {
            self.user_transforms
                .insert(user.name.clone(), user.transform);
        }
    }

    pub fn instance(&self, id: RenderInstanceId) -> Option<&InstanceState> {
        self.instances.get(&id)
    }

    /// Live instances in ascending id order.
    pub fn instances(&self) -> impl Iterator<Item = (&RenderInstanceId, &InstanceState)> {
        self.instances.iter()
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Last value set for `name` in the folded prefix.
    pub fn user_transform(&self, name: &str) -> Option<Transform> {
        self.user_transforms.get(name).copied()
    }

    pub fn user_transform_names(&self) -> impl Iterator<Item = &str> {
        self.user_transforms.keys().map(String::as_str)
    }

    /// Load record of `filepath`, if it has been loaded.
    pub fn asset(&self, filepath: &str) -> Option<RecordRef> {
        self.assets.get(filepath).copied()
    }

    /// Assets loaded so far, with the record that first loaded each.
    pub fn assets(&self) -> impl Iterator<Item = (&String, &RecordRef)> {
        self.assets.iter()
    }
}
