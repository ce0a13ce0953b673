//! Keyframe recorder that diffs the live scene once per tick.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::format::{ReplayMetadata, write_log_to_document};
use super::registry::{TransformRegistry, normalize};
use super::{KeyframeLog, LogSummary, ReplayError, Result};
use crate::scene::{LiveInstance, NodeId, SceneProvider};
use crate::schema::{
    Creation, DocumentEncoding, Keyframe, RecorderConfig, RenderInstanceId, StateUpdate, Transform,
};

/// Last recorded state of an instance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tracked {
    transform: Transform,
    semantic_id: Option<u32>,
}

/// Builds one keyframe per simulation tick and appends it to a log.
///
/// Usage:
/// ```ignore
/// let mut recorder = Recorder::new(RecorderConfig::default());
/// for _ in 0..120 {
///     physics.step(&mut scene);
///     recorder.add_node_user_transform(&scene, "agent", agent_node)?;
///     recorder.save_keyframe(&scene)?;
/// }
/// recorder.write_to_file("replay.json", DocumentEncoding::Json)?;
/// ```
#[derive(Debug)]
pub struct Recorder {
    log: KeyframeLog,
    config: RecorderConfig,
    registry: TransformRegistry,
    /// Instances present in the last recorded keyframe.
    tracked: BTreeMap<RenderInstanceId, Tracked>,
    /// Deleted ids, never to be created again in this log.
    retired: BTreeSet<RenderInstanceId>,
    loaded_assets: BTreeSet<String>,
    step_counter: u32,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            log: KeyframeLog::new(),
            config,
            registry: TransformRegistry::new(),
            tracked: BTreeMap::new(),
            retired: BTreeSet::new(),
            loaded_assets: BTreeSet::new(),
            step_counter: 0,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Record a named transform in the next keyframe.
    pub fn add_user_transform(&mut self, name: impl Into<String>, transform: Transform) -> Result<()> {
        self.registry.set_user_transform(name, transform)
    }

    /// Record the current transform of `node` under `name` in the next keyframe.
    pub fn add_node_user_transform<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        name: impl Into<String>,
        node: NodeId,
    ) -> Result<()> {
        self.registry.set_node_user_transform(scene, name, node)
    }

    /// Diff the scene against the last keyframe and append the result.
    ///
    /// Returns the new keyframe's index, or `None` when the tick is skipped
    /// by `frame_skip` or `max_keyframes`. On error nothing is recorded.
    pub fn save_keyframe<S: SceneProvider + ?Sized>(&mut self, scene: &S) -> Result<Option<usize>> {
        self.record(scene, None)
    }

    /// Like [`save_keyframe`](Self::save_keyframe), stamping the keyframe
    /// with the simulation time.
    pub fn save_keyframe_at<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        time: f64,
    ) -> Result<Option<usize>> {
        self.record(scene, Some(time))
    }

    fn record<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        time: Option<f64>,
    ) -> Result<Option<usize>> {
        let step = self.step_counter + 1;
        if step < self.config.frame_skip {
            self.step_counter = step;
            return Ok(None);
        }

        if self.config.max_keyframes > 0 && self.log.len() >= self.config.max_keyframes {
            self.step_counter = 0;
            return Ok(None);
        }

        if let Some(time) = time.filter(|t| !t.is_finite()) {
            return Err(ReplayError::NonFinite {
                what: format!("keyframe time {time}"),
            });
        }

        let mut keyframe = self.build_keyframe(scene)?;
        keyframe.time = time;
        self.step_counter = 0;

        self.commit(&keyframe);
        let index = self.log.append(keyframe);
        log::debug!(
            "Keyframe {}: {} records",
            index,
            self.log[index].record_count()
        );
        Ok(Some(index))
    }

    /// Compute the next keyframe without touching recorder state.
    fn build_keyframe<S: SceneProvider + ?Sized>(&self, scene: &S) -> Result<Keyframe> {
        // Later duplicates of an id overwrite earlier ones.
        let live: BTreeMap<RenderInstanceId, LiveInstance> = scene
            .live_instances()
            .into_iter()
            .map(|inst| (inst.instance, inst))
            .collect();

        let mut keyframe = Keyframe::default();
        let mut new_assets = BTreeSet::new();

        for (&id, inst) in &live {
            if !inst.transform.is_finite() {
                return Err(ReplayError::NonFinite {
                    what: format!("transform of {id}"),
                });
            }
            let transform = normalize(inst.transform);
            match self.tracked.get(&id) {
                None => {
                    if self.retired.contains(&id) {
                        return Err(ReplayError::InstanceIdReused(id));
                    }
                    let path = &inst.asset.filepath;
                    if !self.loaded_assets.contains(path) && new_assets.insert(path.clone()) {
                        keyframe.loads.push(inst.asset.clone());
                    }
                    keyframe.creations.push(Creation {
                        instance: id,
                        asset: path.clone(),
                        transform,
                        scale: inst.scale,
                        semantic_id: inst.semantic_id,
                        light_setup_key: inst.light_setup_key.clone(),
                    });
                }
                Some(prev) => {
                    if prev.transform != transform || prev.semantic_id != inst.semantic_id {
                        keyframe.state_updates.push(StateUpdate {
                            instance: id,
                            transform,
                            semantic_id: inst.semantic_id,
                        });
                    }
                }
            }
        }

        keyframe.deletions = self
            .tracked
            .keys()
            .filter(|id| !live.contains_key(id))
            .copied()
            .collect();

        keyframe.user_transforms = self.registry.pending().to_vec();
        Ok(keyframe)
    }

    /// Advance tracked state past `keyframe`.
    fn commit(&mut self, keyframe: &Keyframe) {
        self.loaded_assets
            .extend(keyframe.loads.iter().map(|a| a.filepath.clone()));
        for creation in &keyframe.creations {
            self.tracked.insert(
                creation.instance,
                Tracked {
                    transform: creation.transform,
                    semantic_id: creation.semantic_id,
                },
            );
        }
        for update in &keyframe.state_updates {
            self.tracked.insert(
                update.instance,
                Tracked {
                    transform: update.transform,
                    semantic_id: update.semantic_id,
                },
            );
        }
        for id in &keyframe.deletions {
            self.tracked.remove(id);
            self.retired.insert(*id);
        }
        self.registry.take_pending();
    }

    /// Number of keyframes recorded so far.
    pub fn keyframes_saved(&self) -> usize {
        self.log.len()
    }

    pub fn log(&self) -> &KeyframeLog {
        &self.log
    }

    pub fn into_log(self) -> KeyframeLog {
        self.log
    }

    /// Document metadata for this recording.
    pub fn metadata(&self) -> ReplayMetadata {
        ReplayMetadata {
            frame_rate: self.config.frame_rate,
            generator: Some(format!("gfx-replay {}", env!("CARGO_PKG_VERSION"))),
        }
    }

    pub fn stats(&self) -> LogSummary {
        self.log.summary()
    }

    /// Write all saved keyframes to a replay document.
    pub fn write_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        encoding: DocumentEncoding,
    ) -> Result<LogSummary> {
        write_log_to_document(&self.log, &self.metadata(), path, encoding)?;
        Ok(self.stats())
    }
}
