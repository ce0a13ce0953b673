//! Keyframe player that reconstructs and presents the scene at any index.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use super::format::{ReplayDocument, ReplayMetadata, read_log_from_document};
use super::{InstanceState, KeyframeLog, RecordRef, ReplayError, Result, SceneState};
use crate::scene::{InstanceKey, InstancePose, LayerId, RenderBackend};
use crate::schema::{AssetInfo, PlayerConfig, RenderInstanceId, Transform};

/// What the player last pushed to the backend for one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Presented {
    /// Log generation the instance was created from.
    generation: u64,
    origin: RecordRef,
    pose: InstancePose,
}

/// Plays back a keyframe log into a render backend.
///
/// Usage:
/// ```ignore
/// let mut player = Player::new(LayerId(0), PlayerConfig::default());
/// player.read_keyframes_from_file("replay.json")?;
/// println!("Replay has {} keyframes", player.get_num_keyframes());
///
/// for index in Playback::reverse(player.get_num_keyframes()).with_speed(3) {
///     player.set_keyframe_index(index as i64, &mut render_scene)?;
/// }
/// ```
///
/// The scene at index `i` is always the fold of keyframes `0..=i`, however
/// the player got there.
#[derive(Debug)]
pub struct Player {
    layer: LayerId,
    config: PlayerConfig,
    log: Arc<KeyframeLog>,
    metadata: ReplayMetadata,
    /// Bumped on every successful load.
    generation: u64,
    cursor: Option<usize>,
    state: SceneState,
    /// Folded states at every `checkpoint_interval`-th keyframe.
    checkpoints: BTreeMap<usize, SceneState>,
    presented: BTreeMap<RenderInstanceId, Presented>,
    resolved_assets: BTreeSet<String>,
}

impl Player {
    /// Create a player with no keyframes.
    pub fn new(layer: LayerId, config: PlayerConfig) -> Self {
        Self {
            layer,
            config,
            log: Arc::new(KeyframeLog::new()),
            metadata: ReplayMetadata::default(),
            generation: 0,
            cursor: None,
            state: SceneState::default(),
            checkpoints: BTreeMap::new(),
            presented: BTreeMap::new(),
            resolved_assets: BTreeSet::new(),
        }
    }

    /// Replace the played log.
    ///
    /// The log is validated first; on error the player is unchanged. On
    /// success the cursor is cleared and instances presented from the old
    /// log are removed at the next sync.
    pub fn load(&mut self, log: Arc<KeyframeLog>) -> Result<()> {
        log.validate()?;
        self.install(log, ReplayMetadata::default());
        Ok(())
    }

    /// Load a decoded document, keeping its metadata.
    pub fn load_document(&mut self, doc: ReplayDocument) -> Result<()> {
        doc.keyframes.validate()?;
        self.install(Arc::new(doc.keyframes), doc.metadata);
        Ok(())
    }

    /// Load a replay document from disk.
    pub fn read_keyframes_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        // Already validated by the decoder.
        let doc = read_log_from_document(path)?;
        self.install(Arc::new(doc.keyframes), doc.metadata);
        Ok(())
    }

    fn install(&mut self, log: Arc<KeyframeLog>, metadata: ReplayMetadata) {
        self.log = log;
        self.metadata = metadata;
        self.generation += 1;
        self.cursor = None;
        self.state = SceneState::default();
        self.checkpoints.clear();
        self.resolved_assets.clear();
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn metadata(&self) -> &ReplayMetadata {
        &self.metadata
    }

    pub fn log(&self) -> &Arc<KeyframeLog> {
        &self.log
    }

    pub fn get_num_keyframes(&self) -> usize {
        self.log.len()
    }

    /// Current keyframe index, or `None` before the first seek.
    pub fn keyframe_index(&self) -> Option<usize> {
        self.cursor
    }

    /// Move the reconstructed scene to keyframe `index` without touching
    /// any backend.
    ///
    /// Out-of-range indices (including negative ones) fail and leave the
    /// player unchanged.
    pub fn seek(&mut self, index: i64) -> Result<()> {
        let target = self.check_index(index)?;
        let log = Arc::clone(&self.log);

        let (start, mut state) = self.resume_point(target);
        for (k, keyframe) in log.iter().enumerate().take(target + 1).skip(start) {
            state.apply(k, keyframe);
            self.maybe_checkpoint(k, &state);
        }

        log::debug!(
            "Seek to keyframe {} replayed {} keyframes",
            target,
            (target + 1).saturating_sub(start)
        );
        self.state = state;
        self.cursor = Some(target);
        Ok(())
    }

    /// Seek to keyframe `index` and push the result to `backend`.
    pub fn set_keyframe_index<B: RenderBackend + ?Sized>(
        &mut self,
        index: i64,
        backend: &mut B,
    ) -> Result<()> {
        self.seek(index)?;
        self.sync(backend)
    }

    /// Return to the position before the first keyframe and remove every
    /// presented instance from `backend`.
    pub fn clear_keyframe_index<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        self.cursor = None;
        self.state = SceneState::default();
        self.sync(backend)
    }

    fn check_index(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.log.len())
            .ok_or(ReplayError::IndexOutOfRange {
                index,
                len: self.log.len(),
            })
    }

    /// Best folded state to continue from: the current one when seeking
    /// forward, else the nearest checkpoint, else empty.
    fn resume_point(&mut self, target: usize) -> (usize, SceneState) {
        let checkpoint = self.checkpoints.range(..=target).next_back();
        match (self.cursor, checkpoint) {
            (Some(cursor), Some((&k, _))) if cursor <= target && cursor >= k => {
                (cursor + 1, std::mem::take(&mut self.state))
            }
            (_, Some((&k, state))) => (k + 1, state.clone()),
            (Some(cursor), None) if cursor <= target => {
                (cursor + 1, std::mem::take(&mut self.state))
            }
            _ => (0, SceneState::default()),
        }
    }

    fn maybe_checkpoint(&mut self, k: usize, state: &SceneState) {
        let interval = self.config.checkpoint_interval;
        if interval > 0 && (k + 1) % interval == 0 && !self.checkpoints.contains_key(&k) {
            self.checkpoints.insert(k, state.clone());
        }
    }

    /// Bring `backend` in line with the reconstructed scene.
    ///
    /// Destroys presented instances that are gone or were created by a
    /// different record, resolves and instantiates new ones, and
    /// repositions moved ones. After a backend error the next sync retries
    /// whatever is still missing.
    pub fn sync<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        let stale: Vec<RenderInstanceId> = self
            .presented
            .iter()
            .filter(|(id, p)| {
                p.generation != self.generation
                    || self.state.instance(**id).is_none_or(|s| s.origin != p.origin)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.presented.remove(&id);
            backend.destroy(self.key(id));
        }

        for (&id, instance) in self.state.instances() {
            let key = InstanceKey {
                layer: self.layer,
                instance: id,
            };
            let pose = instance.pose();

            if let Some(presented) = self.presented.get_mut(&id) {
                if presented.pose != pose {
                    backend.reposition(key, &pose);
                    presented.pose = pose;
                }
                continue;
            }

            let creation = self.log.creation(instance.origin).ok_or_else(|| {
                ReplayError::MalformedLog {
                    keyframe: instance.origin.keyframe,
                    reason: format!("no creation record for {id}"),
                }
            })?;
            if !self.resolved_assets.contains(&creation.asset) {
                let asset = asset_info(&self.log, &self.state, &creation.asset);
                backend.resolve(&asset)?;
                self.resolved_assets.insert(creation.asset.clone());
            }
            backend.instantiate(key, creation, &pose)?;
            self.presented.insert(
                id,
                Presented {
                    generation: self.generation,
                    origin: instance.origin,
                    pose,
                },
            );
        }
        Ok(())
    }

    fn key(&self, instance: RenderInstanceId) -> InstanceKey {
        InstanceKey {
            layer: self.layer,
            instance,
        }
    }

    /// Last value of a user transform at or before the current keyframe.
    pub fn get_user_transform(&self, name: &str) -> Option<Transform> {
        self.state.user_transform(name)
    }

    pub fn user_transform_names(&self) -> impl Iterator<Item = &str> {
        self.state.user_transform_names()
    }

    pub fn instance(&self, id: RenderInstanceId) -> Option<&InstanceState> {
        self.state.instance(id)
    }

    pub fn instances(&self) -> impl Iterator<Item = (&RenderInstanceId, &InstanceState)> {
        self.state.instances()
    }

    pub fn num_instances(&self) -> usize {
        self.state.num_instances()
    }

    /// Reconstructed scene at the current keyframe.
    pub fn state(&self) -> &SceneState {
        &self.state
    }
}

/// Asset description for `filepath`, from its load record when there is one.
fn asset_info(log: &KeyframeLog, state: &SceneState, filepath: &str) -> AssetInfo {
    state
        .asset(filepath)
        .and_then(|at| log.asset(at))
        .cloned()
        .unwrap_or_else(|| AssetInfo::from_path(filepath))
}
