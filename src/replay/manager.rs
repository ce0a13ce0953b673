//! Entry point tying recording, documents and players together.

use std::path::Path;
use std::sync::Arc;

use super::format::write_log_to_document;
use super::{Player, Recorder, ReplayError, Result};
use crate::scene::{LayerId, NodeId, SceneProvider};
use crate::schema::{ReplayConfig, Transform};

/// Owns the optional recorder and hands out players.
///
/// Recording calls fail with [`ReplayError::RecordingDisabled`] unless
/// `enable_save` is set. Playback is always available.
#[derive(Debug)]
pub struct ReplayManager {
    config: ReplayConfig,
    recorder: Option<Recorder>,
    next_layer: u32,
}

impl ReplayManager {
    pub fn new(config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        let recorder = config
            .enable_save
            .then(|| Recorder::new(config.recorder.clone()));
        Ok(Self {
            config,
            recorder,
            next_layer: 0,
        })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }

    fn recorder_mut(&mut self) -> Result<&mut Recorder> {
        self.recorder.as_mut().ok_or(ReplayError::RecordingDisabled)
    }

    /// Record one keyframe from `scene`.
    pub fn save_keyframe<S: SceneProvider + ?Sized>(&mut self, scene: &S) -> Result<Option<usize>> {
        self.recorder_mut()?.save_keyframe(scene)
    }

    pub fn add_user_transform(&mut self, name: impl Into<String>, transform: Transform) -> Result<()> {
        self.recorder_mut()?.add_user_transform(name, transform)
    }

    pub fn add_node_user_transform<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        name: impl Into<String>,
        node: NodeId,
    ) -> Result<()> {
        self.recorder_mut()?.add_node_user_transform(scene, name, node)
    }

    /// Write the recorded keyframes using the configured encoding.
    pub fn write_log_to_document<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let recorder = self.recorder.as_ref().ok_or(ReplayError::RecordingDisabled)?;
        write_log_to_document(recorder.log(), &recorder.metadata(), path, self.config.encoding)
    }

    /// Create an empty player on a fresh layer.
    pub fn create_player(&mut self) -> Player {
        let layer = LayerId(self.next_layer);
        self.next_layer += 1;
        Player::new(layer, self.config.player.clone())
    }

    /// Load a document into a new player.
    pub fn read_log_from_document<P: AsRef<Path>>(&mut self, path: P) -> Result<Player> {
        let mut player = self.create_player();
        player.read_keyframes_from_file(path)?;
        Ok(player)
    }

    /// Play back what has been recorded so far, without a file round trip.
    pub fn player_from_recording(&mut self) -> Result<Player> {
        let log = Arc::new(
            self.recorder
                .as_ref()
                .ok_or(ReplayError::RecordingDisabled)?
                .log()
                .clone(),
        );
        let mut player = self.create_player();
        player.load(log)?;
        Ok(player)
    }
}
