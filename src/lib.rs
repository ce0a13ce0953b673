//! Graphics replay - deterministic keyframe recording and playback of 3D
//! scene state.
//!
//! A simulation records what its renderer would draw, one keyframe per tick.
//! The resulting log can be saved as a JSON document and played back later,
//! seeking to any keyframe in any order, without re-running the simulation.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Keyframe record types, transforms and configuration
//! - `scene`: Interfaces to the simulated scene and the render backend,
//!   plus in-memory implementations of both
//! - `replay`: Recorder, keyframe log, document format and player
//!
//! # Example
//!
//! ```rust,no_run
//! use gfx_replay::{
//!     replay::ReplayManager,
//!     scene::{RenderScene, SceneGraph},
//!     schema::{AssetInfo, ReplayConfig, Transform, Vec3},
//! };
//!
//! let config = ReplayConfig {
//!     enable_save: true,
//!     ..Default::default()
//! };
//! let mut manager = ReplayManager::new(config)?;
//!
//! // Record a falling box
//! let mut scene = SceneGraph::new();
//! let node = scene.add_render_instance(AssetInfo::from_path("box.glb"), Transform::IDENTITY);
//! for tick in 0..60 {
//!     let y = 10.0 - tick as f32 * 0.1;
//!     scene.set_transform(node, Transform::from_translation(Vec3::new(0.0, y, 0.0)))?;
//!     manager.save_keyframe(&scene)?;
//! }
//! manager.write_log_to_document("replay.json")?;
//!
//! // Play it back
//! let mut player = manager.read_log_from_document("replay.json")?;
//! let mut render = RenderScene::new();
//! player.set_keyframe_index(30, &mut render)?;
//! println!("{} instances at keyframe 30", render.len());
//! # Ok::<(), gfx_replay::replay::ReplayError>(())
//! ```

pub mod replay;
pub mod scene;
pub mod schema;

// Re-export commonly used types
pub use replay::{KeyframeLog, Player, Recorder, ReplayError, ReplayManager};
pub use schema::{Keyframe, ReplayConfig, Transform};
