//! Keyframe recording and playback of render scenes.
//!
//! A [`Recorder`] diffs the live scene once per simulation tick and appends
//! one [`Keyframe`](crate::schema::Keyframe) of delta records to a
//! [`KeyframeLog`]. A [`Player`] reconstructs the scene at any keyframe by
//! folding the log from the start and pushes the result to a render backend.
//!
//! # Document Format
//!
//! Logs are stored as JSON documents:
//!
//! ```text
//! {
//!   "version": 1,
//!   "metadata": { "frame_rate": 60.0 },        (optional)
//!   "keyframes": [
//!     {
//!       "loads":           [{ "filepath", "requires_lighting"? }],
//!       "creations":       [{ "instance", "asset", "transform", "scale"?,
//!                             "semantic_id"?, "light_setup_key"? }],
//!       "deletions":       [instance, ...],
//!       "state_updates":   [{ "instance", "transform", "semantic_id"? }],
//!       "user_transforms": [{ "name", "transform" }],
//!       "time":            seconds (informational)
//!     },
//!     {}                                        (empty keyframe)
//!   ]
//! }
//!
//! transform: { "translation": [x, y, z], "rotation": [x, y, z, w] }
//! ```
//!
//! Empty lists are omitted. Within a keyframe, records apply in the order
//! loads, creations, deletions, state updates, user transforms. With the
//! `lz4` feature the same JSON can be wrapped as `"GFXR"` followed by an
//! LZ4 block with its size prepended.

mod error;
mod format;
mod keyframe_log;
mod manager;
mod playback;
mod player;
mod recorder;
mod registry;
mod state;

pub use error::{Reference, ReplayError, Result};
pub use format::{
    LZ4_MAGIC, REPLAY_FORMAT_VERSION, ReplayDocument, ReplayMetadata, decode_bytes,
    decode_document, encode_bytes, encode_document, read_log_from_document,
    write_log_to_document,
};
pub use keyframe_log::{KeyframeLog, LogSummary, RecordRef};
pub use manager::ReplayManager;
pub use playback::{Direction, Playback, PlaybackIter};
pub use player::Player;
pub use recorder::Recorder;
pub use registry::TransformRegistry;
pub use state::{InstanceState, SceneState};
