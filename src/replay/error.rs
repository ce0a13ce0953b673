//! Error type shared by recording, serialization and playback.

use std::fmt;
use std::io;

use crate::scene::{BackendError, NodeId};
use crate::schema::{ConfigError, RenderInstanceId};

/// Target of a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// A scene node that does not exist.
    Node(NodeId),
    /// A log record naming an instance that is not live at that keyframe.
    Instance {
        keyframe: usize,
        instance: RenderInstanceId,
    },
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Node(node) => write!(f, "{node} does not exist"),
            Reference::Instance { keyframe, instance } => {
                write!(f, "{instance} is not live at keyframe {keyframe}")
            }
        }
    }
}

/// Errors produced by the replay engine.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Invalid reference: {0}")]
    InvalidReference(Reference),

    #[error("Keyframe index {index} out of range (log has {len} keyframes)")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Unsupported record type `{record}`{}", keyframe_suffix(.keyframe))]
    UnsupportedRecordType {
        keyframe: Option<usize>,
        record: String,
    },

    #[error("Unsupported replay format version {found} (supported: {supported})")]
    UnsupportedVersion { found: String, supported: u32 },

    #[error("Replay I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Replay document parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed keyframe {keyframe}: {reason}")]
    MalformedLog { keyframe: usize, reason: String },

    #[error("{what} is not finite")]
    NonFinite { what: String },

    #[error("{0} was deleted earlier in this log and cannot be created again")]
    InstanceIdReused(RenderInstanceId),

    #[error("Render backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Keyframe recording is disabled (enable_save = false)")]
    RecordingDisabled,

    #[error("LZ4 replay documents require the `lz4` feature")]
    CompressionUnavailable,

    #[error("Invalid replay config: {0}")]
    Config(#[from] ConfigError),
}

fn keyframe_suffix(keyframe: &Option<usize>) -> String {
    keyframe.map(|k| format!(" in keyframe {k}")).unwrap_or_default()
}

/// Result alias for replay operations.
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ReplayError::IndexOutOfRange { index: -1, len: 4 };
        assert_eq!(
            err.to_string(),
            "Keyframe index -1 out of range (log has 4 keyframes)"
        );

        let err = ReplayError::UnsupportedRecordType {
            keyframe: Some(2),
            record: "lights".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported record type `lights` in keyframe 2"
        );

        let err = ReplayError::InvalidReference(Reference::Instance {
            keyframe: 5,
            instance: RenderInstanceId(9),
        });
        assert_eq!(
            err.to_string(),
            "Invalid reference: instance #9 is not live at keyframe 5"
        );

        let err = ReplayError::UnsupportedVersion {
            found: "\"2\"".into(),
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported replay format version \"2\" (supported: 1)"
        );
    }
}
