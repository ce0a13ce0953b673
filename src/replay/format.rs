//! Replay document encoding.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{KeyframeLog, ReplayError, Result};
use crate::schema::{DocumentEncoding, Keyframe};

/// Current document version.
pub const REPLAY_FORMAT_VERSION: u32 = 1;

/// Magic bytes of an LZ4-wrapped document.
pub const LZ4_MAGIC: &[u8; 4] = b"GFXR";

/// Keys allowed at the top level of a document.
const DOCUMENT_FIELDS: &[&str] = &["version", "metadata", "keyframes"];

/// Informational document fields. Never used by playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayMetadata {
    /// Recording tick rate in keyframes per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

/// A decoded replay document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayDocument {
    pub version: u32,
    #[serde(default)]
    pub metadata: ReplayMetadata,
    pub keyframes: KeyframeLog,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    metadata: &'a ReplayMetadata,
    keyframes: &'a KeyframeLog,
}

/// Serialize a log as a pretty-printed JSON document.
///
/// The log is validated first so that a written document always loads.
pub fn encode_document(log: &KeyframeLog, metadata: &ReplayMetadata) -> Result<String> {
    log.validate()?;
    let doc = DocumentRef {
        version: REPLAY_FORMAT_VERSION,
        metadata,
        keyframes: log,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Encode a log with the given on-disk encoding.
pub fn encode_bytes(
    log: &KeyframeLog,
    metadata: &ReplayMetadata,
    encoding: DocumentEncoding,
) -> Result<Vec<u8>> {
    let json = encode_document(log, metadata)?;
    match encoding {
        DocumentEncoding::Json => Ok(json.into_bytes()),
        DocumentEncoding::JsonLz4 => {
            let payload = compress_lz4(json.as_bytes())?;
            let mut bytes = Vec::with_capacity(LZ4_MAGIC.len() + payload.len());
            bytes.extend_from_slice(LZ4_MAGIC);
            bytes.extend_from_slice(&payload);
            Ok(bytes)
        }
    }
}

/// Parse and validate a JSON document.
pub fn decode_document(text: &str) -> Result<ReplayDocument> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Decode a document in either encoding, detected from its first bytes.
pub fn decode_bytes(bytes: &[u8]) -> Result<ReplayDocument> {
    let value: Value = match bytes.strip_prefix(LZ4_MAGIC.as_slice()) {
        Some(payload) => serde_json::from_slice(&decompress_lz4(payload)?)?,
        None => serde_json::from_slice(bytes)?,
    };
    decode_value(value)
}

fn decode_value(value: Value) -> Result<ReplayDocument> {
    check_document_keys(&value)?;
    let doc: ReplayDocument = serde_json::from_value(value)?;
    doc.keyframes.validate()?;
    Ok(doc)
}

/// Reject unknown versions and unknown record keys before typed parsing.
///
/// Shape errors (wrong types, missing fields) are left to serde.
fn check_document_keys(value: &Value) -> Result<()> {
    let Some(root) = value.as_object() else {
        return Ok(());
    };

    // Only the integer 1 is accepted; `1.0`, `"1"` and the like are not.
    if let Some(found) = root.get("version") {
        if found.as_u64() != Some(u64::from(REPLAY_FORMAT_VERSION)) {
            return Err(ReplayError::UnsupportedVersion {
                found: found.to_string(),
                supported: REPLAY_FORMAT_VERSION,
            });
        }
    }

    if let Some(key) = root.keys().find(|k| !DOCUMENT_FIELDS.contains(&k.as_str())) {
        return Err(ReplayError::UnsupportedRecordType {
            keyframe: None,
            record: key.clone(),
        });
    }

    let Some(keyframes) = root.get("keyframes").and_then(Value::as_array) else {
        return Ok(());
    };
    for (k, keyframe) in keyframes.iter().enumerate() {
        let Some(fields) = keyframe.as_object() else {
            continue;
        };
        if let Some(key) = fields.keys().find(|f| !Keyframe::FIELDS.contains(&f.as_str())) {
            return Err(ReplayError::UnsupportedRecordType {
                keyframe: Some(k),
                record: key.clone(),
            });
        }
    }
    Ok(())
}

/// Write a log to `path`, replacing any existing file atomically.
pub fn write_log_to_document<P: AsRef<Path>>(
    log: &KeyframeLog,
    metadata: &ReplayMetadata,
    path: P,
    encoding: DocumentEncoding,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_bytes(log, metadata, encoding)?;
    atomic_write(path, &bytes)?;
    log::info!(
        "Wrote {} keyframes to {} ({} bytes)",
        log.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Read and validate a replay document from `path`.
pub fn read_log_from_document<P: AsRef<Path>>(path: P) -> Result<ReplayDocument> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let doc = decode_bytes(&bytes)?;
    log::info!(
        "Loaded {} keyframes from {}",
        doc.keyframes.len(),
        path.display()
    );
    Ok(doc)
}

/// Write to `{path}.tmp`, sync, then rename over `path`.
///
/// A crash mid-write leaves any existing file at `path` intact.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let result = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
pub fn compress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4_flex::compress_prepend_size(data))
}

/// Decompress LZ4 data.
#[cfg(feature = "lz4")]
pub fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| ReplayError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Fallback when LZ4 is not available.
#[cfg(not(feature = "lz4"))]
pub fn compress_lz4(_data: &[u8]) -> Result<Vec<u8>> {
    Err(ReplayError::CompressionUnavailable)
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_lz4(_data: &[u8]) -> Result<Vec<u8>> {
    Err(ReplayError::CompressionUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        AssetInfo, Creation, Quat, RenderInstanceId, StateUpdate, Transform, UserTransform, Vec3,
    };
    use tempfile::tempdir;

    fn sample_log() -> KeyframeLog {
        let rotation = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 0.3);
        KeyframeLog::from(vec![
            Keyframe {
                loads: vec![AssetInfo {
                    filepath: "objects/transform_box.glb".into(),
                    requires_lighting: Some(true),
                }],
                creations: vec![Creation {
                    instance: RenderInstanceId(4),
                    asset: "objects/transform_box.glb".into(),
                    transform: Transform::new(Vec3::new(0.1, 1e-7, -3.3), rotation),
                    scale: Some(Vec3::new(2.0, 2.0, 2.0)),
                    semantic_id: Some(7),
                    light_setup_key: Some("default".into()),
                }],
                user_transforms: vec![UserTransform {
                    name: "agent".into(),
                    transform: Transform::from_translation(Vec3::new(1.0 / 3.0, 0.0, 0.0)),
                }],
                time: Some(0.0),
                ..Default::default()
            },
            Keyframe::default(),
            Keyframe {
                state_updates: vec![StateUpdate {
                    instance: RenderInstanceId(4),
                    transform: Transform::from_translation(Vec3::new(123.456, 0.7, 1e30)),
                    semantic_id: None,
                }],
                ..Default::default()
            },
            Keyframe {
                deletions: vec![RenderInstanceId(4)],
                ..Default::default()
            },
        ])
    }

    fn bits(t: &Transform) -> [u32; 7] {
        [
            t.translation.x.to_bits(),
            t.translation.y.to_bits(),
            t.translation.z.to_bits(),
            t.rotation.x.to_bits(),
            t.rotation.y.to_bits(),
            t.rotation.z.to_bits(),
            t.rotation.w.to_bits(),
        ]
    }

    #[test]
    fn test_document_roundtrip() {
        let log = sample_log();
        let metadata = ReplayMetadata {
            frame_rate: Some(60.0),
            generator: None,
        };
        let text = encode_document(&log, &metadata).unwrap();
        let doc = decode_document(&text).unwrap();

        assert_eq!(doc.version, REPLAY_FORMAT_VERSION);
        assert_eq!(doc.metadata, metadata);
        assert_eq!(doc.keyframes, log);
        assert!(doc.keyframes[1].is_empty());

        let before = &log[0].creations[0].transform;
        let after = &doc.keyframes[0].creations[0].transform;
        assert_eq!(bits(before), bits(after));
        let before = &log[2].state_updates[0].transform;
        let after = &doc.keyframes[2].state_updates[0].transform;
        assert_eq!(bits(before), bits(after));
    }

    #[test]
    fn test_empty_keyframe_written_as_empty_object() {
        let text = encode_document(&sample_log(), &ReplayMetadata::default()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["keyframes"].as_array().unwrap().len(), 4);
        assert_eq!(value["keyframes"][1], serde_json::json!({}));
        assert_eq!(value["version"], 1);
    }

    #[test]
    fn test_unsupported_version() {
        for version in ["2", "2.0", "-1", r#""2""#, "1.0", "null"] {
            let json = format!(r#"{{"version": {version}, "keyframes": []}}"#);
            match decode_document(&json).unwrap_err() {
                ReplayError::UnsupportedVersion { found, supported } => {
                    assert_eq!(found, version);
                    assert_eq!(supported, 1);
                }
                other => panic!("unexpected error for version {version}: {other}"),
            }
        }
    }

    #[test]
    fn test_unnormalized_log_not_encoded() {
        let mut log = sample_log().into_keyframes();
        log[0].user_transforms[0].transform.rotation = Quat::new(0.0, 0.0, 0.0, 2.0);
        assert!(matches!(
            encode_document(&KeyframeLog::from(log), &ReplayMetadata::default()).unwrap_err(),
            ReplayError::MalformedLog { keyframe: 0, .. }
        ));

        let mut log = sample_log().into_keyframes();
        log[1].time = Some(f64::NAN);
        assert!(matches!(
            encode_document(&KeyframeLog::from(log), &ReplayMetadata::default()).unwrap_err(),
            ReplayError::MalformedLog { keyframe: 1, .. }
        ));
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // Renaming a file over a non-empty directory fails after the data is written.
        let path = dir.path().join("replay.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        assert!(atomic_write(&path, b"{}").is_err());
        assert!(!dir.path().join("replay.json.tmp").exists());
    }

    #[test]
    fn test_unknown_keyframe_record_rejected() {
        let json = r#"{"version": 1, "keyframes": [{}, {"lights": []}]}"#;
        match decode_document(json).unwrap_err() {
            ReplayError::UnsupportedRecordType { keyframe, record } => {
                assert_eq!(keyframe, Some(1));
                assert_eq!(record, "lights");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let json = r#"{"version": 1, "keyframes": [], "physics": {}}"#;
        assert!(matches!(
            decode_document(json).unwrap_err(),
            ReplayError::UnsupportedRecordType { keyframe: None, .. }
        ));
    }

    #[test]
    fn test_update_after_deletion_rejected() {
        let json = r#"{
            "version": 1,
            "keyframes": [
                {"loads": [{"filepath": "a.glb"}],
                 "creations": [{"instance": 1, "asset": "a.glb",
                                "transform": {"translation": [0, 0, 0], "rotation": [0, 0, 0, 1]}}]},
                {"deletions": [1]},
                {"state_updates": [{"instance": 1,
                                    "transform": {"translation": [1, 0, 0], "rotation": [0, 0, 0, 1]}}]}
            ]
        }"#;
        assert!(matches!(
            decode_document(json).unwrap_err(),
            ReplayError::InvalidReference(_)
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_document("{\"version\": 1, ").unwrap_err(),
            ReplayError::Parse(_)
        ));
        assert!(matches!(
            decode_document(r#"{"version": 1}"#).unwrap_err(),
            ReplayError::Parse(_)
        ));
    }

    #[test]
    fn test_zero_rotation_rejected() {
        let json = r#"{"version": 1, "keyframes": [{"user_transforms": [
            {"name": "agent", "transform": {"translation": [0, 0, 0], "rotation": [0, 0, 0, 0]}}
        ]}]}"#;
        assert!(matches!(
            decode_document(json).unwrap_err(),
            ReplayError::Parse(_)
        ));
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("replay.json");
        let log = sample_log();

        write_log_to_document(&log, &ReplayMetadata::default(), &path, DocumentEncoding::Json)
            .unwrap();
        assert!(!dir.path().join("nested").join("replay.json.tmp").exists());

        let doc = read_log_from_document(&path).unwrap();
        assert_eq!(doc.keyframes, log);
    }

    #[test]
    fn test_invalid_log_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("replay.json");
        let log = KeyframeLog::from(vec![Keyframe {
            deletions: vec![RenderInstanceId(1)],
            ..Default::default()
        }]);

        assert!(
            write_log_to_document(&log, &ReplayMetadata::default(), &path, DocumentEncoding::Json)
                .is_err()
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_log_from_document(dir.path().join("absent.json")).unwrap_err(),
            ReplayError::Io(_)
        ));
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn test_lz4_roundtrip() {
        let log = sample_log();
        let bytes = encode_bytes(&log, &ReplayMetadata::default(), DocumentEncoding::JsonLz4).unwrap();
        assert!(bytes.starts_with(LZ4_MAGIC));
        let doc = decode_bytes(&bytes).unwrap();
        assert_eq!(doc.keyframes, log);
    }

    #[cfg(not(feature = "lz4"))]
    #[test]
    fn test_lz4_unavailable() {
        let err = encode_bytes(&sample_log(), &ReplayMetadata::default(), DocumentEncoding::JsonLz4)
            .unwrap_err();
        assert!(matches!(err, ReplayError::CompressionUnavailable));

        let mut bytes = LZ4_MAGIC.to_vec();
        bytes.extend_from_slice(b"\x00\x00\x00\x00");
        assert!(matches!(
            decode_bytes(&bytes).unwrap_err(),
            ReplayError::CompressionUnavailable
        ));
    }
}
