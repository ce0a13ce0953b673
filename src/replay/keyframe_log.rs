//! Append-only keyframe sequence.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Reference, ReplayError, Result};
use crate::schema::{AssetInfo, Creation, Keyframe, RenderInstanceId, Transform};

/// Position of a record inside a log: keyframe index and slot in its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordRef {
    pub keyframe: usize,
    pub slot: usize,
}

/// Ordered keyframe sequence.
///
/// Keyframes are addressed by position only. The log grows by [`append`]
/// during recording and is read-only afterwards; there is no removal.
///
/// [`append`]: KeyframeLog::append
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyframeLog {
    keyframes: Vec<Keyframe>,
}

impl KeyframeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyframe, returning its index.
    pub fn append(&mut self, keyframe: Keyframe) -> usize {
        self.keyframes.push(keyframe);
        self.keyframes.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe> {
        self.keyframes.iter()
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn into_keyframes(self) -> Vec<Keyframe> {
        self.keyframes
    }

    /// Creation record at `at`.
    pub fn creation(&self, at: RecordRef) -> Option<&Creation> {
        self.keyframes.get(at.keyframe)?.creations.get(at.slot)
    }

    /// Asset load record at `at`.
    pub fn asset(&self, at: RecordRef) -> Option<&AssetInfo> {
        self.keyframes.get(at.keyframe)?.loads.get(at.slot)
    }

    /// Check that the log folds cleanly from an empty scene.
    ///
    /// Rejects records naming instances that are not live, creation of a
    /// live or previously deleted id, more than one update per instance or
    /// user transform per name within a keyframe, transforms that are
    /// non-finite or carry a non-unit rotation, and non-finite times.
    pub fn validate(&self) -> Result<()> {
        let mut live: HashSet<RenderInstanceId> = HashSet::new();
        let mut retired: HashSet<RenderInstanceId> = HashSet::new();

        for (k, keyframe) in self.keyframes.iter().enumerate() {
            let malformed = |reason: String| ReplayError::MalformedLog {
                keyframe: k,
                reason,
            };
            let missing = |instance| {
                ReplayError::InvalidReference(Reference::Instance {
                    keyframe: k,
                    instance,
                })
            };

            if let Some(time) = keyframe.time.filter(|t| !t.is_finite()) {
                return Err(malformed(format!("time {time} is not finite")));
            }

            for creation in &keyframe.creations {
                if let Some(problem) = transform_problem(&creation.transform) {
                    return Err(malformed(format!("{} {problem}", creation.instance)));
                }
                if retired.contains(&creation.instance) {
                    return Err(ReplayError::InstanceIdReused(creation.instance));
                }
                if !live.insert(creation.instance) {
                    return Err(malformed(format!("{} is created while live", creation.instance)));
                }
            }

            for &instance in &keyframe.deletions {
                if !live.remove(&instance) {
                    return Err(missing(instance));
                }
                retired.insert(instance);
            }

            let mut updated = HashSet::new();
            for update in &keyframe.state_updates {
                if !live.contains(&update.instance) {
                    return Err(missing(update.instance));
                }
                if !updated.insert(update.instance) {
                    return Err(malformed(format!(
                        "{} has more than one state update",
                        update.instance
                    )));
                }
                if let Some(problem) = transform_problem(&update.transform) {
                    return Err(malformed(format!("{} {problem}", update.instance)));
                }
            }

            let mut names = HashSet::new();
            for user in &keyframe.user_transforms {
                if !names.insert(user.name.as_str()) {
                    return Err(malformed(format!(
                        "user transform `{}` is set more than once",
                        user.name
                    )));
                }
                if let Some(problem) = transform_problem(&user.transform) {
                    return Err(malformed(format!("user transform `{}` {problem}", user.name)));
                }
            }
        }
        Ok(())
    }

    /// Aggregate record counts.
    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary {
            keyframes: self.keyframes.len(),
            ..Default::default()
        };
        for keyframe in &self.keyframes {
            if keyframe.is_empty() {
                summary.empty_keyframes += 1;
            }
            summary.loads += keyframe.loads.len();
            summary.creations += keyframe.creations.len();
            summary.deletions += keyframe.deletions.len();
            summary.state_updates += keyframe.state_updates.len();
            summary
                .user_transform_names
                .extend(keyframe.user_transforms.iter().map(|u| u.name.clone()));
        }
        summary
    }
}

/// Why `transform` cannot appear in a log, if anything.
fn transform_problem(transform: &Transform) -> Option<&'static str> {
    if !transform.is_finite() {
        Some("has a non-finite transform")
    } else if !transform.rotation.is_normalized() {
        Some("has a non-unit rotation")
    } else {
        None
    }
}

impl From<Vec<Keyframe>> for KeyframeLog {
    fn from(keyframes: Vec<Keyframe>) -> Self {
        Self { keyframes }
    }
}

impl std::ops::Index<usize> for KeyframeLog {
    type Output = Keyframe;

    fn index(&self, index: usize) -> &Keyframe {
        &self.keyframes[index]
    }
}

impl<'a> IntoIterator for &'a KeyframeLog {
    type Item = &'a Keyframe;
    type IntoIter = std::slice::Iter<'a, Keyframe>;

    fn into_iter(self) -> Self::IntoIter {
        self.keyframes.iter()
    }
}

/// Record counts of a keyframe log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSummary {
    pub keyframes: usize,
    pub empty_keyframes: usize,
    pub loads: usize,
    pub creations: usize,
    pub deletions: usize,
    pub state_updates: usize,
    pub user_transform_names: BTreeSet<String>,
}

impl fmt::Display for LogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} keyframes ({} empty), {} loads, {} creations, {} deletions, {} state updates",
            self.keyframes,
            self.empty_keyframes,
            self.loads,
            self.creations,
            self.deletions,
            self.state_updates
        )?;
        if !self.user_transform_names.is_empty() {
            let names: Vec<_> = self.user_transform_names.iter().map(String::as_str).collect();
            write!(f, ", user transforms: {}", names.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Quat, StateUpdate, UserTransform, Vec3};

    fn create(id: u64) -> Creation {
        Creation {
            instance: RenderInstanceId(id),
            asset: "box.glb".into(),
            transform: Transform::IDENTITY,
            scale: None,
            semantic_id: None,
            light_setup_key: None,
        }
    }

    fn update(id: u64, x: f32) -> StateUpdate {
        StateUpdate {
            instance: RenderInstanceId(id),
            transform: Transform::from_translation(Vec3::new(x, 0.0, 0.0)),
            semantic_id: None,
        }
    }

    #[test]
    fn test_append_and_get() {
        let mut log = KeyframeLog::new();
        assert_eq!(log.append(Keyframe::default()), 0);
        assert_eq!(log.append(Keyframe::default()), 1);
        assert_eq!(log.len(), 2);
        assert!(log.get(1).is_some());
        assert!(log.get(2).is_none());
    }

    #[test]
    fn test_valid_log() {
        let log = KeyframeLog::from(vec![
            Keyframe {
                creations: vec![create(1)],
                ..Default::default()
            },
            Keyframe {
                state_updates: vec![update(1, 2.0)],
                ..Default::default()
            },
            Keyframe {
                deletions: vec![RenderInstanceId(1)],
                ..Default::default()
            },
        ]);
        assert!(log.validate().is_ok());
    }

    #[test]
    fn test_update_after_deletion_rejected() {
        let log = KeyframeLog::from(vec![
            Keyframe {
                creations: vec![create(1)],
                ..Default::default()
            },
            Keyframe {
                deletions: vec![RenderInstanceId(1)],
                ..Default::default()
            },
            Keyframe {
                state_updates: vec![update(1, 2.0)],
                ..Default::default()
            },
        ]);
        let err = log.validate().unwrap_err();
        assert!(matches!(
            err,
            ReplayError::InvalidReference(Reference::Instance {
                keyframe: 2,
                instance: RenderInstanceId(1)
            })
        ));
    }

    #[test]
    fn test_id_reuse_rejected() {
        let log = KeyframeLog::from(vec![
            Keyframe {
                creations: vec![create(4)],
                ..Default::default()
            },
            Keyframe {
                deletions: vec![RenderInstanceId(4)],
                ..Default::default()
            },
            Keyframe {
                creations: vec![create(4)],
                ..Default::default()
            },
        ]);
        assert!(matches!(
            log.validate(),
            Err(ReplayError::InstanceIdReused(RenderInstanceId(4)))
        ));
    }

    #[test]
    fn test_duplicate_records_rejected() {
        let log = KeyframeLog::from(vec![Keyframe {
            creations: vec![create(1), create(1)],
            ..Default::default()
        }]);
        assert!(matches!(
            log.validate(),
            Err(ReplayError::MalformedLog { keyframe: 0, .. })
        ));

        let log = KeyframeLog::from(vec![
            Keyframe {
                creations: vec![create(1)],
                ..Default::default()
            },
            Keyframe {
                state_updates: vec![update(1, 1.0), update(1, 2.0)],
                ..Default::default()
            },
        ]);
        assert!(matches!(
            log.validate(),
            Err(ReplayError::MalformedLog { keyframe: 1, .. })
        ));

        let agent = UserTransform {
            name: "agent".into(),
            transform: Transform::IDENTITY,
        };
        let log = KeyframeLog::from(vec![Keyframe {
            user_transforms: vec![agent.clone(), agent],
            ..Default::default()
        }]);
        assert!(log.validate().is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut bad = update(1, 0.0);
        bad.transform.translation.y = f32::INFINITY;
        let log = KeyframeLog::from(vec![
            Keyframe {
                creations: vec![create(1)],
                ..Default::default()
            },
            Keyframe {
                state_updates: vec![bad],
                ..Default::default()
            },
        ]);
        assert!(matches!(
            log.validate(),
            Err(ReplayError::MalformedLog { keyframe: 1, .. })
        ));
    }

    #[test]
    fn test_non_unit_rotation_rejected() {
        let mut spun = create(1);
        spun.transform.rotation = Quat::new(0.0, 0.0, 0.0, 2.0);
        let log = KeyframeLog::from(vec![Keyframe {
            creations: vec![spun],
            ..Default::default()
        }]);
        match log.validate().unwrap_err() {
            ReplayError::MalformedLog { keyframe, reason } => {
                assert_eq!(keyframe, 0);
                assert!(reason.contains("non-unit rotation"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let log = KeyframeLog::from(vec![Keyframe {
            user_transforms: vec![UserTransform {
                name: "agent".into(),
                transform: Transform {
                    translation: Vec3::ZERO,
                    rotation: Quat::new(0.0, 0.5, 0.0, 0.5),
                },
            }],
            ..Default::default()
        }]);
        assert!(matches!(
            log.validate(),
            Err(ReplayError::MalformedLog { keyframe: 0, .. })
        ));
    }

    #[test]
    fn test_non_finite_time_rejected() {
        for time in [f64::NAN, f64::INFINITY] {
            let log = KeyframeLog::from(vec![
                Keyframe {
                    time: Some(0.0),
                    ..Default::default()
                },
                Keyframe {
                    time: Some(time),
                    ..Default::default()
                },
            ]);
            assert!(matches!(
                log.validate(),
                Err(ReplayError::MalformedLog { keyframe: 1, .. })
            ));
        }
    }

    #[test]
    fn test_summary() {
        let log = KeyframeLog::from(vec![
            Keyframe {
                creations: vec![create(1), create(2)],
                user_transforms: vec![UserTransform {
                    name: "sensor".into(),
                    transform: Transform::IDENTITY,
                }],
                ..Default::default()
            },
            Keyframe::default(),
        ]);
        let summary = log.summary();
        assert_eq!(summary.keyframes, 2);
        assert_eq!(summary.empty_keyframes, 1);
        assert_eq!(summary.creations, 2);
        assert!(summary.to_string().contains("user transforms: sensor"));
    }
}
