//! Rigid transform types stored in replay keyframes.

use serde::{Deserialize, Serialize};

/// Squared-length tolerance under which a quaternion is treated as unit.
///
/// Quaternions inside this band are stored untouched so that a value read
/// back from a document keeps its exact bit pattern.
const UNIT_TOLERANCE: f32 = 1e-6;

/// 3-component vector, serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Rotation quaternion, serialized as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about a unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Check if the quaternion is unit length (within tolerance).
    pub fn is_normalized(&self) -> bool {
        (self.length_squared() - 1.0).abs() <= UNIT_TOLERANCE
    }

    /// Unit-length copy of this quaternion.
    ///
    /// Returns `None` for zero-length or non-finite input. Already-unit
    /// quaternions are returned unchanged.
    pub fn normalized(self) -> Option<Self> {
        if !self.is_finite() {
            return None;
        }
        if self.is_normalized() {
            return Some(self);
        }
        let len = self.length_squared().sqrt();
        if len <= f32::EPSILON {
            return None;
        }
        Some(Self::new(
            self.x / len,
            self.y / len,
            self.z / len,
            self.w / len,
        ))
    }
}

impl From<[f32; 4]> for Quat {
    fn from([x, y, z, w]: [f32; 4]) -> Self {
        Self { x, y, z, w }
    }
}

impl From<Quat> for [f32; 4] {
    fn from(q: Quat) -> Self {
        [q.x, q.y, q.z, q.w]
    }
}

/// Rigid transform (translation + unit rotation).
///
/// The rotation is normalized on construction and on deserialization, so
/// every `Transform` in a keyframe holds a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTransform")]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a transform, normalizing `rotation`.
    ///
    /// A rotation that cannot be normalized (zero length, NaN) is replaced
    /// by identity.
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        let rotation = rotation.normalized().unwrap_or_else(|| {
            log::warn!("Degenerate rotation {:?} replaced by identity", rotation);
            Quat::IDENTITY
        });
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

/// Wire form of [`Transform`] before rotation validation.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTransform {
    translation: Vec3,
    rotation: Quat,
}

impl TryFrom<RawTransform> for Transform {
    type Error = String;

    fn try_from(raw: RawTransform) -> Result<Self, Self::Error> {
        let rotation = raw
            .rotation
            .normalized()
            .ok_or_else(|| format!("rotation {:?} cannot be normalized", raw.rotation))?;
        Ok(Self {
            translation: raw.translation,
            rotation,
        })
    }
}
