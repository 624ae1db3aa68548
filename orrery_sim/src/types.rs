// Core types shared across the universe model.
//
// Defines the spatial vector (`Vec3`) and strongly-typed entity identifiers.
// IDs are plain strings on the wire (callers may submit `"s1"` or a UUID)
// wrapped in distinct newtypes so a `GroupId` can never be passed where a
// `BodyId` is expected. All types derive `Serialize`/`Deserialize` and
// serialize transparently, so IDs work as JSON object keys.
//
// Generated IDs are RFC 4122 v4 UUID strings drawn from a `SeededRng`
// (see `generator.rs`), never from OS entropy.
//
// **Critical constraint: determinism.** Entity IDs created by the generator
// come from the PRNG sub-stream handed to it. Do not use external UUID
// libraries or system randomness.

use crate::prng::SeededRng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::{Add, Mul, Sub};

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A point or offset in universe space.
///
/// Right-handed, Y up. Orbits lie in the XZ plane before inclination is
/// applied (see `kinematics.rs`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 { self * (1.0 / len) } else { Vec3::ZERO }
    }

    /// Rotate around the Y axis by `radians`.
    pub fn rotated_y(self, radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Vec3::new(self.x * c - self.z * s, self.y, self.x * s + self.z * c)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Deterministic UUID v4 strings
// ---------------------------------------------------------------------------

/// Draw a UUID v4 in 8-4-4-4-12 hex form from the PRNG.
///
/// Four PRNG words form one 128-bit value, first word most significant.
/// Layout follows RFC 4122, counting from the most significant bit: version
/// nibble (bits 48–51) set to `0100` and variant bits (bits 64–65) set to `10`.
pub fn uuid_v4(rng: &mut SeededRng) -> String {
    let mut bits = (0..4).fold(0u128, |acc, _| (acc << 32) | u128::from(rng.next_u32()));
    // Version nibble to 0100.
    bits = (bits & !(0xF << 76)) | (0x4 << 76);
    // Variant bits to 10.
    bits = (bits & !(0x3 << 62)) | (0x2 << 62);
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        bits >> 96,
        (bits >> 80) & 0xFFFF,
        (bits >> 64) & 0xFFFF,
        (bits >> 48) & 0xFFFF,
        bits & 0xFFFF_FFFF_FFFF,
    )
}

// ---------------------------------------------------------------------------
// Strongly-typed entity ID wrappers
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// A fresh UUID-form ID drawn from `rng`.
            pub fn generate(rng: &mut SeededRng) -> Self {
                Self(uuid_v4(rng))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(/// Unique identifier for a body (star, planet, moon, ...).
BodyId);
entity_id!(/// Unique identifier for a group of systems.
GroupId);
entity_id!(/// Unique identifier for a particle-field entity (belt, field, disk, nebula).
FieldId);
