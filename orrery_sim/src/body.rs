// Bodies: every node of the celestial hierarchy.
//
// A `Body` carries the fields common to all celestial objects (mass, radius,
// color, orbit parameters) plus a `BodyKind` sum type tagged by `bodyType` on
// the wire. Each variant carries only its own payload, so a star with a
// black-hole payload or a moon with a ring cannot be represented.
//
// Variants and payloads:
// - `Star`: spectral class + luminosity.
// - `Planet`: optional `Ring`.
// - `Moon`, `Asteroid`: no payload.
// - `Comet`: eccentricity, tail length, activity.
// - `BlackHole`: spin, shadow radius, accretion disk radii, jets.
// - `LagrangePoint`: references a primary and a secondary body; its position
//                     is computed (see `kinematics.rs`), never stored.
// - `RoguePlanet`: drift velocity, optional `Ring`.
//
// `parent_id` and `children` are crate-private: the forest they encode is
// maintained exclusively by `hierarchy.rs`. External callers read them through
// accessors and change them only by submitting commands.
//
// Payload invariants live in `BodyKind::validate` / `Ring::validate` and are
// enforced by the reducer (rejected with an `invalidPayload` event).
// `BodyPatch` mirrors the flattened wire shape of `Body`, so an `updateBody`
// patch names payloads by the same keys a snapshot uses.
//
// See also: `hierarchy.rs`, `reducer.rs`, `patch.rs`, `kinematics.rs`.

use crate::patch::patch_struct;
use crate::types::{BodyId, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

/// Child list of a body. Most bodies have a handful of children at most.
pub type ChildList = SmallVec<[BodyId; 4]>;

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Morgan–Keenan spectral class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpectralClass {
    O,
    B,
    A,
    F,
    G,
    K,
    M,
}

impl SpectralClass {
    /// Main-sequence class for a mass in solar masses.
    pub fn from_solar_mass(mass: f64) -> Self {
        match mass {
            m if m >= 16.0 => SpectralClass::O,
            m if m >= 2.1 => SpectralClass::B,
            m if m >= 1.4 => SpectralClass::A,
            m if m >= 1.04 => SpectralClass::F,
            m if m >= 0.8 => SpectralClass::G,
            m if m >= 0.45 => SpectralClass::K,
            _ => SpectralClass::M,
        }
    }

    /// Display color for the class.
    pub fn color(self) -> &'static str {
        match self {
            SpectralClass::O => "#9bb0ff",
            SpectralClass::B => "#aabfff",
            SpectralClass::A => "#cad7ff",
            SpectralClass::F => "#f8f7ff",
            SpectralClass::G => "#fff4ea",
            SpectralClass::K => "#ffd2a1",
            SpectralClass::M => "#ffcc6f",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarData {
    pub spectral_class: SpectralClass,
    /// Luminosity in solar units.
    pub luminosity: f64,
}

impl StarData {
    /// Main-sequence approximation: L ∝ M^3.5.
    pub fn from_solar_mass(mass: f64) -> Self {
        Self {
            spectral_class: SpectralClass::from_solar_mass(mass),
            luminosity: mass.max(0.0).powf(3.5),
        }
    }
}

/// A planetary ring. Radii are multiples of the host body's radius.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ring {
    pub inner_radius_multiplier: f64,
    pub outer_radius_multiplier: f64,
    pub color: String,
    pub opacity: f64,
    pub thickness: f64,
}

impl Ring {
    /// Default ring for a host that has none yet, derived from its radius and
    /// color.
    pub fn default_for_host(host_radius: f64, host_color: &str) -> Self {
        Self {
            inner_radius_multiplier: 1.4,
            outer_radius_multiplier: 2.3,
            color: host_color.to_string(),
            opacity: 0.7,
            thickness: host_radius * 0.02,
        }
    }

    pub fn validate(&self) -> Result<(), PayloadError> {
        let (inner, outer) = (self.inner_radius_multiplier, self.outer_radius_multiplier);
        if !(inner.is_finite() && outer.is_finite()) || inner <= 0.0 || inner >= outer {
            return Err(PayloadError::RingRadii { inner, outer });
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(PayloadError::OutOfRange {
                field: "ring.opacity",
                value: self.opacity,
            });
        }
        Ok(())
    }
}

patch_struct! {
    /// Shallow patch for a `Ring`.
    pub struct RingPatch for Ring {
        inner_radius_multiplier: f64,
        outer_radius_multiplier: f64,
        color: String,
        opacity: f64,
        thickness: f64,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CometData {
    pub eccentricity: f64,
    /// Tail length in the same units as orbital distance.
    pub tail_length: f64,
    /// Outgassing activity in [0, 1]; drives tail brightness.
    pub activity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackHoleData {
    /// Dimensionless spin parameter in [0, 1).
    pub spin: f64,
    pub shadow_radius: f64,
    pub accretion_inner_radius: f64,
    pub accretion_outer_radius: f64,
    #[serde(default)]
    pub has_jets: bool,
}

/// Which of the five Lagrange points a marker represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LagrangePointKind {
    L1,
    L2,
    L3,
    L4,
    L5,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LagrangeData {
    pub primary_id: BodyId,
    pub secondary_id: BodyId,
    pub point: LagrangePointKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RogueData {
    /// Constant drift in universe units per time unit.
    pub drift_velocity: Vec3,
}

// ---------------------------------------------------------------------------
// BodyKind
// ---------------------------------------------------------------------------

/// The variant-specific part of a body, tagged `bodyType` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bodyType", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BodyKind {
    Star {
        star: StarData,
    },
    Planet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ring: Option<Ring>,
    },
    Moon,
    Asteroid,
    Comet {
        comet: CometData,
    },
    BlackHole {
        black_hole: BlackHoleData,
    },
    LagrangePoint {
        lagrange: LagrangeData,
    },
    RoguePlanet {
        rogue: RogueData,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ring: Option<Ring>,
    },
}

/// Payload-free discriminant of `BodyKind`, for counting and filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyType {
    Star,
    Planet,
    Moon,
    Asteroid,
    Comet,
    BlackHole,
    LagrangePoint,
    RoguePlanet,
}

impl BodyKind {
    pub fn body_type(&self) -> BodyType {
        match self {
            BodyKind::Star { .. } => BodyType::Star,
            BodyKind::Planet { .. } => BodyType::Planet,
            BodyKind::Moon => BodyType::Moon,
            BodyKind::Asteroid => BodyType::Asteroid,
            BodyKind::Comet { .. } => BodyType::Comet,
            BodyKind::BlackHole { .. } => BodyType::BlackHole,
            BodyKind::LagrangePoint { .. } => BodyType::LagrangePoint,
            BodyKind::RoguePlanet { .. } => BodyType::RoguePlanet,
        }
    }

    /// The ring, if this variant can carry one and has one.
    pub fn ring(&self) -> Option<&Ring> {
        match self {
            BodyKind::Planet { ring } | BodyKind::RoguePlanet { ring, .. } => ring.as_ref(),
            _ => None,
        }
    }

    /// The ring slot for variants that can carry a ring; `None` otherwise.
    pub fn ring_slot_mut(&mut self) -> Option<&mut Option<Ring>> {
        match self {
            BodyKind::Planet { ring } | BodyKind::RoguePlanet { ring, .. } => Some(ring),
            _ => None,
        }
    }

    pub fn lagrange(&self) -> Option<&LagrangeData> {
        match self {
            BodyKind::LagrangePoint { lagrange } => Some(lagrange),
            _ => None,
        }
    }

    /// Stars and black holes anchor planetary systems.
    pub fn is_stellar(&self) -> bool {
        matches!(self, BodyKind::Star { .. } | BodyKind::BlackHole { .. })
    }

    /// Check the variant's self-contained invariants. References to other
    /// bodies (Lagrange primary/secondary) are checked by the reducer, which
    /// has the whole state.
    pub fn validate(&self) -> Result<(), PayloadError> {
        match self {
            BodyKind::Planet { ring: Some(ring) }
            | BodyKind::RoguePlanet {
                ring: Some(ring), ..
            } => ring.validate(),
            BodyKind::BlackHole { black_hole: bh } => {
                if !(0.0..1.0).contains(&bh.spin) {
                    return Err(PayloadError::OutOfRange {
                        field: "blackHole.spin",
                        value: bh.spin,
                    });
                }
                if !(bh.accretion_inner_radius > bh.shadow_radius) {
                    return Err(PayloadError::AccretionInsideShadow {
                        inner: bh.accretion_inner_radius,
                        shadow: bh.shadow_radius,
                    });
                }
                if !(bh.accretion_outer_radius > bh.accretion_inner_radius) {
                    return Err(PayloadError::AccretionOuterRadius {
                        inner: bh.accretion_inner_radius,
                        outer: bh.accretion_outer_radius,
                    });
                }
                Ok(())
            }
            BodyKind::Comet { comet } => {
                if !(0.0..1.0).contains(&comet.eccentricity) {
                    return Err(PayloadError::OutOfRange {
                        field: "comet.eccentricity",
                        value: comet.eccentricity,
                    });
                }
                Ok(())
            }
            BodyKind::LagrangePoint { lagrange } => {
                if lagrange.primary_id == lagrange.secondary_id {
                    return Err(PayloadError::LagrangeSelfReference(
                        lagrange.primary_id.clone(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// A variant payload or physical field violates its invariant.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PayloadError {
    #[error("ring inner radius multiplier {inner} must be positive and below outer {outer}")]
    RingRadii { inner: f64, outer: f64 },
    #[error("accretion disk inner radius {inner} must exceed shadow radius {shadow}")]
    AccretionInsideShadow { inner: f64, shadow: f64 },
    #[error("accretion disk outer radius {outer} must exceed inner radius {inner}")]
    AccretionOuterRadius { inner: f64, outer: f64 },
    #[error("lagrange point uses {0} as both primary and secondary")]
    LagrangeSelfReference(BodyId),
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("a {body_type:?} body needs a {key} payload")]
    MissingPayload { body_type: BodyType, key: &'static str },
    #[error("{key} payload does not apply to a {body_type:?} body")]
    PayloadMismatch { key: &'static str, body_type: BodyType },
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// A celestial body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub id: BodyId,
    pub name: String,
    #[serde(default)]
    pub(crate) parent_id: Option<BodyId>,
    #[serde(default)]
    pub(crate) children: ChildList,
    pub mass: f64,
    pub radius: f64,
    pub color: String,
    /// Absolute position. Only meaningful for roots; orbiting bodies are
    /// placed relative to their parent.
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub orbital_distance: f64,
    /// Degrees per time unit.
    #[serde(default)]
    pub orbital_speed: f64,
    /// Degrees.
    #[serde(default)]
    pub orbital_phase: f64,
    /// Degrees.
    #[serde(default)]
    pub orbital_inclination: f64,
    #[serde(flatten)]
    pub kind: BodyKind,
}

impl Body {
    pub fn parent_id(&self) -> Option<&BodyId> {
        self.parent_id.as_ref()
    }

    pub fn children(&self) -> &[BodyId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn body_type(&self) -> BodyType {
        self.kind.body_type()
    }

    /// Check physical fields and the variant payload.
    pub fn validate(&self) -> Result<(), PayloadError> {
        for (field, value) in [
            ("mass", self.mass),
            ("radius", self.radius),
            ("orbitalDistance", self.orbital_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PayloadError::OutOfRange { field, value });
            }
        }
        self.kind.validate()
    }
}

/// The `addBody` payload: a body without its derived child list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBody {
    pub id: BodyId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<BodyId>,
    pub mass: f64,
    pub radius: f64,
    pub color: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub orbital_distance: f64,
    #[serde(default)]
    pub orbital_speed: f64,
    #[serde(default)]
    pub orbital_phase: f64,
    #[serde(default)]
    pub orbital_inclination: f64,
    #[serde(flatten)]
    pub kind: BodyKind,
}

impl NewBody {
    /// A body at rest with unit mass and radius; tests and callers fill in
    /// the rest with struct update syntax.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: BodyKind) -> Self {
        Self {
            id: BodyId::new(id),
            name: name.into(),
            parent_id: None,
            mass: 1.0,
            radius: 1.0,
            color: "#ffffff".to_string(),
            position: Vec3::ZERO,
            orbital_distance: 0.0,
            orbital_speed: 0.0,
            orbital_phase: 0.0,
            orbital_inclination: 0.0,
            kind,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(BodyId::new(parent));
        self
    }
}

impl From<NewBody> for Body {
    fn from(new: NewBody) -> Self {
        Self {
            id: new.id,
            name: new.name,
            parent_id: new.parent_id,
            children: ChildList::new(),
            mass: new.mass,
            radius: new.radius,
            color: new.color,
            position: new.position,
            orbital_distance: new.orbital_distance,
            orbital_speed: new.orbital_speed,
            orbital_phase: new.orbital_phase,
            orbital_inclination: new.orbital_inclination,
            kind: new.kind,
        }
    }
}

/// Shallow patch for a `Body`, shaped like a `Body` on the wire: common
/// fields plus the flattened `bodyType` tag and payload keys. Structure
/// fields are not patchable and unknown keys are rejected.
///
/// A payload key without `bodyType` replaces that payload on the body's
/// current variant. With `bodyType`, the variant changes; payloads the new
/// variant requires come from the patch or, when the variant is unchanged,
/// from the body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BodyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_phase: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_inclination: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<BodyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star: Option<StarData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ring: Option<Ring>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comet: Option<CometData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_hole: Option<BlackHoleData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lagrange: Option<LagrangeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rogue: Option<RogueData>,
}

/// The patched payload if present, else the body's own, else an error.
fn payload<T: Clone>(
    patched: &Option<T>,
    current: Option<&T>,
    body_type: BodyType,
    key: &'static str,
) -> Result<T, PayloadError> {
    patched
        .clone()
        .or_else(|| current.cloned())
        .ok_or(PayloadError::MissingPayload { body_type, key })
}

impl BodyPatch {
    /// Overwrite every field present in the patch. On error the body is left
    /// untouched.
    pub fn apply_to(&self, target: &mut Body) -> Result<(), PayloadError> {
        let kind = self.patched_kind(&target.kind)?;
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(color) = &self.color {
            target.color = color.clone();
        }
        if let Some(position) = self.position {
            target.position = position;
        }
        for (slot, value) in [
            (&mut target.mass, self.mass),
            (&mut target.radius, self.radius),
            (&mut target.orbital_distance, self.orbital_distance),
            (&mut target.orbital_speed, self.orbital_speed),
            (&mut target.orbital_phase, self.orbital_phase),
            (&mut target.orbital_inclination, self.orbital_inclination),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(kind) = kind {
            target.kind = kind;
        }
        Ok(())
    }

    /// True when the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn has_payload(&self) -> bool {
        self.star.is_some()
            || self.ring.is_some()
            || self.comet.is_some()
            || self.black_hole.is_some()
            || self.lagrange.is_some()
            || self.rogue.is_some()
    }

    /// The variant after patching; `None` when the patch leaves it alone.
    fn patched_kind(&self, current: &BodyKind) -> Result<Option<BodyKind>, PayloadError> {
        if self.body_type.is_none() && !self.has_payload() {
            return Ok(None);
        }
        let body_type = self.body_type.unwrap_or_else(|| current.body_type());
        let ringed = matches!(body_type, BodyType::Planet | BodyType::RoguePlanet);
        for (key, present, allowed) in [
            ("star", self.star.is_some(), body_type == BodyType::Star),
            ("ring", self.ring.is_some(), ringed),
            ("comet", self.comet.is_some(), body_type == BodyType::Comet),
            ("blackHole", self.black_hole.is_some(), body_type == BodyType::BlackHole),
            ("lagrange", self.lagrange.is_some(), body_type == BodyType::LagrangePoint),
            ("rogue", self.rogue.is_some(), body_type == BodyType::RoguePlanet),
        ] {
            if present && !allowed {
                return Err(PayloadError::PayloadMismatch { key, body_type });
            }
        }

        let ring = self.ring.clone().or_else(|| current.ring().cloned());
        let kind = match body_type {
            BodyType::Star => {
                let own = match current {
                    BodyKind::Star { star } => Some(star),
                    _ => None,
                };
                BodyKind::Star {
                    star: payload(&self.star, own, body_type, "star")?,
                }
            }
            BodyType::Planet => BodyKind::Planet { ring },
            BodyType::Moon => BodyKind::Moon,
            BodyType::Asteroid => BodyKind::Asteroid,
            BodyType::Comet => {
                let own = match current {
                    BodyKind::Comet { comet } => Some(comet),
                    _ => None,
                };
                BodyKind::Comet {
                    comet: payload(&self.comet, own, body_type, "comet")?,
                }
            }
            BodyType::BlackHole => {
                let own = match current {
                    BodyKind::BlackHole { black_hole } => Some(black_hole),
                    _ => None,
                };
                BodyKind::BlackHole {
                    black_hole: payload(&self.black_hole, own, body_type, "blackHole")?,
                }
            }
            BodyType::LagrangePoint => BodyKind::LagrangePoint {
                lagrange: payload(&self.lagrange, current.lagrange(), body_type, "lagrange")?,
            },
            BodyType::RoguePlanet => {
                let own = match current {
                    BodyKind::RoguePlanet { rogue, .. } => Some(rogue),
                    _ => None,
                };
                BodyKind::RoguePlanet {
                    rogue: payload(&self.rogue, own, body_type, "rogue")?,
                    ring,
                }
            }
        };
        Ok(Some(kind))
    }

    /// Drop position and orbit fields. Lagrange markers are positioned by
    /// computation, so patches may not move them.
    pub fn without_motion(&self) -> Self {
        Self {
            position: None,
            orbital_distance: None,
            orbital_speed: None,
            orbital_phase: None,
            orbital_inclination: None,
            ..self.clone()
        }
    }
}
