// Particle-field entities: belts, small-body fields, protoplanetary disks,
// nebulae.
//
// These are visual/statistical entities rather than members of the body
// forest. Each is keyed independently in its own `UniverseState` map, carries
// a particle count and a `seed` the renderer uses to scatter particles, and
// (except nebulae) names the host body it surrounds. Host references are
// informational: removing a host body does not remove its fields.
//
// See also: `state.rs` for the maps, `stats.rs` for particle totals,
// `generator.rs` for how fields are placed.

use crate::patch::patch_struct;
use crate::types::{BodyId, FieldId, Vec3};
use serde::{Deserialize, Serialize};

/// Anything the renderer draws as a cloud of particles.
pub trait ParticleField {
    fn particle_count(&self) -> u64;
}

/// An asteroid belt between (or beyond) planetary orbits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Belt {
    pub id: FieldId,
    pub host_body_id: BodyId,
    pub name: String,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub thickness: f64,
    pub particle_count: u64,
    pub color: String,
    pub seed: u32,
}

/// Morphology of a `SmallBodyField`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldStyle {
    #[default]
    KuiperBelt,
    ScatteredDisk,
    OortCloud,
}

/// A diffuse field of icy bodies beyond the outermost orbit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallBodyField {
    pub id: FieldId,
    pub host_body_id: BodyId,
    pub name: String,
    #[serde(default)]
    pub style: FieldStyle,
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Degrees of vertical scatter around the host's equator.
    pub inclination_spread: f64,
    pub particle_count: u64,
    pub color: String,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    pub seed: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoplanetaryDisk {
    pub id: FieldId,
    pub host_body_id: BodyId,
    pub name: String,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub thickness: f64,
    pub particle_count: u64,
    pub inner_color: String,
    pub outer_color: String,
    pub brightness: f64,
    /// Degrees per time unit.
    pub rotation_speed: f64,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    pub seed: u32,
}

/// A free-standing gas cloud positioned in universe space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nebula {
    pub id: FieldId,
    pub name: String,
    pub position: Vec3,
    pub radius: f64,
    pub density: f64,
    pub particle_count: u64,
    pub colors: Vec<String>,
    pub noise_scale: f64,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    pub seed: u32,
}

fn visible_by_default() -> bool {
    true
}

impl ParticleField for Belt {
    fn particle_count(&self) -> u64 {
        self.particle_count
    }
}

impl ParticleField for SmallBodyField {
    fn particle_count(&self) -> u64 {
        self.particle_count
    }
}

impl ParticleField for ProtoplanetaryDisk {
    fn particle_count(&self) -> u64 {
        self.particle_count
    }
}

impl ParticleField for Nebula {
    fn particle_count(&self) -> u64 {
        self.particle_count
    }
}

/// Sum of particle counts over any collection of fields, saturating at
/// `u64::MAX`. Counts arrive unchecked through `set*` commands.
pub fn total_particles<'a, F, I>(fields: I) -> u64
where
    F: ParticleField + 'a,
    I: IntoIterator<Item = &'a F>,
{
    fields
        .into_iter()
        .map(ParticleField::particle_count)
        .fold(0, u64::saturating_add)
}

patch_struct! {
    pub struct SmallBodyFieldPatch for SmallBodyField {
        name: String,
        style: FieldStyle,
        inner_radius: f64,
        outer_radius: f64,
        inclination_spread: f64,
        particle_count: u64,
        color: String,
        visible: bool,
    }
}

patch_struct! {
    pub struct ProtoplanetaryDiskPatch for ProtoplanetaryDisk {
        name: String,
        inner_radius: f64,
        outer_radius: f64,
        thickness: f64,
        particle_count: u64,
        inner_color: String,
        outer_color: String,
        brightness: f64,
        rotation_speed: f64,
        visible: bool,
    }
}

patch_struct! {
    pub struct NebulaPatch for Nebula {
        name: String,
        position: Vec3,
        radius: f64,
        density: f64,
        particle_count: u64,
        colors: Vec<String>,
        noise_scale: f64,
        visible: bool,
    }
}
