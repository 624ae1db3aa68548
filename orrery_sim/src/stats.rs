// Aggregate statistics over a snapshot.
//
// `compute_stats` is a pure function from a `UniverseState` to a flat
// `UniverseStats` record for display: counts per body type and feature,
// particle totals per field family, hierarchy shape (depth, branching
// averages) and min/avg/max summaries of a few physical quantities. It never
// mutates its input and uses no randomness.
//
// The generator attaches these stats to every `GeneratedUniverse`; callers
// may recompute them after applying commands.
//
// See also: `field.rs` for `ParticleField`, `generator.rs`.

use crate::body::{BodyKind, BodyType};
use crate::field::total_particles;
use crate::state::UniverseState;
use crate::types::BodyId;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Min / mean / max of a sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl Summary {
    /// `None` for an empty sample.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Summary {
            min,
            avg: sum / count as f64,
            max,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseStats {
    /// Root bodies other than rogue planets.
    pub system_count: usize,
    pub body_count: usize,
    /// Every body type appears, zero when absent.
    pub bodies_by_type: BTreeMap<BodyType, usize>,
    pub ringed_body_count: usize,

    pub group_count: usize,
    pub root_group_count: usize,
    /// Levels of group nesting; a lone root group has depth 1.
    pub max_group_depth: usize,

    pub belt_count: usize,
    pub small_body_field_count: usize,
    pub protoplanetary_disk_count: usize,
    pub nebula_count: usize,
    pub belt_particles: u64,
    pub small_body_field_particles: u64,
    pub protoplanetary_disk_particles: u64,
    pub nebula_particles: u64,
    pub total_particles: u64,

    /// Edges on the longest root-to-leaf path; 0 for a universe of roots.
    pub max_hierarchy_depth: usize,
    /// Planets orbiting a star or black hole, per star or black hole.
    pub avg_planets_per_star: f64,
    /// Moons orbiting a planet, per planet.
    pub avg_moons_per_planet: f64,

    pub black_hole_spin: Option<Summary>,
    pub star_mass: Option<Summary>,
    pub planet_mass: Option<Summary>,
}

const ALL_BODY_TYPES: [BodyType; 8] = [
    BodyType::Star,
    BodyType::Planet,
    BodyType::Moon,
    BodyType::Asteroid,
    BodyType::Comet,
    BodyType::BlackHole,
    BodyType::LagrangePoint,
    BodyType::RoguePlanet,
];

pub fn compute_stats(state: &UniverseState) -> UniverseStats {
    let bodies = state.bodies();

    let mut bodies_by_type: BTreeMap<BodyType, usize> =
        ALL_BODY_TYPES.iter().map(|&t| (t, 0)).collect();
    for body in bodies.values() {
        *bodies_by_type.entry(body.body_type()).or_default() += 1;
    }
    let count = |t: BodyType| bodies_by_type.get(&t).copied().unwrap_or(0);

    let parent_type = |id: &BodyId| -> Option<BodyType> {
        let parent = bodies.get(id)?.parent_id()?;
        bodies.get(parent).map(|p| p.body_type())
    };
    let planets_around_stars = bodies
        .values()
        .filter(|b| b.body_type() == BodyType::Planet)
        .filter(|b| matches!(parent_type(&b.id), Some(BodyType::Star | BodyType::BlackHole)))
        .count();
    let moons_around_planets = bodies
        .values()
        .filter(|b| b.body_type() == BodyType::Moon)
        .filter(|b| matches!(parent_type(&b.id), Some(BodyType::Planet | BodyType::RoguePlanet)))
        .count();
    let stellar = count(BodyType::Star) + count(BodyType::BlackHole);
    let planets = count(BodyType::Planet);
    let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };

    let belt_particles = total_particles(state.belts.values());
    let small_body_field_particles = total_particles(state.small_body_fields.values());
    let protoplanetary_disk_particles = total_particles(state.protoplanetary_disks.values());
    let nebula_particles = total_particles(state.nebulae.values());

    UniverseStats {
        system_count: state
            .root_body_ids()
            .iter()
            .filter_map(|id| bodies.get(id))
            .filter(|b| b.body_type() != BodyType::RoguePlanet)
            .count(),
        body_count: bodies.len(),
        ringed_body_count: bodies.values().filter(|b| b.kind.ring().is_some()).count(),

        group_count: state.groups().len(),
        root_group_count: state.root_group_ids().len(),
        max_group_depth: max_group_depth(state),

        belt_count: state.belts.len(),
        small_body_field_count: state.small_body_fields.len(),
        protoplanetary_disk_count: state.protoplanetary_disks.len(),
        nebula_count: state.nebulae.len(),
        belt_particles,
        small_body_field_particles,
        protoplanetary_disk_particles,
        nebula_particles,
        total_particles: [
            small_body_field_particles,
            protoplanetary_disk_particles,
            nebula_particles,
        ]
        .into_iter()
        .fold(belt_particles, u64::saturating_add),

        max_hierarchy_depth: max_body_depth(state),
        avg_planets_per_star: ratio(planets_around_stars, stellar),
        avg_moons_per_planet: ratio(moons_around_planets, planets),

        black_hole_spin: Summary::of(bodies.values().filter_map(|b| match &b.kind {
            BodyKind::BlackHole { black_hole } => Some(black_hole.spin),
            _ => None,
        })),
        star_mass: Summary::of(
            bodies
                .values()
                .filter(|b| b.body_type() == BodyType::Star)
                .map(|b| b.mass),
        ),
        planet_mass: Summary::of(
            bodies
                .values()
                .filter(|b| b.body_type() == BodyType::Planet)
                .map(|b| b.mass),
        ),
        bodies_by_type,
    }
}

fn max_body_depth(state: &UniverseState) -> usize {
    let mut visited: FxHashSet<&BodyId> = FxHashSet::default();
    let mut stack: Vec<(&BodyId, usize)> = state.root_body_ids().iter().map(|id| (id, 0)).collect();
    let mut deepest = 0;
    while let Some((id, depth)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        deepest = deepest.max(depth);
        if let Some(body) = state.body(id.as_str()) {
            stack.extend(body.children().iter().map(|c| (c, depth + 1)));
        }
    }
    deepest
}

fn max_group_depth(state: &UniverseState) -> usize {
    let mut visited = FxHashSet::default();
    let mut stack: Vec<_> = state.root_group_ids().iter().map(|id| (id, 1)).collect();
    let mut deepest = 0;
    while let Some((id, depth)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        deepest = deepest.max(depth);
        if let Some(group) = state.group(id.as_str()) {
            stack.extend(group.child_groups().map(|c| (c, depth + 1)));
        }
    }
    deepest
}
