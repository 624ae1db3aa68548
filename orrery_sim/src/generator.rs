// Procedural universe generation.
//
// Builds a complete `UniverseState` from a `ValidatedConfig`: star systems
// with planets, moons and sub-moons, optional feature layers (rings, belts,
// Kuiper-style fields, comets, Lagrange markers, protoplanetary disks, black
// holes, nebulae, rogue planets), and an optional nested grouping of systems.
//
// Generation runs in three phases:
// 1. Sequential planning on the global `groups` and `layout` streams: group
//    hierarchy, system-to-group membership and each system's root position.
// 2. Per-system construction, fanned out over `rayon`. System `i` draws only
//    from `root.fork("system:{i}")` (with `ids` and `names` sub-forks) and
//    from index- or body-keyed feature forks (`belt:{i}`, `ring:{bodyId}`,
//    ...), so the result does not depend on scheduling.
// 3. Sequential merge in index order through `hierarchy.rs`, then the global
//    `nebulae` and `rogue` layers and a final `compute_stats`.
//
// Every feature layer owns its stream. Turning one layer off skips its fork
// entirely and leaves every other body, id and field unchanged.
//
// See also: `config.rs` for every tunable read here, `sampling.rs` for the
// distributions, `names.rs`, `stats.rs`, `orrery_prng` for `SeededRng::fork`.
//
// **Critical constraint: determinism.** All randomness comes from forks of
// `SeededRng::new(config.seed())`. Same validated config, same output, byte
// for byte once serialized.

use crate::body::{
    BlackHoleData, Body, BodyKind, CometData, LagrangeData, LagrangePointKind, NewBody, RogueData,
    Ring, StarData,
};
use crate::config::{ConfigError, GenerationConfig, OrbitParams, TierParams, ValidatedConfig};
use crate::field::{Belt, FieldStyle, Nebula, ProtoplanetaryDisk, SmallBodyField};
use crate::group::{Group, GroupChild, NewGroup};
use crate::hierarchy;
use crate::names;
use crate::prng::SeededRng;
use crate::sampling::{gaussian, geometric, log_normal, signed_unit, weighted_index};
use crate::state::UniverseState;
use crate::stats::{UniverseStats, compute_stats};
use crate::types::{BodyId, FieldId, GroupId, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Palettes and feature shapes
// ---------------------------------------------------------------------------

const PLANET_COLORS: &[&str] = &[
    "#c1440e", "#e3bb76", "#4f7cac", "#6b93d6", "#a57c52", "#d1e7e7", "#7a9e7e", "#b5a642",
];
const MOON_COLORS: &[&str] = &["#9e9e9e", "#bdb5a6", "#c9c0bb", "#8a7f72", "#d8d0c0"];
const RING_COLORS: &[&str] = &["#d8c8a8", "#c2b280", "#a9a9a9", "#e6dccb", "#b0c4de"];
const BELT_COLORS: &[&str] = &["#8b8378", "#7d7461", "#a39e93"];
const ICE_COLORS: &[&str] = &["#a7c7e7", "#9fb8d0", "#c6dbef"];
const DISK_INNER_COLORS: &[&str] = &["#ffcc88", "#ffd9a0", "#ffb870"];
const DISK_OUTER_COLORS: &[&str] = &["#884422", "#6b3a2a", "#553322"];
const NEBULA_COLORS: &[&str] = &["#ff6f91", "#845ec2", "#4b8bbe", "#00c9a7", "#ff9671", "#c34a36"];
const GROUP_COLORS: &[&str] = &["#8899aa", "#aa8899", "#99aa88", "#7fa7c9", "#c9a77f", "#a77fc9"];
const COMET_COLOR: &str = "#cfe8ff";
const LAGRANGE_COLOR: &str = "#66ffcc";
const BLACK_HOLE_COLOR: &str = "#000000";

/// Ring radii as multiples of the host radius.
const RING_INNER: (f64, f64) = (1.3, 1.7);
const RING_WIDTH: (f64, f64) = (0.4, 1.4);
const RING_OPACITY: (f64, f64) = (0.4, 0.9);
/// Belt edges as fractions of the gap between two planet orbits.
const BELT_GAP: (f64, f64) = (0.3, 0.7);
/// Belt beyond the last planet, as multiples of its orbit.
const BELT_OUTER: (f64, f64) = (1.2, 1.5);
const KUIPER_INNER: (f64, f64) = (1.3, 1.6);
const KUIPER_WIDTH: (f64, f64) = (1.5, 2.5);
/// Degrees.
const KUIPER_INCLINATION: (f64, f64) = (5.0, 20.0);
const COMET_ECCENTRICITY: (f64, f64) = (0.6, 0.98);
const COMET_TAIL: (f64, f64) = (5.0, 30.0);
const COMET_ACTIVITY: (f64, f64) = (0.3, 1.0);
/// Comet orbits as multiples of the outermost orbit.
const COMET_DISTANCE: (f64, f64) = (0.5, 1.5);
const DISK_INNER: (f64, f64) = (2.0, 4.0);
const DISK_OUTER: (f64, f64) = (0.6, 1.2);
const DISK_BRIGHTNESS: (f64, f64) = (0.5, 1.0);
const BLACK_HOLE_SHADOW: (f64, f64) = (0.2, 0.5);
const ACCRETION_INNER: (f64, f64) = (2.0, 3.0);
const ACCRETION_OUTER: (f64, f64) = (2.5, 5.0);
const BLACK_HOLE_MAX_SPIN: f64 = 0.998;
const JET_PROBABILITY: f64 = 0.3;
const NEBULA_RADIUS: (f64, f64) = (150.0, 400.0);
const NEBULA_DENSITY: (f64, f64) = (0.3, 1.0);
const NEBULA_NOISE: (f64, f64) = (0.5, 2.0);
const LAGRANGE_MARKER_SCALE: f64 = 0.2;
/// Thickness as a fraction of the host radius (rings) or width (belts, disks).
const THICKNESS_FRACTION: f64 = 0.05;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One generated system, for navigation and display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    pub index: usize,
    pub root_id: BodyId,
    pub name: String,
    pub star_ids: Vec<BodyId>,
    /// Heaviest star or black hole. The hierarchy is not restructured around
    /// it; the primary stays the root.
    pub center_body_id: BodyId,
    pub body_count: usize,
    pub group_id: Option<GroupId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedUniverse {
    pub snapshot: UniverseState,
    pub stats: UniverseStats,
    pub systems: Vec<SystemSummary>,
    pub seed: u32,
    /// Wall-clock stamp supplied by the caller; generation itself never reads
    /// the clock.
    pub generated_at_ms: Option<u64>,
}

impl GeneratedUniverse {
    pub fn with_timestamp(mut self, ms: u64) -> Self {
        self.generated_at_ms = Some(ms);
        self
    }
}

/// Validate `config` and generate from it.
pub fn generate_universe(config: &GenerationConfig) -> Result<GeneratedUniverse, ConfigError> {
    Ok(generate(&config.clone().validate()?))
}

/// Generate a universe. Infallible: the config was checked when it was
/// validated.
pub fn generate(validated: &ValidatedConfig) -> GeneratedUniverse {
    let seed = validated.seed();
    let config = validated.config();
    let root = SeededRng::new(seed);
    let system_count = config.system_count as usize;

    let plan = plan_groups(&root, config, system_count);
    let positions = system_positions(&root, config, &plan);

    let builds: Vec<SystemBuild> = positions
        .into_par_iter()
        .enumerate()
        .map(|(index, position)| build_system(index, position, &root, config))
        .collect();

    let mut state = UniverseState::new();
    for group in plan.groups {
        hierarchy::insert_group(&mut state, group);
    }

    let mut systems = Vec::with_capacity(system_count);
    for (build, group_id) in builds.into_iter().zip(plan.membership) {
        let SystemBuild {
            bodies,
            belts,
            small_body_fields,
            disks,
            mut summary,
        } = build;
        for body in bodies {
            hierarchy::insert_body(&mut state, body);
        }
        if let Some(group_id) = &group_id {
            let system = GroupChild::System {
                id: summary.root_id.clone(),
            };
            hierarchy::move_into_group(&mut state, &system, Some(group_id));
        }
        state
            .belts
            .extend(belts.into_iter().map(|b| (b.id.clone(), b)));
        state
            .small_body_fields
            .extend(small_body_fields.into_iter().map(|f| (f.id.clone(), f)));
        state
            .protoplanetary_disks
            .extend(disks.into_iter().map(|d| (d.id.clone(), d)));
        summary.group_id = group_id;
        tracing::trace!(
            index = summary.index,
            name = %summary.name,
            bodies = summary.body_count,
            "system generated"
        );
        systems.push(summary);
    }

    if config.features.nebulae {
        for nebula in generate_nebulae(&root, config) {
            state.nebulae.insert(nebula.id.clone(), nebula);
        }
    }
    if config.features.rogue_planets {
        for body in generate_rogues(&root, config) {
            hierarchy::insert_body(&mut state, body);
        }
    }

    let stats = compute_stats(&state);
    tracing::info!(
        seed,
        systems = systems.len(),
        bodies = stats.body_count,
        groups = stats.group_count,
        "universe generated"
    );
    GeneratedUniverse {
        snapshot: state,
        stats,
        systems,
        seed,
        generated_at_ms: None,
    }
}

// ---------------------------------------------------------------------------
// Shared draws
// ---------------------------------------------------------------------------

fn pick(rng: &mut SeededRng, palette: &[&str]) -> String {
    rng.choice(palette).copied().unwrap_or("#ffffff").to_string()
}

fn between(rng: &mut SeededRng, (low, high): (f64, f64)) -> f64 {
    rng.range_f64(low, high)
}

fn gaussian_point(rng: &mut SeededRng, spread: f64) -> Vec3 {
    Vec3::new(
        gaussian(rng, 0.0, spread),
        gaussian(rng, 0.0, spread),
        gaussian(rng, 0.0, spread),
    )
}

/// Log-normal mass and the radius derived from it.
fn draw_physical(rng: &mut SeededRng, tier: &TierParams) -> (f64, f64) {
    let mass = log_normal(rng, tier.mass_mu, tier.mass_sigma);
    (mass, tier.radius_scale * mass.powf(tier.radius_power))
}

#[derive(Clone, Copy, Debug, Default)]
struct Orbit {
    distance: f64,
    speed: f64,
    phase: f64,
    inclination: f64,
}

impl Orbit {
    fn draw(rng: &mut SeededRng, distance: f64, params: &OrbitParams) -> Self {
        let speed = if distance > 0.0 {
            params.orbit_k / distance.sqrt()
        } else {
            0.0
        };
        Self {
            distance,
            speed,
            phase: rng.range_f64(0.0, 360.0),
            inclination: signed_unit(rng) * params.max_inclination,
        }
    }
}

/// `base · growth^n · (1 + jitter·U)`.
fn nth_orbit_distance(rng: &mut SeededRng, base: f64, n: usize, config: &GenerationConfig) -> f64 {
    let growth = config.topology.orbit_growth.powi(n as i32);
    base * growth * (1.0 + config.orbit.jitter * signed_unit(rng))
}

struct Physical {
    mass: f64,
    radius: f64,
    color: String,
}

fn make_body(
    id: BodyId,
    name: String,
    parent: Option<&BodyId>,
    kind: BodyKind,
    physical: Physical,
    orbit: Orbit,
) -> Body {
    Body::from(NewBody {
        id,
        name,
        parent_id: parent.cloned(),
        mass: physical.mass,
        radius: physical.radius,
        color: physical.color,
        position: Vec3::ZERO,
        orbital_distance: orbit.distance,
        orbital_speed: orbit.speed,
        orbital_phase: orbit.phase,
        orbital_inclination: orbit.inclination,
        kind,
    })
}

// ---------------------------------------------------------------------------
// Phase 1: grouping and layout
// ---------------------------------------------------------------------------

struct GroupPlan {
    /// Parents precede children.
    groups: Vec<Group>,
    /// Per system index.
    membership: Vec<Option<GroupId>>,
}

fn plan_groups(root: &SeededRng, config: &GenerationConfig, system_count: usize) -> GroupPlan {
    let params = &config.grouping;
    let count = params.group_count as usize;
    if count == 0 {
        return GroupPlan {
            groups: Vec::new(),
            membership: vec![None; system_count],
        };
    }

    let mut rng = root.fork("groups");
    let mut groups: Vec<Group> = Vec::with_capacity(count);
    let mut depths: Vec<u32> = Vec::with_capacity(count);
    for k in 0..count {
        let id = GroupId::generate(&mut rng);
        let name = names::group_name(&mut rng);
        let color = pick(&mut rng, GROUP_COLORS);
        let position = gaussian_point(&mut rng, params.group_spread);

        let mut parent_group_id = None;
        let mut depth = 1;
        if k > 0 && rng.bool(params.nesting_probability) {
            let candidate = rng.int(0, (k - 1) as i32) as usize;
            if let (Some(parent), Some(&parent_depth)) = (groups.get(candidate), depths.get(candidate))
            {
                if parent_depth < params.max_nesting_depth {
                    parent_group_id = Some(parent.id.clone());
                    depth = parent_depth + 1;
                }
            }
        }

        depths.push(depth);
        groups.push(Group::from(NewGroup {
            id,
            name,
            color,
            parent_group_id,
            position,
            collapsed: false,
        }));
    }

    let last = (count - 1) as i32;
    let membership = (0..system_count)
        .map(|_| {
            let k = rng.int(0, last) as usize;
            groups.get(k).map(|g| g.id.clone())
        })
        .collect();
    GroupPlan { groups, membership }
}

/// Root position of every system: Gaussian around its group, or around the
/// origin when ungrouped.
fn system_positions(root: &SeededRng, config: &GenerationConfig, plan: &GroupPlan) -> Vec<Vec3> {
    let mut rng = root.fork("layout");
    plan.membership
        .iter()
        .map(|group_id| {
            let center = group_id
                .as_ref()
                .and_then(|id| plan.groups.iter().find(|g| &g.id == id))
                .map_or(Vec3::ZERO, |g| g.position);
            center + gaussian_point(&mut rng, config.grouping.system_spread)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Phase 2: one system
// ---------------------------------------------------------------------------

struct SystemBuild {
    /// Parents precede children.
    bodies: Vec<Body>,
    belts: Vec<Belt>,
    small_body_fields: Vec<SmallBodyField>,
    disks: Vec<ProtoplanetaryDisk>,
    summary: SystemSummary,
}

struct SystemBuilder<'a> {
    index: usize,
    config: &'a GenerationConfig,
    root: &'a SeededRng,
    rng: SeededRng,
    ids: SeededRng,
    names: SeededRng,
    bodies: Vec<Body>,
    belts: Vec<Belt>,
    small_body_fields: Vec<SmallBodyField>,
    disks: Vec<ProtoplanetaryDisk>,
}

fn build_system(
    index: usize,
    position: Vec3,
    root: &SeededRng,
    config: &GenerationConfig,
) -> SystemBuild {
    let rng = root.fork(&format!("system:{index}"));
    let mut builder = SystemBuilder {
        index,
        config,
        root,
        ids: rng.fork("ids"),
        names: rng.fork("names"),
        rng,
        bodies: Vec::new(),
        belts: Vec::new(),
        small_body_fields: Vec::new(),
        disks: Vec::new(),
    };

    let (name, star_ids) = builder.stars();
    for (star_id, star_name) in star_ids
        .iter()
        .map(|id| (id.clone(), builder.name_of(id)))
        .collect::<Vec<_>>()
    {
        builder.satellites(&star_id, &star_name, 1);
    }

    let features = &config.features;
    if features.black_holes {
        builder.black_hole();
    }
    if features.rings {
        builder.rings();
    }
    if features.lagrange_points {
        builder.lagrange_points();
    }
    if features.belts {
        builder.belt();
    }
    if features.kuiper_belts {
        builder.kuiper_field();
    }
    if features.comets {
        builder.comets();
    }
    if features.protoplanetary_disks {
        builder.disk();
    }

    if let Some(primary) = builder.bodies.first_mut() {
        primary.position = position;
    }
    builder.finish(name, star_ids)
}

impl SystemBuilder<'_> {
    fn primary(&self) -> Option<&Body> {
        self.bodies.first()
    }

    fn name_of(&self, id: &BodyId) -> String {
        self.bodies
            .iter()
            .find(|b| &b.id == id)
            .map(|b| b.name.clone())
            .unwrap_or_default()
    }

    /// Feature stream keyed by this system's index.
    fn feature_rng(&self, feature: &str) -> SeededRng {
        self.root.fork(&format!("{feature}:{}", self.index))
    }

    // --- Stars: primary at the root, companions orbiting it ---

    fn stars(&mut self) -> (String, Vec<BodyId>) {
        let config = self.config;
        let star_count = 1 + weighted_index(&mut self.rng, &config.topology.star_count_probabilities);
        let system_name = names::star_name(&mut self.names);
        let mut star_ids: Vec<BodyId> = Vec::with_capacity(star_count);

        for n in 0..star_count {
            let (mass, radius) = draw_physical(&mut self.rng, &config.mass.star);
            let star = StarData::from_solar_mass(mass);
            let color = star.spectral_class.color().to_string();
            let id = BodyId::generate(&mut self.ids);
            let (name, orbit) = if n == 0 {
                (system_name.clone(), Orbit::default())
            } else {
                let distance = config.orbit.binary_separation * n as f64;
                (
                    names::companion_name(&system_name, n),
                    Orbit::draw(&mut self.rng, distance, &config.orbit),
                )
            };
            let body = make_body(
                id.clone(),
                name,
                star_ids.first(),
                BodyKind::Star { star },
                Physical {
                    mass,
                    radius,
                    color,
                },
                orbit,
            );
            self.bodies.push(body);
            star_ids.push(id);
        }
        (system_name, star_ids)
    }

    // --- Planets (tier 1), moons (tier 2), sub-moons (tier 3) ---

    fn satellites(&mut self, parent: &BodyId, parent_name: &str, tier: u32) {
        let config = self.config;
        if tier > config.topology.max_depth {
            return;
        }
        let (p, base, mass_params) = match tier {
            1 => (
                config.topology.planet_geometric_p,
                config.orbit.planet_base,
                &config.mass.planet,
            ),
            2 => (
                config.topology.moon_geometric_p,
                config.orbit.moon_base,
                &config.mass.moon,
            ),
            _ => (
                config.topology.moon_geometric_p,
                config.orbit.sub_moon_base,
                &config.mass.sub_moon,
            ),
        };

        let count = geometric(&mut self.rng, p, config.max_children_per_body as usize);
        for n in 0..count {
            let distance = nth_orbit_distance(&mut self.rng, base, n, config);
            let orbit = Orbit::draw(&mut self.rng, distance, &config.orbit);
            let (mass, radius) = draw_physical(&mut self.rng, mass_params);
            let (kind, color, name) = match tier {
                1 => (
                    BodyKind::Planet { ring: None },
                    pick(&mut self.rng, PLANET_COLORS),
                    names::planet_name(parent_name, n),
                ),
                2 => (
                    BodyKind::Moon,
                    pick(&mut self.rng, MOON_COLORS),
                    names::moon_name(parent_name, n),
                ),
                _ => (
                    BodyKind::Moon,
                    pick(&mut self.rng, MOON_COLORS),
                    names::sub_moon_name(parent_name, n),
                ),
            };
            let id = BodyId::generate(&mut self.ids);
            self.bodies.push(make_body(
                id.clone(),
                name.clone(),
                Some(parent),
                kind,
                Physical {
                    mass,
                    radius,
                    color,
                },
                orbit,
            ));
            self.satellites(&id, &name, tier + 1);
        }
    }

    /// Ascending orbit radii of the primary's planets.
    fn primary_planet_orbits(&self) -> Vec<f64> {
        let Some(primary) = self.primary() else {
            return Vec::new();
        };
        let mut orbits: Vec<f64> = self
            .bodies
            .iter()
            .filter(|b| b.parent_id() == Some(&primary.id))
            .filter(|b| matches!(b.kind, BodyKind::Planet { .. }))
            .map(|b| b.orbital_distance)
            .collect();
        orbits.sort_by(f64::total_cmp);
        orbits
    }

    /// Largest planet or companion orbit around the primary, or `planetBase`
    /// when nothing orbits it. Minor bodies are ignored so feature layers do
    /// not shift each other.
    fn outermost_orbit(&self) -> f64 {
        let Some(primary) = self.primary() else {
            return self.config.orbit.planet_base;
        };
        self.bodies
            .iter()
            .filter(|b| b.parent_id() == Some(&primary.id))
            .filter(|b| matches!(b.kind, BodyKind::Planet { .. }) || b.kind.is_stellar())
            .map(|b| b.orbital_distance)
            .fold(self.config.orbit.planet_base, f64::max)
    }

    // --- Feature layers ---

    fn black_hole(&mut self) {
        let mut rng = self.feature_rng("blackhole");
        if !rng.bool(self.config.feature_params.black_hole_probability) {
            return;
        }
        let Some(primary) = self.bodies.first_mut() else {
            return;
        };
        let shadow_radius = (primary.radius * between(&mut rng, BLACK_HOLE_SHADOW)).max(f64::EPSILON);
        let accretion_inner_radius = shadow_radius * between(&mut rng, ACCRETION_INNER);
        let accretion_outer_radius = accretion_inner_radius * between(&mut rng, ACCRETION_OUTER);
        primary.kind = BodyKind::BlackHole {
            black_hole: BlackHoleData {
                spin: rng.range_f64(0.0, BLACK_HOLE_MAX_SPIN),
                shadow_radius,
                accretion_inner_radius,
                accretion_outer_radius,
                has_jets: rng.bool(JET_PROBABILITY),
            },
        };
        primary.radius = shadow_radius;
        primary.color = BLACK_HOLE_COLOR.to_string();
    }

    fn rings(&mut self) {
        let probability = self.config.feature_params.ring_probability;
        let root = self.root;
        for body in &mut self.bodies {
            let BodyKind::Planet { ring } = &mut body.kind else {
                continue;
            };
            let mut rng = root.fork(&format!("ring:{}", body.id));
            if !rng.bool(probability) {
                continue;
            }
            let inner = between(&mut rng, RING_INNER);
            *ring = Some(Ring {
                inner_radius_multiplier: inner,
                outer_radius_multiplier: inner + between(&mut rng, RING_WIDTH),
                color: pick(&mut rng, RING_COLORS),
                opacity: between(&mut rng, RING_OPACITY),
                thickness: body.radius * THICKNESS_FRACTION,
            });
        }
    }

    /// L4/L5 markers on planets of the primary.
    fn lagrange_points(&mut self) {
        let Some(primary) = self.primary() else {
            return;
        };
        let primary_id = primary.id.clone();
        let planets: Vec<(BodyId, String, f64)> = self
            .bodies
            .iter()
            .filter(|b| b.parent_id() == Some(&primary_id))
            .filter(|b| matches!(b.kind, BodyKind::Planet { .. }))
            .map(|b| (b.id.clone(), b.name.clone(), b.radius))
            .collect();

        for (planet_id, planet_name, planet_radius) in planets {
            let mut rng = self.root.fork(&format!("lagrange:{planet_id}"));
            if !rng.bool(self.config.feature_params.lagrange_probability) {
                continue;
            }
            for point in [LagrangePointKind::L4, LagrangePointKind::L5] {
                let id = BodyId::generate(&mut rng);
                let lagrange = LagrangeData {
                    primary_id: primary_id.clone(),
                    secondary_id: planet_id.clone(),
                    point,
                };
                self.bodies.push(make_body(
                    id,
                    format!("{planet_name} {point:?}"),
                    Some(&planet_id),
                    BodyKind::LagrangePoint { lagrange },
                    Physical {
                        mass: 0.0,
                        radius: planet_radius * LAGRANGE_MARKER_SCALE,
                        color: LAGRANGE_COLOR.to_string(),
                    },
                    Orbit::default(),
                ));
            }
        }
    }

    /// Asteroid belt in a gap between two planets, or beyond the last one,
    /// plus a few named asteroids orbiting inside it.
    fn belt(&mut self) {
        let mut rng = self.feature_rng("belt");
        let params = &self.config.feature_params;
        if !rng.bool(params.belt_probability) {
            return;
        }
        let Some(primary) = self.primary() else {
            return;
        };
        let (primary_id, primary_name) = (primary.id.clone(), primary.name.clone());

        let orbits = self.primary_planet_orbits();
        let (inner_radius, outer_radius) = if orbits.len() >= 2 {
            let gap = rng.int(0, (orbits.len() - 2) as i32) as usize;
            let (near, far) = (orbits[gap], orbits[gap + 1]);
            let width = far - near;
            (
                near + width * BELT_GAP.0,
                near + width * between(&mut rng, (BELT_GAP.0 + 0.1, BELT_GAP.1)),
            )
        } else {
            let last = orbits.last().copied().unwrap_or(self.config.orbit.planet_base);
            let inner = last * BELT_OUTER.0;
            (inner, last * between(&mut rng, (BELT_OUTER.0 + 0.1, BELT_OUTER.1)))
        };

        let belt = Belt {
            id: FieldId::generate(&mut rng),
            host_body_id: primary_id.clone(),
            name: format!("{primary_name} Belt"),
            inner_radius,
            outer_radius,
            thickness: (outer_radius - inner_radius) * THICKNESS_FRACTION,
            particle_count: params.belt_particles,
            color: pick(&mut rng, BELT_COLORS),
            seed: rng.next_u32(),
        };

        let named = rng.int(0, params.max_named_asteroids as i32) as usize;
        for n in 0..named {
            let distance = rng.range_f64(inner_radius, outer_radius);
            let orbit = Orbit::draw(&mut rng, distance, &self.config.orbit);
            let (mass, radius) = draw_physical(&mut rng, &self.config.mass.sub_moon);
            let body = make_body(
                BodyId::generate(&mut rng),
                names::minor_body_name(&primary_name, "Asteroid", n),
                Some(&primary_id),
                BodyKind::Asteroid,
                Physical {
                    mass,
                    radius,
                    color: pick(&mut rng, BELT_COLORS),
                },
                orbit,
            );
            self.bodies.push(body);
        }
        self.belts.push(belt);
    }

    fn kuiper_field(&mut self) {
        let mut rng = self.feature_rng("kuiper");
        let params = &self.config.feature_params;
        if !rng.bool(params.kuiper_probability) {
            return;
        }
        let Some(primary) = self.primary() else {
            return;
        };
        let inner_radius = self.outermost_orbit() * between(&mut rng, KUIPER_INNER);
        let field = SmallBodyField {
            id: FieldId::generate(&mut rng),
            host_body_id: primary.id.clone(),
            name: format!("{} Kuiper Belt", primary.name),
            style: FieldStyle::KuiperBelt,
            inner_radius,
            outer_radius: inner_radius * between(&mut rng, KUIPER_WIDTH),
            inclination_spread: between(&mut rng, KUIPER_INCLINATION),
            particle_count: params.kuiper_particles,
            color: pick(&mut rng, ICE_COLORS),
            visible: true,
            seed: rng.next_u32(),
        };
        self.small_body_fields.push(field);
    }

    fn comets(&mut self) {
        let mut rng = self.feature_rng("comets");
        let Some(primary) = self.primary() else {
            return;
        };
        let (primary_id, primary_name) = (primary.id.clone(), primary.name.clone());
        let outermost = self.outermost_orbit();
        let count = rng.int(0, self.config.feature_params.max_comets_per_system as i32) as usize;
        for n in 0..count {
            let distance = outermost * between(&mut rng, COMET_DISTANCE);
            let orbit = Orbit::draw(&mut rng, distance, &self.config.orbit);
            let (mass, radius) = draw_physical(&mut rng, &self.config.mass.sub_moon);
            let comet = CometData {
                eccentricity: between(&mut rng, COMET_ECCENTRICITY),
                tail_length: between(&mut rng, COMET_TAIL),
                activity: between(&mut rng, COMET_ACTIVITY),
            };
            let body = make_body(
                BodyId::generate(&mut rng),
                names::minor_body_name(&primary_name, "Comet", n),
                Some(&primary_id),
                BodyKind::Comet { comet },
                Physical {
                    mass,
                    radius,
                    color: COMET_COLOR.to_string(),
                },
                orbit,
            );
            self.bodies.push(body);
        }
    }

    fn disk(&mut self) {
        let mut rng = self.feature_rng("disk");
        let params = &self.config.feature_params;
        if !rng.bool(params.disk_probability) {
            return;
        }
        let Some(primary) = self.primary() else {
            return;
        };
        let inner_radius = primary.radius * between(&mut rng, DISK_INNER);
        let innermost = self
            .primary_planet_orbits()
            .first()
            .copied()
            .unwrap_or(self.config.orbit.planet_base);
        let outer_radius = (innermost * between(&mut rng, DISK_OUTER)).max(inner_radius * 2.0);
        let disk = ProtoplanetaryDisk {
            id: FieldId::generate(&mut rng),
            host_body_id: primary.id.clone(),
            name: format!("{} Disk", primary.name),
            inner_radius,
            outer_radius,
            thickness: (outer_radius - inner_radius) * THICKNESS_FRACTION,
            particle_count: params.disk_particles,
            inner_color: pick(&mut rng, DISK_INNER_COLORS),
            outer_color: pick(&mut rng, DISK_OUTER_COLORS),
            brightness: between(&mut rng, DISK_BRIGHTNESS),
            rotation_speed: self.config.orbit.orbit_k / inner_radius.max(f64::EPSILON).sqrt(),
            visible: true,
            seed: rng.next_u32(),
        };
        self.disks.push(disk);
    }

    fn finish(self, name: String, star_ids: Vec<BodyId>) -> SystemBuild {
        let root_id = star_ids.first().cloned().unwrap_or_default();
        let center_body_id = self
            .bodies
            .iter()
            .filter(|b| star_ids.contains(&b.id) && b.kind.is_stellar())
            .max_by(|a, b| a.mass.total_cmp(&b.mass))
            .map_or_else(|| root_id.clone(), |b| b.id.clone());
        let summary = SystemSummary {
            index: self.index,
            root_id,
            name,
            star_ids,
            center_body_id,
            body_count: self.bodies.len(),
            group_id: None,
        };
        SystemBuild {
            bodies: self.bodies,
            belts: self.belts,
            small_body_fields: self.small_body_fields,
            disks: self.disks,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 3: global layers
// ---------------------------------------------------------------------------

fn generate_nebulae(root: &SeededRng, config: &GenerationConfig) -> Vec<Nebula> {
    let params = &config.feature_params;
    let mut rng = root.fork("nebulae");
    let mut nebulae = Vec::with_capacity(params.nebula_count as usize);
    for _ in 0..params.nebula_count {
        let id = FieldId::generate(&mut rng);
        let name = format!("{} Nebula", names::star_name(&mut rng));
        let position = gaussian_point(&mut rng, params.nebula_spread);
        let color_count = rng.int(2, 3);
        let mut colors = Vec::with_capacity(color_count as usize);
        for _ in 0..color_count {
            colors.push(pick(&mut rng, NEBULA_COLORS));
        }
        nebulae.push(Nebula {
            id,
            name,
            position,
            radius: between(&mut rng, NEBULA_RADIUS),
            density: between(&mut rng, NEBULA_DENSITY),
            particle_count: params.nebula_particles,
            colors,
            noise_scale: between(&mut rng, NEBULA_NOISE),
            visible: true,
            seed: rng.next_u32(),
        });
    }
    nebulae
}

/// Free-floating planets: root bodies with a drift velocity and no orbit.
fn generate_rogues(root: &SeededRng, config: &GenerationConfig) -> Vec<Body> {
    let params = &config.feature_params;
    let mut rng = root.fork("rogue");
    let mut rogues = Vec::with_capacity(params.rogue_planet_count as usize);
    for _ in 0..params.rogue_planet_count {
        let id = BodyId::generate(&mut rng);
        let name = names::rogue_name(&mut rng);
        let (mass, radius) = draw_physical(&mut rng, &config.mass.planet);
        let color = pick(&mut rng, PLANET_COLORS);
        let position = gaussian_point(&mut rng, params.rogue_spread);
        let drift = params.rogue_max_drift;
        let drift_velocity = Vec3::new(
            signed_unit(&mut rng) * drift,
            signed_unit(&mut rng) * drift,
            signed_unit(&mut rng) * drift,
        );
        let mut body = make_body(
            id,
            name,
            None,
            BodyKind::RoguePlanet {
                rogue: RogueData { drift_velocity },
                ring: None,
            },
            Physical {
                mass,
                radius,
                color,
            },
            Orbit::default(),
        );
        body.position = position;
        rogues.push(body);
    }
    rogues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyType;
    use crate::config::{
        FeatureToggles, GroupingParams, MAX_CHILDREN_PER_BODY, MAX_LENGTH, MAX_MASS_MU,
        MAX_MASS_SIGMA, MAX_ORBIT_GROWTH, MAX_RADIUS_POWER,
    };
    use crate::invariants::check_forest;
    use std::collections::BTreeSet;

    fn config(seed: u32, system_count: u32) -> GenerationConfig {
        GenerationConfig {
            seed: Some(seed.into()),
            system_count,
            ..Default::default()
        }
    }

    fn everything(seed: u32) -> GenerationConfig {
        let mut c = config(seed, 12);
        c.features = FeatureToggles::all();
        c.topology.max_depth = 3;
        c.grouping = GroupingParams {
            group_count: 4,
            nesting_probability: 0.7,
            max_nesting_depth: 3,
            ..Default::default()
        };
        c
    }

    fn ids_of(universe: &GeneratedUniverse, types: &[BodyType]) -> BTreeSet<BodyId> {
        universe
            .snapshot
            .bodies()
            .values()
            .filter(|b| types.contains(&b.body_type()))
            .map(|b| b.id.clone())
            .collect()
    }

    #[test]
    fn same_seed_same_universe() {
        let a = generate_universe(&everything(42)).unwrap();
        let b = generate_universe(&everything(42)).unwrap();
        assert_eq!(a.snapshot.to_json().unwrap(), b.snapshot.to_json().unwrap());
        assert_eq!(a.systems, b.systems);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_universe(&config(1, 5)).unwrap();
        let b = generate_universe(&config(2, 5)).unwrap();
        assert_ne!(a.snapshot, b.snapshot);
    }

    #[test]
    fn generated_forest_is_consistent() {
        for seed in 0..5 {
            let universe = generate_universe(&everything(seed)).unwrap();
            let violations = check_forest(&universe.snapshot);
            assert!(violations.is_empty(), "seed {seed}: {violations:?}");
        }
    }

    #[test]
    fn every_generated_body_is_valid() {
        let mut c = everything(9);
        c.feature_params.black_hole_probability = 0.5;
        c.feature_params.ring_probability = 0.8;
        let universe = generate_universe(&c).unwrap();
        for body in universe.snapshot.bodies().values() {
            assert_eq!(body.validate(), Ok(()), "{}", body.name);
        }
    }

    #[test]
    fn system_count_matches_config() {
        let universe = generate_universe(&everything(3)).unwrap();
        assert_eq!(universe.systems.len(), 12);
        assert_eq!(universe.stats.system_count, 12);
        let rogues = ids_of(&universe, &[BodyType::RoguePlanet]);
        assert_eq!(rogues.len(), 3);
        for id in &rogues {
            assert!(universe.snapshot.root_body_ids().contains(id));
        }
    }

    #[test]
    fn zero_systems_is_empty() {
        let mut c = config(7, 0);
        c.features = FeatureToggles::none();
        let universe = generate_universe(&c).unwrap();
        assert!(universe.snapshot.bodies().is_empty());
        assert!(universe.systems.is_empty());
    }

    #[test]
    fn planets_only_at_depth_one() {
        let mut c = config(5, 30);
        c.topology.max_depth = 1;
        c.topology.star_count_probabilities = [0.4, 0.3, 0.3];
        c.features = FeatureToggles::none();
        let universe = generate_universe(&c).unwrap();
        let state = &universe.snapshot;
        assert!(ids_of(&universe, &[BodyType::Moon]).is_empty());
        for id in ids_of(&universe, &[BodyType::Planet]) {
            let parent = state.body(id.as_str()).and_then(|b| b.parent_id()).unwrap();
            assert!(state.body(parent.as_str()).unwrap().kind.is_stellar());
        }
        // Companions orbit the primary, so their planets sit one level lower.
        assert!(universe.stats.max_hierarchy_depth <= 2);

        c.topology.star_count_probabilities = [1.0, 0.0, 0.0];
        let single = generate_universe(&c).unwrap();
        assert!(single.stats.max_hierarchy_depth <= 1);
    }

    #[test]
    fn extreme_valid_config_stays_finite() {
        let mut c = everything(23);
        c.system_count = 4;
        c.max_children_per_body = MAX_CHILDREN_PER_BODY;
        c.topology.planet_geometric_p = 0.05;
        c.topology.orbit_growth = MAX_ORBIT_GROWTH;
        for tier in [&mut c.mass.star, &mut c.mass.planet, &mut c.mass.moon, &mut c.mass.sub_moon] {
            tier.mass_mu = MAX_MASS_MU;
            tier.mass_sigma = MAX_MASS_SIGMA;
            tier.radius_scale = MAX_LENGTH;
            tier.radius_power = MAX_RADIUS_POWER;
        }
        c.orbit.planet_base = MAX_LENGTH;
        let snapshot = generate_universe(&c).unwrap().snapshot;
        for body in snapshot.bodies().values() {
            assert!(body.mass.is_finite() && body.radius.is_finite(), "{}", body.name);
            assert!(body.orbital_distance.is_finite(), "{}", body.name);
        }
        let restored = UniverseState::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn no_children_leaves_only_stars() {
        let mut c = config(5, 20);
        c.max_children_per_body = 0;
        c.features = FeatureToggles::none();
        let universe = generate_universe(&c).unwrap();
        assert!(
            universe
                .snapshot
                .bodies()
                .values()
                .all(|b| b.body_type() == BodyType::Star)
        );
    }

    #[test]
    fn feature_layers_do_not_perturb_structure() {
        let structure = [BodyType::Star, BodyType::Planet, BodyType::Moon];
        let mut plain = config(11, 10);
        plain.features = FeatureToggles::none();
        let mut rich = plain.clone();
        rich.features = FeatureToggles {
            black_holes: false,
            ..FeatureToggles::all()
        };

        let a = generate_universe(&plain).unwrap();
        let b = generate_universe(&rich).unwrap();
        assert_eq!(ids_of(&a, &structure), ids_of(&b, &structure));
        for id in ids_of(&a, &structure) {
            let (x, y) = (a.snapshot.body(id.as_str()), b.snapshot.body(id.as_str()));
            assert_eq!(x.map(|b| b.mass), y.map(|b| b.mass));
            assert_eq!(x.map(|b| &b.name), y.map(|b| &b.name));
        }
    }

    #[test]
    fn comets_are_independent_of_belts() {
        let mut with_belts = config(21, 10);
        with_belts.features = FeatureToggles {
            belts: true,
            comets: true,
            ..FeatureToggles::none()
        };
        with_belts.feature_params.belt_probability = 1.0;
        let mut without = with_belts.clone();
        without.features.belts = false;

        let a = generate_universe(&with_belts).unwrap();
        let b = generate_universe(&without).unwrap();
        assert_eq!(
            ids_of(&a, &[BodyType::Comet]),
            ids_of(&b, &[BodyType::Comet])
        );
        assert_eq!(a.snapshot.belts.len(), 10);
        assert!(b.snapshot.belts.is_empty());
    }

    #[test]
    fn certain_black_holes_replace_every_primary() {
        let mut c = config(4, 6);
        c.features = FeatureToggles {
            black_holes: true,
            ..FeatureToggles::none()
        };
        c.feature_params.black_hole_probability = 1.0;
        let universe = generate_universe(&c).unwrap();
        for system in &universe.systems {
            let root = universe.snapshot.body(system.root_id.as_str()).unwrap();
            assert_eq!(root.body_type(), BodyType::BlackHole);
            assert!(root.validate().is_ok());
        }
        let spin = universe.stats.black_hole_spin.unwrap();
        assert!(spin.min >= 0.0 && spin.max < 1.0);
    }

    #[test]
    fn lagrange_markers_reference_their_planet_and_star() {
        let mut c = config(8, 10);
        c.features = FeatureToggles {
            lagrange_points: true,
            ..FeatureToggles::none()
        };
        c.feature_params.lagrange_probability = 1.0;
        let universe = generate_universe(&c).unwrap();
        let state = &universe.snapshot;
        let markers: Vec<_> = state
            .bodies()
            .values()
            .filter_map(|b| b.kind.lagrange().map(|l| (b, l)))
            .collect();
        assert!(!markers.is_empty());
        for (body, lagrange) in markers {
            assert_eq!(body.parent_id(), Some(&lagrange.secondary_id));
            let planet = state.body(lagrange.secondary_id.as_str()).unwrap();
            assert_eq!(planet.parent_id(), Some(&lagrange.primary_id));
        }
    }

    #[test]
    fn center_body_is_the_heaviest_star() {
        let mut c = config(13, 40);
        c.topology.star_count_probabilities = [0.0, 0.5, 0.5];
        let universe = generate_universe(&c).unwrap();
        for system in &universe.systems {
            assert!(system.star_ids.len() >= 2);
            let heaviest = system
                .star_ids
                .iter()
                .filter_map(|id| universe.snapshot.body(id.as_str()))
                .map(|b| b.mass)
                .fold(f64::MIN, f64::max);
            let center = universe.snapshot.body(system.center_body_id.as_str()).unwrap();
            assert_eq!(center.mass, heaviest);
            assert_eq!(system.root_id, system.star_ids[0]);
        }
    }

    #[test]
    fn every_system_joins_a_group_within_depth() {
        let universe = generate_universe(&everything(17)).unwrap();
        let state = &universe.snapshot;
        assert_eq!(state.groups().len(), 4);
        assert!(universe.stats.max_group_depth <= 3);
        for system in &universe.systems {
            let group = system.group_id.as_ref().unwrap();
            assert_eq!(state.group_of_system(system.root_id.as_str()), Some(group));
        }
    }

    #[test]
    fn particle_counts_come_from_config() {
        let mut c = config(19, 10);
        c.features = FeatureToggles {
            kuiper_belts: true,
            ..FeatureToggles::none()
        };
        c.feature_params.kuiper_probability = 1.0;
        c.feature_params.kuiper_particles = 777;
        let universe = generate_universe(&c).unwrap();
        assert_eq!(universe.stats.small_body_field_count, 10);
        assert_eq!(universe.stats.small_body_field_particles, 7_770);
        for field in universe.snapshot.small_body_fields.values() {
            assert!(field.inner_radius < field.outer_radius);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut c = config(1, 1);
        c.topology.star_count_probabilities = [0.2, 0.2, 0.2];
        assert!(matches!(
            generate_universe(&c),
            Err(ConfigError::ProbabilitySum { .. })
        ));
    }

    #[test]
    fn timestamp_is_caller_supplied() {
        let universe = generate_universe(&config(1, 1)).unwrap();
        assert_eq!(universe.generated_at_ms, None);
        assert_eq!(universe.with_timestamp(1234).generated_at_ms, Some(1234));
    }
}
