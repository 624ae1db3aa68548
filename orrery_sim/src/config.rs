// Data-driven generation configuration.
//
// Every tunable the procedural generator reads lives in `GenerationConfig`,
// loaded from JSON or built in code. The generator never uses magic numbers
// beyond palette tables; it reads from the config.
//
// Parameters are grouped into nested structs: `TopologyParams` (star counts,
// branching, depth), `MassParams` (per-tier log-normal masses and radius
// scaling), `OrbitParams` (spacing and speed), `FeatureToggles` and
// `FeatureParams` (optional layers), and `GroupingParams` (cross-system
// groups). Every struct has a `Default` and is `#[serde(default)]`, so a
// partial JSON document fills in the rest.
//
// Topology presets are named constructors (`TopologyParams::compact()`,
// `::moon_rich()`, ...) selected by `TopologyPreset`. A preset replaces the
// whole `topology` group before generation runs.
//
// Validation is the boundary between untrusted configuration and the
// generator: `GenerationConfig::validate` either returns a `ValidatedConfig`
// (the only input `generator::generate` accepts) or a `ConfigError`
// describing the first problem. Callers who prefer clamping to rejection use
// `GenerationConfig::normalized()` first.
//
// See also: `generator.rs` which consumes `ValidatedConfig`.
//
// **Critical constraint: determinism.** The same validated config and seed
// must always produce the same universe.

use crate::prng::Seed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seed used when the config does not name one.
pub const DEFAULT_SEED: u32 = 0x5EED_0001;

/// Deepest body hierarchy below a star: planets, moons, sub-moons.
pub const MAX_DEPTH: u32 = 3;
pub const MAX_SYSTEM_COUNT: u32 = 100_000;
pub const MAX_CHILDREN_PER_BODY: u32 = 64;
pub const MAX_GROUP_COUNT: u32 = 1_000;
pub const MAX_GROUP_NESTING_DEPTH: u32 = 8;
pub const MAX_FEATURE_COUNT: u32 = 1_000;
pub const MAX_PARTICLES: u64 = 10_000_000;

/// Bound on `|massMu|`. With `massSigma` and `radiusPower` bounded as well,
/// every log-normal mass and derived radius stays finite.
pub const MAX_MASS_MU: f64 = 50.0;
pub const MAX_MASS_SIGMA: f64 = 5.0;
pub const MAX_RADIUS_POWER: f64 = 3.0;
pub const MAX_ORBIT_GROWTH: f64 = 10.0;
/// Upper bound on every length-like knob: radius scales, orbit bases,
/// separations, spreads, orbit constant and drift.
pub const MAX_LENGTH: f64 = 1.0e6;
/// Degrees.
pub const MAX_INCLINATION: f64 = 90.0;

/// Tolerance on the star-count probabilities summing to one.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// Named topology parameter bundles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TopologyPreset {
    Balanced,
    Compact,
    MoonRich,
    MultiStarHeavy,
    Sparse,
}

impl TopologyPreset {
    pub fn params(self) -> TopologyParams {
        match self {
            TopologyPreset::Balanced => TopologyParams::balanced(),
            TopologyPreset::Compact => TopologyParams::compact(),
            TopologyPreset::MoonRich => TopologyParams::moon_rich(),
            TopologyPreset::MultiStarHeavy => TopologyParams::multi_star_heavy(),
            TopologyPreset::Sparse => TopologyParams::sparse(),
        }
    }
}

/// Shape of each system's hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopologyParams {
    /// Probability of 1, 2 and 3 stars per system. Must sum to 1.
    pub star_count_probabilities: [f64; 3],
    /// Geometric `p` for planets per star. Expected count is `(1-p)/p`.
    pub planet_geometric_p: f64,
    /// Geometric `p` for moons per planet (and sub-moons per moon).
    pub moon_geometric_p: f64,
    /// 1 = planets only, 2 = moons, 3 = sub-moons.
    pub max_depth: u32,
    /// Ratio between successive orbit radii.
    pub orbit_growth: f64,
}

impl TopologyParams {
    pub fn balanced() -> Self {
        Self {
            star_count_probabilities: [0.7, 0.25, 0.05],
            planet_geometric_p: 0.2,
            moon_geometric_p: 0.5,
            max_depth: 2,
            orbit_growth: 1.6,
        }
    }

    /// Tight, short hierarchies.
    pub fn compact() -> Self {
        Self {
            star_count_probabilities: [0.85, 0.14, 0.01],
            planet_geometric_p: 0.35,
            moon_geometric_p: 0.7,
            max_depth: 2,
            orbit_growth: 1.3,
        }
    }

    pub fn moon_rich() -> Self {
        Self {
            star_count_probabilities: [0.75, 0.2, 0.05],
            planet_geometric_p: 0.3,
            moon_geometric_p: 0.2,
            max_depth: 3,
            orbit_growth: 1.8,
        }
    }

    pub fn multi_star_heavy() -> Self {
        Self {
            star_count_probabilities: [0.2, 0.45, 0.35],
            planet_geometric_p: 0.25,
            moon_geometric_p: 0.5,
            max_depth: 2,
            orbit_growth: 1.7,
        }
    }

    /// Few planets, widely spaced.
    pub fn sparse() -> Self {
        Self {
            star_count_probabilities: [0.9, 0.09, 0.01],
            planet_geometric_p: 0.5,
            moon_geometric_p: 0.8,
            max_depth: 1,
            orbit_growth: 2.2,
        }
    }
}

impl Default for TopologyParams {
    fn default() -> Self {
        Self::balanced()
    }
}

// ---------------------------------------------------------------------------
// Physical properties
// ---------------------------------------------------------------------------

/// Log-normal mass and power-law radius for one tier of the hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierParams {
    /// Mean of `ln(mass)`.
    pub mass_mu: f64,
    /// Standard deviation of `ln(mass)`.
    pub mass_sigma: f64,
    /// `radius = radius_scale · mass^radius_power`.
    pub radius_scale: f64,
    pub radius_power: f64,
}

impl TierParams {
    pub const fn new(mass_mu: f64, mass_sigma: f64, radius_scale: f64, radius_power: f64) -> Self {
        Self {
            mass_mu,
            mass_sigma,
            radius_scale,
            radius_power,
        }
    }
}

/// Masses are in tier-natural units: solar masses for stars, Earth masses
/// for everything orbiting them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MassParams {
    pub star: TierParams,
    pub planet: TierParams,
    pub moon: TierParams,
    pub sub_moon: TierParams,
}

impl Default for MassParams {
    fn default() -> Self {
        Self {
            star: TierParams::new(0.0, 0.5, 6.0, 0.8),
            planet: TierParams::new(0.5, 1.2, 0.6, 0.28),
            moon: TierParams::new(-3.5, 1.0, 0.6, 0.28),
            sub_moon: TierParams::new(-6.0, 0.8, 0.6, 0.28),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrbitParams {
    /// Orbit radius of the first planet around a star.
    pub planet_base: f64,
    /// Orbit radius of the first moon around a planet.
    pub moon_base: f64,
    /// Orbit radius of the first sub-moon around a moon.
    pub sub_moon_base: f64,
    /// Relative jitter: `distance · (1 + jitter·U)`, `U` in [-1, 1).
    pub jitter: f64,
    /// `speed = orbit_k / sqrt(distance)`, degrees per time unit.
    pub orbit_k: f64,
    /// Companion star `n` orbits the primary at `binary_separation · n`.
    pub binary_separation: f64,
    /// Orbital inclinations are drawn uniformly in `±max_inclination` degrees.
    pub max_inclination: f64,
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self {
            planet_base: 40.0,
            moon_base: 4.0,
            sub_moon_base: 1.0,
            jitter: 0.1,
            orbit_k: 60.0,
            binary_separation: 14.0,
            max_inclination: 4.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Feature layers
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureToggles {
    pub rings: bool,
    pub belts: bool,
    pub kuiper_belts: bool,
    pub comets: bool,
    pub lagrange_points: bool,
    pub protoplanetary_disks: bool,
    pub black_holes: bool,
    pub nebulae: bool,
    pub rogue_planets: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            rings: true,
            belts: true,
            kuiper_belts: true,
            comets: true,
            lagrange_points: true,
            protoplanetary_disks: false,
            black_holes: false,
            nebulae: true,
            rogue_planets: false,
        }
    }
}

impl FeatureToggles {
    /// Every optional layer off.
    pub fn none() -> Self {
        Self {
            rings: false,
            belts: false,
            kuiper_belts: false,
            comets: false,
            lagrange_points: false,
            protoplanetary_disks: false,
            black_holes: false,
            nebulae: false,
            rogue_planets: false,
        }
    }

    /// Every optional layer on.
    pub fn all() -> Self {
        Self {
            rings: true,
            belts: true,
            kuiper_belts: true,
            comets: true,
            lagrange_points: true,
            protoplanetary_disks: true,
            black_holes: true,
            nebulae: true,
            rogue_planets: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureParams {
    pub ring_probability: f64,
    pub belt_probability: f64,
    pub belt_particles: u64,
    /// Upper bound on named `asteroid` bodies inside a belt.
    pub max_named_asteroids: u32,
    pub kuiper_probability: f64,
    pub kuiper_particles: u64,
    pub max_comets_per_system: u32,
    pub lagrange_probability: f64,
    pub disk_probability: f64,
    pub disk_particles: u64,
    /// Probability that a system's primary is generated as a black hole.
    pub black_hole_probability: f64,
    pub nebula_count: u32,
    pub nebula_particles: u64,
    /// Standard deviation of nebula positions around the origin.
    pub nebula_spread: f64,
    pub rogue_planet_count: u32,
    /// Standard deviation of rogue planet positions around the origin.
    pub rogue_spread: f64,
    /// Upper bound on a rogue planet's drift speed.
    pub rogue_max_drift: f64,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            ring_probability: 0.25,
            belt_probability: 0.35,
            belt_particles: 1_500,
            max_named_asteroids: 3,
            kuiper_probability: 0.3,
            kuiper_particles: 2_500,
            max_comets_per_system: 2,
            lagrange_probability: 0.15,
            disk_probability: 0.1,
            disk_particles: 4_000,
            black_hole_probability: 0.05,
            nebula_count: 2,
            nebula_particles: 6_000,
            nebula_spread: 1_800.0,
            rogue_planet_count: 3,
            rogue_spread: 1_500.0,
            rogue_max_drift: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupingParams {
    /// 0 disables grouping.
    pub group_count: u32,
    /// Chance that a group nests under an earlier one.
    pub nesting_probability: f64,
    /// Deepest nesting allowed; 1 means flat.
    pub max_nesting_depth: u32,
    /// Standard deviation of group positions around the origin.
    pub group_spread: f64,
    /// Standard deviation of system positions around their group (or the
    /// origin when ungrouped).
    pub system_spread: f64,
}

impl Default for GroupingParams {
    fn default() -> Self {
        Self {
            group_count: 0,
            nesting_probability: 0.3,
            max_nesting_depth: 2,
            group_spread: 1_200.0,
            system_spread: 300.0,
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    /// Text or number; `None` means `DEFAULT_SEED`.
    pub seed: Option<Seed>,
    pub system_count: u32,
    /// When set, replaces `topology` during validation.
    pub preset: Option<TopologyPreset>,
    pub topology: TopologyParams,
    pub mass: MassParams,
    pub orbit: OrbitParams,
    pub features: FeatureToggles,
    pub feature_params: FeatureParams,
    pub grouping: GroupingParams,
    pub max_children_per_body: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            system_count: 8,
            preset: None,
            topology: TopologyParams::default(),
            mass: MassParams::default(),
            orbit: OrbitParams::default(),
            features: FeatureToggles::default(),
            feature_params: FeatureParams::default(),
            grouping: GroupingParams::default(),
            max_children_per_body: 12,
        }
    }
}

/// Why a `GenerationConfig` was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be a probability in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
    #[error("star count probabilities sum to {sum}, expected 1")]
    ProbabilitySum { sum: f64 },
    #[error("{field} must be in (0, 1], got {value}")]
    GeometricP { field: &'static str, value: f64 },
    #[error("{field} must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be finite and between {min} and {max}, got {value}")]
    Bounds {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { field, value })
    }
}

fn geometric_p(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::GeometricP { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn in_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn bounded(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Bounds {
            field,
            value,
            min,
            max,
        })
    }
}

/// `(0, max]`.
fn positive_at_most(field: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    positive(field, value)?;
    bounded(field, value, 0.0, max)
}

/// Field names of one mass tier: mu, sigma, radius scale, radius power.
type TierFields = [&'static str; 4];

fn tier(fields: &TierFields, t: &TierParams) -> Result<(), ConfigError> {
    let [mu, sigma, scale, power] = *fields;
    bounded(mu, t.mass_mu, -MAX_MASS_MU, MAX_MASS_MU)?;
    bounded(sigma, t.mass_sigma, 0.0, MAX_MASS_SIGMA)?;
    positive_at_most(scale, t.radius_scale, MAX_LENGTH)?;
    bounded(power, t.radius_power, 0.0, MAX_RADIUS_POWER)
}

const TIER_FIELDS: [TierFields; 4] = [
    [
        "mass.star.massMu",
        "mass.star.massSigma",
        "mass.star.radiusScale",
        "mass.star.radiusPower",
    ],
    [
        "mass.planet.massMu",
        "mass.planet.massSigma",
        "mass.planet.radiusScale",
        "mass.planet.radiusPower",
    ],
    [
        "mass.moon.massMu",
        "mass.moon.massSigma",
        "mass.moon.radiusScale",
        "mass.moon.radiusPower",
    ],
    [
        "mass.subMoon.massMu",
        "mass.subMoon.massSigma",
        "mass.subMoon.radiusScale",
        "mass.subMoon.radiusPower",
    ],
];

impl GenerationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The seed this config resolves to.
    pub fn resolved_seed(&self) -> u32 {
        self.seed.as_ref().map_or(DEFAULT_SEED, Seed::to_u32)
    }

    /// Check every parameter; on success the config is safe to generate
    /// from. A preset, if named, replaces `topology` first.
    pub fn validate(mut self) -> Result<ValidatedConfig, ConfigError> {
        if let Some(preset) = self.preset {
            self.topology = preset.params();
        }

        let t = &self.topology;
        for (i, &p) in t.star_count_probabilities.iter().enumerate() {
            const FIELDS: [&str; 3] = [
                "topology.starCountProbabilities[0]",
                "topology.starCountProbabilities[1]",
                "topology.starCountProbabilities[2]",
            ];
            probability(FIELDS[i], p)?;
        }
        let sum: f64 = t.star_count_probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ConfigError::ProbabilitySum { sum });
        }
        geometric_p("topology.planetGeometricP", t.planet_geometric_p)?;
        geometric_p("topology.moonGeometricP", t.moon_geometric_p)?;
        in_range("topology.maxDepth", t.max_depth.into(), 1, MAX_DEPTH.into())?;
        positive_at_most("topology.orbitGrowth", t.orbit_growth, MAX_ORBIT_GROWTH)?;

        in_range(
            "systemCount",
            self.system_count.into(),
            0,
            MAX_SYSTEM_COUNT.into(),
        )?;
        in_range(
            "maxChildrenPerBody",
            self.max_children_per_body.into(),
            0,
            MAX_CHILDREN_PER_BODY.into(),
        )?;

        let m = &self.mass;
        for (fields, t) in TIER_FIELDS.iter().zip([&m.star, &m.planet, &m.moon, &m.sub_moon]) {
            tier(fields, t)?;
        }

        let o = &self.orbit;
        positive_at_most("orbit.planetBase", o.planet_base, MAX_LENGTH)?;
        positive_at_most("orbit.moonBase", o.moon_base, MAX_LENGTH)?;
        positive_at_most("orbit.subMoonBase", o.sub_moon_base, MAX_LENGTH)?;
        probability("orbit.jitter", o.jitter)?;
        positive_at_most("orbit.orbitK", o.orbit_k, MAX_LENGTH)?;
        positive_at_most("orbit.binarySeparation", o.binary_separation, MAX_LENGTH)?;
        bounded("orbit.maxInclination", o.max_inclination, 0.0, MAX_INCLINATION)?;

        let f = &self.feature_params;
        probability("featureParams.ringProbability", f.ring_probability)?;
        probability("featureParams.beltProbability", f.belt_probability)?;
        probability("featureParams.kuiperProbability", f.kuiper_probability)?;
        probability("featureParams.lagrangeProbability", f.lagrange_probability)?;
        probability("featureParams.diskProbability", f.disk_probability)?;
        probability("featureParams.blackHoleProbability", f.black_hole_probability)?;
        for (field, value) in [
            ("featureParams.beltParticles", f.belt_particles),
            ("featureParams.kuiperParticles", f.kuiper_particles),
            ("featureParams.diskParticles", f.disk_particles),
            ("featureParams.nebulaParticles", f.nebula_particles),
        ] {
            in_range(field, value, 0, MAX_PARTICLES)?;
        }
        for (field, value) in [
            ("featureParams.maxNamedAsteroids", f.max_named_asteroids),
            ("featureParams.maxCometsPerSystem", f.max_comets_per_system),
            ("featureParams.nebulaCount", f.nebula_count),
            ("featureParams.roguePlanetCount", f.rogue_planet_count),
        ] {
            in_range(field, value.into(), 0, MAX_FEATURE_COUNT.into())?;
        }
        positive_at_most("featureParams.nebulaSpread", f.nebula_spread, MAX_LENGTH)?;
        positive_at_most("featureParams.rogueSpread", f.rogue_spread, MAX_LENGTH)?;
        bounded("featureParams.rogueMaxDrift", f.rogue_max_drift, 0.0, MAX_LENGTH)?;

        let g = &self.grouping;
        in_range("grouping.groupCount", g.group_count.into(), 0, MAX_GROUP_COUNT.into())?;
        probability("grouping.nestingProbability", g.nesting_probability)?;
        in_range(
            "grouping.maxNestingDepth",
            g.max_nesting_depth.into(),
            1,
            MAX_GROUP_NESTING_DEPTH.into(),
        )?;
        positive_at_most("grouping.groupSpread", g.group_spread, MAX_LENGTH)?;
        positive_at_most("grouping.systemSpread", g.system_spread, MAX_LENGTH)?;

        let seed = self.resolved_seed();
        Ok(ValidatedConfig { config: self, seed })
    }

    /// Clamp every parameter into range and rescale the star-count
    /// probabilities to sum to 1. The result always passes `validate`.
    pub fn normalized(&self) -> Self {
        let mut c = self.clone();
        if let Some(preset) = c.preset {
            c.topology = preset.params();
        }
        let defaults = GenerationConfig::default();

        let clamp_prob = |p: f64| if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
        let clamp_pos = |v: f64, fallback: f64| {
            if v.is_finite() && v > 0.0 {
                v.min(MAX_LENGTH)
            } else {
                fallback
            }
        };
        let clamp_between = |v: f64, min: f64, max: f64| if v.is_finite() { v.clamp(min, max) } else { min };

        let t = &mut c.topology;
        let mut probs = t.star_count_probabilities.map(clamp_prob);
        let sum: f64 = probs.iter().sum();
        if sum > 0.0 {
            probs = probs.map(|p| p / sum);
        } else {
            probs = [1.0, 0.0, 0.0];
        }
        t.star_count_probabilities = probs;
        let clamp_p = |p: f64| if p.is_finite() { p.clamp(0.01, 1.0) } else { 1.0 };
        t.planet_geometric_p = clamp_p(t.planet_geometric_p);
        t.moon_geometric_p = clamp_p(t.moon_geometric_p);
        t.max_depth = t.max_depth.clamp(1, MAX_DEPTH);
        t.orbit_growth =
            clamp_pos(t.orbit_growth, defaults.topology.orbit_growth).min(MAX_ORBIT_GROWTH);

        c.system_count = c.system_count.min(MAX_SYSTEM_COUNT);
        c.max_children_per_body = c.max_children_per_body.min(MAX_CHILDREN_PER_BODY);

        for (t, d) in [
            (&mut c.mass.star, &defaults.mass.star),
            (&mut c.mass.planet, &defaults.mass.planet),
            (&mut c.mass.moon, &defaults.mass.moon),
            (&mut c.mass.sub_moon, &defaults.mass.sub_moon),
        ] {
            t.mass_mu = if t.mass_mu.is_finite() {
                t.mass_mu.clamp(-MAX_MASS_MU, MAX_MASS_MU)
            } else {
                d.mass_mu
            };
            t.mass_sigma = clamp_between(t.mass_sigma, 0.0, MAX_MASS_SIGMA);
            t.radius_scale = clamp_pos(t.radius_scale, d.radius_scale);
            t.radius_power = clamp_between(t.radius_power, 0.0, MAX_RADIUS_POWER);
        }

        let (o, d) = (&mut c.orbit, &defaults.orbit);
        o.planet_base = clamp_pos(o.planet_base, d.planet_base);
        o.moon_base = clamp_pos(o.moon_base, d.moon_base);
        o.sub_moon_base = clamp_pos(o.sub_moon_base, d.sub_moon_base);
        o.jitter = clamp_prob(o.jitter);
        o.orbit_k = clamp_pos(o.orbit_k, d.orbit_k);
        o.binary_separation = clamp_pos(o.binary_separation, d.binary_separation);
        o.max_inclination = clamp_between(o.max_inclination, 0.0, MAX_INCLINATION);

        let (f, d) = (&mut c.feature_params, &defaults.feature_params);
        for p in [
            &mut f.ring_probability,
            &mut f.belt_probability,
            &mut f.kuiper_probability,
            &mut f.lagrange_probability,
            &mut f.disk_probability,
            &mut f.black_hole_probability,
        ] {
            *p = clamp_prob(*p);
        }
        for n in [
            &mut f.belt_particles,
            &mut f.kuiper_particles,
            &mut f.disk_particles,
            &mut f.nebula_particles,
        ] {
            *n = (*n).min(MAX_PARTICLES);
        }
        for n in [
            &mut f.max_named_asteroids,
            &mut f.max_comets_per_system,
            &mut f.nebula_count,
            &mut f.rogue_planet_count,
        ] {
            *n = (*n).min(MAX_FEATURE_COUNT);
        }
        f.nebula_spread = clamp_pos(f.nebula_spread, d.nebula_spread);
        f.rogue_spread = clamp_pos(f.rogue_spread, d.rogue_spread);
        f.rogue_max_drift = clamp_between(f.rogue_max_drift, 0.0, MAX_LENGTH);

        let (g, d) = (&mut c.grouping, &defaults.grouping);
        g.group_count = g.group_count.min(MAX_GROUP_COUNT);
        g.nesting_probability = clamp_prob(g.nesting_probability);
        g.max_nesting_depth = g.max_nesting_depth.clamp(1, MAX_GROUP_NESTING_DEPTH);
        g.group_spread = clamp_pos(g.group_spread, d.group_spread);
        g.system_spread = clamp_pos(g.system_spread, d.system_spread);

        c
    }
}

/// A configuration that passed `GenerationConfig::validate`. The generator
/// accepts nothing else, so it never has to defend against bad input.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedConfig {
    config: GenerationConfig,
    seed: u32,
}

impl ValidatedConfig {
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn into_inner(self) -> GenerationConfig {
        self.config
    }
}

impl TryFrom<GenerationConfig> for ValidatedConfig {
    type Error = ConfigError;

    fn try_from(config: GenerationConfig) -> Result<Self, ConfigError> {
        config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let validated = GenerationConfig::default().validate().unwrap();
        assert_eq!(validated.seed(), DEFAULT_SEED);
    }

    #[test]
    fn every_preset_is_valid() {
        for preset in [
            TopologyPreset::Balanced,
            TopologyPreset::Compact,
            TopologyPreset::MoonRich,
            TopologyPreset::MultiStarHeavy,
            TopologyPreset::Sparse,
        ] {
            let config = GenerationConfig {
                preset: Some(preset),
                ..Default::default()
            };
            let validated = config.validate().unwrap();
            assert_eq!(validated.config().topology, preset.params());
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = GenerationConfig::from_json(
            r#"{"seed":"andromeda","systemCount":3,"topology":{"planetGeometricP":0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.system_count, 3);
        assert_eq!(config.topology.planet_geometric_p, 0.5);
        assert_eq!(
            config.topology.star_count_probabilities,
            TopologyParams::balanced().star_count_probabilities
        );
        assert_eq!(config.resolved_seed(), Seed::from("andromeda").to_u32());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn preset_from_json_name() {
        let config = GenerationConfig::from_json(r#"{"preset":"moonRich"}"#).unwrap();
        assert_eq!(config.preset, Some(TopologyPreset::MoonRich));
    }

    #[test]
    fn bad_json_is_a_config_error() {
        assert!(matches!(
            GenerationConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn probabilities_must_sum_to_one() {
        let mut config = GenerationConfig::default();
        config.topology.star_count_probabilities = [0.5, 0.2, 0.2];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilitySum { .. })
        ));
    }

    #[test]
    fn negative_probability_is_rejected() {
        let mut config = GenerationConfig::default();
        config.topology.star_count_probabilities = [1.2, -0.2, 0.0];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("starCountProbabilities[0]"), "{err}");
    }

    #[test]
    fn geometric_p_must_be_positive() {
        let mut config = GenerationConfig::default();
        config.topology.planet_geometric_p = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::GeometricP { .. })));
    }

    #[test]
    fn depth_and_counts_are_bounded() {
        let mut config = GenerationConfig::default();
        config.topology.max_depth = 4;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        let mut config = GenerationConfig::default();
        config.system_count = MAX_SYSTEM_COUNT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn orbit_parameters_must_be_positive() {
        let mut config = GenerationConfig::default();
        config.orbit.planet_base = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { .. })));
        let mut config = GenerationConfig::default();
        config.orbit.orbit_k = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn mass_parameters_are_bounded() {
        let mut config = GenerationConfig::default();
        config.mass.star.mass_mu = 800.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Bounds { field: "mass.star.massMu", .. }), "{err}");

        let mut config = GenerationConfig::default();
        config.mass.moon.mass_sigma = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mass.moon.massSigma"), "{err}");

        let mut config = GenerationConfig::default();
        config.mass.planet.radius_power = MAX_RADIUS_POWER + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn growth_and_lengths_are_bounded() {
        let mut config = GenerationConfig::default();
        config.topology.orbit_growth = 1e3;
        assert!(matches!(config.validate(), Err(ConfigError::Bounds { .. })));

        let mut config = GenerationConfig::default();
        config.grouping.system_spread = f64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn normalized_clamps_unbounded_knobs() {
        let mut config = GenerationConfig::default();
        config.mass.star.mass_mu = 800.0;
        config.mass.star.mass_sigma = 1e9;
        config.mass.planet.radius_power = f64::INFINITY;
        config.topology.orbit_growth = 1e6;
        config.orbit.orbit_k = 1e300;

        let fixed = config.normalized();
        assert_eq!(fixed.mass.star.mass_mu, MAX_MASS_MU);
        assert_eq!(fixed.mass.star.mass_sigma, MAX_MASS_SIGMA);
        assert_eq!(fixed.mass.planet.radius_power, 0.0);
        assert_eq!(fixed.topology.orbit_growth, MAX_ORBIT_GROWTH);
        assert_eq!(fixed.orbit.orbit_k, MAX_LENGTH);
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn normalized_repairs_everything() {
        let mut config = GenerationConfig::default();
        config.topology.star_count_probabilities = [2.0, 2.0, f64::NAN];
        config.topology.planet_geometric_p = -3.0;
        config.topology.max_depth = 9;
        config.orbit.jitter = 5.0;
        config.orbit.planet_base = 0.0;
        config.feature_params.ring_probability = 1.5;
        config.grouping.max_nesting_depth = 0;
        config.system_count = u32::MAX;

        let fixed = config.normalized();
        assert_eq!(fixed.topology.star_count_probabilities, [0.5, 0.5, 0.0]);
        assert_eq!(fixed.topology.planet_geometric_p, 0.01);
        assert_eq!(fixed.topology.max_depth, MAX_DEPTH);
        assert_eq!(fixed.orbit.jitter, 1.0);
        assert_eq!(fixed.orbit.planet_base, OrbitParams::default().planet_base);
        assert_eq!(fixed.system_count, MAX_SYSTEM_COUNT);
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn all_zero_probabilities_normalize_to_single_star() {
        let mut config = GenerationConfig::default();
        config.topology.star_count_probabilities = [0.0; 3];
        assert_eq!(
            config.normalized().topology.star_count_probabilities,
            [1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn numeric_seed_truncates() {
        let config = GenerationConfig {
            seed: Some(Seed::Number(0x1_0000_0007)),
            ..Default::default()
        };
        assert_eq!(config.resolved_seed(), 7);
    }
}
