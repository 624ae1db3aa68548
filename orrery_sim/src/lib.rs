// orrery_sim: the universe domain core.
//
// This crate holds everything an orrery front end needs that is not
// rendering: the universe snapshot, the command reducer that is the only way
// to mutate it, a deterministic procedural generator, invariant checks, and
// aggregate statistics. It has no UI, persistence or network dependencies
// and runs headless in tests and benchmarks.
//
// Module overview:
// - `state.rs`:      UniverseState, the root aggregate and its JSON form.
// - `body.rs`:       Body, BodyKind (star, planet, moon, ... variants), rings.
// - `group.rs`:      Groups of systems and nested groups.
// - `field.rs`:      Particle fields: belts, small-body fields, disks, nebulae.
// - `command.rs`:    Command, every external mutation.
// - `reducer.rs`:    UniverseState::apply / apply_command, validation + dispatch.
// - `event.rs`:      DomainEvent / EventKind, including rejections.
// - `hierarchy.rs`:  Forest maintenance; the single writer of parent/child links.
// - `invariants.rs`: ParentGraph, cycle detection, descendants, check_forest.
// - `config.rs`:     GenerationConfig, presets, validation into ValidatedConfig.
// - `generator.rs`:  Procedural generation of a whole universe.
// - `sampling.rs`:   Gaussian, log-normal, geometric and weighted draws.
// - `names.rs`:      Procedural names for systems, bodies and groups.
// - `stats.rs`:      compute_stats, aggregate counts and summaries.
// - `kinematics.rs`: Parametric orbit positions and Lagrange points.
// - `types.rs`:      Vec3, entity IDs, deterministic UUIDs.
// - `prng`:          Re-exported from `orrery_prng`, xoshiro128++ with forking.
//
// **Critical constraint: determinism.** The reducer is a pure function
// `(state, command) -> (next_state, events)` and the generator is a pure
// function of its validated config. All randomness comes from `SeededRng`.
// No `HashMap` in serialized state, no system time, no OS entropy.

mod patch;

pub mod body;
pub mod command;
pub mod config;
pub mod event;
pub mod field;
pub mod generator;
pub mod group;
pub(crate) mod hierarchy;
pub mod invariants;
pub mod kinematics;
pub mod names;
pub use orrery_prng as prng;
pub mod reducer;
pub mod sampling;
pub mod state;
pub mod stats;
pub mod types;

pub use body::{Body, BodyKind, BodyType, NewBody};
pub use command::Command;
pub use config::{ConfigError, GenerationConfig, ValidatedConfig};
pub use event::{DomainEvent, EventKind};
pub use generator::{GeneratedUniverse, generate, generate_universe};
pub use reducer::{CommandOutcome, apply_command};
pub use state::UniverseState;
pub use stats::{UniverseStats, compute_stats};
