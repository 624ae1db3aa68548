// Kinematic positions at a simulation time.
//
// Orbits are parametric circles, not integrated trajectories. A body with
// `orbitalDistance` d sits at angle `orbitalPhase + orbitalSpeed · t` degrees
// in its parent's XZ plane, tilted about the X axis by `orbitalInclination`.
// World positions compose these offsets up the ancestor chain, starting from
// the root's stored `position` (plus drift for rogue planets).
//
// Lagrange markers ignore their own orbit fields. Their position is derived
// from the primary and secondary they reference: L1/L2 sit one Hill radius
// `d · cbrt(m2 / 3m1)` inside/outside the secondary, L3 opposite the
// secondary, and L4/L5 60° ahead/behind it.
//
// Ancestor walks are bounded by the number of bodies and marker lookups by
// `MAX_MARKER_NESTING`, so a corrupt snapshot (a parent loop, or a marker
// whose reference orbits the marker) yields `None` instead of spinning.
//
// See also: `body.rs` for the orbit fields, `types.rs` for `Vec3`.

use crate::body::{Body, BodyKind, LagrangePointKind};
use crate::state::UniverseState;
use crate::types::Vec3;
use std::f64::consts::FRAC_PI_3;

/// How many markers deep a position lookup may recurse (a marker whose
/// secondary orbits another marker, and so on).
const MAX_MARKER_NESTING: u32 = 4;

/// Offset of `body` from its parent at time `t`.
pub fn orbit_offset(body: &Body, t: f64) -> Vec3 {
    if body.orbital_distance == 0.0 {
        return Vec3::ZERO;
    }
    let angle = (body.orbital_phase + body.orbital_speed * t).to_radians();
    let (sin, cos) = angle.sin_cos();
    let (tilt_sin, tilt_cos) = body.orbital_inclination.to_radians().sin_cos();
    let d = body.orbital_distance;
    Vec3::new(d * cos, d * sin * tilt_sin, d * sin * tilt_cos)
}

/// World position of body `id` at time `t`. `None` if the body is missing or
/// the snapshot is structurally corrupt.
pub fn world_position(state: &UniverseState, id: &str, t: f64) -> Option<Vec3> {
    let body = state.body(id)?;
    position_within(state, body, t, MAX_MARKER_NESTING)
}

/// Position of a Lagrange marker from its primary and secondary. `None` if
/// `body` is not a marker, a reference is missing, or a reference is itself a
/// marker.
pub fn lagrange_position(state: &UniverseState, body: &Body, t: f64) -> Option<Vec3> {
    lagrange_within(state, body, t, MAX_MARKER_NESTING)
}

fn position_within(state: &UniverseState, body: &Body, t: f64, nesting: u32) -> Option<Vec3> {
    let mut offset = Vec3::ZERO;
    let mut current = body;
    for _ in 0..=state.bodies().len() {
        if matches!(current.kind, BodyKind::LagrangePoint { .. }) {
            return Some(lagrange_within(state, current, t, nesting.checked_sub(1)?)? + offset);
        }
        match current.parent_id().and_then(|p| state.body(p.as_str())) {
            Some(parent) => {
                offset = offset + orbit_offset(current, t);
                current = parent;
            }
            None => return Some(root_position(current, t) + offset),
        }
    }
    None
}

fn root_position(root: &Body, t: f64) -> Vec3 {
    match &root.kind {
        BodyKind::RoguePlanet { rogue, .. } => root.position + rogue.drift_velocity * t,
        _ => root.position,
    }
}

fn lagrange_within(state: &UniverseState, body: &Body, t: f64, nesting: u32) -> Option<Vec3> {
    let lagrange = body.kind.lagrange()?;
    let primary = state.body(lagrange.primary_id.as_str())?;
    let secondary = state.body(lagrange.secondary_id.as_str())?;
    if primary.kind.lagrange().is_some() || secondary.kind.lagrange().is_some() {
        return None;
    }
    let p = position_within(state, primary, t, nesting)?;
    let s = position_within(state, secondary, t, nesting)?;

    let r = s - p;
    let hill = if primary.mass > 0.0 {
        r.length() * (secondary.mass / (3.0 * primary.mass)).cbrt()
    } else {
        0.0
    };
    let u = r.normalized();
    Some(match lagrange.point {
        LagrangePointKind::L1 => s - u * hill,
        LagrangePointKind::L2 => s + u * hill,
        LagrangePointKind::L3 => p - r,
        LagrangePointKind::L4 => p + r.rotated_y(FRAC_PI_3),
        LagrangePointKind::L5 => p + r.rotated_y(-FRAC_PI_3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{LagrangeData, NewBody, RogueData, SpectralClass, StarData};
    use crate::hierarchy;

    const EPS: f64 = 1e-9;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < EPS
    }

    fn star(id: &str, mass: f64, position: Vec3) -> Body {
        Body::from(NewBody {
            mass,
            position,
            ..NewBody::new(
                id,
                id,
                BodyKind::Star {
                    star: StarData {
                        spectral_class: SpectralClass::G,
                        luminosity: 1.0,
                    },
                },
            )
        })
    }

    fn orbiter(id: &str, parent: &str, distance: f64, phase: f64, mass: f64) -> Body {
        Body::from(NewBody {
            mass,
            orbital_distance: distance,
            orbital_phase: phase,
            orbital_speed: 10.0,
            ..NewBody::new(id, id, BodyKind::Planet { ring: None }).with_parent(parent)
        })
    }

    fn marker(id: &str, primary: &str, secondary: &str, point: LagrangePointKind) -> Body {
        Body::from(
            NewBody::new(
                id,
                id,
                BodyKind::LagrangePoint {
                    lagrange: LagrangeData {
                        primary_id: primary.into(),
                        secondary_id: secondary.into(),
                        point,
                    },
                },
            )
            .with_parent(secondary),
        )
    }

    fn system() -> UniverseState {
        let mut state = UniverseState::new();
        hierarchy::insert_body(&mut state, star("s", 3000.0, Vec3::new(100.0, 0.0, 0.0)));
        hierarchy::insert_body(&mut state, orbiter("p", "s", 10.0, 0.0, 1.0));
        hierarchy::insert_body(&mut state, orbiter("m", "p", 2.0, 90.0, 0.01));
        state
    }

    #[test]
    fn offset_follows_phase_and_speed() {
        let state = system();
        let planet = state.body("p").unwrap();
        assert!(close(orbit_offset(planet, 0.0), Vec3::new(10.0, 0.0, 0.0)));
        // 10°/unit for 9 units is a quarter turn.
        assert!(close(orbit_offset(planet, 9.0), Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn inclination_tilts_out_of_plane() {
        let body = Body::from(NewBody {
            orbital_distance: 5.0,
            orbital_phase: 90.0,
            orbital_inclination: 90.0,
            ..NewBody::new("x", "x", BodyKind::Moon)
        });
        assert!(close(orbit_offset(&body, 0.0), Vec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn world_position_composes_ancestors() {
        let state = system();
        assert!(close(
            world_position(&state, "s", 0.0).unwrap(),
            Vec3::new(100.0, 0.0, 0.0)
        ));
        assert!(close(
            world_position(&state, "m", 0.0).unwrap(),
            Vec3::new(110.0, 0.0, 2.0)
        ));
        assert!(world_position(&state, "ghost", 0.0).is_none());
    }

    #[test]
    fn rogue_planets_drift() {
        let mut state = UniverseState::new();
        hierarchy::insert_body(
            &mut state,
            Body::from(NewBody::new(
                "r",
                "r",
                BodyKind::RoguePlanet {
                    rogue: RogueData {
                        drift_velocity: Vec3::new(1.0, 0.0, -1.0),
                    },
                    ring: None,
                },
            )),
        );
        assert!(close(
            world_position(&state, "r", 3.0).unwrap(),
            Vec3::new(3.0, 0.0, -3.0)
        ));
    }

    #[test]
    fn lagrange_points_around_the_secondary() {
        let mut state = system();
        for (id, point) in [
            ("l1", LagrangePointKind::L1),
            ("l2", LagrangePointKind::L2),
            ("l3", LagrangePointKind::L3),
            ("l4", LagrangePointKind::L4),
            ("l5", LagrangePointKind::L5),
        ] {
            hierarchy::insert_body(&mut state, marker(id, "s", "p", point));
        }
        let at = |id: &str| world_position(&state, id, 0.0).unwrap();

        // m2 / 3m1 = 1/9000, cube root is about 0.0481.
        let hill = 10.0 * (1.0_f64 / 9000.0).cbrt();
        assert!(close(at("l1"), Vec3::new(110.0 - hill, 0.0, 0.0)));
        assert!(close(at("l2"), Vec3::new(110.0 + hill, 0.0, 0.0)));
        assert!(close(at("l3"), Vec3::new(90.0, 0.0, 0.0)));
        let (sin, cos) = FRAC_PI_3.sin_cos();
        assert!(close(at("l4"), Vec3::new(100.0 + 10.0 * cos, 0.0, 10.0 * sin)));
        assert!(close(at("l5"), Vec3::new(100.0 + 10.0 * cos, 0.0, -10.0 * sin)));
    }

    #[test]
    fn lagrange_with_missing_reference_has_no_position() {
        let mut state = system();
        hierarchy::insert_body(&mut state, marker("l4", "gone", "p", LagrangePointKind::L4));
        let body = state.body("l4").unwrap();
        assert!(lagrange_position(&state, body, 0.0).is_none());
        assert!(lagrange_position(&state, state.body("p").unwrap(), 0.0).is_none());
    }

    #[test]
    fn markers_referencing_markers_have_no_position() {
        let mut state = system();
        hierarchy::insert_body(&mut state, marker("a", "s", "p", LagrangePointKind::L4));
        hierarchy::insert_body(&mut state, marker("b", "a", "p", LagrangePointKind::L5));
        let b = state.body("b").unwrap();
        assert!(lagrange_position(&state, b, 0.0).is_none());
    }

    #[test]
    fn children_of_markers_do_not_loop() {
        // "c" orbits marker "a", and "a" references "c" as its secondary.
        let mut state = system();
        hierarchy::insert_body(&mut state, marker("a", "s", "c", LagrangePointKind::L4));
        hierarchy::insert_body(&mut state, orbiter("c", "a", 1.0, 0.0, 1.0));
        assert!(world_position(&state, "c", 0.0).is_none());
    }
}
