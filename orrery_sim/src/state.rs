// The universe snapshot.
//
// `UniverseState` is the root aggregate: every body, group and particle field
// plus the accumulated simulation time. It is plain data: cloneable,
// comparable, and serialized to a single canonical camelCase JSON shape so a
// persistence adapter needs no knowledge of the core.
//
// The body and group forests are crate-private. Outside code reads them
// through accessors and changes them only through `Command`s (see
// `reducer.rs`) or wholesale replacement. The particle-field maps carry no
// structural invariants and are public.
//
// See also: `hierarchy.rs` for forest maintenance, `invariants.rs` for the
// full consistency audit, `generator.rs` which builds fresh snapshots.
//
// **Critical constraint: determinism.** All maps are `BTreeMap` so iteration
// order, and therefore serialized output, is stable.

use crate::body::Body;
use crate::field::{Belt, Nebula, ProtoplanetaryDisk, SmallBodyField};
use crate::group::Group;
use crate::types::{BodyId, FieldId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UniverseState {
    pub(crate) bodies: BTreeMap<BodyId, Body>,
    pub(crate) root_body_ids: Vec<BodyId>,
    pub(crate) groups: BTreeMap<GroupId, Group>,
    pub(crate) root_group_ids: Vec<GroupId>,
    pub belts: BTreeMap<FieldId, Belt>,
    pub small_body_fields: BTreeMap<FieldId, SmallBodyField>,
    pub protoplanetary_disks: BTreeMap<FieldId, ProtoplanetaryDisk>,
    pub nebulae: BTreeMap<FieldId, Nebula>,
    pub(crate) simulation_time: f64,
}

impl UniverseState {
    /// An empty universe at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> &BTreeMap<BodyId, Body> {
        &self.bodies
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn root_body_ids(&self) -> &[BodyId] {
        &self.root_body_ids
    }

    pub fn groups(&self) -> &BTreeMap<GroupId, Group> {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn root_group_ids(&self) -> &[GroupId] {
        &self.root_group_ids
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// The group whose children include the system rooted at `body_id`.
    pub fn group_of_system(&self, body_id: &str) -> Option<&GroupId> {
        self.groups
            .values()
            .find(|g| g.systems().any(|id| id.as_str() == body_id))
            .map(|g| &g.id)
    }

    /// Bodies in depth-first pre-order, roots in root-list order.
    pub fn bodies_depth_first(&self) -> Vec<&Body> {
        let mut out = Vec::with_capacity(self.bodies.len());
        let mut stack: Vec<&BodyId> = self.root_body_ids.iter().rev().collect();
        while let Some(id) = stack.pop() {
            let Some(body) = self.bodies.get(id) else {
                continue;
            };
            out.push(body);
            if out.len() > self.bodies.len() {
                break;
            }
            stack.extend(body.children.iter().rev());
        }
        out
    }

    /// Compare everything except `simulationTime`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.bodies == other.bodies
            && self.root_body_ids == other.root_body_ids
            && self.groups == other.groups
            && self.root_group_ids == other.root_group_ids
            && self.belts == other.belts
            && self.small_body_fields == other.small_body_fields
            && self.protoplanetary_disks == other.protoplanetary_disks
            && self.nebulae == other.nebulae
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyKind, CometData, NewBody};
    use crate::hierarchy;

    #[test]
    fn empty_state_json_shape() {
        let json = UniverseState::new().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "bodies",
            "rootBodyIds",
            "groups",
            "rootGroupIds",
            "belts",
            "smallBodyFields",
            "protoplanetaryDisks",
            "nebulae",
            "simulationTime",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn partial_snapshot_loads_with_defaults() {
        let state = UniverseState::from_json(r#"{"simulationTime": 12.5}"#).unwrap();
        assert_eq!(state.simulation_time(), 12.5);
        assert!(state.bodies().is_empty());
    }

    #[test]
    fn json_round_trip_preserves_everything() {
        let mut state = UniverseState::new();
        hierarchy::insert_body(&mut state, NewBody::new("s", "Sun", BodyKind::Moon).into());
        hierarchy::insert_body(
            &mut state,
            NewBody::new("p", "Planet", BodyKind::Planet { ring: None })
                .with_parent("s")
                .into(),
        );
        state.simulation_time = 3.0;
        let restored = UniverseState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn awkward_floats_round_trip_exactly() {
        let mut state = UniverseState::new();
        let values = [1.0670243736110405, 0.1 + 0.2, 2.2250738585072014e-308, 1.0e300 / 3.0];
        for (i, &value) in values.iter().enumerate() {
            let id = format!("c{i}");
            hierarchy::insert_body(
                &mut state,
                NewBody {
                    mass: value,
                    radius: value,
                    orbital_phase: value,
                    ..NewBody::new(
                        id.clone(),
                        id,
                        BodyKind::Comet {
                            comet: CometData {
                                eccentricity: value,
                                tail_length: value,
                                activity: value,
                            },
                        },
                    )
                }
                .into(),
            );
        }
        let restored = UniverseState::from_json(&state.to_json().unwrap()).unwrap();
        for body in restored.bodies().values() {
            let original = &state.bodies[&body.id];
            assert_eq!(body.mass.to_bits(), original.mass.to_bits(), "{}", body.id);
        }
        assert_eq!(restored, state);
    }

    #[test]
    fn depth_first_order() {
        let mut state = UniverseState::new();
        for (id, parent) in [("a", None), ("b", Some("a")), ("c", Some("b")), ("d", Some("a")), ("e", None)] {
            let mut new = NewBody::new(id, id, BodyKind::Asteroid);
            if let Some(p) = parent {
                new = new.with_parent(p);
            }
            hierarchy::insert_body(&mut state, new.into());
        }
        let order: Vec<&str> = state.bodies_depth_first().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn same_content_ignores_time() {
        let a = UniverseState::new();
        let mut b = UniverseState::new();
        b.simulation_time = 99.0;
        assert!(a.same_content(&b));
        assert_ne!(a, b);
    }
}
