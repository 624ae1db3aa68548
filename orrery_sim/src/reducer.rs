// The command reducer.
//
// `UniverseState::apply` is the single entry point through which commands
// change a snapshot, and `apply_command` is its by-value form returning a
// `CommandOutcome { next_state, events }`. The reducer is total: it never
// panics and never returns an error. A command whose preconditions fail is a
// no-op that emits one rejection event (`notFound`, `duplicate`, `cycle`,
// `notAttached`, `invalidPayload`, `invalidTarget`).
//
// Each handler follows the same shape: check every precondition against the
// current state, return a rejection if any fails, and only then mutate. A
// rejected command therefore leaves the state exactly as it was. Structural
// edits are delegated to `hierarchy.rs`; cycle checks and cascade sets come
// from `invariants.rs`.
//
// Decisions worth knowing:
// - `addBody` with a parent that does not exist is rejected (`notFound`).
// - A group may only hold root bodies as systems; adding a child body is an
//   `invalidTarget`.
// - Lagrange-point bodies ignore position and orbit fields in `updateBody`;
//   their placement is computed (see `kinematics.rs`).
// - `removeBody` also removes every Lagrange marker (with its subtree) that
//   references a removed body, and reports it in `bodiesRemoved`.
// - `replaceSnapshot` keeps the current `simulationTime`.
//
// See also: `command.rs`, `event.rs`, `hierarchy.rs`, `invariants.rs`.

use crate::body::{Body, BodyKind, BodyPatch, BodyType, NewBody, Ring, RingPatch};
use crate::command::Command;
use crate::event::{CollectionKind, DomainEvent, EntityKind, EventKind};
use crate::group::{Group, GroupChild, GroupPatch, NewGroup};
use crate::hierarchy;
use crate::invariants::{removal_set, would_create_cycle};
use crate::state::UniverseState;
use crate::types::{BodyId, FieldId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of applying one command by value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub next_state: UniverseState,
    pub events: Vec<DomainEvent>,
}

/// Apply `command` to `state`, returning the next state and what happened.
pub fn apply_command(state: UniverseState, command: &Command) -> CommandOutcome {
    let mut next_state = state;
    let events = next_state.apply(command);
    CommandOutcome { next_state, events }
}

type Outcome = Result<EventKind, EventKind>;

impl UniverseState {
    /// Apply `command` in place and return the events it produced.
    pub fn apply(&mut self, command: &Command) -> Vec<DomainEvent> {
        let time = self.simulation_time;
        let mut events = Vec::new();
        match self.process_command(command) {
            Ok(kind) => {
                tracing::trace!(command = command.name(), event = ?kind, "command applied");
                events.push(DomainEvent { time, kind });
            }
            Err(kind) => {
                tracing::debug!(command = command.name(), event = ?kind, "command rejected");
                events.push(DomainEvent { time, kind });
            }
        }
        events
    }

    /// Apply a sequence of commands in order, collecting every event.
    pub fn apply_all<'a>(&mut self, commands: impl IntoIterator<Item = &'a Command>) -> Vec<DomainEvent> {
        commands.into_iter().flat_map(|c| self.apply(c)).collect()
    }

    fn process_command(&mut self, command: &Command) -> Outcome {
        match command {
            Command::Tick { dt } => Ok(self.tick(*dt)),

            Command::AddBody { body } => self.add_body(body),
            Command::UpdateBody { id, patch } => self.update_body(id, patch),
            Command::RemoveBody { id } => self.remove_body(id),
            Command::AttachBody {
                child_id,
                parent_id,
            } => self.attach_body(child_id, parent_id),
            Command::DetachBody { child_id } => self.detach_body(child_id),

            Command::AddGroup { group } => self.add_group(group),
            Command::UpdateGroup { id, patch } => self.update_group(id, patch),
            Command::RemoveGroup { id } => self.remove_group(id),
            Command::AddToGroup { group_id, child } => self.add_to_group(group_id, child),
            Command::RemoveFromGroup { group_id, child } => {
                self.remove_from_group(group_id, child)
            }
            Command::MoveToGroup {
                child,
                target_group_id,
            } => self.move_to_group(child, target_group_id.as_ref()),

            Command::SetBelts { belts } => {
                self.belts = belts.clone();
                Ok(replaced(CollectionKind::Belts, belts.len()))
            }
            Command::SetSmallBodyFields { fields } => {
                self.small_body_fields = fields.clone();
                Ok(replaced(CollectionKind::SmallBodyFields, fields.len()))
            }
            Command::SetProtoplanetaryDisks { disks } => {
                self.protoplanetary_disks = disks.clone();
                Ok(replaced(CollectionKind::ProtoplanetaryDisks, disks.len()))
            }
            Command::SetNebulae { nebulae } => {
                self.nebulae = nebulae.clone();
                Ok(replaced(CollectionKind::Nebulae, nebulae.len()))
            }

            Command::UpdateSmallBodyField { id, patch } => update_field(
                &mut self.small_body_fields,
                CollectionKind::SmallBodyFields,
                id,
                |f| patch.apply_to(f),
            ),
            Command::RemoveSmallBodyField { id } => {
                remove_field(&mut self.small_body_fields, CollectionKind::SmallBodyFields, id)
            }
            Command::UpdateProtoplanetaryDisk { id, patch } => update_field(
                &mut self.protoplanetary_disks,
                CollectionKind::ProtoplanetaryDisks,
                id,
                |d| patch.apply_to(d),
            ),
            Command::RemoveProtoplanetaryDisk { id } => remove_field(
                &mut self.protoplanetary_disks,
                CollectionKind::ProtoplanetaryDisks,
                id,
            ),
            Command::UpdateNebula { id, patch } => {
                update_field(&mut self.nebulae, CollectionKind::Nebulae, id, |n| {
                    patch.apply_to(n)
                })
            }
            Command::RemoveNebula { id } => {
                remove_field(&mut self.nebulae, CollectionKind::Nebulae, id)
            }

            Command::UpdateRing { body_id, patch } => self.update_ring(body_id, patch),
            Command::RemoveRing { body_id } => self.remove_ring(body_id),

            Command::ReplaceSnapshot { snapshot } => Ok(self.replace_snapshot(snapshot)),
        }
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    fn tick(&mut self, dt: f64) -> EventKind {
        // Non-finite steps would poison every later position computation.
        let dt = if dt.is_finite() { dt } else { 0.0 };
        self.simulation_time += dt;
        EventKind::TimeAdvanced {
            dt,
            simulation_time: self.simulation_time,
        }
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    fn require_body(&self, id: &BodyId) -> Result<&Body, EventKind> {
        self.bodies
            .get(id)
            .ok_or_else(|| EventKind::not_found(EntityKind::Body, id))
    }

    /// A Lagrange marker must reference two existing bodies other than
    /// itself.
    fn check_lagrange_refs(&self, body: &Body) -> Result<(), EventKind> {
        let Some(lagrange) = body.kind.lagrange() else {
            return Ok(());
        };
        for target in [&lagrange.primary_id, &lagrange.secondary_id] {
            if *target == body.id {
                return Err(EventKind::invalid_payload(
                    EntityKind::Body,
                    &body.id,
                    "lagrange point cannot reference itself",
                ));
            }
            if self.require_body(target)?.kind.lagrange().is_some() {
                return Err(EventKind::invalid_payload(
                    EntityKind::Body,
                    &body.id,
                    "lagrange point cannot reference another lagrange point",
                ));
            }
        }
        Ok(())
    }

    fn add_body(&mut self, new: &NewBody) -> Outcome {
        if self.bodies.contains_key(&new.id) {
            return Err(EventKind::duplicate(EntityKind::Body, &new.id));
        }
        if let Some(parent_id) = &new.parent_id {
            self.require_body(parent_id)?;
        }
        let body = Body::from(new.clone());
        body.validate()
            .map_err(|e| EventKind::invalid_payload(EntityKind::Body, &body.id, e))?;
        self.check_lagrange_refs(&body)?;

        let event = EventKind::BodyAdded {
            id: body.id.clone(),
            parent_id: body.parent_id.clone(),
        };
        hierarchy::insert_body(self, body);
        Ok(event)
    }

    fn update_body(&mut self, id: &BodyId, patch: &BodyPatch) -> Outcome {
        let current = self.require_body(id)?;
        let mut candidate = current.clone();
        let patches_to_lagrange = patch.body_type == Some(BodyType::LagrangePoint);
        let applied = if matches!(current.kind, BodyKind::LagrangePoint { .. }) || patches_to_lagrange {
            patch.without_motion().apply_to(&mut candidate)
        } else {
            patch.apply_to(&mut candidate)
        };
        applied
            .and_then(|()| candidate.validate())
            .map_err(|e| EventKind::invalid_payload(EntityKind::Body, id, e))?;
        self.check_lagrange_refs(&candidate)?;

        self.bodies.insert(id.clone(), candidate);
        Ok(EventKind::BodyUpdated { id: id.clone() })
    }

    fn remove_body(&mut self, id: &BodyId) -> Outcome {
        self.require_body(id)?;
        let ids = removal_set(id, &self.bodies);
        hierarchy::remove_bodies(self, &ids);
        Ok(EventKind::BodiesRemoved { ids })
    }

    fn attach_body(&mut self, child_id: &BodyId, parent_id: &BodyId) -> Outcome {
        let previous_parent_id = self.require_body(child_id)?.parent_id.clone();
        self.require_body(parent_id)?;
        if would_create_cycle(child_id, parent_id, &self.bodies) {
            return Err(EventKind::Cycle {
                entity: EntityKind::Body,
                child_id: child_id.to_string(),
                parent_id: parent_id.to_string(),
            });
        }
        if previous_parent_id.as_ref() != Some(parent_id) {
            hierarchy::reparent_body(self, child_id, Some(parent_id));
        }
        Ok(EventKind::BodyAttached {
            child_id: child_id.clone(),
            parent_id: parent_id.clone(),
            previous_parent_id,
        })
    }

    fn detach_body(&mut self, child_id: &BodyId) -> Outcome {
        let Some(previous_parent_id) = self.require_body(child_id)?.parent_id.clone() else {
            return Err(EventKind::NotAttached {
                child_id: child_id.clone(),
            });
        };
        hierarchy::reparent_body(self, child_id, None);
        if let Some(body) = self.bodies.get_mut(child_id) {
            body.orbital_distance = 0.0;
        }
        Ok(EventKind::BodyDetached {
            child_id: child_id.clone(),
            previous_parent_id,
        })
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    fn require_group(&self, id: &GroupId) -> Result<&Group, EventKind> {
        self.groups
            .get(id)
            .ok_or_else(|| EventKind::not_found(EntityKind::Group, id))
    }

    /// The child must exist, and a system must be a root body.
    fn require_group_child(&self, child: &GroupChild) -> Result<(), EventKind> {
        match child {
            GroupChild::Group { id } => self.require_group(id).map(|_| ()),
            GroupChild::System { id } => {
                if self.require_body(id)?.is_root() {
                    Ok(())
                } else {
                    Err(EventKind::invalid_target(
                        EntityKind::Body,
                        id,
                        "only root bodies can be grouped as systems",
                    ))
                }
            }
        }
    }

    fn check_group_cycle(&self, child: &GroupChild, target: &GroupId) -> Result<(), EventKind> {
        match child {
            GroupChild::Group { id } if would_create_cycle(id, target, &self.groups) => {
                Err(EventKind::Cycle {
                    entity: EntityKind::Group,
                    child_id: id.to_string(),
                    parent_id: target.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn add_group(&mut self, new: &NewGroup) -> Outcome {
        if self.groups.contains_key(&new.id) {
            return Err(EventKind::duplicate(EntityKind::Group, &new.id));
        }
        if let Some(parent_id) = &new.parent_group_id {
            self.require_group(parent_id)?;
        }
        let group = Group::from(new.clone());
        let event = EventKind::GroupAdded {
            id: group.id.clone(),
            parent_group_id: group.parent_group_id.clone(),
        };
        hierarchy::insert_group(self, group);
        Ok(event)
    }

    fn update_group(&mut self, id: &GroupId, patch: &GroupPatch) -> Outcome {
        let group = self
            .groups
            .get_mut(id)
            .ok_or_else(|| EventKind::not_found(EntityKind::Group, id))?;
        patch.apply_to(group);
        Ok(EventKind::GroupUpdated { id: id.clone() })
    }

    fn remove_group(&mut self, id: &GroupId) -> Outcome {
        self.require_group(id)?;
        let removal = hierarchy::remove_group(self, id);
        Ok(EventKind::GroupRemoved {
            id: id.clone(),
            promoted_groups: removal.promoted_groups,
            ungrouped_systems: removal.ungrouped_systems,
        })
    }

    fn add_to_group(&mut self, group_id: &GroupId, child: &GroupChild) -> Outcome {
        if self.require_group(group_id)?.contains(child) {
            let id = match child {
                GroupChild::Group { id } => id.to_string(),
                GroupChild::System { id } => id.to_string(),
            };
            return Err(EventKind::duplicate(EntityKind::Group, id));
        }
        self.require_group_child(child)?;
        self.check_group_cycle(child, group_id)?;
        let from = hierarchy::move_into_group(self, child, Some(group_id));
        Ok(EventKind::GroupMembershipChanged {
            child: child.clone(),
            from,
            to: Some(group_id.clone()),
        })
    }

    fn remove_from_group(&mut self, group_id: &GroupId, child: &GroupChild) -> Outcome {
        if !self.require_group(group_id)?.contains(child) {
            return Err(match child {
                GroupChild::Group { id } => EventKind::not_found(EntityKind::Group, id),
                GroupChild::System { id } => EventKind::not_found(EntityKind::Body, id),
            });
        }
        let from = hierarchy::move_into_group(self, child, None);
        Ok(EventKind::GroupMembershipChanged {
            child: child.clone(),
            from,
            to: None,
        })
    }

    fn move_to_group(&mut self, child: &GroupChild, target: Option<&GroupId>) -> Outcome {
        self.require_group_child(child)?;
        if let Some(target) = target {
            self.require_group(target)?;
            self.check_group_cycle(child, target)?;
        }
        let current = hierarchy::container_of(self, child);
        if current.as_ref() == target {
            return Ok(EventKind::GroupMembershipChanged {
                child: child.clone(),
                from: current.clone(),
                to: current,
            });
        }
        let from = hierarchy::move_into_group(self, child, target);
        Ok(EventKind::GroupMembershipChanged {
            child: child.clone(),
            from,
            to: target.cloned(),
        })
    }

    // -----------------------------------------------------------------------
    // Rings
    // -----------------------------------------------------------------------

    fn update_ring(&mut self, body_id: &BodyId, patch: &RingPatch) -> Outcome {
        let body = self.require_body(body_id)?;
        let (radius, color) = (body.radius, body.color.clone());
        let mut kind = body.kind.clone();
        let Some(slot) = kind.ring_slot_mut() else {
            return Err(EventKind::invalid_target(
                EntityKind::Ring,
                body_id,
                format!("a {:?} cannot carry a ring", body.body_type()),
            ));
        };
        let created = slot.is_none();
        let mut ring = slot
            .take()
            .unwrap_or_else(|| Ring::default_for_host(radius, &color));
        patch.apply_to(&mut ring);
        ring.validate()
            .map_err(|e| EventKind::invalid_payload(EntityKind::Ring, body_id, e))?;
        *slot = Some(ring);

        if let Some(body) = self.bodies.get_mut(body_id) {
            body.kind = kind;
        }
        Ok(EventKind::RingUpdated {
            body_id: body_id.clone(),
            created,
        })
    }

    fn remove_ring(&mut self, body_id: &BodyId) -> Outcome {
        let body = self.require_body(body_id)?;
        if body.kind.ring().is_none() {
            return Err(EventKind::invalid_target(
                EntityKind::Ring,
                body_id,
                "body has no ring",
            ));
        }
        if let Some(slot) = self
            .bodies
            .get_mut(body_id)
            .and_then(|b| b.kind.ring_slot_mut())
        {
            *slot = None;
        }
        Ok(EventKind::RingRemoved {
            body_id: body_id.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    fn replace_snapshot(&mut self, snapshot: &UniverseState) -> EventKind {
        let time = self.simulation_time;
        *self = snapshot.clone();
        self.simulation_time = time;
        EventKind::SnapshotReplaced {
            body_count: self.bodies.len(),
            group_count: self.groups.len(),
        }
    }
}

fn replaced(collection: CollectionKind, count: usize) -> EventKind {
    EventKind::CollectionReplaced { collection, count }
}

fn update_field<T>(
    map: &mut BTreeMap<FieldId, T>,
    collection: CollectionKind,
    id: &FieldId,
    apply: impl FnOnce(&mut T),
) -> Outcome {
    let entry = map
        .get_mut(id)
        .ok_or_else(|| EventKind::not_found(collection.entity(), id))?;
    apply(entry);
    Ok(EventKind::FieldUpdated {
        collection,
        id: id.clone(),
    })
}

fn remove_field<T>(map: &mut BTreeMap<FieldId, T>, collection: CollectionKind, id: &FieldId) -> Outcome {
    map.remove(id)
        .ok_or_else(|| EventKind::not_found(collection.entity(), id))?;
    Ok(EventKind::FieldRemoved {
        collection,
        id: id.clone(),
    })
}
