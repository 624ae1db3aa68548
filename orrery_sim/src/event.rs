// Domain events emitted by the command reducer.
//
// Every `Command` applied to a `UniverseState` yields a list of
// `DomainEvent`s describing what happened. Events are diagnostics for
// logging, telemetry and UI feedback; correctness never depends on them. A
// rejected command produces exactly one rejection event (`notFound`,
// `duplicate`, `cycle`, `notAttached`, `invalidPayload`, `invalidTarget`)
// and leaves the state untouched.
//
// On the wire an event is a flat record tagged by `type`:
// `{ "time": 4.0, "type": "bodyAttached", "childId": "p1", ... }`.
//
// See also: `reducer.rs` which emits these, `command.rs` for the inputs.

use crate::group::GroupChild;
use crate::types::{BodyId, FieldId, GroupId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of entity an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Body,
    Group,
    Belt,
    SmallBodyField,
    ProtoplanetaryDisk,
    Nebula,
    Ring,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Body => "body",
            EntityKind::Group => "group",
            EntityKind::Belt => "belt",
            EntityKind::SmallBodyField => "small-body field",
            EntityKind::ProtoplanetaryDisk => "protoplanetary disk",
            EntityKind::Nebula => "nebula",
            EntityKind::Ring => "ring",
        })
    }
}

/// The particle-field maps that bulk `set*` commands replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    Belts,
    SmallBodyFields,
    ProtoplanetaryDisks,
    Nebulae,
}

impl CollectionKind {
    pub fn entity(self) -> EntityKind {
        match self {
            CollectionKind::Belts => EntityKind::Belt,
            CollectionKind::SmallBodyFields => EntityKind::SmallBodyField,
            CollectionKind::ProtoplanetaryDisks => EntityKind::ProtoplanetaryDisk,
            CollectionKind::Nebulae => EntityKind::Nebula,
        }
    }
}

/// One thing that happened while applying a command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Simulation time at which the command was applied.
    pub time: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventKind {
    TimeAdvanced {
        dt: f64,
        simulation_time: f64,
    },
    BodyAdded {
        id: BodyId,
        parent_id: Option<BodyId>,
    },
    BodyUpdated {
        id: BodyId,
    },
    /// A body and its whole subtree, in depth-first pre-order.
    BodiesRemoved {
        ids: Vec<BodyId>,
    },
    BodyAttached {
        child_id: BodyId,
        parent_id: BodyId,
        previous_parent_id: Option<BodyId>,
    },
    BodyDetached {
        child_id: BodyId,
        previous_parent_id: BodyId,
    },
    GroupAdded {
        id: GroupId,
        parent_group_id: Option<GroupId>,
    },
    GroupUpdated {
        id: GroupId,
    },
    GroupRemoved {
        id: GroupId,
        promoted_groups: Vec<GroupId>,
        ungrouped_systems: Vec<BodyId>,
    },
    /// `from`/`to` of `None` mean "root" for groups and "ungrouped" for
    /// systems.
    GroupMembershipChanged {
        child: GroupChild,
        from: Option<GroupId>,
        to: Option<GroupId>,
    },
    CollectionReplaced {
        collection: CollectionKind,
        count: usize,
    },
    FieldUpdated {
        collection: CollectionKind,
        id: FieldId,
    },
    FieldRemoved {
        collection: CollectionKind,
        id: FieldId,
    },
    RingUpdated {
        body_id: BodyId,
        /// True when the body had no ring and defaults were synthesized.
        created: bool,
    },
    RingRemoved {
        body_id: BodyId,
    },
    SnapshotReplaced {
        body_count: usize,
        group_count: usize,
    },

    // Rejections.
    NotFound {
        entity: EntityKind,
        id: String,
    },
    Duplicate {
        entity: EntityKind,
        id: String,
    },
    Cycle {
        entity: EntityKind,
        child_id: String,
        parent_id: String,
    },
    NotAttached {
        child_id: BodyId,
    },
    InvalidPayload {
        entity: EntityKind,
        id: String,
        reason: String,
    },
    InvalidTarget {
        entity: EntityKind,
        id: String,
        reason: String,
    },
}

impl EventKind {
    /// True for events that report a rejected command.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EventKind::NotFound { .. }
                | EventKind::Duplicate { .. }
                | EventKind::Cycle { .. }
                | EventKind::NotAttached { .. }
                | EventKind::InvalidPayload { .. }
                | EventKind::InvalidTarget { .. }
        )
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        EventKind::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(entity: EntityKind, id: impl fmt::Display) -> Self {
        EventKind::Duplicate {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_payload(
        entity: EntityKind,
        id: impl fmt::Display,
        reason: impl fmt::Display,
    ) -> Self {
        EventKind::InvalidPayload {
            entity,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_target(
        entity: EntityKind,
        id: impl fmt::Display,
        reason: impl fmt::Display,
    ) -> Self {
        EventKind::InvalidTarget {
            entity,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl DomainEvent {
    pub fn is_rejection(&self) -> bool {
        self.kind.is_rejection()
    }
}
