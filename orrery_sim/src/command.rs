// Commands that mutate universe state.
//
// All external mutations to a `UniverseState` go through `Command`. The
// reducer is a pure function `(state, command) -> (next_state, events)`;
// commands are its only input. A command may arrive from a local UI action
// or over the network, so every variant is validated in full before any
// mutation (see `reducer.rs`).
//
// Commands fall into five families:
// - Time: `Tick`.
// - Bodies: `AddBody`, `UpdateBody`, `RemoveBody`, `AttachBody`,
//   `DetachBody`.
// - Groups: `AddGroup`, `UpdateGroup`, `RemoveGroup`, `AddToGroup`,
//   `RemoveFromGroup`, `MoveToGroup`.
// - Particle fields: bulk `Set*` replacement plus single-entity
//   `Update*` / `Remove*` for small-body fields, disks and nebulae; rings via
//   `UpdateRing` / `RemoveRing`.
// - Whole snapshot: `ReplaceSnapshot`.
//
// On the wire a command is tagged by `type`, camelCase:
// `{ "type": "attachBody", "childId": "p1", "parentId": "s1" }`.
//
// See also: `reducer.rs` for `UniverseState::apply`, `event.rs` for outputs,
// `patch.rs` for patch semantics.

use crate::body::{BodyPatch, NewBody, RingPatch};
use crate::field::{
    Belt, Nebula, NebulaPatch, ProtoplanetaryDisk, ProtoplanetaryDiskPatch, SmallBodyField,
    SmallBodyFieldPatch,
};
use crate::group::{GroupChild, GroupPatch, NewGroup};
use crate::state::UniverseState;
use crate::types::{BodyId, FieldId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Advance simulation time by `dt`.
    Tick { dt: f64 },

    AddBody { body: NewBody },
    UpdateBody { id: BodyId, patch: BodyPatch },
    /// Remove a body and its entire subtree.
    RemoveBody { id: BodyId },
    AttachBody { child_id: BodyId, parent_id: BodyId },
    DetachBody { child_id: BodyId },

    AddGroup { group: NewGroup },
    UpdateGroup { id: GroupId, patch: GroupPatch },
    /// Remove a group, promoting its children.
    RemoveGroup { id: GroupId },
    AddToGroup { group_id: GroupId, child: GroupChild },
    RemoveFromGroup { group_id: GroupId, child: GroupChild },
    /// Move into `target_group_id`, or to root / ungrouped when absent.
    MoveToGroup {
        child: GroupChild,
        #[serde(default)]
        target_group_id: Option<GroupId>,
    },

    SetBelts { belts: BTreeMap<FieldId, Belt> },
    SetSmallBodyFields { fields: BTreeMap<FieldId, SmallBodyField> },
    SetProtoplanetaryDisks { disks: BTreeMap<FieldId, ProtoplanetaryDisk> },
    SetNebulae { nebulae: BTreeMap<FieldId, Nebula> },

    UpdateSmallBodyField { id: FieldId, patch: SmallBodyFieldPatch },
    RemoveSmallBodyField { id: FieldId },
    UpdateProtoplanetaryDisk { id: FieldId, patch: ProtoplanetaryDiskPatch },
    RemoveProtoplanetaryDisk { id: FieldId },
    UpdateNebula { id: FieldId, patch: NebulaPatch },
    RemoveNebula { id: FieldId },

    /// Patch a body's ring, creating one with host-derived defaults first if
    /// the body has none.
    UpdateRing { body_id: BodyId, patch: RingPatch },
    RemoveRing { body_id: BodyId },

    /// Replace every collection; `simulationTime` is kept.
    ReplaceSnapshot { snapshot: Box<UniverseState> },
}

impl Command {
    /// The wire tag, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Tick { .. } => "tick",
            Command::AddBody { .. } => "addBody",
            Command::UpdateBody { .. } => "updateBody",
            Command::RemoveBody { .. } => "removeBody",
            Command::AttachBody { .. } => "attachBody",
            Command::DetachBody { .. } => "detachBody",
            Command::AddGroup { .. } => "addGroup",
            Command::UpdateGroup { .. } => "updateGroup",
            Command::RemoveGroup { .. } => "removeGroup",
            Command::AddToGroup { .. } => "addToGroup",
            Command::RemoveFromGroup { .. } => "removeFromGroup",
            Command::MoveToGroup { .. } => "moveToGroup",
            Command::SetBelts { .. } => "setBelts",
            Command::SetSmallBodyFields { .. } => "setSmallBodyFields",
            Command::SetProtoplanetaryDisks { .. } => "setProtoplanetaryDisks",
            Command::SetNebulae { .. } => "setNebulae",
            Command::UpdateSmallBodyField { .. } => "updateSmallBodyField",
            Command::RemoveSmallBodyField { .. } => "removeSmallBodyField",
            Command::UpdateProtoplanetaryDisk { .. } => "updateProtoplanetaryDisk",
            Command::RemoveProtoplanetaryDisk { .. } => "removeProtoplanetaryDisk",
            Command::UpdateNebula { .. } => "updateNebula",
            Command::RemoveNebula { .. } => "removeNebula",
            Command::UpdateRing { .. } => "updateRing",
            Command::RemoveRing { .. } => "removeRing",
            Command::ReplaceSnapshot { .. } => "replaceSnapshot",
        }
    }
}
