// Forest maintenance for bodies and groups.
//
// This module is the single writer of every structural field: a body's
// `parent_id` and `children`, a group's `parent_group_id` and `children`, and
// the two root lists. Parent pointers are the source of truth; child lists are
// an ordered cache that every function here updates in the same step that
// changes the pointer, so the two never disagree.
//
// Functions assume the caller has already checked preconditions (existence,
// cycles); see `reducer.rs`. They still never panic on bad input: a missing
// id is skipped, a dangling parent is treated as "root".
//
// Body-side operations:
// - `insert_body`: link a new body under its parent or into the root list.
// - `reparent_body`: move a body under another body or back to the root list.
// - `remove_bodies`: delete a precomputed descendant set and clean every
//   reference to it (parent child list, root list, group system refs).
//
// Group-side operations:
// - `insert_group`, `remove_group` (sub-groups promoted in place, systems
//   ungrouped), `move_into_group` (the one primitive behind addToGroup,
//   removeFromGroup and moveToGroup).
//
// A "system" is a root body. Attaching a body under a parent therefore also
// drops it from whichever group held it as a system.
//
// See also: `invariants.rs` for `check_forest`, which audits everything this
// module promises.

use crate::body::Body;
use crate::group::{Group, GroupChild};
use crate::state::UniverseState;
use crate::types::{BodyId, GroupId};
use rustc_hash::FxHashSet;

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Insert `body` (whose `children` must be empty) and link it under its
/// parent, or append it to the root list when it has none.
pub(crate) fn insert_body(state: &mut UniverseState, mut body: Body) {
    body.children.clear();
    let id = body.id.clone();
    match body.parent_id.clone() {
        Some(parent_id) if state.bodies.contains_key(&parent_id) => {
            if let Some(parent) = state.bodies.get_mut(&parent_id) {
                parent.children.push(id.clone());
            }
        }
        _ => {
            body.parent_id = None;
            state.root_body_ids.push(id.clone());
        }
    }
    state.bodies.insert(id, body);
}

/// Remove `id` from its parent's child list (or from the root list) and clear
/// its parent pointer. Returns the previous parent.
fn unlink_body(state: &mut UniverseState, id: &BodyId) -> Option<BodyId> {
    let previous = state.bodies.get_mut(id).and_then(|b| b.parent_id.take());
    match &previous {
        Some(parent_id) => {
            if let Some(parent) = state.bodies.get_mut(parent_id) {
                parent.children.retain(|c| c != id);
            }
        }
        None => state.root_body_ids.retain(|r| r != id),
    }
    previous
}

/// Drop `body_id` from every group's system list.
fn ungroup_system(state: &mut UniverseState, body_id: &BodyId) {
    for group in state.groups.values_mut() {
        group
            .children
            .retain(|c| c.as_system().is_none_or(|id| id != body_id));
    }
}

/// Move `child` under `new_parent`, or to the end of the root list when
/// `new_parent` is `None`. Returns the previous parent.
///
/// The caller must have ruled out cycles.
pub(crate) fn reparent_body(
    state: &mut UniverseState,
    child: &BodyId,
    new_parent: Option<&BodyId>,
) -> Option<BodyId> {
    if !state.bodies.contains_key(child) {
        return None;
    }
    let previous = unlink_body(state, child);
    match new_parent {
        Some(parent_id) if state.bodies.contains_key(parent_id) => {
            if let Some(parent) = state.bodies.get_mut(parent_id) {
                parent.children.push(child.clone());
            }
            if let Some(body) = state.bodies.get_mut(child) {
                body.parent_id = Some(parent_id.clone());
            }
            ungroup_system(state, child);
        }
        _ => state.root_body_ids.push(child.clone()),
    }
    previous
}

/// Delete every body in `ids` (a union of whole subtrees, as produced by
/// `invariants::removal_set`) and remove all references to them.
pub(crate) fn remove_bodies(state: &mut UniverseState, ids: &[BodyId]) {
    let doomed: FxHashSet<&BodyId> = ids.iter().collect();

    // Only subtree tops can have a parent outside the set.
    for id in ids {
        let outside_parent = state
            .bodies
            .get(id)
            .and_then(|b| b.parent_id.as_ref())
            .filter(|p| !doomed.contains(p))
            .cloned();
        if let Some(parent_id) = outside_parent {
            if let Some(parent) = state.bodies.get_mut(&parent_id) {
                parent.children.retain(|c| c != id);
            }
        }
    }

    state.root_body_ids.retain(|r| !doomed.contains(r));
    for group in state.groups.values_mut() {
        group
            .children
            .retain(|c| c.as_system().is_none_or(|id| !doomed.contains(id)));
    }
    for id in ids {
        state.bodies.remove(id);
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Insert `group` (with empty `children`) under its parent group, or into the
/// root group list.
pub(crate) fn insert_group(state: &mut UniverseState, mut group: Group) {
    group.children.clear();
    let id = group.id.clone();
    match group.parent_group_id.clone() {
        Some(parent_id) if state.groups.contains_key(&parent_id) => {
            if let Some(parent) = state.groups.get_mut(&parent_id) {
                parent.children.push(GroupChild::Group { id: id.clone() });
            }
        }
        _ => {
            group.parent_group_id = None;
            state.root_group_ids.push(id.clone());
        }
    }
    state.groups.insert(id, group);
}

/// Outcome of `remove_group`.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct GroupRemoval {
    pub promoted_groups: Vec<GroupId>,
    pub ungrouped_systems: Vec<BodyId>,
}

/// Remove a group. Nested groups take its place in its parent's child list
/// (or in the root group list), keeping their order. Member systems become
/// ungrouped.
pub(crate) fn remove_group(state: &mut UniverseState, id: &GroupId) -> GroupRemoval {
    let Some(removed) = state.groups.remove(id) else {
        return GroupRemoval::default();
    };
    let promoted_groups: Vec<GroupId> = removed.child_groups().cloned().collect();
    let ungrouped_systems: Vec<BodyId> = removed.systems().cloned().collect();

    for child_id in &promoted_groups {
        if let Some(child) = state.groups.get_mut(child_id) {
            child.parent_group_id = removed.parent_group_id.clone();
        }
    }

    let parent = removed
        .parent_group_id
        .as_ref()
        .and_then(|p| state.groups.get_mut(p));
    match parent {
        Some(parent) => {
            let me = GroupChild::Group { id: id.clone() };
            let at = parent
                .children
                .iter()
                .position(|c| *c == me)
                .unwrap_or(parent.children.len());
            parent.children.retain(|c| *c != me);
            let tail = parent.children.split_off(at.min(parent.children.len()));
            parent.children.extend(
                promoted_groups
                    .iter()
                    .map(|g| GroupChild::Group { id: g.clone() }),
            );
            parent.children.extend(tail);
        }
        None => {
            let at = state
                .root_group_ids
                .iter()
                .position(|r| r == id)
                .unwrap_or(state.root_group_ids.len());
            state.root_group_ids.retain(|r| r != id);
            let tail = state
                .root_group_ids
                .split_off(at.min(state.root_group_ids.len()));
            state.root_group_ids.extend(promoted_groups.iter().cloned());
            state.root_group_ids.extend(tail);
            // A dangling parent pointer leaves the promoted groups as roots.
            for g in &promoted_groups {
                if let Some(child) = state.groups.get_mut(g) {
                    child.parent_group_id = None;
                }
            }
        }
    }

    GroupRemoval {
        promoted_groups,
        ungrouped_systems,
    }
}

/// The group currently holding `child`, if any.
pub(crate) fn container_of(state: &UniverseState, child: &GroupChild) -> Option<GroupId> {
    match child {
        GroupChild::Group { id } => state.groups.get(id)?.parent_group_id.clone(),
        GroupChild::System { id } => state.group_of_system(id.as_str()).cloned(),
    }
}

/// Move `child` into `target`, or out of every group when `target` is
/// `None` (a nested group becomes a root group; a system becomes
/// ungrouped). Returns the previous container.
///
/// The caller must have checked that both exist and that no group cycle
/// results.
pub(crate) fn move_into_group(
    state: &mut UniverseState,
    child: &GroupChild,
    target: Option<&GroupId>,
) -> Option<GroupId> {
    let previous = container_of(state, child);

    // Detach.
    match child {
        GroupChild::Group { id } => {
            match &previous {
                Some(parent_id) => {
                    if let Some(parent) = state.groups.get_mut(parent_id) {
                        parent.children.retain(|c| c != child);
                    }
                }
                None => state.root_group_ids.retain(|r| r != id),
            }
            if let Some(group) = state.groups.get_mut(id) {
                group.parent_group_id = None;
            }
        }
        GroupChild::System { id } => ungroup_system(state, id),
    }

    // Attach.
    let target = target.filter(|t| state.groups.contains_key(*t));
    match (child, target) {
        (_, Some(target_id)) => {
            if let Some(target) = state.groups.get_mut(target_id) {
                target.children.push(child.clone());
            }
            if let GroupChild::Group { id } = child {
                if let Some(group) = state.groups.get_mut(id) {
                    group.parent_group_id = Some(target_id.clone());
                }
            }
        }
        (GroupChild::Group { id }, None) => state.root_group_ids.push(id.clone()),
        (GroupChild::System { .. }, None) => {}
    }

    previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyKind, NewBody};
    use crate::group::NewGroup;
    use crate::invariants::check_forest;

    fn add(state: &mut UniverseState, id: &str, parent: Option<&str>) {
        let mut new = NewBody::new(id, id, BodyKind::Moon);
        if let Some(p) = parent {
            new = new.with_parent(p);
        }
        insert_body(state, new.into());
    }

    fn add_group(state: &mut UniverseState, id: &str, parent: Option<&str>) {
        let mut new = NewGroup::new(id, id);
        if let Some(p) = parent {
            new = new.with_parent(p);
        }
        insert_group(state, new.into());
    }

    fn ids<T: AsRef<str>>(list: &[T]) -> Vec<&str> {
        list.iter().map(AsRef::as_ref).collect()
    }

    #[test]
    fn insert_links_parent_and_roots() {
        let mut state = UniverseState::new();
        add(&mut state, "s", None);
        add(&mut state, "p", Some("s"));
        assert_eq!(ids(&state.root_body_ids), ["s"]);
        assert_eq!(ids(state.bodies["s"].children()), ["p"]);
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn insert_with_dangling_parent_becomes_root() {
        let mut state = UniverseState::new();
        add(&mut state, "orphan", Some("ghost"));
        assert!(state.bodies["orphan"].is_root());
        assert_eq!(ids(&state.root_body_ids), ["orphan"]);
    }

    #[test]
    fn reparent_moves_between_parents_and_roots() {
        let mut state = UniverseState::new();
        add(&mut state, "a", None);
        add(&mut state, "b", None);
        add(&mut state, "c", Some("a"));

        let prev = reparent_body(&mut state, &BodyId::new("c"), Some(&BodyId::new("b")));
        assert_eq!(prev, Some(BodyId::new("a")));
        assert!(state.bodies["a"].children().is_empty());
        assert_eq!(ids(state.bodies["b"].children()), ["c"]);

        let prev = reparent_body(&mut state, &BodyId::new("b"), Some(&BodyId::new("a")));
        assert_eq!(prev, None);
        assert_eq!(ids(&state.root_body_ids), ["a"]);

        reparent_body(&mut state, &BodyId::new("c"), None);
        assert_eq!(ids(&state.root_body_ids), ["a", "c"]);
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn attaching_a_system_ungroups_it() {
        let mut state = UniverseState::new();
        add(&mut state, "a", None);
        add(&mut state, "b", None);
        add_group(&mut state, "g", None);
        move_into_group(&mut state, &GroupChild::system("b"), Some(&GroupId::new("g")));
        reparent_body(&mut state, &BodyId::new("b"), Some(&BodyId::new("a")));
        assert!(state.groups["g"].children().is_empty());
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn remove_bodies_cleans_every_reference() {
        let mut state = UniverseState::new();
        add(&mut state, "s", None);
        add(&mut state, "p", Some("s"));
        add(&mut state, "m", Some("p"));
        add(&mut state, "q", Some("s"));
        add(&mut state, "other", None);
        add_group(&mut state, "g", None);
        move_into_group(&mut state, &GroupChild::system("s"), Some(&GroupId::new("g")));

        remove_bodies(&mut state, &[BodyId::new("p"), BodyId::new("m")]);
        assert_eq!(ids(state.bodies["s"].children()), ["q"]);
        assert_eq!(state.bodies.len(), 3);

        remove_bodies(&mut state, &[BodyId::new("s"), BodyId::new("q")]);
        assert_eq!(ids(&state.root_body_ids), ["other"]);
        assert!(state.groups["g"].children().is_empty());
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn remove_group_promotes_in_place() {
        let mut state = UniverseState::new();
        add(&mut state, "sys", None);
        add_group(&mut state, "top", None);
        add_group(&mut state, "first", Some("top"));
        add_group(&mut state, "mid", Some("top"));
        add_group(&mut state, "last", Some("top"));
        add_group(&mut state, "x", Some("mid"));
        add_group(&mut state, "y", Some("mid"));
        move_into_group(&mut state, &GroupChild::system("sys"), Some(&GroupId::new("mid")));

        let removal = remove_group(&mut state, &GroupId::new("mid"));
        assert_eq!(ids(&removal.promoted_groups), ["x", "y"]);
        assert_eq!(ids(&removal.ungrouped_systems), ["sys"]);

        let order: Vec<&str> = state.groups["top"]
            .child_groups()
            .map(GroupId::as_str)
            .collect();
        assert_eq!(order, ["first", "x", "y", "last"]);
        assert_eq!(
            state.groups["x"].parent_group_id().map(GroupId::as_str),
            Some("top")
        );
        assert!(state.group_of_system("sys").is_none());
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn remove_root_group_promotes_to_roots() {
        let mut state = UniverseState::new();
        add_group(&mut state, "a", None);
        add_group(&mut state, "b", None);
        add_group(&mut state, "c", None);
        add_group(&mut state, "b1", Some("b"));
        remove_group(&mut state, &GroupId::new("b"));
        assert_eq!(ids(&state.root_group_ids), ["a", "b1", "c"]);
        assert!(state.groups["b1"].parent_group_id().is_none());
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn move_into_group_and_back_out() {
        let mut state = UniverseState::new();
        add_group(&mut state, "g", None);
        add_group(&mut state, "h", None);
        let h = GroupChild::group("h");

        let prev = move_into_group(&mut state, &h, Some(&GroupId::new("g")));
        assert_eq!(prev, None);
        assert_eq!(ids(&state.root_group_ids), ["g"]);
        assert!(state.groups["g"].contains(&h));

        let prev = move_into_group(&mut state, &h, None);
        assert_eq!(prev, Some(GroupId::new("g")));
        assert_eq!(ids(&state.root_group_ids), ["g", "h"]);
        assert!(state.groups["g"].children().is_empty());
        assert!(check_forest(&state).is_empty());
    }

    #[test]
    fn system_belongs_to_one_group_at_a_time() {
        let mut state = UniverseState::new();
        add(&mut state, "s", None);
        add_group(&mut state, "g", None);
        add_group(&mut state, "h", None);
        let s = GroupChild::system("s");
        move_into_group(&mut state, &s, Some(&GroupId::new("g")));
        let prev = move_into_group(&mut state, &s, Some(&GroupId::new("h")));
        assert_eq!(prev, Some(GroupId::new("g")));
        assert!(!state.groups["g"].contains(&s));
        assert!(state.groups["h"].contains(&s));
    }
}
