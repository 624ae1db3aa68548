// Forest predicates and the full consistency audit.
//
// Both the body graph and the group graph are forests. The predicates here
// are written once against the `ParentGraph` trait and used for both:
// - `would_create_cycle(child, new_parent, graph)`: walk parent pointers up
//   from `new_parent`; a cycle would form iff the walk meets `child`.
// - `collect_descendants(id, graph)`: `[id, ...all transitive children]` in
//   depth-first pre-order; the exact deletion set for a cascading remove.
//
// Both walks keep a visited set, so an already-corrupt graph (say, a loaded
// snapshot with a cycle in it) cannot make them loop forever.
//
// `removal_set(id, bodies)` extends the descendant set of a body with every
// Lagrange marker (and the marker's own subtree) that references a body in
// the set, repeated until nothing new is added. A marker never outlives the
// bodies it is positioned from.
//
// `check_forest` audits an entire `UniverseState`: bidirectional
// parent/child consistency, root-list membership, duplicates, acyclicity,
// group system references, and Lagrange references. It is not called on the reducer's hot path;
// tests use it after every mutation, and callers may use it to vet an
// imported snapshot.
//
// See also: `hierarchy.rs` (the code whose promises this checks),
// `reducer.rs` (the caller of the predicates).

use crate::body::Body;
use crate::event::EntityKind;
use crate::group::Group;
use crate::state::UniverseState;
use crate::types::{BodyId, GroupId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Read-only view of a parent-pointer forest.
pub trait ParentGraph {
    type Id: Clone + Eq + Hash + fmt::Display;

    fn contains(&self, id: &Self::Id) -> bool;
    fn parent_of(&self, id: &Self::Id) -> Option<&Self::Id>;
    fn children_of(&self, id: &Self::Id) -> Vec<&Self::Id>;
    /// Every node, in a deterministic order.
    fn node_ids(&self) -> Vec<&Self::Id>;
}

impl ParentGraph for BTreeMap<BodyId, Body> {
    type Id = BodyId;

    fn contains(&self, id: &BodyId) -> bool {
        self.contains_key(id)
    }

    fn parent_of(&self, id: &BodyId) -> Option<&BodyId> {
        self.get(id)?.parent_id()
    }

    fn children_of(&self, id: &BodyId) -> Vec<&BodyId> {
        self.get(id).map(|b| b.children().iter().collect()).unwrap_or_default()
    }

    fn node_ids(&self) -> Vec<&BodyId> {
        self.keys().collect()
    }
}

/// Only nested groups count as children here; systems are leaves of a
/// different graph.
impl ParentGraph for BTreeMap<GroupId, Group> {
    type Id = GroupId;

    fn contains(&self, id: &GroupId) -> bool {
        self.contains_key(id)
    }

    fn parent_of(&self, id: &GroupId) -> Option<&GroupId> {
        self.get(id)?.parent_group_id()
    }

    fn children_of(&self, id: &GroupId) -> Vec<&GroupId> {
        self.get(id).map(|g| g.child_groups().collect()).unwrap_or_default()
    }

    fn node_ids(&self) -> Vec<&GroupId> {
        self.keys().collect()
    }
}

/// True iff making `new_parent` the parent of `child` would close a loop:
/// `child == new_parent`, or `child` is already an ancestor of `new_parent`.
///
/// A pre-existing loop above `new_parent` also reports `true`, so a corrupt
/// graph never accepts further re-parenting into that loop.
pub fn would_create_cycle<G: ParentGraph>(child: &G::Id, new_parent: &G::Id, graph: &G) -> bool {
    let mut visited: FxHashSet<&G::Id> = FxHashSet::default();
    let mut current = Some(new_parent);
    while let Some(id) = current {
        if id == child || !visited.insert(id) {
            return true;
        }
        current = graph.parent_of(id);
    }
    false
}

/// `[id, ...transitive children]`, depth-first pre-order, children in list
/// order. Empty when `id` is not in the graph.
pub fn collect_descendants<G: ParentGraph>(id: &G::Id, graph: &G) -> Vec<G::Id> {
    if !graph.contains(id) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut visited: FxHashSet<&G::Id> = FxHashSet::default();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        out.push(current.clone());
        stack.extend(graph.children_of(current).into_iter().rev());
    }
    out
}

/// Everything `removeBody(id)` deletes: `collect_descendants(id)` first, in
/// that order, then each orphaned Lagrange marker's subtree in map order.
/// Empty when `id` is not a body.
pub fn removal_set(id: &BodyId, bodies: &BTreeMap<BodyId, Body>) -> Vec<BodyId> {
    let mut out = collect_descendants(id, bodies);
    let mut doomed: FxHashSet<BodyId> = out.iter().cloned().collect();
    loop {
        let orphaned: Vec<&BodyId> = bodies
            .values()
            .filter(|b| !doomed.contains(&b.id))
            .filter(|b| {
                b.kind.lagrange().is_some_and(|l| {
                    doomed.contains(&l.primary_id) || doomed.contains(&l.secondary_id)
                })
            })
            .map(|b| &b.id)
            .collect();
        if orphaned.is_empty() {
            return out;
        }
        for marker in orphaned {
            for id in collect_descendants(marker, bodies) {
                if doomed.insert(id.clone()) {
                    out.push(id);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Full audit
// ---------------------------------------------------------------------------

/// One broken promise found by `check_forest`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{kind} {id} references missing parent {parent}")]
    DanglingParent {
        kind: EntityKind,
        id: String,
        parent: String,
    },
    #[error("{kind} {id} is missing from the child list of its parent {parent}")]
    NotListedByParent {
        kind: EntityKind,
        id: String,
        parent: String,
    },
    #[error("{kind} {parent} lists {child} as a child, but that node's parent disagrees")]
    StrayChild {
        kind: EntityKind,
        parent: String,
        child: String,
    },
    #[error("{kind} {id} appears {count} times across child and root lists")]
    Duplicated {
        kind: EntityKind,
        id: String,
        count: usize,
    },
    #[error("{kind} {id} has no parent but is not in the root list")]
    MissingRoot { kind: EntityKind, id: String },
    #[error("root list entry {id} is not a parentless {kind}")]
    BadRoot { kind: EntityKind, id: String },
    #[error("{kind} {id} is its own ancestor")]
    Cycle { kind: EntityKind, id: String },
    #[error("group {group} holds system {body}, which is not an existing root body")]
    BadSystem { group: String, body: String },
    #[error("system {body} belongs to {count} groups")]
    SystemInManyGroups { body: String, count: usize },
    #[error("lagrange point {id} references missing body {reference}")]
    DanglingLagrange { id: String, reference: String },
}

fn check_graph<G: ParentGraph>(
    kind: EntityKind,
    graph: &G,
    roots: &[G::Id],
    out: &mut Vec<InvariantViolation>,
) {
    let root_set: FxHashSet<&G::Id> = roots.iter().collect();
    let mut appearances: FxHashMap<&G::Id, usize> = FxHashMap::default();
    for root in roots {
        *appearances.entry(root).or_default() += 1;
        if !graph.contains(root) || graph.parent_of(root).is_some() {
            out.push(InvariantViolation::BadRoot {
                kind,
                id: root.to_string(),
            });
        }
    }

    for id in graph.node_ids() {
        match graph.parent_of(id) {
            None if !root_set.contains(id) => out.push(InvariantViolation::MissingRoot {
                kind,
                id: id.to_string(),
            }),
            None => {}
            Some(parent) if !graph.contains(parent) => {
                out.push(InvariantViolation::DanglingParent {
                    kind,
                    id: id.to_string(),
                    parent: parent.to_string(),
                })
            }
            Some(parent) => {
                if !graph.children_of(parent).contains(&id) {
                    out.push(InvariantViolation::NotListedByParent {
                        kind,
                        id: id.to_string(),
                        parent: parent.to_string(),
                    });
                }
            }
        }

        for child in graph.children_of(id) {
            *appearances.entry(child).or_default() += 1;
            if graph.parent_of(child) != Some(id) {
                out.push(InvariantViolation::StrayChild {
                    kind,
                    parent: id.to_string(),
                    child: child.to_string(),
                });
            }
        }

        // Walk up; report only nodes that lie on a loop.
        let mut visited: FxHashSet<&G::Id> = FxHashSet::default();
        let mut current = graph.parent_of(id);
        while let Some(ancestor) = current {
            if ancestor == id {
                out.push(InvariantViolation::Cycle {
                    kind,
                    id: id.to_string(),
                });
                break;
            }
            if !visited.insert(ancestor) {
                break;
            }
            current = graph.parent_of(ancestor);
        }
    }

    let mut duplicated: Vec<(&G::Id, usize)> =
        appearances.into_iter().filter(|&(_, n)| n > 1).collect();
    duplicated.sort_by_key(|(id, _)| id.to_string());
    out.extend(duplicated.into_iter().map(|(id, count)| InvariantViolation::Duplicated {
        kind,
        id: id.to_string(),
        count,
    }));
}

/// Audit every structural invariant of `state`. Empty means consistent.
pub fn check_forest(state: &UniverseState) -> Vec<InvariantViolation> {
    let mut out = Vec::new();
    check_graph(EntityKind::Body, state.bodies(), state.root_body_ids(), &mut out);
    check_graph(EntityKind::Group, state.groups(), state.root_group_ids(), &mut out);

    let mut memberships: BTreeMap<&BodyId, usize> = BTreeMap::new();
    for group in state.groups().values() {
        for body_id in group.systems() {
            *memberships.entry(body_id).or_default() += 1;
            if !state.body(body_id.as_str()).is_some_and(Body::is_root) {
                out.push(InvariantViolation::BadSystem {
                    group: group.id.to_string(),
                    body: body_id.to_string(),
                });
            }
        }
    }
    out.extend(
        memberships
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(body, count)| InvariantViolation::SystemInManyGroups {
                body: body.to_string(),
                count,
            }),
    );

    for body in state.bodies().values() {
        let Some(lagrange) = body.kind.lagrange() else {
            continue;
        };
        for reference in [&lagrange.primary_id, &lagrange.secondary_id] {
            if state.body(reference.as_str()).is_none() {
                out.push(InvariantViolation::DanglingLagrange {
                    id: body.id.to_string(),
                    reference: reference.to_string(),
                });
            }
        }
    }
    out
}
