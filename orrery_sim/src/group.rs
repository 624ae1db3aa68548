// Groups: named containers that organize systems spatially.
//
// A group's children are typed references: either a nested group or a
// "system" (a root body). Groups form their own forest over `parentGroupId`,
// independent of the body forest. A system belongs to at most one group.
//
// As with bodies, `parent_group_id` and `children` are crate-private and
// written only by `hierarchy.rs`.
//
// See also: `hierarchy.rs` for membership changes, `invariants.rs` for the
// group-forest cycle checks.

use crate::patch::patch_struct;
use crate::types::{BodyId, GroupId, Vec3};
use serde::{Deserialize, Serialize};

/// A typed reference held in a group's child list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GroupChild {
    /// A nested group.
    Group { id: GroupId },
    /// A root body acting as the anchor of a planetary system.
    System { id: BodyId },
}

impl GroupChild {
    pub fn group(id: impl Into<String>) -> Self {
        GroupChild::Group {
            id: GroupId::new(id),
        }
    }

    pub fn system(id: impl Into<String>) -> Self {
        GroupChild::System { id: BodyId::new(id) }
    }

    pub fn as_group(&self) -> Option<&GroupId> {
        match self {
            GroupChild::Group { id } => Some(id),
            GroupChild::System { .. } => None,
        }
    }

    pub fn as_system(&self) -> Option<&BodyId> {
        match self {
            GroupChild::System { id } => Some(id),
            GroupChild::Group { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub(crate) parent_group_id: Option<GroupId>,
    #[serde(default)]
    pub(crate) children: Vec<GroupChild>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub collapsed: bool,
}

impl Group {
    pub fn parent_group_id(&self) -> Option<&GroupId> {
        self.parent_group_id.as_ref()
    }

    pub fn children(&self) -> &[GroupChild] {
        &self.children
    }

    pub fn contains(&self, child: &GroupChild) -> bool {
        self.children.contains(child)
    }

    /// IDs of nested groups, in child order.
    pub fn child_groups(&self) -> impl Iterator<Item = &GroupId> {
        self.children.iter().filter_map(GroupChild::as_group)
    }

    /// IDs of member systems, in child order.
    pub fn systems(&self) -> impl Iterator<Item = &BodyId> {
        self.children.iter().filter_map(GroupChild::as_system)
    }
}

/// The `addGroup` payload. New groups start empty; members are added with
/// `addToGroup` / `moveToGroup`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub id: GroupId,
    pub name: String,
    #[serde(default = "default_group_color")]
    pub color: String,
    #[serde(default)]
    pub parent_group_id: Option<GroupId>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub collapsed: bool,
}

fn default_group_color() -> String {
    "#8899aa".to_string()
}

impl NewGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(id),
            name: name.into(),
            color: default_group_color(),
            parent_group_id: None,
            position: Vec3::ZERO,
            collapsed: false,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_group_id = Some(GroupId::new(parent));
        self
    }
}

impl From<NewGroup> for Group {
    fn from(new: NewGroup) -> Self {
        Self {
            id: new.id,
            name: new.name,
            color: new.color,
            parent_group_id: new.parent_group_id,
            children: Vec::new(),
            position: new.position,
            collapsed: new.collapsed,
        }
    }
}

patch_struct! {
    /// Shallow patch for a `Group`. Membership is changed through the
    /// dedicated group commands, never through a patch.
    pub struct GroupPatch for Group {
        name: String,
        color: String,
        position: Vec3,
        collapsed: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_child_wire_format() {
        let json = serde_json::to_string(&GroupChild::system("s1")).unwrap();
        assert_eq!(json, r#"{"type":"system","id":"s1"}"#);
        let child: GroupChild = serde_json::from_str(r#"{"type":"group","id":"g2"}"#).unwrap();
        assert_eq!(child, GroupChild::group("g2"));
    }

    #[test]
    fn group_filters_children_by_kind() {
        let mut group = Group::from(NewGroup::new("g", "Local"));
        group.children = vec![
            GroupChild::system("a"),
            GroupChild::group("h"),
            GroupChild::system("b"),
        ];
        let systems: Vec<&str> = group.systems().map(BodyId::as_str).collect();
        assert_eq!(systems, ["a", "b"]);
        let groups: Vec<&str> = group.child_groups().map(GroupId::as_str).collect();
        assert_eq!(groups, ["h"]);
        assert!(group.contains(&GroupChild::system("b")));
        assert!(!group.contains(&GroupChild::group("a")));
    }

    #[test]
    fn new_group_defaults_from_minimal_json() {
        let new: NewGroup = serde_json::from_str(r#"{"id":"g1","name":"Cluster"}"#).unwrap();
        let group = Group::from(new);
        assert!(group.children().is_empty());
        assert!(group.parent_group_id().is_none());
        assert!(!group.collapsed);
    }

    #[test]
    fn group_patch_changes_presentation_only() {
        let mut group = Group::from(NewGroup::new("g", "Old").with_parent("p"));
        GroupPatch {
            name: Some("New".into()),
            collapsed: Some(true),
            ..Default::default()
        }
        .apply_to(&mut group);
        assert_eq!(group.name, "New");
        assert!(group.collapsed);
        assert_eq!(group.parent_group_id().map(GroupId::as_str), Some("p"));
    }
}
