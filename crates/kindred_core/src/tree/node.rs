//! Display tree built from the patriarch downwards.

use super::index::ChildIndex;
use crate::model::member::{Member, MemberId};
use serde::Serialize;
use std::collections::HashSet;

/// Display snapshot carried by each tree node.
///
/// Absent text attributes are rendered as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    pub birth_date: String,
    pub death_date: String,
    pub generation: u32,
    pub is_patriarch: bool,
    pub occupation: String,
    pub location: String,
    pub image_url: String,
}

impl From<&Member> for NodeAttributes {
    fn from(member: &Member) -> Self {
        Self {
            birth_date: text_or_empty(&member.birth_date),
            death_date: text_or_empty(&member.death_date),
            generation: member.generation,
            is_patriarch: member.is_patriarch,
            occupation: text_or_empty(&member.occupation),
            location: text_or_empty(&member.location),
            image_url: text_or_empty(&member.image_url),
        }
    }
}

/// Ephemeral tree view of one member and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyTreeNode {
    pub id: MemberId,
    pub name: String,
    pub attributes: NodeAttributes,
    pub children: Vec<FamilyTreeNode>,
}

impl FamilyTreeNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(FamilyTreeNode::size).sum::<usize>()
    }

    /// Depth-first lookup of `id` within this subtree.
    pub fn find(&self, id: MemberId) -> Option<&FamilyTreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Builds the display tree rooted at the patriarch.
///
/// Returns an empty vec when no member is flagged as patriarch; that is the
/// "nothing to display" signal, not an error. When the data carries more than
/// one patriarch, the first in input order wins. Members that cannot be
/// reached from the patriarch (orphans, detached cycles) are left out.
pub fn build_tree(members: &[Member]) -> Vec<FamilyTreeNode> {
    let Some(patriarch) = members.iter().find(|member| member.is_patriarch) else {
        return Vec::new();
    };

    let index = ChildIndex::new(members);
    let mut placed = HashSet::with_capacity(members.len());
    vec![build_node(patriarch, &index, &mut placed)]
}

/// Finds a node by id anywhere in a built forest.
pub fn find_node(id: MemberId, forest: &[FamilyTreeNode]) -> Option<&FamilyTreeNode> {
    forest.iter().find_map(|root| root.find(id))
}

fn build_node(
    member: &Member,
    index: &ChildIndex<'_>,
    placed: &mut HashSet<MemberId>,
) -> FamilyTreeNode {
    placed.insert(member.id);

    let mut children = Vec::new();
    for child in index.children_of(member.id) {
        if placed.contains(&child.id) {
            continue;
        }
        children.push(build_node(child, index, placed));
    }

    FamilyTreeNode {
        id: member.id,
        name: member.name.clone(),
        attributes: NodeAttributes::from(member),
        children,
    }
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
