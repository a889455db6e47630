//! Parent-id child index shared by tree building and cascading delete.

use crate::model::member::{Member, MemberId};
use std::collections::{HashMap, HashSet};

/// Mapping from parent id to that parent's children, in input order.
///
/// Built once per derivation so each lookup is O(1) instead of a full scan.
#[derive(Debug, Default)]
pub struct ChildIndex<'a> {
    children: HashMap<MemberId, Vec<&'a Member>>,
}

impl<'a> ChildIndex<'a> {
    /// Indexes every member that declares a parent.
    pub fn new(members: &'a [Member]) -> Self {
        let mut children: HashMap<MemberId, Vec<&'a Member>> = HashMap::new();
        for member in members {
            if let Some(parent_id) = member.parent_id {
                children.entry(parent_id).or_default().push(member);
            }
        }
        Self { children }
    }

    /// Returns direct children of `parent_id`; empty when none.
    pub fn children_of(&self, parent_id: MemberId) -> &[&'a Member] {
        self.children
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Collects `root_id` and every id reachable below it, in preorder.
///
/// Each id is returned once even when parent pointers form a cycle.
pub fn collect_descendants(root_id: MemberId, members: &[Member]) -> Vec<MemberId> {
    let index = ChildIndex::new(members);
    let mut visited = HashSet::new();
    let mut ordered = Vec::new();
    let mut stack = vec![root_id];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        ordered.push(current);
        // Reverse push keeps siblings in input order when popped.
        for child in index.children_of(current).iter().rev() {
            if !visited.contains(&child.id) {
                stack.push(child.id);
            }
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::{collect_descendants, ChildIndex};
    use crate::model::member::{Member, MemberId, NewMember};

    fn member(id: MemberId, parent_id: Option<MemberId>) -> Member {
        Member::from_new(id, NewMember::new(format!("m{id}"), 1, parent_id))
    }

    #[test]
    fn children_of_preserves_input_order() {
        let members = vec![member(1, None), member(5, Some(1)), member(3, Some(1))];
        let index = ChildIndex::new(&members);
        let ids: Vec<_> = index.children_of(1).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 3]);
        assert!(index.children_of(5).is_empty());
    }

    #[test]
    fn collect_descendants_is_preorder() {
        let members = vec![
            member(1, None),
            member(2, Some(1)),
            member(3, Some(1)),
            member(4, Some(2)),
            member(5, Some(3)),
            member(6, None),
        ];
        assert_eq!(collect_descendants(1, &members), vec![1, 2, 4, 3, 5]);
        assert_eq!(collect_descendants(3, &members), vec![3, 5]);
        assert_eq!(collect_descendants(6, &members), vec![6]);
    }

    #[test]
    fn collect_descendants_terminates_on_cycles() {
        let members = vec![member(1, Some(2)), member(2, Some(1)), member(3, Some(3))];
        assert_eq!(collect_descendants(1, &members), vec![1, 2]);
        assert_eq!(collect_descendants(3, &members), vec![3]);
    }
}
