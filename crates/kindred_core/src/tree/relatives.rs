//! Immediate-family lookups for one member.

use crate::model::member::Member;
use serde::Serialize;

/// Parent, sibling and child sets of one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relatives {
    /// Zero or one entry; the model records a single parent.
    pub parents: Vec<Member>,
    pub siblings: Vec<Member>,
    pub children: Vec<Member>,
}

/// Derives relatives of `member` from `all_members`, keeping input order.
///
/// Siblings are matched on a shared `parent_id` and always exclude `member`
/// itself by id, including the degenerate self-parent case.
pub fn find_relatives(member: &Member, all_members: &[Member]) -> Relatives {
    let parents = match member.parent_id {
        Some(parent_id) => all_members
            .iter()
            .find(|candidate| candidate.id == parent_id)
            .cloned()
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let siblings = match member.parent_id {
        Some(parent_id) => all_members
            .iter()
            .filter(|candidate| {
                candidate.parent_id == Some(parent_id) && candidate.id != member.id
            })
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let children = all_members
        .iter()
        .filter(|candidate| candidate.parent_id == Some(member.id))
        .cloned()
        .collect();

    Relatives {
        parents,
        siblings,
        children,
    }
}
