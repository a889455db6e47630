//! Family summary statistics.
//!
//! # Invariants
//! - Year parsing takes the leading digit run only; `"1890?"` is 1890 and
//!   `"c. 1890"` has no year.
//! - Members without a parsable birth year never qualify as oldest or
//!   youngest.

use crate::model::member::Member;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

static LEADING_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)").expect("valid leading year regex"));

/// Aggregate counts shown alongside the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyStats {
    pub total_members: usize,
    /// Number of distinct generation values present.
    pub total_generations: usize,
    pub living_members: usize,
    /// Member with the earliest parsable birth year.
    pub oldest_member: Option<Member>,
    /// Living member with the latest parsable birth year.
    pub youngest_living_member: Option<Member>,
}

/// Computes statistics over a member snapshot.
///
/// Ties keep the earlier member in input order.
pub fn family_stats(members: &[Member]) -> FamilyStats {
    let generations: BTreeSet<u32> = members.iter().map(|member| member.generation).collect();

    let mut oldest: Option<(u32, &Member)> = None;
    let mut youngest_living: Option<(u32, &Member)> = None;
    let mut living_members = 0;

    for member in members {
        let living = member.is_living();
        if living {
            living_members += 1;
        }

        let Some(year) = member.birth_date.as_deref().and_then(parse_year) else {
            continue;
        };
        if oldest.map_or(true, |(best, _)| year < best) {
            oldest = Some((year, member));
        }
        if living && youngest_living.map_or(true, |(best, _)| year > best) {
            youngest_living = Some((year, member));
        }
    }

    FamilyStats {
        total_members: members.len(),
        total_generations: generations.len(),
        living_members,
        oldest_member: oldest.map(|(_, member)| member.clone()),
        youngest_living_member: youngest_living.map(|(_, member)| member.clone()),
    }
}

/// Parses the leading year of a free-form date string.
pub fn parse_year(value: &str) -> Option<u32> {
    LEADING_YEAR_RE
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::{family_stats, parse_year};
    use crate::model::member::{Member, MemberId, NewMember};

    fn member(id: MemberId, generation: u32, birth: Option<&str>, death: Option<&str>) -> Member {
        let mut new = NewMember::new(format!("m{id}"), generation, Some(1));
        new.birth_date = birth.map(str::to_string);
        new.death_date = death.map(str::to_string);
        Member::from_new(id, new)
    }

    #[test]
    fn parse_year_uses_leading_digits() {
        assert_eq!(parse_year("1890"), Some(1890));
        assert_eq!(parse_year("  1902-03-01"), Some(1902));
        assert_eq!(parse_year("1890?"), Some(1890));
        assert_eq!(parse_year("c. 1890"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn stats_over_mixed_members() {
        let members = vec![
            member(2, 2, Some("1850"), Some("1920")),
            member(3, 2, None, None),
            member(4, 3, Some("1950"), None),
            member(5, 4, Some("1985"), None),
            member(6, 4, Some("1990"), Some("2001")),
            member(7, 4, Some("unknown"), None),
        ];
        let stats = family_stats(&members);
        assert_eq!(stats.total_members, 6);
        assert_eq!(stats.total_generations, 3);
        assert_eq!(stats.living_members, 4);
        assert_eq!(stats.oldest_member.map(|m| m.id), Some(2));
        assert_eq!(stats.youngest_living_member.map(|m| m.id), Some(5));
    }

    #[test]
    fn blank_but_present_death_date_is_not_living() {
        let members = vec![
            member(2, 2, Some("1900"), Some(" ")),
            member(3, 2, Some("1910"), Some("")),
        ];
        let stats = family_stats(&members);
        assert_eq!(stats.living_members, 1);
        assert_eq!(stats.youngest_living_member.map(|m| m.id), Some(3));
    }

    #[test]
    fn stats_over_empty_snapshot() {
        let stats = family_stats(&[]);
        assert_eq!(stats.total_members, 0);
        assert_eq!(stats.total_generations, 0);
        assert!(stats.oldest_member.is_none());
        assert!(stats.youngest_living_member.is_none());
    }
}
