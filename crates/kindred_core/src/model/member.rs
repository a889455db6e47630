//! Family member domain model.
//!
//! # Responsibility
//! - Define the canonical member record stored in `family_members`.
//! - Validate record-level invariants before persistence.
//!
//! # Invariants
//! - `id` is a positive integer and never reused for another member.
//! - `generation` is at least 1; the patriarch is generation 1 by convention.
//! - A patriarch has no parent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of one family member.
pub type MemberId = i64;

/// Persisted family member.
///
/// Descriptive attributes are optional display payload and carry no
/// structural meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// `None` for the patriarch and for unattached members.
    #[serde(default)]
    pub parent_id: Option<MemberId>,
    pub generation: u32,
    /// Lineage tag used for directory filtering only.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub is_patriarch: bool,
}

impl Member {
    /// Builds a stored member from create/update input and its assigned id.
    pub fn from_new(id: MemberId, new: NewMember) -> Self {
        Self {
            id,
            name: new.name,
            birth_date: new.birth_date,
            death_date: new.death_date,
            occupation: new.occupation,
            education: new.education,
            location: new.location,
            biography: new.biography,
            image_url: new.image_url,
            parent_id: new.parent_id,
            generation: new.generation,
            branch: new.branch,
            is_patriarch: new.is_patriarch,
        }
    }

    /// Strips the id, producing input usable for a full-record update.
    pub fn to_new(&self) -> NewMember {
        NewMember {
            name: self.name.clone(),
            birth_date: self.birth_date.clone(),
            death_date: self.death_date.clone(),
            occupation: self.occupation.clone(),
            education: self.education.clone(),
            location: self.location.clone(),
            biography: self.biography.clone(),
            image_url: self.image_url.clone(),
            parent_id: self.parent_id,
            generation: self.generation,
            branch: self.branch.clone(),
            is_patriarch: self.is_patriarch,
        }
    }

    /// Validates the record including its id.
    pub fn validate(&self) -> Result<(), MemberValidationError> {
        if self.id <= 0 {
            return Err(MemberValidationError::NonPositiveId(self.id));
        }
        if self.parent_id == Some(self.id) {
            return Err(MemberValidationError::SelfParent(self.id));
        }
        validate_fields(&self.name, self.generation, self.parent_id, self.is_patriarch)
    }

    /// Returns whether the member has no recorded death date.
    ///
    /// Only an absent or empty value counts as living; any other text,
    /// whitespace included, is a recorded death date.
    pub fn is_living(&self) -> bool {
        self.death_date.as_deref().map_or(true, str::is_empty)
    }
}

/// Create/update input for one member; identical to [`Member`] minus `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<MemberId>,
    pub generation: u32,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub is_patriarch: bool,
}

impl NewMember {
    /// Creates input with required fields only; every attribute starts unset.
    pub fn new(name: impl Into<String>, generation: u32, parent_id: Option<MemberId>) -> Self {
        Self {
            name: name.into(),
            birth_date: None,
            death_date: None,
            occupation: None,
            education: None,
            location: None,
            biography: None,
            image_url: None,
            parent_id,
            generation,
            branch: None,
            is_patriarch: false,
        }
    }

    /// Creates patriarch input: generation 1, no parent.
    pub fn patriarch(name: impl Into<String>) -> Self {
        let mut member = Self::new(name, 1, None);
        member.is_patriarch = true;
        member
    }

    /// Validates field-level invariants.
    pub fn validate(&self) -> Result<(), MemberValidationError> {
        validate_fields(&self.name, self.generation, self.parent_id, self.is_patriarch)
    }
}

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    /// Name is blank after trim.
    BlankName,
    /// Generation must start at 1.
    ZeroGeneration,
    /// Ids are positive integers.
    NonPositiveId(MemberId),
    /// Parent ids are positive integers.
    NonPositiveParentId(MemberId),
    /// Patriarch must be the parentless root.
    PatriarchWithParent(MemberId),
    /// Member names itself as parent.
    SelfParent(MemberId),
}

impl Display for MemberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "member name must not be blank"),
            Self::ZeroGeneration => write!(f, "member generation must be at least 1"),
            Self::NonPositiveId(id) => write!(f, "member id must be positive, got {id}"),
            Self::NonPositiveParentId(id) => {
                write!(f, "parent id must be positive, got {id}")
            }
            Self::PatriarchWithParent(parent_id) => {
                write!(f, "patriarch must not have a parent, got parent {parent_id}")
            }
            Self::SelfParent(id) => write!(f, "member {id} cannot be its own parent"),
        }
    }
}

impl Error for MemberValidationError {}

fn validate_fields(
    name: &str,
    generation: u32,
    parent_id: Option<MemberId>,
    is_patriarch: bool,
) -> Result<(), MemberValidationError> {
    if name.trim().is_empty() {
        return Err(MemberValidationError::BlankName);
    }
    if generation == 0 {
        return Err(MemberValidationError::ZeroGeneration);
    }
    if let Some(parent_id) = parent_id {
        if parent_id <= 0 {
            return Err(MemberValidationError::NonPositiveParentId(parent_id));
        }
        if is_patriarch {
            return Err(MemberValidationError::PatriarchWithParent(parent_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Member, MemberValidationError, NewMember};

    #[test]
    fn patriarch_input_is_valid_root() {
        let input = NewMember::patriarch("Onaga");
        assert!(input.is_patriarch);
        assert_eq!(input.generation, 1);
        assert_eq!(input.parent_id, None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name_and_zero_generation() {
        let blank = NewMember::new("   ", 2, Some(1));
        assert_eq!(blank.validate(), Err(MemberValidationError::BlankName));

        let zero = NewMember::new("Otuomu", 0, Some(1));
        assert_eq!(zero.validate(), Err(MemberValidationError::ZeroGeneration));
    }

    #[test]
    fn validate_rejects_patriarch_with_parent() {
        let mut input = NewMember::patriarch("Onaga");
        input.parent_id = Some(7);
        assert_eq!(
            input.validate(),
            Err(MemberValidationError::PatriarchWithParent(7))
        );
    }

    #[test]
    fn member_validate_rejects_self_parent() {
        let member = Member::from_new(4, NewMember::new("Onobiaru", 3, Some(4)));
        assert_eq!(member.validate(), Err(MemberValidationError::SelfParent(4)));
    }

    #[test]
    fn living_means_no_death_date() {
        let mut member = Member::from_new(2, NewMember::new("Otuomu", 2, Some(1)));
        assert!(member.is_living());
        member.death_date = Some(String::new());
        assert!(member.is_living());
        member.death_date = Some("1921".to_string());
        assert!(!member.is_living());
    }

    #[test]
    fn whitespace_death_date_counts_as_recorded() {
        let mut member = Member::from_new(2, NewMember::new("Otuomu", 2, Some(1)));
        member.death_date = Some(" ".to_string());
        assert!(!member.is_living());
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let mut member = Member::from_new(1, NewMember::patriarch("Onaga"));
        member.image_url = Some("onaga.png".to_string());
        let value = serde_json::to_value(&member).expect("member should serialize");
        assert_eq!(value["isPatriarch"], true);
        assert_eq!(value["imageUrl"], "onaga.png");
        assert!(value["parentId"].is_null());
    }
}
