//! Member repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `family_members` table.
//! - Run multi-row writes (batched delete, bulk replace) atomically.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Single-row writes check the patriarch flag and parent reference inside
//!   the same immediate transaction as the write.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::member::{Member, MemberId, MemberValidationError, NewMember};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    name,
    birth_date,
    death_date,
    occupation,
    education,
    location,
    biography,
    image_url,
    parent_id,
    generation,
    branch,
    is_patriarch
FROM family_members";

// Keeps `IN (...)` lists well under SQLite's bound-parameter limit.
const DELETE_CHUNK_SIZE: usize = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from member persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// Record failed field-level validation.
    Validation(MemberValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target member does not exist.
    NotFound(MemberId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid member.
    InvalidData(String),
    /// Another member already holds the patriarch flag.
    PatriarchConflict(MemberId),
    /// Referenced parent is not stored.
    MissingParent(MemberId),
    /// Every positive id has been handed out.
    IdSpaceExhausted,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "family member not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "member repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted member data: {message}"),
            Self::PatriarchConflict(id) => write!(f, "member {id} is already the patriarch"),
            Self::MissingParent(id) => write!(f, "parent member not found: {id}"),
            Self::IdSpaceExhausted => write!(f, "member id space exhausted"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
            Self::PatriarchConflict(_) | Self::MissingParent(_) | Self::IdSpaceExhausted => None,
        }
    }
}

impl From<MemberValidationError> for RepoError {
    fn from(value: MemberValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for family members.
pub trait MemberRepository {
    /// Lists every member by ascending id.
    fn list_members(&self) -> RepoResult<Vec<Member>>;
    /// Loads one member by id.
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    /// Lists members of one generation by ascending id.
    fn list_by_generation(&self, generation: u32) -> RepoResult<Vec<Member>>;
    /// Lists members tagged with `branch` by ascending id.
    fn list_by_branch(&self, branch: &str) -> RepoResult<Vec<Member>>;
    /// Stores a new member under the next free id.
    ///
    /// Fails with `MissingParent` or `PatriarchConflict` atomically with the
    /// write, so concurrent callers cannot both pass the check.
    fn create_member(&self, member: &NewMember) -> RepoResult<Member>;
    /// Replaces every field of an existing member, with the same checks as
    /// `create_member`.
    fn update_member(&self, id: MemberId, member: &NewMember) -> RepoResult<Member>;
    /// Deletes all listed members in one atomic step; returns rows removed.
    fn delete_members(&self, ids: &[MemberId]) -> RepoResult<usize>;
    /// Clears storage and inserts `members` with their own ids atomically.
    fn replace_all_members(&self, members: &[Member]) -> RepoResult<usize>;
}

// Lets one store instance back several services by reference.
impl<R: MemberRepository + ?Sized> MemberRepository for &R {
    fn list_members(&self) -> RepoResult<Vec<Member>> {
        (**self).list_members()
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        (**self).get_member(id)
    }

    fn list_by_generation(&self, generation: u32) -> RepoResult<Vec<Member>> {
        (**self).list_by_generation(generation)
    }

    fn list_by_branch(&self, branch: &str) -> RepoResult<Vec<Member>> {
        (**self).list_by_branch(branch)
    }

    fn create_member(&self, member: &NewMember) -> RepoResult<Member> {
        (**self).create_member(member)
    }

    fn update_member(&self, id: MemberId, member: &NewMember) -> RepoResult<Member> {
        (**self).update_member(id, member)
    }

    fn delete_members(&self, ids: &[MemberId]) -> RepoResult<usize> {
        (**self).delete_members(ids)
    }

    fn replace_all_members(&self, members: &[Member]) -> RepoResult<usize> {
        (**self).replace_all_members(members)
    }
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Creates a repository over a connection returned by `open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn query_members(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn list_members(&self) -> RepoResult<Vec<Member>> {
        self.query_members(&format!("{MEMBER_SELECT_SQL} ORDER BY id ASC;"), &[])
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        let mut members =
            self.query_members(&format!("{MEMBER_SELECT_SQL} WHERE id = ?1;"), &[&id])?;
        Ok(members.pop())
    }

    fn list_by_generation(&self, generation: u32) -> RepoResult<Vec<Member>> {
        self.query_members(
            &format!("{MEMBER_SELECT_SQL} WHERE generation = ?1 ORDER BY id ASC;"),
            &[&generation],
        )
    }

    fn list_by_branch(&self, branch: &str) -> RepoResult<Vec<Member>> {
        self.query_members(
            &format!("{MEMBER_SELECT_SQL} WHERE branch = ?1 ORDER BY id ASC;"),
            &[&branch],
        )
    }

    fn create_member(&self, member: &NewMember) -> RepoResult<Member> {
        member.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        check_hierarchy(&tx, None, member)?;
        tx.execute(
            "INSERT INTO family_members (
                name,
                birth_date,
                death_date,
                occupation,
                education,
                location,
                biography,
                image_url,
                parent_id,
                generation,
                branch,
                is_patriarch
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                member.name.trim(),
                member.birth_date.as_deref(),
                member.death_date.as_deref(),
                member.occupation.as_deref(),
                member.education.as_deref(),
                member.location.as_deref(),
                member.biography.as_deref(),
                member.image_url.as_deref(),
                member.parent_id,
                member.generation,
                member.branch.as_deref(),
                bool_to_int(member.is_patriarch),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.get_member(id)?.ok_or(RepoError::NotFound(id))
    }

    fn update_member(&self, id: MemberId, member: &NewMember) -> RepoResult<Member> {
        member.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        check_hierarchy(&tx, Some(id), member)?;
        let changed = tx.execute(
            "UPDATE family_members
             SET
                name = ?1,
                birth_date = ?2,
                death_date = ?3,
                occupation = ?4,
                education = ?5,
                location = ?6,
                biography = ?7,
                image_url = ?8,
                parent_id = ?9,
                generation = ?10,
                branch = ?11,
                is_patriarch = ?12
             WHERE id = ?13;",
            params![
                member.name.trim(),
                member.birth_date.as_deref(),
                member.death_date.as_deref(),
                member.occupation.as_deref(),
                member.education.as_deref(),
                member.location.as_deref(),
                member.biography.as_deref(),
                member.image_url.as_deref(),
                member.parent_id,
                member.generation,
                member.branch.as_deref(),
                bool_to_int(member.is_patriarch),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;

        self.get_member(id)?.ok_or(RepoError::NotFound(id))
    }

    fn delete_members(&self, ids: &[MemberId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        // Parents and children may land in different chunks; check references
        // once at commit instead of per statement.
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

        let mut removed = 0;
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            removed += tx.execute(
                &format!("DELETE FROM family_members WHERE id IN ({placeholders});"),
                params_from_iter(chunk.iter()),
            )?;
        }

        tx.commit()?;
        Ok(removed)
    }

    fn replace_all_members(&self, members: &[Member]) -> RepoResult<usize> {
        for member in members {
            member.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        // Input order need not put parents first.
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        tx.execute("DELETE FROM family_members;", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO family_members (
                    id,
                    name,
                    birth_date,
                    death_date,
                    occupation,
                    education,
                    location,
                    biography,
                    image_url,
                    parent_id,
                    generation,
                    branch,
                    is_patriarch
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            )?;
            for member in members {
                stmt.execute(params![
                    member.id,
                    member.name.trim(),
                    member.birth_date.as_deref(),
                    member.death_date.as_deref(),
                    member.occupation.as_deref(),
                    member.education.as_deref(),
                    member.location.as_deref(),
                    member.biography.as_deref(),
                    member.image_url.as_deref(),
                    member.parent_id,
                    member.generation,
                    member.branch.as_deref(),
                    bool_to_int(member.is_patriarch),
                ])?;
            }
        }

        tx.commit()?;
        Ok(members.len())
    }
}

// Runs inside the caller's write transaction; `own_id` is the member being
// updated, if any.
fn check_hierarchy(
    conn: &Connection,
    own_id: Option<MemberId>,
    member: &NewMember,
) -> RepoResult<()> {
    if let Some(parent_id) = member.parent_id {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM family_members WHERE id = ?1);",
            [parent_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::MissingParent(parent_id));
        }
    }

    if member.is_patriarch {
        let existing: Option<MemberId> = conn
            .query_row(
                "SELECT id FROM family_members
                 WHERE is_patriarch = 1 AND id IS NOT ?1
                 LIMIT 1;",
                [own_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing) = existing {
            return Err(RepoError::PatriarchConflict(existing));
        }
    }
    Ok(())
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let id: MemberId = row.get("id")?;

    let generation_raw: i64 = row.get("generation")?;
    let generation = u32::try_from(generation_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid generation `{generation_raw}` in family_members.generation for id {id}"
        ))
    })?;

    let is_patriarch = match row.get::<_, i64>("is_patriarch")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_patriarch value `{other}` in family_members.is_patriarch for id {id}"
            )));
        }
    };

    let member = Member {
        id,
        name: row.get("name")?,
        birth_date: row.get("birth_date")?,
        death_date: row.get("death_date")?,
        occupation: row.get("occupation")?,
        education: row.get("education")?,
        location: row.get("location")?,
        biography: row.get("biography")?,
        image_url: row.get("image_url")?,
        parent_id: row.get("parent_id")?,
        generation,
        branch: row.get("branch")?,
        is_patriarch,
    };
    member
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("member {id}: {err}")))?;
    Ok(member)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
