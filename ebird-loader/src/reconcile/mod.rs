//! Entity reconciler
//!
//! Decides whether an incoming record creates a row, updates one, or leaves
//! it alone:
//!
//! 1. Look the row up by natural key (exact equality, lowest id wins).
//! 2. Not found: insert with `created = modified = now` and
//!    `edited = revision`.
//! 3. Found and the revision supersedes the stored `edited`: overwrite the
//!    supplied fields, set `modified = now` and `edited = revision`.
//! 4. Otherwise: nothing is written.
//!
//! Statements are only issued in branches 2 and 3, so replaying a record
//! with an unchanged revision is free and reports `Unchanged`.

pub mod fields;

use chrono::{NaiveDateTime, Utc};
use ebird_common::config::KeyPolicy;
use ebird_common::db::Table;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::trace;

use crate::error::{LoaderError, LoaderResult};

pub use fields::{
    ChecklistFields, Entity, LocationFields, ObservationFields, ObserverFields, SpeciesFields,
    SqlValue,
};

/// The source's revision marker for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// Source timestamp of the record's last edit
    Tracked(NaiveDateTime),
    /// Source carries no revision; every encounter overwrites
    Untracked,
}

impl Revision {
    /// True when a record with this revision should overwrite a row whose
    /// stored revision is `stored`. Strictly newer only; a NULL stored
    /// revision is older than any timestamp.
    pub fn supersedes(&self, stored: Option<NaiveDateTime>) -> bool {
        match (self, stored) {
            (Revision::Untracked, _) => true,
            (Revision::Tracked(_), None) => true,
            (Revision::Tracked(incoming), Some(stored)) => *incoming > stored,
        }
    }

    pub fn marker(&self) -> Option<NaiveDateTime> {
        match self {
            Revision::Tracked(at) => Some(*at),
            Revision::Untracked => None,
        }
    }
}

/// Column and value used to find an existing row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NaturalKey {
    Identifier(String),
    Code(String),
    Name(String),
    /// `None` is the empty key: matched with `IS NULL`
    TaxonOrder(Option<i64>),
}

impl NaturalKey {
    pub fn column(&self) -> &'static str {
        match self {
            NaturalKey::Identifier(_) => "identifier",
            NaturalKey::Code(_) => "code",
            NaturalKey::Name(_) => "name",
            NaturalKey::TaxonOrder(_) => "taxon_order",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            NaturalKey::Identifier(value) | NaturalKey::Code(value) | NaturalKey::Name(value) => {
                value.is_empty()
            }
            NaturalKey::TaxonOrder(order) => order.is_none(),
        }
    }

    fn value(&self) -> SqlValue {
        match self {
            NaturalKey::Identifier(value) | NaturalKey::Code(value) | NaturalKey::Name(value) => {
                SqlValue::Text(value.clone())
            }
            NaturalKey::TaxonOrder(order) => SqlValue::Integer(*order),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub id: i64,
    pub outcome: Outcome,
}

/// A row found by natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Existing {
    pub id: i64,
    pub edited: Option<NaiveDateTime>,
}

/// Create or update the row of `E::TABLE` identified by `key`.
pub async fn reconcile<E: Entity>(
    conn: &mut SqliteConnection,
    policy: KeyPolicy,
    key: &NaturalKey,
    revision: Revision,
    fields: &E,
) -> LoaderResult<Reconciled> {
    if policy == KeyPolicy::Strict && key.is_empty() {
        return Err(LoaderError::EmptyNaturalKey {
            kind: E::TABLE.as_str(),
        });
    }

    let outcome = match find_by_key(&mut *conn, E::TABLE, key).await? {
        None => {
            let id = create(&mut *conn, Some(key), revision, fields).await?;
            Reconciled {
                id,
                outcome: Outcome::Created,
            }
        }
        Some(existing) if revision.supersedes(existing.edited) => {
            update(&mut *conn, existing.id, revision, fields).await?;
            Reconciled {
                id: existing.id,
                outcome: Outcome::Updated,
            }
        }
        Some(existing) => Reconciled {
            id: existing.id,
            outcome: Outcome::Unchanged,
        },
    };

    trace!(
        table = %E::TABLE,
        key = ?key,
        id = outcome.id,
        outcome = ?outcome.outcome,
        "Reconciled"
    );

    Ok(outcome)
}

/// First row (lowest id) whose key column equals the key value.
///
/// An unknown taxonomic order matches rows whose order is NULL.
pub async fn find_by_key(
    conn: &mut SqliteConnection,
    table: Table,
    key: &NaturalKey,
) -> LoaderResult<Option<Existing>> {
    let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
        "SELECT id, edited FROM {} WHERE {}",
        table.as_str(),
        key.column()
    ));
    match key {
        NaturalKey::TaxonOrder(None) => {
            builder.push(" IS NULL");
        }
        _ => {
            builder.push(" = ");
            key.value().push_bind(&mut builder);
        }
    }
    builder.push(" ORDER BY id LIMIT 1");

    let row = builder.build().fetch_optional(&mut *conn).await?;

    match row {
        Some(row) => Ok(Some(Existing {
            id: row.try_get("id")?,
            edited: row.try_get("edited")?,
        })),
        None => Ok(None),
    }
}

/// Insert a new row without looking for an existing one.
///
/// `key`, when given, is written to its column unless the field set
/// already supplies that column.
pub async fn create<E: Entity>(
    conn: &mut SqliteConnection,
    key: Option<&NaturalKey>,
    revision: Revision,
    fields: &E,
) -> LoaderResult<i64> {
    let now = Utc::now();
    let mut assignments = fields.assignments();

    if let Some(key) = key {
        if !assignments.iter().any(|(column, _)| *column == key.column()) {
            assignments.insert(0, (key.column(), key.value()));
        }
    }

    let mut builder: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new(format!("INSERT INTO {} (created, modified, edited", E::TABLE.as_str()));
    for (column, _) in &assignments {
        builder.push(", ").push(*column);
    }

    builder.push(") VALUES (");
    builder.push_bind(now).push(", ").push_bind(now).push(", ");
    builder.push_bind(revision.marker());
    for (_, value) in assignments {
        builder.push(", ");
        value.push_bind(&mut builder);
    }
    builder.push(")");

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.last_insert_rowid())
}

/// Overwrite the supplied fields of row `id`.
///
/// An untracked revision leaves `edited` as stored.
async fn update<E: Entity>(
    conn: &mut SqliteConnection,
    id: i64,
    revision: Revision,
    fields: &E,
) -> LoaderResult<()> {
    let mut builder: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new(format!("UPDATE {} SET modified = ", E::TABLE.as_str()));
    builder.push_bind(Utc::now());

    if let Some(edited) = revision.marker() {
        builder.push(", edited = ").push_bind(edited);
    }

    for (column, value) in fields.assignments() {
        builder.push(", ").push(column).push(" = ");
        value.push_bind(&mut builder);
    }

    builder.push(" WHERE id = ").push_bind(id);
    builder.build().execute(&mut *conn).await?;

    Ok(())
}
