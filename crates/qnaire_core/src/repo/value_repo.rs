//! Value repository: the bulk value provider for one project scope.
//!
//! # Responsibility
//! - Store live answers, replacing the value at the same
//!   `(attribute, set_index, collection_index)` slot.
//! - Return all values of `(project, snapshot)` in insertion order.
//!
//! # Invariants
//! - Only live values (`snapshot_id = None`) are writable.
//! - Payload columns match `payload_kind`; mismatches are rejected on read.

use crate::model::value::{ProjectId, SnapshotId, Value, ValueId, ValuePayload};
use crate::repo::{ensure_connection_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

pub trait ValueRepository {
    /// Inserts or replaces a live value; returns the stored row id.
    fn save_value(&self, value: &Value) -> RepoResult<ValueId>;
    fn delete_value(&self, id: ValueId) -> RepoResult<()>;
    /// All values of one project scope; `snapshot_id = None` means live.
    fn list_values(
        &self,
        project_id: ProjectId,
        snapshot_id: Option<SnapshotId>,
    ) -> RepoResult<Vec<Value>>;
}

pub struct SqliteValueRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteValueRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

/// Column projection of one payload.
struct PayloadColumns<'a> {
    kind: &'static str,
    text: Option<&'a str>,
    option_id: Option<String>,
    amount: Option<f64>,
    unit: Option<&'a str>,
    file_name: Option<&'a str>,
}

impl<'a> PayloadColumns<'a> {
    fn from_payload(payload: &'a ValuePayload) -> Self {
        let empty = Self {
            kind: "text",
            text: None,
            option_id: None,
            amount: None,
            unit: None,
            file_name: None,
        };
        match payload {
            ValuePayload::Text { text } => Self {
                text: Some(text.as_str()),
                ..empty
            },
            ValuePayload::Option { option_id, text } => Self {
                kind: "option",
                text: text.as_deref(),
                option_id: Some(option_id.to_string()),
                ..empty
            },
            ValuePayload::Quantity { amount, unit } => Self {
                kind: "quantity",
                amount: Some(*amount),
                unit: unit.as_deref(),
                ..empty
            },
            ValuePayload::File { name } => Self {
                kind: "file",
                file_name: Some(name.as_str()),
                ..empty
            },
        }
    }
}

impl ValueRepository for SqliteValueRepository<'_> {
    fn save_value(&self, value: &Value) -> RepoResult<ValueId> {
        if let Some(snapshot_id) = value.snapshot_id {
            return Err(RepoError::SnapshotReadOnly(snapshot_id));
        }
        let columns = PayloadColumns::from_payload(&value.payload);
        let attribute_id = value.attribute_id.map(|id| id.to_string());

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let existing: Option<String> = if attribute_id.is_some() {
            let mut stmt = tx.prepare(
                "SELECT id FROM project_values
                 WHERE project_id = ?1
                   AND snapshot_id IS NULL
                   AND attribute_id = ?2
                   AND set_index = ?3
                   AND collection_index = ?4;",
            )?;
            let mut rows = stmt.query(params![
                value.project_id.to_string(),
                attribute_id,
                value.set_index,
                value.collection_index,
            ])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        } else {
            None
        };

        let stored_id = match existing {
            Some(existing_id) => {
                tx.execute(
                    "UPDATE project_values
                     SET payload_kind = ?2,
                         text = ?3,
                         option_id = ?4,
                         amount = ?5,
                         unit = ?6,
                         file_name = ?7,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?1;",
                    params![
                        existing_id,
                        columns.kind,
                        columns.text,
                        columns.option_id,
                        columns.amount,
                        columns.unit,
                        columns.file_name,
                    ],
                )?;
                parse_uuid(&existing_id, "project_values.id")?
            }
            None => {
                tx.execute(
                    "INSERT INTO project_values (
                        id,
                        project_id,
                        snapshot_id,
                        attribute_id,
                        set_index,
                        collection_index,
                        payload_kind,
                        text,
                        option_id,
                        amount,
                        unit,
                        file_name
                    ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
                    params![
                        value.id.to_string(),
                        value.project_id.to_string(),
                        attribute_id,
                        value.set_index,
                        value.collection_index,
                        columns.kind,
                        columns.text,
                        columns.option_id,
                        columns.amount,
                        columns.unit,
                        columns.file_name,
                    ],
                )?;
                value.id
            }
        };
        tx.commit()?;
        Ok(stored_id)
    }

    fn delete_value(&self, id: ValueId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM project_values WHERE id = ?1 AND snapshot_id IS NULL;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "value", id });
        }
        Ok(())
    }

    fn list_values(
        &self,
        project_id: ProjectId,
        snapshot_id: Option<SnapshotId>,
    ) -> RepoResult<Vec<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                project_id,
                snapshot_id,
                attribute_id,
                set_index,
                collection_index,
                payload_kind,
                text,
                option_id,
                amount,
                unit,
                file_name
             FROM project_values
             WHERE project_id = ?1
               AND snapshot_id IS ?2
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query(params![
            project_id.to_string(),
            snapshot_id.map(|id| id.to_string()),
        ])?;

        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(parse_value_row(row)?);
        }
        Ok(values)
    }
}

fn parse_value_row(row: &Row<'_>) -> RepoResult<Value> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let kind: String = row.get("payload_kind")?;
    let text: Option<String> = row.get("text")?;

    let payload = match kind.as_str() {
        "text" => ValuePayload::Text {
            text: text.unwrap_or_default(),
        },
        "option" => {
            let option_id = parse_optional_uuid(row.get("option_id")?, "project_values.option_id")?
                .ok_or_else(|| {
                    RepoError::InvalidData(format!("option value {id_text} has no option_id"))
                })?;
            ValuePayload::Option { option_id, text }
        }
        "quantity" => ValuePayload::Quantity {
            amount: row.get::<_, Option<f64>>("amount")?.ok_or_else(|| {
                RepoError::InvalidData(format!("quantity value {id_text} has no amount"))
            })?,
            unit: row.get("unit")?,
        },
        "file" => ValuePayload::File {
            name: row.get::<_, Option<String>>("file_name")?.unwrap_or_default(),
        },
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid payload kind `{other}` in project_values.payload_kind"
            )))
        }
    };

    Ok(Value {
        id: parse_uuid(&id_text, "project_values.id")?,
        project_id: parse_uuid(&project_text, "project_values.project_id")?,
        snapshot_id: parse_optional_uuid(row.get("snapshot_id")?, "project_values.snapshot_id")?,
        attribute_id: parse_optional_uuid(row.get("attribute_id")?, "project_values.attribute_id")?,
        set_index: row.get("set_index")?,
        collection_index: row.get("collection_index")?,
        payload,
    })
}
