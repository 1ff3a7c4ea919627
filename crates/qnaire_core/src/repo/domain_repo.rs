//! Domain attribute repository.
//!
//! # Invariants
//! - Writes call `Attribute::validate()` before SQL mutations.
//! - `load_domain` returns the full tree in one query.

use crate::model::domain::{Attribute, AttributeId, DomainTree, ValueType};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_optional_uuid, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};

pub trait DomainRepository {
    fn create_attribute(&self, attribute: &Attribute) -> RepoResult<AttributeId>;
    fn load_domain(&self) -> RepoResult<DomainTree>;
}

pub struct SqliteDomainRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDomainRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DomainRepository for SqliteDomainRepository<'_> {
    fn create_attribute(&self, attribute: &Attribute) -> RepoResult<AttributeId> {
        attribute.validate()?;

        self.conn.execute(
            "INSERT INTO attributes (
                id,
                parent_id,
                key,
                value_type,
                unit,
                is_collection
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                attribute.id.to_string(),
                attribute.parent_id.map(|id| id.to_string()),
                attribute.key.as_str(),
                attribute.value_type.as_str(),
                attribute.unit.as_deref(),
                bool_to_int(attribute.is_collection),
            ],
        )?;

        Ok(attribute.id)
    }

    fn load_domain(&self) -> RepoResult<DomainTree> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_id, key, value_type, unit, is_collection
             FROM attributes
             ORDER BY key ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut attributes = Vec::new();
        while let Some(row) = rows.next()? {
            attributes.push(parse_attribute_row(row)?);
        }
        Ok(DomainTree::from_attributes(attributes))
    }
}

fn parse_attribute_row(row: &Row<'_>) -> RepoResult<Attribute> {
    let id_text: String = row.get("id")?;
    let value_type_text: String = row.get("value_type")?;
    let value_type = ValueType::parse(&value_type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid value type `{value_type_text}` in attributes.value_type"
        ))
    })?;

    Ok(Attribute {
        id: parse_uuid(&id_text, "attributes.id")?,
        parent_id: parse_optional_uuid(row.get("parent_id")?, "attributes.parent_id")?,
        key: row.get("key")?,
        value_type,
        unit: row.get("unit")?,
        is_collection: parse_bool(row.get("is_collection")?, "attributes.is_collection")?,
    })
}
