//! Condition and task repository.
//!
//! # Invariants
//! - A task and its condition links are written in one transaction.
//! - Tasks list by `key ASC`; condition links keep insertion order.

use crate::conditions::{Condition, ConditionId, Relation, Task, TaskId};
use crate::model::locale::LocalizedText;
use crate::repo::{ensure_connection_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;

pub trait TaskRepository {
    fn create_condition(&self, condition: &Condition) -> RepoResult<ConditionId>;
    /// Inserts the task and links it to `task.condition_ids`.
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn list_conditions(&self) -> RepoResult<Vec<Condition>>;
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
}

pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_condition(&self, condition: &Condition) -> RepoResult<ConditionId> {
        self.conn.execute(
            "INSERT INTO conditions (
                id, key, source_id, relation, target_text, target_option_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                condition.id.to_string(),
                condition.key.as_str(),
                condition.source_id.to_string(),
                condition.relation.as_str(),
                condition.target_text.as_deref(),
                condition.target_option_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(condition.id)
    }

    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO tasks (id, key, title_en, title_de, text_en, text_de)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                task.id.to_string(),
                task.key.as_str(),
                task.title.en.as_str(),
                task.title.de.as_str(),
                task.text.en.as_str(),
                task.text.de.as_str(),
            ],
        )?;
        for condition_id in &task.condition_ids {
            tx.execute(
                "INSERT INTO task_conditions (task_id, condition_id) VALUES (?1, ?2);",
                params![task.id.to_string(), condition_id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(task.id)
    }

    fn list_conditions(&self) -> RepoResult<Vec<Condition>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, key, source_id, relation, target_text, target_option_id
             FROM conditions
             ORDER BY key ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut conditions = Vec::new();
        while let Some(row) = rows.next()? {
            conditions.push(parse_condition_row(row)?);
        }
        Ok(conditions)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut links: HashMap<TaskId, Vec<ConditionId>> = HashMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT task_id, condition_id FROM task_conditions ORDER BY rowid ASC;",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let task_text: String = row.get(0)?;
                let condition_text: String = row.get(1)?;
                links
                    .entry(parse_uuid(&task_text, "task_conditions.task_id")?)
                    .or_default()
                    .push(parse_uuid(&condition_text, "task_conditions.condition_id")?);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, key, title_en, title_de, text_en, text_de
             FROM tasks
             ORDER BY key ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let id = parse_uuid(&id_text, "tasks.id")?;
            tasks.push(Task {
                id,
                key: row.get("key")?,
                title: LocalizedText::new(
                    row.get::<_, String>("title_en")?,
                    row.get::<_, String>("title_de")?,
                ),
                text: LocalizedText::new(
                    row.get::<_, String>("text_en")?,
                    row.get::<_, String>("text_de")?,
                ),
                condition_ids: links.remove(&id).unwrap_or_default(),
            });
        }
        Ok(tasks)
    }
}

fn parse_condition_row(row: &Row<'_>) -> RepoResult<Condition> {
    let id_text: String = row.get("id")?;
    let source_text: String = row.get("source_id")?;
    let relation_text: String = row.get("relation")?;
    let relation = Relation::parse(&relation_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid relation `{relation_text}` in conditions.relation"
        ))
    })?;

    Ok(Condition {
        id: parse_uuid(&id_text, "conditions.id")?,
        key: row.get("key")?,
        source_id: parse_uuid(&source_text, "conditions.source_id")?,
        relation,
        target_text: row.get("target_text")?,
        target_option_id: parse_optional_uuid(
            row.get("target_option_id")?,
            "conditions.target_option_id",
        )?,
    })
}
