//! Project and snapshot repository.
//!
//! # Invariants
//! - A snapshot copies every live value of its project at creation time and
//!   is never written afterwards.
//! - Snapshots list newest first.

use crate::model::catalog::CatalogId;
use crate::model::value::{Project, ProjectId, Snapshot, SnapshotId};
use crate::repo::{ensure_connection_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Assigns or clears the project's catalog.
    fn set_catalog(&self, id: ProjectId, catalog_id: Option<CatalogId>) -> RepoResult<()>;
    /// Freezes the current live values into a new snapshot.
    fn create_snapshot(&self, project_id: ProjectId, title: &str) -> RepoResult<Snapshot>;
    fn get_snapshot(&self, id: SnapshotId) -> RepoResult<Option<Snapshot>>;
    fn list_snapshots(&self, project_id: ProjectId) -> RepoResult<Vec<Snapshot>>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        self.conn.execute(
            "INSERT INTO projects (id, title, catalog_id) VALUES (?1, ?2, ?3);",
            params![
                project.id.to_string(),
                project.title.as_str(),
                project.catalog_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let row = self
            .conn
            .query_row(
                "SELECT title, catalog_id FROM projects WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        row.map(|(title, catalog_id)| {
            Ok(Project {
                id,
                title,
                catalog_id: parse_optional_uuid(catalog_id, "projects.catalog_id")?,
            })
        })
        .transpose()
    }

    fn set_catalog(&self, id: ProjectId, catalog_id: Option<CatalogId>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET catalog_id = ?2 WHERE id = ?1;",
            params![id.to_string(), catalog_id.map(|value| value.to_string())],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }
        Ok(())
    }

    fn create_snapshot(&self, project_id: ProjectId, title: &str) -> RepoResult<Snapshot> {
        if self.get_project(project_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project_id,
            });
        }

        let snapshot_id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO snapshots (id, project_id, title, created_at)
             VALUES (?1, ?2, ?3, (strftime('%s', 'now') * 1000));",
            params![snapshot_id.to_string(), project_id.to_string(), title],
        )?;

        let live_ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM project_values
                 WHERE project_id = ?1 AND snapshot_id IS NULL
                 ORDER BY rowid ASC;",
            )?;
            let ids = stmt
                .query_map([project_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        for live_id in &live_ids {
            tx.execute(
                "INSERT INTO project_values (
                    id, project_id, snapshot_id, attribute_id, set_index, collection_index,
                    payload_kind, text, option_id, amount, unit, file_name
                 )
                 SELECT
                    ?1, project_id, ?2, attribute_id, set_index, collection_index,
                    payload_kind, text, option_id, amount, unit, file_name
                 FROM project_values
                 WHERE id = ?3;",
                params![
                    Uuid::new_v4().to_string(),
                    snapshot_id.to_string(),
                    live_id
                ],
            )?;
        }
        tx.commit()?;

        info!(
            "event=snapshot_create module=repo status=ok values={}",
            live_ids.len()
        );
        self.get_snapshot(snapshot_id)?.ok_or(RepoError::NotFound {
            entity: "snapshot",
            id: snapshot_id,
        })
    }

    fn get_snapshot(&self, id: SnapshotId) -> RepoResult<Option<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, created_at FROM snapshots WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_snapshot_row(row)?));
        }
        Ok(None)
    }

    fn list_snapshots(&self, project_id: ProjectId) -> RepoResult<Vec<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, created_at
             FROM snapshots
             WHERE project_id = ?1
             ORDER BY created_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut snapshots = Vec::new();
        while let Some(row) = rows.next()? {
            snapshots.push(parse_snapshot_row(row)?);
        }
        Ok(snapshots)
    }
}

fn parse_snapshot_row(row: &Row<'_>) -> RepoResult<Snapshot> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    Ok(Snapshot {
        id: parse_uuid(&id_text, "snapshots.id")?,
        project_id: parse_uuid(&project_text, "snapshots.project_id")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
    })
}
