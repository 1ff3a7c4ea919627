//! Answers report use-case service.
//!
//! # Responsibility
//! - Load project, catalog, options, domain and values in bulk for one
//!   value scope.
//! - Hand the loaded data to the pure answers assembly and export layers.
//!
//! # Invariants
//! - Storage is read once per call; assembly never touches repositories.
//! - A snapshot must belong to the requested project.
//! - A project without a (loadable) catalog yields an empty tree.

use crate::answers::{
    assemble, flatten_rows, write_csv, AnswerError, AnswerFormatter, AnswersTree, CsvDelimiter,
    ValueIndex,
};
use crate::model::locale::Locale;
use crate::model::value::{ProjectId, SnapshotId};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::domain_repo::DomainRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::value_repo::ValueRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::time::Instant;

/// Errors from answers service operations.
#[derive(Debug)]
pub enum AnswersServiceError {
    /// Project does not exist.
    ProjectNotFound(ProjectId),
    /// Snapshot does not exist or belongs to another project.
    SnapshotNotFound(SnapshotId),
    /// Stored values cannot be rendered.
    Answer(AnswerError),
    /// Repository-level failure.
    Repo(RepoError),
    /// Export sink failure.
    Io(io::Error),
}

impl Display for AnswersServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::SnapshotNotFound(id) => write!(f, "snapshot not found: {id}"),
            Self::Answer(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "export write failed: {err}"),
        }
    }
}

impl Error for AnswersServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Answer(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AnswerError> for AnswersServiceError {
    fn from(value: AnswerError) -> Self {
        Self::Answer(value)
    }
}

impl From<RepoError> for AnswersServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<io::Error> for AnswersServiceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Answers report facade over the four read repositories.
pub struct AnswersService<P, C, D, V>
where
    P: ProjectRepository,
    C: CatalogRepository,
    D: DomainRepository,
    V: ValueRepository,
{
    projects: P,
    catalogs: C,
    domain: D,
    values: V,
}

impl<P, C, D, V> AnswersService<P, C, D, V>
where
    P: ProjectRepository,
    C: CatalogRepository,
    D: DomainRepository,
    V: ValueRepository,
{
    pub fn new(projects: P, catalogs: C, domain: D, values: V) -> Self {
        Self {
            projects,
            catalogs,
            domain,
            values,
        }
    }

    /// Builds the answers tree of a project's live values or one snapshot.
    pub fn answers_tree(
        &self,
        project_id: ProjectId,
        snapshot_id: Option<SnapshotId>,
        locale: Locale,
    ) -> Result<AnswersTree, AnswersServiceError> {
        let started_at = Instant::now();
        let project = self
            .projects
            .get_project(project_id)?
            .ok_or(AnswersServiceError::ProjectNotFound(project_id))?;

        if let Some(snapshot_id) = snapshot_id {
            let belongs = self
                .projects
                .get_snapshot(snapshot_id)?
                .is_some_and(|snapshot| snapshot.project_id == project_id);
            if !belongs {
                return Err(AnswersServiceError::SnapshotNotFound(snapshot_id));
            }
        }

        let values = self.values.list_values(project_id, snapshot_id)?;
        let domain = self.domain.load_domain()?;
        let catalog = match project.catalog_id {
            Some(catalog_id) => self.catalogs.load_catalog(catalog_id)?,
            None => None,
        };
        if catalog.is_none() {
            warn!(
                "event=answers_tree module=service status=no_catalog project={}",
                project_id
            );
        }

        // Values may still point at options of a catalog the project used before.
        let options = self.catalogs.load_options()?;
        let index = ValueIndex::build(&values, &domain);
        let formatter =
            AnswerFormatter::new(catalog.as_ref(), &domain, locale).with_options(&options);
        let tree = assemble(catalog.as_ref(), &index, &formatter)?;
        info!(
            "event=answers_tree module=service status=ok scope={} locale={} values={} attributes={} sections={} duration_ms={}",
            if snapshot_id.is_some() { "snapshot" } else { "live" },
            locale,
            values.len(),
            domain.len(),
            tree.sections.len(),
            started_at.elapsed().as_millis()
        );
        Ok(tree)
    }

    /// Writes the answers report as CSV; returns the number of rows.
    pub fn export_csv<W: Write>(
        &self,
        project_id: ProjectId,
        snapshot_id: Option<SnapshotId>,
        locale: Locale,
        delimiter: CsvDelimiter,
        writer: &mut W,
    ) -> Result<usize, AnswersServiceError> {
        let tree = self.answers_tree(project_id, snapshot_id, locale)?;
        let rows = flatten_rows(&tree);
        write_csv(&rows, delimiter, writer)?;
        info!(
            "event=answers_export module=service status=ok rows={} delimiter={:?}",
            rows.len(),
            delimiter
        );
        Ok(rows.len())
    }
}
