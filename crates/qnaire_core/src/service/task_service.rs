//! Task guidance use-case service.
//!
//! # Responsibility
//! - Evaluate stored conditions against one project value scope.
//! - Return the tasks whose conditions hold.

use crate::answers::ValueIndex;
use crate::conditions::{active_tasks, Task};
use crate::model::value::{ProjectId, SnapshotId};
use crate::repo::domain_repo::DomainRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::value_repo::ValueRepository;
use crate::repo::RepoResult;
use log::info;

/// Task activation facade.
pub struct TaskService<T: TaskRepository, D: DomainRepository, V: ValueRepository> {
    tasks: T,
    domain: D,
    values: V,
}

impl<T: TaskRepository, D: DomainRepository, V: ValueRepository> TaskService<T, D, V> {
    pub fn new(tasks: T, domain: D, values: V) -> Self {
        Self {
            tasks,
            domain,
            values,
        }
    }

    /// Lists active tasks for live values or one snapshot, ordered by key.
    pub fn active_tasks(
        &self,
        project_id: ProjectId,
        snapshot_id: Option<SnapshotId>,
    ) -> RepoResult<Vec<Task>> {
        let tasks = self.tasks.list_tasks()?;
        let conditions = self.tasks.list_conditions()?;
        let values = self.values.list_values(project_id, snapshot_id)?;
        let domain = self.domain.load_domain()?;
        let index = ValueIndex::build(&values, &domain);

        let active: Vec<Task> = active_tasks(&tasks, &conditions, &index)
            .into_iter()
            .cloned()
            .collect();
        info!(
            "event=tasks_resolve module=service status=ok tasks={} conditions={} active={}",
            tasks.len(),
            conditions.len(),
            active.len()
        );
        Ok(active)
    }
}
