//! Ordered task collection.
//!
//! The registry only stores and orders tasks. Legality of lifecycle
//! transitions is decided by the session scheduler, which owns the registry.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::{Priority, SortCriterion, Task, TaskFilter, TaskId};
use crate::error::InvalidOperation;

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    next_id: u64,
    /// Bumped by every call that can change a task or the list order.
    revision: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from persisted tasks.
    ///
    /// Timers do not survive a restart, so any `in_progress` flag is cleared.
    /// At most one incomplete task keeps its paused remainder. If stored ids
    /// repeat or leave no room for another id, every task is renumbered in
    /// list order.
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        let mut paused_seen = false;
        for task in tasks.iter_mut() {
            if task.in_progress {
                tracing::debug!(task = %task.name, "clearing stale in-progress flag");
                task.in_progress = false;
            }
            if task.paused_remaining.is_some() {
                if task.completed || paused_seen {
                    tracing::warn!(task = %task.name, "dropping extra paused session");
                    task.paused_remaining = None;
                } else {
                    paused_seen = true;
                }
            }
        }

        let mut seen = HashSet::new();
        let unique = tasks.iter().all(|t| seen.insert(t.id));
        let next_id = match tasks.iter().map(|t| t.id.0).max() {
            None => Some(0),
            Some(max) => max.checked_add(1),
        };
        let next_id = match next_id {
            Some(next_id) if unique => next_id,
            _ => {
                tracing::warn!(tasks = tasks.len(), "stored task ids are unusable, renumbering");
                for (n, task) in (0u64..).zip(tasks.iter_mut()) {
                    task.id = TaskId(n);
                }
                tasks.len() as u64
            }
        };

        Self {
            tasks,
            next_id,
            revision: 0,
        }
    }

    /// Changes whenever the task list may have been modified.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The task holding a paused session, with its remaining seconds.
    pub fn paused(&self) -> Option<(TaskId, u64)> {
        self.tasks
            .iter()
            .find_map(|t| t.paused_remaining.map(|remaining| (t.id, remaining)))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a new task. Its index is the list size before insertion.
    pub fn add(&mut self, name: impl Into<String>, priority: Priority) -> Task {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.revision += 1;
        let task = Task::new(id, self.tasks.len(), name, priority);
        self.tasks.push(task.clone());
        task
    }

    pub fn all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Stable sort; completed tasks always go after incomplete ones.
    pub fn sort(&mut self, criterion: SortCriterion) {
        self.revision += 1;
        self.tasks.sort_by(|a, b| sort_order(a, b, criterion));
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Task at the given list position.
    pub fn by_index(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.revision += 1;
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn require(&self, id: TaskId) -> Result<&Task, InvalidOperation> {
        self.get(id).ok_or(InvalidOperation::UnknownTask(id))
    }

    pub fn require_mut(&mut self, id: TaskId) -> Result<&mut Task, InvalidOperation> {
        self.get_mut(id).ok_or(InvalidOperation::UnknownTask(id))
    }

    /// Rename and reprioritise in place. Progress flags are untouched.
    pub fn update(
        &mut self,
        id: TaskId,
        name: impl Into<String>,
        priority: Priority,
    ) -> Result<Task, InvalidOperation> {
        let task = self.require_mut(id)?;
        task.name = name.into();
        task.priority = priority;
        Ok(task.clone())
    }

    /// Remove a task unless it is in progress or is `active`.
    pub fn delete(&mut self, id: TaskId, active: Option<TaskId>) -> Result<Task, InvalidOperation> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(InvalidOperation::UnknownTask(id))?;
        let task = &self.tasks[pos];
        if task.in_progress {
            return Err(InvalidOperation::DeleteInProgress {
                name: task.name.clone(),
            });
        }
        if active == Some(id) {
            return Err(InvalidOperation::DeleteActive {
                name: task.name.clone(),
            });
        }
        self.revision += 1;
        Ok(self.tasks.remove(pos))
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.in_progress)
    }
}

fn sort_order(a: &Task, b: &Task, criterion: SortCriterion) -> Ordering {
    a.completed.cmp(&b.completed).then_with(|| match criterion {
        SortCriterion::ByName => a.name.cmp(&b.name),
        SortCriterion::ByPriority => a.priority.cmp(&b.priority),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry_with(names: &[(&str, Priority, bool)]) -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        for (name, priority, completed) in names {
            let id = reg.add(*name, *priority).id;
            reg.get_mut(id).unwrap().completed = *completed;
        }
        reg
    }

    #[test]
    fn add_assigns_index_from_current_size() {
        let mut reg = TaskRegistry::new();
        let a = reg.add("a", Priority::High);
        let b = reg.add("b", Priority::Low);
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_ne!(a.id, b.id);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn index_after_delete_is_current_size() {
        let mut reg = TaskRegistry::new();
        let a = reg.add("a", Priority::High);
        reg.add("b", Priority::High);
        reg.delete(a.id, None).unwrap();
        let c = reg.add("c", Priority::High);
        assert_eq!(c.index, 1);
    }

    #[test]
    fn all_returns_a_copy() {
        let mut reg = TaskRegistry::new();
        reg.add("a", Priority::High);
        let mut snapshot = reg.all();
        snapshot[0].name = "changed".into();
        assert_eq!(reg.all()[0].name, "a");
    }

    #[test]
    fn sort_by_priority_keeps_completed_last() {
        let mut reg = registry_with(&[
            ("done-high", Priority::High, true),
            ("low", Priority::Low, false),
            ("high", Priority::High, false),
            ("medium", Priority::Medium, false),
        ]);
        reg.sort(SortCriterion::ByPriority);
        let names: Vec<_> = reg.all().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["high", "medium", "low", "done-high"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut reg = registry_with(&[
            ("first", Priority::Medium, false),
            ("second", Priority::Medium, false),
            ("third", Priority::Medium, false),
        ]);
        reg.sort(SortCriterion::ByPriority);
        let names: Vec<_> = reg.all().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn find_by_name_returns_first_match() {
        let mut reg = TaskRegistry::new();
        let first = reg.add("dup", Priority::High);
        reg.add("dup", Priority::Low);
        assert_eq!(reg.find_by_name("dup").unwrap().id, first.id);
        assert!(reg.find_by_name("missing").is_none());
    }

    #[test]
    fn update_keeps_progress_flags() {
        let mut reg = TaskRegistry::new();
        let id = reg.add("old", Priority::Low).id;
        reg.get_mut(id).unwrap().completed = true;
        let updated = reg.update(id, "new", Priority::High).unwrap();
        assert_eq!(updated.name, "new");
        assert_eq!(updated.priority, Priority::High);
        assert!(updated.completed);
    }

    #[test]
    fn delete_rejects_in_progress_and_active() {
        let mut reg = TaskRegistry::new();
        let running = reg.add("running", Priority::High).id;
        reg.get_mut(running).unwrap().in_progress = true;
        let paused = reg.add("paused", Priority::High).id;

        assert!(matches!(
            reg.delete(running, Some(running)),
            Err(InvalidOperation::DeleteInProgress { .. })
        ));
        assert!(matches!(
            reg.delete(paused, Some(paused)),
            Err(InvalidOperation::DeleteActive { .. })
        ));
        assert_eq!(reg.len(), 2);
        assert!(matches!(
            reg.delete(TaskId(99), None),
            Err(InvalidOperation::UnknownTask(TaskId(99)))
        ));
    }

    #[test]
    fn from_tasks_clears_in_progress_and_continues_ids() {
        let mut running = Task::new(TaskId(4), 0, "running", Priority::High);
        running.in_progress = true;
        let mut reg = TaskRegistry::from_tasks(vec![running]);
        assert_eq!(reg.in_progress().count(), 0);
        assert_eq!(reg.add("next", Priority::Low).id, TaskId(5));
    }

    #[test]
    fn from_tasks_renumbers_when_max_id_leaves_no_room() {
        let tasks = vec![
            Task::new(TaskId(3), 0, "keep", Priority::High),
            Task::new(TaskId(u64::MAX), 1, "last", Priority::Low),
        ];
        let mut reg = TaskRegistry::from_tasks(tasks);
        let ids: Vec<_> = reg.all().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TaskId(0), TaskId(1)]);
        assert_eq!(reg.find_by_name("last").unwrap().id, TaskId(1));
        assert_eq!(reg.add("new", Priority::Medium).id, TaskId(2));
    }

    #[test]
    fn from_tasks_renumbers_duplicate_ids() {
        let tasks = vec![
            Task::new(TaskId(5), 0, "a", Priority::High),
            Task::new(TaskId(5), 1, "b", Priority::High),
            Task::new(TaskId(9), 2, "c", Priority::High),
        ];
        let mut reg = TaskRegistry::from_tasks(tasks);
        let mut ids: Vec<_> = reg.all().into_iter().map(|t| t.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        let added = reg.add("d", Priority::Low).id;
        assert!(reg.all().iter().filter(|t| t.id == added).count() == 1);
    }

    #[test]
    fn from_tasks_keeps_unique_ids() {
        let tasks = vec![
            Task::new(TaskId(7), 0, "a", Priority::High),
            Task::new(TaskId(2), 1, "b", Priority::High),
        ];
        let mut reg = TaskRegistry::from_tasks(tasks);
        assert!(reg.get(TaskId(7)).is_some());
        assert_eq!(reg.add("c", Priority::Low).id, TaskId(8));
    }

    #[test]
    fn from_tasks_keeps_one_paused_session() {
        let mut done = Task::new(TaskId(0), 0, "done", Priority::High);
        done.completed = true;
        done.paused_remaining = Some(30);
        let mut first = Task::new(TaskId(1), 1, "first", Priority::High);
        first.paused_remaining = Some(600);
        let mut second = Task::new(TaskId(2), 2, "second", Priority::High);
        second.paused_remaining = Some(90);

        let reg = TaskRegistry::from_tasks(vec![done, first, second]);
        assert_eq!(reg.paused(), Some((TaskId(1), 600)));
        assert_eq!(reg.get(TaskId(2)).unwrap().paused_remaining, None);
        assert_eq!(reg.get(TaskId(0)).unwrap().paused_remaining, None);
    }

    #[test]
    fn revision_moves_on_mutation_only() {
        let mut reg = TaskRegistry::new();
        let start = reg.revision();
        let _ = reg.all();
        let _ = reg.filtered(TaskFilter::Active);
        let _ = reg.find_by_name("x");
        assert_eq!(reg.revision(), start);

        let id = reg.add("a", Priority::High).id;
        let after_add = reg.revision();
        assert_ne!(after_add, start);
        reg.update(id, "b", Priority::Low).unwrap();
        assert_ne!(reg.revision(), after_add);
    }

    fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::High),
            Just(Priority::Medium),
            Just(Priority::Low)
        ]
    }

    fn arb_tasks() -> impl Strategy<Value = Vec<(String, Priority, bool)>> {
        prop::collection::vec(("[a-e]{0,3}", arb_priority(), any::<bool>()), 0..24)
    }

    fn build(tasks: &[(String, Priority, bool)]) -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        for (name, priority, completed) in tasks {
            let id = reg.add(name.clone(), *priority).id;
            reg.get_mut(id).unwrap().completed = *completed;
        }
        reg
    }

    proptest! {
        #[test]
        fn filters_partition_the_task_list(tasks in arb_tasks()) {
            let reg = build(&tasks);
            let all = reg.filtered(TaskFilter::All).len();
            let active = reg.filtered(TaskFilter::Active).len();
            let completed = reg.filtered(TaskFilter::Completed).len();
            prop_assert_eq!(all, active + completed);
            prop_assert_eq!(all, tasks.len());
        }

        #[test]
        fn sort_places_completed_after_incomplete(
            tasks in arb_tasks(),
            by_name in any::<bool>(),
        ) {
            let criterion = if by_name { SortCriterion::ByName } else { SortCriterion::ByPriority };
            let mut reg = build(&tasks);
            reg.sort(criterion);
            let sorted = reg.all();
            prop_assert_eq!(sorted.len(), tasks.len());
            for pair in sorted.windows(2) {
                prop_assert!(sort_order(&pair[0], &pair[1], criterion) != Ordering::Greater);
                prop_assert!(!(pair[0].completed && !pair[1].completed));
            }
        }
    }
}
