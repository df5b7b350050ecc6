//! Task management commands for CLI.

use std::sync::Arc;

use clap::Subcommand;
use pomotrack_core::{Notifier, Priority, SessionManager, SortCriterion, Task, TaskFilter};

use super::{open_manager, print_json, resolve_task, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// high, medium, low (or 1, 2, 3)
        #[arg(long, default_value = "medium")]
        priority: Priority,
    },
    /// List tasks
    List {
        /// all, active or completed
        #[arg(long, default_value = "all")]
        filter: TaskFilter,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a task or change its priority
    Update {
        /// Task id or name
        task: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New priority
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Delete a task
    Delete {
        /// Task id or name
        task: String,
    },
    /// Reorder the stored list
    Sort {
        /// name or priority
        by: SortCriterion,
    },
    /// Clear a task's progress and completion
    Reset {
        /// Task id or name
        task: String,
    },
    /// Mark a task completed and record its planned time
    Complete {
        /// Task id or name
        task: String,
    },
}

pub async fn run(action: TaskAction) -> CliResult {
    let manager = open_manager(Arc::new(Notifier::new()))?;
    let result = apply(&manager, action).await;
    // Shutdown saves, so a failed command still leaves the files consistent.
    manager.shutdown().await?;
    result
}

async fn apply(manager: &SessionManager, action: TaskAction) -> CliResult {
    match action {
        TaskAction::Add { name, priority } => {
            let task = manager.add_task(name, priority).await?;
            println!("Task added: {}", task.id);
        }
        TaskAction::List { filter, json } => {
            let tasks = manager.filtered_tasks(filter).await?;
            if json {
                print_json(&tasks)?;
            } else {
                print_table(&tasks);
            }
        }
        TaskAction::Update {
            task,
            name,
            priority,
        } => {
            let current = resolve_task(manager, &task).await?;
            let name = name.unwrap_or_else(|| current.name.clone());
            let priority = priority.unwrap_or(current.priority);
            let updated = manager.update_task(current.id, name, priority).await?;
            print_json(&updated)?;
        }
        TaskAction::Delete { task } => {
            let current = resolve_task(manager, &task).await?;
            let deleted = manager.delete_task(current.id).await?;
            println!("Task deleted: {}", deleted.name);
        }
        TaskAction::Sort { by } => {
            manager.sort_tasks(by).await?;
            print_table(&manager.all_tasks().await?);
        }
        TaskAction::Reset { task } => {
            let current = resolve_task(manager, &task).await?;
            let reset = manager.reset_task(current.id).await?;
            println!("Task reset: {}", reset.name);
        }
        TaskAction::Complete { task } => {
            let current = resolve_task(manager, &task).await?;
            let done = manager.complete_task(current.id).await?;
            println!("Task completed: {}", done.name);
        }
    }
    Ok(())
}

fn print_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    println!("{:>4}  {:<8}  {:<12}  NAME", "ID", "PRIORITY", "STATUS");
    for task in tasks {
        println!(
            "{:>4}  {:<8}  {:<12}  {}",
            task.id,
            task.priority,
            task.status(),
            task.name
        );
    }
}
