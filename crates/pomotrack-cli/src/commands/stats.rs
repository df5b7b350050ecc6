use std::sync::Arc;

use clap::Subcommand;
use pomotrack_core::Notifier;

use super::{open_manager, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Time spent per task and the pomodoro total
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: StatsAction) -> CliResult {
    let manager = open_manager(Arc::new(Notifier::new()))?;
    let snapshot = manager.task_stats().await?;
    manager.shutdown().await?;

    match action {
        StatsAction::Show { json: true } => print_json(&snapshot)?,
        StatsAction::Show { json: false } => {
            let mut names: Vec<_> = snapshot.task_stats.keys().collect();
            names.sort();
            for name in names {
                let stats = &snapshot.task_stats[name];
                println!(
                    "{:<30}  {}  ({} sessions)",
                    name,
                    stats.formatted_time_spent(),
                    stats.sessions
                );
            }
            println!("Total pomodoros: {}", snapshot.total_pomodoros);
        }
    }
    Ok(())
}
