use clap::Subcommand;
use pomotrack_core::{FileStore, PersistenceGateway, Settings, ValidationError};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting (e.g. "work_interval")
    Get {
        /// Setting key
        key: String,
    },
    /// Set a setting
    Set {
        /// Setting key
        key: String,
        /// New value, in seconds or a count
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    let store = FileStore::open()?;

    match action {
        ConfigAction::Get { key } => {
            let settings = store.load_settings()?;
            let value = settings
                .get(&key)
                .ok_or(ValidationError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let settings = store.load_settings()?.with_value(&key, &value)?;
            store.save_settings(&settings)?;
            println!("ok");
        }
        ConfigAction::List => print_json(&store.load_settings()?)?,
        ConfigAction::Reset => {
            store.save_settings(&Settings::default())?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
