//! Theme command handler.
//!
//! Reads and writes the same preference file the frontend uses through
//! the HTTP API.

use crate::commands::print_json;
use clap::{Args, Subcommand};
use ragchat_core::{config::AppConfig, AppResult, PreferenceStore, Theme};
use serde_json::json;

/// Show or change the frontend theme
#[derive(Args, Debug)]
pub struct ThemeCommand {
    #[command(subcommand)]
    pub action: Option<ThemeAction>,

    /// Treat the system color scheme as dark when no theme is stored
    #[arg(long, global = true)]
    pub system_dark: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ThemeAction {
    /// Print the effective theme (default)
    Show,
    /// Switch between light and dark
    Toggle,
    /// Store an explicit theme
    Set {
        /// light or dark
        theme: Theme,
    },
}

impl ThemeCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut store = PreferenceStore::open(config.preferences_path())?;

        let theme = match self.action.as_ref().unwrap_or(&ThemeAction::Show) {
            ThemeAction::Show => store.load_theme(self.system_dark),
            ThemeAction::Toggle => store.toggle_theme(self.system_dark)?,
            ThemeAction::Set { theme } => {
                store.set_theme(*theme)?;
                *theme
            }
        };
        let stored = store.stored_theme().is_some();
        tracing::debug!("Theme: {} (stored: {})", theme, stored);

        if self.json {
            print_json(&json!({ "theme": theme, "stored": stored }))?;
        } else {
            println!("{}", theme);
        }

        Ok(())
    }
}
