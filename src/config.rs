use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "articlebox", version, about = "Browse and edit articles from a REST backend")]
pub struct Config {
    /// Backend base URL.
    #[arg(long, env = "ARTICLEBOX_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "ARTICLEBOX_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    /// Articles per page in the list view.
    #[arg(long, env = "ARTICLEBOX_PAGE_SIZE", default_value_t = 6,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub page_size: u16,

    /// Log file. The TUI falls back to articlebox.log, subcommands to stderr.
    #[arg(long, env = "ARTICLEBOX_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one page of articles straight from the backend.
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print a single article.
    Show { id: String },
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_size(&self) -> usize {
        usize::from(self.page_size)
    }

    pub fn log_target(&self) -> Option<PathBuf> {
        match (&self.log_file, &self.command) {
            (Some(path), _) => Some(path.clone()),
            (None, None) => Some(PathBuf::from("articlebox.log")),
            (None, Some(_)) => None,
        }
    }
}
