use std::path::PathBuf;

use clap::Parser;

/// Task tracker server: JSON-file backed REST API plus the browser front-end.
#[derive(Debug, Clone, Parser)]
#[command(name = "todo-server", version, about)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "TODO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "TODO_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding tasks.json and projects.json
    #[arg(short, long, env = "TODO_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory holding index.html, style.css and script.js
    #[arg(short, long, env = "TODO_WEB_ROOT", default_value = "web")]
    pub web_root: PathBuf,

    /// Request handling threads
    #[arg(long, env = "TODO_WORKERS", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Emit logs as JSON lines
    #[arg(long, env = "TODO_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
