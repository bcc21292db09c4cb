use anyhow::{anyhow, Context};
use clap::Parser;
use tiny_http::Server;
use tracing_subscriber::EnvFilter;

use todo_server::{server, Config, StaticAssets, TaskRepository};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.log_json)?;

    let repo = TaskRepository::open(&config.data_dir)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let assets = StaticAssets::new(&config.web_root);
    tracing::info!("Task storage in {}", config.data_dir.display());
    tracing::info!("Serving front-end from {}", assets.root().display());

    let server = Server::http(config.bind_addr())
        .map_err(|err| anyhow!("failed to bind {}: {}", config.bind_addr(), err))?;
    tracing::info!("Server running at http://localhost:{}", config.port);

    server::serve(&server, &repo, &assets, usize::from(config.workers));
    Ok(())
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|err| anyhow!("failed to initialize logging: {}", err))
}
