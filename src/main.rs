use std::path::PathBuf;

use anyhow::{Context, Result};
use cartpole_driver::{Driver, DriverConfig, PoleVelocityController, RenderMode, build_env};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Balances a cart-pole with the pole-velocity rule until interrupted.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON driver configuration. Built-in defaults are used when omitted.
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Seed for the environment's reset noise and action sampler.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// How each step is rendered.
    #[arg(long, value_enum, value_name = "MODE")]
    render_mode: Option<RenderArg>,
    /// Stop after this many finished episodes.
    #[arg(long, value_name = "N")]
    max_episodes: Option<u64>,
    /// Stop after this many steps in total.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RenderArg {
    Human,
    Ansi,
    None,
}

impl From<RenderArg> for RenderMode {
    fn from(arg: RenderArg) -> Self {
        match arg {
            RenderArg::Human => RenderMode::Human,
            RenderArg::Ansi => RenderMode::Ansi,
            RenderArg::None => RenderMode::None,
        }
    }
}

impl Args {
    /// Loads the config file, if any, and applies the command-line overrides on top.
    fn load_config(&self) -> Result<DriverConfig> {
        let cfg = match &self.config {
            Some(path) => DriverConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => DriverConfig::default(),
        };
        let cfg = self.merge_config(cfg);
        cfg.validate().context("validating config")?;
        Ok(cfg)
    }

    fn merge_config(&self, mut cfg: DriverConfig) -> DriverConfig {
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(mode) = self.render_mode {
            cfg.render_mode = mode.into();
        }
        if let Some(max) = self.max_episodes {
            cfg.max_episodes = Some(max);
        }
        if let Some(max) = self.max_steps {
            cfg.max_steps = Some(max);
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Frames go to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = args.load_config()?;
    let env = build_env(&cfg).context("creating cart-pole environment")?;
    let mut driver = Driver::with_config(env, PoleVelocityController, &cfg);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
            Err(e) => {
                tracing::error!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    let summary = driver.run(shutdown).await?;
    tracing::info!("run summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}
