/// Cadence CLI - simulated listening sessions
use cadence_cli::{simulation, CliConfig, SimulationOptions};
use cadence_session::{LoopMode, Tier};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence-cli")]
#[command(about = "Run simulated Cadence playback sessions", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./cadence.toml when present)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a synthetic queue through a simulated media resource
    Simulate {
        /// Subscription tier of the simulated listener
        #[arg(long, value_enum, default_value_t = TierArg::Free)]
        tier: TierArg,

        /// Number of tracks to queue
        #[arg(long, default_value_t = 5)]
        tracks: usize,

        /// Length of each track in seconds
        #[arg(long, default_value_t = 30.0)]
        track_seconds: f64,

        /// Simulated seconds per real second
        #[arg(long, default_value_t = 10.0)]
        speed: f64,

        /// Loop mode (overrides the configuration)
        #[arg(long, value_enum)]
        loop_mode: Option<LoopModeArg>,

        /// Skips to attempt right after playback starts
        #[arg(long, default_value_t = 0)]
        skips: u32,

        /// Stop after this many real seconds
        #[arg(long)]
        max_seconds: Option<u64>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Free,
    Premium,
}

impl From<TierArg> for Tier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Free => Tier::Free,
            TierArg::Premium => Tier::Premium,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LoopModeArg {
    None,
    All,
    One,
}

impl From<LoopModeArg> for LoopMode {
    fn from(mode: LoopModeArg) -> Self {
        match mode {
            LoopModeArg::None => LoopMode::None,
            LoopModeArg::All => LoopMode::All,
            LoopModeArg::One => LoopMode::One,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_cli=info,cadence_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            tier,
            tracks,
            track_seconds,
            speed,
            loop_mode,
            skips,
            max_seconds,
        } => {
            let options = SimulationOptions {
                tier: tier.into(),
                tracks,
                track_seconds,
                speed,
                loop_mode: loop_mode.map(Into::into),
                skips,
                max_duration: max_seconds.map(Duration::from_secs),
            };
            simulate(&config, &options).await?;
        }
        Commands::Config => {
            config.validate()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn simulate(config: &CliConfig, options: &SimulationOptions) -> anyhow::Result<()> {
    let report = simulation::run(config, options).await?;

    println!("Tracks finished: {}", report.tracks_finished);
    println!("Skips taken:     {}", report.skips_taken);
    println!("Skips blocked:   {}", report.skips_blocked);
    println!("Errors:          {}", report.errors);
    println!("Final status:    {:?}", report.final_state.status);
    if let Some(remaining) = report.final_state.skips_remaining {
        println!("Skips remaining: {}", remaining);
    }
    if report.timed_out {
        println!("Stopped at the time limit");
    }

    Ok(())
}
