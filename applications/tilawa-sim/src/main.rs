/// Tilawa Sim - replay recitation sessions on a simulated clock
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tilawa_core::{RepeatRange, VerseKey};
use tilawa_sim::{load_timings, SimConfig, Simulation, TimedEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tilawa-sim")]
#[command(about = "Replay verse-by-verse recitation playback without audio", long_about = None)]
struct Cli {
    /// Verse timings JSON file
    #[arg(short, long, env = "TILAWA_TIMINGS")]
    timings: PathBuf,

    /// Configuration file path (defaults to ./tilawa.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play through the recitation
    Play {
        /// Verse to start from, e.g. 2:255
        #[arg(long)]
        from: Option<VerseKey>,
    },
    /// Repeat a verse or a range of verses
    Repeat {
        /// First verse of the range
        start: VerseKey,
        /// Last verse of the range (defaults to the first)
        end: Option<VerseKey>,
        /// Plays of each verse
        #[arg(long)]
        verses: Option<u32>,
        /// Cycles through the whole range
        #[arg(long)]
        ranges: Option<u32>,
        /// Silence between repetitions of a verse, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// List the verses in the timings file
    Inspect,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tilawa_sim=info,tilawa_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = SimConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let timings = load_timings(&cli.timings)?;
    tracing::info!(
        "Loaded {} verse timings from {}",
        timings.len(),
        cli.timings.display()
    );

    match cli.command {
        Commands::Play { from } => {
            let mut simulation = Simulation::new(&config, timings)?;
            simulation.play(from)?;
            print_events(&simulation.run()?)?;
        }
        Commands::Repeat {
            start,
            end,
            verses,
            ranges,
            delay_ms,
        } => {
            let range = RepeatRange::new(start, end.unwrap_or(start))?;
            let settings = config.repeat.settings(verses, ranges, delay_ms)?;
            let mut simulation = Simulation::new(&config, timings)?;
            simulation.repeat(range, settings)?;
            print_events(&simulation.run()?)?;
        }
        Commands::Inspect => {
            for timing in timings.iter() {
                println!(
                    "{}\t{}\t{}",
                    timing.verse_key, timing.timestamp_from, timing.timestamp_to
                );
            }
        }
    }

    Ok(())
}

/// Print events as JSON lines
fn print_events(events: &[TimedEvent]) -> anyhow::Result<()> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
