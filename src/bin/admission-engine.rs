use anyhow::Context;
use clap::{Parser, Subcommand};

use admission_engine::{telemetry, AdmissionEngine, EngineConfig, RecommendationRequest};

#[derive(Parser)]
#[command(name = "admission-engine")]
#[command(about = "Admission feasibility estimates and tiered recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict percentile and rank, then tier matching programs
    Recommend {
        #[arg(long)]
        score: f64,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        program: Option<String>,
    },
    /// Train and publish a new model version
    Train,
    /// Year-over-year threshold trend for a program
    Trend {
        #[arg(long)]
        program: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Programs whose thresholds moved the most
    Rising {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    telemetry::init(&config.telemetry).context("failed to initialise telemetry")?;

    let engine = AdmissionEngine::open(&config).with_context(|| {
        format!(
            "failed to start engine from {} (models in {})",
            config.data_dir.display(),
            config.model_dir.display()
        )
    })?;

    match cli.command {
        Commands::Recommend {
            score,
            year,
            category,
            location,
            program,
        } => {
            let request = RecommendationRequest {
                score,
                target_year: year,
                category,
                location_text: location,
                program_filter: program,
            };
            let response = engine.recommend(request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Train => {
            let version = engine.train()?;
            println!("Published model version {version}.");
        }
        Commands::Trend { program, category } => {
            match engine.program_trend(&program, category.as_deref()) {
                Some(trend) => println!("{}", serde_json::to_string_pretty(&trend)?),
                None => println!("No threshold history for {program}."),
            }
        }
        Commands::Rising { category, top } => {
            let movements = engine.rising_programs(category.as_deref(), top);
            println!("{}", serde_json::to_string_pretty(&movements)?);
        }
    }

    Ok(())
}
