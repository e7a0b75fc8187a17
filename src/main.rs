//! Contagion scenario runner
//!
//! Loads a TOML scenario (or uses the built-in default), runs it once and
//! prints the history and statistics as JSON or a text summary.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use contagion::core::config::{load_scenario, ScenarioConfig};
use contagion::core::error::Result;
use contagion::engine::{simulate, SimulationOutput};

/// Epidemic spread on a contact network
#[derive(Parser, Debug)]
#[command(name = "contagion")]
#[command(about = "Run an SIR/SIS scenario on a generated contact network")]
struct Args {
    /// Scenario file (TOML); the built-in default scenario when omitted
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the step budget
    #[arg(long)]
    steps: Option<usize>,

    /// Write the output here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("contagion=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut scenario = match &args.config {
        Some(path) => load_scenario(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(seed) = args.seed {
        scenario.contagion.seed = seed;
    }
    if args.steps.is_some() {
        scenario.max_steps = args.steps;
    }

    let output = simulate(&scenario)?;

    let rendered = render(&output, &args.format);
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)?;
            tracing::info!("Output written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn render(output: &SimulationOutput, format: &str) -> String {
    match format {
        "json" => output.to_json(),
        "text" => output.summary(),
        other => {
            tracing::warn!("Unknown format '{}', defaulting to json", other);
            output.to_json()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_falls_back_to_json() {
        let output = simulate(&ScenarioConfig::default()).unwrap();

        let rendered = render(&output, "yaml");

        assert_eq!(rendered, output.to_json());
        assert_ne!(render(&output, "text"), rendered);
    }
}
