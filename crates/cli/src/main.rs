//! Thermal Load Predictor CLI
//!
//! A command-line client for requesting predictions, browsing history
//! and reading insights from the thermal load prediction server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{insights, predictions};

/// Thermal Load Predictor CLI
#[derive(Parser)]
#[command(name = "thermo")]
#[command(author, version, about = "CLI for the Thermal Load Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via THERMO_API_URL env var)
    #[arg(long, env = "THERMO_API_URL")]
    pub api_url: Option<String>,

    /// User id sent with every request (can also be set via THERMO_USER env var)
    #[arg(long, short, env = "THERMO_USER")]
    pub user: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BaselineArg {
    /// Historical feature averages
    Average,
    /// Most recent prediction
    Latest,
}

impl BaselineArg {
    fn as_str(self) -> &'static str {
        match self {
            BaselineArg::Average => "average",
            BaselineArg::Latest => "latest",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict heating and cooling load for a building
    Predict {
        /// Eight feature values in schema order
        #[arg(allow_negative_numbers = true)]
        values: Vec<f64>,

        /// Feature as name=value (repeatable)
        #[arg(long = "feature", short = 'F')]
        features: Vec<String>,
    },

    /// List your predictions, newest first
    History,

    /// Show one prediction
    Show {
        /// Prediction ID
        id: u64,
    },

    /// Delete one prediction
    Delete {
        /// Prediction ID
        id: u64,
    },

    /// Show summary statistics over your predictions
    Dashboard,

    /// Show automatic and predictive insights
    Insights {
        /// Baseline for what-if scenarios
        #[arg(long, value_enum, default_value = "average")]
        baseline: BaselineArg,
    },

    /// Vary one feature and predict at each step
    Sweep {
        /// Feature to vary
        feature: String,

        /// First value
        #[arg(long, allow_negative_numbers = true)]
        start: f64,

        /// Last value (inclusive)
        #[arg(long, allow_negative_numbers = true)]
        end: f64,

        /// Increment between values
        #[arg(long)]
        step: f64,

        /// Values held fixed for the other features
        #[arg(long, value_enum, default_value = "average")]
        baseline: BaselineArg,
    },

    /// Show the feature schema expected by the model
    Schema,

    /// Save default API URL, user and output format
    Config {
        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        format: Option<output::OutputFormat>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let saved = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| saved.default_format.as_deref().and_then(output::OutputFormat::parse))
        .unwrap_or_default();
    let connect = || -> Result<client::ApiClient> {
        let api_url = saved.resolve_api_url(cli.api_url.clone());
        let user = saved.resolve_user(cli.user.clone())?;
        client::ApiClient::new(&api_url, &user)
    };

    match cli.command {
        Commands::Predict { values, features } => {
            let features = predictions::parse_features(values, &features)?;
            predictions::predict(&connect()?, features, format).await?;
        }
        Commands::History => predictions::history(&connect()?, format).await?,
        Commands::Show { id } => predictions::show(&connect()?, id, format).await?,
        Commands::Delete { id } => predictions::delete(&connect()?, id).await?,
        Commands::Dashboard => insights::dashboard(&connect()?, format).await?,
        Commands::Insights { baseline } => {
            insights::insights(&connect()?, baseline.as_str(), format).await?;
        }
        Commands::Sweep {
            feature,
            start,
            end,
            step,
            baseline,
        } => {
            let request = client::SweepRequest {
                feature,
                start,
                end,
                step,
                baseline: baseline.as_str().to_string(),
            };
            insights::sweep(&connect()?, request, format).await?;
        }
        Commands::Schema => predictions::schema(&connect()?, format).await?,
        Commands::Config {
            api_url,
            user,
            format,
        } => {
            let updated = config::Config {
                api_url: api_url.or_else(|| saved.api_url.clone()),
                user: user.or_else(|| saved.user.clone()),
                default_format: format
                    .and_then(|f| f.to_possible_value())
                    .map(|v| v.get_name().to_string())
                    .or_else(|| saved.default_format.clone()),
            };
            let path = updated.save()?;
            output::print_success(&format!("Configuration saved to {}", path.display()));
        }
    }

    Ok(())
}
