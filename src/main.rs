use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod batch;
mod client;
mod contract;
mod delta;
mod models;
mod report;
mod session;
mod stream;

use client::{ClientConfig, HttpAdvisor, DEFAULT_API_BASE};
use models::{EducationLevel, StudentInput};
use session::{Advisor, FlowError, NavState, ScenarioOverrides};
use stream::FallbackCatalog;

#[derive(Parser)]
#[command(name = "stream-advisor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stream, degree and college recommendations from a remote advisor engine", long_about = None)]
struct Cli {
    /// Base address of the recommendation service
    #[arg(long, env = "STREAM_ADVISOR_API", default_value = DEFAULT_API_BASE, global = true)]
    api_base: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Log request activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AssessmentArgs {
    /// Preferred study location
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, value_enum, default_value = "class_10")]
    education_level: EducationLevel,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    math: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    science: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    english: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    logical: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    creativity: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    scientific_interest: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    communication: u32,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    leadership: u32,
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(0..=10))]
    stress_level: u32,
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(0..=10))]
    risk_level: u32,
    /// Annual budget
    #[arg(long, default_value_t = 500_000)]
    budget: u64,
}

impl From<AssessmentArgs> for StudentInput {
    fn from(args: AssessmentArgs) -> Self {
        StudentInput {
            math: args.math,
            science: args.science,
            english: args.english,
            logical: args.logical,
            creativity: args.creativity,
            scientific_interest: args.scientific_interest,
            communication: args.communication,
            leadership: args.leadership,
            stress_level: args.stress_level,
            risk_level: args.risk_level,
            budget: args.budget,
            location: args.location,
            education_level: args.education_level,
        }
    }
}

#[derive(Args)]
struct ScenarioArgs {
    #[arg(long)]
    budget: Option<u64>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    stress: Option<u32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    risk: Option<u32>,
}

impl From<ScenarioArgs> for ScenarioOverrides {
    fn from(args: ScenarioArgs) -> Self {
        ScenarioOverrides {
            budget: args.budget,
            stress_level: args.stress,
            risk_level: args.risk,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an assessment and render the recommendation
    Recommend {
        #[command(flatten)]
        assessment: AssessmentArgs,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the parsed result as JSON
        #[arg(long)]
        json: bool,
        /// Follow up with college suggestions
        #[arg(long)]
        colleges: bool,
        /// Follow up with a what-if simulation seeded from this assessment
        #[arg(long)]
        what_if: bool,
        #[arg(long, requires = "what_if")]
        what_if_budget: Option<u64>,
        #[arg(long, requires = "what_if", value_parser = clap::value_parser!(u32).range(0..=10))]
        what_if_stress: Option<u32>,
        #[arg(long, requires = "what_if", value_parser = clap::value_parser!(u32).range(0..=10))]
        what_if_risk: Option<u32>,
    },
    /// Run a what-if simulation
    Simulate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show college suggestions from the fallback catalog
    Colleges {
        /// Recommended stream label to pick a bucket for
        #[arg(long, conflicts_with = "all")]
        stream: Option<String>,
        /// List every bucket
        #[arg(long)]
        all: bool,
        /// Load the catalog from a JSON file instead of the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Submit every row of a CSV file and write one report per student
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
}

fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<FallbackCatalog> {
    match path {
        Some(path) => FallbackCatalog::from_path(path).context("failed to load college catalog"),
        None => FallbackCatalog::builtin().context("built-in college catalog is invalid"),
    }
}

/// Service failures show one generic notice; the detail is in the logs.
fn surface(err: FlowError) -> anyhow::Error {
    match err {
        FlowError::Service(service) => anyhow::anyhow!(service.user_message()),
        other => anyhow::Error::new(other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, if cli.verbose { Level::INFO } else { Level::WARN });

    let config = ClientConfig::new(&cli.api_base, Duration::from_secs(cli.timeout_secs));
    let advisor = Advisor::new(HttpAdvisor::new(config).context("failed to build HTTP client")?);

    match cli.command {
        Commands::Recommend {
            assessment,
            out,
            json,
            colleges,
            what_if,
            what_if_budget,
            what_if_stress,
            what_if_risk,
        } => {
            let nav = advisor
                .submit_assessment(assessment.into())
                .await
                .map_err(surface)?;
            let Some(result) = nav.result.as_ref() else {
                anyhow::bail!("no recommendation returned");
            };

            let rendered = if json {
                serde_json::to_string_pretty(result)?
            } else {
                report::build_recommendation_report(nav.submission.as_ref(), result, Utc::now())
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }

            if colleges {
                let catalog = load_catalog(None)?;
                let view = session::plan_college_view(Some(result), &catalog)?;
                println!("{}", report::build_college_report(&view));
            }

            if what_if {
                let overrides = ScenarioOverrides {
                    budget: what_if_budget,
                    stress_level: what_if_stress,
                    risk_level: what_if_risk,
                };
                let simulation = advisor.run_simulation(&nav, overrides).await.map_err(surface)?;
                println!("{}", report::build_simulation_report(&simulation));
            }
        }
        Commands::Simulate { scenario, json } => {
            let simulation = advisor
                .run_simulation(&NavState::default(), scenario.into())
                .await
                .map_err(surface)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&simulation)?);
            } else {
                println!("{}", report::build_simulation_report(&simulation));
            }
        }
        Commands::Colleges {
            stream: label,
            all,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_ref())?;
            if all {
                println!("{}", report::build_catalog_report(&catalog));
            } else {
                let category = stream::classify(label.as_deref());
                let bucket = catalog
                    .get(category)
                    .ok_or(stream::CatalogError::MissingCategory(category.key()))?;
                let view = session::CollegeView {
                    stream_label: label.as_deref(),
                    category,
                    source: session::CollegeSource::Fallback(bucket),
                };
                println!("{}", report::build_college_report(&view));
            }
        }
        Commands::Batch { csv, out_dir } => {
            let summary = batch::run_batch(&advisor, &csv, &out_dir).await?;
            println!(
                "Submitted {} of {} assessments. Summary written to {}.",
                summary.succeeded(),
                summary.outcomes.len(),
                summary.summary_path.display()
            );
        }
    }

    Ok(())
}
