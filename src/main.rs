use anyhow::Context;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use osintreport::{
    config::Config,
    crm::{CaseSink, DryRunSink, SalesforceClient},
    error::ReportError,
    llm::{HttpTextGenerator, OfflineGenerator, TextGenerator},
    logging,
    pipeline::{self, Pipeline, PipelineOutcome},
};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OSINT notes file to process
    #[arg(default_value = "sample.txt")]
    input: PathBuf,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Chart image file
    #[arg(long)]
    chart: Option<PathBuf>,

    /// PDF report file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the model and use the deterministic summary
    #[arg(long)]
    offline: bool,

    /// Write the case record to JSON instead of the CRM
    #[arg(long)]
    skip_crm: bool,

    /// Write the built-in sample document to INPUT first
    #[arg(long)]
    write_sample: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("[WARNING] {}", e);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "[ERROR]".bright_red(), e);
        if e.downcast_ref::<ReportError>().map_or(false, ReportError::is_transient) {
            eprintln!("{} the failure looks transient; rerunning may succeed", "[HINT]".bright_yellow());
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.output_dir {
        config.output.output_dir = dir;
    }
    if let Some(chart) = cli.chart {
        config.output.chart_file = chart;
    }
    if let Some(report) = cli.report {
        config.output.report_file = report;
    }

    if cli.write_sample {
        pipeline::write_sample(&cli.input)
            .with_context(|| format!("writing sample to {}", cli.input.display()))?;
    }

    let generator: Box<dyn TextGenerator> = if cli.offline {
        Box::new(OfflineGenerator)
    } else {
        Box::new(HttpTextGenerator::new(&config)?)
    };

    let sink: Box<dyn CaseSink> = if cli.skip_crm {
        Box::new(DryRunSink::new(config.output.output_dir.join("case_record.json")))
    } else {
        Box::new(SalesforceClient::new(&config).context("configuring the CRM client (use --skip-crm to run without one)")?)
    };

    println!(
        "{} {}",
        "Processing:".bright_green(),
        cli.input.display().to_string().bright_white()
    );

    let pb = create_progress_bar();
    pb.set_message(format!("Building report with {}", generator.name()));

    let result = Pipeline::new(&config, generator.as_ref(), sink.as_ref())
        .run(&cli.input)
        .await;
    pb.finish_and_clear();

    let outcome = result.with_context(|| format!("processing {}", cli.input.display()))?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!(
        "{} {} IPs, {} companies, {} contacts, {} usage entries",
        "[EXTRACTED]".bright_blue(),
        outcome.record.ip_addresses.len(),
        outcome.record.company_mentions.len(),
        outcome.record.contact_mentions.len(),
        outcome.record.usage_mentions.len()
    );
    println!("{} {}", "[CHART]".bright_blue(), outcome.chart.path.display());
    println!("{} {}", "[CASE]".bright_blue(), outcome.case.id);
    println!(
        "{} {}",
        "[SUCCESS]".bright_green(),
        format!("PDF report generated: {}", outcome.report_path.display()).bright_white()
    );
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style.tick_strings(&["-", "\\", "|", "/", "-", "\\", "|", "/"]));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
