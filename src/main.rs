mod bridge;
mod config;
mod report;

use bridge::{dsn, Bridge, BridgeError, InvocationConfig, SoarProcess};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

/// SQL Advisor — runs a SQL statement through the SOAR analyzer and prints
/// a scored report of its findings.
#[derive(Parser, Debug)]
#[command(name = "sql-advisor", version, about)]
struct Cli {
    /// SQL statement to analyze. Read from --file or stdin when omitted.
    sql: Option<String>,

    /// Read the SQL statement from a file
    #[arg(short, long, conflicts_with = "sql")]
    file: Option<PathBuf>,

    /// Analyzer option override as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,

    /// Analyzer report type (shorthand for --set report-type=...)
    #[arg(long)]
    report_type: Option<String>,

    /// Directory holding the per-platform analyzer binaries
    #[arg(long)]
    bin_dir: Option<PathBuf>,

    /// Explicit analyzer executable
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Cancel the analysis after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Optional output file path for the HTML report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file (defaults to .sql-advisor.toml in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim().trim_start_matches('-');
    if key.is_empty() {
        return Err(format!("empty option name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(BridgeError::Process(process)) = err.downcast_ref::<BridgeError>() {
                if process.is_launch() {
                    eprintln!("{} {}", "analysis failed:".red().bold(), process);
                    eprintln!("The statement was NOT analyzed; no findings are available.");
                    return ExitCode::from(2);
                }
            }
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let config = match &cli.config {
        Some(path) => config::Config::load_from(path)?.with_env(),
        None => config::Config::load()?,
    };

    let sql = read_sql(&cli).await?;
    if sql.trim().is_empty() {
        return Err("no SQL statement given. Usage: sql-advisor <SQL> | --file <path> | stdin".into());
    }

    let mut invocation = InvocationConfig::with_overrides(config.analyzer.options.clone());
    invocation.merge(cli.overrides.iter().cloned());
    if let Some(report_type) = &cli.report_type {
        invocation.set("report-type", report_type.clone());
    }

    if let Some(credentials) = config.credentials() {
        let mode = dsn::apply(&credentials, &config.side_file(), &mut invocation)?;
        debug!(side_file = matches!(mode, dsn::DsnMode::SideFile), "configured test database");
    }

    let process = match cli.binary.as_ref().or(config.analyzer.binary.as_ref()) {
        Some(binary) => SoarProcess::new(binary.clone()),
        None => SoarProcess::from_bin_dir(&cli.bin_dir.clone().unwrap_or_else(|| config.bin_dir())),
    };
    info!(executable = %process.executable().display(), "resolved SQL analyzer");

    let bridge = Bridge::new(process, invocation);
    let timeout = cli.timeout.or(config.analyzer.timeout_secs).map(Duration::from_secs);

    let span = info_span!("sql_analyze", report_type = %bridge.config().report_type());
    let result = match timeout {
        Some(limit) => bridge.analyze_with_timeout(&sql, limit).instrument(span).await?,
        None => bridge.analyze(&sql).instrument(span).await?,
    };

    info!("generating report");
    let built = report::build(result);
    report::output(&built, cli.output.as_deref())?;
    if let report::Report::Scored(scored) = &built {
        info!(score = scored.score, findings = scored.findings.len(), "done");
    }

    Ok(())
}

async fn read_sql(cli: &Cli) -> Result<String, std::io::Error> {
    if let Some(sql) = &cli.sql {
        return Ok(sql.clone());
    }
    if let Some(path) = &cli.file {
        return tokio::fs::read_to_string(path).await;
    }
    let mut sql = String::new();
    tokio::io::stdin().read_to_string(&mut sql).await?;
    Ok(sql)
}
