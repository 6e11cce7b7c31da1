use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use estools_core::TOOL_VERSION;
use estools_core::config::{
    AddressOverrides, ResolvedConnection, config_path, load_config,
    resolve_connection_from_process,
};
use estools_core::copy::{CopyMode, CopyReport, CopyRequest, copy_index_config};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "estools",
    about = "Copy Elasticsearch index settings and mappings between clusters",
    disable_version_flag = true
)]
struct Cli {
    #[arg(short = 'x', long = "src_index", value_name = "INDEX", help = "Source index name")]
    src_index: Option<String>,
    #[arg(
        short = 'y',
        long = "dest_index",
        value_name = "INDEX",
        help = "Destination index name (defaults to the source index)"
    )]
    dest_index: Option<String>,
    #[arg(
        short = 's',
        long = "src_addr",
        value_name = "URL",
        help = "Source cluster address [default: http://localhost:9200]"
    )]
    src_addr: Option<String>,
    #[arg(
        short = 'd',
        long = "dest_addr",
        value_name = "URL",
        help = "Destination cluster address [default: http://localhost:9201]"
    )]
    dest_addr: Option<String>,
    #[arg(short = 'a', long = "all", help = "Copy both mappings and settings")]
    all: bool,
    #[arg(long = "copy_mappings", help = "Copy the source index mappings")]
    copy_mappings: bool,
    #[arg(long = "copy_settings", help = "Copy the source index settings")]
    copy_settings: bool,
    #[arg(long = "dry_run", help = "Print the destination request instead of sending it")]
    dry_run: bool,
    #[arg(long, value_name = "PATH", help = "TOML config file [default: ./estools.toml]")]
    config: Option<PathBuf>,
    #[arg(long, help = "Print resolved connection diagnostics")]
    diagnostics: bool,
    #[arg(short = 'v', long = "verison", help = "Print version information")]
    show_version: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    PrintVersion,
    PrintHelp,
    Copy { src_index: String, mode: CopyMode },
}

/// Decide what the invocation asks for before touching the network.
fn dispatch(cli: &Cli) -> Result<Action> {
    if cli.show_version {
        return Ok(Action::PrintVersion);
    }
    let Some(src_index) = cli
        .src_index
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        bail!("--src_index is required, type --help for more details");
    };
    match CopyMode::from_flags(cli.all, cli.copy_mappings, cli.copy_settings) {
        Some(mode) => Ok(Action::Copy {
            src_index: src_index.to_string(),
            mode,
        }),
        None => Ok(Action::PrintHelp),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match dispatch(&cli)? {
        Action::PrintVersion => {
            println!("{TOOL_VERSION}");
            Ok(())
        }
        Action::PrintHelp => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
        Action::Copy { src_index, mode } => run_copy(&cli, src_index, mode),
    }
}

fn run_copy(cli: &Cli, src_index: String, mode: CopyMode) -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let connection = resolve_runtime_connection(cli)?;
    if cli.diagnostics {
        println!("[diagnostics]\n{}\n", connection.diagnostics());
    }

    let request = CopyRequest {
        src_addr: connection.src_addr.clone(),
        dest_addr: connection.dest_addr.clone(),
        src_index,
        dest_index: cli.dest_index.clone(),
        mode,
        dry_run: cli.dry_run,
    };
    let report = copy_index_config(&request, &connection.http)?;
    print_report(&request, &report)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_runtime_connection(cli: &Cli) -> Result<ResolvedConnection> {
    let cwd = env::current_dir().context("failed to read current directory")?;
    let path = config_path(cli.config.as_deref(), &cwd);
    if cli.config.is_some() && !path.exists() {
        bail!("config file not found: {}", path.display());
    }
    let config = load_config(&path)?;
    let overrides = AddressOverrides {
        src_addr: cli.src_addr.clone(),
        dest_addr: cli.dest_addr.clone(),
    };
    Ok(resolve_connection_from_process(&config, &overrides))
}

fn print_report(request: &CopyRequest, report: &CopyReport) -> Result<()> {
    let plan = &report.plan;
    println!("index copy");
    println!("mode: {}", request.mode.as_str());
    println!("source: {}/{}", request.src_addr, request.src_index);
    println!("source_version: {}", plan.source_version);
    println!("destination: {}/{}", request.dest_addr, plan.dest_index);
    println!("destination_version: {}", plan.destination_version);
    println!(
        "include_type_name: {}",
        format_flag(plan.adjustments.include_type_name)
    );
    println!(
        "doc_type_wrapped: {}",
        format_flag(plan.adjustments.wrapped_doc_type)
    );
    println!("requests: {}", report.request_count);

    if !report.sent {
        println!("dry_run: yes");
        println!("PUT {}", plan.url);
        println!("{}", serde_json::to_string_pretty(&plan.body)?);
        return Ok(());
    }
    println!(
        "acknowledged: {}",
        report
            .acknowledged
            .map(format_flag)
            .unwrap_or("n/a")
    );
    Ok(())
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
