use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

use dockmon::cli::{Cli, Commands, ConfigCommands, GlobalArgs, OutputFormat};
use dockmon::core::config::parse_interval;
use dockmon::core::listing::{filter_and_sort, ContainerFilter, SortDirection, SortField, SortSpec, StatusFilter};
use dockmon::core::poller;
use dockmon::core::recorder::{RecordFormat, SnapshotRecorder, SnapshotSummary};
use dockmon::core::topology::Topology;
use dockmon::core::{ContainerStatus, Settings, Snapshot};
use dockmon::logging::{self, LogTarget};
use dockmon::utils::{
    format_mb, format_percent, format_timestamp, format_uptime, truncate_string, AppConfig,
    BUILD_DEFAULT_API_BASE_URL, BUILD_MODE,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so its logs go to a file
    let _log_guard = match cli.command {
        None => {
            let dir = logging::default_log_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            logging::init(LogTarget::File(dir), LevelFilter::INFO)
        }
        Some(_) => logging::init(LogTarget::Stderr, LevelFilter::INFO),
    };

    match cli.command {
        None => {
            // No command - run interactive TUI
            let settings = load_settings(&cli.global)?;
            dockmon::app::run(settings).await?;
        }
        Some(Commands::Status { format }) => {
            handle_status(&cli.global, &format).await?;
        }
        Some(Commands::Containers {
            status,
            instance,
            sort,
            desc,
            format,
        }) => {
            handle_containers(&cli.global, &status, instance, sort, desc, &format).await?;
        }
        Some(Commands::Graph { format }) => {
            handle_graph(&cli.global, &format).await?;
        }
        Some(Commands::Watch { record, format, count }) => {
            handle_watch(&cli.global, record, &format, count).await?;
        }
        Some(Commands::Serve { host, port, cors }) => {
            handle_serve(&cli.global, host, port, cors).await?;
        }
        Some(Commands::Config { command }) => {
            handle_config(&cli.global, command)?;
        }
        Some(Commands::Token) => {
            handle_token()?;
        }
    }

    Ok(())
}

fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    Settings::load(&global.overrides()).context("Invalid settings")
}

fn parse_format(raw: &str) -> Result<OutputFormat> {
    raw.parse::<OutputFormat>().map_err(|e| anyhow!(e))
}

/// Print JSON or YAML; returns false when the caller should print text
fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
            Ok(true)
        }
        OutputFormat::Text => Ok(false),
    }
}

fn format_status(status: ContainerStatus) -> ColoredString {
    let padded = format!("{:<10}", status.as_str());
    match status {
        ContainerStatus::Running => padded.green(),
        ContainerStatus::Stopped => padded.red(),
    }
}

async fn fetch(settings: &Settings) -> Result<Arc<Snapshot>> {
    poller::fetch_snapshot(settings)
        .await
        .with_context(|| format!("Failed to query Prometheus at {}", settings.api_base_url))
}

async fn handle_status(global: &GlobalArgs, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let settings = load_settings(global)?;
    let snapshot = fetch(&settings).await?;
    let summary = SnapshotSummary::from_snapshot(&snapshot);

    if print_structured(&summary, format)? {
        return Ok(());
    }

    println!("{}\n", "Docker Exporter Status".bold());
    println!("{:<12} {}", "Source:", settings.api_base_url);
    if let Some(updated_at) = summary.updated_at {
        println!("{:<12} {}", "Updated:", format_timestamp(&updated_at));
    }
    println!(
        "{:<12} {} total, {} running, {} stopped",
        "Containers:",
        summary.stats.total,
        summary.stats.running.to_string().green(),
        if summary.stats.stopped > 0 {
            summary.stats.stopped.to_string().red()
        } else {
            summary.stats.stopped.to_string().normal()
        },
    );
    println!("{:<12} {}", "Targets:", summary.stats.targets);

    if !summary.hosts.is_empty() {
        println!();
        println!("{:<30} {:>14} {:>10}", "Host", "Memory", "CPU");
        println!("{}", "-".repeat(56));
        for host in &summary.hosts {
            println!(
                "{:<30} {:>14} {:>10}",
                truncate_string(&host.instance, 30),
                host.memory_mb.map(format_mb).unwrap_or_else(|| "-".to_string()),
                host.cpu_percent.map(format_percent).unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    Ok(())
}

async fn handle_containers(
    global: &GlobalArgs,
    status: &str,
    instance: Option<String>,
    sort: Option<String>,
    desc: bool,
    format: &str,
) -> Result<()> {
    let format = parse_format(format)?;
    let filter = ContainerFilter {
        status: status.parse::<StatusFilter>().map_err(|e| anyhow!(e))?,
        instance,
    };
    let field = sort
        .map(|s| s.parse::<SortField>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
    let sort = SortSpec { field, direction };

    let settings = load_settings(global)?;
    let snapshot = fetch(&settings).await?;
    let containers = filter_and_sort(&snapshot.containers, &filter, &sort);

    if print_structured(&containers, format)? {
        return Ok(());
    }

    if containers.is_empty() {
        println!("No containers match.");
        return Ok(());
    }

    println!(
        "{:<28} {:<36} {:<10} {:<24} {:>10}",
        "Name", "Image", "Status", "Instance", "Uptime"
    );
    println!("{}", "-".repeat(112));

    for container in &containers {
        println!(
            "{:<28} {:<36} {} {:<24} {:>10}",
            truncate_string(&container.name, 28),
            truncate_string(&container.image, 36),
            format_status(container.status),
            truncate_string(&container.instance, 24),
            format_uptime(container.uptime),
        );
    }

    println!("\n{} of {} containers", containers.len(), snapshot.containers.len());
    Ok(())
}

async fn handle_graph(global: &GlobalArgs, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let settings = load_settings(global)?;
    let snapshot = fetch(&settings).await?;
    let topology = Topology::build(&snapshot.containers);

    if print_structured(&topology, format)? {
        return Ok(());
    }

    if topology.hosts.is_empty() {
        println!("No containers reported.");
        return Ok(());
    }

    for host in &topology.hosts {
        println!(
            "{} {}",
            host.instance.cyan().bold(),
            format!("({}/{} running)", host.running, host.containers).dimmed()
        );

        let children: Vec<_> = topology.children(host).collect();
        for (i, child) in children.iter().enumerate() {
            let branch = if i + 1 == children.len() { "└─" } else { "├─" };
            println!(
                "  {} {} {} {}",
                branch,
                format_status(child.status),
                child.name,
                child.image.dimmed()
            );
        }
    }

    Ok(())
}

async fn handle_watch(global: &GlobalArgs, record: Option<String>, format: &str, count: Option<u64>) -> Result<()> {
    let record_format = format.parse::<RecordFormat>().map_err(|e| anyhow!(e))?;
    let settings = load_settings(global)?;

    let mut recorder = match &record {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
            Some(SnapshotRecorder::new(BufWriter::new(file), record_format)?)
        }
        None => None,
    };

    println!(
        "Watching {} every {}",
        settings.api_base_url,
        humantime::format_duration(settings.poll_interval)
    );
    if let Some(path) = &record {
        println!("Recording snapshots to: {} ({})", path, format);
    }
    println!("Press Ctrl+C to stop\n");

    let (store, handle) = poller::start(&settings)?;
    let mut snapshots = store.subscribe();
    let mut seen = 0u64;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let summary = SnapshotSummary::from_snapshot(&snapshot);
                println!("{}", summary.to_line());

                if let Some(recorder) = recorder.as_mut() {
                    recorder.record(&summary)?;
                }

                seen += 1;
                if count.map_or(false, |limit| seen >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    handle.stop().await;
    println!("{} snapshot(s) received", seen);
    Ok(())
}

#[cfg(feature = "server")]
async fn handle_serve(global: &GlobalArgs, host: String, port: u16, cors: bool) -> Result<()> {
    let settings = load_settings(global)?;
    dockmon::server::run(host, port, cors, settings).await
}

#[cfg(not(feature = "server"))]
async fn handle_serve(_global: &GlobalArgs, _host: String, _port: u16, _cors: bool) -> Result<()> {
    Err(anyhow!("dockmon was built without the `server` feature"))
}

fn handle_config(global: &GlobalArgs, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(global)?;
            let path = AppConfig::config_path()?;

            println!("{}\n", "Configuration:".bold());
            println!("{:<18} {}", "Config file:", path.display());
            println!(
                "{:<18} {} {}",
                "API base URL:",
                settings.api_base_url,
                format!("({})", settings.api_base_url_source).dimmed()
            );
            println!(
                "{:<18} {} {}",
                "Poll interval:",
                humantime::format_duration(settings.poll_interval),
                format!("({})", settings.poll_interval_source).dimmed()
            );
            println!("{:<18} {}", "Points per host:", settings.points_per_host);
            println!("{:<18} {} ({})", "Build default:", BUILD_DEFAULT_API_BASE_URL, BUILD_MODE);
        }
        ConfigCommands::SetUrl { url } => {
            let mut config = AppConfig::load()?;
            let url = url.trim().trim_end_matches('/').to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("API base URL must start with http:// or https://"));
            }
            config.api_base_url = Some(url.clone());
            config.save()?;
            println!("✓ API base URL set to {}", url);
        }
        ConfigCommands::SetInterval { interval } => {
            let parsed = parse_interval(&interval)?;
            let mut config = AppConfig::load()?;
            config.poll_interval = Some(interval.trim().to_string());
            config.save()?;
            println!("✓ Poll interval set to {}", humantime::format_duration(parsed));
        }
        ConfigCommands::Reset => {
            let path = AppConfig::config_path()?;
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                println!("✓ Removed {}", path.display());
            } else {
                println!("No saved configuration at {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
fn handle_token() -> Result<()> {
    let token = dockmon::server::auth::generate_token();
    println!("{}", token);
    eprintln!("Export it before running `dockmon serve`:");
    eprintln!("  export {}=\"{}\"", dockmon::utils::ENV_WEB_TOKEN, token);
    Ok(())
}

#[cfg(not(feature = "server"))]
fn handle_token() -> Result<()> {
    Err(anyhow!("dockmon was built without the `server` feature"))
}

