use anyhow::Result;
use argus::config::{self, Config};
use argus::devices::{AdbCli, DeviceScanner, FridaCliEnumerator};
use argus::registry::LoopRegistry;
use argus::session::{CommandSessionFactory, SessionSettings};
use argus::watch::WatchLoop;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(about = "Keeps one monitoring session per attached device")]
#[command(version)]
struct Args {
    /// Path to config file
    #[arg(long, short)]
    config: Option<std::path::PathBuf>,

    /// Install the instrumentation server on devices before attaching
    #[arg(long)]
    install: bool,

    /// Instrumentation server port
    #[arg(long)]
    port: Option<u16>,

    /// Process name pattern to monitor (repeatable)
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    /// Spawn matching processes instead of attaching to running ones
    #[arg(long)]
    spawn: bool,

    /// Poll interval between device scans, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// adb binary used for the remote device listing
    #[arg(long)]
    adb: Option<String>,

    /// Device listing binary
    #[arg(long)]
    frida_ls: Option<String>,

    /// Worker command to run per device
    #[arg(long)]
    worker: Option<String>,

    /// Extra worker argument, placed before the per-device ones (repeatable)
    #[arg(long = "worker-arg")]
    worker_args: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the devices the watch loop would track, then exit
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("argus=info".parse()?),
        )
        .init();

    let mut config = config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let enumerator = FridaCliEnumerator::new(&config.frida.program);
    let scanner = DeviceScanner::new(Arc::new(enumerator), AdbCli::new(&config.adb.program));

    if let Some(Command::Devices) = args.command {
        let devices = scanner.scan().await?;
        if devices.is_empty() {
            println!("No devices found.");
        }
        for device in devices {
            println!("{:<28} {}", device.id, device.transport.label());
        }
        return Ok(());
    }

    let Some(worker) = config.worker.program.clone() else {
        anyhow::bail!(
            "No worker command configured. Pass --worker <program> or set [worker] program in the config file."
        );
    };

    let settings = SessionSettings {
        install: config.watch.install,
        port: config.watch.port,
        patterns: config::compile_patterns(&config.watch.patterns)?,
        spawn: config.watch.spawn,
    };
    let factory = Arc::new(CommandSessionFactory::new(worker, config.worker.args.clone()));

    let registry = LoopRegistry::new();
    let watch = WatchLoop::new(
        scanner,
        factory,
        settings,
        Duration::from_millis(config.watch.interval_ms),
        registry.clone(),
    )
    .await;

    let signal_registry = registry.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, stopping");
            signal_registry.cancel_all().await;
        }
    });

    watch.spawn().wait().await
}

/// Command-line flags override file values.
fn apply_overrides(config: &mut Config, args: &Args) {
    if args.install {
        config.watch.install = true;
    }
    if let Some(port) = args.port {
        config.watch.port = port;
    }
    if args.spawn {
        config.watch.spawn = true;
    }
    if let Some(ms) = args.interval_ms {
        config.watch.interval_ms = ms;
    }
    if !args.patterns.is_empty() {
        config.watch.patterns = args.patterns.clone();
    }
    if let Some(adb) = &args.adb {
        config.adb.program = adb.clone();
    }
    if let Some(frida_ls) = &args.frida_ls {
        config.frida.program = frida_ls.clone();
    }
    if let Some(worker) = &args.worker {
        config.worker.program = Some(worker.clone());
    }
    if !args.worker_args.is_empty() {
        config.worker.args = args.worker_args.clone();
    }
}
