//! spotlightd: presenter remote daemon entry point.
//!
//! Wires the infrastructure adapters to the application use cases and runs
//! until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, init logging
//!  └─ run()
//!       ├─ UinputDevice            -- the one virtual keyboard/pointer
//!       ├─ DeviceRegistry          -- per model: pipeline + reader thread
//!       ├─ hotplug monitor         -- udev thread → mpsc channel
//!       ├─ initial enumeration     -- after the monitor is listening
//!       └─ select! { hotplug event, Ctrl-C }
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spotlight_daemon::infrastructure::storage::config::{
    config_file_path, load_config, save_config, DaemonConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Gesture daemon for wireless presenter remotes.
///
/// Recognises taps, double taps, long presses and combos on supported
/// remotes and turns them into slide keys or overlay commands.
#[derive(Debug, Parser)]
#[command(name = "spotlightd", about = "Presenter remote gesture daemon", version)]
struct Cli {
    /// Config file; defaults to `$XDG_CONFIG_HOME/spotlight/config.toml`.
    #[arg(long, env = "SPOTLIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset (overrides the config file).
    #[arg(long, env = "SPOTLIGHT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Do not grab presenter event nodes; their native keys reach the desktop.
    #[arg(long)]
    no_grab: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daemon (the default).
    Run,
    /// Print the supported presenters connected right now.
    List,
    /// Print framed raw reports from one hidraw node with their meaning.
    Dump {
        /// The hidraw node, e.g. `/dev/hidraw3`.
        path: PathBuf,
        /// Model whose report format and button table to use.
        #[arg(long, default_value = "baseus")]
        model: String,
    },
    /// Write a config file with every default spelled out.
    InitConfig,
}

/// `RUST_LOG` wins; otherwise `fallback`.
fn init_logging(fallback: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.daemon.log_level.clone());
    init_logging(&level);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let grab = config.daemon.grab_event_nodes && !cli.no_grab;
            daemon::run(config, grab).await
        }
        Command::List => daemon::list(),
        Command::Dump { path, model } => dump(&path, &model),
        Command::InitConfig => init_config(cli.config.as_deref()),
    }
}

fn init_config(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    save_config(&DaemonConfig::default(), &path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn dump(path: &Path, model_key: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use spotlight_core::protocol::packet::STATUS_ALL_RELEASED;
    use spotlight_core::{DeviceModel, PacketFramer};

    let model = DeviceModel::from_key(model_key)
        .with_context(|| format!("unknown model '{model_key}'"))?;
    let shape = model
        .packet_shape()
        .with_context(|| format!("{model} has no raw report format"))?;
    let buttons = model.buttons();
    let file =
        std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

    for packet in PacketFramer::with_limit(shape.terminator, shape.length).packets(file) {
        let packet = packet?;
        let hex: Vec<String> = packet.iter().map(|b| format!("{b:02x}")).collect();
        let meaning = match shape.check(&packet) {
            Ok(STATUS_ALL_RELEASED) => "all released".to_string(),
            Ok(status) => match buttons.resolve(u16::from(status)) {
                Some(code) => format!("{} {:?}", code.button, code.signal),
                None => format!("unknown status {status}"),
            },
            Err(e) => format!("malformed: {e}"),
        };
        println!("{}  {meaning}", hex.join(" "));
    }
    Ok(())
}

#[cfg(target_os = "linux")]
mod daemon {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use anyhow::Context;
    use spotlight_core::{DeviceModel, DeviceNode, Scheduler};
    use tracing::{error, info, warn};

    use spotlight_daemon::application::dispatch::{ActionDispatcher, AppContext};
    use spotlight_daemon::application::emulate_input::{InputEmitter, VirtualInput};
    use spotlight_daemon::application::hotplug::{DescriptorSource, HotplugRouter};
    use spotlight_daemon::application::pipeline::DevicePipeline;
    use spotlight_daemon::application::registry::{DeviceRegistry, NodeMonitor};
    use spotlight_daemon::infrastructure::input_emulation::linux::UinputDevice;
    use spotlight_daemon::infrastructure::reader::{DeviceProvisioner, NodeReader};
    use spotlight_daemon::infrastructure::scheduler::TokioScheduler;
    use spotlight_daemon::infrastructure::storage::config::DaemonConfig;
    use spotlight_daemon::infrastructure::surface::{HeadlessSurface, TracingLogSink};
    use spotlight_daemon::infrastructure::udev_monitor::{
        enumerate_nodes, start_hotplug_monitor, UdevDescriptors,
    };

    pub async fn run(config: DaemonConfig, grab: bool) -> anyhow::Result<()> {
        info!("spotlight daemon starting");

        let device_name = config.daemon.virtual_device_name.clone();
        let device = UinputDevice::create(&device_name)
            .context("could not create the virtual input device (is /dev/uinput writable?)")?;

        let ctx = AppContext {
            surface: Arc::new(HeadlessSurface::new()),
            log: Arc::new(TracingLogSink),
            emitter: Arc::new(InputEmitter::new(Arc::new(device))),
        };
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::current());

        // ── Per-model wiring ──────────────────────────────────────────────────
        let registry = Arc::new(DeviceRegistry::new(Box::new(move |model: DeviceModel| {
            let dispatcher = Arc::new(ActionDispatcher::new(model, ctx.clone()));
            let pipeline = Arc::new(DevicePipeline::new(
                model,
                config.profile_for(model),
                Arc::clone(&scheduler),
                dispatcher,
                Arc::clone(&ctx.emitter),
            ));
            let name = device_name.clone();
            let provision: DeviceProvisioner = Box::new(move || {
                Ok(Arc::new(UinputDevice::create(&name)?) as Arc<dyn VirtualInput>)
            });
            Arc::new(NodeReader::new(pipeline, grab, provision)) as Arc<dyn NodeMonitor>
        })));

        // ── Hotplug, then initial scan ────────────────────────────────────────
        let running = Arc::new(AtomicBool::new(true));
        let mut hotplug_rx = start_hotplug_monitor(Arc::clone(&running))
            .context("failed to start the hotplug monitor")?;
        let router = HotplugRouter::new(Arc::clone(&registry), Arc::new(UdevDescriptors));
        let found = router.enumerate(enumerate_nodes().context("device enumeration failed")?);
        info!(found, "initial device scan complete");

        info!("spotlight daemon ready.  Press Ctrl-C to exit.");
        loop {
            tokio::select! {
                event = hotplug_rx.recv() => match event {
                    Some(event) => {
                        router.handle(&event);
                    }
                    None => {
                        warn!("hotplug monitor stopped unexpectedly");
                        break;
                    }
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        error!("failed to listen for Ctrl-C: {e}");
                    }
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        running.store(false, Ordering::Relaxed);
        tokio::task::spawn_blocking(move || registry.shutdown()).await?;
        info!("spotlight daemon stopped");
        Ok(())
    }

    pub fn list() -> anyhow::Result<()> {
        let source = UdevDescriptors;
        let mut found = 0;
        for path in enumerate_nodes().context("device enumeration failed")? {
            let Some(node) = DeviceNode::from_path(&path) else {
                continue;
            };
            let Some(descriptor) = source.describe(&node.path) else {
                continue;
            };
            for model in DeviceModel::ALL {
                if model.signature().matches(&descriptor, node.kind) {
                    println!("{}\t{:?}\t{}", model.name(), node.kind, path.display());
                    found += 1;
                }
            }
        }
        if found == 0 {
            println!("no supported presenter connected");
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod daemon {
    use spotlight_daemon::infrastructure::storage::config::DaemonConfig;

    pub async fn run(_config: DaemonConfig, _grab: bool) -> anyhow::Result<()> {
        anyhow::bail!("spotlightd needs Linux (uinput, evdev and udev)")
    }

    pub fn list() -> anyhow::Result<()> {
        anyhow::bail!("spotlightd needs Linux (uinput, evdev and udev)")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run_with_grab() {
        // Arrange / Act
        let cli = Cli::parse_from(["spotlightd"]);

        // Assert
        assert!(cli.command.is_none());
        assert!(!cli.no_grab);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_dump_defaults_to_baseus_model() {
        // Act
        let cli = Cli::parse_from(["spotlightd", "dump", "/dev/hidraw3"]);

        // Assert
        match cli.command {
            Some(Command::Dump { path, model }) => {
                assert_eq!(path, PathBuf::from("/dev/hidraw3"));
                assert_eq!(model, "baseus");
            }
            other => panic!("expected dump, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_parse() {
        let cli = Cli::parse_from([
            "spotlightd",
            "--no-grab",
            "--log-level",
            "debug",
            "--config",
            "/tmp/s.toml",
            "list",
        ]);
        assert!(cli.no_grab);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Command::List)));
    }

    #[test]
    fn test_init_config_refuses_to_overwrite() {
        // Arrange
        let path = std::env::temp_dir().join(format!("spotlight_init_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "").unwrap();

        // Act
        let result = init_config(Some(&path));

        // Assert
        assert!(result.is_err());
        let _ = std::fs::remove_file(&path);
    }
}
