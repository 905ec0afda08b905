// Copilot Remap CLI
// Turns the Copilot key (Meta+Shift+F23) into a real modifier key

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use copilot_remap_core::input::{find_keyboard_device, list_devices};
use copilot_remap_core::settings::{validate_delay_ms, Settings, DEFAULT_DELAY_MS, MAX_DELAY_MS};
use copilot_remap_core::{EventLoop, InputDevice, Key, RemapConfig, StopReason, VirtualOutput};

/// Remap the Copilot key to Right Control
#[derive(Parser, Debug)]
#[command(name = "copilot-remap")]
#[command(version)]
#[command(about = "Remap the Copilot key (Meta+Shift+F23) to Right Control", long_about = None)]
struct Args {
    /// Input device to grab (default: auto-detect)
    #[arg(short, long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Delay in ms before the remapped key is released
    #[arg(short = 't', long, value_name = "MS",
          value_parser = clap::value_parser!(u64).range(0..=MAX_DELAY_MS))]
    delay: Option<u64>,

    /// List input devices and exit
    #[arg(short, long)]
    list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (default: ~/.config/copilot-remap/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

/// Release delay precedence: command line > settings file > default
fn resolve_delay(args: &Args, settings: &Settings) -> Result<Duration> {
    let delay_ms = args
        .delay
        .or(settings.delay_ms())
        .unwrap_or(DEFAULT_DELAY_MS);
    Ok(validate_delay_ms(delay_ms)?)
}

fn resolve_target_key(settings: &Settings) -> Key {
    settings.target_key().unwrap_or(Key::RIGHT_CTRL)
}

/// Device precedence: command line > settings file > auto-detect
fn resolve_device(args: &Args, settings: &Settings) -> Option<PathBuf> {
    args.device
        .clone()
        .or_else(|| settings.device().map(Path::to_path_buf))
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load_default().context("Failed to load default settings"),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn print_devices() {
    let devices = list_devices();
    if devices.is_empty() {
        println!("No input devices found (are you running as root?)");
        return;
    }

    println!("Found {} input device(s):", devices.len());
    for device in &devices {
        println!(
            "  {}: {}{}",
            device.path.display(),
            device.name,
            device.markers()
        );
    }
}

/// Clear `running` on SIGINT or SIGTERM
fn install_signal_handler(running: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;

    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::info!("Received signal {}, shutting down gracefully...", signal);
                running.store(false, Ordering::SeqCst);
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    if let Some(path) = settings.source_path() {
        log::debug!("Loaded settings from {}", path.display());
    }

    let config = RemapConfig {
        target_key: resolve_target_key(&settings),
        release_delay: resolve_delay(&args, &settings)?,
        ..RemapConfig::default()
    };

    let path = match resolve_device(&args, &settings) {
        Some(path) => path,
        None => find_keyboard_device().ok_or_else(|| {
            anyhow!("No keyboard device found. Use --list to see devices and --device to pick one")
        })?,
    };

    let mut device = InputDevice::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    log::info!("Using {} ({})", path.display(), device.name());
    log::debug!("Source capabilities:{}", device.info().markers());

    device
        .grab()
        .with_context(|| format!("Failed to grab {}", path.display()))?;

    let mut output = VirtualOutput::from_device(&device, config.target_key)
        .context("Failed to create virtual device (is the uinput module loaded?)")?;
    match output.devnode() {
        Some(node) => log::info!("Virtual device at {}", node.display()),
        None => log::debug!("Virtual device node not available"),
    }

    let running = Arc::new(AtomicBool::new(true));
    install_signal_handler(running.clone())?;

    log::info!(
        "Remapping {:?} to {} (release delay {:?}). Press Ctrl+C to exit.",
        config.chord,
        config.target_key,
        config.release_delay
    );

    let mut event_loop = EventLoop::new(device, output, config, running)
        .context("Failed to start event loop")?;
    if let StopReason::ReadError(e) = event_loop.run() {
        log::warn!("Stopped on read error: {}", e);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list {
        print_devices();
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["copilot-remap"]);

        assert_eq!(args.device, None);
        assert_eq!(args.delay, None);
        assert!(!args.list);
        assert!(!args.verbose);
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "copilot-remap",
            "-d",
            "/dev/input/event3",
            "-t",
            "150",
            "--verbose",
            "--config",
            "/tmp/settings.toml",
        ]);

        assert_eq!(args.device, Some(PathBuf::from("/dev/input/event3")));
        assert_eq!(args.delay, Some(150));
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/settings.toml")));
    }

    #[test]
    fn test_args_list() {
        let args = Args::parse_from(["copilot-remap", "-l"]);
        assert!(args.list);
    }

    #[test]
    fn test_args_delay_bounds() {
        assert!(Args::try_parse_from(["copilot-remap", "--delay", "0"]).is_ok());
        assert!(Args::try_parse_from(["copilot-remap", "--delay", "10000"]).is_ok());
        assert!(Args::try_parse_from(["copilot-remap", "--delay", "10001"]).is_err());
        assert!(Args::try_parse_from(["copilot-remap", "--delay", "-1"]).is_err());
    }

    #[test]
    fn test_delay_precedence() {
        let settings = Settings::from_toml("[remap]\ndelay_ms = 500\n").unwrap();

        let args = Args::parse_from(["copilot-remap", "-t", "100"]);
        assert_eq!(resolve_delay(&args, &settings).unwrap(), Duration::from_millis(100));

        let args = Args::parse_from(["copilot-remap"]);
        assert_eq!(resolve_delay(&args, &settings).unwrap(), Duration::from_millis(500));
        assert_eq!(
            resolve_delay(&args, &Settings::new()).unwrap(),
            Duration::from_millis(DEFAULT_DELAY_MS)
        );
    }

    #[test]
    fn test_device_precedence() {
        let settings = Settings::from_toml("[remap]\ndevice = \"/dev/input/event7\"\n").unwrap();

        let args = Args::parse_from(["copilot-remap", "-d", "/dev/input/event3"]);
        assert_eq!(
            resolve_device(&args, &settings),
            Some(PathBuf::from("/dev/input/event3"))
        );

        let args = Args::parse_from(["copilot-remap"]);
        assert_eq!(
            resolve_device(&args, &settings),
            Some(PathBuf::from("/dev/input/event7"))
        );
        assert_eq!(resolve_device(&args, &Settings::new()), None);
    }

    #[test]
    fn test_target_key_defaults_to_right_ctrl() {
        assert_eq!(resolve_target_key(&Settings::new()), Key::RIGHT_CTRL);

        let settings = Settings::from_toml("[remap]\ntarget_key = \"RIGHT_META\"\n").unwrap();
        assert_eq!(resolve_target_key(&settings), Key::RIGHT_META);
    }
}
