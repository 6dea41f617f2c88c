//! Acer Sense Control CLI
//!
//! Command-line interface for thermal profiles, fans, RGB lighting and the
//! other firmware controls of Acer Predator and Nitro laptops.

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use acer_sense::attributes::{Attribute, Attributes};
use acer_sense::config::{self, AppConfig};
use acer_sense::device::SenseDevice;
use acer_sense::events::DispatchOutcome;
use acer_sense::firmware::AcpiCallChannel;
use acer_sense::lighting::{AnimatedSettings, KeyboardEffect, LightbarState, PerZoneSettings, Rgb};
use acer_sense::storage::FileBlobStore;
use acer_sense::thermal::ThermalProfile;
use acer_sense::utils::parsing::{parse_fan_speed_arg, parse_hex_bytes};
use acer_sense::{DeviceProfile, Sensor};

type Device = SenseDevice<AcpiCallChannel>;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Acer Predator / Nitro Control Tool
#[derive(Parser, Debug)]
#[command(name = "acer-sense-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct GlobalArgs {
    /// Config file (default: ~/.config/acer-sense/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device preset, overrides the config file
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Directory for saved power and keyboard state
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show profile, fans, sensors and battery state
    Status,

    /// Thermal profile control
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Set fan speeds: a percentage, `auto` or `max` (GPU defaults to CPU)
    Fan {
        cpu: String,
        gpu: Option<String>,
    },

    /// Four-zone keyboard lighting
    Keyboard {
        #[command(subcommand)]
        action: KeyboardAction,
    },

    /// Back lid lightbar
    Logo {
        #[command(subcommand)]
        action: LogoAction,
    },

    /// Read or write text attributes
    Attr {
        #[command(subcommand)]
        action: AttrAction,
    },

    /// Read firmware temperature and fan sensors
    Sensors,

    /// Continuously print sensors and the thermal profile
    Monitor {
        /// Update interval in seconds
        #[arg(short, long, default_value = "2")]
        interval: u64,
    },

    /// Run the startup sequence (wake, register, restore saved state)
    Init,

    /// Run the shutdown sequence (save power and keyboard state)
    Save,

    /// Run the resume sequence (lighting wake)
    Resume,

    /// Feed a raw 8-byte notification frame, e.g. `0801000000000000`
    Event { frame: String },

    /// Toggle the legacy turbo mode
    Turbo,

    /// Print the effective configuration, optionally writing it out
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Show the current profile
    Get,
    /// Switch to a profile (eco, quiet, balanced, performance, turbo)
    Set { profile: String },
    /// Act like the mode key
    Cycle,
    /// List profiles supported by firmware
    List,
}

#[derive(Subcommand, Debug)]
enum KeyboardAction {
    /// Apply an animated effect to the whole keyboard
    Effect {
        /// static, breathing, neon, wave, shifting, zoom, meteor, twinkling
        effect: String,
        #[arg(short, long, default_value = "5")]
        speed: u8,
        #[arg(short, long, default_value = "100")]
        brightness: u8,
        /// 1 = right to left, 2 = left to right
        #[arg(short, long, default_value = "0")]
        direction: u8,
        /// RRGGBB
        #[arg(short, long, default_value = "ffffff")]
        color: String,
    },
    /// Static colors per zone (one color for all zones, or four)
    Zones {
        #[arg(num_args = 1..=4, required = true)]
        colors: Vec<String>,
        #[arg(short, long, default_value = "100")]
        brightness: u8,
    },
    /// Show what the keyboard reports
    Show,
}

#[derive(Subcommand, Debug)]
enum LogoAction {
    /// Set the lightbar color and brightness
    Set {
        color: String,
        #[arg(default_value = "100")]
        brightness: u8,
        /// Turn the lightbar off
        #[arg(long)]
        off: bool,
    },
    /// Show the lightbar state
    Show,
}

#[derive(Subcommand, Debug)]
enum AttrAction {
    /// Print an attribute
    Get { name: String },
    /// Write an attribute
    Set { name: String, value: String },
    /// List attributes on this model
    List,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.global)?;
    init_logging(&config, args.global.verbose)?;

    if let Command::Config { save } = args.command {
        return cmd_config(&config, args.global.config.as_ref(), save);
    }

    let device = open_device(&config)?;
    match args.command {
        Command::Status => cmd_status(&device),
        Command::Profile { action } => cmd_profile(&device, action),
        Command::Fan { cpu, gpu } => cmd_fan(&device, &cpu, gpu.as_deref()),
        Command::Keyboard { action } => cmd_keyboard(&device, action),
        Command::Logo { action } => cmd_logo(&device, action),
        Command::Attr { action } => cmd_attr(&device, action),
        Command::Sensors => cmd_sensors(&device),
        Command::Monitor { interval } => cmd_monitor(&device, interval),
        Command::Init => cmd_init(&device),
        Command::Save => cmd_save(&device),
        Command::Resume => cmd_resume(&device),
        Command::Event { frame } => cmd_event(&device, &frame),
        Command::Turbo => cmd_turbo(&device),
        Command::Config { .. } => Ok(()),
    }
}

fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = match &global.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::load_config().context("Failed to load config")?,
    };
    if let Some(model) = &global.model {
        config.model = model.clone();
    }
    if let Some(dir) = &global.state_dir {
        config.state_dir = Some(dir.clone());
    }
    Ok(config)
}

fn init_logging(config: &AppConfig, verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => config.level_filter().context("Invalid log_level in config")?,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialise logging")?;
    Ok(())
}

fn open_device(config: &AppConfig) -> Result<Device> {
    let profile = config.device_profile().context("Invalid model")?;
    let channel = AcpiCallChannel::new(config.acpi.clone());
    if !channel.is_available() {
        bail!(
            "{} not found. Load the acpi_call kernel module and run as root.",
            channel.call_path().display()
        );
    }
    let state_dir = config.state_dir().context("No state directory")?;
    info!("Model {}, state in {}", profile.name, state_dir.display());

    Ok(SenseDevice::new(channel, profile)
        .with_options(config.device_options())
        .with_store(FileBlobStore::new(state_dir)))
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_status(device: &Device) -> Result<()> {
    let profile = device.profile();
    println!("Model:        {}", profile.name);

    let source = device.power_source().context("Failed to read power source")?;
    println!("Power:        {}", source);

    if profile.platform_profile {
        let current = device
            .thermal()
            .get_profile()
            .context("Failed to read thermal profile")?;
        println!("Profile:      {}", current);
    }
    println!("Fans:         {} (last set by this tool)", device.fans().speeds());

    if profile.fan_speed_read {
        for reading in device.sensors().read_all().context("Failed to read sensors")? {
            println!("  {}", reading);
        }
    }

    if profile.has_sense_controls() {
        match device.settings().battery_health() {
            Ok(health) => println!(
                "Battery:      charge limit {}, calibration {}",
                on_off(health.charge_limit),
                on_off(health.calibration)
            ),
            Err(e) => eprintln!("⚠️  Battery health unavailable: {}", e),
        }
    }
    Ok(())
}

fn cmd_profile(device: &Device, action: ProfileAction) -> Result<()> {
    let thermal = device.thermal();
    match action {
        ProfileAction::Get => {
            let profile = thermal.get_profile().context("Failed to read profile")?;
            println!("{} ({})", profile, profile.platform_name());
        }
        ProfileAction::Set { profile } => {
            let target: ThermalProfile = profile.parse()?;
            thermal
                .set_profile(target)
                .with_context(|| format!("Failed to set profile {}", target))?;
            println!("✅ Thermal profile set to {}", target);
        }
        ProfileAction::Cycle => {
            thermal.probe_supported().context("Failed to probe profiles")?;
            let next = thermal.cycle_or_toggle().context("Failed to cycle profile")?;
            println!("✅ Thermal profile is now {}", next);
        }
        ProfileAction::List => {
            let supported = thermal.probe_supported().context("Failed to probe profiles")?;
            let current = thermal.get_profile().ok();
            for profile in supported.iter() {
                let marker = if Some(profile) == current { "*" } else { " " };
                println!("{} {:<12} {}", marker, profile, profile.platform_name());
            }
        }
    }
    Ok(())
}

fn cmd_fan(device: &Device, cpu: &str, gpu: Option<&str>) -> Result<()> {
    let cpu = parse_fan_speed_arg(cpu)?;
    let gpu = match gpu {
        Some(text) => parse_fan_speed_arg(text)?,
        None => cpu,
    };
    device
        .fans()
        .set_speeds(cpu, gpu)
        .context("Failed to set fan speeds")?;
    println!("✅ Fan speeds set: CPU={}%, GPU={}% (0 = auto)", cpu, gpu);
    Ok(())
}

fn cmd_keyboard(device: &Device, action: KeyboardAction) -> Result<()> {
    let lighting = device.lighting();
    match action {
        KeyboardAction::Effect {
            effect,
            speed,
            brightness,
            direction,
            color,
        } => {
            let effect: KeyboardEffect = effect.parse()?;
            let settings = AnimatedSettings {
                effect,
                speed,
                brightness,
                direction,
                color: color.parse::<Rgb>()?,
            };
            let applied = lighting
                .set_animated(settings)
                .context("Failed to set keyboard effect")?;
            println!("✅ Keyboard effect {} ({})", effect, applied);
        }
        KeyboardAction::Zones { colors, brightness } => {
            let text = format!("{},{}", colors.join(","), brightness);
            let settings: PerZoneSettings = text.parse()?;
            lighting
                .set_per_zone(settings)
                .context("Failed to set keyboard zones")?;
            println!("✅ Keyboard zones set to {}", settings);
        }
        KeyboardAction::Show => {
            let view = lighting.get_state().context("Failed to read keyboard")?;
            let effect = KeyboardEffect::from_id(view.animated.effect)
                .map(|e| e.name().to_string())
                .unwrap_or_else(|| format!("unknown ({})", view.animated.effect));
            println!("Active:   {}", if view.per_zone { "per-zone" } else { "animated" });
            println!("Effect:   {} ({})", effect, view.animated);
            println!("Zones:    {}", view.zones);
        }
    }
    Ok(())
}

fn cmd_logo(device: &Device, action: LogoAction) -> Result<()> {
    let lighting = device.lighting();
    match action {
        LogoAction::Set {
            color,
            brightness,
            off,
        } => {
            let mut state = LightbarState::lit(color.parse()?, brightness);
            if off {
                state.enabled = false;
            }
            let applied = lighting
                .set_lightbar(state)
                .context("Failed to set lightbar")?;
            println!("✅ Lightbar set to {}", applied);
        }
        LogoAction::Show => {
            let state = lighting.lightbar().context("Failed to read lightbar")?;
            println!(
                "Lightbar: #{} brightness {}% {}",
                state.color,
                state.brightness,
                on_off(state.enabled)
            );
        }
    }
    Ok(())
}

fn cmd_attr(device: &Device, action: AttrAction) -> Result<()> {
    let attributes = Attributes::new(device);
    match action {
        AttrAction::Get { name } => {
            let attribute: Attribute = name.parse()?;
            let value = attributes
                .show(attribute)
                .with_context(|| format!("Failed to read {}", attribute))?;
            println!("{}", value);
        }
        AttrAction::Set { name, value } => {
            let attribute: Attribute = name.parse()?;
            attributes
                .store(attribute, &value)
                .with_context(|| format!("Failed to write {}", attribute))?;
            println!("✅ {} = {}", attribute, value.trim());
        }
        AttrAction::List => {
            for attribute in attributes.list() {
                let mode = match (attribute.is_readable(), attribute.is_writable()) {
                    (true, true) => "rw",
                    (true, false) => "r-",
                    _ => "-w",
                };
                println!("{} {:<26} {}", mode, attribute, attribute.format());
            }
        }
    }
    Ok(())
}

fn cmd_sensors(device: &Device) -> Result<()> {
    let sensors = device.sensors();
    let mask = sensors.supported().context("Failed to query sensors")?;
    println!("Supported sensor mask: {:#06x}\n", mask.0);

    for sensor in Sensor::ALL {
        if !mask.is_visible(sensor) {
            println!("  {:<16} not reported", sensor);
            continue;
        }
        match sensors.read(sensor) {
            Ok(reading) => println!("  {}", reading),
            Err(e) => println!("  {:<16} read error: {}", sensor, e),
        }
    }
    Ok(())
}

fn cmd_monitor(device: &Device, interval_secs: u64) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    println!("🌡️  Monitoring {} (Ctrl+C to stop)...", device.profile().name);

    while running.load(Ordering::SeqCst) {
        print!("\x1B[2J\x1B[1;1H");
        match device.thermal().get_profile() {
            Ok(profile) => println!("Profile: {}", profile),
            Err(e) => eprintln!("⚠️  Profile read error: {}", e),
        }
        match device.sensors().read_all() {
            Ok(readings) => {
                for reading in readings {
                    println!("  {}", reading);
                }
            }
            Err(e) => eprintln!("⚠️  Sensor read error: {}", e),
        }

        std::thread::sleep(Duration::from_secs(interval_secs));
    }

    println!("\n👋 Monitoring stopped.");
    Ok(())
}

fn cmd_init(device: &Device) -> Result<()> {
    let report = device.start().context("Startup failed")?;
    if let Some(profiles) = report.profiles {
        println!("Profiles: {}", profiles);
    }
    if let Some(Ok(source)) = report.power {
        println!("Restored {} state", source);
    }
    if let Some(Ok(true)) = report.keyboard {
        println!("Restored keyboard lighting");
    }
    if report.is_clean() {
        println!("✅ Device initialised");
        Ok(())
    } else {
        bail!("Device initialised with errors (see log)")
    }
}

fn cmd_save(device: &Device) -> Result<()> {
    let report = device.stop();
    if report.is_clean() {
        println!("✅ State saved");
        Ok(())
    } else {
        bail!("Saving state failed (see log)")
    }
}

fn cmd_resume(device: &Device) -> Result<()> {
    match device.resume() {
        Some(report) if !report.is_clean() => bail!("Lighting wake failed (see log)"),
        Some(_) => println!("✅ Lighting engine woken"),
        None => println!("Nothing to do on {}", device.profile().name),
    }
    Ok(())
}

fn cmd_event(device: &Device, frame: &str) -> Result<()> {
    let bytes = parse_hex_bytes(frame)?;
    let profile: &DeviceProfile = device.profile();
    let tracks_power = profile.handles_ac_events();
    if tracks_power {
        device.power_states().load();
    }

    let outcome = device.events().dispatch(&bytes);
    if tracks_power && matches!(outcome, DispatchOutcome::PowerSwitched { .. }) {
        device
            .power_states()
            .persist()
            .context("Failed to save power states")?;
    }

    match outcome {
        DispatchOutcome::Malformed(e) => bail!("Malformed frame: {}", e),
        DispatchOutcome::Failed(e) => bail!("Event handler failed: {}", e),
        DispatchOutcome::Ignored(event) => println!("Ignored {:?}", event),
        DispatchOutcome::TurboToggled { was_on } => {
            println!("✅ Turbo {}", on_off(!was_on))
        }
        DispatchOutcome::ProfileChanged(profile) => println!("✅ Profile changed to {}", profile),
        DispatchOutcome::PowerSwitched { to } => println!("✅ Switched to {} state", to),
        DispatchOutcome::CalibrationForwarded { enabled } => {
            println!("✅ Battery calibration {}", on_off(enabled))
        }
    }
    Ok(())
}

fn cmd_turbo(device: &Device) -> Result<()> {
    let was_on = device
        .thermal()
        .toggle_turbo()
        .context("Failed to toggle turbo")?;
    println!("✅ Turbo {}", on_off(!was_on));
    Ok(())
}

fn cmd_config(config: &AppConfig, path: Option<&PathBuf>, save: bool) -> Result<()> {
    let text = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", text);
    if save {
        let written = match path {
            Some(path) => {
                config::save_config_to(config, path)?;
                path.clone()
            }
            None => config::save_config(config)?,
        };
        println!("✅ Config saved to {}", written.display());
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
