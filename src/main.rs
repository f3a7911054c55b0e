use crossbeam_channel::{bounded, unbounded, Receiver};
use pulse_monitor::collaborators::{
    BatteryGauge, Clock, MemoryProbe, MonotonicClock, SimulatedBattery, SimulatedMemory,
};
use pulse_monitor::config::Config;
use pulse_monitor::console::{self, Command};
use pulse_monitor::error::SamplerError;
use pulse_monitor::monitor::Monitor;
use pulse_monitor::notify::{ChannelNotifier, Notification};
use pulse_monitor::sensor::{spawn_sampler, SensorUpdate, SimulatedPpgSensor, SimulatedProfile};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Samples the sampler may queue before the tick loop drains them
const SAMPLE_QUEUE_DEPTH: usize = 256;
const BATTERY_START_LEVEL: f32 = 100.0;
const BATTERY_DRAIN_PER_MINUTE: f32 = 1.5;
/// Simulated memory pressure on every Nth memory check
const MEMORY_PRESSURE_PERIOD: u32 = 4;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--reset-config") {
        match Config::default().save() {
            Ok(()) => log::info!("Default config written"),
            Err(e) => log::error!("{}", e),
        }
        return;
    }

    let export_path = args
        .iter()
        .position(|arg| arg == "--export")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}; running with defaults", e);
            Config::default()
        }
    };

    // The tick loop is single-threaded; only the sampler runs concurrently
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to create runtime: {}", e);
            return;
        }
    };

    if let Err(e) = runtime.block_on(run(config, export_path)) {
        log::error!("{}", e);
    }
}

fn every(ms: u64) -> Interval {
    let mut tick = interval(Duration::from_millis(ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick
}

async fn run(config: Config, export_path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let clock = MonotonicClock::new();
    let (sample_sender, sample_receiver) = bounded::<SensorUpdate>(SAMPLE_QUEUE_DEPTH);
    let (notify_sender, notify_receiver) = unbounded::<Notification>();
    let (command_sender, command_receiver) = unbounded::<Command>();

    let sensor = SimulatedPpgSensor::new(SimulatedProfile::default(), config.sensor.sample_interval_ms);
    let sampler = spawn_sampler(
        sensor,
        clock,
        Duration::from_millis(config.sensor.sample_interval_ms),
        sample_sender,
    )?;
    let display = spawn_display(notify_receiver)?;
    // Detached: blocks on stdin until EOF
    console::spawn_reader(command_sender)?;
    log::info!("{}", console::HELP);

    let mut notifier = ChannelNotifier::new(notify_sender);
    let mut battery = SimulatedBattery::new(clock, BATTERY_START_LEVEL, BATTERY_DRAIN_PER_MINUTE);
    let mut memory = SimulatedMemory::new(MEMORY_PRESSURE_PERIOD);

    let schedule = config.schedule.clone();
    let mut monitor = Monitor::new(config);

    let mut aggregate_tick = every(schedule.aggregate_interval_ms);
    let mut alert_tick = every(schedule.alert_check_interval_ms);
    let mut history_tick = every(schedule.history_log_interval_ms);
    let mut memory_tick = every(schedule.memory_check_interval_ms);
    let mut status_tick = every(schedule.status_interval_ms);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    log::info!("Monitoring started");

    loop {
        tokio::select! {
            _ = aggregate_tick.tick() => {
                let report = monitor.drain(&sample_receiver);
                if report.sampler_stopped {
                    log::warn!("Sampler stopped unexpectedly, shutting down");
                    break;
                }
                if report.beats > 0 {
                    log::trace!("{} samples, {} beats", report.samples, report.beats);
                }

                for command in command_receiver.try_iter() {
                    apply_command(&mut monitor, command);
                }

                monitor.aggregate(battery.level(), clock.now_ms());
                // Polled at the fast cadence; the engine paces reminders itself
                monitor.remind(clock.now_ms(), &mut notifier);
            }
            _ = alert_tick.tick() => {
                let created = monitor.check_alerts(clock.now_ms(), &mut notifier);
                if created > 0 {
                    log::debug!("{} new alert(s)", created);
                }
            }
            _ = history_tick.tick() => {
                monitor.log_history();
            }
            _ = memory_tick.tick() => {
                if memory.is_low() {
                    let reclaimed = monitor.on_low_memory();
                    log::info!(
                        "Low memory: released {} history and {} alert history entries",
                        reclaimed.history_entries,
                        reclaimed.alert_history_entries
                    );
                }
            }
            _ = status_tick.tick() => {
                log_status(&monitor);
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                }
                log::info!("Shutting down");
                break;
            }
        }
    }

    // Closing the receiver first keeps the sampler from blocking on its final send
    drop(sample_receiver);
    match sampler.stop() {
        Ok(()) | Err(SamplerError::Disconnected) => {}
        Err(e) => log::error!("{}", e),
    }

    drop(notifier);
    if display.join().is_err() {
        log::error!("Display thread panicked");
    }

    log_status(&monitor);
    if let Some(path) = export_path {
        std::fs::write(&path, monitor.history().to_csv())?;
        log::info!(
            "Exported {} history entries to {}",
            monitor.history().len(),
            path.display()
        );
    }

    Ok(())
}

fn apply_command(monitor: &mut Monitor, command: Command) {
    match command {
        Command::Acknowledge(index) => {
            if monitor.acknowledge(index) {
                log::info!("Alert {} acknowledged", index);
            } else {
                log::warn!("No active alert at index {}", index);
            }
        }
        Command::ClearAlerts => {
            monitor.clear_alerts();
            log::info!("Active alerts cleared");
        }
        Command::ResetSensor => {
            monitor.reset_sensor();
            log::info!("Sensor state reset");
        }
        Command::Status => log_status(monitor),
        Command::ExportCsv => println!("{}", monitor.history().to_csv()),
    }
}

fn log_status(monitor: &Monitor) {
    let vitals = monitor.vitals();
    if vitals.finger_detected {
        log::info!(
            "HR {:.0} BPM | SpO2 {:.0}% | battery {:.0}%",
            vitals.heart_rate,
            vitals.spo2,
            vitals.battery_level
        );
    } else {
        log::info!("No finger | battery {:.0}%", vitals.battery_level);
    }

    for (index, alert) in monitor.active_alerts().enumerate() {
        log::info!(
            "  [{}] {} {}{}",
            index,
            alert.severity,
            alert.message,
            if alert.acknowledged { " (ack)" } else { "" }
        );
    }
    if monitor.alerts().has_unacknowledged() {
        log::info!("  type `ack <n>` to acknowledge");
    }

    let history = monitor.history();
    match history.stats() {
        Some(stats) => log::info!(
            "History {}/{}: HR {:.0}-{:.0} (mean {:.1}), SpO2 mean {:.1}",
            history.len(),
            history.capacity(),
            stats.heart_rate_min,
            stats.heart_rate_max,
            stats.heart_rate_mean,
            stats.spo2_mean
        ),
        None => log::info!("History 0/{}", history.capacity()),
    }
}

/// Stand-in for the display and buzzer: prints each notification with a
/// wall-clock stamp and plays its beep pattern on the terminal bell.
fn spawn_display(receiver: Receiver<Notification>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("display".to_string())
        .spawn(move || {
            for notification in receiver.iter() {
                println!(
                    "[{}] {} {}",
                    chrono::Local::now().format("%H:%M:%S"),
                    notification.severity,
                    notification.message
                );

                let pattern = notification.pattern;
                for pulse in 0..pattern.pulses {
                    print!("\x07");
                    let _ = std::io::stdout().flush();
                    thread::sleep(Duration::from_millis(u64::from(pattern.on_ms)));
                    if pulse + 1 < pattern.pulses {
                        thread::sleep(Duration::from_millis(u64::from(pattern.gap_ms)));
                    }
                }
            }
        })
}
