//! `interlock-cli` – runs the control loops against simulated lamps.
//!
//! 1. Initialises tracing and loads `~/.interlock/config.toml`.
//! 2. Brings up the SAFE/UNSAFE indicator.  A lamp that is not ready is
//!    fatal: the loops are never started.
//! 3. Starts the producer, consumer and monitor threads and prints safety
//!    alerts as they arrive.
//! 4. Stops on Ctrl-C, a latch trip or after `run_for_secs`, then prints a
//!    summary.  Exits 0 when the latch never tripped and 2 when it did.

mod config;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

use interlock_hal::{LampPair, SimRelay};
use interlock_middleware::{EventBus, SinkSet, Topic, TopicReceiver, TracingSink};
use interlock_runtime::{ControlSystem, SystemReport, init_tracing};
use interlock_types::{Event, EventPayload, IndicatorState};

/// How often the main thread prints alerts and checks stop conditions.  Only
/// violations and the UNSAFE transition are printed; accepted high-intensity
/// commands are counted in the summary instead.
const TICK: Duration = Duration::from_millis(100);

fn main() -> ExitCode {
    let _otel = init_tracing("interlock");
    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => config::Config::from_env(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::from_env()
        }
    };
    print_settings(&cfg);

    // ── Indicator bring-up ────────────────────────────────────────────────
    let lamps = match LampPair::new(
        SimRelay::new(cfg.safe_lamp.clone()),
        SimRelay::new(cfg.unsafe_lamp.clone()),
    ) {
        Ok(lamps) => lamps,
        Err(e) => {
            error!(error = %e, "indicator bring-up failed");
            println!("{}: {}", "Startup aborted".red().bold(), e);
            return ExitCode::from(1);
        }
    };

    // ── Observability ─────────────────────────────────────────────────────
    let bus = EventBus::new(cfg.bus_capacity.max(1));
    let mut alerts = [
        bus.subscribe_to(Topic::Safety),
        bus.subscribe_to(Topic::Indicator),
    ];
    let sinks = SinkSet::new()
        .with(Arc::new(TracingSink))
        .with(Arc::new(bus));

    // ── Control loops ─────────────────────────────────────────────────────
    let system = ControlSystem::new(cfg.to_system_config());
    let running = match system.start(Box::new(lamps), Arc::new(sinks)) {
        Ok(running) => running,
        Err(e) => {
            error!(error = %e, "failed to start control loops");
            println!("{}: {}", "Startup aborted".red().bold(), e);
            return ExitCode::from(1);
        }
    };

    let shutdown = running.shutdown_signal();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping control loops …".yellow().bold());
        shutdown.request();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop with a trip or run_for_secs");
    }

    println!("  {}\n", "Control loops running.  Press Ctrl-C to stop.".green());

    let deadline = cfg
        .run_for_secs
        .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
    loop {
        let stopped = running.wait_for_trip(TICK) || running.shutdown_signal().is_requested();
        print_alerts(&mut alerts);
        if stopped || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }

    running.request_shutdown();
    let report = match running.join() {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "control loop failed");
            println!("{}: {}", "Run failed".red().bold(), e);
            return ExitCode::from(1);
        }
    };
    print_alerts(&mut alerts);
    print_summary(&report);

    if report.cause.is_some() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _       __            __           __  "#.bold().cyan());
    println!("{}", r#"  (_)___  / /____  _____/ /___  _____/ /__"#.bold().cyan());
    println!("{}", r#" / / __ \/ __/ _ \/ ___/ / __ \/ ___/ //_/"#.bold().cyan());
    println!("{}", r#"/ / / / / /_/  __/ /  / / /_/ / /__/ ,<   "#.bold().cyan());
    println!("{}", r#"_/_/ /_/\__/\___/_/  /_/\____/\___/_/|_|  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "interlock".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Guarded command exchange with a fail-safe latch");
    println!();
}

fn print_settings(cfg: &config::Config) {
    println!(
        "  lock scope: {:?}   publish: {:?}   unsafe combination: {:?}",
        cfg.lock_scope, cfg.publish_policy, cfg.unsafe_combination
    );
    println!(
        "  lamps: SAFE={}  UNSAFE={}\n",
        cfg.safe_lamp.bold(),
        cfg.unsafe_lamp.bold()
    );
}

fn print_alerts(alerts: &mut [TopicReceiver]) {
    for rx in alerts {
        for event in rx.drain() {
            print_alert(&event);
        }
    }
}

fn print_alert(event: &Event) {
    match &event.payload {
        EventPayload::Violation { kind, message, .. } => println!(
            "  {} [{}] {}",
            "VIOLATION".red().bold(),
            kind.to_string().red(),
            message
        ),
        EventPayload::IndicatorChanged(IndicatorState::Unsafe) => {
            println!("  {}", "■ INDICATOR LATCHED UNSAFE".on_red().white().bold())
        }
        _ => {}
    }
}

fn print_summary(report: &SystemReport) {
    println!();
    println!("{}", "  ── Run summary ──".bold());
    println!(
        "  producer: {} published, {} skipped, last seq {} ({:?})",
        report.producer.published,
        report.producer.skipped,
        report.producer.last_sequence,
        report.producer.exit
    );
    println!(
        "  consumer: {} consumed, {} warnings, last seq {} ({:?})",
        report.consumer.consumed,
        report.consumer.warnings,
        report.consumer.last_sequence,
        report.consumer.exit
    );
    println!(
        "  monitor:  {} polls ({:?})",
        report.monitor.polls, report.monitor.exit
    );
    match report.cause {
        Some(cause) => println!(
            "  latch:    {} ({})",
            "TRIPPED".red().bold(),
            cause.to_string().red()
        ),
        None => println!("  latch:    {}", "OK".green().bold()),
    }
    println!();
}
