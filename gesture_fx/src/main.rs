//! gesture_fx: interactive entry point.

use gesture_fx::app::{run, AppConfig};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        gesture_fx — Hand-Driven Particle & Ripple Engine      ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let cfg = if std::env::args().any(|a| a == "--quick") {
        println!("  Quick-start: default sensitivity, scale and thresholds\n");
        AppConfig::default()
    } else {
        configure_interactively()
    };

    println!();
    println!("  Opening preview window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure_interactively() -> AppConfig {
    let defaults = AppConfig::default();
    let base = defaults.engine;

    let sensitivity: f32 = read_line("  Pointer sensitivity 0–1 (default 0.3): ")
        .trim().parse().unwrap_or(base.sensitivity);

    let particle_scale: f32 = loop {
        let s = read_line("  Particle scale (default 1.0): ")
            .trim().parse().unwrap_or(base.particle_scale);
        if s > 0.0 && s <= 4.0 { break s; }
        println!("    ⚠  0–4 only.");
    };

    let pinch: f32 = loop {
        let p = read_line("  Pinch threshold (default 0.045): ")
            .trim().parse().unwrap_or(base.gesture.pinch_threshold);
        if p > 0.0 && p < 0.5 { break p; }
        println!("    ⚠  0–0.5 only.");
    };

    let seed: u64 = read_line("  Random seed (default 24301): ")
        .trim().parse().unwrap_or(base.seed);

    AppConfig {
        engine: base
            .with_sensitivity(sensitivity)
            .with_particle_scale(particle_scale)
            .with_pinch_threshold(pinch)
            .with_seed(seed),
        ..defaults
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
