//! Resona Player - console audio player with live spectrum display
//!
//! Usage: `resona-player <file> [file...]`
//!
//! Transport commands are read line-by-line from stdin:
//! `play`, `pause` (toggles), `stop`, `next`, `prev`, `seek <percent>`,
//! `vol <0-100>`, `shuffle on|off`, `repeat on|off`, `repeat-one on|off`,
//! `list`, `quit`.

mod visualizer;

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use crossbeam::channel::{unbounded, Receiver};

use resona_core::analyzer;
use resona_core::config::PlayerConfig;
use resona_core::controller::{TransportController, TransportEvent};
use resona_core::PlayState;

use visualizer::ConsoleVisualizer;

const SPECTRUM_WIDTH: usize = 48;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> anyhow::Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        bail!("usage: resona-player <file> [file...]");
    }

    log::info!("resona-player starting with {} file(s)", files.len());

    let mut controller = TransportController::new();
    controller.apply_config(&PlayerConfig::default());
    controller.add_files(&files);

    let sink = Arc::new(ConsoleVisualizer::new());
    controller.set_sink(sink.clone());
    let _analyzer = analyzer::spawn(controller.mailbox(), sink.clone());

    controller.play().context("failed to start playback")?;
    print_track(&controller);

    let commands = spawn_stdin_reader();
    let atomics = controller.atomics();

    loop {
        while let Ok(line) = commands.try_recv() {
            let mut parts = line.split_whitespace();
            match (parts.next().unwrap_or(""), parts.next()) {
                ("quit" | "q", _) => {
                    controller.stop();
                    println!();
                    return Ok(());
                }
                ("play", _) => {
                    if controller.state() == PlayState::Stopped {
                        report(controller.play());
                    } else {
                        controller.resume();
                    }
                }
                ("pause" | "p", _) => controller.toggle_play(),
                ("stop" | "s", _) => controller.stop(),
                ("next" | "n", _) => report(controller.next()),
                ("prev" | "b", _) => report(controller.prev()),
                ("seek", Some(arg)) => match arg.parse::<f64>() {
                    Ok(percent) => controller.seek_to_fraction(percent / 100.0),
                    Err(_) => println!("seek takes a percentage, e.g. `seek 50`"),
                },
                ("vol", Some(arg)) => match arg.parse::<u8>() {
                    Ok(percent) => controller.set_volume(percent),
                    Err(_) => println!("vol takes 0-100"),
                },
                ("shuffle", flag) => controller.set_shuffle(parse_flag(flag)),
                ("repeat", flag) => controller.set_repeat_all(parse_flag(flag)),
                ("repeat-one", flag) => controller.set_repeat_one(parse_flag(flag)),
                ("list", _) => {
                    for (i, track) in controller.playlist().tracks().iter().enumerate() {
                        let marker = if i == controller.playlist().index() { ">" } else { " " };
                        println!("{} {:3}  {} - {}", marker, i, track.artist, track.title);
                    }
                }
                ("", _) => {}
                (other, _) => println!("unknown command: {other}"),
            }
        }

        while let Some(event) = controller.poll() {
            match event {
                TransportEvent::TrackChanged { .. } => print_track(&controller),
                TransportEvent::PlaybackFinished => {
                    println!();
                    log::info!("Track finished");
                }
            }
        }

        // Progress + spectrum on one status line
        if let Some(bars) = sink.render_bars(SPECTRUM_WIDTH) {
            let progress = atomics.progress();
            print!("\r[{:5.1}%] {} ", progress * 100.0, bars);
            let _ = std::io::stdout().flush();
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn print_track(controller: &TransportController) {
    if let Some(track) = controller.playlist().current() {
        println!("\nNow playing: {} - {}", track.artist, track.title);
    }
}

fn report(result: resona_core::Result<()>) {
    if let Err(e) = result {
        println!("error: {e}");
    }
}

fn parse_flag(arg: Option<&str>) -> bool {
    !matches!(arg, Some("off" | "0" | "false"))
}

/// Read stdin lines on a dedicated thread so the main loop never blocks
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    std::thread::Builder::new()
        .name("resona-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        })
        .expect("failed to spawn stdin reader");
    rx
}
