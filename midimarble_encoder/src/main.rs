// MidiMarble encoder CLI entry point.
//
// Converts a Standard MIDI File into a `.mdbl` layout file for the player.
// The pipeline: parse MIDI -> plan walls and ball path -> write JSON.
//
// Usage:
//   cargo run -p midimarble_encoder -- <input.mid> [-o|--output out.mdbl]
//     [--seed N] [--config layout.json]
//
// The output defaults to the input path with its extension replaced by
// `.mdbl`. The seed defaults to `midimarble_prng::DEFAULT_SEED`, so runs
// are reproducible unless a seed is given. Set RUST_LOG=debug (or trace)
// for planner diagnostics.

use midimarble_encoder::encode_song;
use midimarble_encoder::mdbl::write_mdbl;
use midimarble_encoder::midi::read_midi;
use midimarble_layout::{LayoutConfig, MarbleRng};
use midimarble_prng::DEFAULT_SEED;
use std::path::{Path, PathBuf};

const USAGE: &str = "Usage: midimarble <input.mid> [-o|--output <out.mdbl>] [--seed <N>] [--config <layout.json>]";

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("MidiMarble encoder: MIDI -> .mdbl");
        println!("{}", USAGE);
        return;
    }

    let Some(input) = positional(&args) else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };
    let input = Path::new(input);
    if !input.exists() {
        eprintln!("Error: file not found - {}", input.display());
        std::process::exit(1);
    }
    let output: PathBuf = parse_flag::<String>(&args, &["-o", "--output"])
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension("mdbl"));
    let seed: u64 = parse_flag(&args, &["--seed"]).unwrap_or(DEFAULT_SEED);

    let config = match parse_flag::<String>(&args, &["--config"]) {
        Some(path) => match LayoutConfig::load(Path::new(&path)) {
            Ok(c) => {
                println!("Loaded layout config from {}", path);
                c
            }
            Err(e) => {
                eprintln!("Error: failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => LayoutConfig::default(),
    };

    println!("[1/3] Parsing MIDI file: {}", input.display());
    let song = match read_midi(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "      {} notes, BPM={}, duration={:.0}ms, {} instruments",
        song.notes.len(),
        song.meta.bpm,
        song.meta.total_time_ms,
        song.instruments.len()
    );

    println!("[2/3] Planning paths (seed {})...", seed);
    let mut rng = MarbleRng::new(seed);
    let (layout, doc) = match encode_song(&song, &config, &mut rng) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let stats = &layout.stats;
    println!(
        "      {} walls, {} ball-path keyframes",
        stats.walls,
        layout.ball_path.len()
    );
    println!(
        "      splitters={}, mergers={}, child walls={}",
        stats.splitters, stats.mergers, stats.child_walls
    );
    println!(
        "      backtracks={}/{}, forced={}, overlaps={}",
        stats.backtracks, stats.backtrack_budget, stats.forced_placements, stats.overlaps
    );

    println!("[3/3] Writing {}", output.display());
    match write_mdbl(&doc, &output) {
        Ok(bytes) => {
            println!();
            println!("Done! File size: {:.1} KB", bytes as f64 / 1024.0);
        }
        Err(e) => {
            eprintln!("Error writing {}: {}", output.display(), e);
            std::process::exit(1);
        }
    }
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        if arg.starts_with('-') {
            i += 2;
            continue;
        }
        return Some(arg.as_str());
    }
    None
}

fn parse_flag<T: std::str::FromStr>(args: &[String], names: &[&str]) -> Option<T> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
