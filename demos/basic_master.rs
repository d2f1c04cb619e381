//! Minimal mastering run: one 16-bit output with the limiter engaged.
//!
//! Usage: cargo run --example basic_master -- target.wav reference.wav out.wav

use refmaster::events::NullSink;
use refmaster::{process, Config, ResultSpec};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: basic_master <target.wav> <reference.wav> <output.wav>");
        std::process::exit(1);
    }

    match process(
        &args[1],
        &args[2],
        &[ResultSpec::pcm16(&args[3])],
        &Config::default(),
        &NullSink,
    ) {
        Ok(()) => println!("Wrote {}", args[3]),
        Err(e) => {
            eprintln!("ERROR {}: {}", e.code(), e);
            std::process::exit(1);
        }
    }
}
