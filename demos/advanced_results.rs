//! Several output variants from a single run, with progress on stdout and a
//! reference statistics cache.
//!
//! Usage: cargo run --example advanced_results -- target.wav reference.wav out_dir

use std::path::Path;

use refmaster::events::{EventLevel, EventSink};
use refmaster::{process, Config, ResultSpec};

struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, code: u16, level: EventLevel, message: &str) {
        let tag = match level {
            EventLevel::Info => "info",
            EventLevel::Warning => "WARN",
            EventLevel::Error => "FAIL",
        };
        println!("{} [{}] {}", tag, code, message);
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: advanced_results <target.wav> <reference.wav> <out_dir>");
        std::process::exit(1);
    }
    let out = Path::new(&args[3]);

    let config = Config::default().with_reference_cache_folder(out.join("ref-cache"));

    let results = vec![
        // The usual master
        ResultSpec::pcm16(out.join("master_16bit.wav")),
        // A 24-bit version of the same limited signal
        ResultSpec::pcm24(out.join("master_24bit.wav")),
        // Unlimited, for feeding an external mastering chain
        ResultSpec::float32(out.join("unlimited.wav")).without_limiter(),
        // Unlimited but peak-normalized
        ResultSpec::pcm24(out.join("unlimited_normalized.wav"))
            .without_limiter()
            .with_normalize(),
        // A short loudest-section excerpt for quick A/B checks
        ResultSpec::pcm16(out.join("preview.wav")).with_preview(),
    ];

    if let Err(e) = process(&args[1], &args[2], &results, &config, &StdoutSink) {
        eprintln!("ERROR {}: {}", e.code(), e);
        std::process::exit(1);
    }
}
