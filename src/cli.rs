use std::path::PathBuf;

use refmaster::events::{EventLevel, EventSink};
use refmaster::{process, BitDepth, Config, LimiterConfig, ResultSpec};

/// Sink that renders engine events on stderr.
struct StderrSink {
    verbose: bool,
}

impl EventSink for StderrSink {
    fn emit(&self, code: u16, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => {
                if self.verbose {
                    eprintln!("[{}] {}", code, message);
                }
            }
            EventLevel::Warning => eprintln!("[{}] WARNING: {}", code, message),
            EventLevel::Error => eprintln!("[{}] ERROR: {}", code, message),
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        print_usage();
        std::process::exit(1);
    }

    let target = &args[1];
    let reference = &args[2];
    let output = &args[3];

    let mut bit_depth = BitDepth::Pcm16;
    let mut use_limiter = true;
    let mut normalize = false;
    let mut preview = false;
    let mut verbose = false;
    let mut config = Config::default();
    let mut limiter = LimiterConfig::default();

    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--24bit" => bit_depth = BitDepth::Pcm24,
            "--float" => bit_depth = BitDepth::Float32,
            "--no-limiter" => use_limiter = false,
            "--normalize" | "-n" => normalize = true,
            "--preview" => preview = true,
            "--verbose" | "-v" => verbose = true,
            "--fft-size" => {
                i += 1;
                config = config.with_fft_size(parse_usize(&args, i, "fft-size"));
            }
            "--piece-seconds" => {
                i += 1;
                config = config.with_piece_size_seconds(parse_f32(&args, i, "piece-seconds"));
            }
            "--correction-steps" => {
                i += 1;
                config =
                    config.with_rms_correction_steps(parse_usize(&args, i, "correction-steps"));
            }
            "--threshold" => {
                i += 1;
                limiter = limiter.with_threshold(parse_f32(&args, i, "threshold"));
            }
            "--cache-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("ERROR: --cache-dir requires a value");
                    std::process::exit(1);
                }
                config = config.with_reference_cache_folder(PathBuf::from(&args[i]));
            }
            "--allow-equality" => config = config.with_allow_equality(true),
            other => {
                eprintln!("ERROR: Unknown option '{}'", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }
    config = config.with_limiter(limiter);

    let mut spec = ResultSpec::new(output, bit_depth);
    if !use_limiter {
        spec = spec.without_limiter();
    }
    if normalize {
        spec = spec.with_normalize();
    }
    if preview {
        spec = spec.with_preview();
    }

    if verbose {
        eprintln!("TARGET:    {}", target);
        eprintln!("REFERENCE: {}", reference);
        eprintln!("OUTPUT:    {} ({:?})", output, bit_depth);
        eprintln!(
            "FFT size {}, piece {} s, {} correction steps",
            config.fft_size, config.piece_size_seconds, config.rms_correction_steps
        );
    }

    let sink = StderrSink { verbose };
    let start = std::time::Instant::now();

    match process(target, reference, &[spec], &config, &sink) {
        Ok(()) => {
            eprintln!(
                "Mastered '{}' against '{}' in {:.2}s -> {}",
                target,
                reference,
                start.elapsed().as_secs_f64(),
                output
            );
        }
        Err(e) => {
            eprintln!("ERROR {}: {}", e.code(), e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: refmaster-cli <target.wav> <reference.wav> <output.wav> [options]");
    eprintln!();
    eprintln!("Masters TARGET so its loudness, spectrum, peak and stereo width");
    eprintln!("match REFERENCE.");
    eprintln!();
    eprintln!("Output options:");
    eprintln!("  --24bit               Write 24-bit PCM (default: 16-bit)");
    eprintln!("  --float               Write 32-bit float");
    eprintln!("  --no-limiter          Skip the brickwall limiter");
    eprintln!("  --normalize, -n       Peak-normalize (with --no-limiter)");
    eprintln!("  --preview             Write the loudest excerpt only");
    eprintln!();
    eprintln!("Engine options:");
    eprintln!("  --fft-size <N>        Analysis FFT size, power of two (default: 32768)");
    eprintln!("  --piece-seconds <f>   Analysis piece length (default: 15)");
    eprintln!("  --correction-steps <N> RMS correction iterations (default: 4)");
    eprintln!("  --threshold <f>       Limiter ceiling, linear (default: ~0.9981)");
    eprintln!("  --cache-dir <dir>     Reference statistics cache directory");
    eprintln!("  --allow-equality      Permit TARGET == REFERENCE");
    eprintln!("  --verbose, -v         Show info events and parameters");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  refmaster-cli mix.wav ref.wav mastered.wav");
    eprintln!("  refmaster-cli mix.wav ref.wav mastered.wav --24bit --cache-dir ~/.refmaster");
    eprintln!("  refmaster-cli mix.wav ref.wav check.wav --preview --verbose");
}

fn parse_f32(args: &[String], idx: usize, name: &str) -> f32 {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    match args[idx].parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("ERROR: Invalid {}: {}", name, args[idx]);
            std::process::exit(1);
        }
    }
}

fn parse_usize(args: &[String], idx: usize, name: &str) -> usize {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    match args[idx].parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("ERROR: Invalid {}: {}", name, args[idx]);
            std::process::exit(1);
        }
    }
}
