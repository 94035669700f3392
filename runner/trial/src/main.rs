//! Trial CLI
//!
//! Grouped, isolating test runner for trial scripts.

use trial::commands::{parse_test_args, run_tests, FATAL_EXIT_CODE};

fn main() {
    trial::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    // `trial [flags]` is shorthand for `trial test [flags]`.
    let rest = match args.get(1).map(String::as_str) {
        Some("test") => &args[2..],
        Some("help" | "--help" | "-h") => {
            print_usage();
            return;
        }
        Some("version" | "--version" | "-V") => {
            println!("trial {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Some(arg) if !arg.starts_with('-') => {
            eprintln!("Unknown command: {arg}");
            eprintln!();
            print_usage();
            std::process::exit(FATAL_EXIT_CODE);
        }
        _ => &args[1.min(args.len())..],
    };

    let options = match parse_test_args(rest) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            print_usage();
            std::process::exit(FATAL_EXIT_CODE);
        }
    };
    std::process::exit(run_tests(&options));
}

fn print_usage() {
    println!("Trial - grouped, isolating test runner");
    println!();
    println!("Usage: trial [test] [options]");
    println!();
    println!("Options:");
    println!("  -c, --config <path>          Config file (default: trial.toml)");
    println!("  --coverage / --no-coverage   Override coverage.enabled");
    println!("  -t, --testNamePattern <re>   Skip cases whose name does not match");
    println!("  --testPathPattern <re>       Only run files whose path matches");
    println!("  -v, --verbose                Show passing cases and console output");
    println!("  -w, --maxWorkers <n>         Worker threads");
    println!("  -i, --runInBand              Run files on one worker");
    println!("  -g, --group <name>           Only run the named group (repeatable)");
    println!("  --seed <n>                   Seed for random()");
    println!("  --json                       Print results as JSON");
    println!("  --listTests                  List discovered test files and exit");
    println!("  --passWithNoTests            Exit 0 when no test files are found");
    println!();
    println!("Environment:");
    println!("  TRIAL_LOG                    tracing filter (falls back to RUST_LOG)");
}
