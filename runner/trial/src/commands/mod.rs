//! Command handlers for the trial CLI.


pub use test::{parse_test_args, run_tests, TestOptions, DEFAULT_CONFIG_FILE, FATAL_EXIT_CODE};
