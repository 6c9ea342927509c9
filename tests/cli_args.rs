//! Integration tests for CLI argument handling
//!
//! Runs the binary against a pre-seeded, fresh cache file so no request ever
//! leaves the machine.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_onionscope"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute onionscope")
}

/// Writes a cache file fetched "just now" into `dir` for nick `bot` on host `test`
fn seed_fresh_cache(dir: &Path) {
    let now = chrono::Utc::now().timestamp();
    fs::write(
        dir.join("bot-test.scopes.db"),
        format!(
            "{}\nAries\tYou will be trampled.\nAquarius\tWater everywhere.\nGemini\tBoth wrong.\n",
            now
        ),
    )
    .expect("Should seed cache");
}

fn cache_args(dir: &TempDir) -> Vec<String> {
    vec![
        "--data-dir".to_string(),
        dir.path().to_string_lossy().to_string(),
        "--nick".to_string(),
        "bot".to_string(),
        "--host".to_string(),
        "test".to_string(),
        // Anything that does reach the network fails fast.
        "--base-url".to_string(),
        "http://127.0.0.1:9".to_string(),
    ]
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("onionscope"), "Help should mention onionscope");
    assert!(stdout.contains("--stale-after"), "Help should mention --stale-after");
    assert!(stdout.contains("--data-dir"), "Help should mention --data-dir");
}

#[test]
fn test_invalid_stale_after_prints_error_and_exits() {
    let output = run_cli(&["--stale-after", "0", "aries"]);
    assert!(!output.status.success(), "Expected zero window to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("stale-after"),
        "Should print error message about --stale-after: {}",
        stderr
    );
}

#[test]
fn test_invalid_nick_prints_error_and_exits() {
    let output = run_cli(&["--nick", "a/b", "aries"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--nick"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_one_shot_query_answers_from_fresh_cache() {
    let dir = TempDir::new().unwrap();
    seed_fresh_cache(dir.path());

    let mut args = cache_args(&dir);
    args.push("aq".to_string());
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_cli(&args);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Aquarius: Water everywhere."
    );
}

#[test]
fn test_one_shot_ambiguous_query() {
    let dir = TempDir::new().unwrap();
    seed_fresh_cache(dir.path());

    let mut args = cache_args(&dir);
    args.push("A".to_string());
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_cli(&args);

    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Did you mean Aquarius or Aries?"
    );
}

#[test]
fn test_stdin_commands_are_each_answered() {
    let dir = TempDir::new().unwrap();
    seed_fresh_cache(dir.path());

    let mut child = Command::new(env!("CARGO_BIN_EXE_onionscope"))
        .args(cache_args(&dir))
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn onionscope");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b".scope gem\n.horoscope zzz\n\n.scope\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut replies: Vec<&str> = stdout.lines().collect();
    replies.sort();
    assert_eq!(
        replies,
        vec![
            "Gemini: Both wrong.",
            "I don't recognize that Zodiac Sign.",
            "I need to know which Zodiac Sign you want me to look up.",
        ]
    );
}

#[test]
fn test_unreachable_source_with_empty_cache() {
    let dir = TempDir::new().unwrap();

    let mut args = cache_args(&dir);
    args.extend(["--timeout".to_string(), "2".to_string(), "leo".to_string()]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_cli(&args);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "I couldn't reach the horoscope source. Try again later."
    );
    assert!(
        dir.path().join("bot-test.scopes.db").exists(),
        "Cache file is created even when the fetch fails"
    );
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use onionscope::cli::{Cli, StartupConfig};

    #[test]
    fn test_cli_no_args_reads_stdin() {
        let cli = Cli::parse_from(["onionscope"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(config.query.is_none());
    }

    #[test]
    fn test_cli_sign_is_one_shot_query() {
        let cli = Cli::parse_from(["onionscope", "sagittarius"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.query.as_deref(), Some("sagittarius"));
    }

    #[test]
    fn test_cli_negative_stale_after_is_rejected() {
        let cli = Cli::parse_from(["onionscope", "--stale-after=-5"]);
        assert!(StartupConfig::from_cli(&cli).is_err());
    }
}
