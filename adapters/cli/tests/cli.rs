use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn creepline(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_creepline"))
        .current_dir(env!("CARGO_TARGET_TMPDIR"))
        .env_remove("RUST_LOG")
        .env("LOG_FORMAT", "json")
        .args(args)
        .output()
        .expect("failed to launch the creepline binary")
}

fn config_file(name: &str, contents: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::write(&path, contents).expect("config file written");
    path
}

#[test]
fn help_lists_both_subcommands() {
    let output = creepline(&["--help"]);
    assert!(output.status.success(), "--help exits cleanly");
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("server"), "help mentions the server subcommand:\n{help}");
    assert!(help.contains("client"), "help mentions the client subcommand:\n{help}");
}

#[test]
fn unknown_config_keys_abort_before_running() {
    let path = config_file("creepline-unknown-key.toml", "[client]\nspeed = 3\n");
    let config = path.to_string_lossy().into_owned();
    let output = creepline(&["client", "--config", &config, "--ticks", "1"]);

    assert!(!output.status.success(), "a bad config file is fatal");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("invalid config file"),
        "the error names the config file:\n{stderr}"
    );
}

#[test]
fn local_client_plays_the_requested_ticks() {
    let path = config_file(
        "creepline-local.toml",
        "log_level = \"info\"\n[client]\nticks = 2\n",
    );
    let config = path.to_string_lossy().into_owned();
    let output = creepline(&["client", "--config", &config, "--ticks", "4"]);

    assert!(output.status.success(), "local sessions exit cleanly: {output:?}");
    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("session finished"), "summary is logged:\n{logs}");
    assert!(logs.contains("\"tick\":4"), "the flag overrides the config file:\n{logs}");
}
