use std::{env, fs, path::PathBuf, process::Command};

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[model]\n"
        + "width = 10\n"
        + "height = 10\n"
        + "transmissibility = 0.2\n"
        + "mobility = 0.5\n"
        + "mean_disease_duration = 10.0\n"
        + "\n"
        + "[init]\n"
        + "n_agents = 120\n"
        + "prob_infection = 0.3\n"
        + "seed = 12345\n"
        + "\n"
        + "[output]\n"
        + "steps_per_file = 1024\n"
        + "steps_per_save = 8\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    fn run_bin(args: &[&str]) -> bool {
        let bin = PathBuf::from(env!("CARGO_BIN_EXE_epigrid"));

        let output = Command::new(bin)
            .args(args)
            .output()
            .expect("failed to execute command");

        output.status.success()
    }

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(run_bin(&["--sim-dir", test_dir_str, "create"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "create"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]));

    assert!(!run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "7"]));

    let run_0 = test_dir.join("run-0000");
    for file_idx in 0..3 {
        assert!(run_0.join(format!("trajectory-{file_idx:04}.msgpack")).is_file());
    }
    assert!(run_0.join("checkpoint.msgpack").is_file());

    // Same seed, same history.
    assert_eq!(
        fs::read(run_0.join("trajectory-0000.msgpack")).expect("failed to read trajectory"),
        fs::read(test_dir.join("run-0001").join("trajectory-0000.msgpack"))
            .expect("failed to read trajectory")
    );

    assert!(run_bin(&["--sim-dir", test_dir_str, "analyze"]));
    assert!(run_0.join("results.msgpack").is_file());
    assert!(test_dir.join("run-0001").join("results.msgpack").is_file());

    assert!(run_bin(&["--sim-dir", test_dir_str, "status"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "clean"]));
    assert!(!run_0.join("trajectory-0000.msgpack").exists());
    assert!(run_0.join("checkpoint.msgpack").is_file());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn rejects_invalid_config() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_config");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_contents = r#"
[model]
width = 10
height = 10
transmissibility = 1.5
mobility = 0.5
mean_disease_duration = 10.0

[init]
n_agents = 20
prob_infection = 0.3

[output]
steps_per_file = 64
steps_per_save = 8
"#;
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let output = Command::new(env!("CARGO_BIN_EXE_epigrid"))
        .args(["--sim-dir", test_dir.to_str().expect("non UTF-8 path"), "create"])
        .output()
        .expect("failed to execute command");

    assert!(!output.status.success());
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}
