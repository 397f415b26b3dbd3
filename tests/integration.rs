use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn run_bin(args: &[&str]) -> Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_groupsir"));
    Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command")
}

fn run_bin_ok(args: &[&str]) -> String {
    let output = run_bin(args);

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stdout_str.to_string()
}

fn fresh_dir(name: &str, config_contents: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    fs::write(test_dir.join("config.toml"), config_contents)
        .expect("failed to write config file");

    test_dir
}

fn parse_table(table: &str) -> Vec<Vec<usize>> {
    table
        .lines()
        .map(|line| {
            line.split_whitespace()
                .map(|val| val.parse().expect("failed to parse count"))
                .collect()
        })
        .collect()
}

fn read_table(path: &Path) -> Vec<Vec<usize>> {
    parse_table(&fs::read_to_string(path).expect("failed to read table"))
}

#[test]
fn basic_workflow() {
    let config_contents = String::new()
        + "[model]\n"
        + "n_agents = 1000\n"
        + "n_groups = 10\n"
        + "prob_infection = 0.1\n"
        + "prob_recovery = 0.14285714285714285\n"
        + "r0 = 1.5\n"
        + "contact_rate_reduction = 0.5\n"
        + "\n"
        + "[run]\n"
        + "n_steps = 100\n"
        + "seed = 42\n";

    let test_dir = fresh_dir("basic_workflow", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin_ok(&["--sim-dir", test_dir_str, "create"]);
    run_bin_ok(&["--sim-dir", test_dir_str, "create"]);

    let table = read_table(&test_dir.join("run-0000").join("curve.txt"));
    assert_eq!(table.len(), 100);
    for row in &table {
        assert_eq!(row.len(), 3);
        assert_eq!(row.iter().sum::<usize>(), 1000);
    }
    for pair in table.windows(2) {
        assert!(pair[1][2] >= pair[0][2]);
    }

    let stdout = run_bin_ok(&["--sim-dir", test_dir_str, "print", "--run-idx", "1"]);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("Epidemic curve (columns: S, I, R):"));
    let printed = parse_table(&lines.collect::<Vec<_>>().join("\n"));
    assert_eq!(printed, read_table(&test_dir.join("run-0001").join("curve.txt")));

    run_bin_ok(&["--sim-dir", test_dir_str, "analyze"]);
    let results =
        fs::read_to_string(test_dir.join("analysis.json")).expect("failed to read results");
    assert!(results.contains("\"n_runs\": 2"));
    assert!(results.contains("attack_rate"));

    run_bin_ok(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!test_dir.join("run-0000").exists());
    assert!(!test_dir.join("analysis.json").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn same_seed_same_table() {
    let config_contents = "[model]\nn_agents = 200\nn_groups = 4\n\n[run]\nn_steps = 40\n";

    let dir_a = fresh_dir("same_seed_a", config_contents);
    let dir_b = fresh_dir("same_seed_b", config_contents);
    for dir in [&dir_a, &dir_b] {
        let dir_str = dir.to_str().expect("failed to convert directory to string");
        run_bin_ok(&["--sim-dir", dir_str, "create"]);
    }

    assert_eq!(
        read_table(&dir_a.join("run-0000").join("curve.txt")),
        read_table(&dir_b.join("run-0000").join("curve.txt"))
    );

    fs::remove_dir_all(&dir_a).ok();
    fs::remove_dir_all(&dir_b).ok();
}

#[test]
fn uneven_groups_fail() {
    let test_dir = fresh_dir("uneven_groups", "[model]\nn_agents = 1001\nn_groups = 10\n");
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--sim-dir", test_dir_str, "create"]);
    assert!(!output.status.success());
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}
