use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const ROOT: &str = "/zone/home/grp-intake-youth";

fn intake_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_intake"))
}

struct CliEnv {
    temp: TempDir,
}

impl CliEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let data = temp.path().join("data");
        for (name, content) in [
            ("B12345_10m_echo/I0000001", "a"),
            ("B12345_10m_echo/I0000002", "bc"),
            ("misc/notes.txt", "n"),
        ] {
            let path = data.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Self { temp }
    }

    fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    fn catalog(&self) -> PathBuf {
        self.temp.path().join("catalog.json")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(intake_bin())
            .arg("--catalog")
            .arg(self.catalog())
            .arg("--config")
            .arg(self.temp.path().join("config.toml"))
            .args(args)
            .env("INTAKE_HOME", self.temp.path().join("home"))
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to execute intake CLI")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "command failed: {}\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let stdout = self.run_ok(args);
        serde_json::from_str(&stdout).unwrap_or_else(|err| {
            panic!("failed to parse JSON output: {}\nstdout:\n{}", err, stdout)
        })
    }

    fn import_and_scan(&self) -> Value {
        let data = self.data_dir();
        self.run_ok(&["import", path_str(&data), ROOT]);
        self.run_json(&["scan", ROOT, "--json"])
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is not UTF-8")
}

fn escaped_id() -> String {
    format!("10m\\techo\\tB12345\\tRaw\\t{ROOT}/B12345_10m_echo")
}

#[test]
fn test_scan_json_reports_ok() {
    let env = CliEnv::new();
    let summary = env.import_and_scan();

    assert_eq!(summary["status"], "ok");
    assert_eq!(summary["walk"]["boundaries"], 1);
    assert_eq!(summary["walk"]["unrecognized"], 2);
    assert!(env.catalog().exists());
}

#[test]
fn test_datasets_and_details() {
    let env = CliEnv::new();
    env.import_and_scan();

    let datasets = env.run_json(&["datasets", ROOT, "--json"]);
    let list = datasets.as_array().expect("datasets is not an array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["pseudocode"], "B12345");
    assert_eq!(list[0]["object_count"], 2);

    let id = escaped_id();
    env.run_ok(&["comment", ROOT, &id, "first look"]);
    let details = env.run_json(&["details", ROOT, &id, "--json"]);
    assert_eq!(details["objects"].as_array().unwrap().len(), 2);
    let comment = details["comments"][0].as_str().unwrap();
    assert!(comment.ends_with(":first look"));
}

#[test]
fn test_lock_cycle() {
    let env = CliEnv::new();
    env.import_and_scan();
    let id = escaped_id();

    let output = env.run(&["freeze", ROOT, &id]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("must be locked"));

    env.run_ok(&["lock", ROOT, &id]);
    env.run_ok(&["freeze", ROOT, &id]);
    let details = env.run_json(&["details", ROOT, &id, "--json"]);
    assert_eq!(details["summary"]["lock"]["frozen"], true);

    assert!(!env.run(&["unlock", ROOT, &id]).status.success());
    env.run_ok(&["melt", ROOT, &id]);
    env.run_ok(&["unlock", ROOT, &id]);
    let details = env.run_json(&["details", ROOT, &id, "--json"]);
    assert_eq!(details["summary"]["lock"]["locked"], false);
}

#[test]
fn test_checksum_manifest_file() {
    let env = CliEnv::new();
    env.import_and_scan();

    let out = env.temp.path().join("checksums.txt");
    let dataset = format!("{ROOT}/B12345_10m_echo");
    env.run_ok(&["checksums", &dataset, "-o", path_str(&out)]);

    let manifest = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("sha2 "));
    assert!(lines[0].ends_with(&format!(" 1 {dataset}/I0000001")));
}

#[test]
fn test_report_counts() {
    let env = CliEnv::new();
    env.import_and_scan();

    let counts = env.run_json(&["report", "counts", ROOT, "--json"]);
    assert_eq!(counts["echo"]["10m"]["raw"], 1);
}

#[test]
fn test_unknown_dataset_is_a_json_error() {
    let env = CliEnv::new();
    env.import_and_scan();

    let output = env.run(&["details", ROOT, "nope", "--json"]);
    assert!(!output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "error");
}

#[test]
fn test_config_init_then_show() {
    let env = CliEnv::new();
    env.run_ok(&["config", "init"]);
    assert!(env.temp.path().join("config.toml").exists());
    assert!(!env.run(&["config", "init"]).status.success());

    let shown = env.run_ok(&["config", "show"]);
    assert!(shown.contains("accepted_waves"));
}
