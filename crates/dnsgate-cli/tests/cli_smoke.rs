use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "dnsgate-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn run_dnsgate<I, S>(dir: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_dnsgate");
    Command::new(bin)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("dnsgate command should execute")
}

fn assert_exit(output: &Output, expected: i32) {
    if output.status.code() != Some(expected) {
        panic!(
            "expected exit {expected}, got {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_plan(dir: &Path, name: &str, cidr: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(
        &path,
        format!(
            "name: temp\nreadiness:\n  kind: evidence_present\nstream: dns\ncidr: {cidr}\n"
        ),
    )
    .expect("plan should be written");
    path
}

#[test]
fn validate_demo_plan_reports_outside_answer() {
    let output = run_dnsgate(&demos_dir(), ["validate", "--plan", "plan.yaml"]);

    assert_exit(&output, 1);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("FAIL: 3 records"), "stdout:\n{stdout}");
    assert!(
        stdout.contains("record #2 (cdn.example.com): answer is outside the network: 8.8.8.8"),
        "stdout:\n{stdout}"
    );
}

#[test]
fn validate_demo_plan_json_report() {
    let output = run_dnsgate(&demos_dir(), ["validate", "--plan", "plan.yaml", "--json"]);

    assert_exit(&output, 1);
    let reports: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let report = &reports[0];
    assert_eq!(report["plan"], "vpc-endpoints");
    assert_eq!(report["convergence"]["achieved"], true);
    assert_eq!(report["verdict"]["pass"], false);
    assert_eq!(report["verdict"]["outcomes"].as_array().map(Vec::len), Some(3));
}

#[test]
fn validate_clean_stream_passes() {
    let tmp = TempDirGuard::new("validate-pass");
    fs::create_dir_all(tmp.path().join("logs")).expect("logs dir should be created");
    fs::write(
        tmp.path().join("logs").join("dns.jsonl"),
        "{\"name\":\"api.internal\",\"query\":\"A\",\"answers\":[\"10.0.5.5\"]}\n",
    )
    .expect("stream should be written");
    write_plan(tmp.path(), "plan.yaml", "10.0.0.0/16");

    let output = run_dnsgate(tmp.path(), ["validate", "--plan", "plan.yaml"]);

    assert_exit(&output, 0);
    assert!(stdout_text(&output).contains("PASS: 1 records"));
}

#[test]
fn validate_missing_plan_is_run_error() {
    let tmp = TempDirGuard::new("validate-missing");
    let output = run_dnsgate(tmp.path(), ["validate", "--plan", "nope.yaml"]);

    assert_exit(&output, 2);
    let stderr = stderr_text(&output);
    assert!(stderr.contains("nope.yaml"), "stderr:\n{stderr}");
    assert_eq!(stderr.matches("os error").count(), 1, "stderr:\n{stderr}");
}

#[test]
fn validate_unconverged_run_is_run_error() {
    let tmp = TempDirGuard::new("validate-timeout");
    write_plan(tmp.path(), "plan.yaml", "10.0.0.0/16");

    let output = run_dnsgate(
        tmp.path(),
        ["validate", "--plan", "plan.yaml", "--deadline", "1s"],
    );

    assert_exit(&output, 2);
    assert!(stdout_text(&output).contains("Convergence timed out"));
}

#[test]
fn lint_accepts_valid_and_rejects_invalid_plans() {
    let tmp = TempDirGuard::new("lint");
    let good = write_plan(tmp.path(), "good.yaml", "10.0.0.0/16");
    let bad = write_plan(tmp.path(), "bad.yaml", "10.0.0.0/33");

    let output = run_dnsgate(tmp.path(), [OsStr::new("lint"), good.as_os_str()]);
    assert_exit(&output, 0);
    assert!(stdout_text(&output).contains("ok   "));

    let output = run_dnsgate(
        tmp.path(),
        [OsStr::new("lint"), good.as_os_str(), bad.as_os_str()],
    );
    assert_exit(&output, 1);
    assert!(stdout_text(&output).contains("FAIL "));
}

#[test]
fn lint_demo_plan() {
    let output = run_dnsgate(&demos_dir(), ["lint", "plan.yaml"]);
    assert_exit(&output, 0);
}

#[test]
fn decode_reports_malformed_line() {
    let tmp = TempDirGuard::new("decode");
    let file = tmp.path().join("payloads.jsonl");
    fs::write(
        &file,
        "{\"name\":\"a.internal\",\"answers\":[\"10.0.0.1\"]}\n{\"name\":\"b.internal\",\"answers\":[\n",
    )
    .expect("payloads should be written");

    let output = run_dnsgate(tmp.path(), [OsStr::new("decode"), file.as_os_str()]);
    assert_exit(&output, 1);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("#1 decode failure"), "stdout:\n{stdout}");
    assert!(stdout.contains("1 decoded, 1 failed"), "stdout:\n{stdout}");
}

#[test]
fn decode_demo_stream_is_clean() {
    let output = run_dnsgate(
        &demos_dir(),
        ["decode", "logs/vpc-endpoints/dns.jsonl", "--json"],
    );

    assert_exit(&output, 0);
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["records"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["records"][1]["record"]["schema"], "resolver_query_log");
}
