//! CLI smoke tests for knit.
//!
//! These tests run the binary against small definition trees in temporary
//! directories and check exit codes, output and written files.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Environment switches the engine reads; cleared so runs are reproducible.
const ENGINE_ENV: &[&str] = &[
  "ALLOW_MISSING_DEPENDENCIES",
  "DISABLE_HOST_PIE",
  "WITH_TIDY",
  "NATIVE_COVERAGE",
  "SANITIZE_HOST",
  "KNIT_OUT_DIR",
  "RUST_LOG",
];

fn knit_cmd(dir: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("knit");
  cmd.current_dir(dir.path());
  for key in ENGINE_ENV {
    cmd.env_remove(key);
  }
  cmd
}

fn temp_tree(definitions: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("Blueprints.lua"), definitions).unwrap();
  temp
}

const HOST_TOOL: &str = r#"
cc_library_host_static {
  name = "libutil",
  srcs = { "util.c" },
}

cc_binary_host {
  name = "tool",
  srcs = { "main.c" },
  static_libs = { "libutil" },
}
"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let temp = TempDir::new().unwrap();
  knit_cmd(&temp)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"))
    .stdout(predicate::str::contains("env-check"));
}

#[test]
fn version_flag_works() {
  let temp = TempDir::new().unwrap();
  knit_cmd(&temp)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("knit"));
}

// =============================================================================
// gen
// =============================================================================

#[test]
#[serial]
fn gen_writes_outputs() {
  let temp = temp_tree(HOST_TOOL);
  knit_cmd(&temp)
    .arg("gen")
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated"));

  let ninja = std::fs::read_to_string(temp.path().join("out/build.ninja")).unwrap();
  assert!(ninja.contains("# module: tool variant: linux_glibc_x86_64"));
  assert!(ninja.contains("rule ar\n"));
  assert!(temp.path().join("out/knit.environment").exists());
  assert!(temp.path().join("out/Android-knit.mk").exists());
}

#[test]
#[serial]
fn gen_twice_leaves_outputs_unchanged() {
  let temp = temp_tree(HOST_TOOL);
  knit_cmd(&temp).arg("gen").assert().success();
  knit_cmd(&temp)
    .arg("gen")
    .assert()
    .success()
    .stdout(predicate::str::contains("(unchanged)"));
}

#[test]
#[serial]
fn gen_honours_out_flag() {
  let temp = temp_tree(HOST_TOOL);
  knit_cmd(&temp).args(["gen", "--out", "elsewhere"]).assert().success();
  assert!(temp.path().join("elsewhere/build.ninja").exists());
}

#[test]
#[serial]
fn gen_rejects_unknown_module_types() {
  let temp = temp_tree("cc_binary_hots { name = \"tool\" }\n");
  knit_cmd(&temp)
    .arg("gen")
    .assert()
    .failure()
    .stderr(predicate::str::contains("unrecognized module type \"cc_binary_hots\""));
}

#[test]
#[serial]
fn gen_reports_missing_dependencies() {
  let temp = temp_tree("cc_binary_host { name = \"tool\", srcs = { \"main.c\" }, shared_libs = { \"libnope\" } }\n");
  knit_cmd(&temp)
    .arg("gen")
    .assert()
    .failure()
    .stderr(predicate::str::contains("libnope"));
}

#[test]
#[serial]
fn gen_defers_missing_dependencies_when_allowed() {
  let temp = temp_tree("cc_binary_host { name = \"tool\", srcs = { \"main.c\" }, shared_libs = { \"libnope\" } }\n");
  knit_cmd(&temp)
    .args(["gen", "--allow-missing"])
    .assert()
    .success()
    .stderr(predicate::str::contains("missing dependencies"));

  let ninja = std::fs::read_to_string(temp.path().join("out/build.ninja")).unwrap();
  assert!(ninja.contains("module tool missing dependencies: libnope"));
}

#[test]
fn gen_without_definitions_fails() {
  let temp = TempDir::new().unwrap();
  knit_cmd(&temp)
    .arg("gen")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load definitions"));
}

// =============================================================================
// variants & targets
// =============================================================================

#[test]
#[serial]
fn variants_lists_final_variants() {
  let temp = temp_tree(HOST_TOOL);
  knit_cmd(&temp)
    .arg("variants")
    .assert()
    .success()
    .stdout(predicate::str::contains("tool linux_glibc_x86_64"))
    .stdout(predicate::str::contains("libutil linux_glibc_x86_64"));
}

#[test]
#[serial]
fn variants_json_is_parseable() {
  let temp = temp_tree(HOST_TOOL);
  let output = knit_cmd(&temp).args(["variants", "--json"]).output().unwrap();
  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let names: Vec<&str> = json.as_array().unwrap().iter().filter_map(|m| m["name"].as_str()).collect();
  assert!(names.contains(&"tool"));
}

#[test]
fn targets_prints_the_host_table() {
  let temp = TempDir::new().unwrap();
  knit_cmd(&temp)
    .arg("targets")
    .assert()
    .success()
    .stdout(predicate::str::contains("host:"))
    .stdout(predicate::str::contains("x86_64 [primary]"));
}

#[test]
fn targets_reads_device_variables() {
  let temp = TempDir::new().unwrap();
  std::fs::write(
    temp.path().join("knit.variables.json"),
    r#"{ "HostArch": "x86_64", "DeviceArch": "arm64", "DeviceArchVariant": "armv8-a", "DeviceAbi": ["arm64-v8a"] }"#,
  )
  .unwrap();
  knit_cmd(&temp)
    .args(["targets", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"os\": \"android\""))
    .stdout(predicate::str::contains("\"arch\": \"arm64\""));
}

#[test]
fn malformed_variables_fail() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("knit.variables.json"), "{ not json").unwrap();
  knit_cmd(&temp)
    .arg("targets")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load product variables"));
}

// =============================================================================
// env-check
// =============================================================================

#[test]
#[serial]
fn env_check_passes_after_gen() {
  let temp = temp_tree(HOST_TOOL);
  knit_cmd(&temp).arg("gen").assert().success();
  knit_cmd(&temp)
    .arg("env-check")
    .assert()
    .success()
    .stdout(predicate::str::contains("up to date"));
}

#[test]
#[serial]
fn env_check_detects_changes() {
  let temp = temp_tree(HOST_TOOL);
  knit_cmd(&temp).arg("gen").assert().success();
  knit_cmd(&temp)
    .arg("env-check")
    .env("WITH_TIDY", "1")
    .assert()
    .failure()
    .stderr(predicate::str::contains("WITH_TIDY"));
}

#[test]
fn env_check_without_recording_fails() {
  let temp = TempDir::new().unwrap();
  knit_cmd(&temp)
    .arg("env-check")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No recorded environment"));
}
