//! Target table decoding and its inverse.

use knit_lib::arch::{OsClass, OsType, decode_targets, encode_targets};
use knit_lib::config::ProductVariables;

/// The target-describing subset of `vars`.
fn target_fields(vars: &ProductVariables) -> ProductVariables {
  ProductVariables {
    host_arch: vars.host_arch.clone(),
    host_secondary_arch: vars.host_secondary_arch.clone(),
    host_bionic: vars.host_bionic,
    cross_host: vars.cross_host.clone(),
    cross_host_arch: vars.cross_host_arch.clone(),
    cross_host_secondary_arch: vars.cross_host_secondary_arch.clone(),
    device_arch: vars.device_arch.clone(),
    device_arch_variant: vars.device_arch_variant.clone(),
    device_cpu_variant: vars.device_cpu_variant.clone(),
    device_abi: vars.device_abi.clone(),
    device_secondary_arch: vars.device_secondary_arch.clone(),
    device_secondary_arch_variant: vars.device_secondary_arch_variant.clone(),
    device_secondary_cpu_variant: vars.device_secondary_cpu_variant.clone(),
    device_secondary_abi: vars.device_secondary_abi.clone(),
    ..ProductVariables::default()
  }
}

fn strings(items: &[&str]) -> Option<Vec<String>> {
  Some(items.iter().map(|s| s.to_string()).collect())
}

fn some(s: &str) -> Option<String> {
  Some(s.to_string())
}

fn full_device() -> ProductVariables {
  ProductVariables {
    host_arch: some("x86_64"),
    host_secondary_arch: some("x86"),
    device_arch: some("arm64"),
    device_arch_variant: some("armv8-a"),
    device_cpu_variant: some("cortex-a53"),
    device_abi: strings(&["arm64-v8a"]),
    device_secondary_arch: some("arm"),
    device_secondary_arch_variant: some("armv7-a-neon"),
    device_secondary_cpu_variant: some("cortex-a15"),
    device_secondary_abi: strings(&["armeabi-v7a", "armeabi"]),
    ..ProductVariables::default()
  }
}

fn cross_windows() -> ProductVariables {
  ProductVariables {
    host_arch: some("x86_64"),
    cross_host: some("windows"),
    cross_host_arch: some("x86"),
    cross_host_secondary_arch: some("x86_64"),
    ..ProductVariables::default()
  }
}

#[test]
fn encoding_inverts_decoding() {
  for vars in [full_device(), cross_windows()] {
    let targets = decode_targets(&vars, OsType::LinuxGlibc).unwrap();
    assert_eq!(encode_targets(&targets), target_fields(&vars));
  }
}

#[test]
fn classes_are_ordered_by_priority() {
  let targets = decode_targets(&full_device(), OsType::LinuxGlibc).unwrap();
  let device: Vec<String> = targets[&OsClass::Device].iter().map(|t| t.to_string()).collect();
  assert_eq!(device, ["android_arm64_armv8-a_cortex-a53", "android_arm_armv7-a-neon_cortex-a15"]);
  let host: Vec<String> = targets[&OsClass::Host].iter().map(|t| t.to_string()).collect();
  assert_eq!(host, ["linux_glibc_x86_64", "linux_glibc_x86"]);
}

#[test]
fn cross_hosts_form_their_own_class() {
  let targets = decode_targets(&cross_windows(), OsType::LinuxGlibc).unwrap();
  let cross = &targets[&OsClass::HostCross];
  assert_eq!(cross.len(), 2);
  assert!(cross.iter().all(|t| t.os == OsType::Windows));
  assert!(!targets.contains_key(&OsClass::Device));
}

#[test]
fn host_arch_is_required() {
  let vars = ProductVariables {
    host_arch: None,
    ..full_device()
  };
  assert!(decode_targets(&vars, OsType::LinuxGlibc).is_err());
}
