//! Architecture, operating system and target types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bitness class of an architecture, named after the `multilib` sub-blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multilib {
  Lib32,
  Lib64,
  Common,
}

impl Multilib {
  pub fn as_str(&self) -> &'static str {
    match self {
      Multilib::Lib32 => "lib32",
      Multilib::Lib64 => "lib64",
      Multilib::Common => "common",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchType {
  Arm,
  Arm64,
  Mips,
  Mips64,
  X86,
  X86_64,
  Common,
}

impl ArchType {
  /// Every concrete architecture, in declaration order.
  pub const ALL: [ArchType; 6] = [
    ArchType::Arm,
    ArchType::Arm64,
    ArchType::Mips,
    ArchType::Mips64,
    ArchType::X86,
    ArchType::X86_64,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      ArchType::Arm => "arm",
      ArchType::Arm64 => "arm64",
      ArchType::Mips => "mips",
      ArchType::Mips64 => "mips64",
      ArchType::X86 => "x86",
      ArchType::X86_64 => "x86_64",
      ArchType::Common => "common",
    }
  }

  pub fn from_name(name: &str) -> Option<ArchType> {
    Self::ALL.into_iter().find(|a| a.name() == name)
  }

  pub fn multilib(&self) -> Multilib {
    match self {
      ArchType::Arm | ArchType::Mips | ArchType::X86 => Multilib::Lib32,
      ArchType::Arm64 | ArchType::Mips64 | ArchType::X86_64 => Multilib::Lib64,
      ArchType::Common => Multilib::Common,
    }
  }

  pub fn is_64bit(&self) -> bool {
    self.multilib() == Multilib::Lib64
  }
}

impl fmt::Display for ArchType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Which side of the build an OS targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsClass {
  Device,
  Host,
  HostCross,
}

impl OsClass {
  pub const ALL: [OsClass; 3] = [OsClass::Device, OsClass::Host, OsClass::HostCross];

  pub fn as_str(&self) -> &'static str {
    match self {
      OsClass::Device => "device",
      OsClass::Host => "host",
      OsClass::HostCross => "host-cross",
    }
  }
}

impl fmt::Display for OsClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
  Android,
  LinuxGlibc,
  Darwin,
  LinuxBionic,
  Windows,
}

impl OsType {
  pub const ALL: [OsType; 5] = [
    OsType::Android,
    OsType::LinuxGlibc,
    OsType::Darwin,
    OsType::LinuxBionic,
    OsType::Windows,
  ];

  /// Name used in variant tags and `target.<os>` sub-blocks.
  pub fn name(&self) -> &'static str {
    match self {
      OsType::Android => "android",
      OsType::LinuxGlibc => "linux_glibc",
      OsType::Darwin => "darwin",
      OsType::LinuxBionic => "linux_bionic",
      OsType::Windows => "windows",
    }
  }

  pub fn from_name(name: &str) -> Option<OsType> {
    Self::ALL.into_iter().find(|os| os.name() == name)
  }

  pub fn class(&self) -> OsClass {
    match self {
      OsType::Android => OsClass::Device,
      OsType::LinuxGlibc | OsType::Darwin | OsType::LinuxBionic => OsClass::Host,
      OsType::Windows => OsClass::HostCross,
    }
  }

  /// Modules for this OS start out disabled unless they opt in.
  pub fn default_disabled(&self) -> bool {
    matches!(self, OsType::LinuxBionic | OsType::Windows)
  }

  /// Architectures the OS can be configured with.
  pub fn arches(&self) -> &'static [ArchType] {
    match self {
      OsType::Android => &[
        ArchType::Arm,
        ArchType::Arm64,
        ArchType::Mips,
        ArchType::Mips64,
        ArchType::X86,
        ArchType::X86_64,
      ],
      OsType::LinuxBionic => &[ArchType::X86_64],
      OsType::LinuxGlibc | OsType::Darwin | OsType::Windows => &[ArchType::X86, ArchType::X86_64],
    }
  }

  pub fn is_bionic(&self) -> bool {
    matches!(self, OsType::Android | OsType::LinuxBionic)
  }

  pub fn is_linux(&self) -> bool {
    matches!(self, OsType::LinuxGlibc | OsType::LinuxBionic)
  }

  /// Extra `target.<name>` sub-blocks that also apply to this OS.
  pub fn aliases(&self) -> &'static [&'static str] {
    if self.is_linux() { &["linux"] } else { &[] }
  }
}

impl fmt::Display for OsType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A concrete architecture configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arch {
  pub arch_type: ArchType,
  pub arch_variant: String,
  pub cpu_variant: String,
  pub abi: Vec<String>,
  pub features: Vec<String>,
  pub native: bool,
}

impl Arch {
  pub fn new(arch_type: ArchType) -> Self {
    Self {
      arch_type,
      arch_variant: String::new(),
      cpu_variant: String::new(),
      abi: Vec::new(),
      features: Vec::new(),
      native: true,
    }
  }

  pub fn common() -> Self {
    Self::new(ArchType::Common)
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.arch_type.name())?;
    if !self.arch_variant.is_empty() {
      write!(f, "_{}", self.arch_variant)?;
    }
    if !self.cpu_variant.is_empty() {
      write!(f, "_{}", self.cpu_variant)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
  pub os: OsType,
  pub arch: Arch,
}

impl Target {
  pub fn new(os: OsType, arch: Arch) -> Self {
    Self { os, arch }
  }

  pub fn class(&self) -> OsClass {
    self.os.class()
  }

  pub fn is_device(&self) -> bool {
    self.os.class() == OsClass::Device
  }

  pub fn is_host(&self) -> bool {
    !self.is_device()
  }

  pub fn is_common(&self) -> bool {
    self.arch.arch_type == ArchType::Common
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}", self.os, self.arch)
  }
}

/// How a module type opts into host and device builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostOrDeviceSupported {
  /// Host and host-cross only.
  HostSupported,
  /// Host only, never cross-compiled.
  HostSupportedNoCross,
  DeviceSupported,
  /// Device by default, host when `host_supported: true`.
  HostAndDeviceSupported,
  /// Both unless turned off with `host_supported`/`device_supported`.
  HostAndDeviceDefault,
  NeitherHostNorDevice,
}

impl HostOrDeviceSupported {
  /// OS classes a module supports given its `host_supported` and
  /// `device_supported` properties.
  pub fn classes(&self, host_supported: Option<bool>, device_supported: Option<bool>) -> Vec<OsClass> {
    match self {
      HostOrDeviceSupported::HostSupported => vec![OsClass::Host, OsClass::HostCross],
      HostOrDeviceSupported::HostSupportedNoCross => vec![OsClass::Host],
      HostOrDeviceSupported::DeviceSupported => vec![OsClass::Device],
      HostOrDeviceSupported::HostAndDeviceSupported => {
        let mut classes = Vec::new();
        if host_supported.unwrap_or(false) {
          classes.extend([OsClass::Host, OsClass::HostCross]);
        }
        if device_supported.unwrap_or(true) {
          classes.push(OsClass::Device);
        }
        classes
      }
      HostOrDeviceSupported::HostAndDeviceDefault => {
        let mut classes = Vec::new();
        if host_supported.unwrap_or(true) {
          classes.extend([OsClass::Host, OsClass::HostCross]);
        }
        if device_supported.unwrap_or(true) {
          classes.push(OsClass::Device);
        }
        classes
      }
      HostOrDeviceSupported::NeitherHostNorDevice => Vec::new(),
    }
  }

  pub fn is_arch_specific(&self) -> bool {
    *self != HostOrDeviceSupported::NeitherHostNorDevice
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arch_string_includes_variants() {
    let mut arch = Arch::new(ArchType::Arm);
    assert_eq!(arch.to_string(), "arm");
    arch.arch_variant = "armv7-a-neon".to_string();
    arch.cpu_variant = "cortex-a53".to_string();
    assert_eq!(arch.to_string(), "arm_armv7-a-neon_cortex-a53");
  }

  #[test]
  fn target_string_joins_os_and_arch() {
    let target = Target::new(OsType::LinuxGlibc, Arch::new(ArchType::X86_64));
    assert_eq!(target.to_string(), "linux_glibc_x86_64");
  }

  #[test]
  fn multilib_classes() {
    assert_eq!(ArchType::Arm64.multilib(), Multilib::Lib64);
    assert_eq!(ArchType::Mips.multilib(), Multilib::Lib32);
    assert_eq!(ArchType::from_name("x86_64"), Some(ArchType::X86_64));
    assert_eq!(ArchType::from_name("sparc"), None);
  }

  #[test]
  fn supported_classes() {
    let hod = HostOrDeviceSupported::HostAndDeviceSupported;
    assert_eq!(hod.classes(None, None), vec![OsClass::Device]);
    assert_eq!(
      hod.classes(Some(true), None),
      vec![OsClass::Host, OsClass::HostCross, OsClass::Device]
    );
    let default = HostOrDeviceSupported::HostAndDeviceDefault;
    assert_eq!(default.classes(None, Some(false)), vec![OsClass::Host, OsClass::HostCross]);
  }

  #[test]
  fn os_table() {
    assert!(OsType::Windows.default_disabled());
    assert_eq!(OsType::Windows.class(), OsClass::HostCross);
    assert_eq!(OsType::LinuxGlibc.aliases(), &["linux"]);
    assert!(OsType::LinuxBionic.is_bionic());
  }
}
