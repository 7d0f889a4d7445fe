//! Compiler toolchains, one per target.
//!
//! The pipeline only asks a toolchain for triples, baseline flags and tool
//! locations; the tools themselves are never run.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::arch::{Arch, ArchType, OsType, Target};

pub const CLANG_BIN: &str = "prebuilts/clang/host/linux-x86/clang-4053586/bin";
const HOST_PREBUILT_TAG: &str = "linux-x86";
const GCC_VERSION: &str = "4.9";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolchainError {
  #[error("Unknown ARM architecture version: {0:?}")]
  UnknownArmVariant(String),

  #[error("Unknown ARM instruction set: {0}")]
  UnknownArmInstructionSet(String),

  #[error("instruction_set: {0} is not a supported instruction set")]
  UnsupportedInstructionSet(String),

  #[error("no toolchain for {os} {arch}")]
  Unsupported { os: OsType, arch: ArchType },
}

pub trait Toolchain: fmt::Debug + Send + Sync {
  fn name(&self) -> String;
  fn gcc_triple(&self) -> &'static str;
  fn gcc_root(&self) -> String;
  fn clang_triple(&self) -> &'static str;

  /// Baseline compile flags for gcc and clang.
  fn cflags(&self) -> Vec<String>;
  fn clang_cflags(&self) -> Vec<String>;
  fn cppflags(&self) -> Vec<String> {
    Vec::new()
  }
  fn clang_cppflags(&self) -> Vec<String> {
    Vec::new()
  }
  fn clang_asflags(&self) -> Vec<String> {
    Vec::new()
  }
  fn ldflags(&self) -> Vec<String>;
  fn clang_ldflags(&self) -> Vec<String> {
    self.ldflags()
  }
  /// Flags that depend on the arch and CPU variant.
  fn toolchain_cflags(&self) -> Vec<String> {
    Vec::new()
  }
  fn toolchain_clang_cflags(&self) -> Vec<String> {
    self.toolchain_cflags()
  }
  fn toolchain_ldflags(&self) -> Vec<String> {
    Vec::new()
  }
  fn include_flags(&self) -> Vec<String> {
    Vec::new()
  }
  fn yasm_flags(&self) -> Vec<String> {
    Vec::new()
  }

  fn instruction_set_flags(&self, isa: &str) -> Result<Vec<String>, ToolchainError> {
    if isa.is_empty() {
      Ok(Vec::new())
    } else {
      Err(ToolchainError::UnsupportedInstructionSet(isa.to_string()))
    }
  }

  fn clang_instruction_set_flags(&self, isa: &str) -> Result<Vec<String>, ToolchainError> {
    self.instruction_set_flags(isa)
  }

  fn is_64bit(&self) -> bool;
  fn bionic(&self) -> bool;
  fn clang_supported(&self) -> bool {
    true
  }
  fn shlib_suffix(&self) -> &'static str {
    ".so"
  }
  fn executable_suffix(&self) -> &'static str {
    ""
  }
  /// The sanitizer runtime shared library linked into device binaries.
  fn sanitizer_runtime_library(&self, _sanitizer: &str) -> Option<String> {
    None
  }
  /// Libraries `host_ldlibs` may name.
  fn available_libraries(&self) -> &'static [&'static str] {
    &[]
  }

  /// Prefix of the gcc-family binaries, e.g. `.../bin/aarch64-linux-android-`.
  fn cross_compile(&self) -> String {
    format!("{}/bin/{}-", self.gcc_root(), self.gcc_triple())
  }

  fn tool_path(&self) -> String {
    format!("{}/{}/bin", self.gcc_root(), self.gcc_triple())
  }
}

/// The gcc-family command `tool` of `tc`.
pub fn gcc_cmd(tc: &dyn Toolchain, tool: &str) -> String {
  format!("{}{tool}", tc.cross_compile())
}

fn strs(flags: &[&str]) -> Vec<String> {
  flags.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct AndroidToolchain {
  arch: Arch,
}

impl AndroidToolchain {
  fn new(arch: &Arch) -> Result<Self, ToolchainError> {
    if arch.arch_type == ArchType::Arm {
      arm_variant_flags(&arch.arch_variant)?;
    }
    Ok(Self { arch: arch.clone() })
  }

  fn arch_dir(&self) -> &'static str {
    match self.arch.arch_type {
      ArchType::Arm => "arm",
      ArchType::Arm64 => "aarch64",
      ArchType::X86 | ArchType::X86_64 => "x86",
      ArchType::Mips | ArchType::Mips64 => "mips",
      ArchType::Common => "",
    }
  }

  fn runtime_arch(&self) -> &'static str {
    match self.arch.arch_type {
      ArchType::Arm => "arm",
      ArchType::Arm64 => "aarch64",
      ArchType::X86 => "i686",
      ArchType::X86_64 => "x86_64",
      ArchType::Mips => "mips",
      ArchType::Mips64 => "mips64",
      ArchType::Common => "",
    }
  }
}

fn arm_variant_flags(variant: &str) -> Result<&'static [&'static str], ToolchainError> {
  let flags: &'static [&'static str] = match variant {
    "" | "armv7-a" => &["-march=armv7-a", "-mfloat-abi=softfp", "-mfpu=vfpv3-d16"],
    "armv7-a-neon" => &["-march=armv7-a", "-mfloat-abi=softfp", "-mfpu=neon"],
    "armv8-a" | "armv8-2a" => &["-march=armv8-a", "-mfloat-abi=softfp", "-mfpu=neon-fp-armv8"],
    other => return Err(ToolchainError::UnknownArmVariant(other.to_string())),
  };
  Ok(flags)
}

fn arm_cpu_flags(cpu: &str) -> &'static [&'static str] {
  match cpu {
    "cortex-a7" => &["-mcpu=cortex-a7", "-mfpu=neon-vfpv4", "-D__ARM_FEATURE_LPAE=1"],
    "cortex-a8" => &["-mcpu=cortex-a8"],
    "cortex-a15" | "krait" => &["-mcpu=cortex-a15", "-mfpu=neon-vfpv4", "-D__ARM_FEATURE_LPAE=1"],
    "cortex-a53" | "cortex-a53.a57" | "cortex-a55" | "kryo" | "exynos-m1" | "exynos-m2" => {
      &["-mcpu=cortex-a53", "-mfpu=neon-fp-armv8", "-D__ARM_FEATURE_LPAE=1"]
    }
    _ => &[],
  }
}

fn x86_feature_flag(feature: &str) -> Option<&'static str> {
  Some(match feature {
    "ssse3" => "-mssse3",
    "sse4" => "-msse4",
    "sse4_1" => "-msse4.1",
    "sse4_2" => "-msse4.2",
    "aes_ni" => "-maes",
    "avx" => "-mavx",
    "popcnt" => "-mpopcnt",
    "movbe" => "-mmovbe",
    _ => return None,
  })
}

impl Toolchain for AndroidToolchain {
  fn name(&self) -> String {
    self.arch.arch_type.name().to_string()
  }

  fn gcc_triple(&self) -> &'static str {
    match self.arch.arch_type {
      ArchType::Arm => "arm-linux-androideabi",
      ArchType::Arm64 => "aarch64-linux-android",
      ArchType::X86 | ArchType::X86_64 => "x86_64-linux-android",
      ArchType::Mips | ArchType::Mips64 | ArchType::Common => "mips64el-linux-android",
    }
  }

  fn gcc_root(&self) -> String {
    format!("prebuilts/gcc/{HOST_PREBUILT_TAG}/{}/{}-{GCC_VERSION}", self.arch_dir(), self.gcc_triple())
  }

  fn clang_triple(&self) -> &'static str {
    match self.arch.arch_type {
      ArchType::Arm => "arm-linux-androideabi",
      ArchType::Arm64 => "aarch64-linux-android",
      ArchType::X86 => "i686-linux-android",
      ArchType::X86_64 => "x86_64-linux-android",
      ArchType::Mips => "mipsel-linux-android",
      ArchType::Mips64 | ArchType::Common => "mips64el-linux-android",
    }
  }

  fn cflags(&self) -> Vec<String> {
    let mut flags = strs(&["-fno-exceptions", "-fstack-protector-strong", "-ffunction-sections", "-fdata-sections"]);
    match self.arch.arch_type {
      ArchType::Arm => flags.extend(strs(&["-fno-builtin-sin", "-fno-strict-volatile-bitfields", "-msoft-float"])),
      ArchType::X86 => flags.extend(strs(&["-m32", "-mstackrealign"])),
      ArchType::X86_64 => flags.push("-m64".to_string()),
      _ => {}
    }
    flags
  }

  fn clang_cflags(&self) -> Vec<String> {
    let mut flags = strs(&["-fno-exceptions", "-fstack-protector-strong", "-ffunction-sections", "-fdata-sections"]);
    if self.arch.arch_type == ArchType::Arm {
      flags.push("-D__compiler_offsetof=__builtin_offsetof".to_string());
    }
    flags
  }

  fn ldflags(&self) -> Vec<String> {
    let mut flags = strs(&[
      "-Wl,-z,noexecstack",
      "-Wl,-z,relro",
      "-Wl,-z,now",
      "-Wl,--build-id=md5",
      "-Wl,--warn-shared-textrel",
      "-Wl,--fatal-warnings",
      "-Wl,--no-undefined-version",
    ]);
    match self.arch.arch_type {
      ArchType::Arm => flags.push("-Wl,--icf=safe".to_string()),
      ArchType::Arm64 => flags.extend(strs(&["-Wl,--hash-style=gnu", "-Wl,--fix-cortex-a53-843419", "-fuse-ld=gold"])),
      ArchType::X86 => flags.push("-m32".to_string()),
      ArchType::X86_64 => flags.push("-m64".to_string()),
      _ => {}
    }
    flags
  }

  fn toolchain_cflags(&self) -> Vec<String> {
    let arch = &self.arch;
    match arch.arch_type {
      ArchType::Arm => {
        let mut flags = strs(arm_variant_flags(&arch.arch_variant).unwrap_or_default());
        flags.extend(strs(arm_cpu_flags(&arch.cpu_variant)));
        flags
      }
      ArchType::Arm64 if !arch.cpu_variant.is_empty() => vec![format!("-mcpu={}", arch.cpu_variant)],
      ArchType::X86 | ArchType::X86_64 => {
        let march = match (arch.arch_type, arch.arch_variant.as_str()) {
          (ArchType::X86, "") => "-march=prescott",
          (ArchType::X86_64, "") | (_, "x86_64") => "-march=x86-64",
          (_, "atom") => "-march=atom",
          (_, "haswell") => "-march=core-avx2",
          (_, "ivybridge") => "-march=core-avx-i",
          (_, "sandybridge") => "-march=corei7",
          (_, "silvermont") => "-march=slm",
          _ => "",
        };
        let mut flags: Vec<String> = [march].iter().filter(|f| !f.is_empty()).map(|f| f.to_string()).collect();
        flags.extend(arch.features.iter().filter_map(|f| x86_feature_flag(f)).map(str::to_string));
        flags
      }
      ArchType::Mips => vec!["-march=mips32r2".to_string(), "-mfp32".to_string()],
      ArchType::Mips64 => vec!["-march=mips64r6".to_string()],
      _ => Vec::new(),
    }
  }

  fn include_flags(&self) -> Vec<String> {
    let dir = match self.arch.arch_type {
      ArchType::Arm64 => "arm64",
      other => other.name(),
    };
    vec![
      format!("-isystem bionic/libc/arch-{dir}/include"),
      "-isystem bionic/libc/include".to_string(),
      "-isystem bionic/libc/kernel/uapi".to_string(),
      format!("-isystem bionic/libc/kernel/uapi/asm-{dir}"),
      "-isystem bionic/libc/kernel/android/uapi".to_string(),
      "-isystem bionic/libm/include".to_string(),
      format!("-isystem bionic/libm/include/{dir}"),
    ]
  }

  fn yasm_flags(&self) -> Vec<String> {
    match self.arch.arch_type {
      ArchType::X86 => strs(&["-f elf32", "-m x86"]),
      ArchType::X86_64 => strs(&["-f elf64", "-m amd64"]),
      _ => Vec::new(),
    }
  }

  fn instruction_set_flags(&self, isa: &str) -> Result<Vec<String>, ToolchainError> {
    if self.arch.arch_type != ArchType::Arm {
      return if isa.is_empty() {
        Ok(Vec::new())
      } else {
        Err(ToolchainError::UnsupportedInstructionSet(isa.to_string()))
      };
    }
    match isa {
      "arm" => Ok(strs(&["-marm", "-O2", "-fomit-frame-pointer", "-fstrict-aliasing"])),
      "thumb" | "" => Ok(strs(&["-mthumb", "-Os", "-fomit-frame-pointer", "-fno-strict-aliasing"])),
      other => Err(ToolchainError::UnknownArmInstructionSet(other.to_string())),
    }
  }

  fn is_64bit(&self) -> bool {
    self.arch.arch_type.is_64bit()
  }

  fn bionic(&self) -> bool {
    true
  }

  fn sanitizer_runtime_library(&self, sanitizer: &str) -> Option<String> {
    Some(format!("libclang_rt.{sanitizer}-{}-android", self.runtime_arch()))
  }
}

#[derive(Debug, Clone)]
pub struct HostToolchain {
  os: OsType,
  arch: ArchType,
}

const LINUX_LDLIBS: &[&str] = &["-ldl", "-lpthread", "-lm", "-lrt", "-lutil", "-lncurses", "-lz", "-lc++"];
const DARWIN_LDLIBS: &[&str] = &[
  "-ldl",
  "-lpthread",
  "-lm",
  "-lncurses",
  "-lobjc",
  "-lz",
  "-framework AppKit",
  "-framework CoreFoundation",
  "-framework Foundation",
  "-framework IOKit",
  "-framework Security",
];
const WINDOWS_LDLIBS: &[&str] = &["-lws2_32", "-lwinmm", "-lgdi32", "-lpsapi", "-lmsvcrt"];

impl Toolchain for HostToolchain {
  fn name(&self) -> String {
    format!("{}_{}", self.os.name(), self.arch.name())
  }

  fn gcc_triple(&self) -> &'static str {
    match self.os {
      OsType::Darwin => "i686-apple-darwin",
      OsType::Windows if self.arch == ArchType::X86 => "i686-w64-mingw32",
      OsType::Windows => "x86_64-w64-mingw32",
      OsType::LinuxBionic => "x86_64-linux-android",
      _ => "x86_64-linux",
    }
  }

  fn gcc_root(&self) -> String {
    match self.os {
      OsType::Darwin => "prebuilts/gcc/darwin-x86/host/i686-apple-darwin-4.2.1".to_string(),
      OsType::Windows => "prebuilts/gcc/linux-x86/host/x86_64-w64-mingw32-4.8".to_string(),
      OsType::LinuxBionic => format!("prebuilts/gcc/{HOST_PREBUILT_TAG}/x86/x86_64-linux-android-{GCC_VERSION}"),
      _ => "prebuilts/gcc/linux-x86/host/x86_64-linux-glibc2.15-4.8".to_string(),
    }
  }

  fn clang_triple(&self) -> &'static str {
    match (self.os, self.arch) {
      (OsType::Darwin, ArchType::X86) => "i686-apple-darwin",
      (OsType::Darwin, _) => "x86_64-apple-darwin",
      (OsType::Windows, ArchType::X86) => "i686-windows-gnu",
      (OsType::Windows, _) => "x86_64-windows-gnu",
      (OsType::LinuxBionic, _) => "x86_64-linux-android",
      (_, ArchType::X86) => "i686-linux-gnu",
      _ => "x86_64-linux-gnu",
    }
  }

  fn cflags(&self) -> Vec<String> {
    let mut flags = match self.os {
      OsType::Darwin => strs(&["-fdiagnostics-color", "-fPIC", "-funwind-tables", "-mmacosx-version-min=10.8"]),
      OsType::Windows => strs(&["-DUSE_MINGW", "-DWIN32_LEAN_AND_MEAN", "-D__STDC_FORMAT_MACROS"]),
      _ => strs(&[
        "-fdiagnostics-color",
        "-Wa,--noexecstack",
        "-fPIC",
        "-U_FORTIFY_SOURCE",
        "-D_FORTIFY_SOURCE=2",
        "-fstack-protector",
        "-D_FILE_OFFSET_BITS=64",
      ]),
    };
    flags.push(if self.arch == ArchType::X86 { "-m32" } else { "-m64" }.to_string());
    flags
  }

  fn clang_cflags(&self) -> Vec<String> {
    self.cflags()
  }

  fn ldflags(&self) -> Vec<String> {
    let mut flags = match self.os {
      OsType::Darwin => strs(&["-isysroot", "-mmacosx-version-min=10.8"]),
      OsType::Windows => strs(&["--enable-stdcall-fixup"]),
      _ => strs(&["-Wl,-z,noexecstack", "-Wl,-z,relro", "-Wl,-z,now", "-Wl,--no-undefined-version"]),
    };
    flags.push(if self.arch == ArchType::X86 { "-m32" } else { "-m64" }.to_string());
    flags
  }

  fn toolchain_cflags(&self) -> Vec<String> {
    if self.arch == ArchType::X86 && self.os == OsType::LinuxGlibc {
      strs(&["-march=prescott", "-D_LARGEFILE_SOURCE=1"])
    } else {
      Vec::new()
    }
  }

  fn yasm_flags(&self) -> Vec<String> {
    match (self.os, self.arch) {
      (OsType::Darwin, ArchType::X86) => strs(&["-f macho32", "-m x86"]),
      (OsType::Darwin, _) => strs(&["-f macho64", "-m amd64"]),
      (OsType::Windows, ArchType::X86) => strs(&["-f win32", "-m x86"]),
      (OsType::Windows, _) => strs(&["-f win64", "-m amd64"]),
      (_, ArchType::X86) => strs(&["-f elf32", "-m x86"]),
      _ => strs(&["-f elf64", "-m amd64"]),
    }
  }

  fn is_64bit(&self) -> bool {
    self.arch.is_64bit()
  }

  fn bionic(&self) -> bool {
    self.os == OsType::LinuxBionic
  }

  fn clang_supported(&self) -> bool {
    self.os != OsType::Windows
  }

  fn shlib_suffix(&self) -> &'static str {
    match self.os {
      OsType::Darwin => ".dylib",
      OsType::Windows => ".dll",
      _ => ".so",
    }
  }

  fn executable_suffix(&self) -> &'static str {
    if self.os == OsType::Windows { ".exe" } else { "" }
  }

  fn available_libraries(&self) -> &'static [&'static str] {
    match self.os {
      OsType::Darwin => DARWIN_LDLIBS,
      OsType::Windows => WINDOWS_LDLIBS,
      _ => LINUX_LDLIBS,
    }
  }
}

/// The toolchain building for `target`.
pub fn toolchain_for(target: &Target) -> Result<Arc<dyn Toolchain>, ToolchainError> {
  let arch = target.arch.arch_type;
  let unsupported = || ToolchainError::Unsupported { os: target.os, arch };
  if arch == ArchType::Common {
    return Err(unsupported());
  }
  match target.os {
    OsType::Android => Ok(Arc::new(AndroidToolchain::new(&target.arch)?)),
    os if os.arches().contains(&arch) => Ok(Arc::new(HostToolchain { os, arch })),
    _ => Err(unsupported()),
  }
}
