//! Flags every C/C++ compile and link starts from.

pub const COMMON_GLOBAL_CFLAGS: &[&str] = &[
  "-DANDROID",
  "-fmessage-length=0",
  "-W",
  "-Wall",
  "-Wno-unused",
  "-Winit-self",
  "-Wpointer-arith",
  "-no-canonical-prefixes",
  "-DNDEBUG",
  "-UDEBUG",
  "-fno-exceptions",
  "-Wno-multichar",
  "-O2",
  "-g",
  "-fno-strict-aliasing",
];

pub const DEVICE_GLOBAL_CFLAGS: &[&str] = &[
  "-ffunction-sections",
  "-fdata-sections",
  "-funwind-tables",
  "-fstack-protector-strong",
  "-Wa,--noexecstack",
  "-D_FORTIFY_SOURCE=2",
  "-Wstrict-aliasing=2",
  "-Werror=return-type",
  "-Werror=non-virtual-dtor",
  "-Werror=address",
  "-Werror=sequence-point",
  "-Werror=date-time",
];

pub const HOST_GLOBAL_CFLAGS: &[&str] = &[];

pub const COMMON_GLOBAL_CONLYFLAGS: &[&str] = &[];

pub const COMMON_GLOBAL_CPPFLAGS: &[&str] = &["-Wsign-promo"];

pub const COMMON_CLANG_GLOBAL_CFLAGS: &[&str] = &[
  "-D__compiler_offsetof=__builtin_offsetof",
  "-Werror=int-conversion",
  "-Wno-reserved-id-macro",
  "-Wno-format-pedantic",
  "-Wno-unused-command-line-argument",
  "-fcolor-diagnostics",
  "-Wno-expansion-to-defined",
];

pub const DEVICE_CLANG_GLOBAL_CFLAGS: &[&str] = &["-fdebug-prefix-map=/proc/self/cwd="];

pub const HOST_CLANG_GLOBAL_CFLAGS: &[&str] = &[];

pub const COMMON_CLANG_GLOBAL_CPPFLAGS: &[&str] = &["-Wno-inconsistent-missing-override"];

/// Appended after every other compile flag so modules cannot override them.
pub const NO_OVERRIDE_GLOBAL_CFLAGS: &[&str] = &["-Werror=int-to-pointer-cast", "-Werror=pointer-to-int-cast"];

pub const NO_OVERRIDE_CLANG_GLOBAL_CFLAGS: &[&str] = &[
  "-Werror=int-to-pointer-cast",
  "-Werror=pointer-to-int-cast",
  "-Werror=address-of-temporary",
  "-Werror=null-dereference",
  "-Werror=return-type",
];

/// Flags stripped from module flags before compiling.
pub const ILLEGAL_FLAGS: &[&str] = &["-w"];

pub const COMMON_GLOBAL_INCLUDES: &[&str] = &[
  "system/core/include",
  "system/media/audio/include",
  "hardware/libhardware/include",
  "hardware/libhardware_legacy/include",
  "libnativehelper/include",
  "frameworks/native/include",
  "frameworks/native/opengl/include",
];

pub const COMMON_NATIVEHELPER_INCLUDE: &str = "libnativehelper/include_jni";

pub const C_STD_VERSION: &str = "gnu99";
pub const CPP_STD_VERSION: &str = "gnu++14";
pub const EXPERIMENTAL_C_STD_VERSION: &str = "gnu11";
pub const EXPERIMENTAL_CPP_STD_VERSION: &str = "gnu++1z";
/// gcc builds C++ as C++11.
pub const GCC_CPP_STD_VERSION: &str = "gnu++11";

/// Checks clang-tidy runs unless the product overrides them.
pub const TIDY_DEFAULT_GLOBAL_CHECKS: &str = "-*,google*,misc-macro-parentheses,performance*";
/// Checks for code imported from elsewhere.
pub const TIDY_EXTERNAL_VENDOR_CHECKS: &str = "-*,google*,-google-build-using-namespace,-google-default-arguments,-google-explicit-constructor,-google-readability*,-google-runtime-int,-google-runtime-references";
pub const TIDY_DEFAULT_HEADER_DIRS: &str =
  "art/|bionic/|bootable/|build/|cts/|dalvik/|developer/|development/|frameworks/|libcore/|libnativehelper/|system/";

pub const RS_GLOBAL_INCLUDES: &[&str] = &["-I frameworks/rs/script_api/include", "-I external/clang/lib/Headers"];

/// gcc flags clang does not understand.
const CLANG_UNKNOWN_CFLAGS: &[&str] = &[
  "-finline-functions",
  "-finline-limit=64",
  "-fno-canonical-system-headers",
  "-Wno-clobbered",
  "-fno-devirtualize",
  "-fno-tree-sra",
  "-fprefetch-loop-arrays",
  "-funswitch-loops",
  "-Werror=unused-but-set-parameter",
  "-Werror=unused-but-set-variable",
  "-Wmaybe-uninitialized",
  "-Wno-error=clobbered",
  "-Wno-error=maybe-uninitialized",
  "-Wno-error=unused-but-set-parameter",
  "-Wno-error=unused-but-set-variable",
  "-Wno-free-nonheap-object",
  "-Wno-literal-suffix",
  "-Wno-maybe-uninitialized",
  "-Wno-old-style-declaration",
  "-Wno-psabi",
  "-Wno-unused-but-set-parameter",
  "-Wno-unused-but-set-variable",
  "-Wno-unused-local-typedefs",
  "-Wunused-but-set-parameter",
  "-Wunused-but-set-variable",
  "-fdiagnostics-color",
  "-fgcse-after-reload",
  "-frerun-cse-after-loop",
  "-frename-registers",
  "-fno-strict-volatile-bitfields",
  "-fno-align-jumps",
  "-mthumb-interwork",
  "-fno-builtin-sin",
  "-fno-caller-saves",
  "-fno-early-inlining",
  "-fno-move-loop-invariants",
  "-fno-partial-inlining",
  "-fno-tree-copy-prop",
  "-fno-tree-loop-optimize",
  "-msoft-float",
  "-mstackrealign",
];

/// Drops the flags clang does not understand.
pub fn clang_filter_unknown_cflags(flags: &[String]) -> Vec<String> {
  flags
    .iter()
    .filter(|f| !CLANG_UNKNOWN_CFLAGS.contains(&f.as_str()))
    .cloned()
    .collect()
}

pub fn strings(flags: &[&str]) -> Vec<String> {
  flags.iter().map(|f| f.to_string()).collect()
}
