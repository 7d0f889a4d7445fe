//! Constants shared across the pipeline.

/// Length of the truncated plan hash.
pub const PLAN_HASH_PREFIX_LEN: usize = 20;

/// Upper bound, in bytes, of the argument list handed to the Darwin archiver.
pub const DARWIN_AR_ARG_LIMIT: usize = 131_072;

/// Directory under the output root that holds per-module intermediates.
pub const INTERMEDIATES_DIR: &str = ".intermediates";

/// Default output root, relative to the source root.
pub const DEFAULT_OUT_DIR: &str = "out";

/// Default product-variable file name.
pub const VARIABLES_FILE: &str = "knit.variables.json";

/// Default top-level definitions file.
pub const DEFINITIONS_FILE: &str = "Blueprints.lua";

/// Name of the ninja file written by `gen`.
pub const NINJA_FILE: &str = "build.ninja";

/// Name of the recorded environment file.
pub const ENV_FILE: &str = "knit.environment";

/// Platform SDK version used when none is configured.
pub const DEFAULT_PLATFORM_SDK_VERSION: i64 = 27;

/// Lowest API level the NDK supports on any architecture.
pub const NDK_MIN_API_LEVEL: i64 = 9;

/// Newest API level with prebuilt NDK crt objects.
pub const NDK_MAX_PREBUILT_VERSION: i64 = 24;

/// Prefix carried by prebuilt twins of source modules.
pub const PREBUILT_PREFIX: &str = "prebuilt_";

/// Suffix of generated NDK stub library modules.
pub const NDK_LIBRARY_SUFFIX: &str = ".ndk";

/// Suffix of generated LL-NDK stub library modules.
pub const LLNDK_LIBRARY_SUFFIX: &str = ".llndk";

/// Suffix used by the legacy emitter for vendor variants with a core twin.
pub const VENDOR_SUFFIX: &str = ".vendor";

/// Shared libraries the NDK ships as prebuilts.
pub const NDK_PREBUILT_SHARED_LIBRARIES: &[&str] = &[
  "libandroid",
  "libc",
  "libdl",
  "libEGL",
  "libGLESv1_CM",
  "libGLESv2",
  "libGLESv3",
  "libjnigraphics",
  "liblog",
  "libmediandk",
  "libm",
  "libOpenMAXAL",
  "libOpenSLES",
  "libstdc++",
  "libvulkan",
  "libz",
];

/// Default shared libraries linked into dynamic bionic executables and libraries.
pub const DEFAULT_SYSTEM_SHARED_LIBS: &[&str] = &["libc", "libm", "libdl"];

/// Source-root prefix whose modules are built without `-DANDROID_STRICT`.
pub const EXTERNAL_PREFIX: &str = "external/";
