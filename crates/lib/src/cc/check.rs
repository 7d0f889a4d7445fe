//! Module-level flag validation.

/// A rejected flag, reported at the property that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagError {
  pub property: String,
  pub message: String,
}

impl FlagError {
  fn new(property: &str, message: String) -> Self {
    Self {
      property: property.to_string(),
      message,
    }
  }
}

/// Checks compiler flags: no include, library or coverage flags, and only
/// single-word flags apart from a few known pairs.
pub fn check_bad_compiler_flags(property: &str, flags: &[String]) -> Vec<FlagError> {
  let mut errors = Vec::new();
  for flag in flags {
    let flag = flag.trim();
    if !flag.starts_with('-') {
      errors.push(FlagError::new(property, format!("Flag `{flag}` must start with `-`")));
    } else if flag.starts_with("-I") || flag.starts_with("-isystem") {
      errors.push(FlagError::new(
        property,
        format!("Bad flag `{flag}`, use local_include_dirs or include_dirs instead"),
      ));
    } else if flag.starts_with("-L") || flag.starts_with("-l") {
      errors.push(FlagError::new(property, format!("Bad flag: `{flag}` is not allowed")));
    } else if flag == "--coverage" {
      errors.push(FlagError::new(
        property,
        format!("Bad flag: `{flag}`, use native_coverage instead"),
      ));
    } else if flag.contains(' ') {
      let args: Vec<&str> = flag.splitn(2, ' ').collect();
      match args[0] {
        "-mllvm" | "-Xclang" => {
          if args.len() > 1 && args[1].contains(' ') {
            errors.push(FlagError::new(property, format!("`{} {}` is not a valid flag", args[0], args[1])));
          }
        }
        "-include" => {}
        "-isystem" => errors.push(FlagError::new(
          property,
          format!("Bad flag `{flag}`, use local_include_dirs or include_dirs instead"),
        )),
        _ => errors.push(multi_word(property, flag)),
      }
    }
  }
  errors
}

fn multi_word(property: &str, flag: &str) -> FlagError {
  FlagError::new(
    property,
    format!("Bad flag: `{flag}` is not an allowed multi-word flag. Should it be split into multiple flags?"),
  )
}

/// Checks linker flags: no library search or link flags, which belong in
/// `*_libs` or `host_ldlibs`.
pub fn check_bad_linker_flags(property: &str, flags: &[String]) -> Vec<FlagError> {
  let mut errors = Vec::new();
  for flag in flags {
    let flag = flag.trim();
    if !flag.starts_with('-') {
      errors.push(FlagError::new(property, format!("Flag `{flag}` must start with `-`")));
    } else if flag.starts_with("-l") {
      errors.push(FlagError::new(
        property,
        format!("Bad flag: `{flag}`, use shared_libs or host_ldlibs instead"),
      ));
    } else if flag.starts_with("-L") {
      errors.push(FlagError::new(property, format!("Bad flag: `{flag}` is not allowed")));
    } else if flag.starts_with("-Wl,--version-script") {
      errors.push(FlagError::new(
        property,
        format!("Bad flag: `{flag}`, use version_script instead"),
      ));
    } else if flag == "--coverage" {
      errors.push(FlagError::new(
        property,
        format!("Bad flag: `{flag}`, use native_coverage instead"),
      ));
    } else if flag.contains(' ') {
      let args: Vec<&str> = flag.splitn(2, ' ').collect();
      if args[0] == "-z" {
        if args.len() > 1 && args[1].contains(' ') {
          errors.push(FlagError::new(property, format!("`-z {}` is not a valid flag", args[1])));
        }
      } else {
        errors.push(multi_word(property, flag));
      }
    }
  }
  errors
}

/// Checks `host_ldlibs` against the libraries the host toolchain offers.
pub fn check_bad_host_ldlibs(property: &str, flags: &[String], available: &[&str]) -> Vec<FlagError> {
  let allowed = available.join(" ");
  flags
    .iter()
    .filter(|flag| !available.contains(&flag.as_str()))
    .map(|flag| {
      FlagError::new(
        property,
        format!("Invalid flag: `{flag}`, must be one of `{allowed}`"),
      )
    })
    .collect()
}

/// Checks `tidy_flags`: the checks and fix modes are set elsewhere.
pub fn check_bad_tidy_flags(property: &str, flags: &[String]) -> Vec<FlagError> {
  let mut errors = Vec::new();
  for flag in flags {
    let flag = flag.trim();
    if !flag.starts_with('-') {
      errors.push(FlagError::new(property, format!("Flag `{flag}` must start with `-`")));
    } else if flag.starts_with("-fix") {
      errors.push(FlagError::new(
        property,
        format!("Flag `{flag}` is not allowed, since it could cause multiple writes to the same source file"),
      ));
    } else if flag.starts_with("-checks=") {
      errors.push(FlagError::new(
        property,
        format!("Flag `{flag}` is not allowed, use `tidy_checks` property instead"),
      ));
    } else if flag.contains(' ') {
      errors.push(multi_word(property, flag));
    }
  }
  errors
}

/// Checks `tidy_checks`: one check per entry.
pub fn check_bad_tidy_checks(property: &str, checks: &[String]) -> Vec<FlagError> {
  let mut errors = Vec::new();
  for check in checks {
    if check.contains(' ') {
      errors.push(FlagError::new(property, format!("Check `{check}` invalid, cannot contain spaces")));
    } else if check.contains(',') {
      errors.push(FlagError::new(
        property,
        format!("Check `{check}` invalid, cannot contain commas. Split each entry into it's own string instead"),
      ));
    }
  }
  errors
}
