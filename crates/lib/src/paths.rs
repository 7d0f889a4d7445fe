//! Source-tree path queries.
//!
//! All filesystem access of the pipeline goes through a [`PathContext`].
//! Existence checks are memoised for the lifetime of the context, so each
//! distinct path is read at most once.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::util::once::OncePer;

/// The filesystem seen by the pipeline.
pub trait FileSystem: Send + Sync {
  fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl FileSystem for OsFs {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }
}

/// An in-memory file set, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MockFs {
  files: BTreeSet<PathBuf>,
}

impl MockFs {
  pub fn new<I, P>(files: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    Self {
      files: files.into_iter().map(Into::into).collect(),
    }
  }
}

impl FileSystem for MockFs {
  fn exists(&self, path: &Path) -> bool {
    self.files.contains(path) || self.files.iter().any(|f| f.starts_with(path))
  }
}

pub struct PathContext {
  src_dir: PathBuf,
  fs: Arc<dyn FileSystem>,
  exists: OncePer<String, bool>,
}

impl fmt::Debug for PathContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PathContext").field("src_dir", &self.src_dir).finish_non_exhaustive()
  }
}

impl PathContext {
  pub fn new(src_dir: &Path, fs: Arc<dyn FileSystem>) -> Self {
    let src_dir = dunce::canonicalize(src_dir).unwrap_or_else(|_| src_dir.to_path_buf());
    Self {
      src_dir,
      fs,
      exists: OncePer::new(),
    }
  }

  pub fn os(src_dir: &Path) -> Self {
    Self::new(src_dir, Arc::new(OsFs))
  }

  pub fn src_dir(&self) -> &Path {
    &self.src_dir
  }

  /// Whether `rel`, relative to the source root, exists.
  pub fn exists(&self, rel: &str) -> bool {
    self
      .exists
      .get_or_init(&rel.to_string(), || self.fs.exists(&self.src_dir.join(rel)))
  }

  /// `rel` if it exists under the source root.
  pub fn existent(&self, rel: &str) -> Option<String> {
    self.exists(rel).then(|| rel.to_string())
  }

  pub fn cached(&self) -> usize {
    self.exists.len()
  }
}

/// Joins path fragments with `/`, skipping empty ones.
pub fn join(parts: &[&str]) -> String {
  parts
    .iter()
    .map(|p| p.trim_end_matches('/'))
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join("/")
}

/// A path under the module's directory.
pub fn module_src(dir: &str, rel: &str) -> String {
  join(&[dir, rel])
}

/// File name without directory or extension.
pub fn stem(path: &str) -> &str {
  let name = path.rsplit('/').next().unwrap_or(path);
  match name.rfind('.') {
    Some(0) | None => name,
    Some(i) => &name[..i],
  }
}

/// Extension including the leading dot, or `""`.
pub fn ext(path: &str) -> &str {
  let name = path.rsplit('/').next().unwrap_or(path);
  match name.rfind('.') {
    Some(0) | None => "",
    Some(i) => &name[i..],
  }
}

/// `path` with its extension replaced by `new_ext` (which includes the dot).
pub fn replace_ext(path: &str, new_ext: &str) -> String {
  let e = ext(path);
  format!("{}{new_ext}", &path[..path.len() - e.len()])
}

/// The last path component.
pub fn base(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exists_is_memoised() {
    let ctx = PathContext::new(Path::new("/src"), Arc::new(MockFs::new(["/src/prebuilts/abi-dumps/a.lsdump.gz"])));
    assert!(ctx.exists("prebuilts/abi-dumps/a.lsdump.gz"));
    assert!(ctx.exists("prebuilts/abi-dumps"));
    assert!(!ctx.exists("missing.h"));
    assert!(ctx.exists("prebuilts/abi-dumps/a.lsdump.gz"));
    assert_eq!(ctx.cached(), 3);
    assert_eq!(ctx.existent("missing.h"), None);
  }

  #[test]
  fn path_helpers() {
    assert_eq!(join(&["", "system/core/", "a.c"]), "system/core/a.c");
    assert_eq!(module_src("libfoo", "src/a.cpp"), "libfoo/src/a.cpp");
    assert_eq!(stem("dir/a.pb.cc"), "a.pb");
    assert_eq!(ext("dir/a.pb.cc"), ".cc");
    assert_eq!(ext("dir/.hidden"), "");
    assert_eq!(replace_ext("x/parser.yy", ".cpp"), "x/parser.cpp");
    assert_eq!(base("x/y/z.c"), "z.c");
  }
}
