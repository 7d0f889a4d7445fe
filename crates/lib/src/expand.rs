//! `$(name)` template expansion.
//!
//! Used by `genrule` commands and any other property that embeds variable
//! references. `$$` is an escaped dollar and survives expansion unchanged so
//! the build executor still sees it; expanding an already expanded string is
//! therefore a no-op.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
  #[error("expected character after '$'")]
  TrailingDollar,

  #[error("missing )")]
  MissingCloseParen,

  #[error("expected '(' after '$', did you mean $({0})?")]
  BareVariable(String),

  #[error("unknown variable '{0}'")]
  UnknownVariable(String),

  #[error("{0}")]
  Mapping(String),
}

/// Expands every `$(name)` in `s` through `mapping`.
pub fn expand<F>(s: &str, mut mapping: F) -> Result<String, ExpandError>
where
  F: FnMut(&str) -> Result<String, ExpandError>,
{
  let bytes = s.as_bytes();
  let mut out = String::with_capacity(s.len() * 2);
  let mut start = 0;
  let mut j = 0;

  while j < bytes.len() {
    if bytes[j] != b'$' {
      j += 1;
      continue;
    }
    if j + 1 >= bytes.len() {
      return Err(ExpandError::TrailingDollar);
    }
    out.push_str(&s[start..j]);
    let rest = &s[j + 1..];
    let (value, width) = mapping_at(rest, &mut mapping)?;
    out.push_str(&value);
    j += width + 1;
    start = j;
  }

  out.push_str(&s[start..]);
  Ok(out)
}

fn mapping_at<F>(s: &str, mapping: &mut F) -> Result<(String, usize), ExpandError>
where
  F: FnMut(&str) -> Result<String, ExpandError>,
{
  match s.as_bytes()[0] {
    b'(' => match s.find(')') {
      Some(close) => {
        let value = mapping(s[1..close].trim())?;
        Ok((value, close + 1))
      }
      None => Err(ExpandError::MissingCloseParen),
    },
    b'$' => Ok(("$$".to_string(), 1)),
    _ => {
      let end = s.find(char::is_whitespace).unwrap_or(s.len());
      Err(ExpandError::BareVariable(s[..end].to_string()))
    }
  }
}

/// Expands `s` against a fixed variable table; unknown names are errors.
pub fn expand_vars(s: &str, vars: &BTreeMap<String, String>) -> Result<String, ExpandError> {
  expand(s, |name| {
    vars
      .get(name)
      .cloned()
      .ok_or_else(|| ExpandError::UnknownVariable(name.to_string()))
  })
}
