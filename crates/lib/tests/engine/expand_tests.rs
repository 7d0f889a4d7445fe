//! `$(name)` expansion through the public API.

use std::collections::BTreeMap;

use knit_lib::expand::{ExpandError, expand, expand_vars};

fn vars() -> BTreeMap<String, String> {
  BTreeMap::from([
    ("var1".to_string(), "abc".to_string()),
    ("out".to_string(), "out/gen/x.h".to_string()),
  ])
}

#[test]
fn variables_expand_in_place() {
  assert_eq!(expand_vars("def$(var1)def", &vars()).unwrap(), "defabcdef");
  assert_eq!(expand_vars("$( var1 )", &vars()).unwrap(), "abc");
  assert_eq!(expand_vars("gen > $(out)", &vars()).unwrap(), "gen > out/gen/x.h");
}

#[test]
fn escaped_dollars_survive() {
  assert_eq!(expand_vars("$$(var1)", &vars()).unwrap(), "$$(var1)");
  assert_eq!(expand_vars("echo $$HOME", &vars()).unwrap(), "echo $$HOME");
}

#[test]
fn malformed_references_are_errors() {
  assert_eq!(
    expand_vars("$var1 rest", &vars()).unwrap_err(),
    ExpandError::BareVariable("var1".to_string())
  );
  assert_eq!(expand_vars("abc$", &vars()).unwrap_err(), ExpandError::TrailingDollar);
  assert_eq!(expand_vars("$(var1", &vars()).unwrap_err(), ExpandError::MissingCloseParen);
  assert_eq!(
    expand_vars("$(nope)", &vars()).unwrap_err(),
    ExpandError::UnknownVariable("nope".to_string())
  );
}

#[test]
fn expansion_is_idempotent() {
  for input in ["def$(var1)def", "$$(var1) $(out)", "plain", "a$$$$b"] {
    let once = expand_vars(input, &vars()).unwrap();
    let twice = expand_vars(&once, &vars()).unwrap();
    assert_eq!(once, twice, "{input}");
  }
}

#[test]
fn mapping_errors_propagate() {
  let err = expand("$(tool)", |name| Err(ExpandError::Mapping(format!("no tool {name}")))).unwrap_err();
  assert_eq!(err.to_string(), "no tool tool");
}
