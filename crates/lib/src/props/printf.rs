//! Printf-style substitution of product variable values.
//!
//! A string inside a `product_variables.<var>` block may carry at most one
//! directive: `%d` takes an int or bool variable, `%s` a string variable.

use thiserror::Error;

use super::value::{PropValue, Properties};
use crate::config::VarValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintfError {
  #[error("product variable properties only support a single '%'")]
  MultiplePercent,

  #[error("unsupported type {0} for %d")]
  BadIntType(&'static str),

  #[error("unsupported type {0} for %s")]
  BadStrType(&'static str),

  #[error("unsupported % in product variable property")]
  UnsupportedVerb,
}

fn type_name(value: &VarValue) -> &'static str {
  match value {
    VarValue::Bool(_) => "bool",
    VarValue::Int(_) => "int",
    VarValue::Str(_) => "string",
  }
}

/// Substitutes `value` into a single string.
pub fn printf_string(s: &str, value: &VarValue) -> Result<String, PrintfError> {
  match s.matches('%').count() {
    0 => return Ok(s.to_string()),
    1 => {}
    _ => return Err(PrintfError::MultiplePercent),
  }

  if s.contains("%d") {
    let rendered = match value {
      VarValue::Int(i) => i.to_string(),
      VarValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
      other => return Err(PrintfError::BadIntType(type_name(other))),
    };
    Ok(s.replacen("%d", &rendered, 1))
  } else if s.contains("%s") {
    match value {
      VarValue::Str(v) => Ok(s.replacen("%s", v, 1)),
      other => Err(PrintfError::BadStrType(type_name(other))),
    }
  } else {
    Err(PrintfError::UnsupportedVerb)
  }
}

/// Substitutes `value` into every string of `props`, returning the path of
/// the first failing field on error.
pub fn printf_into(props: &mut Properties, value: &VarValue) -> Result<(), (String, PrintfError)> {
  for (name, field) in props.iter_mut() {
    match field {
      PropValue::Str(s) => *s = printf_string(s, value).map_err(|e| (name.clone(), e))?,
      PropValue::List(items) => {
        for item in items.iter_mut() {
          *item = printf_string(item, value).map_err(|e| (name.clone(), e))?;
        }
      }
      PropValue::Map(inner) => printf_into(inner, value).map_err(|(path, e)| (format!("{name}.{path}"), e))?,
      PropValue::Bool(_) | PropValue::Int(_) => {}
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::props::value::{get_list, set};

  #[test]
  fn int_and_bool_directives() {
    assert_eq!(
      printf_string("-DPLATFORM_SDK_VERSION=%d", &VarValue::Int(27)).unwrap(),
      "-DPLATFORM_SDK_VERSION=27"
    );
    assert_eq!(printf_string("-DDEBUG=%d", &VarValue::Bool(true)).unwrap(), "-DDEBUG=1");
  }

  #[test]
  fn string_directive() {
    assert_eq!(
      printf_string("-DRS_DRIVER=\"%s\"", &VarValue::Str("libRSDriver.so".to_string())).unwrap(),
      "-DRS_DRIVER=\"libRSDriver.so\""
    );
  }

  #[test]
  fn plain_strings_pass_through() {
    assert_eq!(printf_string("-DFOO", &VarValue::Int(1)).unwrap(), "-DFOO");
  }

  #[test]
  fn errors() {
    assert_eq!(
      printf_string("%d%d", &VarValue::Int(1)).unwrap_err(),
      PrintfError::MultiplePercent
    );
    assert_eq!(
      printf_string("%x", &VarValue::Int(1)).unwrap_err(),
      PrintfError::UnsupportedVerb
    );
    assert_eq!(
      printf_string("%s", &VarValue::Int(1)).unwrap_err().to_string(),
      "unsupported type int for %s"
    );
    assert_eq!(
      printf_string("%d", &VarValue::Str("x".into())).unwrap_err(),
      PrintfError::BadIntType("string")
    );
  }

  #[test]
  fn substitutes_through_trees() {
    let mut props = Properties::new();
    set(&mut props, "cflags", vec!["-DSDK=%d", "-DX"].into());
    set(&mut props, "static.cflags", vec!["-DS=%d"].into());
    printf_into(&mut props, &VarValue::Int(26)).unwrap();
    assert_eq!(get_list(&props, "cflags"), &["-DSDK=26", "-DX"]);
    assert_eq!(get_list(&props, "static.cflags"), &["-DS=26"]);

    let mut props = Properties::new();
    set(&mut props, "static.cflags", vec!["%q"].into());
    let (path, _) = printf_into(&mut props, &VarValue::Int(1)).unwrap_err();
    assert_eq!(path, "static.cflags");
  }
}
