//! Ordered string-list helpers.
//!
//! Dependency and flag lists are order-sensitive, so every helper here keeps
//! the relative order of the elements it retains.

use std::collections::HashSet;

use thiserror::Error;

/// Keeps the first occurrence of every element.
pub fn first_unique<S: AsRef<str> + Clone>(list: &[S]) -> Vec<S> {
  let mut seen = HashSet::new();
  list.iter().filter(|s| seen.insert(s.as_ref().to_string())).cloned().collect()
}

/// Keeps the last occurrence of every element.
pub fn last_unique<S: AsRef<str> + Clone>(list: &[S]) -> Vec<S> {
  let mut seen = HashSet::new();
  let mut out: Vec<S> = list.iter().rev().filter(|s| seen.insert(s.as_ref().to_string())).cloned().collect();
  out.reverse();
  out
}

/// Returns `true` when `item` is an element of `list`.
pub fn in_list<S: AsRef<str>>(item: &str, list: &[S]) -> bool {
  list.iter().any(|s| s.as_ref() == item)
}

/// Splits `list` into the elements not in `filter` and the ones that are.
pub fn filter_list<S: AsRef<str> + Clone>(list: &[S], filter: &[&str]) -> (Vec<S>, Vec<S>) {
  list.iter().cloned().partition(|s| !filter.contains(&s.as_ref()))
}

/// Removes every occurrence of `item`, returning whether any was found.
pub fn remove_from_list(item: &str, list: &mut Vec<String>) -> bool {
  let before = list.len();
  list.retain(|s| s != item);
  before != list.len()
}

/// Prefixes every element of `list` with `prefix`.
pub fn prefixed(prefix: &str, list: &[String]) -> Vec<String> {
  list.iter().map(|s| format!("{prefix}{s}")).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListSplitError {
  #[error("list element greater than size limit ({limit})")]
  ElementTooLarge { limit: usize },
}

/// Splits `list` into consecutive batches whose joined length stays within `limit`.
///
/// Each element accounts for its length plus one separating space. Order is
/// preserved and every element lands in exactly one batch.
pub fn split_list_for_size(list: &[String], limit: usize) -> Result<Vec<Vec<String>>, ListSplitError> {
  let mut batches: Vec<Vec<String>> = vec![Vec::new()];
  let mut bytes = 0usize;

  for item in list {
    let len = item.len();
    if len > limit {
      return Err(ListSplitError::ElementTooLarge { limit });
    }
    if bytes + len > limit {
      batches.push(Vec::new());
      bytes = 0;
    }
    if let Some(current) = batches.last_mut() {
      current.push(item.clone());
    }
    bytes += len + 1;
  }

  Ok(batches)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  mod unique {
    use super::*;

    #[test]
    fn first_unique_keeps_first_copy() {
      let list = strings(&["a", "b", "a", "c", "b"]);
      assert_eq!(first_unique(&list), strings(&["a", "b", "c"]));
    }

    #[test]
    fn last_unique_keeps_last_copy() {
      let list = strings(&["a", "b", "a", "c", "b"]);
      assert_eq!(last_unique(&list), strings(&["a", "c", "b"]));
    }

    #[test]
    fn empty_lists_stay_empty() {
      let list: Vec<String> = Vec::new();
      assert!(first_unique(&list).is_empty());
      assert!(last_unique(&list).is_empty());
    }
  }

  mod filtering {
    use super::*;

    #[test]
    fn filter_list_partitions_in_order() {
      let list = strings(&["-O2", "-w", "-g", "-w"]);
      let (kept, removed) = filter_list(&list, &["-w"]);
      assert_eq!(kept, strings(&["-O2", "-g"]));
      assert_eq!(removed, strings(&["-w", "-w"]));
    }

    #[test]
    fn remove_from_list_reports_presence() {
      let mut list = strings(&["libc", "libdl", "libm"]);
      assert!(remove_from_list("libdl", &mut list));
      assert!(!remove_from_list("libdl", &mut list));
      assert_eq!(list, strings(&["libc", "libm"]));
    }
  }

  mod split {
    use super::*;

    #[test]
    fn small_list_is_one_batch() {
      let list = strings(&["a.o", "b.o"]);
      let batches = split_list_for_size(&list, 100).unwrap();
      assert_eq!(batches, vec![list]);
    }

    #[test]
    fn splits_when_limit_reached() {
      let list = strings(&["aaaa", "bbbb", "cccc"]);
      let batches = split_list_for_size(&list, 10).unwrap();
      assert_eq!(batches, vec![strings(&["aaaa", "bbbb"]), strings(&["cccc"])]);
    }

    #[test]
    fn element_over_limit_is_an_error() {
      let list = strings(&["a", "much-too-long"]);
      let err = split_list_for_size(&list, 4).unwrap_err();
      assert_eq!(err.to_string(), "list element greater than size limit (4)");
    }

    #[test]
    fn batches_respect_limit_and_order() {
      let list: Vec<String> = (0..500).map(|i| format!("obj/file_{i:04}.o")).collect();
      let limit = 1000;
      let batches = split_list_for_size(&list, limit).unwrap();
      assert!(batches.len() >= 2);
      for batch in &batches {
        let joined = batch.join(" ");
        assert!(joined.len() <= limit);
      }
      let flattened: Vec<String> = batches.into_iter().flatten().collect();
      assert_eq!(flattened, list);
    }
  }
}
