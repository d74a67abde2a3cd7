//! Version ordering for package releases.
//!
//! Versions are dot-delimited strings whose components may or may not be
//! numeric (`1.2.0rc1`, `develop`, `2024.06`). Ordering is component-wise:
//!
//! - Two numeric components compare as unsigned integers.
//! - Two non-numeric components compare as plain strings, so the
//!   lexicographically larger one wins. This is not pre-release aware:
//!   `rc1` does not sort below a release.
//! - A numeric component always outranks a non-numeric one.
//! - When one version runs out of components while the other still has some,
//!   the longer version is greater (`1.2.1 > 1.2`, `1.2.0 > 1.2`).
//!
//! Comparison is total and never fails; malformed input just lands in the
//! string branch.

use std::cmp::Ordering;

/// A single dot-separated component of a version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component<'a> {
  Numeric(u64),
  Text(&'a str),
}

impl<'a> Component<'a> {
  fn parse(raw: &'a str) -> Self {
    // `u64::from_str` accepts a leading `+`, plain digits only here.
    if !raw.is_empty()
      && raw.bytes().all(|b| b.is_ascii_digit())
      && let Ok(n) = raw.parse::<u64>()
    {
      return Component::Numeric(n);
    }
    Component::Text(raw)
  }
}

impl Ord for Component<'_> {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Component::Numeric(a), Component::Numeric(b)) => a.cmp(b),
      (Component::Text(a), Component::Text(b)) => a.cmp(b),
      (Component::Numeric(_), Component::Text(_)) => Ordering::Greater,
      (Component::Text(_), Component::Numeric(_)) => Ordering::Less,
    }
  }
}

impl PartialOrd for Component<'_> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Compare two version strings.
///
/// See the module documentation for the ordering rules.
///
/// ```
/// use std::cmp::Ordering;
/// use spackle_lib::version::compare;
///
/// assert_eq!(compare("1.10.0", "1.9.0"), Ordering::Greater);
/// assert_eq!(compare("1.2", "1.2.0"), Ordering::Less);
/// assert_eq!(compare("2.0.0rc1", "2.0.0"), Ordering::Less);
/// ```
pub fn compare(a: &str, b: &str) -> Ordering {
  let mut left = a.split('.').map(Component::parse);
  let mut right = b.split('.').map(Component::parse);

  loop {
    match (left.next(), right.next()) {
      (Some(x), Some(y)) => match x.cmp(&y) {
        Ordering::Equal => continue,
        unequal => return unequal,
      },
      (Some(_), None) => return Ordering::Greater,
      (None, Some(_)) => return Ordering::Less,
      (None, None) => return Ordering::Equal,
    }
  }
}

/// Returns `true` if `candidate` sorts strictly after `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
  compare(candidate, current) == Ordering::Greater
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_components_compare_as_integers() {
    assert_eq!(compare("1.10.0", "1.9.0"), Ordering::Greater);
    assert_eq!(compare("1.9.0", "1.10.0"), Ordering::Less);
    assert_eq!(compare("3.2.1", "3.2.1"), Ordering::Equal);
    assert_eq!(compare("10", "9"), Ordering::Greater);
  }

  #[test]
  fn leading_zeros_are_numerically_equal() {
    assert_eq!(compare("1.02", "1.2"), Ordering::Equal);
  }

  #[test]
  fn longer_version_with_matching_prefix_is_greater() {
    assert_eq!(compare("1.2.1", "1.2"), Ordering::Greater);
    assert_eq!(compare("1.2.0", "1.2"), Ordering::Greater);
    assert_eq!(compare("1.2", "1.2.0"), Ordering::Less);
  }

  #[test]
  fn numeric_component_outranks_text_component() {
    // "0rc1" does not parse, "0" does
    assert_eq!(compare("2.0.0rc1", "2.0.0"), Ordering::Less);
    assert_eq!(compare("2.0.0", "2.0.0rc1"), Ordering::Greater);
    assert_eq!(compare("1.0", "1.develop"), Ordering::Greater);
  }

  #[test]
  fn text_components_compare_lexicographically() {
    assert_eq!(compare("1.rc2", "1.rc1"), Ordering::Greater);
    assert_eq!(compare("develop", "main"), Ordering::Less);
    // not pre-release aware
    assert_eq!(compare("1.0.rc1", "1.0.beta"), Ordering::Greater);
    assert_eq!(compare("1.0.rc1", "1.0.rc1"), Ordering::Equal);
  }

  #[test]
  fn separate_pre_release_component_makes_version_longer() {
    assert_eq!(compare("2.0.0.rc1", "2.0.0"), Ordering::Greater);
  }

  #[test]
  fn empty_components_are_text() {
    assert_eq!(compare("", ""), Ordering::Equal);
    assert_eq!(compare("", "1"), Ordering::Less);
    assert_eq!(compare("1.", "1.0"), Ordering::Less);
    assert_eq!(compare(".1", "0.1"), Ordering::Less);
    assert_eq!(compare("1..2", "1..2"), Ordering::Equal);
  }

  #[test]
  fn sign_and_overflow_fall_back_to_text() {
    assert_eq!(compare("+5", "1"), Ordering::Less);
    assert_eq!(compare("99999999999999999999", "1"), Ordering::Less);
  }

  #[test]
  fn compare_is_antisymmetric() {
    let versions = ["1", "1.0", "1.0.1", "1.0rc", "1.a", "develop", "", "2.10", "2.9"];
    for a in versions {
      for b in versions {
        assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
      }
    }
  }

  #[test]
  fn is_newer_checks_candidate_against_current() {
    assert!(is_newer("1.2.0", "1.3.0"));
    assert!(!is_newer("1.3.0", "1.3.0"));
    assert!(!is_newer("1.3.0", "1.2.9"));
  }
}
