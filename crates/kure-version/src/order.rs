use std::{cmp::Ordering, str::FromStr};

use crate::Version;

/// Compares two raw version strings.
///
/// Versions which parse as a [`Version`] are ordered by [`Version::cmp`]. A
/// parseable version always ranks above one that doesn't follow the format,
/// and two unparseable versions are compared lexicographically. This matches
/// how Kubernetes sorts custom resource versions.
///
/// Distinct spellings of the same version, like `v1` and `v1.0`, fall back to
/// lexicographic order, so the comparison is total over strings.
pub fn compare_versions(lhs: &str, rhs: &str) -> Ordering {
    match (Version::from_str(lhs), Version::from_str(rhs)) {
        (Ok(parsed_lhs), Ok(parsed_rhs)) => parsed_lhs.cmp(&parsed_rhs).then_with(|| lhs.cmp(rhs)),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => lhs.cmp(rhs),
    }
}

/// Sorts the given version strings in ascending order using
/// [`compare_versions`].
pub fn sort_versions<S: AsRef<str>>(versions: &mut [S]) {
    versions.sort_by(|lhs, rhs| compare_versions(lhs.as_ref(), rhs.as_ref()));
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn sorts_kubernetes_priority() {
        let mut versions = vec!["v2", "v1beta1", "v1", "v2alpha1", "v1alpha2", "v1alpha1"];
        sort_versions(&mut versions);

        assert_eq!(
            versions,
            vec!["v1alpha1", "v1alpha2", "v1beta1", "v1", "v2alpha1", "v2"]
        );
    }

    #[rstest]
    #[case("v1", "foo", Ordering::Greater)]
    #[case("foo", "v1alpha1", Ordering::Less)]
    #[case("bar", "foo", Ordering::Less)]
    #[case("v1beta1", "v1beta1", Ordering::Equal)]
    fn non_conforming(#[case] lhs: &str, #[case] rhs: &str, #[case] expected: Ordering) {
        assert_eq!(compare_versions(lhs, rhs), expected);
    }

    #[rstest]
    #[case("v1", "v1.0", Ordering::Less)]
    #[case("v1.0.0", "v1.0", Ordering::Greater)]
    #[case("v1beta", "v1beta0", Ordering::Less)]
    fn equal_versions_spelled_differently(
        #[case] lhs: &str,
        #[case] rhs: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare_versions(lhs, rhs), expected);
        assert_eq!(compare_versions(rhs, lhs), expected.reverse());
    }
}
