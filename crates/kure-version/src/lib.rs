//! Strongly-typed Kubernetes-style resource versions and the ordering used to
//! rank multiple versions of the same kind.
//!
//! Versions follow the `v<MAJOR>(.<MINOR>(.<PATCH>))(alpha|beta<LEVEL>)`
//! format, for example `v1`, `v1alpha3`, `v2beta1` or `v1.2.0`. Unmarked
//! versions are stable and rank above every alpha and beta release of the same
//! numeric version.
//!
//! ## Usage
//!
//! Versions can be parsed and validated from [`str`] using Rust's standard
//! [`FromStr`](std::str::FromStr) trait.
//!
//! ```
//! use kure_version::{Level, Version};
//!
//! let version: Version = "v2beta1".parse().expect("valid version");
//! assert_eq!(version, Version::new(2, Some(Level::Beta(1))));
//! ```
//!
//! Arbitrary version strings, including ones that don't follow the format,
//! can be ranked with [`compare_versions`].
//!
//! ```
//! use std::cmp::Ordering;
//!
//! assert_eq!(kure_version::compare_versions("v1alpha1", "v1"), Ordering::Less);
//! assert_eq!(kure_version::compare_versions("v1", "latest"), Ordering::Greater);
//! ```

// NOTE: Fixed in https://github.com/la10736/rstest/pull/244 but not yet
// released.
#[cfg(test)]
use rstest_reuse::{self};

mod level;
mod order;
mod version;

pub use level::*;
pub use order::*;
pub use version::*;
