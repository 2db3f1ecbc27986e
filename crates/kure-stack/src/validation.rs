//! Validation of versioned stack records.
//!
//! Validation never stops at the first problem. Every `validate()` call
//! collects all findings of one record into [`Errors`], so tooling can report
//! everything at once.

use std::{collections::HashSet, fmt::Display, hash::Hash, sync::LazyLock};

use kure_shared::time::{Duration, DurationParseError};
use regex::Regex;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

/// The shortest accepted reconciliation interval, timeout or retry interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// The longest accepted reconciliation interval, timeout or retry interval.
pub const MAX_INTERVAL: Duration = Duration::from_hours(24);

const INTERVAL_FMT: &str = r"^(\d+(ms|s|m|h))+$";

static INTERVAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(INTERVAL_FMT).expect("failed to compile interval regex")
});

static FRAGMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(ms|s|m|h)").expect("failed to compile interval fragment regex")
});

/// A collection of errors discovered during validation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Errors(Vec<Error>);

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if any error was reported for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    pub(crate) fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub(crate) fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl IntoIterator for Errors {
    type IntoIter = std::vec::IntoIter<Error>;
    type Item = Error;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A single validation error, carrying enough context to locate the offending
/// record and field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    /// The record kind, e.g. `Bundle`.
    pub kind: String,

    /// The record name, possibly empty if the name itself is missing.
    pub name: String,

    /// The path of the offending field, e.g. `spec.dependsOn[0].name`.
    pub field: String,

    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            kind,
            name,
            field,
            message,
        } = self;
        write!(f, "{kind} {name:?}: {field}: {message}")
    }
}

impl std::error::Error for Error {}

/// Collects errors for one record.
pub(crate) struct Validator {
    kind: String,
    name: String,
    errors: Errors,
}

impl Validator {
    pub(crate) fn new(kind: &str, name: &str) -> Self {
        let mut validator = Self {
            kind: kind.to_owned(),
            name: name.to_owned(),
            errors: Errors::default(),
        };

        if name.is_empty() {
            validator.error("metadata.name", "name must not be empty");
        }

        validator
    }

    pub(crate) fn error(&mut self, field: impl Into<String>, message: impl Display) {
        self.errors.0.push(Error {
            kind: self.kind.clone(),
            name: self.name.clone(),
            field: field.into(),
            message: message.to_string(),
        });
    }

    pub(crate) fn require(&mut self, value: &str, field: impl Into<String>) {
        if value.is_empty() {
            self.error(field, "must not be empty");
        }
    }

    /// Checks an optional interval-like field, see [`validate_interval`].
    pub(crate) fn interval(&mut self, value: &str, field: &str) {
        if let Err(err) = validate_interval(value) {
            self.error(field, err);
        }
    }

    /// Reports every key which occurs more than once. `describe` renders the
    /// key into the error message.
    pub(crate) fn unique<K, I>(&mut self, field: &str, keys: I, describe: impl Fn(&K) -> String)
    where
        K: Eq + Hash,
        I: IntoIterator<Item = K>,
    {
        let mut seen = HashSet::new();

        for (index, key) in keys.into_iter().enumerate() {
            let message = format!("duplicate {}", describe(&key));
            if !seen.insert(key) {
                self.error(format!("{field}[{index}]"), message);
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), Errors> {
        self.errors.into_result()
    }
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum IntervalError {
    #[snafu(display("{value:?} is not a duration like 30s, 5m or 1h30m"))]
    InvalidFormat { value: String },

    #[snafu(display("failed to parse {value:?} as duration"))]
    ParseDuration {
        source: DurationParseError,
        value: String,
    },

    #[snafu(display("{value:?} overflows the supported duration range"))]
    Overflow { value: String },

    #[snafu(display("{value:?} is shorter than the minimum of {MIN_INTERVAL}"))]
    TooShort { value: String },

    #[snafu(display("{value:?} is longer than the maximum of {MAX_INTERVAL}"))]
    TooLong { value: String },
}

/// Validates an interval, timeout or retry interval.
///
/// The value must consist of one or more `<number><unit>` fragments, with `ms`,
/// `s`, `m` and `h` as units, and must lie between [`MIN_INTERVAL`] and
/// [`MAX_INTERVAL`]. Fragments may appear in any order and repeat, their
/// durations add up, so `500ms1s` is one and a half seconds. An empty value is
/// valid and means the system default is used.
pub fn validate_interval(value: &str) -> Result<(), IntervalError> {
    if value.is_empty() {
        return Ok(());
    }

    ensure!(INTERVAL_REGEX.is_match(value), InvalidFormatSnafu { value });

    let mut total = std::time::Duration::ZERO;
    for fragment in FRAGMENT_REGEX.find_iter(value) {
        let fragment: Duration = fragment
            .as_str()
            .parse()
            .context(ParseDurationSnafu { value })?;
        total = total.checked_add(*fragment).context(OverflowSnafu { value })?;
    }
    let duration = Duration::from(total);

    ensure!(duration >= MIN_INTERVAL, TooShortSnafu { value });
    ensure!(duration <= MAX_INTERVAL, TooLongSnafu { value });

    Ok(())
}
