//! A [`Duration`] which parses and prints human-readable formats, like `5s`,
//! `24h`, `1h30m` or `15d2m2s`.
//!
//! It implements [`Deref`], which enables us to use all associated functions
//! of [`std::time::Duration`] without re-implementing them on our own type.

use std::{cmp::Ordering, fmt::Display, num::ParseIntError, ops::Deref, str::FromStr};

use snafu::{OptionExt, ResultExt, Snafu};
use strum::IntoEnumIterator;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(module)]
pub enum DurationParseError {
    #[snafu(display("invalid input, either empty or contains non-ascii characters"))]
    InvalidInput,

    #[snafu(display("unexpected character {chr:?}"))]
    UnexpectedCharacter { chr: char },

    #[snafu(display("fragment with value {value:?} has no unit"))]
    NoUnit { value: u128 },

    #[snafu(display("invalid fragment order, {current} must be before {previous}"))]
    InvalidUnitOrdering {
        previous: DurationUnit,
        current: DurationUnit,
    },

    #[snafu(display("fragment unit {unit} was specified multiple times"))]
    DuplicateUnit { unit: DurationUnit },

    #[snafu(display("failed to parse fragment unit {unit:?}"))]
    ParseUnitError { unit: String },

    #[snafu(display("failed to parse fragment value as integer"))]
    ParseIntError { source: ParseIntError },

    #[snafu(display("duration overflows the supported range"))]
    Overflow,
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(std::time::Duration);

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use duration_parse_error::*;
        let input = s.trim();

        // An empty or non-ascii input is invalid
        if input.is_empty() || !input.is_ascii() {
            return InvalidInputSnafu.fail();
        }

        let mut chars = input.char_indices().peekable();
        let mut millis: u128 = 0;
        let mut last_unit = None;

        let mut take_group = |f: fn(char) -> bool| {
            let &(from, _) = chars.peek()?;
            let mut to = None;

            while let Some((i, _)) = chars.next_if(|(_, c)| f(*c)) {
                to = Some(i);
            }

            to.map(|to| &input[from..=to])
        };

        while let Some(value) = take_group(|c| c.is_ascii_digit()) {
            let value = value.parse::<u128>().context(ParseIntSnafu)?;

            let Some(unit) = take_group(|c| c.is_ascii_alphabetic()) else {
                return match chars.peek() {
                    Some(&(_, chr)) => UnexpectedCharacterSnafu { chr }.fail(),
                    None => NoUnitSnafu { value }.fail(),
                };
            };

            let unit = unit.parse::<DurationUnit>().ok().context(ParseUnitSnafu {
                unit: unit.to_owned(),
            })?;

            // Units must be given from largest to smallest, each at most once
            if let Some(last_unit) = last_unit {
                match unit.cmp(&last_unit) {
                    Ordering::Less => {
                        return InvalidUnitOrderingSnafu {
                            previous: last_unit,
                            current: unit,
                        }
                        .fail();
                    }
                    Ordering::Equal => return DuplicateUnitSnafu { unit }.fail(),
                    Ordering::Greater => (),
                }
            }

            millis = value
                .checked_mul(unit.millis())
                .and_then(|fragment| millis.checked_add(fragment))
                .context(OverflowSnafu)?;
            last_unit = Some(unit);
        }

        // Buffer must not contain any remaining data
        if let Some(&(_, chr)) = chars.peek() {
            return UnexpectedCharacterSnafu { chr }.fail();
        }

        let millis = u64::try_from(millis).ok().context(OverflowSnafu)?;
        Ok(Self(std::time::Duration::from_millis(millis)))
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_zero() {
            return write!(f, "0{}", DurationUnit::Seconds);
        }

        let mut millis = self.0.as_millis();

        for unit in DurationUnit::iter() {
            let whole = millis / unit.millis();
            let rest = millis % unit.millis();

            if whole > 0 {
                write!(f, "{whole}{unit}")?;
            }

            millis = rest;
        }

        Ok(())
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self(value)
    }
}

impl Duration {
    /// Creates a new [`Duration`] from the specified number of whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    /// Creates a new [`Duration`] from the specified number of whole minutes.
    pub const fn from_minutes(minutes: u64) -> Self {
        Self::from_secs(minutes * 60)
    }

    /// Creates a new [`Duration`] from the specified number of whole hours.
    pub const fn from_hours(hours: u64) -> Self {
        Self::from_minutes(hours * 60)
    }
}

/// Defines supported [`DurationUnit`]s. Each fragment consists of a numeric
/// value followed by a [`DurationUnit`]. The order of variants **MATTERS**.
/// It is the basis for the correct transformation of the
/// [`std::time::Duration`] back to a human-readable format, which is defined
/// in the [`Display`] implementation of [`Duration`].
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum DurationUnit {
    #[strum(serialize = "d")]
    Days,

    #[strum(serialize = "h")]
    Hours,

    #[strum(serialize = "m")]
    Minutes,

    #[strum(serialize = "s")]
    Seconds,

    #[strum(serialize = "ms")]
    Milliseconds,
}

impl DurationUnit {
    /// Returns the number of whole milliseconds in each supported
    /// [`DurationUnit`].
    fn millis(self) -> u128 {
        use DurationUnit::*;

        match self {
            Days => 24 * Hours.millis(),
            Hours => 60 * Minutes.millis(),
            Minutes => 60 * Seconds.millis(),
            Seconds => 1000,
            Milliseconds => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("15d2m2s1000ms", 1_296_123)]
    #[case("15d2m2s", 1_296_122)]
    #[case("1h30m", 5400)]
    #[case("70m", 4200)]
    #[case("24h", 86400)]
    #[case("1s", 1)]
    fn parse_as_secs(#[case] input: &str, #[case] output: u64) {
        let dur: Duration = input.parse().expect("duration must parse");
        assert_eq!(dur.as_secs(), output);
    }

    #[rstest]
    #[case("1D", DurationParseError::ParseUnitError { unit: "D".into() })]
    #[case("30", DurationParseError::NoUnit { value: 30 })]
    #[case("5 m", DurationParseError::UnexpectedCharacter { chr: ' ' })]
    #[case("m5", DurationParseError::UnexpectedCharacter { chr: 'm' })]
    #[case("1ä", DurationParseError::InvalidInput)]
    #[case(" ", DurationParseError::InvalidInput)]
    fn parse_invalid(#[case] input: &str, #[case] expected_err: DurationParseError) {
        let err = Duration::from_str(input).expect_err("duration must not parse");
        assert_eq!(err, expected_err);
    }

    #[rstest]
    #[case("15d2h1d", DurationParseError::InvalidUnitOrdering { previous: DurationUnit::Hours, current: DurationUnit::Days })]
    #[case("15d2d", DurationParseError::DuplicateUnit { unit: DurationUnit::Days })]
    fn invalid_order_or_duplicate_unit(
        #[case] input: &str,
        #[case] expected_err: DurationParseError,
    ) {
        let err = Duration::from_str(input).expect_err("duration must not parse");
        assert_eq!(err, expected_err);
    }

    #[rstest]
    #[case("70m", Some("1h10m"))]
    #[case("15d2m2s", None)]
    #[case("1h20m", None)]
    #[case("1s", None)]
    fn to_string(#[case] input: &str, #[case] expected: Option<&str>) {
        let dur: Duration = input.parse().expect("duration must parse");
        assert_eq!(dur.to_string(), expected.unwrap_or(input));
    }

    #[test]
    fn constructors() {
        assert_eq!(Duration::from_hours(24), "1d".parse().expect("duration must parse"));
        assert_eq!(Duration::from_minutes(90).as_secs(), 5400);
    }
}
