use std::{fmt, num::ParseFloatError, str::FromStr};

/// A validated, finite, non-negative percentage.
///
/// `Percent` is used for the configurable limits of the
/// [`Thresholds`]. It is _not_ capped at `100`: a utilization limit
/// above `100%` is a legitimate way of saying "never alert on
/// utilization".
///
/// # Example
///
/// ```
/// use ifrate_core::measure::Percent;
///
/// let limit = Percent::new(80.0).unwrap();
/// assert_eq!(limit.to_string(), "80%");
///
/// let parsed: Percent = "80%".parse().unwrap();
/// assert_eq!(parsed, limit);
/// ```
///
/// [`Thresholds`]: crate::health::Thresholds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);
    pub const EIGHTY: Self = Self(80.0);
    pub const HUNDRED: Self = Self(100.0);

    /// fails if `value` is NaN, infinite or negative
    pub fn new(value: f64) -> Result<Self, PercentError> {
        if !value.is_finite() || value < 0.0 {
            return Err(PercentError(value));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Shortest representation that parses back to the same value.
impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// `"80%"`, `"0.5 %"`. The percent sign is mandatory so a ratio
/// (`0.8`) is never mistaken for a percentage.
impl FromStr for Percent {
    type Err = PercentParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let number = input
            .trim()
            .strip_suffix('%')
            .ok_or_else(|| PercentParseError::NoPercentSign {
                input: input.to_owned(),
            })?;

        let value = f64::from_str(number.trim_end()).map_err(|error| {
            PercentParseError::NotANumber {
                input: input.to_owned(),
                error,
            }
        })?;

        Ok(Self::new(value)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Percentage must be finite and non-negative, got {0}")]
pub struct PercentError(pub f64);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PercentParseError {
    #[error("Missing `%' in {input:?}")]
    NoPercentSign { input: String },
    #[error("Not a number in {input:?}")]
    NotANumber {
        input: String,
        #[source]
        error: ParseFloatError,
    },
    #[error(transparent)]
    OutOfRange(#[from] PercentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(Percent::new(f64::NAN).unwrap_err().0.is_nan());
        assert_eq!(
            Percent::new(f64::NEG_INFINITY),
            Err(PercentError(f64::NEG_INFINITY))
        );
        assert_eq!(Percent::new(-0.1), Err(PercentError(-0.1)));
        assert_eq!(
            Percent::new(-2.0).unwrap_err().to_string(),
            "Percentage must be finite and non-negative, got -2"
        );

        // limits above 100% disable a check, they are valid
        assert_eq!(Percent::new(250.0).map(Percent::value), Ok(250.0));
    }

    #[test]
    fn display() {
        assert_eq!(Percent::EIGHTY.to_string(), "80%");
        assert_eq!(Percent::ZERO.to_string(), "0%");
        assert_eq!(Percent::new(0.5).unwrap().to_string(), "0.5%");
        assert_eq!(Percent::new(33.333).unwrap().to_string(), "33.333%");
    }

    #[test]
    fn display_parses_back() {
        for value in [0.0, 0.1, 0.25, 1.0 / 3.0, 33.333, 80.0, 99.999_999, 1_000.0] {
            let percent = Percent::new(value).unwrap();
            assert_eq!(percent.to_string().parse::<Percent>(), Ok(percent));
        }
    }

    #[test]
    fn parse() {
        assert_eq!("1%".parse::<Percent>(), Ok(Percent::ONE));
        assert_eq!("100%".parse::<Percent>(), Ok(Percent::HUNDRED));
        assert_eq!(" 0.5 %".parse::<Percent>().map(Percent::value), Ok(0.5));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "0.8".parse::<Percent>(),
            Err(PercentParseError::NoPercentSign { .. })
        ));
        assert!(matches!(
            "eighty%".parse::<Percent>(),
            Err(PercentParseError::NotANumber { .. })
        ));
        assert_eq!(
            "-1%".parse::<Percent>(),
            Err(PercentParseError::OutOfRange(PercentError(-1.0)))
        );
    }
}
