use crate::{
    defaults::{DEFAULT_ERROR_RATE_LIMIT, DEFAULT_UTILIZATION_LIMIT},
    measure::{Percent, PercentError, PercentParseError},
    rate::RateResult,
};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Health of a target over one sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthVerdict {
    Optimal,
    Alert,
}

/// Limits against which a [`RateResult`] is classified.
///
/// Validated once, at construction time:
///
/// * the utilization limit must be finite and non-negative. It may
///   be above `100%` to never alert on utilization;
/// * the error rate limit must be within `[0, 100]`.
///
/// # Example
///
/// ```
/// use ifrate_core::health::Thresholds;
///
/// let thresholds: Thresholds = "utilization=90%, error_rate=0.5%".parse().unwrap();
/// assert_eq!(thresholds.utilization_limit().value(), 90.0);
/// assert_eq!(thresholds.error_rate_limit().value(), 0.5);
///
/// // entries not given keep their default value
/// let thresholds: Thresholds = "error_rate=2%".parse().unwrap();
/// assert_eq!(thresholds.utilization_limit().value(), 80.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    utilization_limit: Percent,
    error_rate_limit: Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ThresholdError {
    #[error("Invalid utilization limit")]
    UtilizationLimit(#[source] PercentError),
    #[error("Error rate limit must be within [0, 100], got {value}")]
    ErrorRateLimit { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdParseError {
    #[error("Unexpected `{token}', expecting {expected}")]
    UnexpectedToken {
        token: String,
        expected: &'static str,
    },
    #[error("Unexpected end of input, expecting {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("`{key}' is set more than once")]
    Duplicate { key: &'static str },
    #[error("Invalid percentage")]
    Percent(#[from] PercentParseError),
    #[error(transparent)]
    Invalid(#[from] ThresholdError),
}

/// Classifies [`RateResult`]s against [`Thresholds`].
///
/// ```
/// use ifrate_core::{HealthClassifier, HealthVerdict, RateCalculator, Thresholds};
/// # use ifrate_core::{CounterDelta, Counters, LinkCapacity};
/// # use std::time::Duration;
/// # let delta = CounterDelta::from_parts(
/// #     "agent-1".into(),
/// #     Duration::from_secs(1),
/// #     Counters { in_octets: 1_250_000, ..Counters::ZERO },
/// #     Some(LinkCapacity::from_mbps(10)),
/// # );
///
/// let rate = RateCalculator::new().compute(&delta).unwrap();
/// # assert_eq!(rate.utilization_pct, 100.0);
///
/// assert_eq!(
///     HealthClassifier::classify(&rate, &Thresholds::default()),
///     HealthVerdict::Alert,
/// );
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HealthClassifier;

impl HealthClassifier {
    /// [`HealthVerdict::Alert`] if either limit is reached (limits are
    /// inclusive), [`HealthVerdict::Optimal`] otherwise.
    pub fn classify(result: &RateResult, thresholds: &Thresholds) -> HealthVerdict {
        let utilization = result.utilization_pct >= thresholds.utilization_limit.value();
        let errors = result.error_rate_pct >= thresholds.error_rate_limit.value();

        if utilization || errors {
            HealthVerdict::Alert
        } else {
            HealthVerdict::Optimal
        }
    }
}

impl HealthVerdict {
    #[inline]
    pub fn is_alert(self) -> bool {
        matches!(self, Self::Alert)
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => f.write_str("optimal"),
            Self::Alert => f.write_str("alert"),
        }
    }
}

impl Thresholds {
    /// create new thresholds from percentages
    ///
    /// ```
    /// # use ifrate_core::Thresholds;
    /// assert!(Thresholds::new(80.0, 1.0).is_ok());
    /// // utilization alerts can be disabled
    /// assert!(Thresholds::new(1_000.0, 1.0).is_ok());
    /// assert!(Thresholds::new(80.0, 101.0).is_err());
    /// assert!(Thresholds::new(f64::NAN, 1.0).is_err());
    /// ```
    pub fn new(
        utilization_limit_pct: f64,
        error_rate_limit_pct: f64,
    ) -> Result<Self, ThresholdError> {
        let utilization_limit =
            Percent::new(utilization_limit_pct).map_err(ThresholdError::UtilizationLimit)?;
        let error_rate_limit = Percent::new(error_rate_limit_pct).map_err(|_| {
            ThresholdError::ErrorRateLimit {
                value: error_rate_limit_pct,
            }
        })?;

        Self::from_percents(utilization_limit, error_rate_limit)
    }

    pub fn from_percents(
        utilization_limit: Percent,
        error_rate_limit: Percent,
    ) -> Result<Self, ThresholdError> {
        if error_rate_limit > Percent::HUNDRED {
            return Err(ThresholdError::ErrorRateLimit {
                value: error_rate_limit.value(),
            });
        }

        Ok(Self {
            utilization_limit,
            error_rate_limit,
        })
    }

    #[inline]
    pub fn utilization_limit(&self) -> Percent {
        self.utilization_limit
    }

    #[inline]
    pub fn error_rate_limit(&self) -> Percent {
        self.error_rate_limit
    }

    #[inline]
    pub fn classify(&self, result: &RateResult) -> HealthVerdict {
        HealthClassifier::classify(result, self)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            utilization_limit: DEFAULT_UTILIZATION_LIMIT,
            error_rate_limit: DEFAULT_ERROR_RATE_LIMIT,
        }
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "utilization={}, error_rate={}",
            self.utilization_limit, self.error_rate_limit
        )
    }
}

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"\s+")]
enum ThresholdToken {
    #[token("utilization")]
    Utilization,
    #[token("error_rate")]
    ErrorRate,
    #[token("=")]
    Equal,
    #[token(",")]
    Comma,

    #[regex(r"[0-9]+(\.[0-9]+)?%")]
    Percent,
}

const EXPECT_KEY: &str = "`utilization' or `error_rate'";

fn expect(
    lex: &mut Lexer<'_, ThresholdToken>,
    token: ThresholdToken,
    expected: &'static str,
) -> Result<(), ThresholdParseError> {
    match lex.next() {
        Some(Ok(next)) if next == token => Ok(()),
        Some(_) => Err(ThresholdParseError::UnexpectedToken {
            token: lex.slice().to_owned(),
            expected,
        }),
        None => Err(ThresholdParseError::UnexpectedEnd { expected }),
    }
}

impl FromStr for Thresholds {
    type Err = ThresholdParseError;

    /// Parses a comma separated list of `key=value%` entries.
    ///
    /// Nothing is applied unless the whole string is valid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = ThresholdToken::lexer(s);

        let mut utilization: Option<Percent> = None;
        let mut error_rate: Option<Percent> = None;

        loop {
            let (slot, key) = match lex.next() {
                Some(Ok(ThresholdToken::Utilization)) => (&mut utilization, "utilization"),
                Some(Ok(ThresholdToken::ErrorRate)) => (&mut error_rate, "error_rate"),
                Some(_) => {
                    return Err(ThresholdParseError::UnexpectedToken {
                        token: lex.slice().to_owned(),
                        expected: EXPECT_KEY,
                    });
                }
                None => return Err(ThresholdParseError::UnexpectedEnd { expected: EXPECT_KEY }),
            };

            expect(&mut lex, ThresholdToken::Equal, "`='")?;
            expect(&mut lex, ThresholdToken::Percent, "a percentage")?;
            let value: Percent = lex.slice().parse()?;

            if slot.replace(value).is_some() {
                return Err(ThresholdParseError::Duplicate { key });
            }

            match lex.next() {
                None => break,
                Some(Ok(ThresholdToken::Comma)) => continue,
                Some(_) => {
                    return Err(ThresholdParseError::UnexpectedToken {
                        token: lex.slice().to_owned(),
                        expected: "`,'",
                    });
                }
            }
        }

        Ok(Self::from_percents(
            utilization.unwrap_or(DEFAULT_UTILIZATION_LIMIT),
            error_rate.unwrap_or(DEFAULT_ERROR_RATE_LIMIT),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{delta::DeltaQuality, measure::LinkCapacity};
    use std::time::Duration;

    fn rate(utilization_pct: f64, error_rate_pct: f64) -> RateResult {
        RateResult {
            target_key: "agent-1".into(),
            elapsed: Duration::from_secs(1),
            bandwidth_bps: 0.0,
            in_bps: 0.0,
            out_bps: 0.0,
            utilization_pct,
            error_rate_pct,
            capacity: LinkCapacity::from_mbps(100),
            capacity_is_assumed: false,
            total_octets: 0,
            total_packets: 0,
            total_errors: 0,
            quality: DeltaQuality::Valid,
        }
    }

    #[test]
    fn truth_table() {
        let thresholds = Thresholds::new(80.0, 1.0).unwrap();

        macro_rules! assert_verdict {
            (($u:expr, $e:expr) => $verdict:ident) => {
                assert_eq!(
                    HealthClassifier::classify(&rate($u, $e), &thresholds),
                    HealthVerdict::$verdict,
                    "utilization={}, error_rate={}",
                    $u,
                    $e,
                );
            };
        }

        assert_verdict!((79.9, 0.5) => Optimal);
        // limits are inclusive
        assert_verdict!((80.0, 0.5) => Alert);
        assert_verdict!((79.9, 1.0) => Alert);
        assert_verdict!((95.0, 3.0) => Alert);
        assert_verdict!((0.0, 0.0) => Optimal);
        assert_verdict!((150.0, 0.0) => Alert);
    }

    #[test]
    fn disabled_utilization_alerts() {
        let thresholds = Thresholds::new(1_000.0, 1.0).unwrap();
        assert_eq!(thresholds.classify(&rate(250.0, 0.0)), HealthVerdict::Optimal);
    }

    #[test]
    fn zero_limits_always_alert() {
        let thresholds = Thresholds::new(0.0, 0.0).unwrap();
        assert_eq!(thresholds.classify(&rate(0.0, 0.0)), HealthVerdict::Alert);
    }

    #[test]
    fn classify_is_idempotent() {
        let thresholds = Thresholds::default();
        let rate = rate(42.0, 0.2);
        assert_eq!(thresholds.classify(&rate), thresholds.classify(&rate));
    }

    #[test]
    fn validation() {
        assert!(matches!(
            Thresholds::new(-1.0, 1.0),
            Err(ThresholdError::UtilizationLimit(_))
        ));
        assert!(matches!(
            Thresholds::new(f64::INFINITY, 1.0),
            Err(ThresholdError::UtilizationLimit(_))
        ));
        assert_eq!(
            Thresholds::new(80.0, -0.5),
            Err(ThresholdError::ErrorRateLimit { value: -0.5 })
        );
        assert_eq!(
            Thresholds::new(80.0, 100.5),
            Err(ThresholdError::ErrorRateLimit { value: 100.5 })
        );
        assert!(Thresholds::new(100.0, 100.0).is_ok());
    }

    #[test]
    fn error_chain_reads_once() {
        let error = anyhow::Error::from(Thresholds::new(-1.0, 1.0).unwrap_err());
        assert_eq!(
            format!("{error:#}"),
            "Invalid utilization limit: Percentage must be finite and non-negative, got -1"
        );

        // too many digits for an f64
        let input = format!("utilization={}%", "9".repeat(400));
        let error = anyhow::Error::from(input.parse::<Thresholds>().unwrap_err());
        assert_eq!(
            format!("{error:#}"),
            "Invalid percentage: Percentage must be finite and non-negative, got inf"
        );
    }

    #[test]
    fn defaults() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.utilization_limit().value(), 80.0);
        assert_eq!(thresholds.error_rate_limit().value(), 1.0);
        assert_eq!(thresholds.to_string(), "utilization=80%, error_rate=1%");
    }

    #[test]
    fn parse() {
        let thresholds: Thresholds = "utilization=70%,error_rate=0.25%".parse().unwrap();
        assert_eq!(thresholds, Thresholds::new(70.0, 0.25).unwrap());

        let thresholds: Thresholds = " error_rate = 5% , utilization = 120% ".parse().unwrap();
        assert_eq!(thresholds, Thresholds::new(120.0, 5.0).unwrap());
    }

    #[test]
    fn parse_display_round_trip() {
        for (utilization, error_rate) in [(65.0, 0.5), (33.333, 0.125), (87.5, 0.001)] {
            let thresholds = Thresholds::new(utilization, error_rate).unwrap();
            assert_eq!(
                thresholds.to_string().parse::<Thresholds>().unwrap(),
                thresholds
            );
        }
        assert_eq!(
            Thresholds::new(33.333, 0.125).unwrap().to_string(),
            "utilization=33.333%, error_rate=0.125%"
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "".parse::<Thresholds>(),
            Err(ThresholdParseError::UnexpectedEnd {
                expected: EXPECT_KEY
            })
        );
        assert!(matches!(
            "bandwidth=10%".parse::<Thresholds>(),
            Err(ThresholdParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            "utilization 10%".parse::<Thresholds>(),
            Err(ThresholdParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            "utilization=10".parse::<Thresholds>(),
            Err(ThresholdParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            "utilization=".parse::<Thresholds>(),
            Err(ThresholdParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            "utilization=10%,".parse::<Thresholds>(),
            Err(ThresholdParseError::UnexpectedEnd { .. })
        ));
        assert_eq!(
            "utilization=10%, utilization=20%".parse::<Thresholds>(),
            Err(ThresholdParseError::Duplicate { key: "utilization" })
        );
    }

    #[test]
    fn parse_is_all_or_nothing() {
        // a valid utilization does not get applied when the error rate
        // is out of range
        assert_eq!(
            "utilization=50%, error_rate=150%".parse::<Thresholds>(),
            Err(ThresholdParseError::Invalid(
                ThresholdError::ErrorRateLimit { value: 150.0 }
            ))
        );
    }
}
