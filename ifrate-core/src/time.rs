use crate::sample::InvalidSampleError;
use anyhow::{Result, anyhow, bail};
use core::fmt;
use logos::Logos;
use std::{
    str::FromStr,
    time::{self, Instant},
};

/// Capture time of a [`CounterSample`].
///
/// A [`Timestamp`] is an offset from an arbitrary origin on a
/// **monotonic** clock, not a wall-clock time: a producer picks an
/// origin (usually an [`Instant`] taken at startup) and stamps every
/// sample with the time elapsed since. Only the difference between two
/// timestamps of the same producer is meaningful.
///
/// ```
/// # use ifrate_core::Timestamp;
/// # use std::time::Duration;
/// let t1: Timestamp = "10s".parse().unwrap();
/// let t2: Timestamp = "12s 500ms".parse().unwrap();
///
/// assert_eq!(t2.checked_since(t1), Some(Duration::from_millis(2_500)));
/// assert_eq!(t1.checked_since(t2), None);
/// ```
///
/// [`CounterSample`]: crate::CounterSample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(time::Duration);

impl Timestamp {
    pub const ZERO: Self = Self(time::Duration::ZERO);

    #[inline]
    pub const fn from_duration(offset: time::Duration) -> Self {
        Self(offset)
    }

    /// the time elapsed between `origin` and `at`
    ///
    /// Saturates to [`Timestamp::ZERO`] if `at` is earlier than `origin`.
    pub fn between(origin: Instant, at: Instant) -> Self {
        Self(at.saturating_duration_since(origin))
    }

    /// create a [`Timestamp`] from a number of seconds
    ///
    /// # Errors
    ///
    /// fails if `secs` is negative, NaN, infinite or too large to be
    /// represented.
    pub fn from_secs_f64(secs: f64) -> Result<Self, InvalidSampleError> {
        time::Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|_| InvalidSampleError::InvalidTimestamp { secs })
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }

    /// the strictly positive time elapsed since `earlier`
    ///
    /// Returns `None` if `self` is not strictly after `earlier`.
    pub fn checked_since(self, earlier: Self) -> Option<time::Duration> {
        self.0
            .checked_sub(earlier.0)
            .filter(|elapsed| !elapsed.is_zero())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

/// Parses a sum of `<number><unit>` terms, e.g. `"1m 30s"` or `"1500ms"`.
///
/// Units: `h`, `m`, `s`, `ms`, `us` (or `µs`) and `ns`.
impl FromStr for Timestamp {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Token::lexer(s);
        let mut offset: Option<time::Duration> = None;

        while let Some(token) = lex.next() {
            let Ok(Token::Number(count)) = token else {
                bail!("Expected a number at {:?} in `{s}'", lex.span())
            };
            let Some(Ok(Token::Unit(unit))) = lex.next() else {
                bail!("Expected a unit after {count} in `{s}'")
            };

            let term = u32::try_from(count)
                .ok()
                .and_then(|count| unit.checked_mul(count))
                .ok_or_else(|| anyhow!("`{s}' is too large for a timestamp"))?;
            offset = Some(
                offset
                    .unwrap_or_default()
                    .checked_add(term)
                    .ok_or_else(|| anyhow!("`{s}' is too large for a timestamp"))?,
            );
        }

        offset
            .map(Self)
            .ok_or_else(|| anyhow!("Empty timestamp"))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"\s+")]
enum Token {
    #[regex("[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    Number(u64),

    #[token("h", |_| time::Duration::from_secs(3_600))]
    #[token("m", |_| time::Duration::from_secs(60))]
    #[token("s", |_| time::Duration::from_secs(1))]
    #[token("ms", |_| time::Duration::from_millis(1))]
    #[regex("us|µs", |_| time::Duration::from_micros(1))]
    #[token("ns", |_| time::Duration::from_nanos(1))]
    Unit(time::Duration),
}
