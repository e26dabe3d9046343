//! Human-readable rendering of elapsed time.

use chrono::Duration;
use serde::{Serialize, Serializer};

const MICROS_PER_MILLI: i64 = 1_000;
const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Render a duration largest unit first, omitting zero units.
///
/// `0s`, `250ms`, `1.5s`, `1h1m1s`, `2d3h`. Negative durations get a leading `-`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    // num_microseconds only overflows beyond ~292k years
    let micros = duration.num_microseconds().unwrap_or(i64::MAX);
    if micros == 0 {
        return "0s".to_string();
    }
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.checked_abs().unwrap_or(i64::MAX);
    if abs < MICROS_PER_SECOND {
        return if abs < MICROS_PER_MILLI {
            format!("{sign}{abs}µs")
        } else {
            format!(
                "{sign}{}ms",
                trim_fraction(abs / MICROS_PER_MILLI, abs % MICROS_PER_MILLI, 3)
            )
        };
    }

    let days = abs / MICROS_PER_DAY;
    let hours = (abs % MICROS_PER_DAY) / MICROS_PER_HOUR;
    let minutes = (abs % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
    let seconds = (abs % MICROS_PER_MINUTE) / MICROS_PER_SECOND;
    let sub_second = abs % MICROS_PER_SECOND;

    let mut out = String::from(sign);
    for (value, unit) in [(days, "d"), (hours, "h"), (minutes, "m")] {
        if value > 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }
    if seconds > 0 || sub_second > 0 {
        out.push_str(&trim_fraction(seconds, sub_second, 6));
        out.push('s');
    }
    out
}

/// `whole.fraction` with trailing zeros of the fraction removed.
fn trim_fraction(whole: i64, fraction: i64, width: usize) -> String {
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// A derived elapsed time, serialized as seconds plus its readable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

impl Elapsed {
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }

    /// Seconds with microsecond precision.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_seconds_f64(self) -> f64 {
        self.0
            .num_microseconds()
            .map_or(self.0.num_seconds() as f64, |us| us as f64 / 1_000_000.0)
    }
}

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl Serialize for Elapsed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Elapsed", 2)?;
        state.serialize_field("seconds", &self.as_seconds_f64())?;
        state.serialize_field("display", &format_duration(self.0))?;
        state.end()
    }
}
