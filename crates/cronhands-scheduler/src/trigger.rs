//! Next-fire-time computation for cron and interval schedules.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use cronhands_core::{ScheduleKind, ScheduleSpec};

use crate::error::ScheduleError;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Wall-clock slots examined per lookup; only DST overlaps need more than one.
const MAX_WALL_CANDIDATES: usize = 8;

/// A parsed schedule that can compute its next firing.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// 5-field crontab expression evaluated in `timezone`.
    Cron {
        expression: String,
        schedule: Box<Schedule>,
        timezone: Tz,
    },
    /// Fixed period counted from `anchor`. The first firing is `anchor + every`.
    Interval {
        expression: String,
        every: TimeDelta,
        anchor: DateTime<Utc>,
    },
}

impl Trigger {
    /// Build a trigger from a job's schedule.
    ///
    /// An empty timezone falls back to `default_timezone`. Intervals anchor at `now`.
    pub fn from_spec(
        spec: &ScheduleSpec,
        default_timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        match spec.kind {
            ScheduleKind::Cron => {
                let timezone = if spec.timezone.trim().is_empty() {
                    default_timezone
                } else {
                    spec.timezone.as_str()
                };
                Self::cron(&spec.expression, timezone)
            }
            ScheduleKind::Interval => Self::interval(&spec.expression, now),
        }
    }

    /// Parse a crontab expression (or `@hourly`-style alias).
    pub fn cron(expression: &str, timezone: &str) -> Result<Self, ScheduleError> {
        let timezone: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))?;

        let invalid = |message: String| ScheduleError::InvalidCron {
            expression: expression.to_string(),
            message,
        };
        let translated = crontab_to_schedule(expression).map_err(invalid)?;
        let schedule = Schedule::from_str(&translated).map_err(|e| invalid(e.to_string()))?;

        Ok(Trigger::Cron {
            expression: expression.trim().to_string(),
            schedule: Box::new(schedule),
            timezone,
        })
    }

    /// Parse an interval such as `90s` or `2h`, anchored at `anchor`.
    pub fn interval(expression: &str, anchor: DateTime<Utc>) -> Result<Self, ScheduleError> {
        let every = parse_interval(expression)?;
        let every = TimeDelta::from_std(every).map_err(|_| ScheduleError::InvalidInterval {
            expression: expression.to_string(),
            message: "interval is too large".to_string(),
        })?;
        Ok(Trigger::Interval {
            expression: expression.trim().to_string(),
            every,
            anchor,
        })
    }

    /// First firing strictly after `after`, or `None` if the schedule never fires again.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron {
                schedule, timezone, ..
            } => {
                // Walk wall-clock times, then place each one in the zone.
                let wall_after = after.with_timezone(timezone).naive_local().and_utc();
                schedule
                    .after(&wall_after)
                    .take(MAX_WALL_CANDIDATES)
                    .find_map(|wall| resolve_wall_clock(*timezone, wall.naive_utc(), after))
            }
            Trigger::Interval { every, anchor, .. } => {
                let every_ms = every.num_milliseconds();
                if every_ms <= 0 {
                    return None;
                }
                let elapsed_ms = (after - *anchor).num_milliseconds().max(0);
                let periods = elapsed_ms / every_ms + 1;
                let offset = periods.checked_mul(every_ms)?;
                anchor.checked_add_signed(TimeDelta::milliseconds(offset))
            }
        }
    }

    /// Whether any firing falls in `[start, end]`.
    pub fn fires_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start
            .checked_sub_signed(TimeDelta::milliseconds(1))
            .and_then(|before| self.next_fire_after(before))
            .is_some_and(|next| next <= end)
    }
}

/// Map a cron wall-clock time to the first matching instant after `after`.
///
/// On a fall-back overlap the earlier instant wins, so a wall time fires once.
/// A time inside a spring-forward gap keeps its offset from the pre-gap zone
/// and lands as far past the gap start as it was scheduled (02:30 runs at 03:30).
fn resolve_wall_clock(
    timezone: Tz,
    wall: NaiveDateTime,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let instant = match timezone.from_local_datetime(&wall) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, latest) => {
            return [earliest, latest]
                .into_iter()
                .map(|local| local.with_timezone(&Utc))
                .find(|instant| *instant > after);
        }
        LocalResult::None => {
            let before_gap = timezone
                .offset_from_utc_datetime(&(wall - TimeDelta::days(1)))
                .fix();
            (wall - TimeDelta::seconds(before_gap.local_minus_utc().into())).and_utc()
        }
    };
    (instant > after).then_some(instant)
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Cron {
                expression,
                timezone,
                ..
            } => write!(f, "cron[{} {}]", expression, timezone),
            Trigger::Interval { expression, .. } => write!(f, "interval[{}]", expression),
        }
    }
}

/// Parse `<digits><unit>` where unit is one of `s`, `m`, `h`, `d` (any case).
pub fn parse_interval(expression: &str) -> Result<Duration, ScheduleError> {
    let invalid = |message: &str| ScheduleError::InvalidInterval {
        expression: expression.to_string(),
        message: message.to_string(),
    };

    let trimmed = expression.trim();
    let Some(unit) = trimmed.chars().last() else {
        return Err(invalid("interval is empty"));
    };
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];

    let multiplier: u64 = match unit.to_ascii_lowercase() {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        _ => return Err(invalid("unit must be one of s, m, h, d")),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected a whole number before the unit"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| invalid("number is out of range"))?;
    if value == 0 {
        return Err(invalid("interval must be greater than zero"));
    }
    let secs = value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("number is out of range"))?;

    Ok(Duration::from_secs(secs))
}

/// Turn a 5-field crontab line into the seconds-first form the `cron` crate
/// parses, rewriting day-of-week to names so crontab numbering (0/7 = Sunday)
/// survives.
fn crontab_to_schedule(expression: &str) -> Result<String, String> {
    let expression = match expression.trim() {
        "@yearly" | "@annually" => "0 0 1 1 *",
        "@monthly" => "0 0 1 * *",
        "@weekly" => "0 0 * * 0",
        "@daily" | "@midnight" => "0 0 * * *",
        "@hourly" => "0 * * * *",
        other => other,
    };

    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!(
            "expected 5 fields (minute hour day-of-month month day-of-week), got {}",
            fields.len()
        ));
    }

    let day_of_week = translate_day_of_week(fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], day_of_week
    ))
}

fn translate_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok("*".to_string());
    }

    let mut days = [false; 7];
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{}'", step))?;
                if step == 0 {
                    return Err("day-of-week step must be greater than zero".to_string());
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((a, b)) = range.split_once('-') {
            let (a, b) = (parse_day(a)?, parse_day(b)?);
            if a > b {
                return Err(format!("day-of-week range '{}' is reversed", range));
            }
            (a, b)
        } else {
            let day = parse_day(range)?;
            (day, if step.is_some() { 6 } else { day })
        };

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days[day % 7] = true;
        }
    }

    if days.iter().all(|d| *d) {
        return Ok("*".to_string());
    }
    let names: Vec<&str> = days
        .iter()
        .zip(DAY_NAMES)
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
    Ok(names.join(","))
}

fn parse_day(value: &str) -> Result<usize, String> {
    if let Ok(n) = value.parse::<usize>() {
        return if n <= 7 {
            Ok(n)
        } else {
            Err(format!("day-of-week {} is out of range 0-7", n))
        };
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown day-of-week '{}'", value))
}
