//! Cron candidate generation.
//!
//! Schedule tags use standard 5-field cron (`min hour day-of-month month
//! day-of-week`). The `cron` crate wants a leading seconds field and numbers
//! days of the week from 1 (Sunday), so expressions are validated and
//! rewritten before parsing.
//!
//! When both day-of-month and day-of-week are restricted, a day matches if
//! either field matches. The `cron` crate requires both, so such expressions
//! are split into two schedules and the earlier occurrence wins.

use std::str::FromStr;

use autostate_core::{Action, ActionKind, AutoStateError, Resource};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule;

/// Occurrences are searched strictly after `now` plus this many seconds,
/// leaving room for clock skew and for the action currently being executed.
pub const LOOKAHEAD_SECS: i64 = 60;

const DAY_NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Validate a 5-field schedule tag and rewrite it into the 6-field form the
/// `cron` crate parses.
///
/// - exactly five whitespace-separated fields
/// - the minute field may not be `*` or `-` (no every-minute schedules)
/// - a `-` field elsewhere means `*`
/// - `:` is accepted as a list separator and becomes `,`
/// - numeric days of the week (`0`-`7`, Sunday = 0 or 7) become day names
pub(crate) fn normalize_cron(expression: &str) -> Result<String, AutoStateError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(AutoStateError::Validation(format!(
            "Invalid cron expression: {}. Expecting 5 fields and received {}",
            expression.trim(),
            fields.len()
        )));
    }
    if fields[0] == "*" || fields[0] == "-" {
        return Err(AutoStateError::Validation(
            "Invalid cron expression. The use of * or - in the minute field is not allowed."
                .to_string(),
        ));
    }

    let mut normalized = Vec::with_capacity(6);
    normalized.push("0".to_string());
    for (i, field) in fields.iter().enumerate() {
        let field = if i > 0 && *field == "-" {
            "*".to_string()
        } else {
            field.replace(':', ",")
        };
        if i == 4 {
            normalized.push(day_of_week_names(&field)?);
        } else {
            normalized.push(field);
        }
    }
    Ok(normalized.join(" "))
}

fn day_of_week_error(bound: &str) -> AutoStateError {
    AutoStateError::Validation(format!(
        "Invalid cron expression: day of week {bound} is out of range 0-7"
    ))
}

fn day_number(bound: &str) -> Result<Option<usize>, AutoStateError> {
    if bound.is_empty() || !bound.chars().all(|c| c.is_ascii_digit()) {
        return Ok(None);
    }
    match bound.parse::<usize>() {
        Ok(n) if n < DAY_NAMES.len() => Ok(Some(n)),
        _ => Err(day_of_week_error(bound)),
    }
}

/// A numeric range ending on Sunday written as 7. The `cron` crate has no
/// day after Saturday, so the Sunday end is listed separately.
fn range_through_sunday(low: usize, step: Option<&str>) -> Result<String, AutoStateError> {
    let Some(step) = step else {
        return Ok(match low {
            0 => "*".to_string(),
            6 => "Sat,Sun".to_string(),
            7 => "Sun".to_string(),
            _ => format!("{}-Sat,Sun", DAY_NAMES[low]),
        });
    };
    if low == 0 {
        return Ok(format!("*/{step}"));
    }
    let every = step
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AutoStateError::Validation(format!("Invalid cron expression: bad day of week step {step}")))?;
    Ok((low..=7)
        .step_by(every)
        .map(|n| DAY_NAMES[n])
        .collect::<Vec<_>>()
        .join(","))
}

/// Rewrite numeric day-of-week values as names. Steps are kept except on
/// ranges ending on 7, which are expanded.
fn day_of_week_names(field: &str) -> Result<String, AutoStateError> {
    let mut items = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        if let Some((low, high)) = range.split_once('-') {
            if let (Some(low), Some(7)) = (day_number(low)?, day_number(high)?) {
                items.push(range_through_sunday(low, step)?);
                continue;
            }
        }
        let mut bounds = Vec::new();
        for bound in range.split('-') {
            match day_number(bound)? {
                Some(n) => bounds.push(DAY_NAMES[n].to_string()),
                None => bounds.push(bound.to_string()),
            }
        }
        let mut rewritten = bounds.join("-");
        if let Some(step) = step {
            rewritten.push('/');
            rewritten.push_str(step);
        }
        items.push(rewritten);
    }
    Ok(items.join(","))
}

fn is_unrestricted(field: &str) -> bool {
    field.starts_with('*') || field == "?"
}

fn build_schedule(expression: &str, fields: &[&str]) -> Result<Schedule, AutoStateError> {
    Schedule::from_str(&fields.join(" ")).map_err(|e| {
        AutoStateError::Validation(format!("Invalid cron expression: {}. {}", expression.trim(), e))
    })
}

/// Parse a schedule tag into the [`Schedule`]s whose earliest occurrence is
/// the tag's next occurrence. Two when day-of-month and day-of-week are
/// both restricted, one otherwise.
pub fn parse_schedules(expression: &str) -> Result<Vec<Schedule>, AutoStateError> {
    let normalized = normalize_cron(expression)?;
    let fields: Vec<&str> = normalized.split(' ').collect();
    let (day_of_month, day_of_week) = (fields[3], fields[5]);
    if is_unrestricted(day_of_month) || is_unrestricted(day_of_week) {
        return Ok(vec![build_schedule(expression, &fields)?]);
    }

    let mut by_month_day = fields.clone();
    by_month_day[5] = "*";
    let mut by_week_day = fields;
    by_week_day[3] = "*";
    Ok(vec![
        build_schedule(expression, &by_month_day)?,
        build_schedule(expression, &by_week_day)?,
    ])
}

/// Resolve the `timezone` tag; absent means UTC.
pub fn resolve_timezone(timezone: Option<&str>) -> Result<Tz, AutoStateError> {
    match timezone {
        None => Ok(chrono_tz::UTC),
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| AutoStateError::Validation(format!("Invalid timezone: {name}"))),
    }
}

/// Next occurrence of `expression` for `resource`, evaluated in the
/// resource's timezone and strictly after `now + LOOKAHEAD_SECS`.
///
/// Returns `Ok(None)` when the expression has no future occurrence and a
/// [`AutoStateError::Validation`] when it cannot be evaluated at all.
pub fn cron_candidate(
    resource: &Resource,
    kind: ActionKind,
    expression: &str,
    now: DateTime<Utc>,
) -> Result<Option<Action>, AutoStateError> {
    let schedules = parse_schedules(expression)?;
    let tz = resolve_timezone(resource.tags.timezone.as_deref())?;

    let after = (now + Duration::seconds(LOOKAHEAD_SECS)).with_timezone(&tz);
    let next = schedules
        .iter()
        .filter_map(|schedule| schedule.after(&after).next())
        .min();

    Ok(next.map(|when| Action {
        resource_type: resource.resource_type,
        resource_id: resource.id.clone(),
        fingerprint: resource.fingerprint.clone(),
        when: when.with_timezone(&Utc),
        kind,
    }))
}
