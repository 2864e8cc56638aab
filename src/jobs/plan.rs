//! Schedule plan construction from a job definition.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::{Job, SchedulePlan};

/// Parse a cron expression.
///
/// Classic 5-field expressions (minute granularity) get a zero seconds field
/// prepended; 6- and 7-field expressions are seconds-first.
pub fn parse_schedule(expr: &str) -> JobResult<cron::Schedule> {
    let trimmed = expr.trim();
    let normalized = match trimmed.split_whitespace().count() {
        5 => format!("0 {trimmed}"),
        _ => trimmed.to_string(),
    };

    cron::Schedule::from_str(&normalized).map_err(|e| JobError::InvalidCronExpression {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Build the plan for `job` with its first fire time strictly after `now`.
pub fn build_plan(job: &Job, now: DateTime<Utc>) -> JobResult<SchedulePlan> {
    let schedule = parse_schedule(&job.cron_expr)?;
    let next_time = schedule.after(&now).next();

    Ok(SchedulePlan {
        job: job.clone(),
        schedule,
        next_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    fn job(expr: &str) -> Job {
        Job::new("job", "true", expr)
    }

    #[test]
    fn test_six_field_expression() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap();
        let plan = build_plan(&job("*/5 * * * * *"), now).unwrap();
        assert_eq!(
            plan.next_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap())
        );
    }

    #[test]
    fn test_five_field_expression_fires_on_the_minute() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap();
        let plan = build_plan(&job("*/15 * * * *"), now).unwrap();
        let next = plan.next_time.unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 12, 15, 0).unwrap());
        assert_eq!(next.second(), 0);
    }

    #[test]
    fn test_next_time_is_strictly_after_now_on_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();
        let plan = build_plan(&job("*/5 * * * * *"), now).unwrap();
        assert_eq!(
            plan.next_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 10).unwrap())
        );
    }

    #[test]
    fn test_seven_field_expression_in_the_past_has_no_next_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let plan = build_plan(&job("0 0 0 1 1 * 2001"), now).unwrap();
        assert!(plan.next_time.is_none());
    }

    #[test]
    fn test_malformed_expression_is_rejected() {
        let err = build_plan(&job("not a cron"), Utc::now()).unwrap_err();
        match err {
            JobError::InvalidCronExpression { expr, .. } => assert_eq!(expr, "not a cron"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_schedule("").is_err());
        assert!(parse_schedule("99 * * * * *").is_err());
    }

    #[test]
    fn test_plan_keeps_job_definition() {
        let definition = Job::new("report", "echo report", "0 0 * * * *");
        let plan = build_plan(&definition, Utc::now()).unwrap();
        assert_eq!(plan.job, definition);
    }

    proptest! {
        #[test]
        fn prop_next_time_strictly_after_now(
            secs in 0i64..4_000_000_000i64,
            millis in 0u32..1000u32,
            step in 1u32..30u32,
        ) {
            let now = Utc.timestamp_opt(secs, millis * 1_000_000).unwrap();
            let plan = build_plan(&job(&format!("*/{step} * * * * *")), now).unwrap();
            let next = plan.next_time.unwrap();
            prop_assert!(next > now);
            prop_assert!(next - now <= chrono::Duration::seconds(60));
        }
    }
}
