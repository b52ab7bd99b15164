use chrono::{DateTime, Utc};

use crate::report::{JobStep, JobTiming, StepTiming};

/// A step is slow past this absolute duration.
const SLOW_STEP_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// A step is also slow past this share of the whole job.
const SLOW_STEP_JOB_FRACTION: f64 = 0.6;

/// Derives job/step durations and slowness flags from step timestamps.
///
/// Pure computation over the step metadata; log text is never consulted.
/// Job duration is last step completion minus first step start, clamped to
/// zero when timestamps are missing. Queue time is the gap between the job
/// starting and its first step starting, when both are known.
pub fn calculate_timing(
    job_name: &str,
    job_started_at: Option<DateTime<Utc>>,
    steps: &[JobStep],
) -> JobTiming {
    let first_start = steps.iter().filter_map(|s| s.started_at).min();
    let last_completion = steps.iter().filter_map(|s| s.completed_at).max();

    let job_duration_ms = match (first_start, last_completion) {
        (Some(start), Some(end)) => (end - start).num_milliseconds().max(0),
        _ => 0,
    };

    let queue_time_ms = match (job_started_at, first_start) {
        (Some(job_start), Some(step_start)) => (step_start - job_start).num_milliseconds().max(0),
        _ => 0,
    };

    let step_timings: Vec<StepTiming> = steps
        .iter()
        .map(|step| {
            let duration_ms = step_duration_ms(step);
            StepTiming {
                name: step.name.clone(),
                duration_ms,
                is_slow: is_slow(duration_ms, job_duration_ms),
            }
        })
        .collect();

    let slowest_step = step_timings
        .iter()
        .max_by_key(|s| s.duration_ms)
        .filter(|s| s.duration_ms > 0)
        .map(|s| s.name.clone());

    JobTiming {
        job_name: job_name.to_string(),
        job_duration_ms,
        queue_time_ms,
        slowest_step,
        steps: step_timings,
    }
}

fn step_duration_ms(step: &JobStep) -> i64 {
    match (step.started_at, step.completed_at) {
        (Some(start), Some(end)) => (end - start).num_milliseconds().max(0),
        _ => 0,
    }
}

fn is_slow(duration_ms: i64, job_duration_ms: i64) -> bool {
    if duration_ms > SLOW_STEP_THRESHOLD_MS {
        return true;
    }

    #[allow(clippy::cast_precision_loss)]
    let over_fraction =
        job_duration_ms > 0 && duration_ms as f64 > SLOW_STEP_JOB_FRACTION * job_duration_ms as f64;
    over_fraction
}
