/*
 *  Copyright 2026 Process Orchestrator Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Clock & Cron.
//!
//! `Clock` is injected everywhere the core needs "now" so that tests can
//! supply a fixed or manually-advanced instant instead of the wall clock.
//! `CronSchedule` wraps a parsed 5-field cron expression; malformed
//! expressions are rejected at construction (registration time), never at
//! tick time.

use chrono::{DateTime, Utc};
use croner::Cron;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::error::CronError;

/// Source of "now" for the orchestrator core.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is set explicitly, for deterministic tests of the
/// state machine, backoff, and scheduling loop.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().expect("manual clock lock poisoned");
        *guard += delta;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut guard = self.now.lock().expect("manual clock lock poisoned");
        *guard = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock lock poisoned")
    }
}

/// A parsed, validated 5-field cron expression (standard ranges, lists,
/// and steps).
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    cron: Cron,
}

impl CronSchedule {
    /// Parses and validates `expr`. Fails immediately on a malformed
    /// expression rather than deferring to the first `next()` call.
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let cron = Cron::from_str(expr).map_err(|source| CronError::Invalid {
            expr: expr.to_string(),
            source,
        })?;
        Ok(Self {
            expr: expr.to_string(),
            cron,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// Returns the next instant at which this schedule fires strictly
    /// after `after`.
    pub fn next(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CronError> {
        self.cron
            .find_next_occurrence(&after, false)
            .map_err(|_| CronError::NoUpcomingOccurrence(self.expr.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(30));
    }

    #[test]
    fn rejects_malformed_expression_at_parse_time() {
        assert!(CronSchedule::parse("not a cron expr").is_err());
    }

    #[test]
    fn steps_to_next_occurrence() {
        // Minute-field stepping: fires every 5 minutes, on the 5s.
        let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 1, 3, 0).unwrap();
        let next = schedule.next(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 1, 5, 0).unwrap());
    }
}
