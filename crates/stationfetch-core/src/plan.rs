//! Expansion of a download request into the ordered list of files to fetch.
//!
//! One file exists per station per quarter hour. For every day in the
//! inclusive date range, every hour in the daily time window is sampled at
//! the four quarter-hour offsets, trimmed to the start minute on the first
//! hour and the end minute on the last hour.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::SpecError;

/// Minute offsets sampled within each hour
pub const QUARTER_HOURS: [u8; 4] = [0, 15, 30, 45];

/// Default local directory that mirrors `<state>/<station>/<file>`
pub const DEFAULT_LOCAL_ROOT: &str = "stations";

/// Time of day at quarter-hour resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub const START_OF_DAY: Self = Self { hour: 0, minute: 0 };
    pub const END_OF_DAY: Self = Self {
        hour: 23,
        minute: 45,
    };

    pub const fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.hour > 23 {
            return Err(SpecError::InvalidHour(self.hour));
        }
        if !QUARTER_HOURS.contains(&self.minute) {
            return Err(SpecError::InvalidMinute(self.minute));
        }
        Ok(())
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// What to fetch: one station over a date range and a daily time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSpec {
    pub station: String,
    /// State / region code, first path component under the remote base
    pub state: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub remote_base: String,
}

impl DownloadSpec {
    /// Check preconditions. `max_days` bounds the inclusive day count.
    pub fn validate(&self, max_days: Option<u32>) -> Result<(), SpecError> {
        if self.station.trim().is_empty() {
            return Err(SpecError::EmptyStation);
        }
        if self.state.trim().is_empty() {
            return Err(SpecError::EmptyState);
        }
        self.start_time.validate()?;
        self.end_time.validate()?;
        if self.end_date < self.start_date {
            return Err(SpecError::EndDateBeforeStart);
        }
        // Only a single-day request can end before it starts; across days
        // an inverted window is valid and simply samples nothing
        if self.start_date == self.end_date && self.end_time < self.start_time {
            return Err(SpecError::EndTimeBeforeStart);
        }
        if let Some(max) = max_days {
            let days = self.day_count();
            if days > max {
                return Err(SpecError::RangeTooLarge { days, max });
            }
        }
        Ok(())
    }

    /// Inclusive number of calendar days (0 when end < start)
    pub fn day_count(&self) -> u32 {
        let diff = self.end_date.signed_duration_since(self.start_date).num_days();
        u32::try_from(diff + 1).unwrap_or(0)
    }

    /// Number of files sampled per day within the time window
    pub fn quarter_hours_per_day(&self) -> usize {
        self.daily_slots().count()
    }

    /// Size of the task list `plan` produces for this request
    pub fn expected_files(&self) -> usize {
        self.day_count() as usize * self.quarter_hours_per_day()
    }

    fn daily_slots(&self) -> impl Iterator<Item = TimeOfDay> + '_ {
        (self.start_time.hour..=self.end_time.hour).flat_map(move |hour| {
            QUARTER_HOURS
                .into_iter()
                .map(move |minute| TimeOfDay::new(hour, minute))
                .filter(move |slot| {
                    !(slot.hour == self.start_time.hour && slot.minute < self.start_time.minute)
                        && !(slot.hour == self.end_time.hour && slot.minute > self.end_time.minute)
                })
        })
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        std::iter::successors(Some(self.start_date), |d| d.succ_opt())
            .take_while(move |d| *d <= self.end_date)
    }

    fn file_name(&self, day: NaiveDate, slot: TimeOfDay) -> String {
        format!(
            "{}_{}{:02}{:02}.txt",
            self.station,
            day.format("%Y%m%d"),
            slot.hour,
            slot.minute
        )
    }
}

/// One remote file and where it lands locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl FileTask {
    /// Basename of the remote path
    pub fn file_name(&self) -> &str {
        self.remote_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.remote_path)
    }
}

/// Expand a request into its ordered task list.
///
/// Pure: the same request and root always give the same list. Order is
/// day, then hour, then minute. An end date before the start date yields an
/// empty list; use [`DownloadSpec::validate`] to reject such requests.
pub fn plan(spec: &DownloadSpec, local_root: &Path) -> Vec<FileTask> {
    let base = spec.remote_base.trim_end_matches('/');
    let local_dir = local_root.join(&spec.state).join(&spec.station);
    let slots: Vec<TimeOfDay> = spec.daily_slots().collect();

    spec.days()
        .flat_map(|day| slots.iter().map(move |&slot| (day, slot)))
        .map(|(day, slot)| {
            let name = spec.file_name(day, slot);
            FileTask {
                remote_path: format!("{base}/{}/{}/{name}", spec.state, spec.station),
                local_path: local_dir.join(&name),
            }
        })
        .collect()
}
