//! Interval vocabulary shared by the bridge and the task validation path.

use anyhow::{bail, Result};
use uuid::Uuid;

/// Period names accepted by the scheduling columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl IntervalUnit {
    /// Parse a stored period name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "seconds" => Ok(Self::Seconds),
            "minutes" => Ok(Self::Minutes),
            "hours" => Ok(Self::Hours),
            "days" => Ok(Self::Days),
            other => bail!("unknown period: {other}"),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }

    /// Seconds in one unit.
    #[must_use]
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
        }
    }
}

/// A validated `(every, period)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalSpec {
    pub every: i32,
    pub unit: IntervalUnit,
}

impl IntervalSpec {
    /// Map the optional scheduling columns to a spec.
    ///
    /// Both absent means "no notification" and is not an error; a
    /// half-specified pair, a non-positive count, or an unknown period is.
    pub fn from_parts(notify: Option<i32>, period: Option<&str>) -> Result<Option<Self>> {
        match (notify, period) {
            (None, None) => Ok(None),
            (Some(every), Some(period)) => {
                if every <= 0 {
                    bail!("notify must be positive, got {every}");
                }
                let unit = IntervalUnit::from_name(period)?;
                Ok(Some(Self { every, unit }))
            }
            _ => bail!("notify and period must be set together"),
        }
    }

    /// Total delay in seconds before the notification fires.
    #[must_use]
    pub fn total_seconds(&self) -> i64 {
        i64::from(self.every) * self.unit.seconds()
    }
}

/// The task fields the notification bridge reads.
#[derive(Clone, Debug)]
pub struct TaskSnapshot {
    pub task_id: Uuid,
    pub title: String,
    pub description: String,
    pub notify: Option<i32>,
    pub period: Option<String>,
}

impl TaskSnapshot {
    /// The snapshot's schedule, if it carries one.
    pub fn interval(&self) -> Result<Option<IntervalSpec>> {
        IntervalSpec::from_parts(self.notify, self.period.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_names_round_trip() {
        for name in ["seconds", "minutes", "hours", "days"] {
            let unit = IntervalUnit::from_name(name).expect("known unit");
            assert_eq!(unit.as_str(), name);
        }
    }

    #[test]
    fn unit_rejects_unknown_name() {
        assert!(IntervalUnit::from_name("fortnights").is_err());
        assert!(IntervalUnit::from_name("Minutes").is_err());
    }

    #[test]
    fn spec_maps_absent_pair_to_none() {
        let spec = IntervalSpec::from_parts(None, None).expect("no schedule is valid");
        assert_eq!(spec, None);
    }

    #[test]
    fn spec_rejects_half_specified_pair() {
        assert!(IntervalSpec::from_parts(Some(10), None).is_err());
        assert!(IntervalSpec::from_parts(None, Some("minutes")).is_err());
    }

    #[test]
    fn spec_rejects_non_positive_count() {
        assert!(IntervalSpec::from_parts(Some(0), Some("minutes")).is_err());
        assert!(IntervalSpec::from_parts(Some(-5), Some("minutes")).is_err());
    }

    #[test]
    fn total_seconds_scales_by_unit() {
        let spec = IntervalSpec {
            every: 10,
            unit: IntervalUnit::Minutes,
        };
        assert_eq!(spec.total_seconds(), 600);

        let spec = IntervalSpec {
            every: 2,
            unit: IntervalUnit::Days,
        };
        assert_eq!(spec.total_seconds(), 172_800);
    }

    #[test]
    fn snapshot_interval_uses_own_columns() {
        let snapshot = TaskSnapshot {
            task_id: Uuid::nil(),
            title: "standup".to_string(),
            description: String::new(),
            notify: Some(5),
            period: Some("hours".to_string()),
        };
        let interval = snapshot.interval().expect("valid schedule");
        assert_eq!(
            interval,
            Some(IntervalSpec {
                every: 5,
                unit: IntervalUnit::Hours,
            })
        );
    }
}
