//! Version cursor: where a run resumes and where it stops

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// What a run should do, decided once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Everything up to `version` is already persisted
    UpToDate { version: i32 },
    /// Fetch the versions the cursor covers
    Sync(VersionCursor),
}

/// The version range a single run covers
///
/// `resume_from` is exclusive, `target` inclusive. The target is captured
/// once at the start of a run and never moves while the run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCursor {
    resume_from: i32,
    target: i32,
}

impl VersionCursor {
    /// Compute the plan for a run
    ///
    /// # Arguments
    /// * `latest_known` - Latest version reported by the remote service
    /// * `highest_persisted` - Highest version already written locally, or the floor
    pub fn compute(latest_known: i32, highest_persisted: i32) -> Plan {
        if highest_persisted >= latest_known {
            Plan::UpToDate {
                version: highest_persisted,
            }
        } else {
            Plan::Sync(Self {
                resume_from: highest_persisted,
                target: latest_known,
            })
        }
    }

    /// Highest version already persisted when the run started
    pub fn resume_from(&self) -> i32 {
        self.resume_from
    }

    /// Latest version this run will fetch
    pub fn target(&self) -> i32 {
        self.target
    }

    /// Number of versions the run covers
    pub fn len(&self) -> usize {
        (i64::from(self.target) - i64::from(self.resume_from)) as usize
    }

    /// Always false: an empty range is reported as [`Plan::UpToDate`]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Progress of `version` relative to the target, in percent
    pub fn percent_complete(&self, version: i32) -> f64 {
        percent_complete(version, self.target)
    }
}

impl IntoIterator for VersionCursor {
    type Item = i32;
    type IntoIter = RangeInclusive<i32>;

    fn into_iter(self) -> Self::IntoIter {
        (self.resume_from + 1)..=self.target
    }
}

/// Versions missing below the highest archived one
///
/// Covers both gaps between archived versions and everything below the
/// lowest one, down to a chosen bound. Versions are visited newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backfill {
    ceiling: i32,
    missing: Vec<i32>,
}

impl Backfill {
    /// Compute the versions a backfill run must fetch
    ///
    /// # Arguments
    /// * `persisted` - Versions already archived
    /// * `down_to` - Lowest version to consider (inclusive)
    pub fn compute(persisted: impl IntoIterator<Item = i32>, down_to: i32) -> Self {
        let archived: BTreeSet<i32> = persisted.into_iter().collect();
        let Some(&ceiling) = archived.last() else {
            return Self {
                ceiling: down_to,
                missing: Vec::new(),
            };
        };

        let missing = (down_to..ceiling)
            .rev()
            .filter(|version| !archived.contains(version))
            .collect();
        Self { ceiling, missing }
    }

    /// Highest archived version; nothing at or above it is fetched
    pub fn ceiling(&self) -> i32 {
        self.ceiling
    }

    /// Missing versions, newest first
    pub fn versions(&self) -> &[i32] {
        &self.missing
    }

    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }
}

impl IntoIterator for Backfill {
    type Item = i32;
    type IntoIter = std::vec::IntoIter<i32>;

    fn into_iter(self) -> Self::IntoIter {
        self.missing.into_iter()
    }
}

/// Percentage of `target` that `version` represents
pub fn percent_complete(version: i32, target: i32) -> f64 {
    if target <= 0 {
        return 100.0;
    }
    f64::from(version) / f64::from(target) * 100.0
}

/// Highest persisted version, or `floor` when nothing has been persisted yet
pub fn resume_point(persisted: impl IntoIterator<Item = i32>, floor: i32) -> i32 {
    persisted.into_iter().max().unwrap_or(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_below_lowest_and_gaps() {
        let backfill = Backfill::compute([3500, 3503, 3501], 3497);

        assert_eq!(backfill.ceiling(), 3503);
        assert_eq!(backfill.versions(), &[3502, 3499, 3498, 3497]);
        assert_eq!(backfill.len(), 4);
    }

    #[test]
    fn test_backfill_complete_archive() {
        let backfill = Backfill::compute(1..=5, 1);
        assert!(backfill.is_empty());
        assert_eq!(backfill.ceiling(), 5);
    }

    #[test]
    fn test_backfill_empty_archive_has_nothing_to_fill() {
        assert!(Backfill::compute(Vec::new(), 1).is_empty());
    }

    #[test]
    fn test_backfill_bound_above_archive() {
        let backfill = Backfill::compute([10, 12], 11);
        assert_eq!(backfill.into_iter().collect::<Vec<_>>(), vec![11]);
    }

    #[test]
    fn test_up_to_date_when_equal() {
        assert_eq!(VersionCursor::compute(13, 13), Plan::UpToDate { version: 13 });
    }

    #[test]
    fn test_up_to_date_when_ahead() {
        assert_eq!(VersionCursor::compute(13, 20), Plan::UpToDate { version: 20 });
    }

    #[test]
    fn test_enumerates_pending_versions() {
        let Plan::Sync(cursor) = VersionCursor::compute(13, 10) else {
            panic!("expected a sync plan");
        };

        assert_eq!(cursor.resume_from(), 10);
        assert_eq!(cursor.target(), 13);
        assert_eq!(cursor.len(), 3);
        assert!(!cursor.is_empty());
        assert_eq!(cursor.into_iter().collect::<Vec<_>>(), vec![11, 12, 13]);
    }

    #[test]
    fn test_enumeration_count_matches_gap() {
        for (highest, latest) in [(0, 1), (0, 50), (3553, 3600), (-1, 4)] {
            let Plan::Sync(cursor) = VersionCursor::compute(latest, highest) else {
                panic!("expected a sync plan for {highest}..{latest}");
            };
            assert_eq!(cursor.into_iter().count(), (latest - highest) as usize);
        }
    }

    #[test]
    fn test_percent_complete() {
        let Plan::Sync(cursor) = VersionCursor::compute(200, 0) else {
            panic!("expected a sync plan");
        };
        assert_eq!(cursor.percent_complete(50), 25.0);
        assert_eq!(cursor.percent_complete(200), 100.0);
        assert_eq!(percent_complete(1, 0), 100.0);
    }

    #[test]
    fn test_resume_point() {
        assert_eq!(resume_point(vec![3, 11, 7], 0), 11);
        assert_eq!(resume_point(Vec::new(), 3553), 3553);
    }
}
