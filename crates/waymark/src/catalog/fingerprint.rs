//! Snapshot fingerprints used to detect catalog changes between polls.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::Record;

/// Hash of a full catalog snapshot
///
/// Only equality is meaningful. Two different snapshots may collide; such a
/// change goes unnoticed until the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint a snapshot. The result does not depend on record order.
    pub fn of(records: &[Record]) -> Self {
        let mut sorted: Vec<&Record> = records.iter().collect();
        sorted.sort_unstable();

        let mut hasher = DefaultHasher::new();
        sorted.len().hash(&mut hasher);
        for record in sorted {
            record.hash(&mut hasher);
        }
        Self(hasher.finish())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use chrono::TimeZone;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("1", "Spawn", Position::new(10, 64, 20), "A", "u1"),
            Record::new("2", "Farm", Position::new(5, 70, 5), "A", "u2").locked(true),
            Record::new("3", "Mine", Position::new(-40, 12, 300), "B", "u1")
                .created_at(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        ]
    }

    #[test]
    fn test_stable_for_same_snapshot() {
        let records = sample();
        assert_eq!(Fingerprint::of(&records), Fingerprint::of(&records));
        assert_eq!(Fingerprint::of(&records), Fingerprint::of(&records.clone()));
    }

    #[test]
    fn test_ignores_record_order() {
        let records = sample();
        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(Fingerprint::of(&records), Fingerprint::of(&reversed));
    }

    #[test]
    fn test_changes_when_any_field_changes() {
        let base = Fingerprint::of(&sample());

        let mutations: Vec<Box<dyn Fn(&mut Record)>> = vec![
            Box::new(|r| r.position.x += 1),
            Box::new(|r| r.position.y += 1),
            Box::new(|r| r.position.z -= 1),
            Box::new(|r| r.name.push('!')),
            Box::new(|r| r.locked = !r.locked),
            Box::new(|r| r.owner = "someone-else".into()),
            Box::new(|r| r.region = "elsewhere".into()),
            Box::new(|r| r.created_at = Some(chrono::Utc.timestamp_opt(0, 0).unwrap())),
        ];

        for (i, mutate) in mutations.iter().enumerate() {
            let mut records = sample();
            mutate(&mut records[1]);
            assert_ne!(Fingerprint::of(&records), base, "mutation {i} went unnoticed");
        }
    }

    #[test]
    fn test_changes_on_add_and_remove() {
        let records = sample();
        let base = Fingerprint::of(&records);

        let mut fewer = records.clone();
        fewer.pop();
        assert_ne!(Fingerprint::of(&fewer), base);

        let mut more = records;
        more.push(Record::new("4", "Port", Position::new(0, 0, 0), "A", "u3"));
        assert_ne!(Fingerprint::of(&more), base);

        assert_ne!(Fingerprint::of(&[]), base);
    }
}
