use fxhash::FxHasher64;
use std::collections::HashSet;
use std::hash::Hasher;

use crate::task::Task;

/// Map an entity to one of `worker_count` slots.
///
/// Hashes the raw bytes of the full identifier with FxHash (64-bit), so the
/// same entity always lands on the same slot for a given worker count, across
/// runs and toolchain versions, regardless of how the identifier is spelled.
/// A `worker_count` of 0 is treated as 1.
pub fn partition(entity_id: &str, worker_count: usize) -> usize {
    (entity_hash(entity_id) % worker_count.max(1) as u64) as usize
}

/// Bytes only: `str`'s `Hash` impl appends a std-defined terminator
fn entity_hash(entity_id: &str) -> u64 {
    let mut hasher = FxHasher64::default();
    hasher.write(entity_id.as_bytes());
    hasher.finish()
}

/// How many tasks and distinct entities a slot would receive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLoad {
    pub slot: usize,
    pub tasks: usize,
    pub entities: usize,
}

/// Partition `tasks` without executing anything
pub fn slot_loads(tasks: &[Task], worker_count: usize) -> Vec<SlotLoad> {
    let worker_count = worker_count.max(1);
    let mut loads: Vec<SlotLoad> = (0..worker_count)
        .map(|slot| SlotLoad {
            slot,
            ..SlotLoad::default()
        })
        .collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for task in tasks {
        let load = &mut loads[partition(&task.entity_id, worker_count)];
        load.tasks += 1;
        if seen.insert(task.entity_id.as_str()) {
            load.entities += 1;
        }
    }

    loads
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_partition_is_deterministic_and_in_range() {
        for workers in 1..=16 {
            for host in ["host_000008", "host_000001", "db-primary", "x"] {
                let slot = partition(host, workers);
                assert!(slot < workers);
                assert_eq!(slot, partition(host, workers));
            }
        }
    }

    #[test]
    fn test_partition_tolerates_unconventional_ids() {
        for id in ["", "no-underscore", "host_", "_", "host_abc", "hôte_é", "a_b_c_12"] {
            assert!(partition(id, 5) < 5);
        }
    }

    #[test]
    fn test_partition_hashes_identifier_bytes() {
        let mut hasher = FxHasher64::default();
        hasher.write(b"host_000008");
        assert_eq!(entity_hash("host_000008"), hasher.finish());
        assert_eq!(
            partition("host_000008", 7),
            (hasher.finish() % 7) as usize
        );
    }

    #[test]
    fn test_single_worker_gets_everything() {
        assert_eq!(partition("host_000003", 1), 0);
        assert_eq!(partition("anything", 0), 0);
    }

    #[test]
    fn test_partition_spreads_entities() {
        let loads: Vec<usize> = (0..1000)
            .map(|i| partition(&format!("host_{i:06}"), 5))
            .fold(vec![0; 5], |mut counts, slot| {
                counts[slot] += 1;
                counts
            });
        assert!(loads.iter().all(|&count| count > 100), "{loads:?}");
    }

    #[test]
    fn test_slot_loads_counts_tasks_and_entities() {
        let now = Utc::now();
        let tasks = vec![
            Task::new("host_1", now, now),
            Task::new("host_1", now, now),
            Task::new("host_2", now, now),
        ];
        let loads = slot_loads(&tasks, 3);

        assert_eq!(loads.len(), 3);
        assert_eq!(loads.iter().map(|l| l.tasks).sum::<usize>(), 3);
        assert_eq!(loads.iter().map(|l| l.entities).sum::<usize>(), 2);
        assert!(loads[partition("host_1", 3)].tasks >= 2);
    }
}
