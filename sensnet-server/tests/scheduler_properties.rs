//! Property tests for slot assignment and pairing

use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;
use sensnet_server::{Network, PairingCoordinator, PairingError, SlotScheduler};

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(u32),
    Schedule(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        1 => (0u32..16).prop_map(Op::Remove),
        2 => (0u32..16).prop_map(Op::Schedule),
    ]
}

proptest! {
    #[test]
    fn slots_stay_unique_and_bounded(
        comms_slots in 1u64..12,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut scheduler = SlotScheduler::new(
            Duration::from_secs(60),
            Duration::from_secs(10 * comms_slots),
            Duration::from_secs(10),
        );
        let max = scheduler.get_max_slot_count();
        prop_assert_eq!(u64::from(max), comms_slots);

        let mut active = BTreeSet::new();
        for op in ops {
            match op {
                Op::Add => match scheduler.add_slot(0) {
                    Some(id) => {
                        prop_assert!(id < max);
                        prop_assert!(active.insert(id), "slot {} handed out twice", id);
                    }
                    None => prop_assert_eq!(active.len(), max as usize),
                },
                Op::Remove(id) => {
                    prop_assert_eq!(scheduler.remove_slot(id), active.remove(&id));
                }
                Op::Schedule(id) => {
                    let latest = active
                        .iter()
                        .filter_map(|slot| scheduler.next_time_point(*slot))
                        .max()
                        .unwrap_or(0);
                    match scheduler.schedule(id) {
                        Some(t) => {
                            prop_assert!(active.contains(&id));
                            prop_assert_eq!(t, latest + 10_000);
                        }
                        None => prop_assert!(!active.contains(&id)),
                    }
                }
            }
            prop_assert_eq!(scheduler.slot_count(), active.len());
        }
    }

    #[test]
    fn pairing_beyond_capacity_is_atomic(comms_slots in 1u64..8, extra in 1usize..5) {
        let scheduler = SlotScheduler::new(
            Duration::from_secs(60),
            Duration::from_secs(10 * comms_slots),
            Duration::from_secs(10),
        );
        let mut network = Network::from_parts(scheduler, PairingCoordinator::default());

        let mut addresses = BTreeSet::new();
        for _ in 0..comms_slots {
            let grant = network.pair(0).unwrap();
            prop_assert!(addresses.insert(grant.address));
        }

        let next_address = network.pairing().next_address();
        for _ in 0..extra {
            prop_assert_eq!(
                network.pair(0),
                Err(PairingError::CapacityExceeded { max_slots: comms_slots as u32 })
            );
        }
        prop_assert_eq!(network.pairing().next_address(), next_address);
        prop_assert_eq!(network.registry().len(), comms_slots as usize);
        prop_assert_eq!(network.scheduler().slot_count(), comms_slots as usize);
    }
}
