//! Compact Storage Example
//!
//! A sensor measures every 5 minutes but only talks to the base station
//! every 20 minutes, and sometimes misses its slot for hours. This example
//! shows how many measurements fit in the 30 groups of compact storage and
//! what happens when they run out.
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_compact_storage
//! ```

use sensnet_core::constants::{GROUP_COUNT, GROUP_SIZE};
use sensnet_core::{CompactStorage, Measurement};

fn main() {
    println!("sensnet Compact Storage Example");
    println!("===============================\n");

    let mut storage: CompactStorage = CompactStorage::new();
    println!(
        "Storage: {} groups x {} bytes = {} bytes\n",
        GROUP_COUNT,
        GROUP_SIZE,
        GROUP_COUNT * GROUP_SIZE
    );

    // A slow indoor day: temperature drifts, humidity wanders, battery sags
    for i in 0..288 {
        let t = i as f32;
        let measurement = Measurement::new(
            21.0 + 2.0 * libm::sinf(t / 45.0),
            45.0 + 5.0 * libm::cosf(t / 30.0),
            3.3 - t * 0.0005,
        );
        storage.push(measurement);
    }

    println!("After one day of 5 minute samples:");
    println!("  measurements: {}", storage.get_data_count());
    println!("  groups used:  {}", storage.get_group_count());
    println!(
        "  bytes/sample: {:.2}\n",
        (storage.get_group_count() * GROUP_SIZE) as f32 / storage.get_data_count() as f32
    );

    println!("Oldest three records:");
    for m in storage.iter().take(3) {
        println!("  T={:6.2}°C  H={:5.1}%  V={:.2}V", m.temperature, m.humidity, m.vcc);
    }

    // Keep going without a radio: the oldest group is dropped for each new one
    for i in 0..2000 {
        let swing = if i % 2 == 0 { -10.0 } else { 10.0 };
        storage.push(Measurement::new(20.0 + swing, 50.0, 3.0));
    }

    println!("\nAfter a noisy week without contact:");
    println!("  measurements: {}", storage.get_data_count());
    println!("  groups used:  {}", storage.get_group_count());

    // Simulate a slot: send and pop oldest first
    let mut sent = 0;
    while storage.pop_front() {
        sent += 1;
    }
    println!("\nDrained {} records, storage empty: {}", sent, storage.is_empty());
}
