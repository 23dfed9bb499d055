mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{air, MockRadio, SensorRadio};
use sensnet_core::constants::{FIRST_SENSOR_ADDRESS, PAIR_ADDRESS};
use sensnet_core::errors::DecodeError;
use sensnet_core::time::MockTimeSource;
use sensnet_core::wire::{decode_frame, Frame, MeasurementPacket, Packet, PacketType};
use sensnet_core::{Measurement, SensorNode};
use sensnet_server::{
    CollectionLoop, DiscardReason, Network, PairingCoordinator, PairingError, PollOutcome,
    ServerConfig, SlotScheduler,
};

const START_SECS: u32 = 1_700_000_000;
const START_MS: u64 = START_SECS as u64 * 1000;

fn measurement_frame(address: u32, index: u8, timestamp: u32, m: Measurement) -> Vec<u8> {
    let packet = MeasurementPacket::new(index, timestamp, m.quantize());
    Frame::new(address, Packet::Measurement(packet)).encode().to_vec()
}

fn pair_request() -> Vec<u8> {
    Frame::new(PAIR_ADDRESS, Packet::PairRequest).encode().to_vec()
}

fn mock_loop(network: Network) -> CollectionLoop<MockRadio, MockTimeSource> {
    CollectionLoop::new(MockRadio::new(), MockTimeSource::new(START_MS), network, 10)
}

#[test]
fn sensors_pair_and_deliver_in_order() {
    let config = ServerConfig {
        measurement_period_secs: 300,
        comms_period_secs: 1200,
        slot_duration_secs: 10,
        ..ServerConfig::default()
    };
    let network = Network::new(&config);
    assert_eq!(network.scheduler().get_max_slot_count(), 120);

    let (base, sensor_radio) = air();
    let clock = MockTimeSource::new(START_MS);
    let server = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut collection = CollectionLoop::new(base, clock, network, 10);
        collection.run(|network, _now| {
            let stored: usize = network.registry().iter().map(|s| s.records().len()).sum();
            stored >= 30 || Instant::now() > deadline
        });
        collection
    });

    let mut nodes: Vec<SensorNode<SensorRadio>> = Vec::new();
    for _ in 0..3 {
        let mut node: SensorNode<SensorRadio> =
            SensorNode::new(sensor_radio.clone()).with_measurement_period(300);
        let response = node.pair(START_SECS).unwrap();
        assert_eq!(response.server_timestamp, i64::from(START_SECS));
        nodes.push(node);
    }

    let addresses: Vec<u32> = nodes.iter().filter_map(|n| n.address()).collect();
    assert_eq!(
        addresses,
        vec![FIRST_SENSOR_ADDRESS, FIRST_SENSOR_ADDRESS + 1, FIRST_SENSOR_ADDRESS + 2]
    );

    for (n, node) in nodes.iter_mut().enumerate() {
        for k in 0..10u32 {
            let m = Measurement::new(20.0 + n as f32 + k as f32 * 0.25, 40.0 + k as f32, 3.1);
            node.record(m, START_SECS + k * 300);
        }
        assert_eq!(node.drain(), 10);
        assert!(node.storage().is_empty());
    }

    let collection = server.join().unwrap();
    let stats = collection.stats();
    assert_eq!(stats.paired, 3);
    assert_eq!(stats.measurements, 30);
    assert_eq!(stats.discarded, 0);

    let network = collection.network();
    let mut slots: Vec<u32> = network.registry().iter().map(|s| s.time_slot).collect();
    slots.sort_unstable();
    slots.dedup();
    assert_eq!(slots.len(), 3);

    for (n, address) in addresses.iter().enumerate() {
        let sensor = network.sensor(*address).unwrap();
        let records = sensor.records();
        assert_eq!(records.len(), 10);
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        for (k, record) in records.iter().enumerate() {
            assert_eq!(record.index, k as u8);
            assert_eq!(record.timestamp, START_SECS + k as u32 * 300);
            let expected = 20.0 + n as f32 + k as f32 * 0.25;
            assert!((record.measurement.temperature - expected).abs() < 0.01);
            assert!((record.measurement.humidity - (40.0 + k as f32)).abs() < 0.25);
            assert!((record.measurement.vcc - 3.1).abs() < 0.01);
        }
    }
}

#[test]
fn pair_response_goes_to_requester() {
    let mut collection = mock_loop(Network::default());
    collection.radio_mut().deliver(&pair_request());

    let outcome = collection.poll_once();
    assert!(matches!(outcome, PollOutcome::Paired(ref g) if g.address == FIRST_SENSOR_ADDRESS));

    let reply = decode_frame(&collection.radio().sent[0]).unwrap();
    assert_eq!(reply.address, PAIR_ADDRESS);
    match reply.packet {
        Packet::PairResponse(response) => {
            assert_eq!(response.address, FIRST_SENSOR_ADDRESS);
            assert_eq!(response.server_timestamp, i64::from(START_SECS));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn full_network_refuses_without_side_effects() {
    let scheduler = SlotScheduler::new(
        Duration::from_secs(60),
        Duration::from_secs(20),
        Duration::from_secs(10),
    );
    let network = Network::from_parts(scheduler, PairingCoordinator::default());
    let mut collection = mock_loop(network);
    for _ in 0..3 {
        collection.radio_mut().deliver(&pair_request());
    }

    assert!(matches!(collection.poll_once(), PollOutcome::Paired(_)));
    assert!(matches!(collection.poll_once(), PollOutcome::Paired(_)));
    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::PairingRefused(PairingError::CapacityExceeded {
            max_slots: 2
        }))
    );

    assert_eq!(collection.radio().sent.len(), 2);
    assert_eq!(collection.network().registry().len(), 2);
    assert_eq!(collection.network().pairing().next_address(), FIRST_SENSOR_ADDRESS + 2);
    assert_eq!(collection.stats().pairing_failed, 1);
}

#[test]
fn malformed_frames_are_counted_and_dropped() {
    let mut collection = mock_loop(Network::default());
    let mut short = measurement_frame(FIRST_SENSOR_ADDRESS, 0, START_SECS, Measurement::new(20.0, 50.0, 3.0));
    short.pop();

    collection.radio_mut().deliver(&[]);
    collection.radio_mut().deliver(&[9, 0, 0, 0, 0]);
    collection.radio_mut().deliver(&short);

    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::Malformed(DecodeError::Empty))
    );
    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::Malformed(DecodeError::UnknownType(9)))
    );
    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::Malformed(DecodeError::SizeMismatch {
            expected: 14,
            actual: 13
        }))
    );
    assert_eq!(collection.poll_once(), PollOutcome::Idle);

    let stats = collection.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.discarded, 3);
    assert!(collection.network().registry().is_empty());
}

#[test]
fn unknown_and_stale_measurements_are_dropped() {
    let mut collection = mock_loop(Network::default());
    let m = Measurement::new(21.5, 48.0, 3.2);

    collection.radio_mut().deliver(&measurement_frame(4242, 0, START_SECS, m));
    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::UnknownSensor(4242))
    );

    collection.radio_mut().deliver(&pair_request());
    assert!(matches!(collection.poll_once(), PollOutcome::Paired(_)));

    let address = FIRST_SENSOR_ADDRESS;
    collection.radio_mut().deliver(&measurement_frame(address, 0, START_SECS + 600, m));
    collection.radio_mut().deliver(&measurement_frame(address, 1, START_SECS + 600, m));
    collection.radio_mut().deliver(&measurement_frame(address, 2, START_SECS + 300, m));

    assert!(matches!(collection.poll_once(), PollOutcome::Stored { .. }));
    assert!(matches!(collection.poll_once(), PollOutcome::Stored { .. }));
    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::Stale {
            address,
            last: START_SECS + 600,
            timestamp: START_SECS + 300,
        })
    );
    assert_eq!(collection.network().sensor(address).unwrap().records().len(), 2);
}

#[test]
fn pair_response_from_a_sensor_is_unexpected() {
    let mut collection = mock_loop(Network::default());
    let bogus = Frame::new(
        FIRST_SENSOR_ADDRESS,
        Packet::PairResponse(sensnet_core::wire::PairResponse {
            address: 5,
            server_timestamp: 0,
        }),
    );
    collection.radio_mut().deliver(&bogus.encode());
    assert_eq!(
        collection.poll_once(),
        PollOutcome::Discarded(DiscardReason::Unexpected(PacketType::PairResponse))
    );
}

#[test]
fn failed_reply_still_pairs() {
    let mut collection = mock_loop(Network::default());
    collection.radio_mut().fail_sends = true;
    collection.radio_mut().deliver(&pair_request());

    assert!(matches!(collection.poll_once(), PollOutcome::Paired(_)));
    assert_eq!(collection.stats().send_failures, 1);
    assert_eq!(collection.network().registry().len(), 1);
}

#[test]
fn registry_is_saved_after_pairing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensors.json");

    let mut collection = mock_loop(Network::default()).with_registry_path(&path);
    collection.radio_mut().deliver(&pair_request());
    collection.poll_once();

    let mut restored = Network::default();
    assert_eq!(restored.load_registry(&path, START_MS).unwrap(), 1);
    assert!(restored.sensor(FIRST_SENSOR_ADDRESS).is_some());

    let grant = restored.pair(START_MS).unwrap();
    assert_eq!(grant.address, FIRST_SENSOR_ADDRESS + 1);
}

#[test]
fn run_stops_on_request() {
    let mut collection = mock_loop(Network::default());
    collection.radio_mut().deliver(&pair_request());

    let mut calls = 0;
    collection.run(|_, _| {
        calls += 1;
        calls > 3
    });
    assert_eq!(calls, 4);
    assert_eq!(collection.stats().paired, 1);
}
