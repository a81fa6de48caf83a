//! End-to-end tests for the relay pipeline
//!
//! These drive the public API with a fake engine and speaker, so no audio
//! device or VOICEVOX engine is needed.

mod common;

use common::{wait_until, FakeEngine, FakeSpeaker, Timeline};
use crossbeam_channel::bounded;
use rosc::{OscMessage, OscPacket, OscType};
use std::thread;
use std::time::Duration;
use voxrelay::integration::{Relay, RelayConfig};

fn osc_text(text: &str) -> Vec<u8> {
    rosc::encoder::encode(&OscPacket::Message(OscMessage {
        addr: "/text".to_string(),
        args: vec![OscType::String(text.to_string())],
    }))
    .unwrap()
}

fn start_relay(capacity: usize, timeline: &Timeline) -> Relay {
    let config = RelayConfig::default().with_queue_capacity(capacity);
    Relay::start(config, FakeEngine::new(timeline.clone()), FakeSpeaker::new(timeline.clone())).unwrap()
}

#[test]
fn test_items_played_in_arrival_order() {
    let timeline = Timeline::default();
    let relay = start_relay(10, &timeline);
    let handler = relay.handler();

    let texts: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
    for text in &texts {
        assert_eq!(handler.handle_datagram(&osc_text(text)), 1);
    }

    drop(handler);
    let stats = relay.shutdown();

    assert_eq!(stats.spoken, 8);
    assert_eq!(timeline.played(), texts);
}

#[test]
fn test_failure_does_not_block_following_items() {
    let timeline = Timeline::default();
    let relay = start_relay(5, &timeline);
    let handler = relay.handler();

    for text in ["broken", "after broken", "garbled", "after garbled"] {
        assert_eq!(handler.handle_datagram(&osc_text(text)), 1);
    }

    drop(handler);
    let stats = relay.shutdown();

    assert_eq!(stats.processed, 4);
    assert_eq!(stats.query_failed, 1);
    assert_eq!(stats.playback_failed, 1);
    assert_eq!(timeline.played(), vec!["after broken", "after garbled"]);

    // The failed query never reached render or playback
    let events = timeline.events();
    assert!(events.contains(&"query:broken".to_string()));
    assert!(!events.contains(&"render:broken".to_string()));
}

#[test]
fn test_one_item_in_flight_under_concurrent_pressure() {
    let timeline = Timeline::default();
    let relay = start_relay(4, &timeline);

    let producers: Vec<_> = (0..6)
        .map(|p| {
            let handler = relay.handler();
            thread::spawn(move || {
                let mut admitted = 0;
                for i in 0..20 {
                    admitted += handler.handle_datagram(&osc_text(&format!("p{}-{}", p, i)));
                    thread::sleep(Duration::from_millis(1));
                }
                admitted
            })
        })
        .collect();

    let admitted: usize = producers.into_iter().map(|h| h.join().unwrap()).sum();
    let stats = relay.shutdown();

    assert!(admitted > 0);
    assert_eq!(stats.processed as usize, admitted);
    assert_eq!(timeline.max_active(), 1);

    // Each item's steps are contiguous: query, render, play, then the next item
    let events = timeline.events();
    assert_eq!(events.len(), admitted * 3);
    for chunk in events.chunks(3) {
        let text = chunk[0].strip_prefix("query:").unwrap();
        assert_eq!(chunk[1], format!("render:{}", text));
        assert_eq!(chunk[2], format!("play:{}", text));
    }
}

#[test]
fn test_queue_full_while_worker_busy() {
    let timeline = Timeline::default();
    let (release_tx, release_rx) = bounded::<()>(0);
    let config = RelayConfig::default().with_queue_capacity(2);
    let relay = Relay::start(
        config,
        FakeEngine::new(timeline.clone()).with_hold(release_rx),
        FakeSpeaker::new(timeline.clone()),
    )
    .unwrap();
    let handler = relay.handler();

    // Occupy the worker, then fill the queue behind it
    assert_eq!(handler.handle_datagram(&osc_text("hold")), 1);
    assert!(wait_until(Duration::from_secs(2), || {
        relay.pending() == 0 && timeline.events().len() == 1
    }));

    assert_eq!(handler.handle_datagram(&osc_text("hello")), 1);
    assert_eq!(handler.handle_datagram(&osc_text("world")), 1);
    assert_eq!(handler.handle_datagram(&osc_text("extra")), 0);
    assert_eq!(relay.pending(), 2);

    release_tx.send(()).unwrap();
    drop(handler);
    let stats = relay.shutdown();

    assert_eq!(stats.spoken, 3);
    assert_eq!(timeline.played(), vec!["hold", "hello", "world"]);
}

#[test]
fn test_shutdown_finishes_queued_items() {
    let timeline = Timeline::default();
    let (release_tx, release_rx) = bounded::<()>(0);
    let config = RelayConfig::default().with_queue_capacity(3);
    let relay = Relay::start(
        config,
        FakeEngine::new(timeline.clone()).with_hold(release_rx),
        FakeSpeaker::new(timeline.clone()),
    )
    .unwrap();
    let handler = relay.handler();

    assert_eq!(handler.handle_datagram(&osc_text("hold")), 1);
    assert!(wait_until(Duration::from_secs(2), || timeline.events().len() == 1));
    for text in ["one", "two", "three"] {
        assert_eq!(handler.handle_datagram(&osc_text(text)), 1);
    }
    drop(handler);

    // Shutdown is requested while the first item is still in flight
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
    });
    let stats = relay.shutdown();
    releaser.join().unwrap();

    assert_eq!(stats.processed, 4);
    assert_eq!(timeline.played(), vec!["hold", "one", "two", "three"]);
}

#[test]
fn test_malformed_message_does_not_enqueue() {
    let timeline = Timeline::default();
    let relay = start_relay(2, &timeline);
    let handler = relay.handler();

    let empty = rosc::encoder::encode(&OscPacket::Message(OscMessage {
        addr: "/text".to_string(),
        args: vec![],
    }))
    .unwrap();
    assert_eq!(handler.handle_datagram(&empty), 0);
    assert_eq!(relay.pending(), 0);

    drop(handler);
    assert_eq!(relay.shutdown().processed, 0);
    assert!(timeline.events().is_empty());
}

#[test]
fn test_invalid_config_refuses_to_start() {
    let timeline = Timeline::default();
    let config = RelayConfig::default().with_queue_capacity(0);
    let result = Relay::start(config, FakeEngine::new(timeline.clone()), FakeSpeaker::new(timeline));
    assert!(matches!(result, Err(voxrelay::RelayError::ConfigError(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_udp_message_is_spoken() {
    let timeline = Timeline::default();
    let config = RelayConfig::default()
        .with_queue_capacity(3)
        .with_control_addr("127.0.0.1:0".parse().unwrap());
    let relay = Relay::start(config, FakeEngine::new(timeline.clone()), FakeSpeaker::new(timeline.clone())).unwrap();

    let listener = relay.bind_listener().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(listener.run());

    let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(&osc_text("hello from osc"), addr).await.unwrap();
    sender.send_to(b"garbage", addr).await.unwrap();

    let mut spoken = false;
    for _ in 0..200 {
        if relay.stats().spoken == 1 {
            spoken = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(spoken);
    assert_eq!(timeline.played(), vec!["hello from osc"]);
    task.abort();
}
