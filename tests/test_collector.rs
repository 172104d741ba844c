//! Tests for the per-feed metrics collector
//!
//! Drives the collector through a ManualClock so window expiry is exact.

use std::sync::Arc;
use std::time::Duration;

use feed_pulse::config::MetricsConfig;
use feed_pulse::feed::{BoundedFeedBuffer, FeedEntry};
use feed_pulse::metrics::{Clock, LlmRequest, ManualClock, MetricsCollector};

fn collector() -> (Arc<ManualClock>, MetricsCollector) {
    let clock = Arc::new(ManualClock::new());
    let c = MetricsCollector::with_clock(MetricsConfig::default(), clock.clone());
    (clock, c)
}

/// Message and byte rates over the 10s window
#[test]
fn test_rates_over_ten_second_window() {
    let (clock, c) = collector();
    c.init_feed("f", "feed");

    let sizes = [120, 80, 400, 1000, 0];
    for size in sizes {
        c.record_message("f", size);
        clock.advance(Duration::from_secs(1));
    }

    let m = c.feed_snapshot("f").unwrap();
    assert!((m.messages_per_second_10s - 0.5).abs() < 1e-9);
    assert!((m.bytes_per_second_10s - 160.0).abs() < 1e-9);

    // Once everything has aged past the window the rates fall to zero
    clock.advance(Duration::from_secs(11));
    let m = c.feed_snapshot("f").unwrap();
    assert_eq!(m.messages_per_second_10s, 0.0);
    assert_eq!(m.bytes_per_second_10s, 0.0);
    // Totals are lifetime values
    assert_eq!(m.messages_received_total, 5);
    assert_eq!(m.bytes_received_total, 1600);
}

/// 5 losses after 100 messages is a 5% drop rate
#[test]
fn test_drop_rate_percent() {
    let (_clock, c) = collector();
    c.init_feed("f", "feed");
    for _ in 0..100 {
        c.record_message("f", 10);
    }
    for _ in 0..5 {
        c.record_packet_loss("f");
    }

    let m = c.feed_snapshot("f").unwrap();
    assert_eq!(m.messages_dropped_total, 5);
    assert!((m.drop_rate_percent - 5.0).abs() < 1e-9);
}

/// Drop rate keeps its last value until the next loss
#[test]
fn test_drop_rate_holds_between_losses() {
    let (_clock, c) = collector();
    c.init_feed("f", "feed");
    for _ in 0..10 {
        c.record_message("f", 10);
    }
    c.record_packet_loss("f");
    for _ in 0..90 {
        c.record_message("f", 10);
    }

    let m = c.feed_snapshot("f").unwrap();
    assert!((m.drop_rate_percent - 10.0).abs() < 1e-9);
}

/// Snapshot is sorted by name, not by id or registration order
#[test]
fn test_snapshot_sorted_by_name() {
    let (_clock, c) = collector();
    c.init_feed("3", "charlie");
    c.init_feed("1", "alpha");
    c.init_feed("2", "bravo");

    let names: Vec<String> = c.snapshot().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
}

/// Mutating a returned snapshot never leaks back into the collector
#[test]
fn test_snapshot_is_independent_copy() {
    let (_clock, c) = collector();
    c.init_feed("f", "feed");
    c.record_message("f", 10);

    let mut first = c.snapshot();
    first[0].msg_rate_history.clear();
    first[0].msg_rate_history.extend([1e9; 100]);
    first[0].messages_received_total = 999;

    let second = c.snapshot();
    assert_eq!(second[0].msg_rate_history.len(), 2);
    assert!(second[0].msg_rate_history.iter().all(|v| *v < 1e9));
    assert_eq!(second[0].messages_received_total, 1);
}

/// Each snapshot adds exactly one trend point, capped at capacity
#[test]
fn test_trend_histories_are_capped() {
    let clock = Arc::new(ManualClock::new());
    let config = MetricsConfig {
        history_capacity: 5,
        ..MetricsConfig::default()
    };
    let c = MetricsCollector::with_clock(config, clock.clone());
    c.init_feed("f", "feed");

    for i in 0..8u64 {
        c.record_cache_stats("f", 1, i * 100, 0.0);
        c.record_llm_request(
            "f",
            LlmRequest {
                input_tokens: 10,
                output_tokens: 10,
                ttft_ms: 1.0,
                gen_time_ms: i as f64,
                ..LlmRequest::default()
            },
        );
        c.snapshot();
        clock.advance(Duration::from_millis(500));
    }

    let m = c.snapshot().remove(0);
    assert_eq!(m.cache_bytes_history, vec![400.0, 500.0, 600.0, 700.0, 700.0]);
    assert_eq!(m.gen_time_history, vec![4.0, 5.0, 6.0, 7.0, 7.0]);
    assert_eq!(m.msg_rate_history.len(), 5);
}

/// Re-registering a feed during a list refresh keeps its counters
#[test]
fn test_reinit_preserves_state() {
    let (_clock, c) = collector();
    c.init_feed("f", "feed");
    c.record_message("f", 50);
    c.record_ws_status("f", true);
    c.record_ws_status("f", false);

    c.init_feed("f", "feed");
    let m = c.feed_snapshot("f").unwrap();
    assert_eq!(m.messages_received_total, 1);
    assert_eq!(m.reconnects_total, 1);
}

/// The caller-owned buffer reports evictions that the collector accumulates
#[test]
fn test_buffer_evictions_flow_into_collector() {
    let (clock, c) = collector();
    c.init_feed("f", "feed");
    let mut buffer = BoundedFeedBuffer::default();

    for i in 0..60 {
        let data = format!("payload-{i:02}");
        c.record_message("f", data.len() as i64);
        let evicted = buffer.add_entry(FeedEntry {
            feed_id: "f".into(),
            event: "update".into(),
            data,
            received_at: clock.now(),
        });
        c.record_context_eviction("f", evicted as i64);
        c.record_cache_stats("f", buffer.len(), buffer.approx_bytes(), 0.0);
    }

    let m = c.feed_snapshot("f").unwrap();
    assert_eq!(buffer.len(), 50);
    assert_eq!(m.context_evictions_total, 10);
    assert_eq!(m.cache_items_current, 50);
    assert_eq!(m.cache_approx_bytes, 50 * 10);
}

/// Context utilization is last-known-good: zero-token requests keep it
#[test]
fn test_context_utilization_retained_when_last_input_is_zero() {
    let (_clock, c) = collector();
    c.init_feed("f", "feed");
    c.record_llm_request(
        "f",
        LlmRequest {
            input_tokens: 32_000,
            ..LlmRequest::default()
        },
    );
    c.record_llm_request("f", LlmRequest::failed());

    let m = c.snapshot().remove(0);
    assert_eq!(m.input_tokens_last, 0);
    assert!((m.context_utilization_percent - 25.0).abs() < 1e-9);
}

/// Uses a custom context limit
#[test]
fn test_context_utilization_respects_configured_limit() {
    let config = MetricsConfig {
        model_context_limit: 200_000,
        ..MetricsConfig::default()
    };
    let c = MetricsCollector::with_clock(config, Arc::new(ManualClock::new()));
    c.init_feed("f", "feed");
    c.record_llm_request(
        "f",
        LlmRequest {
            input_tokens: 50_000,
            ..LlmRequest::default()
        },
    );
    assert!((c.feed_snapshot("f").unwrap().context_utilization_percent - 25.0).abs() < 1e-9);
}

/// Sizes near i64::MAX keep rates and averages finite and non-negative
#[test]
fn test_huge_payload_sizes_saturate_instead_of_overflowing() {
    let (_clock, c) = collector();
    c.init_feed("f", "feed");
    c.record_message("f", i64::MAX);
    c.record_message("f", i64::MAX);

    let m = c.feed_snapshot("f").unwrap();
    assert!(m.payload_size_avg_bytes.is_finite());
    assert!(m.payload_size_avg_bytes > 0.0);
    assert!(m.bytes_per_second_10s.is_finite());
    assert!(m.bytes_per_second_10s > 0.0);
    assert_eq!(m.messages_received_total, 2);
    assert_eq!(m.bytes_received_total, 2 * i64::MAX as u64);

    // More of them push the lifetime byte total past u64::MAX
    c.record_message("f", i64::MAX);
    c.record_message("f", i64::MAX);
    let m = c.feed_snapshot("f").unwrap();
    assert_eq!(m.bytes_received_total, u64::MAX);
    assert!(m.payload_size_avg_bytes > 0.0);
}
