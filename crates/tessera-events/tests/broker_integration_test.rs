//! End-to-end tests for brokers, topics, and senders.

use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;
use tessera_events::{
    async_handler, handler, Broker, BrokerConfig, BrokerError, ErrorStrategy, HandlerOptions,
    Topic, TopicConfig, TopicError, TopicMessage,
};

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn record(log: &Log, label: impl Into<String>) -> tessera_events::HandlerFn {
    let log = Arc::clone(log);
    let label = label.into();
    handler(move |data| {
        log.lock().push(format!("{label}:{data}"));
        Ok(())
    })
}

proptest! {
    #[test]
    fn test_dispatch_order_is_stable_by_priority(priorities in prop::collection::vec(-5i32..5, 1..20)) {
        let topic = Topic::new(TopicConfig::new("ordering"));
        let log = Log::default();
        for (i, priority) in priorities.iter().enumerate() {
            let log = Arc::clone(&log);
            topic
                .register(
                    format!("h{i}"),
                    handler(move |_| {
                        log.lock().push(i.to_string());
                        Ok(())
                    }),
                    HandlerOptions::new().with_priority(*priority).generic(true),
                )
                .unwrap();
        }

        topic.publish_event(TopicMessage::new("ui", JsonValue::Null)).unwrap();

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by_key(|&i| std::cmp::Reverse(priorities[i]));
        let expected: Vec<String> = expected.into_iter().map(|i| i.to_string()).collect();
        prop_assert_eq!(&*log.lock(), &expected);

        let listed: Vec<i32> = topic.active_handlers().iter().map(|h| h.priority).collect();
        prop_assert!(listed.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_sender_publishes_through_broker() {
    init_tracing();
    let broker = Broker::new("app");
    let filters = broker
        .create_topic(TopicConfig::new("filters").with_debug(true))
        .unwrap();
    let log = Log::default();

    let months = filters
        .register("months_changed", record(&log, "months"), HandlerOptions::new())
        .unwrap();
    filters
        .register("audit", record(&log, "audit"), HandlerOptions::new().generic(true))
        .unwrap();
    filters
        .register("years_changed", record(&log, "years"), HandlerOptions::new())
        .unwrap();

    let mut extra = Map::new();
    extra.insert("origin".into(), json!("sidebar"));
    let sent = months.send_with(json!(["Jan"]), extra).unwrap();

    assert_eq!(sent.sender, "filters@1.0.0.months_changed");
    assert_eq!(sent.destination.as_deref(), Some("months_changed"));
    assert_eq!(sent.message_type.as_deref(), Some("months_changed"));
    assert_eq!(sent.extra["origin"], json!("sidebar"));
    assert_eq!(
        *log.lock(),
        vec![r#"months:["Jan"]"#.to_string(), r#"audit:["Jan"]"#.to_string()]
    );
}

#[test]
fn test_generic_sender_message_type() {
    let broker = Broker::new("app");
    let topic = broker.create_topic(TopicConfig::new("filters")).unwrap();
    let sender = topic
        .register("everything", handler(|_| Ok(())), HandlerOptions::new().generic(true))
        .unwrap();

    let sent = sender.send(json!(1)).unwrap();
    assert_eq!(sent.message_type.as_deref(), Some("generic"));
}

#[test]
fn test_handler_can_publish_while_dispatching() {
    let broker = Broker::new("app");
    let topic = broker.create_topic(TopicConfig::new("counter")).unwrap();
    let log = Log::default();

    let tail = topic
        .register("tail", record(&log, "tail"), HandlerOptions::new())
        .unwrap();
    let head_log = Arc::clone(&log);
    let head = topic
        .register(
            "head",
            handler(move |data| {
                head_log.lock().push(format!("head:{data}"));
                let next = data.as_i64().unwrap_or_default() + 1;
                tail.send(json!(next))?;
                Ok(())
            }),
            HandlerOptions::new().transactional(true),
        )
        .unwrap();

    head.send(json!(1)).unwrap();
    assert_eq!(*log.lock(), vec!["head:1", "tail:2"]);
}

#[test]
fn test_blacklisted_sender_through_broker() {
    let broker = Broker::new("app");
    let topic = broker.create_topic(TopicConfig::new("filters")).unwrap();
    let log = Log::default();
    let sender = topic
        .register("reset", record(&log, "reset"), HandlerOptions::new())
        .unwrap();
    topic.add_to_blacklist("filters@1.0.0.reset");

    let err = sender.send(json!(null)).unwrap_err();
    assert!(matches!(err, BrokerError::Topic(TopicError::PermissionDenied { .. })));
    assert!(log.lock().is_empty());
    assert_eq!(topic.get_dead_letters().len(), 1);
    let letter = &topic.get_dead_letters()[0];
    assert_eq!(letter.data, JsonValue::Null);
    assert!(letter.error.contains("'filters@1.0.0.reset'"));
}

#[test]
fn test_removed_topic_senders_report_no_broker() {
    let broker = Broker::new("app");
    let topic = broker
        .create_topic(TopicConfig::new("filters").with_error_strategy(ErrorStrategy::Warn))
        .unwrap();
    let sender = topic
        .register("reset", handler(|_| Ok(())), HandlerOptions::new())
        .unwrap();

    broker.remove_topic("filters");
    assert_eq!(sender.send(json!(1)).unwrap(), TopicMessage::system());
    assert!(topic.get_dead_letters()[0].error.contains("No broker assigned"));
}

#[test]
fn test_broker_from_declared_topics() {
    let config = BrokerConfig {
        name: "dashboard".into(),
        debug: false,
        topics: vec![
            TopicConfig::new("filters").with_error_strategy(ErrorStrategy::Ignore),
            TopicConfig::new("charts").with_version("2.1.0"),
        ],
    };
    let broker = Broker::from_config(&config).unwrap();

    assert_eq!(broker.topic_ids(), vec!["charts", "filters"]);
    assert_eq!(broker.topic("charts").unwrap().full_id(), "charts@2.1.0");
    assert_eq!(
        broker.topic("filters").unwrap().error_strategy(),
        ErrorStrategy::Ignore
    );
}

#[tokio::test]
async fn test_async_handlers_complete_on_flush() {
    init_tracing();
    let broker = Broker::new("app");
    let topic = broker.create_topic(TopicConfig::new("jobs")).unwrap();
    let log = Log::default();

    let sink = Arc::clone(&log);
    let sender = topic
        .register_async(
            "render",
            async_handler(move |data| {
                let sink = Arc::clone(&sink);
                async move {
                    tokio::task::yield_now().await;
                    sink.lock().push(format!("render:{data}"));
                    Ok::<(), anyhow::Error>(())
                }
            }),
            HandlerOptions::new().transactional(true),
        )
        .unwrap();

    sender.send(json!(1)).unwrap();
    sender.send(json!(2)).unwrap();
    broker.flush().await.unwrap();

    let mut seen = log.lock().clone();
    seen.sort();
    assert_eq!(seen, vec!["render:1", "render:2"]);
    assert_eq!(topic.pending(), 0);
    assert_eq!(topic.get_metrics().metrics.events_processed, 2);
}

#[tokio::test]
async fn test_async_failure_is_routed() {
    let topic = Topic::new(TopicConfig::new("jobs"));
    topic
        .register_async(
            "render",
            async_handler(|_| async { Err::<(), _>(anyhow::anyhow!("render crashed")) }),
            HandlerOptions::new().generic(true),
        )
        .unwrap();

    topic
        .publish_event(TopicMessage::new("ui", json!("chart")))
        .unwrap();
    let err = topic.flush().await.unwrap_err();

    assert!(matches!(err, TopicError::Processing { .. }));
    assert!(err.to_string().contains("render crashed"));
    let letters = topic.get_dead_letters();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].data, json!("chart"));
    assert_eq!(topic.get_metrics().metrics.errors, 1);
}

#[tokio::test]
async fn test_async_failure_ignored() {
    let topic = Topic::new(TopicConfig::new("jobs").with_error_strategy(ErrorStrategy::Ignore));
    topic
        .register_async(
            "render",
            async_handler(|_| async { Err::<(), _>(anyhow::anyhow!("render crashed")) }),
            HandlerOptions::new().generic(true),
        )
        .unwrap();

    topic.publish_event(TopicMessage::new("ui", json!(1))).unwrap();
    topic.flush().await.unwrap();
    assert_eq!(topic.get_dead_letters().len(), 1);
}

#[test]
fn test_async_handler_outside_runtime_warns() {
    let topic = Topic::new(TopicConfig::new("jobs").with_error_strategy(ErrorStrategy::Warn));
    topic
        .register_async(
            "render",
            async_handler(|_| async { Ok::<(), anyhow::Error>(()) }),
            HandlerOptions::new().generic(true),
        )
        .unwrap();

    topic.publish_event(TopicMessage::new("ui", json!(1))).unwrap();
    assert_eq!(topic.pending(), 0);
    assert!(topic.get_dead_letters()[0].error.contains("No async runtime"));
}
