//! End-to-end sequence behavior: exhaustion fan-out, dead-letter routing,
//! and independence of concurrent sequences.

#[allow(dead_code)]
mod common;

use std::sync::Arc;
use std::time::Duration;

use requeue::telemetry::MemorySink;
use requeue::{
    Backoff, CorrelationId, DeadLetterHandler, DlqRouting, InstantSleeper, LoggingHandler,
    Publisher, PublishRequest, RetryExecutor, TrackingSleeper,
};

use common::test_helpers::{
    FailingHandler, RecordingHandler, ScriptedPublisher, TestPublishError,
};

fn executor_builder() -> requeue::RetryExecutorBuilder<String, TestPublishError> {
    RetryExecutor::builder()
}

fn work_against(
    publisher: &Arc<ScriptedPublisher>,
    topic: &str,
) -> impl FnMut() -> futures::future::BoxFuture<'static, Result<requeue::Delivery, TestPublishError>>
       + Send
       + 'static {
    let publisher = Arc::clone(publisher);
    let topic = topic.to_string();
    move || {
        let publisher = Arc::clone(&publisher);
        let topic = topic.clone();
        Box::pin(async move { publisher.publish(&topic, None, &"payload".to_string()).await })
    }
}

#[tokio::test]
async fn exhaustion_runs_every_handler_exactly_once() {
    let recording = Arc::new(RecordingHandler::default());
    let executor = executor_builder()
        .max_attempts(3)
        .with_sleeper(InstantSleeper)
        .handler(Arc::new(LoggingHandler))
        .handler(recording.clone())
        .build()
        .unwrap();

    let publisher = Arc::new(ScriptedPublisher::always_failing());
    let request = PublishRequest::with_correlation(
        "orders",
        None,
        "payload".to_string(),
        CorrelationId::from("trace-ex"),
    );
    let outcome = executor.execute(request, work_against(&publisher, "orders")).await;

    assert!(outcome.is_failed());
    assert!(!outcome.is_dead_lettered());
    assert_eq!(publisher.call_count(), 3);
    assert_eq!(recording.invocation_count(), 1);
    assert_eq!(recording.seen(), vec![("orders".to_string(), "trace-ex".to_string())]);
}

#[tokio::test]
async fn failing_handler_does_not_stop_the_next_one() {
    let failing = Arc::new(FailingHandler::default());
    let recording = Arc::new(RecordingHandler::default());
    let executor = executor_builder()
        .max_attempts(2)
        .with_sleeper(InstantSleeper)
        .handler(failing.clone())
        .handler(recording.clone())
        .build()
        .unwrap();

    let publisher = Arc::new(ScriptedPublisher::always_failing());
    let outcome = executor
        .execute(
            PublishRequest::new("orders", None, "payload".to_string()),
            work_against(&publisher, "orders"),
        )
        .await;

    assert!(outcome.is_failed());
    assert_eq!(failing.invocations.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(recording.invocation_count(), 1, "second handler must still run");
}

#[tokio::test]
async fn dead_letter_handler_turns_the_outcome_dead_lettered() {
    let dlq_publisher = Arc::new(ScriptedPublisher::default());
    let executor = executor_builder()
        .max_attempts(2)
        .with_sleeper(InstantSleeper)
        .handler(Arc::new(LoggingHandler))
        .handler(Arc::new(DeadLetterHandler::new(
            Arc::clone(&dlq_publisher),
            DlqRouting::suffixing(),
        )))
        .build()
        .unwrap();

    let primary = Arc::new(ScriptedPublisher::always_failing());
    let outcome = executor
        .execute(
            PublishRequest::new("orders", Some("k1".to_string()), "payload".to_string()),
            work_against(&primary, "orders"),
        )
        .await;

    assert!(outcome.is_dead_lettered());
    assert_eq!(outcome.dead_letter_topic(), Some("orders.dlq"));

    let routed = dlq_publisher.published();
    assert_eq!(routed.len(), 1, "dead-letter publish is one-shot");
    assert_eq!(routed[0].0, "orders.dlq");
    assert_eq!(routed[0].1.as_deref(), Some("k1"));
    assert_eq!(routed[0].2, "payload");
}

#[tokio::test]
async fn dead_letter_override_topic_wins() {
    let dlq_publisher = Arc::new(ScriptedPublisher::default());
    let executor = executor_builder()
        .max_attempts(1)
        .handler(Arc::new(DeadLetterHandler::new(
            Arc::clone(&dlq_publisher),
            DlqRouting::fixed("global.dlq"),
        )))
        .build()
        .unwrap();

    let primary = Arc::new(ScriptedPublisher::always_failing());
    let outcome = executor
        .execute(
            PublishRequest::new("orders", None, "payload".to_string()),
            work_against(&primary, "orders"),
        )
        .await;

    assert_eq!(outcome.dead_letter_topic(), Some("global.dlq"));
    assert_eq!(primary.call_count(), 1, "budget of one means no retries");
}

#[tokio::test]
async fn failed_dead_letter_publish_leaves_the_outcome_failed() {
    let dlq_publisher = Arc::new(ScriptedPublisher::always_failing());
    let recording = Arc::new(RecordingHandler::default());
    let executor = executor_builder()
        .max_attempts(1)
        .handler(Arc::new(DeadLetterHandler::new(
            Arc::clone(&dlq_publisher),
            DlqRouting::suffixing(),
        )))
        .handler(recording.clone())
        .build()
        .unwrap();

    let primary = Arc::new(ScriptedPublisher::always_failing());
    let outcome = executor
        .execute(
            PublishRequest::new("orders", None, "payload".to_string()),
            work_against(&primary, "orders"),
        )
        .await;

    assert!(outcome.is_failed());
    assert!(outcome.dead_letter_topic().is_none());
    assert_eq!(recording.invocation_count(), 1, "handler after the failed DLQ still runs");
}

#[tokio::test]
async fn success_mid_budget_settles_with_that_attempts_delivery() {
    let sleeper = TrackingSleeper::new();
    let executor = executor_builder()
        .max_attempts(5)
        .backoff(Backoff::new(Duration::from_millis(100), 2.0, Duration::from_millis(5000)))
        .with_sleeper(sleeper.clone())
        .build()
        .unwrap();

    let publisher = Arc::new(ScriptedPublisher::failing_first(1));
    let outcome = executor
        .execute(
            PublishRequest::new("orders", None, "payload".to_string()),
            work_against(&publisher, "orders"),
        )
        .await;

    assert!(outcome.is_success());
    assert_eq!(publisher.call_count(), 2);
    assert_eq!(outcome.delivery().unwrap().offset, Some(1));
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(100)]);
}

#[tokio::test]
async fn telemetry_is_tagged_by_topic() {
    let sink = MemorySink::new();
    let executor = executor_builder()
        .max_attempts(2)
        .with_sleeper(InstantSleeper)
        .telemetry(sink.clone())
        .build()
        .unwrap();

    let publisher = Arc::new(ScriptedPublisher::always_failing());
    let _ = executor
        .execute(
            PublishRequest::new("payments", None, "payload".to_string()),
            work_against(&publisher, "payments"),
        )
        .await;

    assert_eq!(sink.count_of("retry_scheduled"), 1);
    assert_eq!(sink.count_of("retries_exhausted"), 1);
    assert!(sink.events().iter().all(|e| e.topic() == "payments"));
}

#[tokio::test]
async fn concurrent_sequences_settle_independently() {
    let executor = Arc::new(
        executor_builder().max_attempts(3).with_sleeper(InstantSleeper).build().unwrap(),
    );

    let mut tasks = Vec::new();
    for i in 0..8 {
        let executor = Arc::clone(&executor);
        tasks.push(tokio::spawn(async move {
            let topic = format!("topic-{i}");
            // Even sequences succeed on attempt 2, odd ones exhaust.
            let failures = if i % 2 == 0 { 1 } else { usize::MAX };
            let publisher = Arc::new(ScriptedPublisher::failing_first(failures));
            let request = PublishRequest::with_correlation(
                topic.clone(),
                None,
                "payload".to_string(),
                CorrelationId::from(format!("trace-{i}")),
            );
            let publisher_work = {
                let publisher = Arc::clone(&publisher);
                let topic = topic.clone();
                move || -> futures::future::BoxFuture<
                    'static,
                    Result<requeue::Delivery, TestPublishError>,
                > {
                    let publisher = Arc::clone(&publisher);
                    let topic = topic.clone();
                    Box::pin(async move {
                        publisher.publish(&topic, None, &"payload".to_string()).await
                    })
                }
            };
            let outcome = executor.execute(request, publisher_work).await;
            (i, topic, outcome)
        }));
    }

    for task in tasks {
        let (i, topic, outcome) = task.await.unwrap();
        assert_eq!(outcome.correlation_id().as_str(), format!("trace-{i}"));
        if i % 2 == 0 {
            assert!(outcome.is_success());
            assert_eq!(outcome.delivery().unwrap().topic, topic);
        } else {
            assert!(outcome.is_failed());
            assert_eq!(outcome.failure().unwrap().topic(), topic);
        }
    }
}
