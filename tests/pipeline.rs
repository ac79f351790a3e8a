//! Queue + composite router, wired the way a deployment composes them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use courier::{
    Channel, ChannelRouter, CompositeRouter, DeliveryError, DeliveryQueue, EventKind,
    FailedDelivery, FailureFn, FailureRef, HandlerFn, HandlerRef, Message, QueueConfig,
    RouteError, RouteHandler, Router,
};

fn config() -> QueueConfig {
    QueueConfig {
        max_retries: 3,
        retry_delay: Duration::from_millis(100),
        max_concurrent: 2,
        ..QueueConfig::default()
    }
}

fn dead_letters() -> (FailureRef, Arc<Mutex<Vec<FailedDelivery>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: FailureRef = FailureFn::arc("dead-letter", move |f: FailedDelivery| {
        let sink = Arc::clone(&sink);
        async move { sink.lock().push(f) }
    });
    (handler, seen)
}

#[tokio::test(start_paused = true)]
async fn flaky_transport_is_retried_through_the_router() {
    let router = Arc::new(CompositeRouter::new());
    router.register_router(Channel::Slack, Arc::new(ChannelRouter::slack()));
    router.register_router(Channel::Internal, Arc::new(ChannelRouter::internal()));

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let slack_post: HandlerRef = HandlerFn::arc("slack-post", move |m: Message| {
        let calls = Arc::clone(&c);
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                return Err(DeliveryError::fail(format!("429 for {}", m.id)));
            }
            Ok(())
        }
    });
    router.subscribe(Channel::Slack, slack_post);

    let audit = Arc::new(Mutex::new(Vec::new()));
    let a = Arc::clone(&audit);
    let audit_log: HandlerRef = HandlerFn::arc("audit", move |m: Message| {
        let audit = Arc::clone(&a);
        async move {
            audit.lock().push(m.id);
            Ok::<_, DeliveryError>(())
        }
    });
    router.subscribe(Channel::Internal, audit_log);

    let (on_failure, failed) = dead_letters();
    let queue = DeliveryQueue::builder(
        config(),
        Arc::new(RouteHandler::new("outbound", router)),
        on_failure,
    )
    .build()
    .unwrap();
    let mut events = queue.subscribe_events();

    queue.enqueue(Message::new("deploy-1", "ci", Channel::Slack, "deploy finished"));
    queue.enqueue(Message::new("audit-1", "ci", Channel::Internal, "deploy recorded"));
    queue.drain().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(*audit.lock(), vec!["audit-1".to_string()]);
    assert!(failed.lock().is_empty());

    let mut retries = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::RetryScheduled {
            assert_eq!(ev.message.as_deref(), Some("deploy-1"));
            retries += 1;
        }
    }
    assert_eq!(retries, 2);

    queue.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unroutable_channel_ends_in_the_failure_handler() {
    let router = Arc::new(CompositeRouter::new());
    router.register_router(Channel::Slack, Arc::new(ChannelRouter::slack()));

    let (on_failure, failed) = dead_letters();
    let queue = DeliveryQueue::builder(
        config(),
        Arc::new(RouteHandler::new("outbound", router)),
        on_failure,
    )
    .build()
    .unwrap();

    queue.enqueue(Message::new("mail-1", "ci", Channel::Email, "weekly report"));
    queue.drain().await.unwrap();

    let failed = failed.lock();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].message.id, "mail-1");
    assert_eq!(failed[0].attempts, 3);
    assert_eq!(
        failed[0].error,
        DeliveryError::from(RouteError::NoRouter {
            channel: Channel::Email
        })
    );
}

#[tokio::test(start_paused = true)]
async fn every_message_is_delivered_with_bounded_concurrency() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(AtomicUsize::new(0));
    let (a, p, d) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&delivered));
    let processor: HandlerRef = HandlerFn::arc("slow", move |_m: Message| {
        let (active, peak, delivered) = (Arc::clone(&a), Arc::clone(&p), Arc::clone(&d));
        async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            delivered.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DeliveryError>(())
        }
    });
    let (on_failure, failed) = dead_letters();
    let queue = DeliveryQueue::builder(config(), processor, on_failure)
        .build()
        .unwrap();

    for i in 1..=4 {
        queue.enqueue(Message::new(
            format!("test-{i}"),
            "tester",
            Channel::Internal,
            "payload",
        ));
    }
    let snap = queue.snapshot().await.unwrap();
    assert_eq!(snap.in_flight, 2);

    queue.drain().await.unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 4);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert!(failed.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn always_failing_message_uses_every_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let processor: HandlerRef = HandlerFn::arc("down", move |_m: Message| {
        let calls = Arc::clone(&c);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(DeliveryError::fail("Processing failed"))
        }
    });
    let (on_failure, failed) = dead_letters();
    let cfg = QueueConfig {
        max_retries: 2,
        ..config()
    };
    let queue = DeliveryQueue::builder(cfg, processor, on_failure)
        .build()
        .unwrap();

    queue.enqueue(Message::new("test-3", "tester", Channel::Internal, "payload"));
    queue.drain().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let failed = failed.lock();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].attempts, 2);
    assert_eq!(failed[0].error.to_string(), "delivery failed: Processing failed");
}
