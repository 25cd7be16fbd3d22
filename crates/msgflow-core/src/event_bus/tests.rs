use super::*;

#[tokio::test]
async fn test_publish_subscribe() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    bus.publish(AnalysisEvent::new(1, 42, true));

    let event = rx.recv().await.unwrap();
    assert_eq!(event.tenant_id, 1);
    assert_eq!(event.message_id, 42);
    assert!(event.is_important);
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let bus = EventBus::new(16);
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    let count = bus.publish(AnalysisEvent::new(3, 7, false));
    assert_eq!(count, 2);

    assert_eq!(rx1.recv().await.unwrap().message_id, 7);
    assert_eq!(rx2.recv().await.unwrap().message_id, 7);
}

#[test]
fn test_publish_without_subscribers_is_dropped() {
    let bus = EventBus::default();
    assert_eq!(bus.publish(AnalysisEvent::new(1, 1, false)), 0);
}

#[test]
fn test_event_wire_format() {
    let json = serde_json::to_value(AnalysisEvent::new(2, 99, false)).unwrap();
    assert_eq!(json["type"], "message.analysis");
    assert_eq!(json["message_id"], 99);

    let back: AnalysisEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, AnalysisEvent::new(2, 99, false));
}
