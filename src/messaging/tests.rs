use super::*;
use serde_json::json;

#[tokio::test]
async fn test_publish_reaches_every_subscriber() {
    let bus = NotificationBus::new();
    let mut first = bus.subscribe();
    let mut second = bus.subscribe();

    let delivered = bus.publish(Notification::push_token(Some("tok1")));
    assert_eq!(delivered, 2);

    let expected = Notification::PushToken {
        token: "tok1".to_string(),
    };
    assert_eq!(first.recv().await.unwrap(), expected);
    assert_eq!(second.recv().await.unwrap(), expected);
}

#[test]
fn test_publish_without_subscribers() {
    let bus = NotificationBus::new();
    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(bus.publish(Notification::silent_payload("T", "B")), 0);
}

#[test]
fn test_missing_push_token_becomes_empty() {
    assert_eq!(
        Notification::push_token(None),
        Notification::PushToken {
            token: String::new()
        }
    );
}

#[test]
fn test_from_remote_data() {
    let data = json!({ "title": "Hello", "body": "World", "badge": 1 });
    let notification = Notification::from_remote_data(data.as_object().unwrap());
    assert_eq!(
        notification,
        Some(Notification::SilentPayload {
            title: "Hello".to_string(),
            body: "World".to_string(),
        })
    );
}

#[test]
fn test_from_remote_data_requires_title_and_body() {
    let missing_body = json!({ "title": "Hello" });
    assert_eq!(Notification::from_remote_data(missing_body.as_object().unwrap()), None);

    let wrong_type = json!({ "title": "Hello", "body": 42 });
    assert_eq!(Notification::from_remote_data(wrong_type.as_object().unwrap()), None);
}

#[test]
fn test_topics() {
    assert_eq!(Notification::push_token(Some("t")).topic(), "push-token");
    assert_eq!(Notification::silent_payload("a", "b").topic(), "silent-payload");
}
