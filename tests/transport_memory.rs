// tests/transport_memory.rs

use std::sync::{Arc, Mutex};

use extension_bridge::{
    // ---
    create_memory_transport,
    BridgeError,
    HostTransport,
};

#[test]
fn memory_post_is_recorded_not_echoed() {
    // ---
    // Arrange
    // ---
    let (transport, host) = create_memory_transport("mem");
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));

    let sink = seen.clone();
    transport
        .set_message_listener(Arc::new(move |text: &str| sink.lock().unwrap().push(text.to_string())))
        .expect("set listener failed");

    // ---
    // Act
    // ---
    transport.post_message("hello".into()).expect("post failed");
    transport.post_message("world".into()).expect("post failed");

    // ---
    // Assert
    // ---
    assert_eq!(host.posted(), vec!["hello".to_string(), "world".to_string()]);
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(host.take_posted().len(), 2);
    assert!(host.posted().is_empty());
}

#[test]
fn memory_deliver_reaches_listener() {
    // ---
    let (transport, host) = create_memory_transport("mem");
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));

    assert!(!host.has_listener());
    assert!(matches!(host.deliver("early"), Err(BridgeError::Transport(_))));

    let sink = seen.clone();
    transport
        .set_message_listener(Arc::new(move |text: &str| sink.lock().unwrap().push(text.to_string())))
        .unwrap();
    assert!(host.has_listener());

    host.deliver("ping").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["ping".to_string()]);
}

#[test]
fn memory_listener_installs_once() {
    // ---
    let (transport, _host) = create_memory_transport("mem");

    transport.set_message_listener(Arc::new(|_: &str| {})).unwrap();
    let second = transport.set_message_listener(Arc::new(|_: &str| {}));

    assert!(matches!(second, Err(BridgeError::ListenerAlreadySet)));
}

#[test]
fn memory_offline_post_fails() {
    // ---
    let (transport, host) = create_memory_transport("mem");
    host.set_offline(true);

    assert!(matches!(transport.post_message("x".into()), Err(BridgeError::Transport(_))));
    assert!(host.posted().is_empty());

    host.set_offline(false);
    transport.post_message("x".into()).unwrap();
    assert_eq!(host.posted().len(), 1);
}

#[test]
fn memory_sync_uses_responder() {
    // ---
    let (transport, host) = create_memory_transport("mem");
    assert_eq!(transport.transport_id(), "mem");

    assert!(matches!(
        transport.send_sync_message("q".into()),
        Err(BridgeError::SyncUnsupported)
    ));

    host.on_sync(|text| Ok(format!("echo:{text}")));
    assert_eq!(transport.send_sync_message("q".into()).unwrap(), "echo:q");
}

#[test]
fn memory_responder_may_replace_itself() {
    // ---
    let (transport, host) = create_memory_transport("mem");

    let handle = host.clone();
    host.on_sync(move |_| {
        handle.on_sync(|_| Ok("second".to_string()));
        Ok("first".to_string())
    });

    assert_eq!(transport.send_sync_message("q".into()).unwrap(), "first");
    assert_eq!(transport.send_sync_message("q".into()).unwrap(), "second");
}
