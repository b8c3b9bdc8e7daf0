//! Session lifecycle tests against the simulated board.

use periboard::infrastructure::sim::SimDevice;
use periboard::{Command, DeviceSession, PeriboardError, SessionOptions, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn sim_session() -> DeviceSession {
    DeviceSession::with_opener(
        "sim0",
        SessionOptions::default(),
        Box::new(|_: &str, _: u32| Ok(Box::new(SimDevice::new()) as Box<dyn Transport>)),
    )
}

#[tokio::test]
async fn terminate_when_not_connected_is_noop() {
    let mut session = sim_session();
    session.terminate();
    assert!(!session.is_connected());
}

#[tokio::test]
async fn terminate_twice_equals_terminate_once() {
    let mut session = sim_session();
    session.connect().await.unwrap();

    session.terminate();
    let after_once = session.is_connected();
    session.terminate();
    let after_twice = session.is_connected();

    assert!(!after_once);
    assert_eq!(after_once, after_twice);
}

#[tokio::test]
async fn send_command_without_connect_fails_not_connected() {
    let session = sim_session();
    let result = session.send_command(b"ram_free".to_vec(), None).await;
    assert!(matches!(result, Err(PeriboardError::NotConnected)));
}

#[tokio::test]
async fn send_command_after_terminate_fails_not_connected() {
    let mut session = sim_session();
    session.connect().await.unwrap();
    session.terminate();

    let result = session.send_command(b"ram_free".to_vec(), None).await;
    assert!(matches!(result, Err(PeriboardError::NotConnected)));
}

#[tokio::test]
async fn ram_free_query_returns_490_and_session_stays_connected() {
    let mut session = sim_session();
    session.connect().await.unwrap();

    let response = session.send_command(b"ram_free".to_vec(), None).await.unwrap();
    assert_eq!(response, b"490");
    assert!(session.is_connected());

    // The session keeps answering afterwards.
    let response = session.send_command(b"ram_free".to_vec(), None).await.unwrap();
    assert_eq!(response, b"490");
}

#[tokio::test]
async fn reconnect_leaves_exactly_one_monitor() {
    let opens = Arc::new(AtomicUsize::new(0));
    let opener = {
        let opens = Arc::clone(&opens);
        Box::new(move |_: &str, _: u32| {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(SimDevice::new()) as Box<dyn Transport>)
        })
    };

    let mut session = DeviceSession::with_opener("sim0", SessionOptions::default(), opener);
    session.connect().await.unwrap();
    session.connect().await.unwrap();
    session.connect().await.unwrap();

    // Three transports were opened, but only the latest one answers.
    assert_eq!(opens.load(Ordering::SeqCst), 3);
    assert!(session.is_connected());
    let response = session.send_command(b"ram_free".to_vec(), None).await.unwrap();
    assert_eq!(response, b"490");
}

#[tokio::test]
async fn request_timeout_is_bounded_and_leaves_session_usable() {
    let devices = Arc::new(AtomicUsize::new(0));
    let opener = {
        let devices = Arc::clone(&devices);
        Box::new(move |_: &str, _: u32| {
            let transport: Box<dyn Transport> = if devices.fetch_add(1, Ordering::SeqCst) == 0 {
                Box::new(SimDevice::mute())
            } else {
                Box::new(SimDevice::new())
            };
            Ok(transport)
        })
    };

    let mut session = DeviceSession::with_opener("sim0", SessionOptions::default(), opener);
    session.connect().await.unwrap();

    let started = Instant::now();
    let result = session
        .send_command(b"ram_free".to_vec(), Some(Duration::from_millis(10)))
        .await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(PeriboardError::RequestTimeout { .. })));
    assert!(elapsed < Duration::from_millis(100), "took {:?}", elapsed);
    // A timeout does not tear the connection down.
    assert!(session.is_connected());
}

#[tokio::test]
async fn transport_death_fails_requests_until_reconnect() {
    let devices = Arc::new(AtomicUsize::new(0));
    let opener = {
        let devices = Arc::clone(&devices);
        Box::new(move |_: &str, _: u32| {
            let transport: Box<dyn Transport> = if devices.fetch_add(1, Ordering::SeqCst) == 0 {
                Box::new(SimDevice::drop_after(0))
            } else {
                Box::new(SimDevice::new())
            };
            Ok(transport)
        })
    };

    let mut session = DeviceSession::with_opener("sim0", SessionOptions::default(), opener);
    session.connect().await.unwrap();

    let result = session.send_command(b"ram_free".to_vec(), None).await;
    assert!(matches!(result, Err(PeriboardError::Transport { .. })));

    // The link is gone until connect() is called again.
    let result = session
        .send_command(b"ram_free".to_vec(), Some(Duration::from_millis(50)))
        .await;
    assert!(result.is_err());

    session.connect().await.unwrap();
    let response = session.send_command(b"ram_free".to_vec(), None).await.unwrap();
    assert_eq!(response, b"490");
}

#[tokio::test]
async fn board_id_can_be_rewritten() {
    let mut session = sim_session();
    session.connect().await.unwrap();

    let id = session.execute(&Command::Id, None).await.unwrap();
    assert_eq!(id, b"periboard-000");

    session
        .execute(&Command::SetId("bench-3".to_string()), None)
        .await
        .unwrap();
    let id = session.execute(&Command::Id, None).await.unwrap();
    assert_eq!(id, b"bench-3");
}

#[tokio::test]
async fn connect_times_out_when_device_never_handshakes() {
    let mut session = DeviceSession::with_opener(
        "sim0",
        SessionOptions {
            default_timeout: Duration::from_millis(20),
            ..SessionOptions::default()
        },
        Box::new(|_: &str, _: u32| {
            Ok(Box::new(SimDevice::without_handshake()) as Box<dyn Transport>)
        }),
    );

    let result = session.connect().await;
    assert!(matches!(
        result,
        Err(PeriboardError::ConnectionTimeout { .. })
    ));
    assert!(!session.is_connected());

    // The session object stays reusable after a failed connect.
    session.terminate();
}
