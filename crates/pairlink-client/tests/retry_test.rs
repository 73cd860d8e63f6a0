//! Retry behavior against endpoints that never answer properly.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use pairlink_client::{Client, ClientConfig, ClientError, RetryPolicy};
use pairlink_core::{Environment, SystemEnv};
use pairlink_proto::Data;
use tokio::net::TcpListener;

/// Records requested sleeps instead of waiting.
#[derive(Clone, Default)]
struct RecordingEnv {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingEnv {
    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Environment for RecordingEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.sleeps.lock().unwrap().push(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        SystemEnv.random_bytes(buffer);
    }
}

/// Accepts connections and drops them immediately.
async fn hangup_endpoint() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    (addr, accepted)
}

async fn wait_for(counter: &AtomicUsize, expected: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while counter.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn failing_endpoint_gets_every_attempt() {
    let (addr, accepted) = hangup_endpoint().await;
    let env = RecordingEnv::default();
    let client = Client::with_env(addr, ClientConfig::default(), env.clone()).unwrap();

    let err = client.send("echo", Data::from("abc")).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)), "unexpected error: {err}");
    assert_eq!(
        env.sleeps(),
        vec![Duration::ZERO, Duration::from_millis(50), Duration::from_millis(100)]
    );

    wait_for(&accepted, 3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unreachable_endpoint_is_tried_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let env = RecordingEnv::default();
    let client = Client::with_env(addr, ClientConfig::default(), env.clone()).unwrap();

    let err = client.send("echo", Data::from("abc")).await.unwrap_err();

    assert!(matches!(err, ClientError::Connection(_)), "unexpected error: {err}");
    assert!(err.is_fatal());
    assert_eq!(env.sleeps(), vec![Duration::ZERO]);
}

#[tokio::test]
async fn custom_policy_sets_attempts_and_spacing() {
    let (addr, accepted) = hangup_endpoint().await;
    let env = RecordingEnv::default();
    let config = ClientConfig::default().with_retry(RetryPolicy::new(5, Duration::from_millis(10)));
    let client = Client::with_env(addr, config, env.clone()).unwrap();

    client.send("echo", Data::from("abc")).await.unwrap_err();

    let expected: Vec<_> = (0..5).map(|i| Duration::from_millis(10) * i).collect();
    assert_eq!(env.sleeps(), expected);
    wait_for(&accepted, 5).await;
}

#[tokio::test]
async fn zero_retries_makes_no_attempt() {
    let (addr, accepted) = hangup_endpoint().await;
    let env = RecordingEnv::default();
    let config = ClientConfig::default().with_retry(RetryPolicy::new(0, Duration::from_millis(10)));
    let client = Client::with_env(addr, config, env.clone()).unwrap();

    let err = client.send("echo", Data::from("abc")).await.unwrap_err();

    assert!(matches!(err, ClientError::NoAttempts));
    assert!(env.sleeps().is_empty());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn silent_endpoint_times_out_each_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    // Accept and hold every connection open without answering
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let env = RecordingEnv::default();
    let config = ClientConfig::default().with_connection_timeout(Duration::from_millis(50));
    let client = Client::with_env(addr, config, env.clone()).unwrap();

    let err = client.send("echo", Data::from("abc")).await.unwrap_err();

    assert!(
        matches!(err, ClientError::Transport(pairlink_core::ConnectionError::Timeout)),
        "unexpected error: {err}"
    );
    assert_eq!(env.sleeps().len(), 3);
}
