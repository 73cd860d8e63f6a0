//! Client session behavior against a scripted responder.
//!
//! The responder here is deliberately minimal: it answers each package type
//! the way a well-behaved server does and records what it saw, so tests can
//! swap its key to simulate a server restart.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use pairlink_client::{Client, ClientConfig, ClientError, RetryPolicy};
use pairlink_core::{Connection, KeyCache, Limits};
use pairlink_crypto::PublicKey;
use pairlink_proto::{
    CryptMessage, Data, Message, Package, PackageType, Rejection, ResumeVerdict,
};
use tokio::net::{TcpListener, TcpStream};

type Log = Arc<Mutex<Vec<PackageType>>>;

struct Responder {
    addr: String,
    keys: Arc<KeyCache>,
    log: Log,
}

impl Responder {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let keys = Arc::new(KeyCache::new());
        let log = Log::default();

        let (task_keys, task_log) = (Arc::clone(&keys), Arc::clone(&log));
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (keys, log) = (Arc::clone(&task_keys), Arc::clone(&task_log));
                tokio::spawn(async move { respond(stream, &keys, &log).await });
            }
        });

        Self { addr, keys, log }
    }

    fn take_log(&self) -> Vec<PackageType> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

async fn respond(stream: TcpStream, keys: &KeyCache, log: &Log) -> Option<()> {
    let limits = Limits::default().with_connection_timeout(Duration::from_secs(5));
    let mut conn = Connection::open(stream, &limits).ok()?;

    loop {
        let package = conn.read_package().await.ok()?;
        log.lock().unwrap().push(package.kind());

        match package.kind() {
            PackageType::Handshake => {
                let public = PublicKey::from_der(package.payload()).ok()?;
                let wrapped = public.wrap_key(&keys.get_or_generate().await).ok()?;
                conn.write_package(&Package::new(PackageType::Handshake, wrapped)).await.ok()?;
            },
            PackageType::Resume => {
                let decrypted = match keys.get().await {
                    Some(key) => key.decrypt(package.payload()).is_ok(),
                    None => false,
                };
                let verdict = ResumeVerdict::from_outcome(decrypted);
                conn.write_package(&verdict.to_package()).await.ok()?;
                if !decrypted {
                    return None;
                }
            },
            PackageType::Exchange => {
                let key = keys.get().await;
                let request = key
                    .as_ref()
                    .and_then(|key| CryptMessage::from(package.payload()).open(key).ok());
                let reply = match (key, request) {
                    (Some(key), Some(request)) => {
                        let sealed = Message::reply(request.topic, request.content).seal(&key).ok()?;
                        Package::new(PackageType::Exchange, sealed.into_bytes())
                    },
                    _ => Rejection::Decrypt.to_package().ok()?,
                };
                conn.write_package(&reply).await.ok()?;
                return Some(());
            },
            PackageType::Error => return None,
        }
    }
}

fn client(addr: &str, config: ClientConfig) -> Client {
    Client::new(addr, config.with_connection_timeout(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn first_call_handshakes_then_resumes() {
    let responder = Responder::start().await;
    let client = client(&responder.addr, ClientConfig::default());

    let response = client.send("echo", Data::from("abc")).await.unwrap();
    assert_eq!(response.bytes(), b"abc");
    assert!(response.addr().is_some());
    assert_eq!(responder.take_log(), vec![PackageType::Handshake, PackageType::Exchange]);

    let cached = client.cached_key().await.unwrap();
    assert_eq!(Some(&cached), responder.keys.get().await.as_ref());

    client.send("echo", Data::from("def")).await.unwrap();
    assert_eq!(responder.take_log(), vec![PackageType::Resume, PackageType::Exchange]);
}

#[tokio::test]
async fn resume_disabled_exchanges_directly() {
    let responder = Responder::start().await;
    let client = client(&responder.addr, ClientConfig::default().with_resume(false));

    client.send("echo", Data::from("abc")).await.unwrap();
    responder.take_log();

    client.send("echo", Data::from("abc")).await.unwrap();
    assert_eq!(responder.take_log(), vec![PackageType::Exchange]);
}

#[tokio::test]
async fn rejected_resume_falls_back_to_handshake() {
    let responder = Responder::start().await;
    let client = client(&responder.addr, ClientConfig::default());

    client.send("echo", Data::from("abc")).await.unwrap();
    let stale = client.cached_key().await.unwrap();
    responder.take_log();

    // Server restart: its key is gone
    responder.keys.invalidate().await;

    let response = client.send("echo", Data::from("again")).await.unwrap();
    assert_eq!(response.bytes(), b"again");
    assert_eq!(
        responder.take_log(),
        vec![PackageType::Resume, PackageType::Handshake, PackageType::Exchange]
    );
    assert_ne!(client.cached_key().await.unwrap(), stale);
}

#[tokio::test]
async fn rejected_resume_without_retries_reports_cipher_key_error() {
    let responder = Responder::start().await;
    let config = ClientConfig::default().with_retry(RetryPolicy::new(1, Duration::ZERO));
    let client = client(&responder.addr, config);

    client.send("echo", Data::from("abc")).await.unwrap();
    responder.keys.invalidate().await;

    let err = client.send("echo", Data::from("abc")).await.unwrap_err();
    assert!(matches!(err, ClientError::CipherKey));
    assert!(client.cached_key().await.is_none());
}

#[tokio::test]
async fn decrypt_rejection_drops_cached_key() {
    let responder = Responder::start().await;
    let config = ClientConfig::default()
        .with_resume(false)
        .with_retry(RetryPolicy::new(1, Duration::ZERO));
    let client = client(&responder.addr, config);

    client.send("echo", Data::from("abc")).await.unwrap();
    responder.keys.invalidate().await;

    let err = client.send("echo", Data::from("abc")).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(Rejection::Decrypt)));
    assert!(client.cached_key().await.is_none());
}

#[tokio::test]
async fn typed_values_round_trip() {
    let responder = Responder::start().await;
    let client = client(&responder.addr, ClientConfig::default());

    let echoed: Vec<u32> = client.send_value("echo", &vec![1u32, 2, 3]).await.unwrap();
    assert_eq!(echoed, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_client_survives_key_changes_under_load() {
    let responder = Arc::new(Responder::start().await);
    let config = ClientConfig::default().with_retry(RetryPolicy::new(10, Duration::from_millis(1)));
    let client = Arc::new(client(&responder.addr, config));

    let calls: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                for round in 0..4 {
                    let body = format!("task {i} round {round}");
                    let response = client.send("echo", Data::from(body.as_str())).await.unwrap();
                    assert_eq!(response.bytes(), body.as_bytes());
                }
            })
        })
        .collect();

    // Server restarts twice while the calls are in flight
    let restarts = tokio::spawn({
        let responder = Arc::clone(&responder);
        async move {
            for _ in 0..2 {
                tokio::time::sleep(Duration::from_millis(20)).await;
                responder.keys.invalidate().await;
            }
        }
    });

    for call in calls {
        call.await.unwrap();
    }
    restarts.await.unwrap();

    // Whatever key the races left behind, the next call settles on the
    // server's current one
    client.send("echo", Data::from("settle")).await.unwrap();
    assert_eq!(client.cached_key().await, responder.keys.get().await);
}
