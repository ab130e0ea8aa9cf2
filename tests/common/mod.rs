//! Shared utilities for integration testing: a scripted wallet, an
//! in-memory ClearNode endpoint, and event capture helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tipstream::config::ClientConfig;
use tipstream::connection::transport::memory::{MemoryConnector, RemotePeer};
use tipstream::error::ClientError;
use tipstream::events::ErrorEvent;
use tipstream::session::{SessionOptions, SessionStatus};
use tipstream::{MessageSigner, Result, TipstreamClient};

/// Config with a reconnect schedule fast enough for tests.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.reconnect.base_delay_ms = 1;
    config.reconnect.max_delay_ms = 8;
    config
}

/// Deterministic signer that records every message it signs.
pub struct TestWallet {
    address: String,
    pub signed: Mutex<Vec<String>>,
}

impl TestWallet {
    pub fn new(address: &str) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            signed: Mutex::new(Vec::new()),
        })
    }

    /// The signature this wallet produces for a given message.
    pub fn signature_for(message: &str) -> String {
        format!("0xtest{:016x}", fnv1a(message))
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl MessageSigner for TestWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign(&self, message: &str) -> Result<String> {
        self.signed.lock().unwrap().push(message.to_string());
        Ok(Self::signature_for(message))
    }
}

/// Signer that refuses everything, like a user dismissing the prompt.
#[allow(dead_code)]
pub struct RejectingWallet;

#[async_trait]
impl MessageSigner for RejectingWallet {
    fn address(&self) -> String {
        "0xviewer".into()
    }

    async fn sign(&self, _message: &str) -> Result<String> {
        Err(ClientError::Signing("user rejected signature".into()))
    }
}

/// Capture every error event the client fires.
pub fn capture_errors(client: &TipstreamClient) -> Arc<Mutex<Vec<ErrorEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    client
        .events()
        .on_error(move |event| sink.lock().unwrap().push(event.clone()));
    log
}

/// Build a client over the in-memory transport and connect it.
///
/// Returns the client, the ClearNode half of the live connection, the
/// connector (for scripting dial failures), the wallet, and the receiver on
/// which replacement peers arrive after reconnects.
pub async fn connected_client() -> (
    TipstreamClient,
    RemotePeer,
    Arc<MemoryConnector>,
    Arc<TestWallet>,
    mpsc::UnboundedReceiver<RemotePeer>,
) {
    let (connector, mut peers) = MemoryConnector::new();
    let wallet = TestWallet::new("0xviewer");
    let client =
        TipstreamClient::with_connector(test_config(), wallet.clone(), connector.clone()).unwrap();
    client.connect().await.unwrap();
    let peer = peers.recv().await.unwrap();
    (client, peer, connector, wallet, peers)
}

/// Create a session, drain the outbound open envelope, and deliver the
/// ClearNode confirmation.
#[allow(dead_code)]
pub async fn open_session(
    client: &TipstreamClient,
    peer: &mut RemotePeer,
    streamer: &str,
    deposit: f64,
    options: SessionOptions,
) {
    client
        .create_session(streamer, deposit, options)
        .await
        .unwrap();
    let _open_envelope = peer.outbound.recv().await.unwrap();
    peer.deliver(r#"{"type":"session_created","sessionId":"cn_1"}"#);
    wait_active(client).await;
}

/// Poll until the active session is confirmed.
#[allow(dead_code)]
pub async fn wait_active(client: &TipstreamClient) {
    for _ in 0..500 {
        if let Some(info) = client.session_info().await {
            if info.status == SessionStatus::Active {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("session never became active");
}
