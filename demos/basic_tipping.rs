//! A full viewer session against a simulated ClearNode: connect, open a
//! session, send a few tips, check the spending limit, settle.
//!
//! Run with `cargo run --example basic_tipping`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tipstream::config::ClientConfig;
use tipstream::connection::transport::memory::{MemoryConnector, RemotePeer};
use tipstream::session::SessionStatus;
use tipstream::{LocalWallet, Result, SessionOptions, TipstreamClient};

// Anvil's first dev account; for the demo only.
const DEMO_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const STREAMER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

/// Answer the client's envelopes the way a real ClearNode would.
async fn run_fake_clearnode(mut peers: tokio::sync::mpsc::UnboundedReceiver<RemotePeer>) {
    while let Some(mut peer) = peers.recv().await {
        tokio::spawn(async move {
            let mut next_session = 0u64;
            while let Some(frame) = peer.outbound.recv().await {
                let envelope: Value = match serde_json::from_str(&frame) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                match envelope["method"].as_str() {
                    Some("create_app_session") => {
                        next_session += 1;
                        peer.deliver(format!(
                            r#"{{"type":"session_created","sessionId":"cn_{}"}}"#,
                            next_session
                        ));
                    }
                    Some("close_session") => {
                        let session_id = envelope["params"]["sessionId"]
                            .as_str()
                            .unwrap_or_default();
                        peer.deliver(format!(
                            r#"{{"type":"session_closed","sessionId":"{}"}}"#,
                            session_id
                        ));
                    }
                    _ => {}
                }
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (connector, peers) = MemoryConnector::new();
    tokio::spawn(run_fake_clearnode(peers));

    let wallet = LocalWallet::from_private_key(DEMO_PRIVATE_KEY)?;
    let client = TipstreamClient::with_connector(
        ClientConfig::default(),
        Arc::new(wallet),
        connector,
    )?;

    client.events().on_session_created(|event| {
        tracing::info!(
            remote_session_id = event.remote_session_id.as_deref().unwrap_or(""),
            "session confirmed"
        );
    });
    client.events().on_tip_sent(|event| {
        tracing::info!(
            amount = event.amount,
            creator_receives = event.creator_receives,
            remaining = event.remaining_balance,
            "tip delivered"
        );
    });
    client.events().on_error(|event| {
        tracing::warn!(kind = %event.kind, message = %event.message, "client error");
    });

    let viewer = client.connect().await?;
    tracing::info!(%viewer, "connected");

    client
        .create_session(STREAMER, 20.0, SessionOptions::default())
        .await?;

    // Wait for the ClearNode confirmation before tipping.
    loop {
        match client.session_info().await {
            Some(info) if info.status == SessionStatus::Active => break,
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }

    client.send_tip(1.0, STREAMER, "great stream!").await?;
    client.send_tip(2.5, STREAMER, "keep it up").await?;

    let check = client.check_spending_limit(5.0, 10.0).await;
    tracing::info!(
        allowed = check.allowed,
        warning = check.warning,
        percent_used = check.percent_used,
        "spending limit check"
    );

    let summary = client.end_session().await?;
    tracing::info!(
        total_spent = summary.total_spent,
        unused_balance = summary.unused_balance,
        duration_ms = summary.duration_ms,
        "session settled"
    );

    client.disconnect().await;
    Ok(())
}
