//! End-to-end session flows against an in-memory ClearNode.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tipstream::connection::transport::memory::MemoryConnector;
use tipstream::error::ClientError;
use tipstream::events::ErrorKind;
use tipstream::{SessionOptions, TipRequest, TipstreamClient};

use common::{capture_errors, connected_client, open_session, test_config, RejectingWallet, TestWallet};

const STREAMER: &str = "0xstreamer";

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_standard_session_tip_math() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;

    let sent = Arc::new(Mutex::new(Vec::new()));
    let sink = sent.clone();
    client
        .events()
        .on_tip_sent(move |event| sink.lock().unwrap().push(event.clone()));

    let receipt = client.send_tip(1.0, STREAMER, "nice stream").await.unwrap();
    assert!(approx(receipt.commission, 0.10));
    assert!(approx(receipt.creator_receives, 0.90));
    assert!(approx(receipt.remaining_balance, 19.0));
    assert!(approx(receipt.total_spent, 1.0));

    let info = client.session_info().await.unwrap();
    assert_eq!(info.commission_rate, 10);
    assert!(approx(info.current_balance, 19.0));
    assert!(approx(info.spent, 1.0));

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount_units, 1_000_000);
    assert_eq!(sent[0].recipient, STREAMER);
    assert_eq!(sent[0].message, "nice stream");
}

#[tokio::test]
async fn test_partner_session_uses_partner_rate() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    let options = SessionOptions {
        is_partner: true,
        ..Default::default()
    };
    open_session(&client, &mut peer, STREAMER, 20.0, options).await;

    assert_eq!(client.session_info().await.unwrap().commission_rate, 3);

    let receipt = client.send_tip(1.0, STREAMER, "").await.unwrap();
    assert!(approx(receipt.commission, 0.03));
    assert!(approx(receipt.creator_receives, 0.97));
}

#[tokio::test]
async fn test_insufficient_balance_leaves_ledger_untouched() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;
    let errors = capture_errors(&client);

    let err = client.send_tip(25.0, STREAMER, "").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::InsufficientBalance { requested, available }
            if approx(requested, 25.0) && approx(available, 20.0)
    ));

    let info = client.session_info().await.unwrap();
    assert!(approx(info.current_balance, 20.0));
    assert!(approx(info.spent, 0.0));

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Tip);
}

#[tokio::test]
async fn test_tip_precondition_failures_are_distinct() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;

    // No session at all.
    let err = client.send_tip(1.0, STREAMER, "").await.unwrap_err();
    assert!(matches!(err, ClientError::NoActiveSession));

    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;

    let err = client.send_tip(1.0, "0xsomeone_else", "").await.unwrap_err();
    assert!(matches!(err, ClientError::WrongCounterparty { .. }));

    let err = client.send_tip(0.0, STREAMER, "").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidAmount(_)));

    // None of the failures touched the ledger.
    let info = client.session_info().await.unwrap();
    assert!(approx(info.spent, 0.0));
}

#[tokio::test]
async fn test_create_session_precondition_failures() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;

    let err = client
        .create_session("", 20.0, SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = client
        .create_session(STREAMER, 0.0, SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;

    // Exactly one session may be pending or active.
    let err = client
        .create_session("0xanother", 10.0, SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidState(_)));
}

#[tokio::test]
async fn test_create_session_requires_connection() {
    let (connector, _peers) = MemoryConnector::new();
    let wallet = TestWallet::new("0xviewer");
    let client =
        TipstreamClient::with_connector(test_config(), wallet, connector).unwrap();

    let err = client
        .create_session(STREAMER, 20.0, SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidState(_)));
}

#[tokio::test]
async fn test_spending_limit_warning_at_ninety_percent() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 50.0, SessionOptions::default()).await;
    client.send_tip(20.0, STREAMER, "").await.unwrap();

    let check = client.check_spending_limit(25.0, 50.0).await;
    assert!(check.allowed);
    assert!(check.warning);
    assert!(approx(check.would_be, 45.0));
    assert!(approx(check.percent_used, 90.0));

    let check = client.check_spending_limit(35.0, 50.0).await;
    assert!(!check.allowed);
    assert_eq!(check.reason.as_deref(), Some("Spending limit exceeded"));

    // The advisory limit never blocked the channel-balance gate.
    assert!(client.send_tip(25.0, STREAMER, "").await.is_ok());
}

#[tokio::test]
async fn test_spending_limit_without_session_denies() {
    let (client, _peer, _connector, _wallet, _peers) = connected_client().await;
    let check = client.check_spending_limit(5.0, 50.0).await;
    assert!(!check.allowed);
    assert_eq!(check.reason.as_deref(), Some("No active session"));
}

#[tokio::test]
async fn test_end_session_settles_and_detaches() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 50.0, SessionOptions::default()).await;
    client.send_tip(5.0, STREAMER, "").await.unwrap();
    client.send_tip(3.5, STREAMER, "").await.unwrap();

    let closed = Arc::new(Mutex::new(Vec::new()));
    let sink = closed.clone();
    client
        .events()
        .on_session_closed(move |event| sink.lock().unwrap().push(event.clone()));

    let summary = client.end_session().await.unwrap();
    assert!(approx(summary.total_deposited, 50.0));
    assert!(approx(summary.total_spent, 8.5));
    assert!(approx(summary.unused_balance, 41.5));
    assert_eq!(summary.commission_rate, 10);

    assert!(client.session_info().await.is_none());
    assert_eq!(closed.lock().unwrap().len(), 1);

    let err = client.end_session().await.unwrap_err();
    assert!(matches!(err, ClientError::NoActiveSession));
}

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;

    let tips = vec![
        TipRequest {
            amount: 1.0,
            streamer_address: STREAMER.into(),
            message: Some("one".into()),
        },
        TipRequest {
            amount: 5.0,
            streamer_address: "0xwrong_streamer".into(),
            message: None,
        },
        TipRequest {
            amount: 2.0,
            streamer_address: STREAMER.into(),
            message: None,
        },
    ];
    let outcome = client.send_tip_batch(&tips).await;

    assert_eq!(outcome.total_tips, 3);
    assert_eq!(outcome.successful_tips, 2);
    // Attempted dollars, failed item included.
    assert!(approx(outcome.total_amount, 8.0));
    assert!(outcome.results[0].is_ok());
    assert!(outcome.results[1].is_err());
    assert!(outcome.results[2].is_ok());

    let info = client.session_info().await.unwrap();
    assert!(approx(info.spent, 3.0));
}

#[tokio::test]
async fn test_session_created_promotes_and_attaches_remote_id() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;

    let created = Arc::new(Mutex::new(Vec::new()));
    let sink = created.clone();
    client
        .events()
        .on_session_created(move |event| sink.lock().unwrap().push(event.clone()));

    client
        .create_session(STREAMER, 20.0, SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(
        client.session_info().await.unwrap().status.to_string(),
        "pending"
    );

    let _open_envelope = peer.outbound.recv().await.unwrap();
    peer.deliver(r#"{"type":"session_created","sessionId":"cn_77"}"#);
    common::wait_active(&client).await;

    let info = client.session_info().await.unwrap();
    assert_eq!(info.remote_session_id.as_deref(), Some("cn_77"));

    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].remote_session_id.as_deref(), Some("cn_77"));
}

#[tokio::test]
async fn test_balance_update_overwrites_optimistic_ledger() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;
    client.send_tip(1.0, STREAMER, "").await.unwrap();

    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();
    client
        .events()
        .on_balance_update(move |event| sink.lock().unwrap().push(*event));

    // Authoritative value disagrees with the optimistic 19.0.
    peer.deliver(r#"{"type":"balance_update","balance":"15500000"}"#);

    for _ in 0..500 {
        if approx(
            client.session_info().await.unwrap().current_balance,
            15.5,
        ) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(approx(
        client.session_info().await.unwrap().current_balance,
        15.5
    ));
    assert_eq!(updates.lock().unwrap().len(), 1);
    assert!(approx(updates.lock().unwrap()[0].balance, 15.5));
}

#[tokio::test]
async fn test_incoming_tip_fires_event_without_touching_ledger() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    client
        .events()
        .on_tip_received(move |event| sink.lock().unwrap().push(event.clone()));

    peer.deliver(
        r#"{"type":"tip","amount":"1000000","commission":"100000","sender":"0xfan","message":"hi"}"#,
    );

    for _ in 0..500 {
        if !received.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert!(approx(received[0].amount, 1.0));
    assert!(approx(received[0].commission, 0.10));
    assert!(approx(received[0].creator_receives, 0.90));
    assert_eq!(received[0].sender.as_deref(), Some("0xfan"));

    // The viewer-side session ledger is not the payee ledger.
    assert!(approx(
        client.session_info().await.unwrap().current_balance,
        20.0
    ));
}

#[tokio::test]
async fn test_clearnode_error_is_non_fatal() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;
    let errors = capture_errors(&client);

    peer.deliver(r#"{"type":"error","error":"quorum not reached"}"#);

    for _ in 0..500 {
        if !errors.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    {
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Clearnode);
        assert!(errors[0].message.contains("quorum not reached"));
    }

    // Session state is untouched and the client keeps working.
    assert!(client.send_tip(1.0, STREAMER, "").await.is_ok());
}

#[tokio::test]
async fn test_unknown_and_malformed_frames_are_ignored() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;
    let errors = capture_errors(&client);

    peer.deliver(r#"{"type":"protocol_upgrade_notice","version":2}"#);
    peer.deliver("this is not even json");
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(errors.lock().unwrap().is_empty());
    assert!(client.send_tip(1.0, STREAMER, "").await.is_ok());
}

#[tokio::test]
async fn test_session_open_envelope_shape() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    client
        .create_session(STREAMER, 20.0, SessionOptions::default())
        .await
        .unwrap();

    let frame = peer.outbound.recv().await.unwrap();
    let envelope: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(envelope["jsonrpc"], "2.0");
    assert_eq!(envelope["method"], "create_app_session");
    assert!(envelope["id"].is_u64());
    assert_eq!(envelope["params"]["sender"], "0xviewer");

    // params.message is itself JSON, signed as a unit.
    let message_text = envelope["params"]["message"].as_str().unwrap();
    let message: Value = serde_json::from_str(message_text).unwrap();
    assert_eq!(message["type"], "create_session");
    assert!(message["timestamp"].is_u64());

    let session = &message["sessions"][0];
    assert_eq!(session["definition"]["participants"][0], "0xviewer");
    assert_eq!(session["definition"]["participants"][1], STREAMER);
    assert_eq!(session["definition"]["weights"][0], 50);
    assert_eq!(session["definition"]["quorum"], 100);
    assert_eq!(session["allocations"][0]["amount"], "20000000");
    assert_eq!(session["allocations"][1]["amount"], "0");

    assert_eq!(
        envelope["params"]["signature"].as_str().unwrap(),
        TestWallet::signature_for(message_text)
    );
}

#[tokio::test]
async fn test_tip_signature_covers_canonical_unsigned_payload() {
    let (client, mut peer, _connector, wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;
    client.send_tip(1.0, STREAMER, "gg").await.unwrap();

    let frame = peer.outbound.recv().await.unwrap();
    let envelope: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(envelope["method"], "send_state_update");
    assert_eq!(envelope["params"]["type"], "tip");
    assert_eq!(envelope["params"]["amount"], "1000000");
    assert_eq!(envelope["params"]["commission"], "100000");
    assert_eq!(envelope["params"]["creatorReceives"], "900000");
    assert_eq!(envelope["params"]["recipient"], STREAMER);

    // The wallet signed the payload without the signature field, and the
    // attached signature is over exactly that string.
    let signed_message = wallet.signed.lock().unwrap().last().unwrap().clone();
    let unsigned: Value = serde_json::from_str(&signed_message).unwrap();
    assert!(unsigned.get("signature").is_none());
    assert_eq!(unsigned["amount"], "1000000");
    assert_eq!(
        envelope["params"]["signature"].as_str().unwrap(),
        TestWallet::signature_for(&signed_message)
    );
}

#[tokio::test]
async fn test_close_envelope_shape() {
    let (client, mut peer, _connector, _wallet, _peers) = connected_client().await;
    open_session(&client, &mut peer, STREAMER, 20.0, SessionOptions::default()).await;
    let ticket_id = client.session_info().await.unwrap().session_id;
    client.end_session().await.unwrap();

    let frame = peer.outbound.recv().await.unwrap();
    let envelope: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(envelope["method"], "close_session");
    assert_eq!(envelope["params"]["sessionId"].as_str().unwrap(), ticket_id);
    assert!(envelope["params"]["timestamp"].is_u64());
    assert_eq!(envelope["params"]["sender"], "0xviewer");
    assert!(envelope["params"]["signature"].is_string());
}

#[tokio::test]
async fn test_two_clients_keep_independent_sessions() {
    let (client_a, mut peer_a, _conn_a, _wallet_a, _peers_a) = connected_client().await;
    let (client_b, mut peer_b, _conn_b, _wallet_b, _peers_b) = connected_client().await;

    open_session(&client_a, &mut peer_a, "0xstreamer_a", 20.0, SessionOptions::default()).await;
    open_session(&client_b, &mut peer_b, "0xstreamer_b", 50.0, SessionOptions::default()).await;

    client_a.send_tip(5.0, "0xstreamer_a", "").await.unwrap();

    let info_a = client_a.session_info().await.unwrap();
    let info_b = client_b.session_info().await.unwrap();
    assert!(approx(info_a.current_balance, 15.0));
    assert!(approx(info_b.current_balance, 50.0));
    assert_ne!(info_a.session_id, info_b.session_id);
}

#[tokio::test]
async fn test_rejected_signature_fails_session_creation() {
    let (connector, mut peers) = MemoryConnector::new();
    let client = TipstreamClient::with_connector(
        test_config(),
        Arc::new(RejectingWallet),
        connector,
    )
    .unwrap();
    client.connect().await.unwrap();
    let _peer = peers.recv().await.unwrap();
    let errors = capture_errors(&client);

    let err = client
        .create_session(STREAMER, 20.0, SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Signing(_)));
    assert!(client.session_info().await.is_none());

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Signing);
}
