//! Client metric counters.
//!
//! # Metrics
//! - `tipstream_connections_total` (counter): successful connects
//! - `tipstream_reconnect_attempts_total` (counter): scheduled reconnects
//! - `tipstream_sessions_opened_total` (counter): sessions transmitted
//! - `tipstream_sessions_closed_total` (counter): sessions settled locally
//! - `tipstream_tips_sent_total` (counter): tips transmitted
//! - `tipstream_inbound_messages_total` (counter, by `type`): frames handled

pub fn record_connected() {
    metrics::counter!("tipstream_connections_total").increment(1);
}

pub fn record_reconnect_attempt() {
    metrics::counter!("tipstream_reconnect_attempts_total").increment(1);
}

pub fn record_session_opened() {
    metrics::counter!("tipstream_sessions_opened_total").increment(1);
}

pub fn record_session_closed() {
    metrics::counter!("tipstream_sessions_closed_total").increment(1);
}

pub fn record_tip_sent() {
    metrics::counter!("tipstream_tips_sent_total").increment(1);
}

pub fn record_inbound_message(kind: &'static str) {
    metrics::counter!("tipstream_inbound_messages_total", "type" => kind).increment(1);
}
