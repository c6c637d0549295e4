//! Server-Sent Events support

use super::types::AccountView;
use crate::runtime::AccountEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: &AccountView,
    broadcast_rx: tokio::sync::broadcast::Receiver<AccountEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init_data = json!({ "type": "init", "account": init });
    let init = futures::stream::once(async move {
        Ok(Event::default().event("init").data(init_data.to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(account_event_to_sse(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn account_event_to_sse(event: AccountEvent) -> Event {
    let (event_type, data) = match event {
        AccountEvent::StateChange { account } => (
            "state_change".to_string(),
            json!({
                "type": "state_change",
                "state": account.display_name(),
                "account": account
            }),
        ),
        AccountEvent::ConversionSettled {
            conversion_id,
            settlement,
        } => (
            "conversion_settled".to_string(),
            json!({
                "type": "conversion_settled",
                "conversion_id": conversion_id,
                "settlement": settlement
            }),
        ),
        AccountEvent::Notice { event_type, data } => {
            let payload = json!({ "type": event_type, "data": data });
            (event_type, payload)
        }
    };

    Event::default().event(event_type).data(data.to_string())
}
