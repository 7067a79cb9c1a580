//! Streaming subscriptions
//!
//! A subscription loops on the adapter's streaming call and forwards every
//! update as a response envelope. Transient errors are logged and retried
//! after `stream_retry_delay`; any other error is reported once and ends the
//! subscription.

use crate::error::CallError;
use crate::manager::Shared;
use log::{debug, warn};
use meridian_core::{Operation, RequestEnvelope, Response, ResponseKind};
use meridian_ports::{AdapterError, ExchangeAdapter};
use std::sync::Arc;
use std::time::Duration;

pub(crate) async fn run(shared: Arc<Shared>, envelope: RequestEnvelope) {
    let request = &envelope.payload;
    let Some(exchange_id) = request.operation.exchange_id().cloned() else {
        return;
    };
    let adapter = match shared.registry.exchange(&exchange_id) {
        Ok(adapter) => adapter,
        Err(err) => {
            let response = Response::new(request.id, err.into_kind(Some(exchange_id)));
            shared.deliver(envelope.reply(response));
            return;
        }
    };

    let mut last_sequence: Option<u64> = None;
    loop {
        match next_update(adapter.as_ref(), &request.operation, &mut last_sequence).await {
            Ok(Some(kind)) => {
                shared.deliver(envelope.reply(Response::new(request.id, kind)));
                if let Operation::PollCandles { interval_ms, .. } = &request.operation {
                    tokio::time::sleep(Duration::from_millis(*interval_ms)).await;
                }
            }
            Ok(None) => {}
            Err(err) if err.is_transient() => {
                warn!(
                    "[GATEWAY] Transient error on {} stream for {}: {}",
                    request.tag(),
                    exchange_id,
                    err
                );
                tokio::time::sleep(shared.config.stream_retry_delay).await;
            }
            Err(err) => {
                warn!(
                    "[GATEWAY] {} stream for {} stopped: {}",
                    request.tag(),
                    exchange_id,
                    err
                );
                let kind = CallError::from(err).into_kind(Some(exchange_id));
                shared.deliver(envelope.reply(Response::new(request.id, kind)));
                return;
            }
        }
    }
}

/// One streaming step. `Ok(None)` means the update was dropped.
async fn next_update(
    adapter: &dyn ExchangeAdapter,
    operation: &Operation,
    last_sequence: &mut Option<u64>,
) -> Result<Option<ResponseKind>, AdapterError> {
    match operation {
        Operation::WatchOrderBook { venue, symbol } => {
            let book = adapter.watch_order_book(symbol).await?;
            if last_sequence.is_some_and(|last| book.sequence <= last) {
                debug!(
                    "[GATEWAY] Dropping stale book for {} (seq {})",
                    symbol, book.sequence
                );
                return Ok(None);
            }
            *last_sequence = Some(book.sequence);
            Ok(Some(ResponseKind::OrderBook {
                venue: venue.clone(),
                book,
            }))
        }
        Operation::PollCandles {
            venue,
            symbol,
            timeframe,
            ..
        } => {
            let candles = adapter.fetch_ohlcv(symbol, timeframe).await?;
            Ok(Some(ResponseKind::Candles {
                venue: venue.clone(),
                symbol: symbol.clone(),
                candles,
            }))
        }
        other => Err(AdapterError::NotSupported(other.tag().to_string())),
    }
}
