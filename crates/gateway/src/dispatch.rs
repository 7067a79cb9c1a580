//! Operation dispatch table
//!
//! Maps each one-shot [`OperationTag`] to the handler that runs the matching
//! adapter call. The table is built once at startup and validated against the
//! operations the caller requires, so an unsupported tag fails at
//! construction instead of on the first request.

use crate::error::{CallError, GatewayError};
use crate::registry::AdapterRegistry;
use futures::future::BoxFuture;
use meridian_core::{Operation, OperationTag, ResponseKind};
use meridian_ports::AdapterError;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type CallResult = Result<ResponseKind, CallError>;

/// Handler for one operation tag
pub(crate) type Handler = fn(Arc<AdapterRegistry>, Operation) -> BoxFuture<'static, CallResult>;

/// Enum-keyed handler table
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<OperationTag, Handler>,
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with a handler for every one-shot operation
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(OperationTag::GetAllBalances, get_all_balances);
        table.register(OperationTag::GetBalance, get_balance);
        table.register(OperationTag::GetAllTickers, get_all_tickers);
        table.register(OperationTag::GetTicker, get_ticker);
        table.register(OperationTag::GetAllPositions, get_all_positions);
        table.register(OperationTag::GetPosition, get_position);
        table.register(OperationTag::GetOrders, get_orders);
        table.register(OperationTag::CreateOrder, create_order);
        table.register(OperationTag::CancelOrder, cancel_order);
        table.register(OperationTag::GetOrderBook, get_order_book);
        table.register(OperationTag::SetApproval, set_approval);
        table.register(OperationTag::RequestBridge, request_bridge);
        table.register(OperationTag::GetBridgeStatus, get_bridge_status);
        table
    }

    pub(crate) fn register(&mut self, tag: OperationTag, handler: Handler) {
        self.handlers.insert(tag, handler);
    }

    pub fn remove(&mut self, tag: OperationTag) {
        self.handlers.remove(&tag);
    }

    pub(crate) fn get(&self, tag: OperationTag) -> Option<Handler> {
        self.handlers.get(&tag).copied()
    }

    pub fn supports(&self, tag: OperationTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    /// Fail fast if any required tag has no handler
    pub fn validate(&self, required: &[OperationTag]) -> Result<(), GatewayError> {
        match required.iter().find(|tag| !self.supports(**tag)) {
            Some(tag) => Err(GatewayError::UnsupportedOperation(*tag)),
            None => Ok(()),
        }
    }
}

fn get_all_balances(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetAllBalances { venue, params } = op else {
            return Err(CallError::Mismatch(OperationTag::GetAllBalances));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let balances = adapter.fetch_balance(&params).await?;
        Ok(ResponseKind::AllBalances { venue, balances })
    })
}

fn get_balance(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetBalance { venue, asset_id } = op else {
            return Err(CallError::Mismatch(OperationTag::GetBalance));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let balances = adapter.fetch_balance(&Default::default()).await?;
        let balance = balances
            .into_iter()
            .find(|b| b.asset_id == asset_id)
            .ok_or(CallError::UnknownAsset(asset_id))?;
        Ok(ResponseKind::Balance { venue, balance })
    })
}

fn get_all_tickers(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetAllTickers { venue, params } = op else {
            return Err(CallError::Mismatch(OperationTag::GetAllTickers));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let tickers = adapter.fetch_tickers(&params).await?;
        Ok(ResponseKind::AllTickers { venue, tickers })
    })
}

fn get_ticker(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetTicker { venue, symbol } = op else {
            return Err(CallError::Mismatch(OperationTag::GetTicker));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let ticker = adapter.fetch_ticker(&symbol).await?;
        Ok(ResponseKind::Ticker { venue, ticker })
    })
}

fn get_all_positions(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetAllPositions { venue, params } = op else {
            return Err(CallError::Mismatch(OperationTag::GetAllPositions));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let positions = adapter.fetch_positions(&params).await?;
        Ok(ResponseKind::AllPositions { venue, positions })
    })
}

fn get_position(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetPosition { venue, symbol } = op else {
            return Err(CallError::Mismatch(OperationTag::GetPosition));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let positions = adapter.fetch_positions(&Default::default()).await?;
        let position = positions
            .into_iter()
            .find(|p| p.symbol == symbol)
            .ok_or(AdapterError::UnknownPosition(symbol))?;
        Ok(ResponseKind::Position { venue, position })
    })
}

fn get_orders(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetOrders { venue, symbol } = op else {
            return Err(CallError::Mismatch(OperationTag::GetOrders));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let orders = adapter.fetch_open_orders(symbol.as_deref()).await?;
        Ok(ResponseKind::Orders { venue, orders })
    })
}

fn create_order(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::CreateOrder { order } = op else {
            return Err(CallError::Mismatch(OperationTag::CreateOrder));
        };
        let adapter = registry.exchange(&order.venue.exchange_id)?;
        let placed = adapter.create_order(&order).await?;
        Ok(ResponseKind::Order { order: placed })
    })
}

fn cancel_order(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::CancelOrder {
            venue,
            order_id,
            exchange_order_id,
            symbol,
        } = op
        else {
            return Err(CallError::Mismatch(OperationTag::CancelOrder));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        adapter
            .cancel_order(order_id, exchange_order_id.as_deref(), &symbol)
            .await?;
        Ok(ResponseKind::OrderCancelled { venue, order_id })
    })
}

fn get_order_book(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetOrderBook {
            venue,
            symbol,
            depth,
        } = op
        else {
            return Err(CallError::Mismatch(OperationTag::GetOrderBook));
        };
        let adapter = registry.exchange(&venue.exchange_id)?;
        let mut book = adapter.fetch_order_book(&symbol, depth).await?;
        if let Some(depth) = depth {
            book.truncate(depth);
        }
        Ok(ResponseKind::OrderBook { venue, book })
    })
}

fn set_approval(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::SetApproval { approval } = op else {
            return Err(CallError::Mismatch(OperationTag::SetApproval));
        };
        let adapter = registry.exchange(&approval.venue.exchange_id)?;
        let tx_hash = adapter.approve(&approval).await?;
        Ok(ResponseKind::ApprovalSet { approval, tx_hash })
    })
}

fn request_bridge(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::RequestBridge {
            bridge_request_id,
            params,
        } = op
        else {
            return Err(CallError::Mismatch(OperationTag::RequestBridge));
        };
        let bridge = registry.bridge()?;
        let status = bridge.bridge(bridge_request_id, &params).await?;
        Ok(ResponseKind::BridgeStatus {
            bridge_request_id,
            status,
        })
    })
}

fn get_bridge_status(registry: Arc<AdapterRegistry>, op: Operation) -> BoxFuture<'static, CallResult> {
    Box::pin(async move {
        let Operation::GetBridgeStatus { bridge_request_id } = op else {
            return Err(CallError::Mismatch(OperationTag::GetBridgeStatus));
        };
        let bridge = registry.bridge()?;
        let status = bridge.status(bridge_request_id).await?;
        Ok(ResponseKind::BridgeStatus {
            bridge_request_id,
            status,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_covers_one_shot_operations() {
        let table = DispatchTable::standard();
        for tag in OperationTag::ALL {
            assert_eq!(table.supports(tag), !tag.is_streaming(), "{}", tag);
        }
    }

    #[test]
    fn test_validate_fails_fast_on_missing_handler() {
        let mut table = DispatchTable::standard();
        table.remove(OperationTag::CreateOrder);

        let err = table
            .validate(&[OperationTag::GetAllBalances, OperationTag::CreateOrder])
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UnsupportedOperation(OperationTag::CreateOrder)
        ));
        assert!(table.validate(&[OperationTag::GetAllBalances]).is_ok());
    }

    #[test]
    fn test_registered_handler_is_dispatched() {
        let mut table = DispatchTable::empty();
        assert!(table.get(OperationTag::GetOrders).is_none());

        table.register(OperationTag::GetOrders, get_orders);
        assert!(table.get(OperationTag::GetOrders).is_some());
        assert!(table.get(OperationTag::CreateOrder).is_none());
        assert!(table.validate(&[OperationTag::GetOrders]).is_ok());
    }
}
