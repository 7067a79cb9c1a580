use async_trait::async_trait;
use meridian_core::{
    ApprovalRequest, Balance, Candle, ExchangeId, Order, OrderBook, OrderId, Params, Position,
    Ticker,
};

use crate::error::{AdapterError, AdapterResult};

/// Capability interface implemented once per exchange
///
/// Required methods cover what every venue the agent trades on must offer.
/// The remaining methods default to `NotSupported` so thin adapters only
/// implement what their venue has.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Exchange this adapter talks to
    fn exchange_id(&self) -> &ExchangeId;

    async fn fetch_balance(&self, params: &Params) -> AdapterResult<Vec<Balance>>;

    async fn fetch_tickers(&self, params: &Params) -> AdapterResult<Vec<Ticker>>;

    async fn fetch_positions(&self, params: &Params) -> AdapterResult<Vec<Position>>;

    async fn create_order(&self, order: &Order) -> AdapterResult<Order>;

    /// Wait for the next order book update for `symbol`
    async fn watch_order_book(&self, symbol: &str) -> AdapterResult<OrderBook>;

    /// Release connections and background resources
    async fn close(&self) -> AdapterResult<()>;

    async fn fetch_ticker(&self, symbol: &str) -> AdapterResult<Ticker> {
        let tickers = self.fetch_tickers(&Params::new()).await?;
        tickers
            .into_iter()
            .find(|t| t.symbol == symbol)
            .ok_or_else(|| AdapterError::BadSymbol(symbol.to_string()))
    }

    async fn fetch_open_orders(&self, _symbol: Option<&str>) -> AdapterResult<Vec<Order>> {
        Err(AdapterError::NotSupported("fetch_open_orders".into()))
    }

    async fn cancel_order(
        &self,
        _order_id: OrderId,
        _exchange_order_id: Option<&str>,
        _symbol: &str,
    ) -> AdapterResult<()> {
        Err(AdapterError::NotSupported("cancel_order".into()))
    }

    async fn fetch_order_book(&self, _symbol: &str, _depth: Option<usize>) -> AdapterResult<OrderBook> {
        Err(AdapterError::NotSupported("fetch_order_book".into()))
    }

    async fn fetch_ohlcv(&self, _symbol: &str, _timeframe: &str) -> AdapterResult<Vec<Candle>> {
        Err(AdapterError::NotSupported("fetch_ohlcv".into()))
    }

    /// Approve a token allowance; returns the transaction hash
    async fn approve(&self, _approval: &ApprovalRequest) -> AdapterResult<String> {
        Err(AdapterError::NotSupported("approve".into()))
    }
}
