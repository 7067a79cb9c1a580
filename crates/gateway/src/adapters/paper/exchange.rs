//! Paper exchange

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use meridian_core::{
    ApprovalRequest, Balance, BookLevel, Candle, ExchangeId, Order, OrderBook, OrderId, OrderSide,
    OrderStatus, OrderType, Params, Position, Price, Quantity, Ticker,
};
use meridian_ports::{AdapterError, AdapterResult, ExchangeAdapter};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

const BOOK_LEVELS: u32 = 5;

/// Adapter calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperCall {
    FetchBalance,
    FetchTickers,
    FetchPositions,
    FetchOpenOrders,
    CreateOrder,
    CancelOrder,
    FetchOrderBook,
    WatchOrderBook,
    FetchOhlcv,
    Approve,
}

#[derive(Default)]
struct PaperState {
    balances: BTreeMap<String, Balance>,
    tickers: BTreeMap<String, Ticker>,
    orders: BTreeMap<OrderId, Order>,
    positions: Vec<Position>,
    faults: HashMap<PaperCall, VecDeque<AdapterError>>,
    calls: HashMap<PaperCall, u64>,
    book_sequence: u64,
    next_exchange_order: u64,
    reject_orders: bool,
}

impl PaperState {
    fn adjust(&mut self, asset: &str, free: Decimal, used: Decimal) {
        let balance = self
            .balances
            .entry(asset.to_string())
            .or_insert_with(|| Balance::new(asset, Decimal::ZERO, Decimal::ZERO));
        balance.free += free;
        balance.used += used;
        balance.total = balance.free + balance.used;
    }

    fn free(&self, asset: &str) -> Decimal {
        self.balances
            .get(asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    fn walk(&mut self, max_bps: u32) {
        let mut rng = rand::thread_rng();
        let bound = i64::from(max_bps);
        for ticker in self.tickers.values_mut() {
            let bps = Decimal::from(rng.gen_range(-bound..=bound));
            let factor = Decimal::ONE + bps / Decimal::from(10_000);
            ticker.bid *= factor;
            ticker.ask *= factor;
            ticker.last = Some(ticker.mid());
            ticker.timestamp = Utc::now();
        }
    }

    fn ticker(&self, symbol: &str) -> AdapterResult<&Ticker> {
        self.tickers
            .get(symbol)
            .ok_or_else(|| AdapterError::BadSymbol(symbol.to_string()))
    }

    fn book(&mut self, symbol: &str, depth: usize) -> AdapterResult<OrderBook> {
        let ticker = self.ticker(symbol)?.clone();
        let tick = (ticker.ask - ticker.bid).max(ticker.mid() / Decimal::from(10_000));
        let levels = (0..BOOK_LEVELS).take(depth);
        let bids = levels
            .clone()
            .map(|i| BookLevel::new(ticker.bid - tick * Decimal::from(i), Decimal::from(i + 1)))
            .collect();
        let asks = levels
            .map(|i| BookLevel::new(ticker.ask + tick * Decimal::from(i), Decimal::from(i + 1)))
            .collect();
        self.book_sequence += 1;
        Ok(OrderBook {
            symbol: ticker.symbol,
            bids,
            asks,
            sequence: self.book_sequence,
            timestamp: Utc::now(),
        })
    }

    /// Reserve funds for an open order, or settle a fill
    fn settle(&mut self, order: &Order, base: &str, quote: &str, price: Price, fill: bool) -> AdapterResult<()> {
        let cost = order.amount * price;
        let (asset, needed) = match order.side {
            OrderSide::Buy => (quote, cost),
            OrderSide::Sell => (base, order.amount),
        };
        if self.free(asset) < needed {
            return Err(AdapterError::OrderRejected(format!(
                "Insufficient {}: need {}, have {}",
                asset,
                needed,
                self.free(asset)
            )));
        }

        if !fill {
            self.adjust(asset, -needed, needed);
            return Ok(());
        }
        match order.side {
            OrderSide::Buy => {
                self.adjust(quote, -cost, Decimal::ZERO);
                self.adjust(base, order.amount, Decimal::ZERO);
            }
            OrderSide::Sell => {
                self.adjust(base, -order.amount, Decimal::ZERO);
                self.adjust(quote, cost, Decimal::ZERO);
            }
        }
        Ok(())
    }
}

/// In-memory exchange that fills marketable orders at the touch
pub struct PaperExchange {
    exchange_id: ExchangeId,
    state: Mutex<PaperState>,
    latency: Duration,
    call_latency: HashMap<PaperCall, Duration>,
    book_interval: Duration,
    walk_bps: Option<u32>,
    closed: AtomicBool,
}

impl PaperExchange {
    pub fn new(exchange_id: impl Into<ExchangeId>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            state: Mutex::new(PaperState::default()),
            latency: Duration::ZERO,
            call_latency: HashMap::new(),
            book_interval: Duration::from_millis(50),
            walk_bps: None,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_balance(mut self, asset: &str, free: Quantity) -> Self {
        self.state.get_mut().adjust(asset, free, Decimal::ZERO);
        self
    }

    pub fn with_ticker(mut self, symbol: &str, bid: Price, ask: Price) -> Self {
        self.state.get_mut().tickers.insert(
            symbol.to_string(),
            Ticker {
                symbol: symbol.to_string(),
                bid,
                ask,
                last: None,
                timestamp: Utc::now(),
            },
        );
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.state.get_mut().positions.push(position);
        self
    }

    /// Delay applied before every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delay for one kind of call, replacing the default latency
    pub fn with_call_latency(mut self, call: PaperCall, latency: Duration) -> Self {
        self.call_latency.insert(call, latency);
        self
    }

    /// Pause between order book stream updates
    pub fn with_book_interval(mut self, interval: Duration) -> Self {
        self.book_interval = interval;
        self
    }

    /// Move every price by up to `max_bps` on each ticker or book read
    pub fn with_random_walk(mut self, max_bps: u32) -> Self {
        self.walk_bps = Some(max_bps);
        self
    }

    /// Make the next `call` fail with `error`. Faults queue up per call.
    pub async fn fail_next(&self, call: PaperCall, error: AdapterError) {
        self.state
            .lock()
            .await
            .faults
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Reject every order while set
    pub async fn reject_orders(&self, reject: bool) {
        self.state.lock().await.reject_orders = reject;
    }

    pub async fn set_ticker(&self, symbol: &str, bid: Price, ask: Price) {
        let mut state = self.state.lock().await;
        let ticker = state
            .tickers
            .entry(symbol.to_string())
            .or_insert_with(|| Ticker {
                symbol: symbol.to_string(),
                bid,
                ask,
                last: None,
                timestamp: Utc::now(),
            });
        ticker.bid = bid;
        ticker.ask = ask;
        ticker.timestamp = Utc::now();
    }

    pub async fn balance(&self, asset: &str) -> Decimal {
        self.state.lock().await.free(asset)
    }

    /// Number of times `call` reached the venue, failed attempts included
    pub async fn call_count(&self, call: PaperCall) -> u64 {
        self.state.lock().await.calls.get(&call).copied().unwrap_or(0)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    /// Latency, closed check and injected faults, in that order
    async fn enter(&self, call: PaperCall) -> AdapterResult<()> {
        let latency = self.call_latency.get(&call).copied().unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(AdapterError::Closed);
        }
        let mut state = self.state.lock().await;
        *state.calls.entry(call).or_insert(0) += 1;
        match state.faults.get_mut(&call).and_then(|q| q.pop_front()) {
            Some(err) => {
                debug!("[PAPER] {} injected fault on {:?}: {}", self.exchange_id, call, err);
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    fn exchange_id(&self) -> &ExchangeId {
        &self.exchange_id
    }

    async fn fetch_balance(&self, _params: &Params) -> AdapterResult<Vec<Balance>> {
        self.enter(PaperCall::FetchBalance).await?;
        Ok(self.state.lock().await.balances.values().cloned().collect())
    }

    async fn fetch_tickers(&self, _params: &Params) -> AdapterResult<Vec<Ticker>> {
        self.enter(PaperCall::FetchTickers).await?;
        let mut state = self.state.lock().await;
        if let Some(max_bps) = self.walk_bps {
            state.walk(max_bps);
        }
        Ok(state.tickers.values().cloned().collect())
    }

    async fn fetch_positions(&self, _params: &Params) -> AdapterResult<Vec<Position>> {
        self.enter(PaperCall::FetchPositions).await?;
        Ok(self.state.lock().await.positions.clone())
    }

    async fn create_order(&self, order: &Order) -> AdapterResult<Order> {
        self.enter(PaperCall::CreateOrder).await?;
        let mut state = self.state.lock().await;

        if !order.validate() {
            return Err(AdapterError::OrderRejected("Invalid order".into()));
        }
        if state.reject_orders {
            return Err(AdapterError::OrderRejected("Rejected by venue".into()));
        }
        let (base, quote) = order
            .assets()
            .ok_or_else(|| AdapterError::BadSymbol(order.symbol.clone()))?;
        let ticker = state.ticker(&order.symbol)?;

        let touch = match order.side {
            OrderSide::Buy => ticker.ask,
            OrderSide::Sell => ticker.bid,
        };
        let (price, marketable) = match (order.order_type, order.price) {
            (OrderType::Limit, Some(limit)) => {
                let crosses = match order.side {
                    OrderSide::Buy => limit >= touch,
                    OrderSide::Sell => limit <= touch,
                };
                (limit, crosses)
            }
            _ => (touch, true),
        };

        state.settle(order, base, quote, price, marketable)?;

        state.next_exchange_order += 1;
        let mut placed = order.clone();
        placed.exchange_order_id = Some(format!("paper-{}", state.next_exchange_order));
        placed.price = Some(price);
        placed.updated_at = Utc::now();
        if marketable {
            placed.filled = placed.amount;
            placed.status = OrderStatus::Filled;
        } else {
            placed.status = OrderStatus::Open;
        }

        debug!(
            "[PAPER] {} {} {} {} @ {} -> {:?}",
            self.exchange_id,
            placed.side.as_str(),
            placed.amount,
            placed.symbol,
            price,
            placed.status
        );
        state.orders.insert(placed.id, placed.clone());
        Ok(placed)
    }

    async fn watch_order_book(&self, symbol: &str) -> AdapterResult<OrderBook> {
        tokio::time::sleep(self.book_interval).await;
        self.enter(PaperCall::WatchOrderBook).await?;
        let mut state = self.state.lock().await;
        if let Some(max_bps) = self.walk_bps {
            state.walk(max_bps);
        }
        state.book(symbol, BOOK_LEVELS as usize)
    }

    async fn close(&self) -> AdapterResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> AdapterResult<Vec<Order>> {
        self.enter(PaperCall::FetchOpenOrders).await?;
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.status.is_active())
            .filter(|o| symbol.is_none_or(|s| o.symbol == s))
            .cloned()
            .collect())
    }

    async fn cancel_order(
        &self,
        order_id: OrderId,
        _exchange_order_id: Option<&str>,
        _symbol: &str,
    ) -> AdapterResult<()> {
        self.enter(PaperCall::CancelOrder).await?;
        let mut state = self.state.lock().await;

        let order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| AdapterError::Exchange(format!("Order {} not found", order_id)))?;
        if !order.status.is_active() {
            return Err(AdapterError::Exchange(format!(
                "Order {} is already {:?}",
                order_id, order.status
            )));
        }

        if let Some((base, quote)) = order.assets() {
            let (asset, reserved) = match order.side {
                OrderSide::Buy => (quote, order.remaining() * order.price.unwrap_or_default()),
                OrderSide::Sell => (base, order.remaining()),
            };
            state.adjust(asset, reserved, -reserved);
        }
        if let Some(stored) = state.orders.get_mut(&order_id) {
            stored.status = OrderStatus::Cancelled;
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn fetch_order_book(&self, symbol: &str, depth: Option<usize>) -> AdapterResult<OrderBook> {
        self.enter(PaperCall::FetchOrderBook).await?;
        self.state
            .lock()
            .await
            .book(symbol, depth.unwrap_or(BOOK_LEVELS as usize))
    }

    async fn fetch_ohlcv(&self, symbol: &str, _timeframe: &str) -> AdapterResult<Vec<Candle>> {
        self.enter(PaperCall::FetchOhlcv).await?;
        let state = self.state.lock().await;
        let ticker = state.ticker(symbol)?;
        Ok(vec![Candle {
            timestamp: ticker.timestamp,
            open: ticker.mid(),
            high: ticker.ask,
            low: ticker.bid,
            close: ticker.mid(),
            volume: Decimal::ZERO,
        }])
    }

    async fn approve(&self, approval: &ApprovalRequest) -> AdapterResult<String> {
        self.enter(PaperCall::Approve).await?;
        debug!(
            "[PAPER] {} approved {} {} for {}",
            self.exchange_id, approval.amount, approval.token, approval.spender
        );
        Ok(format!("0xpaper-approve-{}-{}", approval.venue.ledger_id, approval.token))
    }
}
