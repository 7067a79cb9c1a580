mod approval;
mod balance;
mod bridge;
mod order;
mod order_book;
mod order_status;
mod order_type;
mod position;
mod side;
mod ticker;

pub use approval::ApprovalRequest;
pub use balance::{Balance, free_balance};
pub use bridge::{BridgeParams, BridgeRequestId, BridgeStatus, BridgeStatusCode};
pub use order::{Order, OrderId};
pub use order_book::{BookLevel, Candle, OrderBook};
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use position::{Position, PositionSide};
pub use side::OrderSide;
pub use ticker::Ticker;
