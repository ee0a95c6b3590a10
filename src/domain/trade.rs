//! Orders, trades and the trading record.
//!
//! A [`Trade`] only exists once both legs are filled. The
//! [`TradingRecord`] holds closed trades plus at most one open entry.

use crate::domain::execution::CostModel;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub side: Side,
    pub index: usize,
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    entry: Order,
    exit: Order,
    cost: Option<Decimal>,
}

impl Trade {
    pub fn entry(&self) -> &Order {
        &self.entry
    }

    pub fn exit(&self) -> &Order {
        &self.exit
    }

    /// Transaction cost charged when the trade closed; `None` when it
    /// overflowed.
    pub fn cost(&self) -> Option<Decimal> {
        self.cost
    }

    /// (exit - entry) * amount, before costs.
    pub fn gross_profit(&self) -> Option<Decimal> {
        self.exit
            .price
            .checked_sub(self.entry.price)?
            .checked_mul(self.entry.amount)
    }

    pub fn net_profit(&self) -> Option<Decimal> {
        self.gross_profit()?.checked_sub(self.cost?)
    }

    /// exit / entry; `None` for a zero entry price.
    pub fn gross_return(&self) -> Option<Decimal> {
        self.exit.price.checked_div(self.entry.price)
    }

    pub fn is_profitable(&self) -> bool {
        self.net_profit().is_some_and(|p| p > Decimal::ZERO)
    }

    /// Bars from entry to exit, both included.
    pub fn bars_held(&self) -> usize {
        self.exit.index - self.entry.index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradingRecord {
    trades: Vec<Trade>,
    open: Option<Order>,
}

impl TradingRecord {
    pub fn new() -> Self {
        TradingRecord::default()
    }

    /// Open a long position. Returns `false` when one is already open.
    pub fn enter(&mut self, index: usize, price: Decimal, amount: Decimal) -> bool {
        if self.open.is_some() {
            return false;
        }
        self.open = Some(Order {
            side: Side::Buy,
            index,
            price,
            amount,
        });
        true
    }

    /// Close the open position. Returns `None` when flat or when `index`
    /// does not come after the entry.
    pub fn exit(&mut self, index: usize, price: Decimal, costs: &CostModel) -> Option<&Trade> {
        let entry = self.open?;
        if index <= entry.index {
            return None;
        }
        self.open = None;
        let exit = Order {
            side: Side::Sell,
            index,
            price,
            amount: entry.amount,
        };
        let cost = costs.cost(entry.price, exit.price, entry.amount);
        self.trades.push(Trade { entry, exit, cost });
        self.trades.last()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_entry(&self) -> Option<&Order> {
        self.open.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}
