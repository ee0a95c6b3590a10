//! Rule evaluation engine.
//!
//! Evaluates rules against any source of indicator values at one bar index.
//!
//! # Evaluation Semantics
//!
//! - Comparisons involving an undefined value are `false`
//! - `CrossedUp`/`CrossedDown`: Require `index >= 1`, return `false` at index 0
//! - `And`: Short-circuits on first `false`
//! - `Or`: Short-circuits on first `true`
//! - `StopLoss`/`StopGain`: Read the open entry of the trading record;
//!   `false` when flat

use crate::domain::indicator::{BooleanSeries, Num, NumericId, NumericSeries};
use crate::domain::rule::Rule;
use crate::domain::trade::TradingRecord;
use rust_decimal::Decimal;
use std::cmp::Ordering;

pub fn evaluate<S>(rule: &Rule, source: &S, index: usize, record: &TradingRecord) -> bool
where
    S: NumericSeries + BooleanSeries + ?Sized,
{
    match rule {
        Rule::Over { left, right } => {
            compare(source, *left, *right, index) == Some(Ordering::Greater)
        }
        Rule::Under { left, right } => compare(source, *left, *right, index) == Some(Ordering::Less),
        Rule::CrossedUp { left, right } => {
            if index == 0 {
                return false;
            }
            let curr = compare(source, *left, *right, index);
            let prev = compare(source, *left, *right, index - 1);
            curr == Some(Ordering::Greater) && matches!(prev, Some(Ordering::Less | Ordering::Equal))
        }
        Rule::CrossedDown { left, right } => {
            if index == 0 {
                return false;
            }
            let curr = compare(source, *left, *right, index);
            let prev = compare(source, *left, *right, index - 1);
            curr == Some(Ordering::Less)
                && matches!(prev, Some(Ordering::Greater | Ordering::Equal))
        }
        Rule::Boolean(id) => source.boolean(*id, index),
        Rule::And(a, b) => {
            evaluate(a, source, index, record) && evaluate(b, source, index, record)
        }
        Rule::Or(a, b) => evaluate(a, source, index, record) || evaluate(b, source, index, record),
        Rule::Not(r) => !evaluate(r, source, index, record),
        Rule::StopLoss { price, pct } => {
            change_pct(source.numeric(*price, index), record)
                .is_some_and(|change| -change >= *pct)
        }
        Rule::StopGain { price, pct } => {
            change_pct(source.numeric(*price, index), record).is_some_and(|change| change >= *pct)
        }
    }
}

fn compare<S>(source: &S, left: NumericId, right: NumericId, index: usize) -> Option<Ordering>
where
    S: NumericSeries + ?Sized,
{
    let l = source.numeric(left, index)?;
    let r = source.numeric(right, index)?;
    Some(l.cmp(&r))
}

/// Percent move of `price` relative to the open entry.
fn change_pct(price: Num, record: &TradingRecord) -> Option<Decimal> {
    let entry = record.open_entry()?.price;
    price?
        .checked_sub(entry)?
        .checked_div(entry)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
