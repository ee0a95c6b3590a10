//! Rule AST.
//!
//! Rules reference indicator nodes by id, so they are plain data and can be
//! cloned, compared and inspected without touching a graph.

use crate::domain::indicator::{BooleanId, NumericId};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Over {
        left: NumericId,
        right: NumericId,
    },
    Under {
        left: NumericId,
        right: NumericId,
    },
    CrossedUp {
        left: NumericId,
        right: NumericId,
    },
    CrossedDown {
        left: NumericId,
        right: NumericId,
    },
    Boolean(BooleanId),
    And(Box<Rule>, Box<Rule>),
    Or(Box<Rule>, Box<Rule>),
    Not(Box<Rule>),
    /// Open position has lost at least `pct` percent at `price`.
    StopLoss {
        price: NumericId,
        pct: Decimal,
    },
    /// Open position has gained at least `pct` percent at `price`.
    StopGain {
        price: NumericId,
        pct: Decimal,
    },
}

impl Rule {
    pub fn and(self, other: Rule) -> Rule {
        Rule::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Rule) -> Rule {
        Rule::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Rule {
        Rule::Not(Box::new(self))
    }

    /// Every numeric indicator the rule reads, in first-seen order.
    pub fn numeric_inputs(&self) -> Vec<NumericId> {
        let mut out = Vec::new();
        self.collect_numeric(&mut out);
        out
    }

    /// Every boolean indicator the rule reads, in first-seen order.
    pub fn boolean_inputs(&self) -> Vec<BooleanId> {
        let mut out = Vec::new();
        self.collect_boolean(&mut out);
        out
    }

    fn collect_numeric(&self, out: &mut Vec<NumericId>) {
        let mut push = |id: NumericId| {
            if !out.contains(&id) {
                out.push(id);
            }
        };
        match self {
            Rule::Over { left, right }
            | Rule::Under { left, right }
            | Rule::CrossedUp { left, right }
            | Rule::CrossedDown { left, right } => {
                push(*left);
                push(*right);
            }
            Rule::StopLoss { price, .. } | Rule::StopGain { price, .. } => push(*price),
            Rule::Boolean(_) => {}
            Rule::And(a, b) | Rule::Or(a, b) => {
                a.collect_numeric(out);
                b.collect_numeric(out);
            }
            Rule::Not(r) => r.collect_numeric(out),
        }
    }

    fn collect_boolean(&self, out: &mut Vec<BooleanId>) {
        match self {
            Rule::Boolean(id) => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Rule::And(a, b) | Rule::Or(a, b) => {
                a.collect_boolean(out);
                b.collect_boolean(out);
            }
            Rule::Not(r) => r.collect_boolean(out),
            _ => {}
        }
    }
}
