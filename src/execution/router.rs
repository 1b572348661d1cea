//! Intent-to-directive routing
//!
//! Deterministic mapping from (strategy intent, current position side,
//! signal strength) to an execution directive. The router never touches
//! position state; it only describes the transition for the executor.

use rust_decimal::Decimal;

use super::types::{Action, Directive, Intent, PositionSide};

/// Routes strategy intents into position-change directives
#[derive(Debug, Default)]
pub struct ExecutionRouter;

impl ExecutionRouter {
    pub fn new() -> Self {
        Self
    }

    /// Produce the directive for one cycle.
    ///
    /// Non-positive strength forces a flat intent. A direct long→short
    /// transition is never emitted; an opposing intent becomes a single
    /// `open` carrying `flip = true`.
    pub fn route(
        &self,
        intent: Intent,
        current: Option<PositionSide>,
        qty: Decimal,
        entry_price: Decimal,
        stop: Decimal,
        strength: Decimal,
    ) -> Directive {
        let intent = if strength <= Decimal::ZERO {
            Intent::Flat
        } else {
            intent
        };

        match (intent.as_side(), current) {
            // flat intent: close if holding, otherwise nothing to do
            (None, None) => Directive::hold(),
            (None, Some(side)) => Directive {
                action: Action::Close,
                side: Some(side),
                qty: Decimal::ZERO,
                entry_price,
                stop,
                flip: false,
            },
            // directional intent with no position: open
            (Some(target), None) => Directive {
                action: Action::Open,
                side: Some(target),
                qty,
                entry_price,
                stop,
                flip: false,
            },
            // holding the intended side: hold
            (Some(target), Some(side)) if target == side => Directive {
                action: Action::Hold,
                side: Some(side),
                qty,
                entry_price,
                stop,
                flip: false,
            },
            // opposing side: flip expressed as a single open
            (Some(target), Some(_)) => Directive {
                action: Action::Open,
                side: Some(target),
                qty,
                entry_price,
                stop,
                flip: true,
            },
        }
    }
}
