//! Domain layer - Core business logic and models.
//!
//! The trade entity, its validation rules and the screenshot cleanup
//! policy. Pure code only (hexagonal architecture inner ring): no I/O,
//! everything testable in isolation.

pub mod assets;
pub mod trade;
pub mod validation;

// Re-export core types for convenience
pub use assets::{
    IncomingReference, extract_public_id, incoming_reference, plan_cleanup, reference_of,
};
pub use trade::{
    ClosedSet, NewTrade, Pair, Session, TimeframeBlock, TimeframeEntry, Trade, TradeId, TradePatch,
    TradeResult, TradeType, Trend,
};
pub use validation::{ValidationError, ValidationRules, validate_create, validate_update};
