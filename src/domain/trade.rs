//! Core trading-journal domain types.
//!
//! Defines the `Trade` entity, the closed value sets its categorical
//! fields are drawn from, and the two validated inputs that produce or
//! mutate a trade: `NewTrade` (create) and `TradePatch` (partial update).
//!
//! Wire names are camelCase and the enumerations serialize to the exact
//! literals the journal UI renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assets::extract_public_id;

/// Trade identifier (UUID v4 string, assigned on create).
pub type TradeId = String;

/// A closed set of string literals backing a categorical field.
pub trait ClosedSet: Sized + Copy + 'static {
    /// Every accepted literal, in declaration order.
    const LITERALS: &'static [&'static str];

    /// Parse an exact literal.
    fn from_literal(value: &str) -> Option<Self>;

    /// The literal this value serializes to.
    fn as_literal(self) -> &'static str;
}

macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $literal:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $literal)]
                $variant,
            )+
        }

        impl ClosedSet for $name {
            const LITERALS: &'static [&'static str] = &[$($literal),+];

            fn from_literal(value: &str) -> Option<Self> {
                match value {
                    $($literal => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_literal(self) -> &'static str {
                match self {
                    $(Self::$variant => $literal,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_literal())
            }
        }
    };
}

closed_set! {
    /// Market session the trade was taken in.
    pub enum Session {
        London => "לונדון",
        NewYork => "ניו-יורק",
    }
}

closed_set! {
    /// Traded currency pair.
    pub enum Pair {
        EurUsd => "EUR-USD",
        GbpUsd => "GBP-USD",
    }
}

closed_set! {
    /// Trend direction, used for both the main and secondary timeframe.
    pub enum Trend {
        Bullish => "מגמת עליות",
        Bearish => "מגמת ירידות",
    }
}

closed_set! {
    /// Timeframe the order block was identified on.
    pub enum TimeframeBlock {
        H4 => "4H",
        H1 => "1H",
        M30 => "30m",
        M15 => "15m",
    }
}

closed_set! {
    /// Timeframe the entry was taken on.
    pub enum TimeframeEntry {
        M15 => "15m",
        M5 => "5m",
        M3 => "3m",
        M1 => "1m",
    }
}

closed_set! {
    /// Position direction.
    pub enum TradeType {
        Long => "לונג 🟢",
        Short => "שורט 🔴",
    }
}

closed_set! {
    /// Recorded outcome.
    pub enum TradeResult {
        TakeProfit => "TP ✅",
        StopLoss => "SL ❌",
    }
}

/// One journaled trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Unique, immutable identifier.
    pub id: TradeId,
    /// Trade date as submitted (trimmed, parseable).
    pub date: String,
    pub session: Session,
    pub pair: Pair,
    pub trend_main: Trend,
    pub trend_secondary: Trend,
    pub tf_block: TimeframeBlock,
    pub tf_entry: TimeframeEntry,
    pub trade_type: TradeType,
    /// Risk/reward as `N` or `N:M`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<String>,
    pub result: TradeResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Media host URL of the attached screenshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    /// Media host public id of the attached screenshot (used for deletion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated create payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub date: String,
    pub session: Session,
    pub pair: Pair,
    pub trend_main: Trend,
    pub trend_secondary: Trend,
    pub tf_block: TimeframeBlock,
    pub tf_entry: TimeframeEntry,
    pub trade_type: TradeType,
    pub rr: Option<String>,
    pub result: TradeResult,
    pub notes: Option<String>,
    pub screenshot_url: Option<String>,
    pub screenshot_id: Option<String>,
}

impl NewTrade {
    /// Materialize the trade under a freshly assigned id.
    ///
    /// When only a screenshot URL is supplied the public id is derived
    /// from it, so the stored record can always be cleaned up later.
    pub fn into_trade(self, id: TradeId, now: DateTime<Utc>) -> Trade {
        let screenshot_id = self
            .screenshot_id
            .or_else(|| self.screenshot_url.as_deref().and_then(extract_public_id));

        Trade {
            id,
            date: self.date,
            session: self.session,
            pair: self.pair,
            trend_main: self.trend_main,
            trend_secondary: self.trend_secondary,
            tf_block: self.tf_block,
            tf_entry: self.tf_entry,
            trade_type: self.trade_type,
            rr: self.rr,
            result: self.result,
            notes: self.notes,
            screenshot_url: self.screenshot_url,
            screenshot_id,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Validated partial update.
///
/// `None` means "not supplied". For the optional trade fields the inner
/// option distinguishes `Some(None)` (clear) from `Some(Some(v))` (set).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradePatch {
    pub date: Option<String>,
    pub session: Option<Session>,
    pub pair: Option<Pair>,
    pub trend_main: Option<Trend>,
    pub trend_secondary: Option<Trend>,
    pub tf_block: Option<TimeframeBlock>,
    pub tf_entry: Option<TimeframeEntry>,
    pub trade_type: Option<TradeType>,
    pub rr: Option<Option<String>>,
    pub result: Option<TradeResult>,
    pub notes: Option<Option<String>>,
    pub screenshot_url: Option<Option<String>>,
    pub screenshot_id: Option<Option<String>>,
}

impl TradePatch {
    /// Merge the supplied fields over `existing`, leaving the rest intact.
    ///
    /// `id` and `created_at` are never touched. A new screenshot URL
    /// without an explicit id re-derives `screenshot_id`; clearing the URL
    /// without an id clears it too.
    pub fn apply(self, existing: &Trade, now: DateTime<Utc>) -> Trade {
        let mut merged = existing.clone();

        if let Some(date) = self.date {
            merged.date = date;
        }
        if let Some(session) = self.session {
            merged.session = session;
        }
        if let Some(pair) = self.pair {
            merged.pair = pair;
        }
        if let Some(trend) = self.trend_main {
            merged.trend_main = trend;
        }
        if let Some(trend) = self.trend_secondary {
            merged.trend_secondary = trend;
        }
        if let Some(tf) = self.tf_block {
            merged.tf_block = tf;
        }
        if let Some(tf) = self.tf_entry {
            merged.tf_entry = tf;
        }
        if let Some(trade_type) = self.trade_type {
            merged.trade_type = trade_type;
        }
        if let Some(rr) = self.rr {
            merged.rr = rr;
        }
        if let Some(result) = self.result {
            merged.result = result;
        }
        if let Some(notes) = self.notes {
            merged.notes = notes;
        }

        match (self.screenshot_url, self.screenshot_id) {
            (url, Some(id)) => {
                if let Some(url) = url {
                    merged.screenshot_url = url;
                }
                merged.screenshot_id = id;
            }
            (Some(url), None) => {
                merged.screenshot_id = url.as_deref().and_then(extract_public_id);
                merged.screenshot_url = url;
            }
            (None, None) => {}
        }

        merged.updated_at = Some(now);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_trade() -> NewTrade {
        NewTrade {
            date: "2024-03-01T09:30:00Z".to_string(),
            session: Session::London,
            pair: Pair::EurUsd,
            trend_main: Trend::Bullish,
            trend_secondary: Trend::Bearish,
            tf_block: TimeframeBlock::H1,
            tf_entry: TimeframeEntry::M5,
            trade_type: TradeType::Long,
            rr: Some("2".to_string()),
            result: TradeResult::TakeProfit,
            notes: None,
            screenshot_url: None,
            screenshot_id: None,
        }
    }

    #[test]
    fn test_enum_literals_roundtrip_through_serde() {
        let json = serde_json::to_string(&TradeType::Short).unwrap();
        assert_eq!(json, "\"שורט 🔴\"");
        let parsed: TimeframeBlock = serde_json::from_str("\"30m\"").unwrap();
        assert_eq!(parsed, TimeframeBlock::M30);
        assert!(serde_json::from_str::<Session>("\"Tokyo\"").is_err());
    }

    #[test]
    fn test_closed_set_literals() {
        assert_eq!(Pair::LITERALS, &["EUR-USD", "GBP-USD"]);
        assert_eq!(TimeframeEntry::from_literal("1m"), Some(TimeframeEntry::M1));
        assert_eq!(TradeResult::from_literal("TP"), None);
        assert_eq!(format!("{}", Session::NewYork), "ניו-יורק");
    }

    #[test]
    fn test_trade_serializes_camel_case_and_skips_empty() {
        let trade = sample_new_trade().into_trade("t-1".to_string(), Utc::now());
        let value = serde_json::to_value(&trade).unwrap();
        assert_eq!(value["trendMain"], "מגמת עליות");
        assert_eq!(value["tfEntry"], "5m");
        assert!(value.get("notes").is_none());
        assert!(value.get("screenshotId").is_none());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_new_trade_derives_screenshot_id_from_url() {
        let mut input = sample_new_trade();
        input.screenshot_url =
            Some("https://res.cloudinary.com/demo/image/upload/v17/trades/a1.png".to_string());
        let trade = input.into_trade("t-1".to_string(), Utc::now());
        assert_eq!(trade.screenshot_id.as_deref(), Some("trades/a1"));
    }

    #[test]
    fn test_new_trade_keeps_explicit_screenshot_id() {
        let mut input = sample_new_trade();
        input.screenshot_url =
            Some("https://res.cloudinary.com/demo/image/upload/trades/a1.png".to_string());
        input.screenshot_id = Some("custom/id".to_string());
        let trade = input.into_trade("t-1".to_string(), Utc::now());
        assert_eq!(trade.screenshot_id.as_deref(), Some("custom/id"));
    }

    #[test]
    fn test_patch_merges_only_supplied_fields() {
        let created = Utc::now();
        let existing = sample_new_trade().into_trade("t-1".to_string(), created);
        let patch = TradePatch {
            notes: Some(Some("x".to_string())),
            ..TradePatch::default()
        };
        let merged = patch.apply(&existing, created + chrono::Duration::seconds(5));
        assert_eq!(merged.rr.as_deref(), Some("2"));
        assert_eq!(merged.notes.as_deref(), Some("x"));
        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.created_at, existing.created_at);
        assert!(merged.updated_at > existing.updated_at);
    }

    #[test]
    fn test_patch_clears_optional_fields() {
        let existing = sample_new_trade().into_trade("t-1".to_string(), Utc::now());
        let patch = TradePatch {
            rr: Some(None),
            ..TradePatch::default()
        };
        let merged = patch.apply(&existing, Utc::now());
        assert!(merged.rr.is_none());
    }

    #[test]
    fn test_patch_new_url_rederives_screenshot_id() {
        let mut input = sample_new_trade();
        input.screenshot_url =
            Some("https://res.cloudinary.com/demo/image/upload/v1/trades/a1.png".to_string());
        let existing = input.into_trade("t-1".to_string(), Utc::now());

        let patch = TradePatch {
            screenshot_url: Some(Some(
                "https://res.cloudinary.com/demo/image/upload/v2/trades/b2.jpg".to_string(),
            )),
            ..TradePatch::default()
        };
        let merged = patch.apply(&existing, Utc::now());
        assert_eq!(merged.screenshot_id.as_deref(), Some("trades/b2"));
    }

    #[test]
    fn test_patch_foreign_url_drops_reference_it_orphans() {
        use crate::domain::assets::{IncomingReference, incoming_reference, reference_of};

        let mut input = sample_new_trade();
        input.screenshot_url =
            Some("https://res.cloudinary.com/demo/image/upload/v1/trades/a1.png".to_string());
        let existing = input.into_trade("t-1".to_string(), Utc::now());

        let patch = TradePatch {
            screenshot_url: Some(Some("https://imgs.example.com/chart.png".to_string())),
            ..TradePatch::default()
        };
        assert_eq!(incoming_reference(&patch), IncomingReference::Cleared);

        let merged = patch.apply(&existing, Utc::now());
        assert_eq!(merged.screenshot_id, None);
        assert_eq!(reference_of(&merged), None);
    }

    #[test]
    fn test_patch_clearing_url_clears_id() {
        let mut input = sample_new_trade();
        input.screenshot_url =
            Some("https://res.cloudinary.com/demo/image/upload/trades/a1.png".to_string());
        let existing = input.into_trade("t-1".to_string(), Utc::now());

        let patch = TradePatch {
            screenshot_url: Some(None),
            ..TradePatch::default()
        };
        let merged = patch.apply(&existing, Utc::now());
        assert!(merged.screenshot_url.is_none());
        assert!(merged.screenshot_id.is_none());
    }
}
