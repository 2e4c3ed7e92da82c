//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to check the screenshot reference grammar, payload
//! validation and the in-memory store across random inputs.

use proptest::prelude::*;
use serde_json::{Value, json};

use trading_log_api::adapters::persistence::InMemoryTradeStore;
use trading_log_api::domain::assets::{IncomingReference, extract_public_id, plan_cleanup};
use trading_log_api::domain::validation::{ValidationRules, validate_create, validate_update};
use trading_log_api::ports::repository::TradeRepository;

fn base_payload() -> Value {
    json!({
        "date": "2024-05-02",
        "session": "ניו-יורק",
        "pair": "GBP-USD",
        "trendMain": "מגמת ירידות",
        "trendSecondary": "מגמת ירידות",
        "tfBlock": "15m",
        "tfEntry": "1m",
        "tradeType": "שורט 🔴",
        "result": "SL ❌"
    })
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,12}"
}

// ── Public id extraction ────────────────────────────────────

proptest! {
    /// Any folder path + name round-trips through a delivery URL.
    #[test]
    fn extracted_id_matches_uploaded_path(
        folders in prop::collection::vec(segment(), 0..4),
        name in segment(),
        version in prop::option::of(1u64..9_999_999_999),
        ext in prop::sample::select(vec!["png", "jpg", "webp", "jpeg"]),
    ) {
        // A leading `v<digits>` folder is indistinguishable from a version.
        let version_like = |s: &str| s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit());
        prop_assume!(version.is_some() || folders.first().is_none_or(|f| !version_like(f)));

        let mut id_parts = folders.clone();
        id_parts.push(name);
        let public_id = id_parts.join("/");

        let version = version.map(|v| format!("v{v}/")).unwrap_or_default();
        let url = format!("https://res.cloudinary.com/demo/image/upload/{version}{public_id}.{ext}");

        prop_assert_eq!(extract_public_id(&url), Some(public_id));
    }

    /// Query strings and fragments never leak into the id.
    #[test]
    fn query_and_fragment_are_ignored(
        name in segment(),
        query in "[a-z0-9=&]{0,20}",
        fragment in "[a-z0-9]{0,10}",
    ) {
        let url = format!("https://cdn.example/image/upload/v12/{name}.png?{query}#{fragment}");
        prop_assert_eq!(extract_public_id(&url), Some(name));
    }

    /// URLs without an upload segment never yield an id.
    #[test]
    fn non_upload_urls_yield_nothing(path in "[a-z0-9/]{0,30}") {
        let url = format!("https://example.com/{path}.png");
        prop_assume!(!path.contains("upload"));
        prop_assert_eq!(extract_public_id(&url), None);
    }

    /// Replacing an id with itself never schedules a deletion.
    #[test]
    fn same_reference_is_never_cleaned(id in segment()) {
        prop_assert_eq!(plan_cleanup(Some(&id), &IncomingReference::Replaced(id.clone())), None);
    }
}

// ── Validation ──────────────────────────────────────────────

proptest! {
    /// Ratios written as `a`, `a.b` or `a:b` are accepted.
    #[test]
    fn well_formed_rr_is_accepted(a in 0u32..1000, b in 1u32..1000, colon in any::<bool>()) {
        let rr = if colon { format!("{a}:{b}") } else { format!("{a}.{b}") };
        let patch = validate_update(&json!({ "rr": rr }), &ValidationRules::default());
        prop_assert!(patch.is_ok());
    }

    /// Anything with letters is never a valid ratio.
    #[test]
    fn rr_with_letters_is_rejected(rr in "[0-9]{0,3}[a-z]{1,4}[0-9:]{0,3}") {
        let err = validate_update(&json!({ "rr": rr }), &ValidationRules::default()).unwrap_err();
        prop_assert!(err.field("rr").is_some());
    }

    /// Notes longer than the limit are rejected; shorter ones pass.
    #[test]
    fn notes_limit_is_enforced(len in 0usize..60, limit in 1usize..40) {
        let rules = ValidationRules { notes_max_chars: limit };
        let mut body = base_payload();
        body["notes"] = json!("ש".repeat(len));

        let result = validate_create(&body, &rules);
        prop_assert_eq!(result.is_ok(), len <= limit);
    }

    /// Unknown keys are always reported as a form error.
    #[test]
    fn unknown_keys_are_rejected(key in "[a-z]{3,10}") {
        prop_assume!(base_payload().get(&key).is_none() && key != "rr" && key != "notes");
        let mut body = base_payload();
        body[key.as_str()] = json!("x");
        let err = validate_create(&body, &ValidationRules::default()).unwrap_err();
        prop_assert!(err.form_errors.iter().any(|m| m.contains(&key)));
    }
}

// ── In-memory store ─────────────────────────────────────────

proptest! {
    /// Listing returns each upserted id once, in first-insertion order.
    #[test]
    fn memory_store_preserves_first_insertion_order(ids in prop::collection::vec("[a-e]", 1..20)) {
        let store = InMemoryTradeStore::new();
        let new_trade = validate_create(&base_payload(), &ValidationRules::default()).unwrap();

        tokio_test::block_on(async {
            for id in &ids {
                store
                    .upsert(new_trade.clone().into_trade(id.clone(), chrono::Utc::now()))
                    .await
                    .unwrap();
            }
        });

        let mut expected: Vec<String> = Vec::new();
        for id in &ids {
            if !expected.contains(id) {
                expected.push(id.clone());
            }
        }

        let listed: Vec<String> = tokio_test::block_on(store.list())
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        prop_assert_eq!(listed, expected);
    }
}
