use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::core::{MetadataEntry, MetadataLabel, UtxoSet, VenueMatch};
use crate::tags::VenueRegistry;

/// A metadata heuristic that may identify the venue of a transaction.
///
/// For each metadata entry only the first rule whose label guard applies is
/// consulted.
pub trait VenueRule {
    fn name(&self) -> &str;
    fn applies(&self, label: &MetadataLabel) -> bool;
    fn detect(&self, payload: &Value) -> Option<String>;
}

/// Return the metadata rules in priority order.
pub fn default_rules() -> Vec<Box<dyn VenueRule + Send + Sync>> {
    vec![
        Box::new(MessageLabelRule),
        Box::new(SplashSentinelRule),
        Box::new(KeywordLabelRule),
    ]
}

/// Keyword table for label 674 messages, checked after "splash".
const MESSAGE_VENUES: &[(&str, &[&str])] = &[
    ("Minswap", &["minswap", "order executed"]),
    ("SundaeSwap", &["sundae", "swap"]),
    ("MuesliSwap", &["muesli", "order"]),
    ("WingRiders", &["wing", "riders"]),
];

const SPLASH_SENTINELS: &[&str] = &["0x0100", "0x0001"];
const SPLASH_SENTINEL_PREFIX: &str = "0x01";

const GENERIC_KEYWORDS: &[&str] = &["splash", "dex", "swap"];

/// Lowercased JSON text of a payload.
fn render(payload: &Value) -> String {
    payload.to_string().to_lowercase()
}

// --- Individual Rules ---

/// Label 674: human-readable transaction messages.
struct MessageLabelRule;
impl VenueRule for MessageLabelRule {
    fn name(&self) -> &str { "label_674_message" }
    fn applies(&self, label: &MetadataLabel) -> bool {
        label.is_text("674")
    }
    fn detect(&self, payload: &Value) -> Option<String> {
        let text = render(payload);
        if text.contains("splash") {
            return Some("Splash".to_string());
        }
        MESSAGE_VENUES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map(|(name, _)| name.to_string())
    }
}

/// Label 0 carrying Splash's hex sentinels.
struct SplashSentinelRule;
impl VenueRule for SplashSentinelRule {
    fn name(&self) -> &str { "label_0_sentinel" }
    fn applies(&self, label: &MetadataLabel) -> bool {
        label.is_zero()
    }
    fn detect(&self, payload: &Value) -> Option<String> {
        let s = payload.as_str()?;
        if SPLASH_SENTINELS.contains(&s) || s.starts_with(SPLASH_SENTINEL_PREFIX) {
            Some("Splash".to_string())
        } else {
            None
        }
    }
}

/// Any other labelled entry mentioning exchange keywords.
struct KeywordLabelRule;
impl VenueRule for KeywordLabelRule {
    fn name(&self) -> &str { "label_keyword" }
    fn applies(&self, label: &MetadataLabel) -> bool {
        label.is_present()
    }
    fn detect(&self, payload: &Value) -> Option<String> {
        let text = render(payload);
        if !GENERIC_KEYWORDS.iter().any(|k| text.contains(k)) {
            return None;
        }
        let name = if text.contains("splash") { "Splash" } else { "Unknown" };
        Some(name.to_string())
    }
}

/// Decides whether a transaction touched a known exchange venue.
pub struct VenueDetector {
    rules: Vec<Box<dyn VenueRule + Send + Sync>>,
    registry: Arc<VenueRegistry>,
}

impl VenueDetector {
    pub fn new(registry: Arc<VenueRegistry>) -> Self {
        Self {
            rules: default_rules(),
            registry,
        }
    }

    /// Metadata rules first, then the registered-address fallback.
    pub fn detect(&self, metadata: &[MetadataEntry], utxos: Option<&UtxoSet>) -> VenueMatch {
        for entry in metadata {
            let Some(rule) = self.rules.iter().find(|r| r.applies(&entry.label)) else {
                continue;
            };
            if let Some(name) = rule.detect(&entry.payload) {
                debug!(rule = rule.name(), venue = %name, "Venue matched on metadata");
                return VenueMatch::named(name);
            }
        }

        if let Some(utxos) = utxos {
            let addresses = utxos
                .inputs
                .iter()
                .chain(utxos.outputs.iter())
                .map(|e| e.address.as_str());
            for address in addresses {
                if let Some(name) = self.registry.venue_for(address) {
                    debug!(venue = name, address, "Venue matched on address");
                    return VenueMatch::named(name);
                }
            }
        }

        VenueMatch::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TxEntry;
    use serde_json::json;

    fn meta(label: MetadataLabel, payload: Value) -> MetadataEntry {
        MetadataEntry { label, payload }
    }

    fn text(label: &str) -> MetadataLabel {
        MetadataLabel::Text(label.to_string())
    }

    fn detector() -> VenueDetector {
        let mut registry = VenueRegistry::empty();
        registry.insert("Splash", "addr1_splash_pool");
        VenueDetector::new(Arc::new(registry))
    }

    fn utxos_with(input: &str, output: &str) -> UtxoSet {
        UtxoSet {
            inputs: vec![TxEntry { address: input.to_string(), assets: vec![] }],
            outputs: vec![TxEntry { address: output.to_string(), assets: vec![] }],
        }
    }

    #[test]
    fn label_674_splash() {
        let m = vec![meta(text("674"), json!({ "msg": ["Splash: Swap Order"] }))];
        assert_eq!(detector().detect(&m, None), VenueMatch::named("Splash"));
    }

    #[test]
    fn label_674_splash_wins_over_table() {
        let m = vec![meta(text("674"), json!({ "msg": ["Minswap via SPLASH router"] }))];
        assert_eq!(detector().detect(&m, None).venue_name, "Splash");
    }

    #[test]
    fn label_674_table_priority() {
        let m = vec![meta(text("674"), json!({ "msg": ["Minswap: Order Executed"] }))];
        assert_eq!(detector().detect(&m, None).venue_name, "Minswap");

        // "swap" hits SundaeSwap before "order" hits MuesliSwap
        let m = vec![meta(text("674"), json!({ "msg": ["swap order"] }))];
        assert_eq!(detector().detect(&m, None).venue_name, "SundaeSwap");

        let m = vec![meta(text("674"), json!({ "msg": ["Muesli order"] }))];
        assert_eq!(detector().detect(&m, None).venue_name, "MuesliSwap");

        let m = vec![meta(text("674"), json!({ "msg": ["WingRiders"] }))];
        assert_eq!(detector().detect(&m, None).venue_name, "WingRiders");
    }

    #[test]
    fn label_674_without_keywords_is_not_rechecked_generically() {
        // "dex" would satisfy the generic rule, but a 674 entry only gets the 674 rule
        let m = vec![meta(text("674"), json!({ "msg": ["my dex"] }))];
        assert_eq!(detector().detect(&m, None), VenueMatch::none());
    }

    #[test]
    fn label_zero_sentinels() {
        for payload in ["0x0100", "0x0001", "0x01ff"] {
            let m = vec![meta(text("0"), json!(payload))];
            assert_eq!(detector().detect(&m, None).venue_name, "Splash", "{payload}");
        }
        let m = vec![meta(MetadataLabel::Number(0), json!("0x0100"))];
        assert!(detector().detect(&m, None).is_venue);

        let m = vec![meta(text("0"), json!("0x0200"))];
        assert!(!detector().detect(&m, None).is_venue);

        let m = vec![meta(text("0"), json!(256))];
        assert!(!detector().detect(&m, None).is_venue);
    }

    #[test]
    fn other_label_keywords() {
        let m = vec![meta(text("721"), json!({ "name": "DEX aggregator" }))];
        assert_eq!(detector().detect(&m, None), VenueMatch::named("Unknown"));

        let m = vec![meta(MetadataLabel::Number(1964), json!({ "p": "splash" }))];
        assert_eq!(detector().detect(&m, None).venue_name, "Splash");

        let m = vec![meta(text("721"), json!({ "name": "nft" }))];
        assert!(!detector().detect(&m, None).is_venue);
    }

    #[test]
    fn empty_label_skipped() {
        let m = vec![meta(text(""), json!("swap"))];
        assert!(!detector().detect(&m, None).is_venue);
    }

    #[test]
    fn later_entry_can_match() {
        let m = vec![
            meta(text("721"), json!({ "name": "nft" })),
            meta(text("674"), json!({ "msg": ["splash"] })),
        ];
        assert_eq!(detector().detect(&m, None).venue_name, "Splash");
    }

    #[test]
    fn address_fallback_without_metadata() {
        let d = detector();
        assert_eq!(
            d.detect(&[], Some(&utxos_with("addr1_user", "addr1_splash_pool"))),
            VenueMatch::named("Splash")
        );
        assert!(!d.detect(&[], Some(&utxos_with("addr1_user", "addr1_other"))).is_venue);
        assert!(!d.detect(&[], None).is_venue);
    }

    #[test]
    fn address_fallback_after_unmatched_metadata() {
        let m = vec![meta(text("721"), json!({ "name": "nft" }))];
        let u = utxos_with("addr1_splash_pool", "addr1_user");
        assert_eq!(detector().detect(&m, Some(&u)).venue_name, "Splash");
    }
}
