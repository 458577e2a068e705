use std::sync::Arc;

use crate::core::tx::{TrackedAsset, tracked_quantity};
use crate::core::{FlowResult, TokenFlow, TradeType, UtxoSet};
use crate::tags::VenueRegistry;

/// One branch of the buy/sell cascade.
struct FlowRule {
    name: &'static str,
    when: fn(&TokenFlow) -> bool,
    outcome: fn(&TokenFlow) -> (TradeType, u64),
}

/// Evaluated top to bottom; the first branch whose `when` holds decides.
const CASCADE: &[FlowRule] = &[
    FlowRule {
        name: "venue_to_user",
        when: |f| f.venue_input_tokens > 0 && f.user_output_tokens > 0,
        outcome: |f| (TradeType::Buy, f.user_output_tokens),
    },
    FlowRule {
        name: "user_to_venue",
        when: |f| f.user_input_tokens > 0 && f.venue_output_tokens > 0,
        outcome: |f| (TradeType::Sell, f.user_input_tokens),
    },
    FlowRule {
        name: "first_distribution",
        when: |f| f.input_tokens == 0 && f.user_output_tokens > 0,
        outcome: |f| (TradeType::Buy, f.user_output_tokens),
    },
    FlowRule {
        name: "full_exit",
        when: |f| f.user_input_tokens > 0 && f.user_output_tokens == 0,
        outcome: |f| (TradeType::Sell, f.user_input_tokens),
    },
    FlowRule {
        name: "user_net",
        when: |f| f.user_input_tokens > 0 && f.user_output_tokens > 0,
        outcome: |f| net(f.user_output_tokens, f.user_input_tokens),
    },
    FlowRule {
        name: "total_net",
        when: |_| true,
        outcome: |f| net(f.output_tokens, f.input_tokens),
    },
];

/// Buy when more tokens come out than go in, sell on the reverse.
fn net(received: u64, spent: u64) -> (TradeType, u64) {
    if received > spent {
        (TradeType::Buy, received - spent)
    } else if spent > received {
        (TradeType::Sell, spent - received)
    } else {
        (TradeType::Unknown, 0)
    }
}

/// Splits tracked-token movement into venue and user sides and derives
/// buy/sell from it.
pub struct FlowClassifier {
    asset: TrackedAsset,
    registry: Arc<VenueRegistry>,
}

impl FlowClassifier {
    pub fn new(asset: TrackedAsset, registry: Arc<VenueRegistry>) -> Self {
        Self { asset, registry }
    }

    pub fn measure(&self, utxos: &UtxoSet) -> TokenFlow {
        let mut flow = TokenFlow::default();

        for input in &utxos.inputs {
            let tokens = tracked_quantity(input, &self.asset);
            flow.input_tokens += tokens;
            if tokens > 0 {
                if self.registry.is_venue(&input.address) {
                    flow.venue_input_tokens += tokens;
                } else {
                    flow.user_input_tokens += tokens;
                }
            }
        }

        for output in &utxos.outputs {
            let tokens = tracked_quantity(output, &self.asset);
            flow.output_tokens += tokens;
            if tokens > 0 {
                if self.registry.is_venue(&output.address) {
                    flow.venue_output_tokens += tokens;
                } else {
                    flow.user_output_tokens += tokens;
                }
            }
        }

        flow
    }

    pub fn classify(&self, utxos: &UtxoSet) -> FlowResult {
        let flow = self.measure(utxos);
        let (rule, (trade_type, amount)) = CASCADE
            .iter()
            .find(|r| (r.when)(&flow))
            .map(|r| (r.name, (r.outcome)(&flow)))
            .unwrap_or(("none", (TradeType::Unknown, 0)));

        FlowResult {
            trade_type,
            amount,
            rule,
            flow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetAmount, TxEntry};

    const POLICY: &str = "ac597ca6";
    const VENUE: &str = "addr1_splash_pool";

    fn classifier() -> FlowClassifier {
        let mut registry = VenueRegistry::empty();
        registry.insert("Splash", VENUE);
        FlowClassifier::new(TrackedAsset::new(POLICY, "$TKN"), Arc::new(registry))
    }

    fn holding(address: &str, tokens: u64) -> TxEntry {
        let mut assets = vec![AssetAmount {
            unit: "lovelace".to_string(),
            quantity: 2_000_000,
        }];
        if tokens > 0 {
            assets.push(AssetAmount {
                unit: format!("{POLICY}435241574a55"),
                quantity: tokens,
            });
        }
        TxEntry {
            address: address.to_string(),
            assets,
        }
    }

    fn utxos(inputs: Vec<TxEntry>, outputs: Vec<TxEntry>) -> UtxoSet {
        UtxoSet { inputs, outputs }
    }

    #[test]
    fn first_distribution_to_user_is_buy() {
        let u = utxos(
            vec![holding("addr1_buyer", 0)],
            vec![holding("addr1_buyer", 500), holding("addr1_change", 0)],
        );
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Buy);
        assert_eq!(result.amount, 500);
        assert_eq!(result.rule, "first_distribution");
    }

    #[test]
    fn venue_to_user_is_buy() {
        let u = utxos(
            vec![holding(VENUE, 10_000), holding("addr1_buyer", 0)],
            vec![holding(VENUE, 9_000), holding("addr1_buyer", 1_000)],
        );
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Buy);
        assert_eq!(result.amount, 1_000);
        assert_eq!(result.flow.venue_input_tokens, 10_000);
        assert_eq!(result.flow.venue_output_tokens, 9_000);
    }

    #[test]
    fn user_to_venue_is_sell() {
        let u = utxos(
            vec![holding("addr1_seller", 700)],
            vec![holding(VENUE, 700), holding("addr1_seller", 0)],
        );
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Sell);
        assert_eq!(result.amount, 700);
        assert_eq!(result.rule, "user_to_venue");
    }

    #[test]
    fn user_full_exit_is_sell() {
        // userInput=300, userOutput=0, venueInput=0, and nothing reaches a known venue
        let u = utxos(vec![holding("addr1_seller", 300)], vec![holding("addr1_seller", 0)]);
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Sell);
        assert_eq!(result.amount, 300);
        assert_eq!(result.rule, "full_exit");
    }

    #[test]
    fn user_net_gain_is_buy() {
        let u = utxos(
            vec![holding("addr1_a", 100)],
            vec![holding("addr1_a", 40), holding("addr1_b", 160)],
        );
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Buy);
        assert_eq!(result.amount, 100);
        assert_eq!(result.rule, "user_net");
    }

    #[test]
    fn user_net_loss_is_sell() {
        let u = utxos(vec![holding("addr1_a", 500)], vec![holding("addr1_a", 200)]);
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Sell);
        assert_eq!(result.amount, 300);
    }

    #[test]
    fn user_transfer_is_unknown() {
        let u = utxos(vec![holding("addr1_a", 500)], vec![holding("addr1_b", 500)]);
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Unknown);
        assert_eq!(result.amount, 0);
        assert_eq!(result.rule, "user_net");
    }

    #[test]
    fn venue_only_movement_falls_through_to_totals() {
        let u = utxos(vec![holding(VENUE, 800)], vec![holding(VENUE, 500)]);
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Sell);
        assert_eq!(result.amount, 300);
        assert_eq!(result.rule, "total_net");

        let u = utxos(vec![holding(VENUE, 500)], vec![holding(VENUE, 500)]);
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Unknown);
        assert_eq!(result.amount, 0);
    }

    #[test]
    fn no_token_movement_is_unknown() {
        let u = utxos(vec![holding("addr1_a", 0)], vec![holding("addr1_b", 0)]);
        let result = classifier().classify(&u);
        assert_eq!(result.trade_type, TradeType::Unknown);
        assert_eq!(result.flow, TokenFlow::default());
    }

    #[test]
    fn unrelated_assets_ignored() {
        let mut entry = holding("addr1_buyer", 0);
        entry.assets.push(AssetAmount {
            unit: "deadbeef00".to_string(),
            quantity: 42,
        });
        let u = utxos(vec![holding("addr1_buyer", 0)], vec![entry]);
        assert_eq!(classifier().classify(&u).trade_type, TradeType::Unknown);
    }
}
