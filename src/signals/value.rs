use crate::core::tx::{TrackedAsset, lists_tracked, lovelace};
use crate::core::{UtxoSet, ValueEstimate, ValueMethod};

/// Estimates how much currency the buyer paid.
pub struct ValueEstimator {
    asset: TrackedAsset,
}

impl ValueEstimator {
    pub fn new(asset: TrackedAsset) -> Self {
        Self { asset }
    }

    /// Largest currency-only input, or the net currency difference when no
    /// input is currency-only. The fallback is not clamped and may be
    /// negative.
    pub fn estimate(&self, utxos: &UtxoSet) -> ValueEstimate {
        let buyer_payment = utxos
            .inputs
            .iter()
            .filter(|input| !lists_tracked(input, &self.asset))
            .map(lovelace)
            .filter(|ada| *ada > 0)
            .max();

        if let Some(paid) = buyer_payment {
            return ValueEstimate {
                lovelace: i64::try_from(paid).unwrap_or(i64::MAX),
                method: ValueMethod::BuyerInput,
            };
        }

        let spent: i128 = utxos.inputs.iter().map(|e| lovelace(e) as i128).sum();
        let returned: i128 = utxos.outputs.iter().map(|e| lovelace(e) as i128).sum();
        let net = (spent - returned).clamp(i64::MIN as i128, i64::MAX as i128) as i64;

        ValueEstimate {
            lovelace: net,
            method: ValueMethod::NetDifference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetAmount, TxEntry};

    const POLICY: &str = "ac597ca6";

    fn estimator() -> ValueEstimator {
        ValueEstimator::new(TrackedAsset::new(POLICY, "$TKN"))
    }

    fn entry(ada: u64, tokens: Option<u64>) -> TxEntry {
        let mut assets = vec![AssetAmount {
            unit: "lovelace".to_string(),
            quantity: ada,
        }];
        if let Some(quantity) = tokens {
            assets.push(AssetAmount {
                unit: format!("{POLICY}746f6b656e"),
                quantity,
            });
        }
        TxEntry {
            address: "addr1".to_string(),
            assets,
        }
    }

    #[test]
    fn largest_pure_currency_input() {
        let u = UtxoSet {
            inputs: vec![
                entry(1_000_000, None),
                entry(5_000_000, None),
                entry(9_000_000, Some(10)),
            ],
            outputs: vec![],
        };
        let est = estimator().estimate(&u);
        assert_eq!(est.lovelace, 5_000_000);
        assert_eq!(est.method, ValueMethod::BuyerInput);
    }

    #[test]
    fn zero_quantity_token_listing_still_excludes_input() {
        let u = UtxoSet {
            inputs: vec![entry(3_000_000, Some(0)), entry(2_000_000, None)],
            outputs: vec![],
        };
        assert_eq!(estimator().estimate(&u).lovelace, 2_000_000);
    }

    #[test]
    fn fallback_net_difference() {
        let u = UtxoSet {
            inputs: vec![entry(10_000_000, Some(500)), entry(4_000_000, Some(1))],
            outputs: vec![entry(2_000_000, Some(501)), entry(11_500_000, None)],
        };
        let est = estimator().estimate(&u);
        assert_eq!(est.lovelace, 500_000);
        assert_eq!(est.method, ValueMethod::NetDifference);
    }

    #[test]
    fn fallback_can_go_negative() {
        let u = UtxoSet {
            inputs: vec![entry(2_000_000, Some(100))],
            outputs: vec![entry(3_000_000, Some(100))],
        };
        let est = estimator().estimate(&u);
        assert_eq!(est.lovelace, -1_000_000);
        assert_eq!(est.method, ValueMethod::NetDifference);
    }

    #[test]
    fn no_inputs_is_zero() {
        let est = estimator().estimate(&UtxoSet::default());
        assert_eq!(est.lovelace, 0);
        assert_eq!(est.method, ValueMethod::NetDifference);
    }
}
