use super::{LOVELACE, TxEntry};

/// The token being watched.
///
/// Units are matched by substring containment of `unit`, so a policy id
/// matches every asset minted under that policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedAsset {
    pub unit: String,
    pub ticker: String,
}

impl TrackedAsset {
    pub fn new(unit: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ticker: ticker.into(),
        }
    }

    pub fn matches(&self, unit: &str) -> bool {
        !unit.is_empty() && unit.contains(self.unit.as_str())
    }
}

/// Total tracked-token quantity held by an entry.
pub fn tracked_quantity(entry: &TxEntry, asset: &TrackedAsset) -> u64 {
    entry
        .assets
        .iter()
        .filter(|a| asset.matches(&a.unit))
        .map(|a| a.quantity)
        .sum()
}

/// Whether the entry lists the tracked token at all, regardless of quantity.
pub fn lists_tracked(entry: &TxEntry, asset: &TrackedAsset) -> bool {
    entry.assets.iter().any(|a| asset.matches(&a.unit))
}

/// Native currency held by an entry, in lovelace.
pub fn lovelace(entry: &TxEntry) -> u64 {
    entry
        .assets
        .iter()
        .filter(|a| a.unit == LOVELACE)
        .map(|a| a.quantity)
        .sum()
}
