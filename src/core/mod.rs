pub mod pipeline;
pub mod tx;
pub mod watermark;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Asset unit of the ledger's native currency (1 ADA = 1_000_000 lovelace).
pub const LOVELACE: &str = "lovelace";

/// One row of the asset transfer listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetTransfer {
    pub tx_hash: String,
}

/// Transaction summary as reported by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDetails {
    #[serde(rename = "hash")]
    pub id: String,
    pub block_time: i64,
    #[serde(rename = "fees", deserialize_with = "de_quantity")]
    pub fee: u64,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A single `{unit, quantity}` pair inside an input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub unit: String,
    #[serde(deserialize_with = "de_quantity")]
    pub quantity: u64,
}

/// An input or output of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEntry {
    pub address: String,
    #[serde(rename = "amount", default)]
    pub assets: Vec<AssetAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSet {
    #[serde(default)]
    pub inputs: Vec<TxEntry>,
    #[serde(default)]
    pub outputs: Vec<TxEntry>,
}

/// Metadata labels arrive as strings from the indexer but may be numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataLabel {
    Text(String),
    Number(u64),
}

impl MetadataLabel {
    /// Exact match against the string form only.
    pub fn is_text(&self, label: &str) -> bool {
        matches!(self, MetadataLabel::Text(s) if s == label)
    }

    /// Label zero in either representation.
    pub fn is_zero(&self) -> bool {
        match self {
            MetadataLabel::Text(s) => s == "0",
            MetadataLabel::Number(n) => *n == 0,
        }
    }

    /// A label that is neither empty nor numeric zero.
    pub fn is_present(&self) -> bool {
        match self {
            MetadataLabel::Text(s) => !s.is_empty(),
            MetadataLabel::Number(n) => *n != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: MetadataLabel,
    #[serde(rename = "json_metadata", default)]
    pub payload: Value,
}

/// Whether a transaction touched an exchange venue, and which one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VenueMatch {
    pub is_venue: bool,
    pub venue_name: String,
}

impl VenueMatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            is_venue: true,
            venue_name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
    Unknown,
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
            TradeType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Tracked-token movement split by counterparty class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenFlow {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub venue_input_tokens: u64,
    pub venue_output_tokens: u64,
    pub user_input_tokens: u64,
    pub user_output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowResult {
    pub trade_type: TradeType,
    pub amount: u64,
    /// Name of the cascade branch that produced this result.
    pub rule: &'static str,
    pub flow: TokenFlow,
}

impl FlowResult {
    pub fn is_notifiable_buy(&self) -> bool {
        self.trade_type == TradeType::Buy && self.amount > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueMethod {
    /// Largest input holding only currency, assumed to be the buyer's payment.
    BuyerInput,
    /// Total currency in minus total currency out. Includes fees and change.
    NetDifference,
}

/// Estimated currency paid, in lovelace. Can be negative via the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueEstimate {
    pub lovelace: i64,
    pub method: ValueMethod,
}

/// Payload handed to the notifier for a qualifying buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyEvent {
    pub trade_type: TradeType,
    pub token_amount: u64,
    pub ada_amount: i64,
    pub venue_name: String,
    pub tx_id: String,
    pub block_time: i64,
}

/// Quantities are decimal strings on the wire; plain numbers are accepted too.
fn de_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
