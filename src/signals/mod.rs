pub mod flow;
pub mod value;
pub mod venue;

use std::sync::Arc;

use crate::core::tx::TrackedAsset;
use crate::core::{FlowResult, MetadataEntry, TradeType, UtxoSet, ValueEstimate, VenueMatch};
use crate::tags::VenueRegistry;
use flow::FlowClassifier;
use value::ValueEstimator;
use venue::VenueDetector;

/// Outcome of running one transaction through the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// No venue detected; flow is never examined.
    NotVenue,
    Buy {
        venue: VenueMatch,
        flow: FlowResult,
        value: ValueEstimate,
    },
    Sell {
        venue: VenueMatch,
        flow: FlowResult,
    },
    /// Venue detected but no qualifying buy or sell.
    Ambiguous {
        venue: VenueMatch,
        flow: FlowResult,
    },
}

/// Venue detection, then token flow, then value for qualifying buys.
pub struct Classifier {
    venue: VenueDetector,
    flow: FlowClassifier,
    value: ValueEstimator,
}

impl Classifier {
    pub fn new(asset: TrackedAsset, registry: Arc<VenueRegistry>) -> Self {
        Self {
            venue: VenueDetector::new(registry.clone()),
            flow: FlowClassifier::new(asset.clone(), registry),
            value: ValueEstimator::new(asset),
        }
    }

    pub fn classify(&self, metadata: &[MetadataEntry], utxos: &UtxoSet) -> Verdict {
        let venue = self.venue.detect(metadata, Some(utxos));
        if !venue.is_venue {
            return Verdict::NotVenue;
        }

        let flow = self.flow.classify(utxos);
        if flow.is_notifiable_buy() {
            let value = self.value.estimate(utxos);
            return Verdict::Buy { venue, flow, value };
        }
        if flow.trade_type == TradeType::Sell && flow.amount > 0 {
            return Verdict::Sell { venue, flow };
        }
        Verdict::Ambiguous { venue, flow }
    }
}
