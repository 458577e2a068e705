use std::collections::{BTreeMap, HashMap};

/// In-memory lookup from on-chain address to venue name.
#[derive(Debug, Clone, Default)]
pub struct VenueRegistry {
    by_address: HashMap<String, String>,
}

impl VenueRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the configured `name -> address` table.
    pub fn from_config(venues: &BTreeMap<String, String>) -> Self {
        let mut registry = Self::empty();
        for (name, address) in venues {
            if address.is_empty() {
                tracing::warn!("Venue {name} has no address configured, ignoring");
                continue;
            }
            registry.insert(name, address);
        }
        tracing::info!("VenueRegistry loaded {} venue addresses", registry.len());
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, address: impl Into<String>) {
        self.by_address.insert(address.into(), name.into());
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    /// Venue name registered for an address, if any.
    pub fn venue_for(&self, address: &str) -> Option<&str> {
        self.by_address.get(address).map(String::as_str)
    }

    pub fn is_venue(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }
}
