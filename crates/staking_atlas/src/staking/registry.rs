//! Curated validator identities and the merged address-keyed validator map.
//!
//! The registry is read-only input: callers load it once and pass it in, the
//! merge never writes back. A [`ValidatorMap`] is rebuilt on every poll and
//! then shared immutably behind an `Arc`.

use crate::staking::types::{StakeValidator, Validator, ValidatorIdentity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info};

/// Where curated logos live when a registry entry has no explicit `image`.
pub const DEFAULT_IMAGE_BASE: &str =
    "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/tezos/validators/assets";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate registry entry: {0}")]
    Duplicate(String),
}

/// Source of curated identities keyed by validator address.
pub trait IdentityLookup {
    fn identity(&self, address: &str) -> Option<&ValidatorIdentity>;
}

impl IdentityLookup for HashMap<String, ValidatorIdentity> {
    fn identity(&self, address: &str) -> Option<&ValidatorIdentity> {
        self.get(address)
    }
}

impl IdentityLookup for BTreeMap<String, ValidatorIdentity> {
    fn identity(&self, address: &str) -> Option<&ValidatorIdentity> {
        self.get(address)
    }
}

/// One entry of the curated validator list file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Curated identities loaded from a JSON list.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: HashMap<String, ValidatorIdentity>,
}

impl Registry {
    pub fn from_entries(
        entries: Vec<RegistryEntry>,
        image_base: &str,
    ) -> Result<Self, RegistryError> {
        let base = image_base.trim_end_matches('/');
        let mut map = HashMap::with_capacity(entries.len());
        for e in entries {
            let image = e
                .image
                .unwrap_or_else(|| format!("{}/{}/logo.png", base, e.id.to_lowercase()));
            let identity = ValidatorIdentity {
                name: e.name,
                description: e.description,
                image,
                website: e.website,
            };
            if map.insert(e.id.clone(), identity).is_some() {
                return Err(RegistryError::Duplicate(e.id));
            }
        }
        Ok(Self { entries: map })
    }

    pub fn from_json(json: &str, image_base: &str) -> Result<Self, RegistryError> {
        let entries: Vec<RegistryEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries, image_base)
    }

    pub fn load_from_path(path: &Path, image_base: &str) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&content, image_base)?;
        info!(path = %path.display(), count = registry.len(), "loaded validator registry");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityLookup for Registry {
    fn identity(&self, address: &str) -> Option<&ValidatorIdentity> {
        self.entries.get(address)
    }
}

/// Join live validator data with its curated identity.
///
/// A validator missing from the registry is still resolvable, just unbranded
/// and reported inactive.
pub fn merge_validator(
    address: &str,
    validator: &Validator,
    lookup: &impl IdentityLookup,
) -> StakeValidator {
    match lookup.identity(address) {
        Some(info) => StakeValidator {
            id: address.to_string(),
            status: validator.status,
            info: info.clone(),
            details: validator.details.clone(),
        },
        None => StakeValidator {
            id: address.to_string(),
            status: false,
            info: ValidatorIdentity::default(),
            details: validator.details.clone(),
        },
    }
}

/// Address-keyed snapshot of merged validators for one poll.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorMap(BTreeMap<String, StakeValidator>);

impl ValidatorMap {
    pub fn build(validators: &[Validator], lookup: &impl IdentityLookup) -> Self {
        let map: BTreeMap<_, _> = validators
            .iter()
            .map(|v| (v.id.clone(), merge_validator(&v.id, v, lookup)))
            .collect();
        debug!(count = map.len(), "built validator map");
        Self(map)
    }

    pub fn get(&self, address: &str) -> Option<&StakeValidator> {
        self.0.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &StakeValidator> {
        self.0.values()
    }
}

impl FromIterator<StakeValidator> for ValidatorMap {
    fn from_iter<I: IntoIterator<Item = StakeValidator>>(iter: I) -> Self {
        Self(iter.into_iter().map(|v| (v.id.clone(), v)).collect())
    }
}

/// Holder for the current validator map. Refreshes swap in a whole new map;
/// readers keep whatever `Arc` they already took.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: RwLock<Arc<ValidatorMap>>,
}

impl SnapshotCell {
    pub fn new(map: ValidatorMap) -> Self {
        Self {
            current: RwLock::new(Arc::new(map)),
        }
    }

    pub fn current(&self) -> Arc<ValidatorMap> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Publish a freshly built map and return the one it replaced.
    pub fn replace(&self, map: ValidatorMap) -> Arc<ValidatorMap> {
        let next = Arc::new(map);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::types::StakingDetails;

    const REGISTRY: &str = r#"[
        {"id":"tz2FCNBrERXtaTtNX6iimR1UJ5JSDxvdHM93","name":"stake.fish",
         "description":"Leading validator for Proof of Stake blockchains.",
         "website":"https://stake.fish/"}
    ]"#;

    fn live(id: &str, status: bool) -> Validator {
        Validator {
            id: id.into(),
            status,
            details: StakingDetails::default(),
        }
    }

    #[test]
    fn registry_derives_lowercase_image() {
        let r = Registry::from_json(REGISTRY, DEFAULT_IMAGE_BASE).unwrap();
        let id = r.identity("tz2FCNBrERXtaTtNX6iimR1UJ5JSDxvdHM93").unwrap();
        assert_eq!(
            id.image,
            "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/tezos/validators/assets/tz2fcnbrerxtattnx6iimr1uj5jsdxvdhm93/logo.png"
        );
        assert_eq!(id.website, "https://stake.fish/");
    }

    #[test]
    fn registry_rejects_duplicates() {
        let json = r#"[{"id":"tz1a","name":"a"},{"id":"tz1a","name":"b"}]"#;
        assert!(matches!(
            Registry::from_json(json, DEFAULT_IMAGE_BASE),
            Err(RegistryError::Duplicate(id)) if id == "tz1a"
        ));
    }

    #[test]
    fn merge_known_keeps_live_status() {
        let r = Registry::from_json(REGISTRY, DEFAULT_IMAGE_BASE).unwrap();
        let addr = "tz2FCNBrERXtaTtNX6iimR1UJ5JSDxvdHM93";
        let sv = merge_validator(addr, &live(addr, true), &r);
        assert!(sv.status);
        assert_eq!(sv.info.name, "stake.fish");
        let sv = merge_validator(addr, &live(addr, false), &r);
        assert!(!sv.status);
    }

    #[test]
    fn merge_unknown_is_unbranded_and_inactive() {
        let r = Registry::default();
        let sv = merge_validator("tz1other", &live("tz1other", true), &r);
        assert!(!sv.status);
        assert_eq!(sv.info, ValidatorIdentity::default());
        assert_eq!(sv.id, "tz1other");
    }

    #[test]
    fn build_map_with_fabricated_lookup() {
        let mut lookup = HashMap::new();
        lookup.insert(
            "tz1a".to_string(),
            ValidatorIdentity {
                name: "A".into(),
                ..Default::default()
            },
        );
        let map = ValidatorMap::build(&[live("tz1a", true), live("tz1b", true)], &lookup);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("tz1a").unwrap().info.name, "A");
        assert!(!map.get("tz1b").unwrap().status);
    }

    #[test]
    fn snapshot_cell_readers_keep_old_map() {
        let first = ValidatorMap::build(&[live("tz1a", true)], &Registry::default());
        let cell = SnapshotCell::new(first);
        let held = cell.current();
        let old = cell.replace(ValidatorMap::default());
        assert!(Arc::ptr_eq(&held, &old));
        assert_eq!(held.len(), 1);
        assert!(cell.current().is_empty());
    }
}
