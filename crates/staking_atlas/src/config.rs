//! Optional JSON config file for endpoints and the curated registry.
//!
//! Load from: env `STAKING_ATLAS_CONFIG_PATH`, or `./config/staking_atlas.json`,
//! or `./staking_atlas.json`. Any field left out keeps its default.

use crate::chain::FetchConfig;
use crate::staking::DEFAULT_IMAGE_BASE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "STAKING_ATLAS_CONFIG_PATH";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Baker list endpoint (BakingBad `/v2/bakers` shape).
    #[serde(default)]
    pub bakers_url: Option<String>,
    /// Tezos node RPC base URL.
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub cache_max_age_secs: Option<u64>,
    /// Curated validator list (JSON array of `{id, name, description, website, image?}`).
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
    /// Prefix for logos of registry entries without an explicit `image`.
    #[serde(default)]
    pub registry_image_base: Option<String>,
}

impl AtlasConfig {
    /// Load config from path. Returns default (empty) on a missing or unreadable file.
    pub fn load_from_path(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let p = Path::new(&path);
            if p.exists() {
                return Self::load_from_path(p);
            }
        }
        for candidate in [
            Path::new("./config/staking_atlas.json"),
            Path::new("./staking_atlas.json"),
        ] {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }
        Self::default()
    }

    /// Fetch settings with this file's overrides applied on top of `base`.
    pub fn fetch_config(&self, base: FetchConfig) -> FetchConfig {
        FetchConfig {
            bakers_url: self.bakers_url.clone().unwrap_or(base.bakers_url),
            rpc_url: self.rpc_url.clone().unwrap_or(base.rpc_url),
            cache_max_age_secs: self.cache_max_age_secs.unwrap_or(base.cache_max_age_secs),
            ..base
        }
    }

    pub fn image_base(&self) -> &str {
        self.registry_image_base
            .as_deref()
            .unwrap_or(DEFAULT_IMAGE_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"rpc_url":"http://localhost:8732","cache_max_age_secs":5}}"#).unwrap();
        let cfg = AtlasConfig::load_from_path(f.path());
        let fetch = cfg.fetch_config(FetchConfig::default());
        assert_eq!(fetch.rpc_url, "http://localhost:8732");
        assert_eq!(fetch.cache_max_age_secs, 5);
        assert_eq!(fetch.bakers_url, crate::chain::DEFAULT_BAKERS_URL);
        assert_eq!(cfg.image_base(), DEFAULT_IMAGE_BASE);
    }

    #[test]
    fn missing_or_malformed_file_is_default() {
        assert_eq!(
            AtlasConfig::load_from_path(Path::new("/nonexistent/atlas.json")),
            AtlasConfig::default()
        );
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{ nope").unwrap();
        assert_eq!(AtlasConfig::load_from_path(f.path()), AtlasConfig::default());
    }
}
