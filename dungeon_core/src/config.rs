use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::denomination::{DenominationError, DenominationSet};

/// Client configuration. Every field has a literal default so a bare
/// `ClientConfig::default()` runs an expedition out of the box; a JSON file
/// can override any subset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    economy: EconomyConfig,
    map: MapConfig,
    crystal: CrystalConfig,
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ClientConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ClientConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ClientConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn economy(&self) -> &EconomyConfig {
        &self.economy
    }

    pub fn map(&self) -> &MapConfig {
        &self.map
    }

    pub fn crystal(&self) -> &CrystalConfig {
        &self.crystal
    }
}

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("failed to parse client config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read client config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid denomination set: {0}")]
    Denominations(#[from] DenominationError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    starting_crystals: u32,
    drain_rate: f64,
    drain_acceleration: f64,
    room_unit_cap: usize,
    build_offset: (f32, f32),
    escort_travel_floor_secs: f64,
}

impl EconomyConfig {
    pub fn starting_crystals(&self) -> u32 {
        self.starting_crystals
    }

    pub fn drain_rate(&self) -> f64 {
        self.drain_rate
    }

    pub fn drain_acceleration(&self) -> f64 {
        self.drain_acceleration
    }

    pub fn room_unit_cap(&self) -> usize {
        self.room_unit_cap
    }

    pub fn build_offset(&self) -> (f32, f32) {
        self.build_offset
    }

    /// Escort crystals that would arrive faster than this double in value.
    pub fn escort_travel_floor_secs(&self) -> f64 {
        self.escort_travel_floor_secs
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_crystals: 100,
            drain_rate: 1.0,
            drain_acceleration: 1.2,
            room_unit_cap: 10,
            build_offset: (0.0, 2.0),
            escort_travel_floor_secs: 1.0 / 6.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    room_width: u32,
    room_height: u32,
    viewport_extent: (f32, f32),
    scroll_secs: f64,
}

impl MapConfig {
    pub fn room_width(&self) -> u32 {
        self.room_width
    }

    pub fn room_height(&self) -> u32 {
        self.room_height
    }

    pub fn viewport_extent(&self) -> (f32, f32) {
        self.viewport_extent
    }

    pub fn scroll_secs(&self) -> f64 {
        self.scroll_secs
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            room_width: 16,
            room_height: 12,
            viewport_extent: (16.0, 12.0),
            scroll_secs: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrystalConfig {
    values: Vec<u32>,
    stay_secs: f64,
}

impl CrystalConfig {
    /// Validate and build the denomination set; a set that cannot decompose
    /// exactly is rejected here, before any session starts.
    pub fn denominations(&self) -> Result<DenominationSet, DenominationError> {
        DenominationSet::new(self.values.clone())
    }

    pub fn stay_secs(&self) -> f64 {
        self.stay_secs
    }
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            values: vec![1, 4, 16],
            stay_secs: 20.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_a_valid_denomination_set() {
        let config = ClientConfig::default();
        let set = config.crystal().denominations().unwrap();
        assert_eq!(set.smallest().0, 1);
        assert_eq!(set.largest().0, 16);
    }

    #[test]
    fn json_overrides_a_subset_of_fields() {
        let config = ClientConfig::from_json_str(
            r#"{ "economy": { "drain_rate": 2.0 }, "crystal": { "values": [1, 5, 25] } }"#,
        )
        .unwrap();
        assert_eq!(config.economy().drain_rate(), 2.0);
        assert_eq!(config.economy().drain_acceleration(), 1.2);
        assert!(config.crystal().denominations().is_ok());
    }

    #[test]
    fn non_decomposing_denomination_sets_are_rejected() {
        let config =
            ClientConfig::from_json_str(r#"{ "crystal": { "values": [1, 3, 5] } }"#).unwrap();
        assert!(config.crystal().denominations().is_err());
    }
}
