//! Brand configuration loaded from `brandconfig.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SlideError};

pub const BRANDCONFIG_PATH_VAR: &str = "BRANDCONFIG_PATH";
pub const DEFAULT_BRANDCONFIG_PATH: &str = "brandingAssets/brandconfig.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub digital_tide: String,
    pub retail_stone: String,
    pub cloud_commerce: String,
    pub midnight_trade: String,
    pub checkout_gold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fonts {
    pub primary: String,
    pub websafe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoPaths {
    pub single_logo: String,
    pub all_logos: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imagery {
    pub brand_guide_pdf: String,
    pub colour_palette: String,
    pub photo_style: String,
    pub core_elements: String,
    pub powerpoint_example: String,
    pub stock_dir: String,
    pub headshots_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    pub name: String,
    pub title: String,
    pub email: String,
    pub image_path: String,
}

/// Validated branding context threaded into prompts and cache fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandContext {
    pub brand_name: String,
    pub tagline: String,
    pub palette: Palette,
    pub fonts: Fonts,
    pub logo_paths: LogoPaths,
    pub imagery: Imagery,
    pub stakeholders: Vec<Stakeholder>,
    /// Any additional fields present in the file.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    /// Where this context was loaded from; never part of a fingerprint.
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl BrandContext {
    /// Parses and validates a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let context: BrandContext = serde_json::from_str(raw)
            .map_err(|e| SlideError::Config(format!("brandconfig.json is invalid: {}", e)))?;
        context.validate()?;
        Ok(context)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SlideError::Config(format!(
                "Unable to read brandconfig.json at {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut context = Self::from_json(&raw)?;
        context.config_file = Some(path.to_path_buf());
        log::info!(
            "Loaded brandconfig for \"{}\" with {} stakeholders",
            context.brand_name,
            context.stakeholders.len()
        );
        Ok(context)
    }

    /// Loads from `$BRANDCONFIG_PATH`, or the default location.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(BRANDCONFIG_PATH_VAR)
            .unwrap_or_else(|_| DEFAULT_BRANDCONFIG_PATH.to_string());
        Self::load(path)
    }

    fn validate(&self) -> Result<()> {
        if self.stakeholders.is_empty() {
            return Err(SlideError::Config(
                "brandconfig.json must include at least one stakeholder".to_string(),
            ));
        }
        Ok(())
    }

    /// Public fields as JSON with underscore-prefixed keys removed at every depth.
    pub fn fingerprint_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        strip_private(&mut value);
        value
    }
}

fn strip_private(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.starts_with('_'));
            map.values_mut().for_each(strip_private);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_private),
        _ => {}
    }
}
