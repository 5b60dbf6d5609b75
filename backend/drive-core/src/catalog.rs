//! Numbered image selection
//!
//! The media can carry several images named like `disc000.img`, `disc001.img`, ... Each insertion
//! loads the image the catalog points at and then moves the catalog on, so removing and
//! reinserting the media steps through the images in order.

#[cfg(test)]
mod tests;

use crate::DriveResult;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CatalogConfig {
    pub name_prefix: String,
    pub name_suffix: String,
    /// Zero-padded width used when displaying image names; lookups accept any width.
    pub number_width: usize,
    pub first_number: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            name_prefix: "disc".into(),
            name_suffix: ".img".into(),
            number_width: 3,
            first_number: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageCatalog {
    config: CatalogConfig,
    pattern: Regex,
    current: u32,
}

impl ImageCatalog {
    /// # Errors
    ///
    /// Returns an error if the configured prefix/suffix cannot be turned into a name pattern.
    pub fn new(config: CatalogConfig) -> DriveResult<Self> {
        // FAT file names are case-insensitive
        let pattern = Regex::new(&format!(
            "(?i)^{}([0-9]+){}$",
            regex::escape(&config.name_prefix),
            regex::escape(&config.name_suffix)
        ))?;
        let current = config.first_number;

        Ok(Self { config, pattern, current })
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[must_use]
    pub fn current_number(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn current_name(&self) -> String {
        let CatalogConfig { name_prefix, name_suffix, number_width, .. } = &self.config;
        format!("{name_prefix}{:0number_width$}{name_suffix}", self.current)
    }

    /// Image number encoded in `file_name`, if it follows the naming pattern.
    #[must_use]
    pub fn parse_number(&self, file_name: &str) -> Option<u32> {
        let captures = self.pattern.captures(file_name)?;
        captures.get(1)?.as_str().parse().ok()
    }

    #[must_use]
    pub fn matches_current(&self, file_name: &str) -> bool {
        self.parse_number(file_name) == Some(self.current)
    }

    pub fn advance(&mut self) {
        self.current = self.current.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.current = self.config.first_number;
    }
}
