//! Core type definitions for the scraper

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{NutriError, Result};

/// Timestamp layout used in the URL collection file
pub const COLLECTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Browsers the scraper knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
    Opera,
}

impl BrowserKind {
    /// Fixed candidate order; "first available" means first in this list
    pub const ALL: [BrowserKind; 4] = [Self::Chrome, Self::Firefox, Self::Edge, Self::Opera];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Edge => "edge",
            Self::Opera => "opera",
        }
    }

    /// Chrome, Edge and Opera share the Chromium engine and its DevTools protocol
    pub fn is_chromium(&self) -> bool {
        !matches!(self, Self::Firefox)
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = NutriError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" | "google-chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "edge" | "msedge" | "microsoft-edge" => Ok(Self::Edge),
            "opera" => Ok(Self::Opera),
            _ => Err(NutriError::UnknownBrowser(s.to_string())),
        }
    }
}

/// An installed browser found at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserDescriptor {
    pub kind: BrowserKind,
    pub executable_path: PathBuf,
}

impl BrowserDescriptor {
    pub fn new(kind: BrowserKind, executable_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            executable_path: executable_path.into(),
        }
    }
}

/// Absolute product URL with query and fragment stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductUrl(String);

impl ProductUrl {
    /// Parse and normalize a raw href
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self(Self::normalize(raw)?))
    }

    /// Keep scheme, authority and path; drop query and fragment.
    ///
    /// Normalizing an already normalized URL returns it unchanged.
    pub fn normalize(raw: &str) -> Result<String> {
        let mut url = Url::parse(raw.trim())?;
        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ProductUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Persisted output of a URL collection pass
///
/// Serialized as `{ "urls": [...], "total": n, "data_coleta": "YYYY-MM-DD HH:MM:SS" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCollectionRecord {
    pub urls: Vec<String>,
    pub total: usize,
    #[serde(rename = "data_coleta")]
    pub collected_at: String,
}

impl UrlCollectionRecord {
    /// Build a record from URLs in discovery order, dropping repeats
    pub fn new<I>(urls: I, collected_at: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = ProductUrl>,
    {
        let mut seen = HashSet::new();
        let urls: Vec<String> = urls
            .into_iter()
            .map(ProductUrl::into_string)
            .filter(|url| seen.insert(url.clone()))
            .collect();

        Self {
            total: urls.len(),
            urls,
            collected_at: collected_at.format(COLLECTED_AT_FORMAT).to_string(),
        }
    }

    /// Check `total == urls.len()` and that no URL repeats
    pub fn validate(&self) -> Result<()> {
        if self.total != self.urls.len() {
            return Err(NutriError::InvalidRecord(format!(
                "total is {} but {} URLs are listed",
                self.total,
                self.urls.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.urls.iter().find(|url| !seen.insert(url.as_str())) {
            return Err(NutriError::InvalidRecord(format!("duplicate URL {}", dup)));
        }

        Ok(())
    }

    /// Parse the listed URLs, skipping repeats and anything unparsable
    pub fn product_urls(&self) -> Vec<ProductUrl> {
        let mut seen = HashSet::new();
        self.urls
            .iter()
            .filter_map(|raw| ProductUrl::parse(raw).ok())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

/// Nutrient columns recognised in the nutrition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientField {
    Calories,
    Carbohydrates,
    Protein,
    TotalFat,
    SaturatedFat,
    Fiber,
    Sugars,
    Sodium,
}

impl NutrientField {
    pub const ALL: [NutrientField; 8] = [
        Self::Calories,
        Self::Carbohydrates,
        Self::Protein,
        Self::TotalFat,
        Self::SaturatedFat,
        Self::Fiber,
        Self::Sugars,
        Self::Sodium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calories => "calories",
            Self::Carbohydrates => "carbohydrates",
            Self::Protein => "protein",
            Self::TotalFat => "total_fat",
            Self::SaturatedFat => "saturated_fat",
            Self::Fiber => "fiber",
            Self::Sugars => "sugars",
            Self::Sodium => "sodium",
        }
    }
}

impl std::fmt::Display for NutrientField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product's nutrition facts, written as one CSV row
///
/// Nutrients absent from the page stay at `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub name: String,
    pub category: Option<String>,
    pub url: String,
    pub portion: String,
    pub calories: f64,
    pub carbohydrates: f64,
    pub protein: f64,
    pub total_fat: f64,
    pub saturated_fat: f64,
    pub fiber: f64,
    pub sugars: f64,
    pub sodium: f64,
}

impl NutritionRecord {
    /// CSV column order
    pub const HEADER: [&'static str; 12] = [
        "name",
        "category",
        "url",
        "portion",
        "calories",
        "carbohydrates",
        "protein",
        "total_fat",
        "saturated_fat",
        "fiber",
        "sugars",
        "sodium",
    ];

    /// Empty record for a URL, all nutrients at zero
    pub fn for_url(url: impl Into<String>, category: Option<String>) -> Self {
        Self {
            url: url.into(),
            category,
            ..Self::default()
        }
    }

    pub fn set(&mut self, field: NutrientField, value: f64) {
        *self.slot(field) = value;
    }

    pub fn get(&self, field: NutrientField) -> f64 {
        match field {
            NutrientField::Calories => self.calories,
            NutrientField::Carbohydrates => self.carbohydrates,
            NutrientField::Protein => self.protein,
            NutrientField::TotalFat => self.total_fat,
            NutrientField::SaturatedFat => self.saturated_fat,
            NutrientField::Fiber => self.fiber,
            NutrientField::Sugars => self.sugars,
            NutrientField::Sodium => self.sodium,
        }
    }

    fn slot(&mut self, field: NutrientField) -> &mut f64 {
        match field {
            NutrientField::Calories => &mut self.calories,
            NutrientField::Carbohydrates => &mut self.carbohydrates,
            NutrientField::Protein => &mut self.protein,
            NutrientField::TotalFat => &mut self.total_fat,
            NutrientField::SaturatedFat => &mut self.saturated_fat,
            NutrientField::Fiber => &mut self.fiber,
            NutrientField::Sugars => &mut self.sugars,
            NutrientField::Sodium => &mut self.sodium,
        }
    }

    /// True when every nutrient is still at its default
    pub fn nutrients_are_zero(&self) -> bool {
        NutrientField::ALL.iter().all(|field| self.get(*field) == 0.0)
    }
}
