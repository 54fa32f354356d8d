// Server resource models
//
// All structs deserialize from the camelCase JSON produced by the casing
// shim (see `casing.rs`), which is why the serde renames here are
// camelCase rather than the backend's snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse-grained stage of an analysis job, as reported by the server.
///
/// Monotonic non-decreasing along pending -> scraping -> analyzing ->
/// completed, except for the absorbing `failed` state, which is reachable
/// from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    Pending,
    Scraping,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisPhase {
    /// Terminal phases stop the polling loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisPhase::Completed | AnalysisPhase::Failed)
    }
}

/// Snapshot of an analysis job, polled from `GET /api/boards/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    pub status: String,
    pub phase: AnalysisPhase,
    #[serde(default)]
    pub pins_total: u32,
    #[serde(default)]
    pub pins_analyzed: u32,
    #[serde(default)]
    pub outfits_created: u32,
    #[serde(default)]
    pub garments_created: u32,
}

/// 202 body returned by the analyze-trigger endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAccepted {
    pub message: String,
    pub board_id: String,
}

/// An imported collection of source images with one analysis job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub pinterest_url: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub pins_count: u32,
    pub status: AnalysisPhase,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub outfits_count: Option<u32>,
    #[serde(default)]
    pub garments_count: Option<u32>,
}

/// A detected clothing ensemble within a single source image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: String,
    #[serde(default)]
    pub board_id: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub cloudinary_url: Option<String>,
    pub style: Option<String>,
    pub season: Option<String>,
    #[serde(default)]
    pub source_pin_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub garments: Option<Vec<Garment>>,
    #[serde(default)]
    pub garments_count: Option<u32>,
}

impl Outfit {
    /// Garment count used for display sorting. Falls back to the embedded
    /// garment list when the server did not send an explicit count.
    pub fn garment_count(&self) -> usize {
        self.garments_count
            .map(|n| n as usize)
            .or_else(|| self.garments.as_ref().map(Vec::len))
            .unwrap_or(0)
    }
}

/// A single clothing item detected within an outfit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garment {
    pub id: String,
    #[serde(default)]
    pub outfit_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub garment_type: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub season: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub products: Option<Vec<Product>>,
}

/// A similar-product match found for a garment.
///
/// `url` arrives on the wire as `product_url`; the casing shim renames it
/// before deserialization (documented override).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub garment_id: Option<String>,
    pub name: String,
    pub price: Option<String>,
    pub store: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub similarity: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// Server-computed `(value, count)` aggregate used to populate filter
/// option lists. Read-only to the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Facet {
    pub name: String,
    pub count: u32,
}

/// Season/style facets for a board's outfits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitFacets {
    #[serde(default)]
    pub seasons: Vec<Facet>,
    #[serde(default)]
    pub styles: Vec<Facet>,
}

/// Color facet count, optionally scoped by the active garment filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColorRank {
    pub color: String,
    pub count: u32,
}

/// Per-name count inside a garment-type rank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GarmentRank {
    pub name: String,
    pub count: u32,
}

/// Garment-type rank with its per-name breakdown, from `/trends`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarmentTypeRank {
    #[serde(rename = "type")]
    pub garment_type: String,
    pub count: u32,
    #[serde(default)]
    pub garments: Vec<GarmentRank>,
}
