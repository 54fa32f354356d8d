//! Faceted filtering: selection state and the refetching composers.

pub mod composer;
pub mod selection;

pub use composer::{BoardOutfits, TrendsExplorer};
pub use selection::{Connector, GarmentQuery, OutfitFilter};
