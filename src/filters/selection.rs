// Filter selection state
//
// Two selection shapes feed the filtered queries: a pair of plain
// multi-select sets (season/style on the board view) and an ordered
// garment-name sequence joined by boolean connectors plus a color set
// (trends view). Both translate themselves into query parameters;
// an empty dimension is omitted entirely - absence of a filter is not
// a filter matching nothing.

use std::collections::BTreeSet;
use std::fmt;

/// Boolean operator positioned between two adjacent selected garment
/// names. Connector `i` joins garment `i` and garment `i+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    Or,
    And,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::Or => "or",
            Connector::And => "and",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Connector::Or => Connector::And,
            Connector::And => Connector::Or,
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Season/style multi-select for the board-detail view.
///
/// OR within each dimension, AND across the two dimensions (the backend
/// composes them that way).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutfitFilter {
    seasons: BTreeSet<String>,
    styles: BTreeSet<String>,
}

impl OutfitFilter {
    /// Flip membership of a season value.
    pub fn toggle_season(&mut self, value: &str) {
        Self::toggle(&mut self.seasons, value);
    }

    /// Flip membership of a style value.
    pub fn toggle_style(&mut self, value: &str) {
        Self::toggle(&mut self.styles, value);
    }

    fn toggle(set: &mut BTreeSet<String>, value: &str) {
        if !set.remove(value) {
            set.insert(value.to_string());
        }
    }

    /// Empty all selection sets.
    pub fn clear(&mut self) {
        self.seasons.clear();
        self.styles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty() && self.styles.is_empty()
    }

    pub fn seasons(&self) -> impl Iterator<Item = &str> {
        self.seasons.iter().map(String::as_str)
    }

    pub fn styles(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(String::as_str)
    }

    /// Query parameters for the outfit list. Empty dimensions produce no
    /// parameters at all.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for season in &self.seasons {
            params.push(("outfit_season".to_string(), season.clone()));
        }
        for style in &self.styles {
            params.push(("outfit_style".to_string(), style.clone()));
        }
        params
    }
}

/// Garment-name filter with boolean connectors plus a color OR-group,
/// for the trends view.
///
/// Invariant: `connectors.len() == max(0, garments.len() - 1)` after
/// every mutation. Removing garment `i` removes the connector that
/// joined it to its predecessor (or to its successor when it was first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GarmentQuery {
    garments: Vec<String>,
    connectors: Vec<Connector>,
    colors: BTreeSet<String>,
    garment_type: Option<String>,
}

impl GarmentQuery {
    /// Toggle a garment name: remove it (with its connector) when already
    /// selected, otherwise append it with a default OR connector.
    pub fn toggle_garment(&mut self, name: &str) {
        match self.garments.iter().position(|g| g == name) {
            Some(index) => self.remove_at(index),
            None => {
                if !self.garments.is_empty() {
                    self.connectors.push(Connector::Or);
                }
                self.garments.push(name.to_string());
            }
        }
        debug_assert_eq!(
            self.connectors.len(),
            self.garments.len().saturating_sub(1)
        );
    }

    /// Remove a garment name if present. Idempotent.
    pub fn remove_garment(&mut self, name: &str) {
        if let Some(index) = self.garments.iter().position(|g| g == name) {
            self.remove_at(index);
        }
    }

    fn remove_at(&mut self, index: usize) {
        self.garments.remove(index);
        if !self.connectors.is_empty() {
            self.connectors.remove(index.saturating_sub(1));
        }
    }

    /// Flip one connector between OR and AND. Out-of-range indices are
    /// ignored.
    pub fn toggle_connector(&mut self, index: usize) {
        if let Some(connector) = self.connectors.get_mut(index) {
            *connector = connector.toggled();
        }
    }

    /// Set every connector in one operation. With fewer than two garments
    /// selected there are no connectors, so this is a no-op.
    pub fn set_all_connectors(&mut self, value: Connector) {
        for connector in &mut self.connectors {
            *connector = value;
        }
    }

    /// Flip membership of a color in the OR-group.
    pub fn toggle_color(&mut self, color: &str) {
        if !self.colors.remove(color) {
            self.colors.insert(color.to_string());
        }
    }

    /// Remove a color if selected. Idempotent.
    pub fn remove_color(&mut self, color: &str) {
        self.colors.remove(color);
    }

    /// Restrict the single garment-type shortcut filter. Only sent when
    /// no garment names and no colors are selected.
    pub fn set_garment_type(&mut self, garment_type: Option<String>) {
        self.garment_type = garment_type;
    }

    /// Drop selected colors that are no longer offered by the facet list.
    /// Returns the pruned values so callers can log them.
    pub fn prune_colors(&mut self, available: &BTreeSet<String>) -> Vec<String> {
        let stale: Vec<String> = self
            .colors
            .iter()
            .filter(|c| !available.contains(*c))
            .cloned()
            .collect();
        for color in &stale {
            self.colors.remove(color);
        }
        stale
    }

    pub fn clear(&mut self) {
        self.garments.clear();
        self.connectors.clear();
        self.colors.clear();
        self.garment_type = None;
    }

    pub fn garments(&self) -> &[String] {
        &self.garments
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn colors(&self) -> impl Iterator<Item = &str> {
        self.colors.iter().map(String::as_str)
    }

    pub fn has_garments(&self) -> bool {
        !self.garments.is_empty()
    }

    fn connectors_param(&self) -> Option<String> {
        if self.garments.len() < 2 {
            return None;
        }
        Some(
            self.connectors
                .iter()
                .map(Connector::as_str)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Query parameters for the filtered outfit list:
    /// repeated `garment_name` with the comma-joined `connectors`,
    /// repeated `garment_color`, or the `garment_type` shortcut when
    /// neither names nor colors are selected.
    pub fn outfit_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for name in &self.garments {
            params.push(("garment_name".to_string(), name.clone()));
        }
        if let Some(connectors) = self.connectors_param() {
            params.push(("connectors".to_string(), connectors));
        }
        for color in &self.colors {
            params.push(("garment_color".to_string(), color.clone()));
        }
        if self.garments.is_empty() && self.colors.is_empty() {
            if let Some(garment_type) = &self.garment_type {
                params.push(("garment_type".to_string(), garment_type.clone()));
            }
        }
        params
    }

    /// Query parameters for the cross-filtered color facets: only the
    /// garment-name portion of the filter scopes the palette.
    pub fn color_trends_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for name in &self.garments {
            params.push(("garment_name".to_string(), name.clone()));
        }
        if let Some(connectors) = self.connectors_param() {
            params.push(("connectors".to_string(), connectors));
        }
        params
    }
}
