// Facet filter composers
//
// Owns the filter state for one view session and re-fetches the filtered
// result set whenever the selection changes. Refetches race when filters
// are toggled in quick succession, so every mutation bumps a generation
// counter captured at fetch time and compared at apply time: only the
// response matching the latest filter state is applied, stale ones are
// discarded. While a refetch is in flight the previously displayed list
// stays visible (a loading flag is exposed for the renderer); a failed
// refetch clears the list rather than leaving data that does not match
// the active filter.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::api::models::{ColorRank, GarmentTypeRank, Outfit, OutfitFacets};
use crate::api::{ApiError, OutfitApi};
use crate::filters::selection::{Connector, GarmentQuery, OutfitFilter};

/// Stable sort, garment-richest outfits first. Ties keep server order.
fn sort_by_garment_count(outfits: &mut [Outfit]) {
    outfits.sort_by(|a, b| b.garment_count().cmp(&a.garment_count()));
}

/// Board-detail view state: season/style filtered outfit list.
pub struct BoardOutfits<A: OutfitApi> {
    api: Arc<A>,
    board_id: String,
    filter: OutfitFilter,
    generation: u64,
    outfits: Vec<Outfit>,
    facets: OutfitFacets,
    loading: bool,
    error: Option<String>,
}

impl<A: OutfitApi> BoardOutfits<A> {
    pub fn new(api: Arc<A>, board_id: impl Into<String>) -> Self {
        Self {
            api,
            board_id: board_id.into(),
            filter: OutfitFilter::default(),
            generation: 0,
            outfits: Vec::new(),
            facets: OutfitFacets::default(),
            loading: false,
            error: None,
        }
    }

    /// Initial load: facets plus the unfiltered outfit list. Selection
    /// changes after this point go through `refresh`.
    pub async fn load(&mut self) {
        let api = Arc::clone(&self.api);
        match api.outfit_facets(&self.board_id).await {
            Ok(facets) => self.facets = facets,
            Err(e) => tracing::warn!(error = %e, "outfit facets fetch failed"),
        }
        let generation = self.generation;
        self.loading = true;
        let result = api.filtered_outfits(&self.board_id, &[]).await;
        self.apply_outfits(generation, result);
    }

    pub fn toggle_season(&mut self, value: &str) {
        self.filter.toggle_season(value);
        self.generation += 1;
    }

    pub fn toggle_style(&mut self, value: &str) {
        self.filter.toggle_style(value);
        self.generation += 1;
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.generation += 1;
    }

    /// Re-fetch the outfit list for the current selection.
    pub async fn refresh(&mut self) {
        let generation = self.generation;
        let query = self.filter.to_query();
        self.loading = true;
        let api = Arc::clone(&self.api);
        let result = api.filtered_outfits(&self.board_id, &query).await;
        self.apply_outfits(generation, result);
    }

    fn apply_outfits(&mut self, generation: u64, result: Result<Vec<Outfit>, ApiError>) {
        if generation != self.generation {
            tracing::trace!(
                stale = generation,
                current = self.generation,
                "discarding stale outfit response"
            );
            return;
        }
        self.loading = false;
        match result {
            Ok(mut outfits) => {
                sort_by_garment_count(&mut outfits);
                self.outfits = outfits;
                self.error = None;
            }
            Err(e) => {
                // Do not leave results on screen that may not match the
                // active filter.
                self.outfits.clear();
                self.error = Some(e.detail);
            }
        }
    }

    pub fn outfits(&self) -> &[Outfit] {
        &self.outfits
    }

    pub fn facets(&self) -> &OutfitFacets {
        &self.facets
    }

    pub fn filter(&self) -> &OutfitFilter {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Trends view state: garment-name filter with connectors, color
/// OR-group, cross-filtered color facets, and the rank list.
pub struct TrendsExplorer<A: OutfitApi> {
    api: Arc<A>,
    board_id: String,
    query: GarmentQuery,
    generation: u64,
    outfits: Vec<Outfit>,
    color_facets: Vec<ColorRank>,
    type_ranks: Vec<GarmentTypeRank>,
    loading: bool,
    error: Option<String>,
}

impl<A: OutfitApi> TrendsExplorer<A> {
    pub fn new(api: Arc<A>, board_id: impl Into<String>) -> Self {
        Self {
            api,
            board_id: board_id.into(),
            query: GarmentQuery::default(),
            generation: 0,
            outfits: Vec::new(),
            color_facets: Vec::new(),
            type_ranks: Vec::new(),
            loading: false,
            error: None,
        }
    }

    /// Initial load: rank facets, the unscoped color palette, and the
    /// unfiltered outfit list.
    pub async fn load(&mut self) {
        let api = Arc::clone(&self.api);
        match api.garment_trends(&self.board_id).await {
            Ok(ranks) => self.type_ranks = ranks,
            Err(e) => {
                self.error = Some(e.detail);
                return;
            }
        }
        match api.color_trends(&self.board_id, &[]).await {
            Ok(colors) => self.color_facets = colors,
            Err(e) => tracing::warn!(error = %e, "color facets fetch failed"),
        }
        let generation = self.generation;
        self.loading = true;
        let result = api.filtered_outfits(&self.board_id, &[]).await;
        self.apply_outfits(generation, result);
    }

    // Every selection mutation bumps the generation so in-flight
    // responses for the previous state are discarded at apply time.

    pub fn toggle_garment(&mut self, name: &str) {
        self.query.toggle_garment(name);
        self.generation += 1;
    }

    pub fn remove_garment(&mut self, name: &str) {
        self.query.remove_garment(name);
        self.generation += 1;
    }

    pub fn toggle_connector(&mut self, index: usize) {
        self.query.toggle_connector(index);
        self.generation += 1;
    }

    pub fn set_all_connectors(&mut self, value: Connector) {
        self.query.set_all_connectors(value);
        self.generation += 1;
    }

    pub fn toggle_color(&mut self, color: &str) {
        self.query.toggle_color(color);
        self.generation += 1;
    }

    pub fn remove_color(&mut self, color: &str) {
        self.query.remove_color(color);
        self.generation += 1;
    }

    pub fn clear_filters(&mut self) {
        self.query.clear();
        self.generation += 1;
    }

    /// Re-evaluate the view for the current selection: refresh the
    /// cross-filtered color palette, prune selections the new palette no
    /// longer offers, then fetch the filtered outfit list.
    pub async fn refresh(&mut self) {
        let generation = self.generation;
        self.loading = true;
        let api = Arc::clone(&self.api);

        let color_query = self.query.color_trends_query();
        let colors = api.color_trends(&self.board_id, &color_query).await;
        if !self.apply_color_facets(generation, colors) {
            return;
        }

        let outfit_query = self.query.outfit_query();
        let result = api.filtered_outfits(&self.board_id, &outfit_query).await;
        self.apply_outfits(generation, result);
    }

    /// Apply a color-facet response and prune stale selections. Returns
    /// false when the response is stale; the evaluation it belonged to is
    /// abandoned, so the loading flag is cleared here rather than left
    /// set with no outfit fetch coming.
    fn apply_color_facets(
        &mut self,
        generation: u64,
        result: Result<Vec<ColorRank>, ApiError>,
    ) -> bool {
        if generation != self.generation {
            self.loading = false;
            tracing::trace!("discarding stale color facet response");
            return false;
        }
        match result {
            Ok(list) => {
                let available: BTreeSet<String> =
                    list.iter().map(|c| c.color.clone()).collect();
                // A selected color must never refer to a facet value the
                // palette no longer offers. Pruning belongs to this same
                // evaluation, so it does not bump the generation.
                let pruned = self.query.prune_colors(&available);
                if !pruned.is_empty() {
                    tracing::debug!(?pruned, "deselected colors absent from facets");
                }
                self.color_facets = list;
            }
            // Facet refresh is a background concern: keep the previous
            // palette and retry on the next selection change.
            Err(e) => tracing::warn!(error = %e, "color facet refresh failed"),
        }
        true
    }

    fn apply_outfits(&mut self, generation: u64, result: Result<Vec<Outfit>, ApiError>) {
        if generation != self.generation {
            tracing::trace!(
                stale = generation,
                current = self.generation,
                "discarding stale outfit response"
            );
            return;
        }
        self.loading = false;
        match result {
            Ok(mut outfits) => {
                sort_by_garment_count(&mut outfits);
                self.outfits = outfits;
                self.error = None;
            }
            Err(e) => {
                self.outfits.clear();
                self.error = Some(e.detail);
            }
        }
    }

    pub fn outfits(&self) -> &[Outfit] {
        &self.outfits
    }

    pub fn color_facets(&self) -> &[ColorRank] {
        &self.color_facets
    }

    pub fn type_ranks(&self) -> &[GarmentTypeRank] {
        &self.type_ranks
    }

    pub fn query(&self) -> &GarmentQuery {
        &self.query
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::GarmentRank;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn outfit(id: &str, garments_count: u32) -> Outfit {
        Outfit {
            id: id.to_string(),
            board_id: Some("b1".to_string()),
            image_url: format!("https://img/{}.jpg", id),
            cloudinary_url: None,
            style: None,
            season: None,
            source_pin_url: None,
            created_at: Utc::now(),
            garments: None,
            garments_count: Some(garments_count),
        }
    }

    fn color(name: &str, count: u32) -> ColorRank {
        ColorRank {
            color: name.to_string(),
            count,
        }
    }

    /// Scripted fake: pops one queued response per call, falls back to
    /// empty success, and records the last outfit query it saw.
    #[derive(Default)]
    struct ScriptedOutfitApi {
        outfits: Mutex<VecDeque<Result<Vec<Outfit>, ApiError>>>,
        colors: Mutex<VecDeque<Result<Vec<ColorRank>, ApiError>>>,
        facets: Mutex<VecDeque<Result<OutfitFacets, ApiError>>>,
        trends: Mutex<VecDeque<Result<Vec<GarmentTypeRank>, ApiError>>>,
        last_outfit_query: Mutex<Vec<(String, String)>>,
    }

    impl OutfitApi for ScriptedOutfitApi {
        async fn filtered_outfits(
            &self,
            _board_id: &str,
            query: &[(String, String)],
        ) -> Result<Vec<Outfit>, ApiError> {
            *self.last_outfit_query.lock().unwrap() = query.to_vec();
            self.outfits
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn outfit_facets(&self, _board_id: &str) -> Result<OutfitFacets, ApiError> {
            self.facets
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(OutfitFacets::default()))
        }

        async fn color_trends(
            &self,
            _board_id: &str,
            _query: &[(String, String)],
        ) -> Result<Vec<ColorRank>, ApiError> {
            self.colors
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn garment_trends(
            &self,
            _board_id: &str,
        ) -> Result<Vec<GarmentTypeRank>, ApiError> {
            self.trends
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        // Selection changes to state A then state B before either fetch
        // resolves; A's response arrives after B's. Display must show B.
        let api = Arc::new(ScriptedOutfitApi::default());
        let mut view = BoardOutfits::new(api, "b1");

        view.toggle_season("invierno");
        let gen_a = view.generation;
        view.toggle_season("verano");
        let gen_b = view.generation;

        view.apply_outfits(gen_b, Ok(vec![outfit("b-result", 2)]));
        view.apply_outfits(gen_a, Ok(vec![outfit("a-result", 5)]));

        assert_eq!(view.outfits().len(), 1);
        assert_eq!(view.outfits()[0].id, "b-result");
    }

    #[tokio::test]
    async fn test_list_kept_visible_while_refetching() {
        let api = Arc::new(ScriptedOutfitApi::default());
        api.outfits
            .lock()
            .unwrap()
            .push_back(Ok(vec![outfit("o1", 3)]));
        let mut view = BoardOutfits::new(api, "b1");
        view.load().await;
        assert_eq!(view.outfits().len(), 1);

        // Mutation alone must not blank the list; only an applied
        // response replaces it.
        view.toggle_style("casual");
        assert_eq!(view.outfits().len(), 1);
        assert!(!view.is_loading());

        view.refresh().await;
        assert!(view.outfits().is_empty()); // scripted fallback is empty
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn test_refetch_error_clears_list() {
        let api = Arc::new(ScriptedOutfitApi::default());
        api.outfits
            .lock()
            .unwrap()
            .push_back(Ok(vec![outfit("o1", 3)]));
        api.outfits.lock().unwrap().push_back(Err(ApiError {
            detail: "boom".to_string(),
            status: Some(500),
        }));

        let mut view = BoardOutfits::new(api, "b1");
        view.load().await;
        view.toggle_season("invierno");
        view.refresh().await;

        assert!(view.outfits().is_empty());
        assert_eq!(view.error(), Some("boom"));
    }

    #[tokio::test]
    async fn test_outfits_sorted_by_garment_count_descending() {
        let api = Arc::new(ScriptedOutfitApi::default());
        api.outfits.lock().unwrap().push_back(Ok(vec![
            outfit("few", 1),
            outfit("many", 6),
            outfit("some", 3),
        ]));
        let mut view = BoardOutfits::new(api, "b1");
        view.load().await;

        let ids: Vec<&str> = view.outfits().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["many", "some", "few"]);
    }

    #[tokio::test]
    async fn test_selected_color_pruned_when_absent_from_facets() {
        let api = Arc::new(ScriptedOutfitApi::default());
        // Palette offered after selecting "Jacket" no longer has "rosa".
        api.colors
            .lock()
            .unwrap()
            .push_back(Ok(vec![color("negro", 4), color("azul", 2)]));

        let mut view = TrendsExplorer::new(Arc::clone(&api), "b1");
        view.toggle_color("rosa");
        view.toggle_garment("Jacket");
        view.refresh().await;

        assert!(view.query().colors().next().is_none());
        assert_eq!(view.color_facets().len(), 2);
        // The outfit query sent downstream no longer mentions the pruned
        // color.
        let last = api.last_outfit_query.lock().unwrap().clone();
        assert!(last.iter().all(|(k, _)| k != "garment_color"));
        assert!(last.contains(&("garment_name".to_string(), "Jacket".to_string())));
    }

    #[tokio::test]
    async fn test_stale_color_facet_response_clears_loading() {
        // The selection moved on while the palette fetch was in flight:
        // that evaluation is abandoned, so it must not leave the view
        // stuck loading or apply its palette.
        let api = Arc::new(ScriptedOutfitApi::default());
        let mut view = TrendsExplorer::new(api, "b1");
        view.toggle_color("rosa");
        let stale_gen = view.generation;
        view.toggle_garment("Jacket");
        view.loading = true;

        let applied = view.apply_color_facets(stale_gen, Ok(vec![color("negro", 4)]));
        assert!(!applied);
        assert!(!view.is_loading());
        assert!(view.color_facets().is_empty());
        // Pruning belongs to the evaluation that was abandoned.
        assert_eq!(view.query().colors().collect::<Vec<_>>(), vec!["rosa"]);
    }

    #[tokio::test]
    async fn test_color_facet_failure_keeps_previous_palette() {
        let api = Arc::new(ScriptedOutfitApi::default());
        api.colors
            .lock()
            .unwrap()
            .push_back(Ok(vec![color("negro", 4)]));
        api.colors.lock().unwrap().push_back(Err(ApiError {
            detail: "transient".to_string(),
            status: None,
        }));

        let mut view = TrendsExplorer::new(api, "b1");
        view.load().await;
        assert_eq!(view.color_facets().len(), 1);

        view.toggle_garment("Jacket");
        view.refresh().await;
        // Facet refresh failed: palette unchanged, selection untouched.
        assert_eq!(view.color_facets().len(), 1);
        assert!(view.error().is_none());
    }

    #[tokio::test]
    async fn test_trends_load_collects_ranks() {
        let api = Arc::new(ScriptedOutfitApi::default());
        api.trends.lock().unwrap().push_back(Ok(vec![GarmentTypeRank {
            garment_type: "abrigo".to_string(),
            count: 7,
            garments: vec![GarmentRank {
                name: "Jacket".to_string(),
                count: 5,
            }],
        }]));

        let mut view = TrendsExplorer::new(api, "b1");
        view.load().await;
        assert_eq!(view.type_ranks().len(), 1);
        assert_eq!(view.type_ranks()[0].garments[0].name, "Jacket");
    }
}
