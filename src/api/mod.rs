// Request client for the outfit-analysis REST backend
//
// Normalizes every outbound call: bearer-token injection from the session
// store, one error shape for all failures, 401 session invalidation, and
// the snake_case -> camelCase response rewrite with its one documented
// override. Typed wrappers cover each backend endpoint so the rest of the
// crate never builds paths or query strings by hand.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

pub mod casing;
pub mod error;
pub mod models;

pub use error::ApiError;
pub use models::{
    AnalysisPhase, AnalysisStatus, AnalyzeAccepted, Board, ColorRank, Facet, Garment,
    GarmentRank, GarmentTypeRank, Outfit, OutfitFacets, Product,
};

use crate::session::SessionStore;
use casing::camelize_keys;

/// Narrow view of the API used by the analysis lifecycle controller.
/// Implemented by `ApiClient` and by scripted fakes in tests.
pub trait AnalysisApi: Send + Sync {
    /// Fire the analyze trigger for a board.
    fn trigger_analysis(
        &self,
        board_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetch the current analysis status for a board.
    fn analysis_status(
        &self,
        board_id: &str,
    ) -> impl Future<Output = Result<AnalysisStatus, ApiError>> + Send;
}

/// Narrow view of the API used by the facet filter composers.
pub trait OutfitApi: Send + Sync {
    /// Filtered outfit list for a board.
    fn filtered_outfits(
        &self,
        board_id: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<Vec<Outfit>, ApiError>> + Send;

    /// Season/style facet counts for a board.
    fn outfit_facets(
        &self,
        board_id: &str,
    ) -> impl Future<Output = Result<OutfitFacets, ApiError>> + Send;

    /// Color facet counts, scoped by the given garment filter params.
    fn color_trends(
        &self,
        board_id: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<Vec<ColorRank>, ApiError>> + Send;

    /// Garment-type/name rank facets for a board.
    fn garment_trends(
        &self,
        board_id: &str,
    ) -> impl Future<Output = Result<Vec<GarmentTypeRank>, ApiError>> + Send;
}

/// HTTP client for the backend. Cheap to clone behind an `Arc`.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionStore>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Issue a request and decode the JSON body after the casing rewrite.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, query, body).await?;
        let raw: Value = response.json().await.map_err(ApiError::network)?;
        serde_json::from_value(camelize_keys(raw)).map_err(ApiError::decode)
    }

    /// Issue a request where success carries no body (204).
    async fn request_no_content(
        &self,
        method: Method,
        path: &str,
    ) -> Result<(), ApiError> {
        self.send(method, path, &[], None).await.map(|_| ())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        tracing::debug!(%method, %url, "api request");
        let response = builder.send().await.map_err(ApiError::network)?;
        let status = response.status();

        if status.as_u16() == 401 {
            // Fatal to the current session: clear credentials so callers
            // re-authenticate instead of retrying with a dead token.
            self.session.invalidate();
            return Err(ApiError::unauthorized());
        }
        if !status.is_success() {
            let body: Value = response
                .json()
                .await
                .unwrap_or_else(|_| json!({"detail": "connection error"}));
            return Err(ApiError::from_error_body(status.as_u16(), &body));
        }
        Ok(response)
    }

    // ── Boards ──────────────────────────────────────────────────────────

    pub async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
        self.request(Method::GET, "/api/boards/", &[], None).await
    }

    pub async fn get_board(&self, board_id: &str) -> Result<Board, ApiError> {
        self.request(Method::GET, &format!("/api/boards/{}", board_id), &[], None)
            .await
    }

    /// Create a board from an external source URL; comes back with
    /// `status = pending`.
    pub async fn create_board(
        &self,
        source_url: &str,
        name: Option<&str>,
    ) -> Result<Board, ApiError> {
        let body = json!({ "pinterest_url": source_url, "name": name });
        self.request(Method::POST, "/api/boards/", &[], Some(body))
            .await
    }

    pub async fn delete_board(&self, board_id: &str) -> Result<(), ApiError> {
        self.request_no_content(Method::DELETE, &format!("/api/boards/{}", board_id))
            .await
    }

    // ── Analysis ────────────────────────────────────────────────────────

    /// Trigger analysis (202). A 409 whose detail marks the board as
    /// already being analyzed is returned as an error here; the lifecycle
    /// controller demotes it to "keep polling".
    pub async fn analyze_board(&self, board_id: &str) -> Result<AnalyzeAccepted, ApiError> {
        self.request(
            Method::POST,
            &format!("/api/boards/{}/analyze", board_id),
            &[],
            None,
        )
        .await
    }

    pub async fn board_status(&self, board_id: &str) -> Result<AnalysisStatus, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/boards/{}/status", board_id),
            &[],
            None,
        )
        .await
    }

    // ── Outfits, facets, trends ─────────────────────────────────────────

    pub async fn board_outfits(
        &self,
        board_id: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Outfit>, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/boards/{}/outfits", board_id),
            query,
            None,
        )
        .await
    }

    pub async fn board_outfit_facets(&self, board_id: &str) -> Result<OutfitFacets, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/boards/{}/outfit-facets", board_id),
            &[],
            None,
        )
        .await
    }

    pub async fn board_trends(&self, board_id: &str) -> Result<Vec<GarmentTypeRank>, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/boards/{}/trends", board_id),
            &[],
            None,
        )
        .await
    }

    pub async fn board_color_trends(
        &self,
        board_id: &str,
        query: &[(String, String)],
    ) -> Result<Vec<ColorRank>, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/boards/{}/color-trends", board_id),
            query,
            None,
        )
        .await
    }

    pub async fn get_outfit(&self, outfit_id: &str) -> Result<Outfit, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/outfits/{}", outfit_id),
            &[],
            None,
        )
        .await
    }

    // ── Garments and products ───────────────────────────────────────────

    pub async fn get_garment(&self, garment_id: &str) -> Result<Garment, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/garments/{}", garment_id),
            &[],
            None,
        )
        .await
    }

    pub async fn garment_products(&self, garment_id: &str) -> Result<Vec<Product>, ApiError> {
        self.request(
            Method::GET,
            &format!("/api/garments/{}/products", garment_id),
            &[],
            None,
        )
        .await
    }

    /// Run the similar-product search for a garment.
    pub async fn search_products(&self, garment_id: &str) -> Result<Vec<Product>, ApiError> {
        self.request(
            Method::POST,
            &format!("/api/garments/{}/search-products", garment_id),
            &[],
            None,
        )
        .await
    }
}

impl AnalysisApi for ApiClient {
    async fn trigger_analysis(&self, board_id: &str) -> Result<(), ApiError> {
        self.analyze_board(board_id).await.map(|_| ())
    }

    async fn analysis_status(&self, board_id: &str) -> Result<AnalysisStatus, ApiError> {
        self.board_status(board_id).await
    }
}

impl OutfitApi for ApiClient {
    async fn filtered_outfits(
        &self,
        board_id: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Outfit>, ApiError> {
        self.board_outfits(board_id, query).await
    }

    async fn outfit_facets(&self, board_id: &str) -> Result<OutfitFacets, ApiError> {
        self.board_outfit_facets(board_id).await
    }

    async fn color_trends(
        &self,
        board_id: &str,
        query: &[(String, String)],
    ) -> Result<Vec<ColorRank>, ApiError> {
        self.board_color_trends(board_id, query).await
    }

    async fn garment_trends(&self, board_id: &str) -> Result<Vec<GarmentTypeRank>, ApiError> {
        self.board_trends(board_id).await
    }
}
