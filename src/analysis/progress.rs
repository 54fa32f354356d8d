// Derived view-model builders
//
// Pure functions mapping a raw AnalysisStatus to what a progress view
// renders: a percentage and three ordered phase descriptors. Derived
// fresh from each poll response, never persisted.

use crate::api::models::{AnalysisPhase, AnalysisStatus};

/// Nonzero progress floor shown while the job is pending or scraping,
/// so the view never sits at a stalled 0%.
pub const PROGRESS_FLOOR: u8 = 5;

/// Width of the analyzing band. Analyzing tops out at
/// `PROGRESS_FLOOR + ANALYZING_SPAN` = 98; only a completed job reports
/// exactly 100.
const ANALYZING_SPAN: f64 = 93.0;

/// Display status of one phase descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

/// One of the three coarse-grained stages shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseView {
    pub title: &'static str,
    pub subtitle: String,
    pub status: PhaseStatus,
}

impl PhaseView {
    fn new(title: &'static str, subtitle: impl Into<String>, status: PhaseStatus) -> Self {
        Self {
            title,
            subtitle: subtitle.into(),
            status,
        }
    }
}

const TITLE_FETCH: &str = "Fetching images";
const TITLE_ANALYZE: &str = "AI analysis";
const TITLE_SAVE: &str = "Saving results";

/// Phase list shown before the first poll response arrives.
pub fn initial_phases() -> [PhaseView; 3] {
    [
        PhaseView::new(TITLE_FETCH, "Starting...", PhaseStatus::Active),
        PhaseView::new(TITLE_ANALYZE, "Pending", PhaseStatus::Pending),
        PhaseView::new(TITLE_SAVE, "Pending", PhaseStatus::Pending),
    ]
}

/// Map a status payload to a progress percentage in [0, 100].
///
/// completed -> 100, failed -> 0, pending/scraping -> the floor, and
/// analyzing -> floor + (analyzed/total) scaled over the analyzing band,
/// rounded to nearest. A zero `pins_total` falls back to the floor
/// (division guard).
pub fn derive_progress(status: &AnalysisStatus) -> u8 {
    match status.phase {
        AnalysisPhase::Completed => 100,
        AnalysisPhase::Failed => 0,
        AnalysisPhase::Pending | AnalysisPhase::Scraping => PROGRESS_FLOOR,
        AnalysisPhase::Analyzing => {
            if status.pins_total == 0 {
                return PROGRESS_FLOOR;
            }
            let done = status.pins_analyzed.min(status.pins_total) as f64;
            let ratio = done / status.pins_total as f64;
            (PROGRESS_FLOOR as f64 + ratio * ANALYZING_SPAN).round() as u8
        }
    }
}

/// Map a status payload to the three ordered phase descriptors.
///
/// Exactly one phase is active while the job runs. On failure, the phase
/// the counts place the job in is marked failed and later phases stay
/// pending; with no count evidence at all (`pins_total == 0`) the fetch
/// phase itself is marked failed.
pub fn derive_phases(status: &AnalysisStatus) -> [PhaseView; 3] {
    let analyzed_line = format!("{} of {} analyzed", status.pins_analyzed, status.pins_total);
    match status.phase {
        AnalysisPhase::Pending => [
            PhaseView::new(TITLE_FETCH, "Waiting for the job to start", PhaseStatus::Active),
            PhaseView::new(TITLE_ANALYZE, "Pending", PhaseStatus::Pending),
            PhaseView::new(TITLE_SAVE, "Pending", PhaseStatus::Pending),
        ],
        AnalysisPhase::Scraping => [
            PhaseView::new(TITLE_FETCH, "Downloading board images...", PhaseStatus::Active),
            PhaseView::new(TITLE_ANALYZE, "Pending", PhaseStatus::Pending),
            PhaseView::new(TITLE_SAVE, "Pending", PhaseStatus::Pending),
        ],
        AnalysisPhase::Analyzing => {
            let fetch = PhaseView::new(
                TITLE_FETCH,
                format!("{} images fetched", status.pins_total),
                PhaseStatus::Completed,
            );
            // All pins accounted for: the AI pass is done and the job is
            // persisting results, even though the phase field still says
            // analyzing.
            if status.pins_total > 0 && status.pins_analyzed >= status.pins_total {
                [
                    fetch,
                    PhaseView::new(TITLE_ANALYZE, analyzed_line, PhaseStatus::Completed),
                    PhaseView::new(TITLE_SAVE, "Saving results...", PhaseStatus::Active),
                ]
            } else {
                [
                    fetch,
                    PhaseView::new(TITLE_ANALYZE, analyzed_line, PhaseStatus::Active),
                    PhaseView::new(TITLE_SAVE, "Pending", PhaseStatus::Pending),
                ]
            }
        }
        AnalysisPhase::Completed => [
            PhaseView::new(
                TITLE_FETCH,
                format!("{} images fetched", status.pins_total),
                PhaseStatus::Completed,
            ),
            PhaseView::new(TITLE_ANALYZE, analyzed_line, PhaseStatus::Completed),
            PhaseView::new(
                TITLE_SAVE,
                format!(
                    "{} outfits, {} garments",
                    status.outfits_created, status.garments_created
                ),
                PhaseStatus::Completed,
            ),
        ],
        AnalysisPhase::Failed => {
            if status.pins_total == 0 {
                // No count evidence that scraping ever finished: mark the
                // fetch phase itself failed rather than claiming progress.
                [
                    PhaseView::new(TITLE_FETCH, "Failed", PhaseStatus::Failed),
                    PhaseView::new(TITLE_ANALYZE, "Pending", PhaseStatus::Pending),
                    PhaseView::new(TITLE_SAVE, "Pending", PhaseStatus::Pending),
                ]
            } else if status.pins_analyzed < status.pins_total {
                [
                    PhaseView::new(
                        TITLE_FETCH,
                        format!("{} images fetched", status.pins_total),
                        PhaseStatus::Completed,
                    ),
                    PhaseView::new(TITLE_ANALYZE, "Failed", PhaseStatus::Failed),
                    PhaseView::new(TITLE_SAVE, "Pending", PhaseStatus::Pending),
                ]
            } else {
                [
                    PhaseView::new(
                        TITLE_FETCH,
                        format!("{} images fetched", status.pins_total),
                        PhaseStatus::Completed,
                    ),
                    PhaseView::new(TITLE_ANALYZE, analyzed_line, PhaseStatus::Completed),
                    PhaseView::new(TITLE_SAVE, "Failed", PhaseStatus::Failed),
                ]
            }
        }
    }
}
