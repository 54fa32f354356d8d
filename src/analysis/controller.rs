// Analysis lifecycle controller
//
// Owns the state machine for one board-analysis session:
//
//   Idle -> Triggering -> Polling -> { Completed, Failed }
//
// The trigger is idempotent from the caller's perspective: a conflict
// saying the board is already being analyzed means another session
// started the job, so polling begins anyway. Polling runs on a fixed
// interval with one in-flight request at a time (the next tick is not
// awaited until the previous status call returned); transient poll
// errors are logged and retried on the next tick. Terminal states latch:
// once Completed, nothing (late errors, stale responses) can downgrade
// the session to Failed. Teardown stops the interval and a liveness flag
// prevents any state mutation after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::analysis::progress::{derive_phases, derive_progress, initial_phases, PhaseView};
use crate::api::models::AnalysisPhase;
use crate::api::AnalysisApi;

/// Default status poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default pause between reaching Completed and emitting the
/// navigate-to-board signal.
pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_millis(1500);

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Triggering,
    Polling,
    Completed,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Failed)
    }
}

/// Observable state of a session, cloned out on demand.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    pub state: LifecycleState,
    pub progress: u8,
    pub phases: [PhaseView; 3],
    pub error: Option<String>,
    pub outfits_created: u32,
    pub garments_created: u32,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            state: LifecycleState::Idle,
            progress: 0,
            phases: initial_phases(),
            error: None,
            outfits_created: 0,
            garments_created: 0,
        }
    }
}

/// Events emitted while a session runs. The renderer (or test) drains
/// these; the snapshot carries the same information for pull-style reads.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// A poll response was applied.
    Progress {
        percent: u8,
        phases: [PhaseView; 3],
    },
    /// The job reached its successful terminal state.
    Completed {
        outfits_created: u32,
        garments_created: u32,
    },
    /// Fired once, after the completion delay: time to show the board.
    NavigateToBoard { board_id: String },
    /// The job (or its trigger) failed. Retry or go home.
    Failed { message: String },
}

/// Tunables for one controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub poll_interval: Duration,
    pub completion_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            completion_delay: DEFAULT_COMPLETION_DELAY,
        }
    }
}

/// A running session: event stream plus teardown handle.
pub struct AnalysisSession {
    pub events: mpsc::Receiver<AnalysisEvent>,
    stop: Option<oneshot::Sender<()>>,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl AnalysisSession {
    /// Tear the session down: the polling loop exits and no state is
    /// mutated afterwards.
    pub fn stop(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.abort();
    }

    /// Wait for the session to run to its terminal state.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Drives one board's analysis from trigger to terminal state.
pub struct AnalysisController<A: AnalysisApi> {
    api: Arc<A>,
    board_id: String,
    config: ControllerConfig,
    snapshot: Mutex<AnalysisSnapshot>,
    started: AtomicBool,
    cancelled: Arc<AtomicBool>,
}

impl<A: AnalysisApi + 'static> AnalysisController<A> {
    pub fn new(api: Arc<A>, board_id: impl Into<String>, config: ControllerConfig) -> Arc<Self> {
        Arc::new(Self {
            api,
            board_id: board_id.into(),
            config,
            snapshot: Mutex::new(AnalysisSnapshot::default()),
            started: AtomicBool::new(false),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Current observable state.
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.snapshot.lock().unwrap().clone()
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Start the session. Returns `None` when already started: a second
    /// start call (e.g. a remount firing the same effect twice) must not
    /// double-trigger the job.
    pub fn start(self: &Arc<Self>) -> Option<AnalysisSession> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(board_id = %self.board_id, "session already started, ignoring");
            return None;
        }
        let (event_tx, event_rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = oneshot::channel();
        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            controller.run(event_tx, stop_rx).await;
        });
        Some(AnalysisSession {
            events: event_rx,
            stop: Some(stop_tx),
            cancelled: Arc::clone(&self.cancelled),
            task,
        })
    }

    /// Retry affordance for the terminal states: reset all derived state
    /// to initial values and re-enter Triggering from scratch. Returns
    /// `None` while a session is still running; a second live polling
    /// loop would re-trigger the job and fight over the snapshot.
    pub fn retry(self: &Arc<Self>) -> Option<AnalysisSession> {
        if !self.snapshot.lock().unwrap().state.is_terminal() {
            tracing::debug!(board_id = %self.board_id, "retry ignored, session still running");
            return None;
        }
        *self.snapshot.lock().unwrap() = AnalysisSnapshot::default();
        self.cancelled.store(false, Ordering::SeqCst);
        self.started.store(false, Ordering::SeqCst);
        self.start()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn run(
        self: Arc<Self>,
        events: mpsc::Sender<AnalysisEvent>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        self.set_state(LifecycleState::Triggering);
        tracing::info!(board_id = %self.board_id, "triggering analysis");

        match self.api.trigger_analysis(&self.board_id).await {
            Ok(()) => {}
            Err(e) if e.is_already_running() => {
                // Another session (or a previous mount) already started
                // the job. Not an error: go straight to polling.
                tracing::debug!(board_id = %self.board_id, "analysis already running");
            }
            Err(e) => {
                tracing::error!(board_id = %self.board_id, error = %e, "trigger failed");
                self.fail(&events, e.detail).await;
                return;
            }
        }

        if self.is_cancelled() {
            return;
        }
        self.set_state(LifecycleState::Polling);

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        // Each tick waits for the previous poll to return, so delayed
        // ticks must not burst-fire to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop_rx => return,
                _ = ticker.tick() => {}
            }

            // At most one in-flight poll: the next tick is not awaited
            // until this status call resolves.
            let status = tokio::select! {
                _ = &mut stop_rx => return,
                status = self.api.analysis_status(&self.board_id) => status,
            };
            if self.is_cancelled() {
                return;
            }

            let status = match status {
                Ok(status) => status,
                Err(e) if e.is_unauthorized() => {
                    // Structural: retrying with a dead session cannot
                    // succeed.
                    self.fail(&events, e.detail).await;
                    return;
                }
                Err(e) => {
                    // Transient poll failure must not abort an in-progress
                    // analysis; retry on the next tick.
                    tracing::warn!(board_id = %self.board_id, error = %e, "status poll failed, will retry");
                    continue;
                }
            };

            let percent = derive_progress(&status);
            let phases = derive_phases(&status);
            if !self.apply_progress(percent, phases.clone(), status.outfits_created, status.garments_created) {
                // Terminal state already latched; discard the stale poll.
                return;
            }
            let _ = events
                .send(AnalysisEvent::Progress { percent, phases })
                .await;

            match status.phase {
                AnalysisPhase::Completed => {
                    self.set_state(LifecycleState::Completed);
                    tracing::info!(
                        board_id = %self.board_id,
                        outfits = status.outfits_created,
                        garments = status.garments_created,
                        "analysis completed"
                    );
                    let _ = events
                        .send(AnalysisEvent::Completed {
                            outfits_created: status.outfits_created,
                            garments_created: status.garments_created,
                        })
                        .await;

                    // One-time delayed navigation to the board view.
                    tokio::select! {
                        _ = &mut stop_rx => return,
                        _ = tokio::time::sleep(self.config.completion_delay) => {}
                    }
                    if !self.is_cancelled() {
                        let _ = events
                            .send(AnalysisEvent::NavigateToBoard {
                                board_id: self.board_id.clone(),
                            })
                            .await;
                    }
                    return;
                }
                AnalysisPhase::Failed => {
                    self.fail(&events, "analysis failed".to_string()).await;
                    return;
                }
                _ => {}
            }
        }
    }

    fn set_state(&self, state: LifecycleState) {
        if self.is_cancelled() {
            return;
        }
        let mut snapshot = self.snapshot.lock().unwrap();
        if snapshot.state.is_terminal() {
            return;
        }
        snapshot.state = state;
    }

    /// Apply a poll result to the snapshot. Returns false when a terminal
    /// state was already latched (the result is stale and was discarded).
    fn apply_progress(
        &self,
        percent: u8,
        phases: [PhaseView; 3],
        outfits_created: u32,
        garments_created: u32,
    ) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let mut snapshot = self.snapshot.lock().unwrap();
        if snapshot.state.is_terminal() {
            return false;
        }
        snapshot.progress = percent;
        snapshot.phases = phases;
        snapshot.outfits_created = outfits_created;
        snapshot.garments_created = garments_created;
        true
    }

    async fn fail(&self, events: &mpsc::Sender<AnalysisEvent>, message: String) {
        if self.is_cancelled() {
            return;
        }
        {
            let mut snapshot = self.snapshot.lock().unwrap();
            // A late trigger error must not downgrade a Completed session.
            if snapshot.state.is_terminal() {
                return;
            }
            snapshot.state = LifecycleState::Failed;
            snapshot.error = Some(message.clone());
        }
        let _ = events.send(AnalysisEvent::Failed { message }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::AnalysisStatus;
    use crate::api::ApiError;
    use std::collections::VecDeque;

    fn status(phase: AnalysisPhase, total: u32, analyzed: u32) -> AnalysisStatus {
        AnalysisStatus {
            status: "running".to_string(),
            phase,
            pins_total: total,
            pins_analyzed: analyzed,
            outfits_created: analyzed,
            garments_created: analyzed * 2,
        }
    }

    /// Scripted backend: queued trigger results and a status sequence
    /// whose last element repeats once the queue drains.
    struct ScriptedApi {
        triggers: Mutex<VecDeque<Result<(), ApiError>>>,
        statuses: Mutex<VecDeque<Result<AnalysisStatus, ApiError>>>,
        trigger_calls: std::sync::atomic::AtomicU32,
    }

    impl ScriptedApi {
        fn new(
            triggers: Vec<Result<(), ApiError>>,
            statuses: Vec<Result<AnalysisStatus, ApiError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                triggers: Mutex::new(triggers.into()),
                statuses: Mutex::new(statuses.into()),
                trigger_calls: std::sync::atomic::AtomicU32::new(0),
            })
        }
    }

    impl AnalysisApi for ScriptedApi {
        async fn trigger_analysis(&self, _board_id: &str) -> Result<(), ApiError> {
            self.trigger_calls.fetch_add(1, Ordering::SeqCst);
            self.triggers.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn analysis_status(&self, _board_id: &str) -> Result<AnalysisStatus, ApiError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Ok(status(AnalysisPhase::Pending, 0, 0)))
            }
        }
    }

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            poll_interval: Duration::from_millis(5),
            completion_delay: Duration::from_millis(5),
        }
    }

    async fn drain(mut session: AnalysisSession) -> Vec<AnalysisEvent> {
        let mut events = Vec::new();
        while let Some(event) = session.events.recv().await {
            events.push(event);
        }
        session.join().await;
        events
    }

    #[tokio::test]
    async fn test_successful_run_reaches_completed_and_navigates() {
        let api = ScriptedApi::new(
            vec![Ok(())],
            vec![
                Ok(status(AnalysisPhase::Scraping, 0, 0)),
                Ok(status(AnalysisPhase::Analyzing, 4, 2)),
                Ok(status(AnalysisPhase::Completed, 4, 4)),
            ],
        );
        let controller = AnalysisController::new(api, "b1", fast_config());
        let session = controller.start().expect("first start");
        let events = drain(session).await;

        assert_eq!(controller.snapshot().state, LifecycleState::Completed);
        assert_eq!(controller.snapshot().progress, 100);
        assert!(matches!(
            events.last(),
            Some(AnalysisEvent::NavigateToBoard { board_id }) if board_id == "b1"
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, AnalysisEvent::Completed { outfits_created: 4, .. })));
    }

    #[tokio::test]
    async fn test_conflict_trigger_still_polls_to_completion() {
        // "ya está siendo analizado" is demoted to continue; the session
        // must reach the same terminal state as a clean trigger.
        let conflict = ApiError {
            detail: "El tablero ya está siendo analizado".to_string(),
            status: Some(409),
        };
        let api = ScriptedApi::new(
            vec![Err(conflict)],
            vec![
                Ok(status(AnalysisPhase::Analyzing, 2, 1)),
                Ok(status(AnalysisPhase::Completed, 2, 2)),
            ],
        );
        let controller = AnalysisController::new(api, "b1", fast_config());
        let events = drain(controller.start().unwrap()).await;

        assert_eq!(controller.snapshot().state, LifecycleState::Completed);
        assert!(controller.snapshot().error.is_none());
        assert!(!events
            .iter()
            .any(|e| matches!(e, AnalysisEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_other_trigger_error_fails_without_polling() {
        let api = ScriptedApi::new(
            vec![Err(ApiError {
                detail: "Tablero no encontrado".to_string(),
                status: Some(404),
            })],
            vec![Ok(status(AnalysisPhase::Completed, 1, 1))],
        );
        let controller = AnalysisController::new(api, "b1", fast_config());
        let events = drain(controller.start().unwrap()).await;

        assert_eq!(controller.snapshot().state, LifecycleState::Failed);
        assert_eq!(
            controller.snapshot().error.as_deref(),
            Some("Tablero no encontrado")
        );
        // No Progress events: polling never started.
        assert!(events
            .iter()
            .all(|e| matches!(e, AnalysisEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_transient_poll_errors_are_retried() {
        let api = ScriptedApi::new(
            vec![Ok(())],
            vec![
                Err(ApiError::network("connection reset")),
                Err(ApiError::network("connection reset")),
                Ok(status(AnalysisPhase::Completed, 3, 3)),
            ],
        );
        let controller = AnalysisController::new(api, "b1", fast_config());
        drain(controller.start().unwrap()).await;
        assert_eq!(controller.snapshot().state, LifecycleState::Completed);
    }

    #[tokio::test]
    async fn test_failed_phase_is_terminal() {
        let api = ScriptedApi::new(
            vec![Ok(())],
            vec![
                Ok(status(AnalysisPhase::Analyzing, 5, 2)),
                Ok(status(AnalysisPhase::Failed, 5, 2)),
            ],
        );
        let controller = AnalysisController::new(api, "b1", fast_config());
        let events = drain(controller.start().unwrap()).await;

        assert_eq!(controller.snapshot().state, LifecycleState::Failed);
        assert!(matches!(
            events.last(),
            Some(AnalysisEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_second_start_is_ignored() {
        let api = ScriptedApi::new(vec![Ok(())], vec![Ok(status(AnalysisPhase::Completed, 1, 1))]);
        let controller = AnalysisController::new(Arc::clone(&api), "b1", fast_config());
        let session = controller.start().expect("first start");
        assert!(controller.start().is_none(), "remount must not re-trigger");
        drain(session).await;
        assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_after_failure_runs_fresh_session() {
        let api = ScriptedApi::new(
            vec![
                Err(ApiError {
                    detail: "upstream exploded".to_string(),
                    status: Some(500),
                }),
                Ok(()),
            ],
            vec![Ok(status(AnalysisPhase::Completed, 2, 2))],
        );
        let controller = AnalysisController::new(Arc::clone(&api), "b1", fast_config());
        drain(controller.start().unwrap()).await;
        assert_eq!(controller.snapshot().state, LifecycleState::Failed);

        let session = controller.retry().expect("retry starts a new session");
        // Derived state was reset before the new run.
        drain(session).await;
        assert_eq!(controller.snapshot().state, LifecycleState::Completed);
        assert!(controller.snapshot().error.is_none());
        assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_ignored_while_session_running() {
        // A retry mid-run must not spawn a second live polling loop over
        // the same snapshot.
        let api = ScriptedApi::new(
            vec![Ok(())],
            vec![Ok(status(AnalysisPhase::Analyzing, 10, 1))],
        );
        let controller = AnalysisController::new(Arc::clone(&api), "b1", fast_config());
        let mut session = controller.start().unwrap();

        let first = session.events.recv().await;
        assert!(matches!(first, Some(AnalysisEvent::Progress { .. })));
        assert_eq!(controller.snapshot().state, LifecycleState::Polling);

        assert!(controller.retry().is_none(), "retry must wait for a terminal state");
        assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);
        // The original session is untouched and still polling.
        assert_eq!(controller.snapshot().state, LifecycleState::Polling);
        session.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_polling_and_freezes_state() {
        let api = ScriptedApi::new(
            vec![Ok(())],
            vec![Ok(status(AnalysisPhase::Analyzing, 10, 1))],
        );
        let controller = AnalysisController::new(api, "b1", fast_config());
        let mut session = controller.start().unwrap();

        // Wait for at least one progress event, then tear down.
        let first = session.events.recv().await;
        assert!(matches!(first, Some(AnalysisEvent::Progress { .. })));
        let before = controller.snapshot();
        session.stop();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let after = controller.snapshot();
        assert_eq!(before.progress, after.progress);
        assert_eq!(before.state, after.state);
    }

    #[tokio::test]
    async fn test_late_failure_cannot_downgrade_completed() {
        let api = ScriptedApi::new(vec![Ok(())], vec![Ok(status(AnalysisPhase::Completed, 1, 1))]);
        let controller = AnalysisController::new(api, "b1", fast_config());
        drain(controller.start().unwrap()).await;
        assert_eq!(controller.snapshot().state, LifecycleState::Completed);

        // Simulate an error arriving after the terminal state latched.
        let (tx, mut rx) = mpsc::channel(4);
        controller.fail(&tx, "late trigger error".to_string()).await;
        assert_eq!(controller.snapshot().state, LifecycleState::Completed);
        assert!(rx.try_recv().is_err(), "no Failed event after Completed");
    }
}
