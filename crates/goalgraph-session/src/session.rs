use crate::client::{FetchClient, GoalWriter};
use crate::state::SessionPhase;
use crate::viewport::ViewportTracker;
use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, unbounded};
use goalgraph_core::{GoalId, GoalNode, GoalStatus, LayoutDirection, TreeResponse, TreeStats};
use goalgraph_events::{AnomalySink, Event, EventBus, TracingSink, telemetry};
use goalgraph_graph::{
    CollapseStore, LayoutCache, LayoutGoal, LayoutParams, LayoutTree, LinkSegment, Vec2,
    build_tree, tree_stats,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SESSION_TARGET: &str = "goalgraph::session";

pub const EMPTY_STATE_MESSAGE: &str = "No goals found. Create your first goal to get started!";

/// What the presentation layer should show for the current pass.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameFlavor {
    Idle,
    Loading,
    Ready,
    /// Data is ready but the current viewport cannot host a layout yet.
    PreparingLayout,
    Empty { message: String },
    Error { message: String },
}

/// One pass worth of render state. Together with `toggle_collapse` this is
/// the entire contract the presentation layer may depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub flavor: FrameFlavor,
    pub nodes: Vec<LayoutGoal>,
    pub links: Vec<LinkSegment>,
    pub stats: Option<TreeStats>,
}

struct FetchOutcome {
    generation: u64,
    correlation_id: String,
    result: Result<TreeResponse, String>,
}

/// Owns the data-loading lifecycle around the tree pipeline: fetches run on
/// worker threads and report back through a channel, `poll` applies the
/// latest outcome (stale ones are discarded), and every applied payload
/// flows through collapse merge, hierarchy build and the layout cache.
pub struct GoalSession {
    fetcher: Arc<dyn FetchClient>,
    writer: Option<Arc<dyn GoalWriter>>,
    bus: EventBus,
    sink: Arc<dyn AnomalySink + Send + Sync>,
    collapse: CollapseStore,
    cache: LayoutCache,
    viewport: ViewportTracker,
    direction: LayoutDirection,
    phase: SessionPhase,
    data: Option<TreeResponse>,
    tree: Option<GoalNode>,
    layout: Option<LayoutTree>,
    generation: u64,
    outcome_tx: Sender<FetchOutcome>,
    outcome_rx: Receiver<FetchOutcome>,
    closed: bool,
}

impl GoalSession {
    pub fn new(fetcher: Arc<dyn FetchClient>) -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        Self {
            fetcher,
            writer: None,
            bus: EventBus::new(),
            sink: Arc::new(TracingSink),
            collapse: CollapseStore::new(),
            cache: LayoutCache::new(),
            viewport: ViewportTracker::new(Vec2::default()),
            direction: LayoutDirection::default(),
            phase: SessionPhase::Idle,
            data: None,
            tree: None,
            layout: None,
            generation: 0,
            outcome_tx,
            outcome_rx,
            closed: false,
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn GoalWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AnomalySink + Send + Sync>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_viewport_debounce(mut self, debounce: Duration) -> Self {
        self.viewport = self.viewport.clone().with_debounce(debounce);
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tree(&self) -> Option<&GoalNode> {
        self.tree.as_ref()
    }

    pub fn stats(&self) -> Option<TreeStats> {
        self.tree.as_ref().map(tree_stats)
    }

    /// (hits, misses) of the layout cache. Diagnostic only.
    pub fn layout_cache_stats(&self) -> (u64, u64) {
        (self.cache.hits(), self.cache.misses())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start a new fetch on a worker thread. Any outcome from an earlier,
    /// still-running fetch is stale from this point on and will be
    /// discarded when it arrives.
    pub fn request_refresh(&mut self) {
        if self.closed {
            return;
        }
        self.generation += 1;
        self.phase = SessionPhase::Loading;

        let correlation_id = telemetry::new_correlation_id();
        telemetry::fetch_start(&correlation_id, self.generation);
        self.bus.publish(Event::RefreshRequested {
            correlation_id: correlation_id.clone(),
        });

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.outcome_tx.clone();
        let generation = self.generation;
        thread::spawn(move || {
            let result = fetcher.fetch_tree().map_err(|err| format!("{err:#}"));
            // The session may be gone by now; a dead channel is fine.
            let _ = tx.send(FetchOutcome {
                generation,
                correlation_id,
                result,
            });
        });
    }

    /// Retry after a fetch failure. Goes back through `Loading` like any
    /// other fetch — there is no shortcut from `Error` to `Ready`.
    pub fn retry(&mut self) {
        self.request_refresh();
    }

    /// Drain finished work: apply the latest matching fetch outcome and
    /// settle any pending viewport change. Returns true when visible state
    /// changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        let mut latest: Option<FetchOutcome> = None;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if self.closed || outcome.generation != self.generation {
                tracing::debug!(
                    target: SESSION_TARGET,
                    generation = outcome.generation,
                    current = self.generation,
                    "discarding stale fetch outcome"
                );
                continue;
            }
            latest = Some(outcome);
        }
        if let Some(outcome) = latest {
            self.apply_outcome(outcome);
            changed = true;
        }

        if self.viewport.poll() {
            let settled = self.viewport.settled();
            self.bus.publish(Event::ViewportResized {
                width: settled.x,
                height: settled.y,
            });
            self.refresh_layout();
            changed = true;
        }

        changed
    }

    /// Record new viewport dimensions from the resize stream. They apply
    /// once settled (via `poll`) or immediately via `flush_viewport`.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport.resize(width, height);
    }

    pub fn flush_viewport(&mut self) {
        if self.viewport.flush() {
            let settled = self.viewport.settled();
            self.bus.publish(Event::ViewportResized {
                width: settled.x,
                height: settled.y,
            });
            self.refresh_layout();
        }
    }

    /// Flip the collapsed flag for `id`; unknown ids are a no-op. The tree
    /// is rebuilt with identical structure, so the layout cache stays hot —
    /// collapse is outside the structural fingerprint.
    pub fn toggle_collapse(&mut self, id: &GoalId) {
        if !self.collapse.toggle(id) {
            return;
        }
        self.bus.publish(Event::CollapseToggled {
            id: id.clone(),
            collapsed: self.collapse.is_collapsed(id),
        });
        self.rebuild();
    }

    /// Ask the write collaborator to update a goal's status, then refetch.
    /// The local tree is never patched in place.
    pub fn update_status(&mut self, id: &GoalId, status: GoalStatus) -> Result<()> {
        self.writer()?.update_status(id, status)?;
        self.bus.publish(Event::GoalStatusChanged {
            id: id.clone(),
            status,
        });
        self.request_refresh();
        Ok(())
    }

    pub fn create_goal(&mut self, title: &str, parent_id: Option<&GoalId>) -> Result<()> {
        let id = self.writer()?.create_goal(title, parent_id)?;
        self.bus.publish(Event::GoalCreated { id });
        self.request_refresh();
        Ok(())
    }

    pub fn delete_goal(&mut self, id: &GoalId) -> Result<()> {
        self.writer()?.delete_goal(id)?;
        self.bus.publish(Event::GoalDeleted { id: id.clone() });
        self.request_refresh();
        Ok(())
    }

    /// Tear down. In-flight fetches keep running but their results are
    /// dropped on arrival; no further refreshes start.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Snapshot of the current pass for the presentation layer. Collapse
    /// flags are overlaid from the store so cached layouts never show
    /// stale UI state.
    pub fn render_frame(&self) -> RenderFrame {
        let (mut nodes, links) = match &self.layout {
            Some(layout) => (layout.nodes.clone(), layout.links.clone()),
            None => (Vec::new(), Vec::new()),
        };
        for node in &mut nodes {
            node.ui.collapsed = self.collapse.is_collapsed(&node.id);
        }

        let flavor = match &self.phase {
            SessionPhase::Idle => FrameFlavor::Idle,
            SessionPhase::Loading => FrameFlavor::Loading,
            SessionPhase::Error { message } => FrameFlavor::Error {
                message: message.clone(),
            },
            SessionPhase::Ready => {
                if self.tree.is_none() {
                    FrameFlavor::Empty {
                        message: EMPTY_STATE_MESSAGE.to_string(),
                    }
                } else if self.layout.is_none() {
                    FrameFlavor::PreparingLayout
                } else {
                    FrameFlavor::Ready
                }
            }
        };

        RenderFrame {
            flavor,
            nodes,
            links,
            stats: self.stats(),
        }
    }

    fn writer(&self) -> Result<&Arc<dyn GoalWriter>> {
        self.writer
            .as_ref()
            .ok_or_else(|| anyhow!("no mutation collaborator configured"))
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        match outcome.result {
            Ok(response) => {
                telemetry::fetch_success(
                    &outcome.correlation_id,
                    outcome.generation,
                    response.nodes.len(),
                );
                self.collapse.sync(&response.nodes);
                self.data = Some(response);
                self.phase = SessionPhase::Ready;
                self.rebuild();
            }
            Err(message) => {
                telemetry::fetch_failure(
                    &outcome.correlation_id,
                    outcome.generation,
                    Some(message.clone()),
                );
                self.bus.publish(Event::FetchFailed {
                    generation: outcome.generation,
                    error: message.clone(),
                });
                self.phase = SessionPhase::Error { message };
            }
        }
    }

    /// Rebuild the tree from the current flat data, then refresh the layout.
    fn rebuild(&mut self) {
        let Some(data) = &self.data else {
            self.tree = None;
            self.layout = None;
            return;
        };

        let merged = self.collapse.merge(&data.nodes);
        match build_tree(&merged, data.root_id.as_ref(), self.sink.as_ref()) {
            Ok(Some(tree)) => {
                self.bus.publish(Event::TreeApplied {
                    generation: self.generation,
                    node_count: tree.node_count(),
                });
                self.tree = Some(tree);
            }
            Ok(None) => {
                self.bus.publish(Event::TreeEmpty {
                    generation: self.generation,
                });
                self.tree = None;
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(target: SESSION_TARGET, error = %message, "hierarchy rebuild failed");
                self.bus.publish(Event::ShowError {
                    message: message.clone(),
                });
                self.tree = None;
                self.phase = SessionPhase::Error { message };
            }
        }
        self.refresh_layout();
    }

    fn refresh_layout(&mut self) {
        let Some(tree) = &self.tree else {
            self.layout = None;
            return;
        };

        let params = LayoutParams {
            viewport: self.viewport.settled(),
            margin: Vec2::new(LayoutParams::DEFAULT_MARGIN, LayoutParams::DEFAULT_MARGIN),
            direction: self.direction,
        };

        let misses_before = self.cache.misses();
        match self.cache.layout(tree, &params) {
            Ok(layout) => {
                if self.cache.misses() > misses_before {
                    self.bus.publish(Event::LayoutRecomputed {
                        node_count: layout.nodes.len(),
                        link_count: layout.links.len(),
                    });
                }
                self.layout = Some(layout);
            }
            Err(err) => {
                tracing::warn!(target: SESSION_TARGET, error = %err, "layout unavailable");
                self.bus.publish(Event::LayoutUnavailable {
                    reason: err.to_string(),
                });
                self.layout = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalgraph_core::FlatGoal;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    fn response(nodes: &[(&str, Option<&str>)]) -> TreeResponse {
        TreeResponse {
            schema_version: 1,
            generated_at: "2025-11-02T00:00:00Z".to_string(),
            root_id: None,
            nodes: nodes
                .iter()
                .map(|(id, parent)| {
                    FlatGoal::new(*id, parent.map(GoalId::from), id.to_uppercase())
                })
                .collect(),
        }
    }

    struct StaticFetch {
        response: TreeResponse,
    }

    impl FetchClient for StaticFetch {
        fn fetch_tree(&self) -> Result<TreeResponse> {
            Ok(self.response.clone())
        }
    }

    /// Pops one scripted step per fetch: notify entry, sleep, then succeed
    /// or fail. The entry notification lets tests order overlapping calls.
    struct ScriptedFetch {
        script: Mutex<VecDeque<(Duration, Result<TreeResponse, String>)>>,
        entered_tx: Sender<()>,
        entered_rx: Receiver<()>,
    }

    impl ScriptedFetch {
        fn new(steps: Vec<(Duration, Result<TreeResponse, String>)>) -> Self {
            let (entered_tx, entered_rx) = unbounded();
            Self {
                script: Mutex::new(steps.into()),
                entered_tx,
                entered_rx,
            }
        }

        fn wait_for_call(&self) {
            self.entered_rx
                .recv_timeout(Duration::from_secs(2))
                .expect("fetch call was never made");
        }
    }

    impl FetchClient for ScriptedFetch {
        fn fetch_tree(&self) -> Result<TreeResponse> {
            let step = self.script.lock().unwrap().pop_front();
            let _ = self.entered_tx.send(());
            match step {
                Some((delay, result)) => {
                    thread::sleep(delay);
                    result.map_err(|message| anyhow!(message))
                }
                None => Err(anyhow!("script exhausted")),
            }
        }
    }

    struct RecordingWriter {
        ops: Mutex<Vec<String>>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                ops: Mutex::new(Vec::new()),
            }
        }
    }

    impl GoalWriter for RecordingWriter {
        fn update_status(&self, id: &GoalId, status: GoalStatus) -> Result<()> {
            self.ops.lock().unwrap().push(format!("status {id} {status}"));
            Ok(())
        }

        fn create_goal(&self, title: &str, _parent_id: Option<&GoalId>) -> Result<GoalId> {
            self.ops.lock().unwrap().push(format!("create {title}"));
            Ok(GoalId::from(title))
        }

        fn delete_goal(&self, id: &GoalId) -> Result<()> {
            self.ops.lock().unwrap().push(format!("delete {id}"));
            Ok(())
        }
    }

    fn pump(session: &mut GoalSession, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if session.poll() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn ready_session(nodes: &[(&str, Option<&str>)]) -> GoalSession {
        let mut session = GoalSession::new(Arc::new(StaticFetch {
            response: response(nodes),
        }))
        .with_viewport_debounce(Duration::ZERO);
        session.set_viewport(800.0, 600.0);
        session.flush_viewport();
        session.request_refresh();
        assert!(pump(&mut session, Duration::from_secs(2)));
        session
    }

    #[test]
    fn initial_fetch_reaches_ready_with_layout() {
        let mut session = ready_session(&[("a", None), ("b", Some("a")), ("c", Some("a"))]);
        assert!(session.phase().is_ready());

        let frame = session.render_frame();
        assert_eq!(frame.flavor, FrameFlavor::Ready);
        assert_eq!(frame.nodes.len(), 3);
        assert_eq!(frame.links.len(), 2);
        assert_eq!(frame.stats.map(|s| s.total_goals), Some(3));

        // Nothing new without further input.
        assert!(!session.poll());
    }

    #[test]
    fn empty_collection_renders_empty_state() {
        let session = ready_session(&[]);
        let frame = session.render_frame();

        assert_eq!(
            frame.flavor,
            FrameFlavor::Empty {
                message: EMPTY_STATE_MESSAGE.to_string()
            }
        );
        assert!(frame.nodes.is_empty());
        assert!(frame.links.is_empty());
    }

    #[test]
    fn fetch_failure_surfaces_error_and_retry_recovers() {
        let fetcher = ScriptedFetch::new(vec![
            (Duration::ZERO, Err("network down".to_string())),
            (Duration::ZERO, Ok(response(&[("a", None)]))),
        ]);
        let mut session =
            GoalSession::new(Arc::new(fetcher)).with_viewport_debounce(Duration::ZERO);
        session.set_viewport(800.0, 600.0);
        session.flush_viewport();

        session.request_refresh();
        assert!(session.phase().is_loading());
        assert!(pump(&mut session, Duration::from_secs(2)));
        assert!(session.phase().error_message().unwrap().contains("network down"));

        session.retry();
        assert!(session.phase().is_loading(), "retry must pass through Loading");
        assert!(pump(&mut session, Duration::from_secs(2)));
        assert!(session.phase().is_ready());
    }

    #[test]
    fn stale_fetch_outcome_is_discarded() {
        let fetcher = Arc::new(ScriptedFetch::new(vec![
            (Duration::from_millis(120), Ok(response(&[("old-root", None)]))),
            (Duration::ZERO, Ok(response(&[("new-root", None)]))),
        ]));
        let mut session =
            GoalSession::new(fetcher.clone()).with_viewport_debounce(Duration::ZERO);
        session.set_viewport(800.0, 600.0);
        session.flush_viewport();

        // Start the slow fetch and wait until it is in flight before the
        // second one supersedes it.
        session.request_refresh();
        fetcher.wait_for_call();
        session.request_refresh();
        fetcher.wait_for_call();

        // The second (latest) fetch returns first and is applied.
        assert!(pump(&mut session, Duration::from_secs(2)));
        assert_eq!(session.tree().unwrap().id.as_str(), "new-root");

        // The first fetch finishes afterwards; its result must not win.
        thread::sleep(Duration::from_millis(200));
        session.poll();
        assert_eq!(session.tree().unwrap().id.as_str(), "new-root");
    }

    #[test]
    fn closed_session_drops_late_outcomes() {
        let mut session = GoalSession::new(Arc::new(StaticFetch {
            response: response(&[("a", None)]),
        }));
        session.set_viewport(800.0, 600.0);
        session.flush_viewport();

        session.request_refresh();
        session.close();

        thread::sleep(Duration::from_millis(50));
        assert!(!session.poll());
        assert!(session.tree().is_none());
        assert!(session.is_closed());

        // No further refreshes start after teardown.
        let generation = session.generation();
        session.request_refresh();
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn toggle_collapse_keeps_layout_cache_hot() {
        let mut session = ready_session(&[("a", None), ("b", Some("a"))]);
        let (_, misses_before) = session.layout_cache_stats();

        session.toggle_collapse(&GoalId::from("b"));

        let (_, misses_after) = session.layout_cache_stats();
        assert_eq!(misses_after, misses_before, "collapse must not relayout");

        let frame = session.render_frame();
        let b = frame.nodes.iter().find(|n| n.id.as_str() == "b").unwrap();
        assert!(b.ui.collapsed);

        // Structure is unchanged.
        assert_eq!(session.tree().unwrap().node_count(), 2);

        // Unknown ids never fail.
        session.toggle_collapse(&GoalId::from("ghost"));
    }

    #[test]
    fn settled_viewport_change_recomputes_once() {
        let mut session = ready_session(&[("a", None), ("b", Some("a"))]);
        let (_, misses_before) = session.layout_cache_stats();

        // A drag-resize burst coalesces into a single recompute.
        session.set_viewport(810.0, 600.0);
        session.set_viewport(900.0, 640.0);
        session.set_viewport(1024.0, 768.0);
        assert!(session.poll());

        let (_, misses_after) = session.layout_cache_stats();
        assert_eq!(misses_after, misses_before + 1);
    }

    #[test]
    fn data_before_viewport_shows_preparing_layout() {
        let mut session = GoalSession::new(Arc::new(StaticFetch {
            response: response(&[("a", None)]),
        }))
        .with_viewport_debounce(Duration::ZERO);

        session.request_refresh();
        assert!(pump(&mut session, Duration::from_secs(2)));

        // Ready, but the zero-sized viewport cannot host a layout.
        assert_eq!(session.render_frame().flavor, FrameFlavor::PreparingLayout);

        session.set_viewport(800.0, 600.0);
        session.flush_viewport();
        assert_eq!(session.render_frame().flavor, FrameFlavor::Ready);
    }

    #[test]
    fn mutations_go_through_the_writer_and_refetch() {
        let writer = Arc::new(RecordingWriter::new());
        let mut session = GoalSession::new(Arc::new(StaticFetch {
            response: response(&[("a", None)]),
        }))
        .with_writer(writer.clone())
        .with_viewport_debounce(Duration::ZERO);
        session.set_viewport(800.0, 600.0);
        session.flush_viewport();

        session
            .update_status(&GoalId::from("a"), GoalStatus::Done)
            .unwrap();
        assert!(session.phase().is_loading(), "mutation triggers a refetch");
        assert!(pump(&mut session, Duration::from_secs(2)));
        assert!(session.phase().is_ready());

        session.delete_goal(&GoalId::from("a")).unwrap();
        assert!(pump(&mut session, Duration::from_secs(2)));

        let ops = writer.ops.lock().unwrap().clone();
        assert_eq!(ops, vec!["status a done".to_string(), "delete a".to_string()]);
    }

    #[test]
    fn refresh_publishes_lifecycle_events() {
        let session = ready_session(&[("a", None)]);
        let rx = session.bus().receiver();

        let mut saw_refresh = false;
        let mut saw_applied = false;
        let mut saw_layout = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::RefreshRequested { .. } => saw_refresh = true,
                Event::TreeApplied { node_count, .. } => {
                    saw_applied = true;
                    assert_eq!(node_count, 1);
                }
                Event::LayoutRecomputed { .. } => saw_layout = true,
                _ => {}
            }
        }
        assert!(saw_refresh && saw_applied && saw_layout);
    }
}
