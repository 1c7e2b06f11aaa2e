//! Refresh scheduler
//!
//! Owns the forest and keeps it current with two timers:
//! - full refresh: rediscover roots and rebuild the forest from scratch
//! - targeted refresh: refetch every node whose Ready condition is not true
//!
//! A single loop task owns all mutable state. Fetches run on spawned tasks
//! and report back over a channel, so results are applied one at a time in
//! arrival order. Snapshots are published through a watch channel.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::models::Resource;
use crate::relations::{Expansion, Forest, NodeId, NodeKey, NodeRefresh, TreeBuilder};

/// Full rebuild period
pub const DEFAULT_FULL_INTERVAL: Duration = Duration::from_millis(195_000);
/// Targeted refresh period
pub const DEFAULT_TARGETED_INTERVAL: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshIntervals {
    pub full: Duration,
    pub targeted: Duration,
}

impl RefreshIntervals {
    /// Replace zero periods, which tokio timers reject, with the defaults
    pub fn or_default(self) -> Self {
        let fallback = Self::default();
        Self {
            full: if self.full.is_zero() { fallback.full } else { self.full },
            targeted: if self.targeted.is_zero() {
                fallback.targeted
            } else {
                self.targeted
            },
        }
    }
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            full: DEFAULT_FULL_INTERVAL,
            targeted: DEFAULT_TARGETED_INTERVAL,
        }
    }
}

/// Actions a consumer can ask of the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a node, loading its children first when needed
    Expand(NodeId),
    /// Close a node without discarding its children
    Collapse(NodeId),
    /// Track a resource for inspection; refreshes of its key update it
    Focus(Option<NodeKey>),
    /// Run a full rebuild now
    RefreshNow,
}

/// Snapshot published after every change
#[derive(Debug, Clone, Default)]
pub struct TreeView {
    pub forest: Forest,
    pub focused: Option<NodeKey>,
    pub focused_resource: Option<Resource>,
}

/// Results reported by spawned fetch tasks
#[derive(Debug)]
enum Event {
    Rebuilt(Forest),
    Refreshed(NodeRefresh),
    Expanded(Expansion),
}

pub struct RefreshScheduler {
    builder: TreeBuilder,
    intervals: RefreshIntervals,
}

impl RefreshScheduler {
    pub fn new(builder: TreeBuilder, intervals: RefreshIntervals) -> Self {
        let checked = intervals.or_default();
        if checked != intervals {
            tracing::warn!("Zero refresh interval replaced with the default");
        }
        Self {
            builder,
            intervals: checked,
        }
    }

    /// Start the timers. The first full build runs immediately.
    pub fn spawn(self) -> SchedulerHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(TreeView::default());

        let task = tokio::spawn(async move {
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let state = LoopState {
                builder: self.builder,
                events: event_tx,
                view: view_tx,
                forest: Forest::new(),
                focused: None,
                focused_resource: None,
                rebuilding: false,
            };
            state.run(self.intervals, command_rx, event_rx).await;
        });

        SchedulerHandle {
            commands: command_tx,
            view: view_rx,
            task,
        }
    }
}

struct LoopState {
    builder: TreeBuilder,
    events: mpsc::UnboundedSender<Event>,
    view: watch::Sender<TreeView>,
    forest: Forest,
    focused: Option<NodeKey>,
    focused_resource: Option<Resource>,
    rebuilding: bool,
}

impl LoopState {
    async fn run(
        mut self,
        intervals: RefreshIntervals,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        let mut full = tokio::time::interval(intervals.full);
        full.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut targeted =
            tokio::time::interval_at(Instant::now() + intervals.targeted, intervals.targeted);
        targeted.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = full.tick() => self.start_rebuild(),
                _ = targeted.tick() => self.start_targeted_refresh(),
                Some(event) = events.recv() => self.apply(event),
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        tracing::debug!("Scheduler handle dropped, stopping");
                        break;
                    }
                },
            }
        }
    }

    fn start_rebuild(&mut self) {
        if self.rebuilding {
            tracing::debug!("Full refresh still running, skipping tick");
            return;
        }
        self.rebuilding = true;

        let builder = self.builder.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let forest = builder.build_forest().await;
            let _ = events.send(Event::Rebuilt(forest));
        });
    }

    fn start_targeted_refresh(&mut self) {
        let candidates = self.builder.refresh_candidates(&self.forest);
        if !candidates.is_empty() {
            tracing::debug!("Refreshing {} unready nodes", candidates.len());
        }

        for (key, resource) in candidates {
            let Some(guard) = self.builder.begin_refresh(&key) else {
                tracing::debug!("Skipping refresh of {}: already in flight", key);
                continue;
            };
            let builder = self.builder.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                let refresh = builder.refresh_node(guard, resource).await;
                let _ = events.send(Event::Refreshed(refresh));
            });
        }
    }

    fn start_expansion(&mut self, id: NodeId) {
        match self.builder.expansion_request(&self.forest, id) {
            Some(request) => {
                let builder = self.builder.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let expansion = builder.resolve_expansion(request).await;
                    let _ = events.send(Event::Expanded(expansion));
                });
            }
            None => {
                if self.forest.set_expanded(id, true) {
                    self.publish();
                } else {
                    tracing::debug!("Ignoring expand of unknown position {}", id);
                }
            }
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Rebuilt(mut forest) => {
                self.rebuilding = false;
                let reopen = forest.restore_expansion(&self.forest);
                self.forest = forest;
                self.refocus();
                for id in reopen {
                    self.start_expansion(id);
                }
            }
            Event::Refreshed(refresh) => {
                if self.focused.as_ref() == Some(&refresh.key) {
                    self.focused_resource = Some(refresh.resource.clone());
                }
                self.builder.apply_refresh(&mut self.forest, refresh);
            }
            Event::Expanded(expansion) => {
                self.builder.apply_expansion(&mut self.forest, expansion);
            }
        }
        self.publish();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Expand(id) => self.start_expansion(id),
            Command::Collapse(id) => {
                if self.forest.set_expanded(id, false) {
                    self.publish();
                }
            }
            Command::Focus(key) => {
                self.focused = key;
                self.refocus();
                self.publish();
            }
            Command::RefreshNow => self.start_rebuild(),
        }
    }

    fn refocus(&mut self) {
        self.focused_resource = self
            .focused
            .as_ref()
            .and_then(|key| self.forest.resource(key).cloned());
    }

    fn publish(&self) {
        self.view.send_replace(TreeView {
            forest: self.forest.clone(),
            focused: self.focused.clone(),
            focused_resource: self.focused_resource.clone(),
        });
    }
}

/// Handle to a running scheduler. Dropping it stops the timers; fetches
/// already started run to completion and their results are discarded.
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<TreeView>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Queue a command. Returns false once the scheduler has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn expand(&self, id: NodeId) -> bool {
        self.send(Command::Expand(id))
    }

    pub fn collapse(&self, id: NodeId) -> bool {
        self.send(Command::Collapse(id))
    }

    pub fn focus(&self, key: Option<NodeKey>) -> bool {
        self.send(Command::Focus(key))
    }

    pub fn refresh_now(&self) -> bool {
        self.send(Command::RefreshNow)
    }

    /// A receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<TreeView> {
        self.view.clone()
    }

    /// The latest snapshot
    pub fn current(&self) -> TreeView {
        self.view.borrow().clone()
    }

    /// Stop the timers
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
