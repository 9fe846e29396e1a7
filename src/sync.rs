//! Playback time-sync
//!
//! Maps playback position to the subtitle line that should be highlighted.
//!
//! - [`TimeSyncTable`]: per-second lookup table built once per loaded video
//! - [`SyncController`]: owns the entries, the table and the highlighted line
//! - [`PlaybackTracker`]: polls a [`PlaybackClock`] every 200ms while playing
//!   and emits a [`Highlight`] whenever the active line changes

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::subtitle::{max_end, SubtitleEntry};

/// A line becomes active this many seconds before its start
pub const LOOKAHEAD_SECS: f64 = 0.3;

/// Seconds mapped past the last subtitle's end
pub const TAIL_MARGIN_SECS: usize = 2;

/// Longest span the table covers; later times never resolve
pub const MAX_TABLE_SECS: usize = 24 * 60 * 60;

/// Playback position sampling period
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Per-second lookup from playback time to subtitle index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSyncTable {
    slots: Vec<Option<usize>>,
}

impl TimeSyncTable {
    /// Build the table for `entries`.
    ///
    /// Slot `s` holds the first entry whose window `[start - 0.3, end)`
    /// contains `s`. Earlier entries win on overlap. The table covers
    /// `0..=ceil(max end) + 2`, capped at [`MAX_TABLE_SECS`]; an empty
    /// entry list gives an empty table.
    pub fn build(entries: &[SubtitleEntry]) -> Self {
        let Some(last_end) = max_end(entries).filter(|end| end.is_finite()) else {
            return Self::default();
        };
        let last_second = last_end.max(0.0).ceil();
        let max_time = if last_second >= MAX_TABLE_SECS as f64 {
            tracing::warn!(
                "Subtitles end at {}s, mapping only the first {}s",
                last_end,
                MAX_TABLE_SECS
            );
            MAX_TABLE_SECS
        } else {
            (last_second as usize + TAIL_MARGIN_SECS).min(MAX_TABLE_SECS)
        };

        let slots = (0..=max_time)
            .map(|second| {
                let t = second as f64;
                entries
                    .iter()
                    .position(|e| t >= e.start - LOOKAHEAD_SECS && t < e.end)
            })
            .collect();

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entry mapped to a whole second
    pub fn get(&self, second: usize) -> Option<usize> {
        self.slots.get(second).copied().flatten()
    }

    /// Entry for a playback position, looking one second ahead when the
    /// current second has nothing mapped.
    pub fn lookup(&self, position: f64) -> Option<usize> {
        if !position.is_finite() || position < 0.0 {
            return None;
        }
        let second = position.floor() as usize;
        self.get(second).or_else(|| self.get(second.saturating_add(1)))
    }
}

/// Emitted when the highlighted line changes
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub index: usize,
    pub entry: SubtitleEntry,
}

/// Owns the state for one loaded video: entries, table, highlighted line
#[derive(Debug, Default)]
pub struct SyncController {
    entries: Vec<SubtitleEntry>,
    table: TimeSyncTable,
    current: Option<usize>,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded video, discarding the previous table
    pub fn load(&mut self, entries: Vec<SubtitleEntry>) {
        self.table = TimeSyncTable::build(&entries);
        self.entries = entries;
        self.current = None;
        tracing::debug!(
            "Built time-sync table: {} entries, {} seconds",
            self.entries.len(),
            self.table.len()
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.table = TimeSyncTable::default();
        self.current = None;
    }

    pub fn is_ready(&self) -> bool {
        !self.table.is_empty()
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn table(&self) -> &TimeSyncTable {
        &self.table
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Resolve `position` and switch the highlight if it moved.
    ///
    /// Gaps keep the previous highlight.
    pub fn tick(&mut self, position: f64) -> Option<Highlight> {
        let index = self.table.lookup(position)?;
        if self.current == Some(index) {
            return None;
        }
        self.highlight(index)
    }

    /// Jump straight to a line, e.g. when the user clicks it
    pub fn seek_to(&mut self, index: usize) -> Option<Highlight> {
        self.highlight(index)
    }

    fn highlight(&mut self, index: usize) -> Option<Highlight> {
        let entry = self.entries.get(index)?.clone();
        self.current = Some(index);
        Some(Highlight { index, entry })
    }
}

/// Player state as reported by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Buffering,
    Playing,
    Paused,
    Ended,
    Error,
}

/// Source of the current playback position
pub trait PlaybackClock: Send + Sync {
    /// Current position in seconds, `None` if the player cannot report one
    fn current_time(&self) -> Option<f64>;
}

/// Drives highlighting for one player.
///
/// Polling runs only while the player is playing and a table is loaded.
/// Dropping the tracker stops it.
pub struct PlaybackTracker {
    controller: Arc<Mutex<SyncController>>,
    clock: Arc<dyn PlaybackClock>,
    events: mpsc::UnboundedSender<Highlight>,
    state: PlayerState,
    interval: Duration,
    poll: Option<JoinHandle<()>>,
}

impl PlaybackTracker {
    pub fn new(clock: Arc<dyn PlaybackClock>, events: mpsc::UnboundedSender<Highlight>) -> Self {
        Self::with_interval(clock, events, POLL_INTERVAL)
    }

    pub fn with_interval(
        clock: Arc<dyn PlaybackClock>,
        events: mpsc::UnboundedSender<Highlight>,
        interval: Duration,
    ) -> Self {
        Self {
            controller: Arc::new(Mutex::new(SyncController::new())),
            clock,
            events,
            state: PlayerState::Unstarted,
            interval,
            poll: None,
        }
    }

    /// Load a new video's subtitles, rebuilding the table from scratch.
    ///
    /// Must be called from within a tokio runtime if the player is playing.
    pub fn load(&mut self, entries: Vec<SubtitleEntry>) {
        self.stop();
        self.controller.lock().load(entries);
        if self.state == PlayerState::Playing {
            self.start();
        }
    }

    /// Forget the loaded video, e.g. on navigation away
    pub fn unload(&mut self) {
        self.stop();
        self.controller.lock().clear();
    }

    /// React to a player state change
    pub fn set_state(&mut self, state: PlayerState) {
        self.state = state;
        match state {
            PlayerState::Playing => self.start(),
            PlayerState::Paused | PlayerState::Ended | PlayerState::Error => self.stop(),
            PlayerState::Unstarted | PlayerState::Buffering => {}
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Highlight a line directly and return its start time for the player
    /// to seek to.
    pub fn seek_to(&mut self, index: usize) -> Option<f64> {
        let highlight = self.controller.lock().seek_to(index)?;
        let start = highlight.entry.start;
        if self.events.send(highlight).is_err() {
            tracing::debug!("Highlight receiver closed, dropping seek to {}", index);
        }
        Some(start)
    }

    pub fn current(&self) -> Option<usize> {
        self.controller.lock().current()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn start(&mut self) {
        if self.is_polling() || !self.controller.lock().is_ready() {
            return;
        }

        let controller = Arc::clone(&self.controller);
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let period = self.interval;

        tracing::debug!("Starting playback tracking every {:?}", period);
        self.poll = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(position) = clock.current_time() else {
                    continue;
                };
                let switched = controller.lock().tick(position);
                if let Some(highlight) = switched {
                    tracing::trace!("{:.1}s -> subtitle {}", position, highlight.index);
                    if events.send(highlight).is_err() {
                        tracing::debug!("Highlight receiver closed, stopping playback tracking");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop polling
    pub fn stop(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.abort();
            tracing::debug!("Stopped playback tracking");
        }
    }
}

impl Drop for PlaybackTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
