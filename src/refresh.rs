//! # Refresh Loop
//!
//! Drives the board on two cadences inside one task:
//!
//! - **Refresh** (default 30s): fetch departures and hand them to the renderer
//! - **Animation** (default 250ms): tick the renderer, build a frame, commit it
//!
//! Fetches run as separate tokio tasks so a slow network never stalls the
//! animation. While a fetch is outstanding, further refresh ticks are skipped.
//! A failed fetch keeps the previous departures on screen.
//!
//! Until the first fetch completes the board shows a start-up message; when
//! the station has nothing to show it shows `< NO DATA >`.

use crate::board::BoardRenderer;
use crate::departures::{upcoming, DepartureSource, FetchError, Station};
use crate::display::{DisplayCommitError, DisplaySink};
use crate::grid::BoardGrid;
use crate::Departure;
use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const STARTUP_MESSAGE: &str = "LOADING...";
pub const NO_DATA_MESSAGE: &str = "< NO DATA >";

type FetchResult = Result<Vec<Departure>, FetchError>;

/// Cadences and limits for [`RefreshLoop`].
#[derive(Clone, Debug)]
pub struct Timing {
    pub refresh_interval: Duration,
    pub tick_interval: Duration,
    /// Consecutive commit failures before the loop gives up
    pub max_commit_failures: u32,
    /// Local time zone of the timetable
    pub utc_offset: FixedOffset,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            tick_interval: Duration::from_millis(250),
            max_commit_failures: 5,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Feed {
    /// No fetch has completed yet
    Waiting,
    /// Last fetch returned nothing, or failed before any data arrived
    NoData,
    Live,
}

pub struct RefreshLoop<S, D> {
    source: Arc<S>,
    station: Station,
    renderer: BoardRenderer,
    sink: D,
    timing: Timing,
    clock: Box<dyn Fn() -> NaiveTime + Send>,
    feed: Feed,
    commit_failures: u32,
}

impl<S: DepartureSource, D: DisplaySink> RefreshLoop<S, D> {
    pub fn new(
        source: S,
        station: Station,
        renderer: BoardRenderer,
        sink: D,
        timing: Timing,
    ) -> Self {
        let offset = timing.utc_offset;
        Self {
            source: Arc::new(source),
            station,
            renderer,
            sink,
            timing,
            clock: Box::new(move || Utc::now().with_timezone(&offset).time()),
            feed: Feed::Waiting,
            commit_failures: 0,
        }
    }

    /// Replace the wall clock used to order departures.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveTime + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run until `shutdown` completes, then blank the display.
    ///
    /// Returns an error only when the display keeps rejecting frames.
    pub async fn run_until<F: Future>(mut self, shutdown: F) -> Result<(), DisplayCommitError> {
        tokio::pin!(shutdown);

        let mut refresh = time::interval(self.timing.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut animation = time::interval(self.timing.tick_interval);
        animation.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut pending: Option<JoinHandle<FetchResult>> = None;
        let mut last_tick = Instant::now();

        info!(station = %self.station.id, "departure board running");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = refresh.tick() => {
                    if pending.is_some() {
                        debug!("previous fetch still outstanding, skipping refresh");
                    } else {
                        pending = Some(self.spawn_fetch());
                    }
                }
                Some(joined) = join_pending(&mut pending) => {
                    pending = None;
                    self.apply(joined);
                }
                _ = animation.tick() => {
                    let now = Instant::now();
                    self.renderer.tick(now - last_tick);
                    last_tick = now;
                    let grid = self.current_frame();
                    self.commit(&grid)?;
                }
            }
        }

        info!("shutting down, clearing display");
        let (rows, columns) = self.sink.dimensions();
        let blank = self.renderer.blank();
        if let Err(err) = self.sink.commit(&BoardGrid::blank(rows, columns, blank)) {
            warn!(error = %err, "could not clear display");
        }
        Ok(())
    }

    fn spawn_fetch(&self) -> JoinHandle<FetchResult> {
        let source = Arc::clone(&self.source);
        let station = self.station.clone();
        tokio::spawn(async move { source.fetch(&station).await })
    }

    fn apply(&mut self, joined: Result<FetchResult, JoinError>) {
        let failure = match joined {
            Ok(Ok(departures)) => {
                let shown = upcoming(departures, (self.clock)(), self.renderer.slot_count());
                info!(shown = shown.len(), "departures refreshed");
                self.renderer.update(&shown);
                self.feed = if shown.is_empty() {
                    Feed::NoData
                } else {
                    Feed::Live
                };
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(err) => err.to_string(),
        };

        warn!(error = %failure, "departure fetch failed, keeping previous data");
        if self.feed == Feed::Waiting {
            self.feed = Feed::NoData;
        }
    }

    fn current_frame(&self) -> BoardGrid {
        let layout = self.renderer.layout();
        let message = match self.feed {
            Feed::Waiting => STARTUP_MESSAGE,
            Feed::NoData if self.renderer.is_empty() => NO_DATA_MESSAGE,
            _ => return self.renderer.frame(),
        };
        BoardGrid::message(layout.rows(), layout.columns(), self.renderer.blank(), message)
    }

    /// Commit a frame. Only a run of failures is fatal; renderer progress is
    /// kept either way.
    fn commit(&mut self, grid: &BoardGrid) -> Result<(), DisplayCommitError> {
        match self.sink.commit(grid) {
            Ok(()) => {
                self.commit_failures = 0;
                Ok(())
            }
            Err(err) => {
                self.commit_failures += 1;
                error!(error = %err, failures = self.commit_failures, "display commit failed");
                if self.commit_failures >= self.timing.max_commit_failures {
                    Err(err)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Resolve with the outstanding fetch, or never when there is none.
async fn join_pending<T>(pending: &mut Option<JoinHandle<T>>) -> Option<Result<T, JoinError>> {
    match pending {
        Some(handle) => Some(handle.await),
        None => std::future::pending().await,
    }
}
