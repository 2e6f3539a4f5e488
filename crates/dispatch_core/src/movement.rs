//! Time-driven movement of a driver along a route.
//!
//! A route of `n` points animated over `D` emits `n - 1` updates: point `i`
//! at `t = i * D / (n - 1)` with progress `i / (n - 1)`. The first update is
//! immediate and the last one reports `(n - 2) / (n - 1)`; the leg is over
//! when the task finishes one interval later, at `t = D`.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::interval;
use tracing::debug;

use crate::routing::Route;
use crate::spatial::Coordinate;

/// How a leg's movement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegOutcome {
    /// Every point was emitted and the final interval elapsed.
    Completed,
    /// Stopped through [`MovementHandle::cancel`] or by dropping the handle.
    Cancelled,
    /// The route had fewer than two points, so nothing ran.
    Skipped,
}

/// Shared open/closed flag between a movement task and its stoppers.
///
/// Updates run while the gate's lock is held, so closing it waits for a
/// delivery already under way on another worker and blocks any later one.
#[derive(Debug, Clone, Default)]
pub(crate) struct UpdateGate {
    closed: Arc<Mutex<bool>>,
}

impl UpdateGate {
    pub(crate) fn close(&self) {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Run `deliver` unless the gate is closed. Returns whether it ran.
    pub(crate) fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return false;
        }
        deliver();
        true
    }
}

/// Stops a movement without owning its handle.
#[derive(Debug)]
pub(crate) struct MovementStopper {
    gate: UpdateGate,
    task: AbortHandle,
}

impl MovementStopper {
    pub(crate) fn stop(&self) {
        self.gate.close();
        self.task.abort();
    }
}

/// Owning handle to a running movement timer.
///
/// Dropping the handle stops the timer.
#[derive(Debug)]
pub struct MovementHandle {
    gate: UpdateGate,
    task: Option<JoinHandle<bool>>,
}

impl MovementHandle {
    /// Handle with no task behind it.
    pub fn inert() -> Self {
        Self {
            gate: UpdateGate::default(),
            task: None,
        }
    }

    /// Spawn the future built by `make`, which receives the gate its
    /// updates must pass through and resolves to whether the leg ran to
    /// the end.
    pub(crate) fn spawn<M, F>(make: M) -> Self
    where
        M: FnOnce(UpdateGate) -> F,
        F: Future<Output = bool> + Send + 'static,
    {
        let gate = UpdateGate::default();
        let task = tokio::spawn(make(gate.clone()));
        Self {
            gate,
            task: Some(task),
        }
    }

    /// Stop the timer. No further updates are delivered once this returns,
    /// even when the task is mid-tick on another worker thread.
    /// Safe to call repeatedly and after the movement finished.
    pub fn cancel(&self) {
        self.gate.close();
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_inert(&self) -> bool {
        self.task.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub(crate) fn stopper(&self) -> Option<MovementStopper> {
        self.task.as_ref().map(|task| MovementStopper {
            gate: self.gate.clone(),
            task: task.abort_handle(),
        })
    }

    /// Wait for the movement to end.
    pub async fn finished(mut self) -> LegOutcome {
        let Some(task) = self.task.take() else {
            return LegOutcome::Skipped;
        };
        match task.await {
            Ok(true) => LegOutcome::Completed,
            Ok(false) | Err(_) => LegOutcome::Cancelled,
        }
    }
}

impl Drop for MovementHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.gate.close();
            task.abort();
        }
    }
}

/// Animate `route` over `duration`, calling `on_update(position, progress)`
/// on every tick.
///
/// Routes with fewer than two points return an inert handle and never call
/// `on_update`. Must be called from within a tokio runtime.
pub fn simulate_movement<F>(route: Route, duration: Duration, on_update: F) -> MovementHandle
where
    F: FnMut(Coordinate, f64) + Send + 'static,
{
    if route.len() < 2 {
        debug!(points = route.len(), "degenerate route, nothing to animate");
        return MovementHandle::inert();
    }
    MovementHandle::spawn(|gate| async move {
        run_movement(route, duration, &gate, on_update).await
    })
}

/// Emits the updates for `route` in the current task through `gate` and
/// returns at `t = duration`. Returns `false` without waiting out the leg
/// when the gate closes first, and immediately for degenerate routes.
pub(crate) async fn run_movement<F>(
    route: Route,
    duration: Duration,
    gate: &UpdateGate,
    mut on_update: F,
) -> bool
where
    F: FnMut(Coordinate, f64),
{
    if route.len() < 2 {
        return false;
    }
    let steps = route.len() - 1;
    let divisor = u32::try_from(steps).unwrap_or(u32::MAX);
    // tokio rejects a zero period.
    let period = (duration / divisor).max(Duration::from_nanos(1));
    debug!(steps, period_ms = period.as_millis() as u64, "movement started");

    let mut ticker = interval(period);
    for (i, position) in route.iter().take(steps).enumerate() {
        ticker.tick().await;
        let progress = i as f64 / steps as f64;
        if !gate.deliver(|| on_update(*position, progress)) {
            return false;
        }
    }
    ticker.tick().await;
    gate.deliver(|| {})
}
