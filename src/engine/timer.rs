// Cancellable chained tick on a virtual clock.
//
// The clock only moves when the owner calls advance(dt), so the same code runs
// against wall time in the viewer and against simulated time in tests.
//
// At most one tick is pending at any moment. A fired tick is taken out of the
// timer by poll(); the next one exists only if the tick handler re-arms it via
// reschedule(). cancel() drops the pending tick, and a cancelled or superseded
// handle can never fire.

use std::time::Duration;

/// Identifies one scheduled tick. Every start/reschedule issues a fresh handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// A tick that came due, returned by [`TickTimer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTick {
    pub handle: TimerHandle,
    /// Scheduled time of the tick (not the time it was observed).
    pub due: Duration,
}

#[derive(Debug, Clone, Copy)]
struct PendingTick {
    handle: TimerHandle,
    due: Duration,
}

#[derive(Debug, Clone)]
pub struct TickTimer {
    now: Duration,
    period: Duration,
    pending: Option<PendingTick>,
    next_id: u64,
}

impl TickTimer {
    /// `period` is raised to 1 ms if zero, so a chain always makes progress.
    pub fn new(period: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            period: period.max(Duration::from_millis(1)),
            pending: None,
            next_id: 0,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Takes effect for the next scheduled tick.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period.max(Duration::from_millis(1));
    }

    /// Cancel anything pending and schedule a tick one period from now.
    pub fn start(&mut self) -> TimerHandle {
        self.cancel();
        self.schedule_at(self.now + self.period)
    }

    /// Chain the next tick one period after `fired` was due.
    pub fn reschedule(&mut self, fired: FiredTick) -> TimerHandle {
        self.schedule_at(fired.due + self.period)
    }

    /// Drop the pending tick, if any. Returns its handle.
    pub fn cancel(&mut self) -> Option<TimerHandle> {
        self.pending.take().map(|p| p.handle)
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending.map(|p| p.handle)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Move the clock forward. Does not fire anything; call poll() afterwards.
    pub fn advance(&mut self, dt: Duration) {
        self.now += dt;
    }

    /// Take the pending tick if it is due.
    pub fn poll(&mut self) -> Option<FiredTick> {
        match self.pending {
            Some(p) if p.due <= self.now => {
                self.pending = None;
                Some(FiredTick { handle: p.handle, due: p.due })
            }
            _ => None,
        }
    }

    fn schedule_at(&mut self, due: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(PendingTick { handle, due });
        handle
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(33))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_only_when_due() {
        let mut timer = TickTimer::new(ms(33));
        let handle = timer.start();
        timer.advance(ms(32));
        assert_eq!(timer.poll(), None);
        timer.advance(ms(1));
        let fired = timer.poll().unwrap();
        assert_eq!(fired.handle, handle);
        assert_eq!(fired.due, ms(33));
        assert!(!timer.is_pending());
    }

    #[test]
    fn reschedule_chains_from_due_time() {
        let mut timer = TickTimer::new(ms(10));
        timer.start();
        timer.advance(ms(25));
        let first = timer.poll().unwrap();
        let second_handle = timer.reschedule(first);
        // due at 20, already past
        let second = timer.poll().unwrap();
        assert_eq!(second.handle, second_handle);
        assert_eq!(second.due, ms(20));
        timer.reschedule(second);
        assert_eq!(timer.poll(), None);
    }

    #[test]
    fn cancelled_tick_never_fires() {
        let mut timer = TickTimer::new(ms(10));
        let handle = timer.start();
        assert_eq!(timer.cancel(), Some(handle));
        timer.advance(ms(100));
        assert_eq!(timer.poll(), None);
    }

    #[test]
    fn restart_supersedes_previous_handle() {
        let mut timer = TickTimer::new(ms(10));
        let old = timer.start();
        timer.advance(ms(5));
        let new = timer.start();
        assert_ne!(old, new);
        timer.advance(ms(5));
        assert_eq!(timer.poll(), None);
        timer.advance(ms(5));
        assert_eq!(timer.poll().map(|f| f.handle), Some(new));
    }

    #[test]
    fn zero_period_is_raised() {
        let timer = TickTimer::new(Duration::ZERO);
        assert_eq!(timer.period(), ms(1));
    }
}
