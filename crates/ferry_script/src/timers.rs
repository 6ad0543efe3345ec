//! Cooperative timers
//!
//! Backs `setTimeout` and `setInterval`. Nothing runs on its own: the host
//! asks for due timers and fires their callbacks one at a time. An interval
//! that falls behind skips the ticks it missed instead of queueing them.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Shortest period an interval may have.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest delay a timer accepts. Larger delays are clamped to it.
pub const MAX_DELAY: Duration = Duration::from_millis(i32::MAX as u64);

/// Delay for a script-supplied millisecond count. Negative and NaN counts
/// mean no delay; anything past [`MAX_DELAY`] is clamped.
pub fn delay_from_millis(ms: f64) -> Duration {
    if ms.is_nan() || ms <= 0.0 {
        return Duration::ZERO;
    }
    if ms >= MAX_DELAY.as_millis() as f64 {
        return MAX_DELAY;
    }
    Duration::from_secs_f64(ms / 1000.0)
}

fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(MAX_DELAY)).unwrap_or(now)
}

pub type TimerId = u32;

#[derive(Debug, Clone, Copy)]
struct Timer {
    due: Instant,
    period: Option<Duration>,
}

#[derive(Debug)]
pub struct Scheduler {
    next_id: TimerId,
    timers: BTreeMap<TimerId, Timer>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot timer firing `delay` after `now`.
    pub fn schedule_once(&mut self, now: Instant, delay: Duration) -> TimerId {
        self.insert(Timer {
            due: deadline(now, delay),
            period: None,
        })
    }

    /// Repeating timer, first firing one `period` after `now`.
    pub fn schedule_repeating(&mut self, now: Instant, period: Duration) -> TimerId {
        let period = period.clamp(MIN_PERIOD, MAX_DELAY);
        self.insert(Timer {
            due: deadline(now, period),
            period: Some(period),
        })
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn is_repeating(&self, id: TimerId) -> bool {
        self.timers.get(&id).is_some_and(|timer| timer.period.is_some())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.due).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Timers due at `now`, earliest first. One-shot timers are removed;
    /// repeating ones move to the first multiple of their period after `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(Instant, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= now)
            .map(|(id, timer)| (timer.due, *id))
            .collect();
        due.sort();

        for (_, id) in &due {
            let Some(period) = self.timers.get(id).map(|timer| timer.period) else {
                continue;
            };
            match period {
                None => {
                    self.timers.remove(id);
                }
                Some(period) => {
                    let Some(timer) = self.timers.get_mut(id) else {
                        continue;
                    };
                    let behind = now.duration_since(timer.due).as_nanos();
                    let period_nanos = period.as_nanos().max(1);
                    let missed = behind / period_nanos;
                    if missed > 0 {
                        let missed = u64::try_from(missed).unwrap_or(u64::MAX);
                        tracing::debug!(timer = id, missed, "interval fell behind, skipping ticks");
                    }
                    // Never more than one period ahead, so it fits
                    let ahead = u64::try_from(period_nanos - behind % period_nanos).unwrap_or(u64::MAX);
                    timer.due = deadline(now, Duration::from_nanos(ahead));
                }
            }
        }

        due.into_iter().map(|(_, id)| id).collect()
    }

    fn insert(&mut self, timer: Timer) -> TimerId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.timers.insert(id, timer);
        id
    }
}
