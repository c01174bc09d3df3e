/// Interval timers for a single-threaded event loop, with disposable handles
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

/// Something a screen must release when it is deactivated
pub trait Disposable {
    fn dispose(&mut self);
}

#[derive(Debug)]
struct Interval<A> {
    period: Duration,
    next: Instant,
    action: A,
}

#[derive(Debug)]
struct TimerTable<A> {
    next_id: u64,
    intervals: BTreeMap<u64, Interval<A>>,
}

/// Shared interval table.
///
/// Cloning yields another view of the same table. The host loop calls
/// `poll` once per turn and dispatches the returned actions.
#[derive(Debug)]
pub struct Timers<A> {
    table: Rc<RefCell<TimerTable<A>>>,
}

impl<A> Clone for Timers<A> {
    fn clone(&self) -> Self {
        Self {
            table: Rc::clone(&self.table),
        }
    }
}

impl<A: Clone> Timers<A> {
    pub fn new() -> Self {
        Self {
            table: Rc::new(RefCell::new(TimerTable {
                next_id: 0,
                intervals: BTreeMap::new(),
            })),
        }
    }

    /// Fire `action` every `period`, first at `now + period`
    pub fn set_interval(&self, period: Duration, now: Instant, action: A) -> TimerHandle<A> {
        let mut table = self.table.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;
        table.intervals.insert(
            id,
            Interval {
                period,
                next: now + period,
                action,
            },
        );
        TimerHandle {
            id,
            table: Rc::downgrade(&self.table),
        }
    }

    /// Collect every action due at `now`, ordered by deadline then creation.
    ///
    /// An interval fires at most once per poll and is rescheduled from `now`,
    /// so a stalled loop does not replay missed ticks.
    pub fn poll(&self, now: Instant) -> Vec<A> {
        let mut table = self.table.borrow_mut();
        let mut due: Vec<(Instant, u64)> = table
            .intervals
            .iter()
            .filter(|(_, interval)| interval.next <= now)
            .map(|(id, interval)| (interval.next, *id))
            .collect();
        due.sort();

        let mut fired = Vec::with_capacity(due.len());
        for (_, id) in due {
            if let Some(interval) = table.intervals.get_mut(&id) {
                interval.next = now + interval.period;
                fired.push(interval.action.clone());
            }
        }
        fired
    }

    pub fn pending(&self) -> usize {
        self.table.borrow().intervals.len()
    }
}

impl<A: Clone> Default for Timers<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner's handle to one interval. Disposing or dropping it cancels the
/// interval; it is a no-op once the table is gone.
#[derive(Debug)]
pub struct TimerHandle<A> {
    id: u64,
    table: Weak<RefCell<TimerTable<A>>>,
}

impl<A> TimerHandle<A> {
    pub fn is_active(&self) -> bool {
        self.table
            .upgrade()
            .is_some_and(|table| table.borrow().intervals.contains_key(&self.id))
    }

    fn cancel(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.borrow_mut().intervals.remove(&self.id);
        }
        self.table = Weak::new();
    }
}

impl<A> Disposable for TimerHandle<A> {
    fn dispose(&mut self) {
        self.cancel();
    }
}

impl<A> Drop for TimerHandle<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Resources to release when a screen goes away
#[derive(Default)]
pub struct Teardown {
    items: Vec<Box<dyn Disposable>>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Disposable + 'static) {
        self.items.push(Box::new(item));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dispose in reverse registration order and empty the list
    pub fn dispose_all(&mut self) {
        while let Some(mut item) = self.items.pop() {
            item.dispose();
        }
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown").field("items", &self.items.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_fires_and_reschedules() {
        let timers = Timers::new();
        let start = Instant::now();
        let _handle = timers.set_interval(Duration::from_millis(100), start, "tick");

        assert!(timers.poll(start + Duration::from_millis(50)).is_empty());
        assert_eq!(timers.poll(start + Duration::from_millis(100)), vec!["tick"]);
        assert!(timers.poll(start + Duration::from_millis(150)).is_empty());
        assert_eq!(timers.poll(start + Duration::from_millis(200)), vec!["tick"]);
    }

    #[test]
    fn test_stalled_loop_fires_once() {
        let timers = Timers::new();
        let start = Instant::now();
        let _handle = timers.set_interval(Duration::from_millis(10), start, 1u8);
        assert_eq!(timers.poll(start + Duration::from_secs(1)), vec![1]);
    }

    #[test]
    fn test_fire_order_is_by_deadline() {
        let timers = Timers::new();
        let start = Instant::now();
        let _slow = timers.set_interval(Duration::from_millis(30), start, "slow");
        let _fast = timers.set_interval(Duration::from_millis(20), start, "fast");
        assert_eq!(timers.poll(start + Duration::from_millis(40)), vec!["fast", "slow"]);
    }

    #[test]
    fn test_drop_and_dispose_cancel() {
        let timers = Timers::new();
        let start = Instant::now();
        let mut a = timers.set_interval(Duration::from_millis(10), start, 'a');
        let b = timers.set_interval(Duration::from_millis(10), start, 'b');
        assert_eq!(timers.pending(), 2);
        assert!(a.is_active());

        a.dispose();
        assert!(!a.is_active());
        drop(b);
        assert_eq!(timers.pending(), 0);
        assert!(timers.poll(start + Duration::from_millis(10)).is_empty());
    }

    #[test]
    fn test_handle_outliving_table() {
        let timers = Timers::new();
        let mut handle = timers.set_interval(Duration::from_millis(10), Instant::now(), ());
        drop(timers);
        assert!(!handle.is_active());
        handle.dispose();
    }

    #[test]
    fn test_teardown_disposes_everything() {
        let timers = Timers::new();
        let now = Instant::now();
        let mut teardown = Teardown::new();
        teardown.push(timers.set_interval(Duration::from_millis(5), now, 1));
        teardown.push(timers.set_interval(Duration::from_millis(7), now, 2));
        assert_eq!(teardown.len(), 2);
        assert_eq!(timers.pending(), 2);

        teardown.dispose_all();
        assert!(teardown.is_empty());
        assert_eq!(timers.pending(), 0);
    }
}
