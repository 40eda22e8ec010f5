//! Autoplay controller for the promo banner carousel.
//!
//! One controller drives automatic advancement through N slides with at most
//! one live timer. Three conditions suspend autoplay entirely: an explicit
//! pause (hover/focus on the carousel region), the platform's reduced-motion
//! preference, and a trivial sequence (fewer than two slides). Whenever any
//! input changes, the previous timer is cancelled before a new one (if any)
//! is armed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Default advance interval when the site config does not override it.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// What the rendering layer should draw for a given slide count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrome {
    /// Render the carousel region at all.
    pub render: bool,
    /// Show prev/next controls and slide indicators.
    pub controls: bool,
}

/// Zero slides render nothing; exactly one renders statically with no
/// controls, indicators, or timer.
pub fn chrome(slide_count: usize) -> Chrome {
    Chrome {
        render: slide_count > 0,
        controls: slide_count > 1,
    }
}

pub struct Autoplay {
    index: Arc<AtomicUsize>,
    slide_count: usize,
    paused: bool,
    reduced_motion: bool,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl Autoplay {
    /// Build a controller and arm the timer if conditions allow. Must be
    /// called from within a tokio runtime.
    pub fn new(slide_count: usize, interval: Duration, reduced_motion: bool) -> Self {
        let mut ctl = Self {
            index: Arc::new(AtomicUsize::new(0)),
            slide_count,
            paused: false,
            reduced_motion,
            interval,
            timer: None,
        };
        ctl.rearm();
        ctl
    }

    pub fn current_index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Pause signal from pointer-enter / focus-enter (and the inverse on
    /// leave). Manual navigation never toggles this.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            self.paused = paused;
            self.rearm();
        }
    }

    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        if self.reduced_motion != reduced_motion {
            self.reduced_motion = reduced_motion;
            self.rearm();
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        self.rearm();
    }

    /// Update the slide count (e.g. a banner was deactivated). The current
    /// index is reset to 0 when it falls out of range.
    pub fn set_slide_count(&mut self, slide_count: usize) {
        self.slide_count = slide_count;
        if self.current_index() >= slide_count {
            self.index.store(0, Ordering::SeqCst);
        }
        self.rearm();
    }

    pub fn go_next(&self) {
        let n = self.slide_count;
        if n == 0 {
            return;
        }
        let _ = self
            .index
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % n));
    }

    pub fn go_prev(&self) {
        let n = self.slide_count;
        if n == 0 {
            return;
        }
        let _ = self
            .index
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + n - 1) % n));
    }

    /// Jump to an explicit slide. Out-of-range indices are ignored.
    pub fn go_to(&self, i: usize) {
        if i < self.slide_count {
            self.index.store(i, Ordering::SeqCst);
        }
    }

    /// Keyboard contract while the carousel region has focus. Returns true
    /// when the caller must suppress the default scroll behavior.
    pub fn handle_key(&self, key: &str) -> bool {
        match key {
            "ArrowLeft" => {
                self.go_prev();
                true
            }
            "ArrowRight" => {
                self.go_next();
                true
            }
            _ => false,
        }
    }

    fn suspended(&self) -> bool {
        self.reduced_motion || self.paused || self.slide_count <= 1
    }

    /// Cancel the previous timer, then arm a new one unless suspended. This
    /// is the only place a timer is created, so at most one is ever live.
    fn rearm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if self.suspended() {
            return;
        }
        let index = Arc::clone(&self.index);
        let n = self.slide_count;
        let period = self.interval;
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            // Each tick schedules from the previous firing; no drift
            // compensation.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() yields its first tick immediately; the first real
            // advance happens one full period after arming.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let _ = index.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| {
                    Some((i + 1) % n)
                });
            }
        }));
    }
}

impl Drop for Autoplay {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const PERIOD: Duration = Duration::from_millis(100);

    /// Let the spawned timer task observe any newly elapsed ticks.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn tick_once() {
        settle().await;
        advance(PERIOD).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn advances_one_slide_per_period() {
        let ctl = Autoplay::new(3, PERIOD, false);
        assert_eq!(ctl.current_index(), 0);
        tick_once().await;
        assert_eq!(ctl.current_index(), 1);
        tick_once().await;
        assert_eq!(ctl.current_index(), 2);
        tick_once().await;
        // Wraps from last back to first.
        assert_eq!(ctl.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_suspends_and_resume_rearms() {
        let mut ctl = Autoplay::new(3, PERIOD, false);
        ctl.set_paused(true);
        assert!(!ctl.is_running());
        settle().await;
        advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(ctl.current_index(), 0);

        ctl.set_paused(false);
        assert!(ctl.is_running());
        tick_once().await;
        assert_eq!(ctl.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reduced_motion_never_arms() {
        let ctl = Autoplay::new(3, PERIOD, true);
        assert!(!ctl.is_running());
        settle().await;
        advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(ctl.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn trivial_sequences_never_arm() {
        let zero = Autoplay::new(0, PERIOD, false);
        let one = Autoplay::new(1, PERIOD, false);
        assert!(!zero.is_running());
        assert!(!one.is_running());
        settle().await;
        advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(zero.current_index(), 0);
        assert_eq!(one.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_rearms_leave_a_single_timer() {
        let mut ctl = Autoplay::new(4, PERIOD, false);
        // Churn the inputs; if timers leaked, the advance below would move
        // the index by more than one step.
        for _ in 0..10 {
            ctl.set_interval(PERIOD);
        }
        ctl.set_paused(true);
        ctl.set_paused(false);
        tick_once().await;
        assert_eq!(ctl.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_navigation_wraps_and_ignores_out_of_range() {
        let ctl = Autoplay::new(4, PERIOD, true);
        for _ in 0..4 {
            ctl.go_next();
        }
        assert_eq!(ctl.current_index(), 0);
        ctl.go_prev();
        assert_eq!(ctl.current_index(), 3);
        ctl.go_to(1);
        assert_eq!(ctl.current_index(), 1);
        ctl.go_to(99);
        assert_eq!(ctl.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_navigation_does_not_touch_pause_state() {
        let ctl = Autoplay::new(3, PERIOD, false);
        ctl.go_next();
        assert!(ctl.is_running());
        tick_once().await;
        assert_eq!(ctl.current_index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keyboard_maps_arrows_and_passes_the_rest() {
        let ctl = Autoplay::new(3, PERIOD, true);
        assert!(ctl.handle_key("ArrowRight"));
        assert_eq!(ctl.current_index(), 1);
        assert!(ctl.handle_key("ArrowLeft"));
        assert_eq!(ctl.current_index(), 0);
        assert!(!ctl.handle_key("Enter"));
        assert_eq!(ctl.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_slide_count_resets_out_of_range_index() {
        let mut ctl = Autoplay::new(5, PERIOD, true);
        ctl.go_to(4);
        ctl.set_slide_count(3);
        assert_eq!(ctl.current_index(), 0);
        // Count of one suspends the timer even if it was runnable before.
        ctl.set_reduced_motion(false);
        ctl.set_slide_count(1);
        assert!(!ctl.is_running());
    }

    #[test]
    fn chrome_decisions() {
        assert_eq!(
            chrome(0),
            Chrome {
                render: false,
                controls: false
            }
        );
        assert_eq!(
            chrome(1),
            Chrome {
                render: true,
                controls: false
            }
        );
        assert_eq!(
            chrome(2),
            Chrome {
                render: true,
                controls: true
            }
        );
    }
}
