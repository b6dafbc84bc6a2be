use std::time::{Duration, Instant};

/// Debounced save: every edit pushes the deadline back, so a burst of
/// keystrokes produces one save once input goes quiet.
#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Cancel any pending save and start the countdown again from `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(now))
    }

    /// True exactly once per scheduled burst, when its deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(2);

    #[test]
    fn nothing_fires_until_scheduled() {
        let mut timer = AutosaveTimer::new(DELAY);
        let now = Instant::now();
        assert!(!timer.is_pending());
        assert!(!timer.fire_if_due(now + Duration::from_secs(60)));
        assert_eq!(timer.time_until_due(now), None);
    }

    #[test]
    fn fires_once_after_the_delay() {
        let mut timer = AutosaveTimer::new(DELAY);
        let start = Instant::now();
        timer.schedule(start);

        assert!(!timer.fire_if_due(start + Duration::from_millis(1999)));
        assert!(timer.fire_if_due(start + DELAY));
        assert!(!timer.fire_if_due(start + DELAY * 2));
        assert!(!timer.is_pending());
    }

    #[test]
    fn each_keystroke_restarts_the_countdown() {
        let mut timer = AutosaveTimer::new(DELAY);
        let start = Instant::now();

        let mut fired = 0;
        for ms in (0..3000).step_by(500) {
            let now = start + Duration::from_millis(ms);
            if timer.fire_if_due(now) {
                fired += 1;
            }
            timer.schedule(now);
        }
        assert_eq!(fired, 0);

        let last_keystroke = start + Duration::from_millis(2500);
        assert_eq!(timer.time_until_due(last_keystroke), Some(DELAY));
        assert!(timer.fire_if_due(last_keystroke + DELAY));
    }

    #[test]
    fn cancel_drops_the_pending_save() {
        let mut timer = AutosaveTimer::new(DELAY);
        let start = Instant::now();
        timer.schedule(start);
        timer.cancel();
        assert!(!timer.fire_if_due(start + DELAY));
    }

    #[test]
    fn overdue_timer_reports_zero_wait() {
        let mut timer = AutosaveTimer::new(DELAY);
        let start = Instant::now();
        timer.schedule(start);
        assert_eq!(timer.time_until_due(start + DELAY * 3), Some(Duration::ZERO));
    }
}
