//! Subscriber-side rate control.
//!
//! The controller sizes a window of outstanding requests. A marked Data
//! packet halves the window at once. Otherwise, after every window's
//! worth of Data the controller runs one step of a small state machine
//! fed by the lowest rate signal seen in that window and by the lowest
//! signals of the last few windows. Signals below [`SIGNAL_THRESHOLD`]
//! mean the path is close to its available rate; a zero signal means a
//! router on the path has nothing left to give.

use std::collections::VecDeque;
use std::fmt;

/// Rate signal at or above which the path is considered to have headroom.
pub const SIGNAL_THRESHOLD: u32 = 5;

/// Number of past per-window minima the controller remembers.
pub const HISTORY_LEN: usize = 5;

/// Phase of the window controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlState {
    SlowGrowth = 0,
    ProbeHigh = 1,
    ProbeLow = 2,
    SteadyZero = 3,
    SteadyNonZero = 4,
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Window-based request pacing for one flow.
#[derive(Debug, Clone)]
pub struct RateController {
    window: u32,
    outstanding: u32,
    accumulated: u32,
    /// Lowest signal since the last step; `None` stands for no sample yet.
    min_signal: Option<u16>,
    history: VecDeque<u32>,
    state: ControlState,
}

impl Default for RateController {
    fn default() -> Self {
        Self::new()
    }
}

impl RateController {
    pub fn new() -> Self {
        Self {
            window: 1,
            outstanding: 0,
            accumulated: 0,
            min_signal: None,
            history: VecDeque::with_capacity(HISTORY_LEN + 1),
            state: ControlState::SlowGrowth,
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn min_signal(&self) -> Option<u16> {
        self.min_signal
    }

    /// Requests to send when the flow starts.
    pub fn start(&mut self) -> u32 {
        self.top_up().unwrap_or(0)
    }

    /// Account for one Data packet of the flow.
    ///
    /// Returns how many more packets to request, if any.
    pub fn on_data(&mut self, signal: u16, marked: bool) -> Option<u32> {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.min_signal = Some(self.min_signal.map_or(signal, |min| min.min(signal)));

        if marked {
            self.accumulated = 0;
            if self.window > 1 {
                self.window /= 2;
            }
            self.history.clear();
            self.min_signal = None;
            self.state = ControlState::SlowGrowth;
        } else {
            self.accumulated += 1;
            while self.accumulated >= self.window {
                self.accumulated -= self.window;
                self.step();
            }
        }

        self.top_up()
    }

    fn top_up(&mut self) -> Option<u32> {
        let deficit = self.window.saturating_sub(self.outstanding);
        if deficit == 0 {
            return None;
        }
        self.outstanding = self.window;
        Some(deficit)
    }

    fn step(&mut self) {
        use ControlState::*;

        // A window that saw no sample counts as unlimited headroom.
        let signal = self.min_signal.map_or(u32::MAX, u32::from);
        self.state = match self.state {
            SlowGrowth => {
                if signal >= SIGNAL_THRESHOLD {
                    ProbeHigh
                } else {
                    self.window += 1;
                    if signal > 0 {
                        ProbeLow
                    } else {
                        SlowGrowth
                    }
                }
            }
            ProbeHigh => {
                if signal == 0 {
                    self.window += 1;
                    SlowGrowth
                } else if self.history_all(|s| s > 0) {
                    SteadyZero
                } else if signal < SIGNAL_THRESHOLD {
                    self.window += 1;
                    ProbeLow
                } else {
                    ProbeHigh
                }
            }
            ProbeLow => {
                if signal >= SIGNAL_THRESHOLD {
                    ProbeHigh
                } else if signal == 0 {
                    self.window += 1;
                    SlowGrowth
                } else if self.history_all(|s| s > 0) {
                    SteadyZero
                } else {
                    self.window += 1;
                    ProbeLow
                }
            }
            SteadyZero => {
                if signal == 0 {
                    SteadyNonZero
                } else {
                    SteadyZero
                }
            }
            SteadyNonZero => {
                if signal > 0 {
                    SteadyZero
                } else if self.history_all(|s| s == 0) {
                    self.window += 1;
                    SlowGrowth
                } else {
                    SteadyNonZero
                }
            }
        };

        self.history.push_back(signal);
        while self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
        self.min_signal = None;
    }

    /// Whether a full history is available and every entry satisfies `f`.
    fn history_all(&self, f: impl Fn(u32) -> bool) -> bool {
        self.history.len() >= HISTORY_LEN && self.history.iter().all(|&s| f(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> RateController {
        let mut controller = RateController::new();
        assert_eq!(controller.start(), 1);
        controller
    }

    #[test]
    fn test_start_requests_one() {
        let controller = started();
        assert_eq!(controller.window(), 1);
        assert_eq!(controller.outstanding(), 1);
        assert_eq!(controller.state(), ControlState::SlowGrowth);
    }

    #[test]
    fn test_mark_halves_window() {
        let mut controller = started();
        controller.window = 9;
        controller.outstanding = 9;
        controller.state = ControlState::SteadyZero;
        controller.history.extend([3, 3, 3]);

        assert_eq!(controller.on_data(100, true), None);
        assert_eq!(controller.window(), 4);
        assert_eq!(controller.state(), ControlState::SlowGrowth);
        assert!(controller.history.is_empty());
        assert_eq!(controller.min_signal(), None);
    }

    #[test]
    fn test_mark_keeps_window_at_one() {
        let mut controller = started();
        assert_eq!(controller.on_data(0, true), Some(1));
        assert_eq!(controller.window(), 1);
    }

    #[test]
    fn test_zero_signal_grows_from_slow_growth() {
        let mut controller = started();
        let mut last = controller.window();
        for _ in 0..5 {
            controller.on_data(0, false);
            assert_eq!(controller.state(), ControlState::SlowGrowth);
            assert!(controller.window() >= last);
            last = controller.window();
        }
        assert_eq!(controller.window(), 3);
    }

    #[test]
    fn test_every_data_tops_up_window() {
        let mut controller = started();
        // One sample ends the first window and grows it to 2, with nothing outstanding.
        assert_eq!(controller.on_data(0, false), Some(2));
        assert_eq!(controller.outstanding(), 2);
        assert_eq!(controller.on_data(0, false), Some(1));
        assert_eq!(controller.outstanding(), 2);
    }

    #[test]
    fn test_high_signal_probes_without_growing() {
        let mut controller = started();
        controller.on_data(50, false);
        assert_eq!(controller.state(), ControlState::ProbeHigh);
        assert_eq!(controller.window(), 1);
    }

    #[test]
    fn test_low_signal_settles_after_full_history() {
        let mut controller = started();
        let mut received = 0;
        while controller.state() != ControlState::SteadyZero {
            controller.on_data(2, false);
            received += 1;
            assert!(received <= 21, "never settled");
            if received == 1 {
                assert_eq!(controller.state(), ControlState::ProbeLow);
            }
        }
        assert_eq!(received, 21);
        assert_eq!(controller.window(), 6);

        for _ in 0..6 {
            controller.on_data(0, false);
        }
        assert_eq!(controller.state(), ControlState::SteadyNonZero);

        for _ in 0..6 {
            controller.on_data(1, false);
        }
        assert_eq!(controller.state(), ControlState::SteadyZero);
        assert_eq!(controller.window(), 6);
    }

    #[test]
    fn test_sustained_zero_leaves_steady_state() {
        let mut controller = started();
        controller.window = 1;
        controller.state = ControlState::SteadyNonZero;
        controller.history.extend([0, 0, 0, 0, 0]);

        controller.on_data(0, false);
        assert_eq!(controller.state(), ControlState::SlowGrowth);
        assert_eq!(controller.window(), 2);
    }
}
