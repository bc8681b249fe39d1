use foundation::time::Time;

/// Longest frame step handed to animation code. Slow frames below 1 fps and
/// a backgrounded tab resume with one bounded step instead of a jump.
pub const MAX_FRAME_DT_S: f64 = 1.0;

/// Per-frame metadata handed to everything animated.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame.
    pub dt_s: f64,
    /// Accumulated scene time at the end of the frame (seconds).
    pub time: Time,
}

impl Frame {
    pub fn first() -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time: Time(0.0),
        }
    }

    pub fn next(self, dt_s: f64) -> Self {
        Self {
            index: self.index + 1,
            dt_s,
            time: Time(self.time.0 + dt_s),
        }
    }
}

/// Turns wall-clock timestamps (from `requestAnimationFrame`) into frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last_now_s: Option<f64>,
    current: Option<Frame>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `now_s`. The first tick has `dt_s == 0`; clock skew
    /// backwards also yields 0.
    pub fn tick(&mut self, now_s: f64) -> Frame {
        let dt = match self.last_now_s {
            Some(last) if now_s.is_finite() => (now_s - last).clamp(0.0, MAX_FRAME_DT_S),
            _ => 0.0,
        };
        if now_s.is_finite() {
            self.last_now_s = Some(now_s);
        }
        let frame = match self.current {
            Some(prev) => prev.next(dt),
            None => Frame::first(),
        };
        self.current = Some(frame);
        frame
    }

    pub fn current(&self) -> Option<Frame> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, FrameClock, MAX_FRAME_DT_S};
    use foundation::time::Time;

    #[test]
    fn next_advances_index_and_time() {
        let f0 = Frame::first();
        let f1 = f0.next(0.5);
        assert_eq!(f1.index, 1);
        assert_eq!(f1.time, Time(0.5));
    }

    #[test]
    fn clock_measures_elapsed_time() {
        let mut clock = FrameClock::new();
        let f0 = clock.tick(10.0);
        assert_eq!(f0.dt_s, 0.0);
        let f1 = clock.tick(10.016);
        assert!((f1.dt_s - 0.016).abs() < 1e-9);
        assert_eq!(f1.index, 1);
    }

    #[test]
    fn clock_bounds_long_gaps_and_backwards_skew() {
        let mut clock = FrameClock::new();
        clock.tick(1.0);
        assert_eq!(clock.tick(30.0).dt_s, MAX_FRAME_DT_S);
        assert_eq!(clock.tick(29.0).dt_s, 0.0);
        assert_eq!(clock.tick(f64::NAN).dt_s, 0.0);
        assert_eq!(clock.current().map(|f| f.index), Some(3));
    }

    #[test]
    fn slow_frames_keep_their_full_step() {
        let mut clock = FrameClock::new();
        clock.tick(2.0);
        assert!((clock.tick(2.2).dt_s - 0.2).abs() < 1e-12);
        assert!((clock.tick(2.7).dt_s - 0.5).abs() < 1e-12);
    }
}
