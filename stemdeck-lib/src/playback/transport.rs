//! The shared playback clock.
//!
//! A single frame cursor drives every track of a batch. Only
//! [`Transport::advance`] moves it while playing, so tracks rendered from the
//! same span can never drift apart.

/// Transport state exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Paused,
    Playing,
}

/// Frames handed to the mixer by one call to [`Transport::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub frames: u64,
    /// The span reached the end of content and the clock auto-stopped.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    position: u64,
    sample_rate: u32,
}

impl Transport {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            state: TransportState::Stopped,
            position: 0,
            sample_rate,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn position_frames(&self) -> u64 {
        self.position
    }

    pub fn position_seconds(&self) -> f64 {
        frames_to_seconds(self.position, self.sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Start or resume from the current position. Returns `false` if
    /// already playing.
    pub fn play(&mut self) -> bool {
        if self.state == TransportState::Playing {
            return false;
        }
        self.state = TransportState::Playing;
        true
    }

    /// Freeze the clock. No-op unless playing.
    pub fn pause(&mut self) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.state = TransportState::Paused;
        true
    }

    /// Stop and rewind. Safe to call repeatedly.
    pub fn stop(&mut self) -> bool {
        let changed = self.state != TransportState::Stopped || self.position != 0;
        self.state = TransportState::Stopped;
        self.position = 0;
        changed
    }

    /// Flip between playing and paused/stopped.
    pub fn toggle(&mut self) -> TransportState {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.state
    }

    /// Move the cursor without changing state, clamped to `[0, end]`.
    ///
    /// A stopped clock that is moved away from zero becomes paused there so
    /// the stopped state keeps meaning "at the start".
    pub fn seek_frames(&mut self, frame: u64, end: u64) {
        self.position = frame.min(end);
        if self.state == TransportState::Stopped && self.position > 0 {
            self.state = TransportState::Paused;
        }
    }

    /// Advance a playing clock by up to `requested` frames.
    ///
    /// Returns `None` when the clock is not running. Reaching `end`
    /// auto-stops the transport and rewinds to zero.
    pub fn advance(&mut self, requested: u64, end: u64) -> Option<Span> {
        if self.state != TransportState::Playing {
            return None;
        }

        let start = self.position;
        let frames = requested.min(end.saturating_sub(start));
        self.position = start + frames;

        let finished = self.position >= end;
        if finished {
            self.state = TransportState::Stopped;
            self.position = 0;
        }

        Some(Span {
            start,
            frames,
            finished,
        })
    }
}

pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped_at_zero() {
        let transport = Transport::new(48_000);
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position_frames(), 0);
    }

    #[test]
    fn pause_freezes_and_play_resumes_from_position() {
        let mut transport = Transport::new(1_000);
        transport.play();
        transport.advance(300, 1_000);
        assert!(transport.pause());
        assert!(!transport.pause());
        assert_eq!(transport.advance(300, 1_000), None);
        assert_eq!(transport.position_frames(), 300);

        transport.play();
        let span = transport.advance(100, 1_000).unwrap();
        assert_eq!(span.start, 300);
        assert_eq!(transport.position_frames(), 400);
    }

    #[test]
    fn stop_rewinds_and_is_repeatable() {
        let mut transport = Transport::new(1_000);
        transport.play();
        transport.advance(10, 1_000);
        assert!(transport.stop());
        assert!(!transport.stop());
        assert_eq!(transport.position_frames(), 0);
    }

    #[test]
    fn reaching_the_end_auto_stops() {
        let mut transport = Transport::new(1_000);
        transport.play();
        transport.advance(900, 1_000);
        let span = transport.advance(512, 1_000).unwrap();
        assert_eq!(span.frames, 100);
        assert!(span.finished);
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position_frames(), 0);
    }

    #[test]
    fn empty_content_stops_immediately() {
        let mut transport = Transport::new(1_000);
        transport.play();
        let span = transport.advance(64, 0).unwrap();
        assert_eq!(span.frames, 0);
        assert!(!transport.is_playing());
    }

    #[test]
    fn toggle_flips_between_playing_and_paused() {
        let mut transport = Transport::new(1_000);
        assert_eq!(transport.toggle(), TransportState::Playing);
        assert_eq!(transport.toggle(), TransportState::Paused);
        assert_eq!(transport.toggle(), TransportState::Playing);
    }

    #[test]
    fn seek_clamps_and_keeps_state() {
        let mut transport = Transport::new(1_000);
        transport.seek_frames(5_000, 2_000);
        assert_eq!(transport.position_frames(), 2_000);
        assert_eq!(transport.state(), TransportState::Paused);

        transport.play();
        transport.seek_frames(10, 2_000);
        assert!(transport.is_playing());
        assert_eq!(transport.position_frames(), 10);
    }

    #[test]
    fn seconds_round_trip_through_frames() {
        assert_eq!(seconds_to_frames(1.5, 8_000), 12_000);
        assert_eq!(seconds_to_frames(-1.0, 8_000), 0);
        assert_eq!(seconds_to_frames(f64::NAN, 8_000), 0);
        assert!((frames_to_seconds(12_000, 8_000) - 1.5).abs() < 1e-9);
    }
}
