//! Per-track gain, mute and solo.

/// Mixer settings for one track. Reset for every new batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerState {
    /// 0–100, mapped linearly onto amplitude.
    pub volume_percent: f32,
    pub muted: bool,
    pub soloed: bool,
}

impl Default for MixerState {
    fn default() -> Self {
        Self {
            volume_percent: 100.0,
            muted: false,
            soloed: false,
        }
    }
}

/// The mixer-channel handle owned by a loaded track.
///
/// Setters return `true` only when the stored value changed.
#[derive(Debug, Clone, Default)]
pub struct MixerChannel {
    state: MixerState,
}

impl MixerChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MixerState {
        self.state
    }

    pub fn set_volume(&mut self, percent: f32) -> bool {
        let percent = clamp_percent(percent);
        if self.state.volume_percent == percent {
            return false;
        }
        self.state.volume_percent = percent;
        true
    }

    pub fn set_muted(&mut self, muted: bool) -> bool {
        if self.state.muted == muted {
            return false;
        }
        self.state.muted = muted;
        true
    }

    pub fn set_soloed(&mut self, soloed: bool) -> bool {
        if self.state.soloed == soloed {
            return false;
        }
        self.state.soloed = soloed;
        true
    }

    /// Back to unity, unmuted, unsoloed.
    pub fn reset(&mut self) {
        self.state = MixerState::default();
    }
}

/// Clamp a volume percentage into `0..=100`. NaN counts as silence.
pub fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Amplitude gain for a volume percentage: 100 is unity, 0 is silence.
pub fn volume_to_gain(percent: f32) -> f32 {
    clamp_percent(percent) / 100.0
}

/// True when any of the given channels is soloed.
pub fn solo_active(states: impl IntoIterator<Item = MixerState>) -> bool {
    states.into_iter().any(|state| state.soloed)
}

/// Whether a track is heard given the batch-wide solo flag.
pub fn is_audible(state: &MixerState, solo_active: bool) -> bool {
    !state.muted && (!solo_active || state.soloed)
}

/// Gain applied to a track's samples at render time.
pub fn effective_gain(state: &MixerState, solo_active: bool) -> f32 {
    if is_audible(state, solo_active) {
        volume_to_gain(state.volume_percent)
    } else {
        0.0
    }
}
