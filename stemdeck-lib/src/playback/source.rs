//! The single rodio source that renders every track of a batch.

use std::sync::Arc;
use std::time::Duration;

use rodio::Source;

use crate::audio::{TrackAudio, OUTPUT_CHANNELS};
use crate::playback::engine::session::{BlockPlan, Shared};
use crate::playback::transport::Span;

/// Pulls blocks from the shared transport and mixes all audible tracks at
/// the same frame offset.
///
/// The source never ends on its own; it yields silence while the transport
/// is stopped or paused and finishes only once the engine is disposed.
pub struct TransportSource {
    shared: Arc<Shared>,
    block: Vec<f32>,
    cursor: usize,
    block_frames: usize,
    sample_rate: u32,
    inputs: Vec<(Arc<TrackAudio>, f32)>,
    ended: bool,
}

impl TransportSource {
    pub(crate) fn new(shared: Arc<Shared>, block_frames: usize, sample_rate: u32) -> Self {
        Self {
            shared,
            block: Vec::with_capacity(block_frames * OUTPUT_CHANNELS as usize),
            cursor: 0,
            block_frames: block_frames.max(1),
            sample_rate,
            inputs: Vec::new(),
            ended: false,
        }
    }

    fn render_block(&mut self) -> bool {
        self.block.clear();
        self.block
            .resize(self.block_frames * OUTPUT_CHANNELS as usize, 0.0);
        self.cursor = 0;

        match self
            .shared
            .plan_block(self.block_frames as u64, &mut self.inputs)
        {
            BlockPlan::Disposed => return false,
            BlockPlan::Silence => {}
            BlockPlan::Span(span) => mix_span(&mut self.block, span, &self.inputs),
        }
        self.inputs.clear();
        true
    }
}

/// Sum `inputs` into `block` for the frames of `span`, then clip to the
/// legal sample range.
pub(crate) fn mix_span(block: &mut [f32], span: Span, inputs: &[(Arc<TrackAudio>, f32)]) {
    let frames = (span.frames as usize).min(block.len() / 2);
    for (audio, gain) in inputs {
        for offset in 0..frames {
            let (left, right) = audio.frame(span.start + offset as u64);
            block[offset * 2] += left * gain;
            block[offset * 2 + 1] += right * gain;
        }
    }
    for sample in &mut block[..frames * 2] {
        *sample = sample.clamp(-1.0, 1.0);
    }
}

impl Iterator for TransportSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.ended {
            return None;
        }
        if self.cursor >= self.block.len() && !self.render_block() {
            self.ended = true;
            return None;
        }
        let sample = self.block[self.cursor];
        self.cursor += 1;
        Some(sample)
    }
}

impl Source for TransportSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        OUTPUT_CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
