//! Rate limiting of decode attempts, independent of the display refresh rate

use crate::capture::{CameraHost, CaptureSession};
use crate::config::clamp_read_interval;
use crate::decode::Decoder;
use std::time::Duration;

pub struct FrameSampler {
    read_interval: f32,
    elapsed: f32,
    attempts: u64,
}

impl FrameSampler {
    /// `read_interval` is in seconds and is clamped to the minimum floor
    pub fn new(read_interval: f32) -> Self {
        let clamped = clamp_read_interval(read_interval);
        if clamped != read_interval {
            tracing::warn!(
                "Read interval {}s is below the minimum, using {}s",
                read_interval,
                clamped
            );
        }

        Self {
            read_interval: clamped,
            elapsed: 0.0,
            attempts: 0,
        }
    }

    pub fn read_interval(&self) -> f32 {
        self.read_interval
    }

    /// Number of decode attempts made so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Accumulate `delta` and decide whether this tick gets a decode attempt
    ///
    /// Time keeps accumulating while idle or while no new frame arrived, so
    /// the first fresh frame after a long gap is read straight away.
    pub fn advance(&mut self, delta: Duration, active: bool, frame_ready: bool) -> bool {
        self.elapsed += delta.as_secs_f32();

        if !active || !frame_ready || self.elapsed <= self.read_interval {
            return false;
        }

        self.elapsed = 0.0;
        self.attempts += 1;
        true
    }

    /// Run one display tick against `session`, decoding at most one frame
    pub fn tick<H, D>(
        &mut self,
        delta: Duration,
        session: &mut CaptureSession<H>,
        decoder: &mut D,
    ) -> Option<String>
    where
        H: CameraHost,
        D: Decoder + ?Sized,
    {
        let active = session.is_active();
        let frame_ready = active && session.has_new_frame();
        if !self.advance(delta, active, frame_ready) {
            return None;
        }

        let Some(frame) = session.snapshot() else {
            tracing::debug!("Frame buffer empty, skipping decode");
            return None;
        };

        let _span = tracing::debug_span!("decode_attempt", attempt = self.attempts).entered();
        let result = decoder.decode(&frame);
        if let Some(text) = &result {
            tracing::info!("Decoded: {}", text);
        }
        result
    }
}
