//! Per-tick driver tying the capture session, sampler, fitter and display together

use crate::capture::{CameraHost, CaptureSession, PendingSession};
use crate::config::ScannerConfig;
use crate::decode::Decoder;
use crate::lifecycle::LifecycleBridge;
use crate::output::DisplaySurface;
use crate::sampler::FrameSampler;
use crate::viewport::{ViewportFitter, ViewportSize};
use std::time::Duration;

/// What the owner's loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The user asked to leave through the lifecycle bridge
    Quit,
}

enum Stage<H: CameraHost> {
    /// First tick is skipped while the host camera subsystem starts
    WarmingUp(PendingSession<H>),
    /// Device selection happens on this tick
    Ready(PendingSession<H>),
    Running(CaptureSession<H>),
}

pub struct Scanner<H: CameraHost, D, S> {
    stage: Option<Stage<H>>,
    config: ScannerConfig,
    sampler: FrameSampler,
    fitter: ViewportFitter,
    decoder: D,
    surface: S,
    ticks: u64,
}

impl<H, D, S> Scanner<H, D, S>
where
    H: CameraHost,
    D: Decoder,
    S: DisplaySurface,
{
    pub fn new(
        host: H,
        lifecycle: Option<Box<dyn LifecycleBridge>>,
        decoder: D,
        surface: S,
        config: ScannerConfig,
    ) -> Self {
        let pending = CaptureSession::construct(host, lifecycle);

        Self {
            stage: Some(Stage::WarmingUp(pending)),
            sampler: FrameSampler::new(config.read_interval),
            fitter: ViewportFitter::new(config.reference_canvas),
            config,
            decoder,
            surface,
            ticks: 0,
        }
    }

    /// Advance by one display tick of length `delta`
    pub fn tick(&mut self, delta: Duration) -> TickOutcome {
        self.ticks += 1;

        match self.stage.take() {
            Some(Stage::WarmingUp(pending)) => {
                tracing::debug!("Skipping first tick while the camera subsystem starts");
                self.stage = Some(Stage::Ready(pending));
                return TickOutcome::Continue;
            }
            Some(Stage::Ready(pending)) => {
                let session = pending
                    .activate_after_warmup(self.config.selection, self.config.target_framerate);
                self.stage = Some(Stage::Running(session));
            }
            other => self.stage = other,
        }

        let Some(Stage::Running(session)) = self.stage.as_mut() else {
            return TickOutcome::Continue;
        };

        if let Some(bridge) = session.lifecycle_mut() {
            if bridge.back_requested() {
                tracing::info!("Back requested, stopping scanner");
                return TickOutcome::Quit;
            }
        }

        if let Some(rotation) = session.refresh_rotation() {
            self.surface.set_rotation(rotation);
        }

        let active = session
            .current_resolution()
            .ok()
            .zip(session.current_rotation().ok());
        if let Some(size) = self.fitter.update(active) {
            self.surface.set_viewport(size);
        }

        if let Some(text) = self.sampler.tick(delta, session, &mut self.decoder) {
            self.surface.show_text(&text);
        }

        TickOutcome::Continue
    }

    /// The capture session, once warm-up has finished
    pub fn session_mut(&mut self) -> Option<&mut CaptureSession<H>> {
        match self.stage.as_mut() {
            Some(Stage::Running(session)) => Some(session),
            _ => None,
        }
    }

    pub fn is_warming_up(&self) -> bool {
        !matches!(self.stage, Some(Stage::Running(_)))
    }

    pub fn viewport(&self) -> Option<ViewportSize> {
        self.fitter.current()
    }

    pub fn decode_attempts(&self) -> u64 {
        self.sampler.attempts()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
