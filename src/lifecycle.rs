//! Host lifecycle hooks (back button, screen sleep, target framerate)
//!
//! The owner of a capture session hands in a bridge at construction time,
//! or `None` on platforms that have no such hooks.

use std::cell::RefCell;
use std::rc::Rc;

/// Screen sleep behaviour requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTimeout {
    /// Keep the screen on while scanning
    Never,
    /// Defer to the system setting
    System,
    /// Sleep after this many seconds of inactivity
    Seconds(u32),
}

/// Trait for platform lifecycle integration
pub trait LifecycleBridge {
    fn set_screen_sleep(&mut self, timeout: SleepTimeout);

    /// `None` removes the framerate cap
    fn set_target_framerate(&mut self, fps: Option<u32>);

    /// True once per press of the hardware back button
    fn back_requested(&mut self) -> bool;
}

#[derive(Debug, Default)]
pub struct BridgeState {
    pub screen_sleep: Option<SleepTimeout>,
    pub target_framerate: Option<Option<u32>>,
    pub pending_back: u32,
}

/// In-process bridge. Clones share state, so the owner can keep one handle
/// to press "back" or inspect the applied settings after handing the other
/// to a session.
#[derive(Debug, Clone, Default)]
pub struct RecordingBridge {
    state: Rc<RefCell<BridgeState>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_back(&self) {
        self.state.borrow_mut().pending_back += 1;
    }

    pub fn screen_sleep(&self) -> Option<SleepTimeout> {
        self.state.borrow().screen_sleep
    }

    pub fn target_framerate(&self) -> Option<Option<u32>> {
        self.state.borrow().target_framerate
    }
}

impl LifecycleBridge for RecordingBridge {
    fn set_screen_sleep(&mut self, timeout: SleepTimeout) {
        tracing::debug!("Screen sleep set to {:?}", timeout);
        self.state.borrow_mut().screen_sleep = Some(timeout);
    }

    fn set_target_framerate(&mut self, fps: Option<u32>) {
        tracing::debug!("Target framerate set to {:?}", fps);
        self.state.borrow_mut().target_framerate = Some(fps);
    }

    fn back_requested(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.pending_back > 0 {
            state.pending_back -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_press_consumed_once() {
        let handle = RecordingBridge::new();
        let mut bridge: Box<dyn LifecycleBridge> = Box::new(handle.clone());

        assert!(!bridge.back_requested());
        handle.press_back();
        assert!(bridge.back_requested());
        assert!(!bridge.back_requested());
    }

    #[test]
    fn test_settings_visible_through_clone() {
        let handle = RecordingBridge::new();
        let mut bridge = handle.clone();
        bridge.set_screen_sleep(SleepTimeout::Never);
        bridge.set_target_framerate(None);

        assert_eq!(handle.screen_sleep(), Some(SleepTimeout::Never));
        assert_eq!(handle.target_framerate(), Some(None));
    }
}
