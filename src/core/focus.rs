//! Window focus control for the tracked process

use super::process::{WindowHandle, WindowManager};
use crate::platform;

/// Talks to the desktop's window manager
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeWindowManager;

impl WindowManager for NativeWindowManager {
    fn bring_to_front(&self, window: WindowHandle) {
        platform::bring_to_front(window);
    }

    fn minimize(&self, window: WindowHandle) {
        platform::minimize(window);
    }
}
