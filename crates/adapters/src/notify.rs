// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed-driver notification collaborator.

/// Adapter for sending operator notifications.
///
/// Synchronous and fire-and-forget: the hub calls this from inside a state
/// transition and must not wait on, or fail with, the delivery.
pub trait NotifyAdapter: Send + Sync + 'static {
    /// Send a notification with a title and message body
    fn notify(&self, title: &str, message: &str);
}

/// Log-only notifier; the default when no desktop environment is wanted.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifyAdapter;

impl NotifyAdapter for TracingNotifyAdapter {
    fn notify(&self, title: &str, message: &str) {
        tracing::info!(%title, %message, "notification");
    }
}

/// Desktop notification adapter using notify-rust.
///
/// On macOS, `notify-rust` uses `mac-notification-sys` (Cocoa bindings) to
/// send notifications via the Notification Center. The first notification
/// triggers `ensure_application_set()` which runs an AppleScript to look up
/// a bundle identifier. In a headless hub process without Automation
/// permissions, that AppleScript blocks forever. We pre-set the bundle
/// identifier at construction time to bypass the lookup entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }
}

impl NotifyAdapter for DesktopNotifyAdapter {
    fn notify(&self, title: &str, message: &str) {
        let title = title.to_string();
        let message = message.to_string();
        // Notification::show() can block on the OS; deliver off-thread so
        // the triggering transition returns immediately.
        std::thread::spawn(move || {
            match notify_rust::Notification::new().summary(&title).body(&message).show() {
                Ok(_) => {
                    tracing::info!(%title, "desktop notification sent");
                }
                Err(e) => {
                    tracing::warn!(%title, error = %e, "desktop notification failed");
                }
            }
        });
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::NotifyAdapter;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded notification
    #[derive(Debug, Clone)]
    pub struct NotifyCall {
        pub title: String,
        pub message: String,
    }

    /// Fake notification adapter for testing
    #[derive(Clone, Default)]
    pub struct FakeNotifyAdapter {
        calls: Arc<Mutex<Vec<NotifyCall>>>,
    }

    impl FakeNotifyAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded notifications
        pub fn calls(&self) -> Vec<NotifyCall> {
            self.calls.lock().clone()
        }
    }

    impl NotifyAdapter for FakeNotifyAdapter {
        fn notify(&self, title: &str, message: &str) {
            self.calls
                .lock()
                .push(NotifyCall { title: title.to_string(), message: message.to_string() });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};
