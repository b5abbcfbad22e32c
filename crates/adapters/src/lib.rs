// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-adapters: external collaborators the hub core delegates to
//!
//! The core never renders alerts, shows notifications, or talks to the
//! remote store directly; it calls these traits. Every adapter here is
//! best-effort: failures are logged and absorbed, never propagated into
//! the state transition that triggered them.

mod alerts;
mod mirror;
mod notify;

pub use alerts::{AlertSink, TracingAlertSink};
pub use mirror::{MirrorAdapter, MirrorError, NullMirror, RemoteChange, RemoteChangeKind};
pub use notify::{DesktopNotifyAdapter, NotifyAdapter, TracingNotifyAdapter};

#[cfg(any(test, feature = "test-support"))]
pub use alerts::FakeAlertSink;
#[cfg(any(test, feature = "test-support"))]
pub use mirror::FakeMirror;
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
