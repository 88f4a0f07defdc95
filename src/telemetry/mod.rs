// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry, tracing, and metrics infrastructure.
//!
//! This module provides observability for the dispatch layer:
//!
//! - **Tracing**: Structured logging with spans for server initialization
//!   and call routing
//! - **Metrics**: Lightweight per-tool and per-operation counters
//!
//! Initialize telemetry once at application startup:
//!
//! ```rust,ignore
//! use toolmux::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```

pub mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{Metrics, GLOBAL_METRICS};
