// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for picrelay

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-d1-history-2026-10-18";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-18";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "d1-history",
    "debounced-key-list",
    "fail-open-lookups",
    "jpeg-preview-transform",
    "telegram-channel",
    "manual-forward",
    "update-intake",
    "post-links",
    "yande",
    "danbooru",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("picrelay {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
