// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform substring matching and repository-to-process-name mapping.
//!
//! Pure functions so the tricky ordering and lookup-table invariants in
//! spec.md §4.2/§4.3 can be tested without any adapter.

/// Sort platforms by descending length so that e.g. `android-api-16-debug`
/// is tried before `android-api-16` and a longer platform is never shadowed
/// by a shorter one that happens to be a prefix of it.
pub fn sort_platforms_longest_first(platforms: &mut [String]) {
    platforms.sort_by(|a, b| b.len().cmp(&a.len()));
}

/// Find the first configured platform (assumed already sorted longest-first
/// by [`sort_platforms_longest_first`]) that appears as a substring of
/// `build_url`, defaulting to `fallback` (the job's own reported platform)
/// if none match.
pub fn detect_platform<'a>(platforms: &'a [String], build_url: &str, fallback: &'a str) -> &'a str {
    platforms
        .iter()
        .find(|p| build_url.contains(p.as_str()))
        .map(|p| p.as_str())
        .unwrap_or(fallback)
}

/// Fixed lookup table mapping a build's source repository URL to the
/// Android process name it installs as (spec.md §4.3 step 4).
pub fn androidprocname_for_repo(repo: &str) -> String {
    match repo {
        "http://hg.mozilla.org/mozilla-central"
        | "http://hg.mozilla.org/integration/mozilla-inbound" => "org.mozilla.fennec".to_string(),
        "http://hg.mozilla.org/releases/mozilla-aurora" => "org.mozilla.fennec_aurora".to_string(),
        "http://hg.mozilla.org/releases/mozilla-beta" => "org.mozilla.firefox".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
