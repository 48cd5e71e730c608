//! Build script for prkit: embeds a human-readable version string.
//!
//! `BUILD_INFO_HUMAN` is `<pkg version> (<git version>) <rustc version>`.
//! The git version is `git describe --tags --always --dirty` when a tag is
//! reachable, otherwise `v<pkg version>-<timestamp>-<short sha>[+dirty]`.
//! Clean trees use the commit time so rebuilding the same commit yields the
//! same string; dirty trees and builds outside git use the build time.

use std::{env, process::Command};

use chrono::{DateTime, Utc};

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git(args: &[&str]) -> Option<String> {
    run("git", args)
}

/// `None` outside a git checkout. `.cargo-ok` is written by
/// `cargo install --git` and does not count as a local change.
fn worktree_dirty() -> Option<bool> {
    git(&["status", "--porcelain"]).map(|status| {
        status
            .lines()
            .filter_map(|line| line.get(3..))
            .any(|path| path != ".cargo-ok")
    })
}

fn commit_stamp() -> Option<String> {
    git(&["log", "-1", "--format=%ct"])
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format(STAMP_FORMAT).to_string())
}

fn pseudo_version() -> String {
    let sha = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let dirty = worktree_dirty();
    let now = || Utc::now().format(STAMP_FORMAT).to_string();

    let stamp = match dirty {
        Some(false) => commit_stamp().unwrap_or_else(now),
        _ => now(),
    };
    let suffix = if dirty == Some(true) { "+dirty" } else { "" };

    format!("v{}-{stamp}-{sha}{suffix}", env!("CARGO_PKG_VERSION"))
}

fn git_version() -> String {
    match git(&["describe", "--tags", "--always", "--dirty"]) {
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn build_info() -> String {
    let mut parts = vec![env!("CARGO_PKG_VERSION").to_string(), format!("({})", git_version())];
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".into());
    if let Some(version) = run(&rustc, &["--version"]) {
        parts.push(version);
    }
    parts.join(" ")
}
