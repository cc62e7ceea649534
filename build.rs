// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=NOTEKIT_VERSION");

    // Packagers (flatpak, distro builds) pin the version without a git checkout
    let version = std::env::var("NOTEKIT_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output reshaped into "<tag>-<hash>" or "<tag>-dirty-<hash>"
fn describe() -> Option<String> {
    let described = git(&["describe", "--tags", "--always", "--match", "v*"])?;
    let described = described.strip_prefix('v').unwrap_or(&described).to_string();

    // "0.1.0-5-gabcdef1": five commits past the tag
    let mut parts = described.rsplitn(3, '-');
    if let (Some(hash), Some(_commits), Some(tag)) = (parts.next(), parts.next(), parts.next()) {
        let hash = hash.strip_prefix('g').unwrap_or(hash);
        return Some(format!("{}-dirty-{}", tag, hash));
    }

    let hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    if described == hash {
        // No tag reachable, describe fell back to the bare hash
        Some(hash)
    } else {
        Some(format!("{}-{}", described, hash))
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
