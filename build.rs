// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=OBJECT_ANNOUNCER_VERSION");

    // Packagers building from a tarball set the version explicitly
    let version = std::env::var("OBJECT_ANNOUNCER_VERSION")
        .ok()
        .or_else(git_version)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `0.1.0-abcdef1` on a tag, `0.1.0-dirty-abcdef1` past it
fn git_version() -> Option<String> {
    let describe = git(&["describe", "--tags", "--match", "v*"]);
    let hash = git(&["rev-parse", "--short", "HEAD"])?;

    let Some(describe) = describe else {
        return Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), hash));
    };
    let describe = describe.strip_prefix('v').unwrap_or(&describe);

    // git describe past a tag: <tag>-<commits>-g<hash>
    let parts: Vec<&str> = describe.rsplitn(3, '-').collect();
    if let [_, _, tag] = parts.as_slice() {
        Some(format!("{}-dirty-{}", tag, hash))
    } else {
        Some(format!("{}-{}", describe, hash))
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
