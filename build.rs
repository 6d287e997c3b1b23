use std::path::Path;
use std::process::Command;

// `textanim --version` long form: "<pkg version> (<short git hash>)".
// Outside a git checkout only the package version is reported.
fn main() {
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let long_version = match git_short_hash() {
        Some(hash) => format!("{version} ({hash})"),
        None => version,
    };
    println!("cargo:rustc-env=TEXTANIM_LONG_VERSION={long_version}");

    if Path::new(".git/HEAD").exists() {
        println!("cargo:rerun-if-changed=.git/HEAD");
    }
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_owned())
}
