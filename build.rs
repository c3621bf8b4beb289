//! Build script for menutri
//!
//! Bumps the local build counter and embeds build metadata.

use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let counter_path = Path::new("build_number.txt");

    let previous: u64 = fs::read_to_string(counter_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build = previous + 1;

    // A read-only checkout still builds, just without a persisted counter
    if let Err(e) = fs::write(counter_path, build.to_string()) {
        println!("cargo:warning=could not persist build number: {}", e);
    }

    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    println!("cargo:rustc-env=MENUTRI_BUILD_NUMBER={}", build);
    println!("cargo:rustc-env=MENUTRI_BUILD_TIMESTAMP={}", stamp);
}
