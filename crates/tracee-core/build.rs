//! Build script for tracee-core
//!
//! Checks the toolchain before compilation. The workspace relies on
//! `[lints]` tables in Cargo.toml (Rust 1.74+) and on `Result::inspect_err`
//! (Rust 1.76+) in the threaded fixture.

fn main()
{
    // Minimum Rust version for the features above
    let Ok(min_rust_version) = rustc_version::Version::parse("1.76.0") else {
        return;
    };

    if let Ok(rustc_version) = rustc_version::version() {
        if rustc_version < min_rust_version {
            panic!("tracee-core requires Rust {min_rust_version} or newer, found {rustc_version}");
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    // The fixtures call the C heap through libc; anything without one is unsupported
    let family = std::env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    if !family.split(',').any(|f| f == "unix") {
        println!("cargo:warning=tracee-core is only exercised on unix targets");
    }
}
