// sptl: build script for host-specific optimizations

use std::env;

fn main() {
    if env::var("PROFILE").unwrap_or_default() == "release" && cfg!(target_arch = "x86_64") {
        println!("cargo:rustc-env=RUSTFLAGS=-C target-cpu=native");
    }
}
