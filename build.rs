//! Build script for the DAB receiver firmware
//!
//! Handles:
//! - Linker arguments for the board binary
//! - Embedding the receiver's host-loaded mini-patch (`SI468X_MINIPATCH`)

use std::path::PathBuf;
use std::{env, fs};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SI468X_MINIPATCH");

    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let target = out.join("minipatch.bin");

    // The patch is vendor firmware and is not part of the repository
    match env::var("SI468X_MINIPATCH") {
        Ok(path) => {
            println!("cargo:rerun-if-changed={path}");
            fs::copy(&path, &target).expect("SI468X_MINIPATCH must name a readable file");
        }
        Err(_) => {
            if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
                println!("cargo:warning=SI468X_MINIPATCH not set, embedding an empty mini-patch");
            }
            fs::write(&target, []).expect("OUT_DIR is writable");
        }
    }

    if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}
