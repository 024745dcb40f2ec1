use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=link.x");
    println!("cargo:rerun-if-changed=layout");

    // Host builds only produce the stub that refuses to run.
    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if os != "none" {
        return;
    }

    let layout = if env::var_os("CARGO_FEATURE_HANDOFF_CALL").is_some() {
        "layout/call.x"
    } else {
        "layout/vector_table.x"
    };

    let out = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    fs::copy(layout, out.join("layout.x")).expect("copy the layout fragment");
    fs::copy("link.x", out.join("link.x")).expect("copy the linker script");

    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
}
