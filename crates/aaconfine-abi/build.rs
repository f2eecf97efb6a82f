use std::path::PathBuf;

const EXPORT_MAP: &str = "version_scripts/aaconfine.map";

fn main() {
    println!("cargo:rerun-if-changed={EXPORT_MAP}");

    // GNU ld options; other targets export every `no_mangle` symbol.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("linux") {
        return;
    }

    let map = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(EXPORT_MAP);
    if map.is_file() {
        println!(
            "cargo:rustc-cdylib-link-arg=-Wl,--version-script={}",
            map.display()
        );
    }
    println!("cargo:rustc-cdylib-link-arg=-Wl,-soname,libaaconfine_abi.so");
}
