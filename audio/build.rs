fn main() {
    // libopus is only needed when Opus tracks are decoded natively.
    if std::env::var_os("CARGO_FEATURE_OPUS").is_some() {
        if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
            println!("cargo:rustc-link-search=native=/opt/homebrew/lib");
        }
        println!("cargo:rustc-link-lib=opus");
    }
}
