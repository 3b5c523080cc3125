use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=LIMESUITE_LIB_DIR");

    if let Ok(dir) = env::var("LIMESUITE_LIB_DIR") {
        println!("cargo:rustc-link-search={dir}");
    }
    println!("cargo:rustc-link-lib=LimeSuite");
}
