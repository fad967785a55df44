// Build script for linking the Embree library.
//
// Only needed with `--features embree`. Install Embree 4 via your package
// manager, or on Windows via: vcpkg install embree:x64-windows

fn main() {
    // Rebuild if this build script changes
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("CARGO_FEATURE_EMBREE").is_none() {
        return;
    }

    // Embree 4 library name (vcpkg installs embree4.lib)
    println!("cargo:rustc-link-lib=embree4");

    // Extra search paths for manual installs
    if let Ok(embree_dir) = std::env::var("EMBREE_DIR") {
        println!("cargo:rustc-link-search=native={}/lib", embree_dir);
    }
    if let Ok(vcpkg_root) = std::env::var("VCPKG_ROOT") {
        let lib_path = format!("{}\\installed\\x64-windows\\lib", vcpkg_root);
        println!("cargo:rustc-link-search=native={}", lib_path);
    }
}
