//! Build script for OverlayLauncher
//!
//! Embeds the Windows application manifest

fn main() {
    #[cfg(windows)]
    {
        let res_path = std::path::Path::new("resources/windows/app.rc");

        // Embed Windows resource file if it exists
        if res_path.exists() {
            embed_resource::compile("resources/windows/app.rc", embed_resource::NONE);
        } else {
            println!("cargo:warning=Missing {}, manifest not embedded", res_path.display());
        }
    }

    // Rerun if build.rs changes or resources change
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=resources/windows/app.rc");
    println!("cargo:rerun-if-changed=resources/windows/app.manifest");
}
