use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let output_file = PathBuf::from(&crate_dir)
        .join("../../ErosionSimFFI.h")
        .display()
        .to_string();

    // Generate C bindings using cbindgen
    cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("EROSION_SIM_FFI_H")
        .with_namespace("erosion_sim")
        .with_documentation(true)
        .with_pragma_once(false)
        .generate()
        .expect("Unable to generate C bindings")
        .write_to_file(output_file);

    for source in [
        "src/lib.rs",
        "src/error.rs",
        "src/instance.rs",
        "src/queries.rs",
        "src/simulation.rs",
    ] {
        println!("cargo:rerun-if-changed={source}");
    }
}
