use std::fs;

fn main() {
    // The VERSION file is the single source of truth for release tooling;
    // it must agree with Cargo.toml.
    let version_file = fs::read_to_string("VERSION")
        .expect("VERSION file not found - run: echo '0.9.0' > VERSION");

    let version = version_file.trim();
    let cargo_version = env!("CARGO_PKG_VERSION");

    if version != cargo_version {
        panic!(
            "\n\n\
            ❌ VERSION MISMATCH!\n\
            VERSION file: {}\n\
            Cargo.toml:   {}\n\n\
            Update both to the release version before building.\n\n",
            version, cargo_version
        );
    }

    println!("cargo:rerun-if-changed=VERSION");
}
