fn main() {
    // Allow overriding the CLI version with BQV_CLI_VERSION, e.g. to stamp CI builds
    let cli_version =
        std::env::var("BQV_CLI_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=BQV_CLI_VERSION={cli_version}");
    println!("cargo:rerun-if-env-changed=BQV_CLI_VERSION");
}
