/// Version string: git-describe based `BUILD_VERSION` when the build script
/// could produce one, the Cargo.toml version otherwise.
pub fn current_version() -> &'static str {
    option_env!("BUILD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
