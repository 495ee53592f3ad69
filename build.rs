use std::process::Command;

fn main() {
    // Prefer a git-describe version so the binary matches the image tag;
    // fall back to the Cargo.toml version outside a checkout.
    println!("cargo:rustc-env=BUILD_VERSION={}", version());
}

fn version() -> String {
    let described = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty=-modified"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());

    match described {
        Some(desc) if !desc.is_empty() => {
            desc.strip_prefix('v').unwrap_or(&desc).to_string()
        }
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}
