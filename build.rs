fn main() {
    // Version string reported over CTCP VERSION.
    // MEOWKOV_VERSION from the environment wins, then `git describe`, then the crate version.
    println!("cargo:rerun-if-env-changed=MEOWKOV_VERSION");
    if let Ok(version) = std::env::var("MEOWKOV_VERSION") {
        println!("cargo:rustc-env=MEOWKOV_VERSION={}", version);
        return;
    }

    let described = std::process::Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let version = described.unwrap_or_else(|| std::env::var("CARGO_PKG_VERSION").unwrap_or_default());
    println!("cargo:rustc-env=MEOWKOV_VERSION={}", version);
}
