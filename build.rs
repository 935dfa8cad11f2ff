use std::process::Command;

/// Встраивает в бинарь короткий хеш коммита и время сборки; они попадают в
/// стартовое сообщение демона.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=SWITCHYARD_GIT_COMMIT={commit}");

    let built_at = chrono::Utc::now().to_rfc3339();
    println!("cargo:rustc-env=SWITCHYARD_BUILD_TIME={built_at}");
}
