// Runs against the real Blender mirrors. Enable with `--features e2e`.
mod common;

#[cfg(feature = "e2e")]
use common::{CommandOutput, TestContext};

#[test]
#[cfg(feature = "e2e")]
fn e2e_resolve_default_release() {
    let ctx = TestContext::new();

    // Example: get-blender resolve
    let output: CommandOutput = ctx
        .cmd()
        .arg("resolve")
        .output()
        .expect("Failed to run get-blender")
        .into();

    output
        .assert_success()
        .assert_stdout_contains("2.79b stable https://")
        .assert_stdout_contains("Blender2.79/blender-2.79b-");
}

#[test]
#[cfg(all(feature = "e2e", target_os = "linux"))]
fn e2e_install_and_reuse() {
    let ctx = TestContext::new();

    // Example: BLENDER_CACHE=<dir> get-blender 2.79b
    let output: CommandOutput = ctx
        .cmd()
        .arg("2.79b")
        .output()
        .expect("Failed to install Blender")
        .into();

    output.assert_success();
    let installed = std::path::PathBuf::from(output.stdout.trim());
    assert!(installed.ends_with("blender-2.79b"));
    assert!(installed.join("blender").exists());

    // Example: get-blender install 2.79b --json
    let output: CommandOutput = ctx
        .cmd()
        .args(["install", "2.79b", "--json"])
        .output()
        .expect("Failed to run get-blender")
        .into();

    output
        .assert_success()
        .assert_stdout_contains("\"from_cache\": true")
        .assert_stderr_contains("(non-nightly) release found");
}
