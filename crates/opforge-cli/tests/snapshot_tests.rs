//! Snapshot tests for generated config output

use std::process::Command;

/// Helper to run opforge command and capture output
fn opforge_output(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_opforge"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute opforge");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

#[test]
fn test_init_config_component_output() {
    let (stdout, stderr, success) = opforge_output(&["init-config", "component"]);
    assert!(success, "stderr: {}", stderr);

    insta::assert_snapshot!(stdout, @r###"
    name: component-workload-config
    kind: ComponentWorkload
    spec:
      api:
        domain: acme.com
        group: apps
        version: v1alpha1
        kind: MyApp
        clusterScoped: false
      companionCliSubcmd:
        name: myapp
        description: Manage myapp workload
      resources:
      - /path/to/my/child-resources.yaml
      dependencies:
      - component-workload-config-2
    "###);
}

#[test]
fn test_init_config_collection_output() {
    let (stdout, stderr, success) = opforge_output(&["init-config", "collection"]);
    assert!(success, "stderr: {}", stderr);

    insta::assert_snapshot!(stdout, @r###"
    name: workload-collection-config
    kind: WorkloadCollection
    spec:
      api:
        domain: acme.com
        group: apps
        version: v1alpha1
        kind: MyApp
        clusterScoped: false
      companionCliRootcmd:
        name: myappctl
        description: Manage myapp workload
      companionCliSubcmd:
        name: myapp
        description: Manage myapp workload
      resources:
      - /path/to/my/child-resources.yaml
      componentFiles:
      - /path/to/my/component-workload-config.yaml
    "###);
}
