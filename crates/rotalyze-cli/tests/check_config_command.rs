use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rotalyze_testing::{TestWorld, fixtures};

#[test]
fn test_check_config_lists_module_status() {
    let world = TestWorld::new().with_config(fixtures::SAMPLE_CONFIG);
    let result = world.run(&["check-config", "--format", "json"]).unwrap();
    assert!(result.success(), "stderr: {}", result.stderr());

    insta::assert_snapshot!(result.stdout().trim_end(), @r#"
    {
      "path": "rotalyze.toml",
      "found": true,
      "resources": [
        "maelstrom (capacity 100)"
      ],
      "normalizers": [
        "prepull_buffs"
      ],
      "modules": [
        {
          "module": "active_time",
          "active": true
        },
        {
          "module": "resources",
          "active": true
        },
        {
          "module": "buffs",
          "active": true
        },
        {
          "module": "enemies",
          "active": true
        },
        {
          "module": "dot_snapshot",
          "active": true
        },
        {
          "module": "cooldown_windows",
          "active": true
        },
        {
          "module": "spender_windows",
          "active": false,
          "reason": "no spender configured"
        },
        {
          "module": "stack_windows",
          "active": false,
          "reason": "no stacking buff configured"
        },
        {
          "module": "debuff_coverage",
          "active": false,
          "reason": "no debuff configured"
        }
      ]
    }
    "#);
}

#[test]
fn test_check_config_without_file_uses_defaults() {
    let world = TestWorld::new();
    let mut cmd = cargo_bin_cmd!("rotalyze");
    world
        .configure_command(&mut cmd)
        .args(["check-config", "--color", "never"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("rotalyze.toml (not found, defaults)"))
        .stdout(predicate::str::contains("no resources configured"));
}

#[test]
fn test_invalid_module_settings_fail() {
    let world = TestWorld::new().with_config(
        r#"
[modules.stack_windows]
buff = 210714
consumers = [196840]
stacks = 0
"#,
    );

    let mut cmd = cargo_bin_cmd!("rotalyze");
    world.configure_command(&mut cmd).arg("check-config");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("stack_windows"))
        .stderr(predicate::str::contains("stacks must be positive"));
}

#[test]
fn test_malformed_toml_is_exit_code_two() {
    let world = TestWorld::new().with_config("policy = 3");

    let mut cmd = cargo_bin_cmd!("rotalyze");
    world.configure_command(&mut cmd).arg("check-config");

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration in rotalyze.toml"));
}
