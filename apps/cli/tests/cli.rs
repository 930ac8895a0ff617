use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli() -> Result<Command, Box<dyn Error>> {
    Ok(Command::cargo_bin("smartcomposer-poc")?)
}

#[test]
fn tree_lists_the_default_vault() -> Result<(), Box<dyn Error>> {
    cli()?
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome.md"));
    Ok(())
}

#[test]
fn tree_prints_folders_before_files() -> Result<(), Box<dyn Error>> {
    let vault = tempdir()?;
    fs::create_dir_all(vault.path().join("notes/daily"))?;
    fs::write(vault.path().join("a.md"), "# A")?;
    fs::write(vault.path().join("notes/b.md"), "# B")?;
    fs::write(vault.path().join("notes/daily/today.md"), "# Today")?;
    fs::write(vault.path().join("ignored.txt"), "not markdown")?;

    cli()?
        .args(["--vault-dir", vault.path().to_str().unwrap(), "tree"])
        .assert()
        .success()
        .stdout("notes/\n  daily/\n    today.md\n  b.md\na.md\n");
    Ok(())
}

#[test]
fn open_prints_leaf_and_content() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["open", "Welcome", "--append", "\nappended line"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[editor] markdown")
                .and(predicate::str::contains("# Welcome to your new vault!\nappended line")),
        );
    Ok(())
}

#[test]
fn open_unknown_link_fails() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["open", "Missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no file matches 'Missing'"));
    Ok(())
}

#[test]
fn commands_lists_plugin_commands() -> Result<(), Box<dyn Error>> {
    cli()?
        .arg("commands")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("smart-composer:open-new-chat\tOpen chat")
                .and(predicate::str::contains(
                    "smart-composer:add-selection-to-chat\tAdd selection to chat (editor)",
                )),
        );

    let output = cli()?.args(["commands", "--format", "json"]).output()?;
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(listed.as_array().map(Vec::len), Some(2));
    assert_eq!(listed[0]["owner"], "smart-composer");
    Ok(())
}

#[test]
fn run_adds_selection_to_chat() -> Result<(), Box<dyn Error>> {
    cli()?
        .args([
            "run",
            "smart-composer:add-selection-to-chat",
            "--open",
            "Welcome.md",
            "--select-all",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[right-sidebar] smtcmp-chat-view")
                .and(predicate::str::contains("active: leaf-2")),
        );
    Ok(())
}

#[test]
fn run_editor_command_without_editor_fails() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["run", "smart-composer:add-selection-to-chat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires an active markdown editor"));
    Ok(())
}

#[test]
fn settings_changes_persist_in_data_dir() -> Result<(), Box<dyn Error>> {
    let data = tempdir()?;
    cli()?
        .args([
            "--data-dir",
            data.path().to_str().unwrap(),
            "settings",
            "--chat-model",
            "gpt-4o",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("setting-item").and(predicate::str::contains("Chat model")));

    let saved = fs::read_to_string(data.path().join("smart-composer.json"))?;
    let saved: serde_json::Value = serde_json::from_str(&saved)?;
    assert_eq!(saved["chatModel"], "gpt-4o");

    cli()?
        .args(["--data-dir", data.path().to_str().unwrap(), "settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"chatModel\": \"gpt-4o\""));
    Ok(())
}

#[test]
fn settings_rejects_unknown_model() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["settings", "--chat-model", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown chat model 'nope'"));
    Ok(())
}
