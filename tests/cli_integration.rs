//! Integration tests for the coref-markup binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use coref_markup::{Markup, Span};

const TEXT: &str = "Ann met Bob. She said he was late.";

fn write(path: &Path, entities: Vec<Vec<(usize, usize)>>, includes: Vec<Vec<usize>>) {
    let entities = entities
        .into_iter()
        .map(|e| e.into_iter().map(|(s, e)| Span::new(s, e)).collect())
        .collect();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    Markup::with_entities(TEXT, entities, includes).write_to_path(path).unwrap();
}

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("coref-markup").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_merge_writes_consensus_with_diff() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let out = dir.path().join("out.json");
    write(&a, vec![vec![(0, 3), (13, 16)]], vec![]);
    write(&b, vec![vec![(0, 3), (13, 16)], vec![(8, 11), (22, 24)]], vec![]);

    cmd()
        .args(["merge", a.to_str().unwrap(), b.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .success();

    let merged = Markup::from_path(&out).unwrap();
    assert_eq!(merged.entities.len(), 2);
    assert!(merged.diff.iter().any(|e| e.span == Span::new(8, 11)));

    let raw = fs::read_to_string(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let comment = json["diff"][0]["comment"].as_str().unwrap();
    assert!(comment.starts_with("added span"), "{}", comment);
}

#[test]
fn test_merge_rejects_different_texts() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let out = dir.path().join("out.json");
    write(&a, vec![], vec![]);
    Markup::new("Another text").write_to_path(&b).unwrap();

    cmd()
        .args(["merge", a.to_str().unwrap(), b.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Texts are not the same!"));
    assert!(!out.exists());
}

#[test]
fn test_merge_majority_needs_three_files() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    write(&a, vec![], vec![]);
    cmd()
        .args(["merge-majority", a.to_str().unwrap(), a.to_str().unwrap(), "-o", "out.json"])
        .assert()
        .failure();
}

#[test]
fn test_merge_majority_keeps_agreed_chains() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<_> = ["a", "b", "c"].iter().map(|n| dir.path().join(format!("{}.json", n))).collect();
    write(&paths[0], vec![vec![(0, 3), (13, 16)]], vec![]);
    write(&paths[1], vec![vec![(0, 3), (13, 16)], vec![(8, 11), (22, 24)]], vec![]);
    write(&paths[2], vec![vec![(8, 11), (22, 24)], vec![(0, 3), (29, 33)]], vec![]);
    let out = dir.path().join("out.json");

    let mut args: Vec<String> = vec!["merge-majority".into()];
    args.extend(paths.iter().map(|p| p.to_str().unwrap().to_string()));
    args.extend(["-o".to_string(), out.to_str().unwrap().to_string()]);
    cmd().args(&args).assert().success();

    let merged = Markup::from_path(&out).unwrap();
    assert_eq!(
        merged.entities,
        vec![vec![Span::new(0, 3), Span::new(13, 16)], vec![Span::new(8, 11), Span::new(22, 24)]]
    );
}

#[test]
fn test_diff_prints_sections_and_metrics() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write(&a, vec![vec![(0, 3), (13, 16)]], vec![]);
    write(&b, vec![vec![(0, 3)], vec![(13, 16), (22, 24)]], vec![]);

    cmd()
        .args(["diff", a.to_str().unwrap(), b.to_str().unwrap(), "--context", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Spans in B but not in A"))
        .stdout(predicate::str::contains("Spans belonging to different entities"))
        .stdout(predicate::str::contains("LEA (w/o child spans): "))
        .stdout(predicate::str::contains("LEA (w/  child spans): "));
}

#[test]
fn test_diff_accepts_raw_markup() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    write(&a, vec![vec![(0, 3), (13, 16)], vec![(13, 16), (22, 24)]], vec![vec![0], vec![]]);
    write(&b, vec![vec![(0, 3)], vec![(13, 16), (22, 24)]], vec![]);

    cmd()
        .args(["diff", a.to_str().unwrap(), b.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Spans belonging to different entities"));
}

#[test]
fn test_agreement_over_two_dirs() {
    let dir = TempDir::new().unwrap();
    let one = dir.path().join("one");
    let two = dir.path().join("two");
    write(&one.join("doc.json"), vec![vec![(0, 3), (13, 16)]], vec![]);
    write(&two.join("doc.json"), vec![vec![(0, 3), (13, 16)]], vec![]);
    write(&one.join("extra.json"), vec![vec![(0, 3), (13, 16)]], vec![]);

    cmd()
        .args(["agreement", one.to_str().unwrap(), two.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching document for"))
        .stdout(predicate::str::contains("1.000 doc.json"))
        .stdout(predicate::str::contains("\n1.000 Total"))
        .stderr(predicate::str::contains("No matching document").not());
}

#[test]
fn test_clean_removes_singletons() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("raw.json");
    let out = dir.path().join("clean.json");
    write(&input, vec![vec![(0, 3), (13, 16)], vec![(8, 11)]], vec![]);

    cmd()
        .args(["clean", input.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .success();
    let cleaned = Markup::from_path(&out).unwrap();
    assert_eq!(cleaned.entities, vec![vec![Span::new(0, 3), Span::new(13, 16)]]);
}

#[test]
fn test_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "no_such_setting = 1\n").unwrap();
    let a = dir.path().join("a.json");
    write(&a, vec![], vec![]);

    cmd()
        .args(["--config", config.to_str().unwrap(), "diff", a.to_str().unwrap(), a.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error"));
}
