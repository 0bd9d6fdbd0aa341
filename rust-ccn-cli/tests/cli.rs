use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn ccn() -> Command {
    Command::cargo_bin("ccn").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    ccn()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("router"))
        .stdout(predicate::str::contains("subscribe"))
        .stdout(predicate::str::contains("publish"));
}

#[test]
fn test_subscribe_requires_router() {
    ccn()
        .args(["subscribe", "--bind", "127.0.0.1:0", "/flow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--router"));
}

#[test]
fn test_router_reports_missing_links_file() {
    let dir = tempfile::tempdir().unwrap();
    let links = dir.path().join("links.txt");
    let routes = dir.path().join("routes.txt");

    ccn()
        .args(["router", "--name", "R0", "--bind", "127.0.0.1:0"])
        .arg("--links")
        .arg(&links)
        .arg("--routes")
        .arg(&routes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read links file"));
}

#[test]
fn test_router_rejects_malformed_links() {
    let dir = tempfile::tempdir().unwrap();
    let links = dir.path().join("links.txt");
    let routes = dir.path().join("routes.txt");
    writeln!(std::fs::File::create(&links).unwrap(), "s0 127.0.0.1 9700").unwrap();
    std::fs::File::create(&routes).unwrap();

    ccn()
        .args(["router", "--name", "R0", "--bind", "127.0.0.1:0"])
        .arg("--links")
        .arg(&links)
        .arg("--routes")
        .arg(&routes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 5 fields"));
}

#[test]
fn test_router_rejects_route_to_unlinked_peer() {
    let dir = tempfile::tempdir().unwrap();
    let links = dir.path().join("links.txt");
    let routes = dir.path().join("routes.txt");
    writeln!(std::fs::File::create(&links).unwrap(), "s0 127.0.0.1 9700 1000 0").unwrap();
    writeln!(std::fs::File::create(&routes).unwrap(), "/flow 127.0.0.1 9800").unwrap();

    ccn()
        .args(["router", "--name", "R0", "--bind", "127.0.0.1:0"])
        .arg("--links")
        .arg(&links)
        .arg("--routes")
        .arg(&routes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot route /flow via 127.0.0.1:9800"));
}

#[test]
fn test_publish_rejects_overflowing_bandwidth() {
    ccn()
        .args(["publish", "--bind", "127.0.0.1:0", "--router", "127.0.0.1:9"])
        .args(["--bandwidth-kbps", &u64::MAX.to_string(), "/flow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too large"));
}
