mod support;

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use support::list_files;
use upkeep_core::config::ModuleKind;
use upkeep_core::deploy::DeploymentSwapper;
use upkeep_core::error::ErrorKind;
use upkeep_core::fs::hash_tree;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn swap_replaces_previous_contents_entirely() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    write_file(&workspace.join("dist/index.html"), "new");
    write_file(&workspace.join("dist/assets/app.js"), "js");
    write_file(&workspace.join("src/main.ts"), "source");
    let deploy = temp.path().join("www/shell");
    write_file(&deploy.join("index.html"), "old");
    write_file(&deploy.join("legacy/old.js"), "stale");

    let report = DeploymentSwapper::new()
        .deploy(&workspace, &deploy, ModuleKind::Frontend)
        .unwrap();

    assert_eq!(report.output_dir, workspace.join("dist"));
    assert_eq!(list_files(&deploy), vec!["assets/app.js", "index.html"]);
    assert_eq!(fs::read_to_string(deploy.join("index.html")).unwrap(), "new");
    assert_eq!(report.digest, Some(hash_tree(&workspace.join("dist")).unwrap()));
}

#[test]
fn swap_creates_missing_deploy_path() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    write_file(&workspace.join("out/index.html"), "static");
    let deploy = temp.path().join("deep/nested/www/docs");

    DeploymentSwapper::new()
        .deploy(&workspace, &deploy, ModuleKind::Microfrontend)
        .unwrap();

    assert_eq!(list_files(&deploy), vec!["index.html"]);
}

#[test]
fn missing_output_leaves_deployment_alone() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    write_file(&workspace.join("src/main.ts"), "source");
    let deploy = temp.path().join("www/shell");
    write_file(&deploy.join("index.html"), "live");

    let err = DeploymentSwapper::new()
        .deploy(&workspace, &deploy, ModuleKind::Frontend)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OutputNotFound);
    assert_eq!(fs::read_to_string(deploy.join("index.html")).unwrap(), "live");
}

#[test]
fn backend_root_deploy_skips_git_metadata_at_every_level() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    write_file(&workspace.join(".git/HEAD"), "ref: refs/heads/main");
    write_file(&workspace.join("server.js"), "listen()");
    write_file(&workspace.join("vendor/lib/.git"), "gitdir: ../../.git/modules/lib");
    write_file(&workspace.join("vendor/lib/index.js"), "lib");
    let deploy = temp.path().join("srv/api");

    let report = DeploymentSwapper::new()
        .deploy(&workspace, &deploy, ModuleKind::Backend)
        .unwrap();

    assert_eq!(report.output_dir, workspace);
    assert_eq!(list_files(&deploy), vec!["server.js", "vendor/lib/index.js"]);
}

#[test]
fn backend_prefers_dist_when_present() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    write_file(&workspace.join("dist/server.js"), "bundled");
    write_file(&workspace.join("src/server.ts"), "source");
    let deploy = temp.path().join("srv/api");

    DeploymentSwapper::new()
        .deploy(&workspace, &deploy, ModuleKind::Backend)
        .unwrap();

    assert_eq!(list_files(&deploy), vec!["server.js"]);
}
