#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};

use upkeep_core::context::AppContext;
use upkeep_core::prelude::*;

/// Build command used by fixture frontends: publishes `index.html` to `dist/`.
pub const FRONTEND_BUILD: &str = "mkdir -p dist && cp index.html dist/index.html";

/// A git repository acting as a module remote.
pub struct FixtureRepo {
    path: PathBuf,
    repo: Repository,
}

impl FixtureRepo {
    /// Initialize a repository whose HEAD is `main`.
    pub fn init(path: &Path) -> Self {
        fs::create_dir_all(path).unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path, &opts).unwrap();
        Self {
            path: path.to_path_buf(),
            repo,
        }
    }

    /// A repository with `index.html` committed on `main`.
    pub fn frontend(path: &Path, content: &str) -> Self {
        let fixture = Self::init(path);
        fixture.write("index.html", content);
        fixture.commit("init");
        fixture
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let file = self.path.join(relative);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file, content).unwrap();
    }

    pub fn commit(&self, message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Fixture", "fixture@example.com").unwrap();

        match self.repo.head() {
            Ok(head) => {
                let parent = self.repo.find_commit(head.target().unwrap()).unwrap();
                self.repo
                    .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
                    .unwrap()
            }
            Err(_) => self
                .repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
                .unwrap(),
        }
    }

    /// Lightweight tag at HEAD.
    pub fn tag(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo
            .tag_lightweight(name, head.as_object(), false)
            .unwrap();
    }

    pub fn head_id(&self) -> String {
        self.repo
            .head()
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .id()
            .to_string()
    }
}

pub fn frontend_module(name: &str, remote: &FixtureRepo, deploy_path: &Path) -> ModuleConfig {
    ModuleConfig::new(
        name,
        remote.remote(),
        ModuleKind::Frontend,
        deploy_path,
        FRONTEND_BUILD,
    )
}

/// Settings rooted in `root` with a no-op install command.
pub fn settings(root: &Path) -> Settings {
    Settings::rooted_at(root).with_install_command("true")
}

pub fn service(root: &Path, modules: Vec<ModuleConfig>, sink: Arc<MemorySink>) -> UpgradeService {
    AppContext::new(settings(root)).upgrade_service(modules, sink)
}

/// Regular files under `dir`, as sorted relative paths.
pub fn list_files(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if entry.file_type().unwrap().is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
