//! End-to-end routing over on-disk backends configured from TOML.

use multicontents_kernel::{
    BackendRegistry, Content, ContentType, ContentsError, ContentsManager, ContentsModel,
    GetOptions, MultiContentsConfig, MultiContentsManager,
};
use tempfile::TempDir;

struct Fixture {
    home: TempDir,
    scratch: TempDir,
    router: MultiContentsManager,
}

fn fixture() -> Fixture {
    let home = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let source = format!(
        r#"
        [managers.""]
        manager_class = "file"
        kwargs = {{ root_dir = "{}" }}

        [managers.scratch]
        manager_class = "FileContentsManager"
        kwargs = {{ root_dir = "{}", checkpoint_dir = ".snapshots" }}

        [managers."mem/cache"]
        manager_class = "memory"
        "#,
        home.path().display().to_string().replace('\\', "/"),
        scratch.path().display().to_string().replace('\\', "/"),
    );
    let config = MultiContentsConfig::from_toml_str(&source).unwrap();
    let router = MultiContentsManager::from_config(&config, &BackendRegistry::with_builtins())
        .unwrap();
    Fixture {
        home,
        scratch,
        router,
    }
}

fn entry_names(model: &ContentsModel) -> Vec<String> {
    let mut names: Vec<_> = model
        .entries()
        .unwrap()
        .iter()
        .map(|m| m.name.clone())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn root_listing_shows_mounts_beside_files() {
    let fx = fixture();
    std::fs::write(fx.home.path().join("readme.md"), "# hi").unwrap();
    std::fs::create_dir(fx.home.path().join("mem")).unwrap();

    let root = fx.router.get("/", GetOptions::with_content()).await.unwrap();
    assert_eq!(entry_names(&root), vec!["mem", "readme.md", "scratch"]);

    let mem = fx.router.get("mem", GetOptions::with_content()).await.unwrap();
    assert_eq!(entry_names(&mem), vec!["cache"]);
    assert_eq!(mem.entries().unwrap()[0].path, "mem/cache");
}

#[tokio::test]
async fn writes_land_in_the_owning_backend() {
    let fx = fixture();
    fx.router
        .save(
            ContentsModel::file("a.txt").with_text("scratch data"),
            "/scratch/work/a.txt",
        )
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(fx.scratch.path().join("work/a.txt")).unwrap(),
        "scratch data"
    );
    assert!(!fx.home.path().join("scratch").exists());

    let model = fx
        .router
        .get("scratch/work/a.txt", GetOptions::metadata())
        .await
        .unwrap();
    assert_eq!(model.path, "scratch/work/a.txt");
    assert_eq!(model.kind, ContentType::File);
}

#[tokio::test]
async fn notebook_moves_across_mounts() {
    let fx = fixture();
    let nb = serde_json::json!({"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5});
    fx.router
        .save(ContentsModel::notebook("n.ipynb").with_json(nb.clone()), "n.ipynb")
        .await
        .unwrap();

    fx.router
        .rename_file("n.ipynb", "scratch/n.ipynb")
        .await
        .unwrap();

    assert!(!fx.home.path().join("n.ipynb").exists());
    let moved = fx
        .router
        .get("scratch/n.ipynb", GetOptions::with_content())
        .await
        .unwrap();
    assert_eq!(moved.kind, ContentType::Notebook);
    assert_eq!(moved.content, Some(Content::Json(nb)));
}

#[tokio::test]
async fn directory_moves_across_mounts() {
    let fx = fixture();
    let project = fx.home.path().join("project");
    std::fs::create_dir_all(project.join("data/raw")).unwrap();
    std::fs::create_dir_all(project.join("empty")).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();
    std::fs::write(project.join("data/raw/blob.bin"), [0u8, 159, 146, 150]).unwrap();

    fx.router
        .rename_file("project", "scratch/project")
        .await
        .unwrap();

    let moved = fx.scratch.path().join("project");
    assert_eq!(
        std::fs::read_to_string(moved.join("main.py")).unwrap(),
        "print('hi')"
    );
    assert_eq!(
        std::fs::read(moved.join("data/raw/blob.bin")).unwrap(),
        vec![0u8, 159, 146, 150]
    );
    assert!(moved.join("empty").is_dir());
    assert!(!project.exists());
}

#[tokio::test]
async fn directory_move_carries_hidden_files() {
    let fx = fixture();
    let project = fx.home.path().join("project");
    std::fs::create_dir_all(project.join(".git")).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();
    std::fs::write(project.join(".env"), "TOKEN=secret").unwrap();
    std::fs::write(project.join(".git/HEAD"), "ref: refs/heads/main").unwrap();

    fx.router
        .rename_file("project", "scratch/project")
        .await
        .unwrap();

    let moved = fx.scratch.path().join("project");
    assert_eq!(
        std::fs::read_to_string(moved.join(".env")).unwrap(),
        "TOKEN=secret"
    );
    assert_eq!(
        std::fs::read_to_string(moved.join(".git/HEAD")).unwrap(),
        "ref: refs/heads/main"
    );
    assert!(!project.exists());

    // Hidden entries stay out of default listings at the destination
    let listing = fx
        .router
        .get("scratch/project", GetOptions::with_content())
        .await
        .unwrap();
    assert_eq!(entry_names(&listing), vec!["main.py"]);
}

#[tokio::test]
async fn mount_points_cannot_be_moved() {
    let fx = fixture();
    let err = fx
        .router
        .rename_file("scratch", "scratch2")
        .await
        .unwrap_err();
    assert!(matches!(err, ContentsError::BadRequest(_)));
    assert!(fx.router.dir_exists("scratch").await.unwrap());
}

#[tokio::test]
async fn checkpoints_through_a_mount() {
    let fx = fixture();
    fx.router
        .save(ContentsModel::file("a.txt").with_text("v1"), "scratch/a.txt")
        .await
        .unwrap();

    let mount = fx.router.get_manager("scratch/a.txt").unwrap();
    let checkpoint = mount.create_checkpoint("scratch/a.txt").await.unwrap();
    assert!(fx.scratch.path().join(".snapshots").is_dir());

    fx.router
        .save(ContentsModel::file("a.txt").with_text("v2"), "scratch/a.txt")
        .await
        .unwrap();
    mount
        .restore_checkpoint(&checkpoint.id, "scratch/a.txt")
        .await
        .unwrap();

    let restored = fx
        .router
        .get("scratch/a.txt", GetOptions::with_content())
        .await
        .unwrap();
    assert_eq!(restored.content, Some(Content::Text("v1".into())));
    assert_eq!(
        mount.list_checkpoints("scratch/a.txt").await.unwrap(),
        vec![checkpoint]
    );

    // The snapshot directory stays out of listings
    let listing = fx
        .router
        .get("scratch", GetOptions::with_content())
        .await
        .unwrap();
    assert_eq!(entry_names(&listing), vec!["a.txt"]);
}
