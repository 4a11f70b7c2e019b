use lantern::files::{DocumentRoot, INDEX_FILE};
use lantern::files::resolver::{contained_path, resolve};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// root/
///   file.txt
///   sub/index.html
///   empty/
///   nested/deep/page.css
fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("file.txt"), b"plain file").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join(INDEX_FILE), b"<h1>sub</h1>").unwrap();
    fs::create_dir(root.join("empty")).unwrap();
    fs::create_dir_all(root.join("nested/deep")).unwrap();
    fs::write(root.join("nested/deep/page.css"), b"body{}").unwrap();
    dir
}

#[tokio::test]
async fn test_resolve_regular_file() {
    let dir = site();
    let root = dir.path();

    let file = resolve(root, "/file.txt").await.unwrap();
    assert_eq!(file.path, root.join("file.txt"));
    assert_eq!(file.len, 10);

    let file = resolve(root, "/nested/deep/page.css").await.unwrap();
    assert_eq!(file.path, root.join("nested/deep/page.css"));
}

#[tokio::test]
async fn test_resolve_directory_serves_index() {
    let dir = site();
    let root = dir.path();

    let file = resolve(root, "/sub/").await.unwrap();
    assert_eq!(file.path, root.join("sub").join(INDEX_FILE));
    assert_eq!(file.len, 12);

    let file = resolve(root, "/sub").await.unwrap();
    assert_eq!(file.path, root.join("sub").join(INDEX_FILE));
}

#[tokio::test]
async fn test_resolve_directory_without_index() {
    let dir = site();
    assert!(resolve(dir.path(), "/empty/").await.is_none());
    // The root itself has no index.html either
    assert!(resolve(dir.path(), "/").await.is_none());
}

#[tokio::test]
async fn test_resolve_missing_file() {
    let dir = site();
    assert!(resolve(dir.path(), "/nope.html").await.is_none());
    assert!(resolve(dir.path(), "/file.txt/extra").await.is_none());
}

#[tokio::test]
async fn test_resolve_dot_segments_inside_root() {
    let dir = site();
    let root = dir.path();

    let file = resolve(root, "/sub/../file.txt").await.unwrap();
    assert_eq!(file.path, root.join("file.txt"));

    let file = resolve(root, "/./nested/./deep/../deep/page.css").await.unwrap();
    assert_eq!(file.path, root.join("nested/deep/page.css"));
}

#[tokio::test]
async fn test_resolve_traversal_never_escapes() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("www");
    fs::create_dir(&root).unwrap();
    fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

    assert!(resolve(&root, "/../secret.txt").await.is_none());
    assert!(resolve(&root, "/sub/../../secret.txt").await.is_none());

    for depth in 1..8 {
        let url = format!("/{}etc/passwd", "../".repeat(depth));
        assert!(resolve(&root, &url).await.is_none(), "{url}");
    }
}

#[tokio::test]
async fn test_resolve_sibling_with_shared_name_prefix() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("www");
    let sibling = outer.path().join("www2");
    fs::create_dir(&root).unwrap();
    fs::create_dir(&sibling).unwrap();
    fs::write(sibling.join("leak.txt"), b"leak").unwrap();

    assert!(resolve(&root, "/../www2/leak.txt").await.is_none());
}

#[test]
fn test_contained_path_is_component_wise() {
    let root = Path::new("/srv/www");

    assert_eq!(contained_path(root, "/"), Some(root.to_path_buf()));
    assert_eq!(contained_path(root, "/a/b"), Some(root.join("a/b")));
    assert_eq!(contained_path(root, "//a///b"), Some(root.join("a/b")));
    assert_eq!(contained_path(root, "/a/../.."), None);
    assert_eq!(contained_path(root, "/../www"), Some(root.to_path_buf()));
    assert_eq!(contained_path(root, "/../www-old/x"), None);
}

#[tokio::test]
async fn test_document_root_open() {
    let dir = site();

    let root = DocumentRoot::open(dir.path()).unwrap();
    assert!(root.path().is_absolute());
    assert!(root.resolve("/file.txt").await.is_some());

    assert!(DocumentRoot::open(dir.path().join("file.txt")).is_err());
    assert!(DocumentRoot::open(dir.path().join("missing")).is_err());
}
