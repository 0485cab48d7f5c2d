use super::*;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent dirs");
    }
    fs::write(path, content).expect("should write file");
}

fn scan_config(root: &Path) -> ScanConfig {
    ScanConfig {
        root: root.to_path_buf(),
        ..ScanConfig::default()
    }
}

#[test]
fn finds_allowed_extensions_and_skips_ignored_dirs() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    write(root, "src/main/App.java", b"class App {}");
    write(root, "README.md", b"# readme");
    write(root, "notes/todo.TXT", b"upper-case extension");
    write(root, "src/main/app.rs", b"fn main() {}");
    write(root, "target/Generated.java", b"class Generated {}");
    write(root, "node_modules/pkg/readme.md", b"vendored");
    write(root, ".git/HEAD.txt", b"ref");

    let files = scan_files(&scan_config(root)).expect("scan should succeed");

    let relative: Vec<String> = files
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .expect("inside root")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(
        relative,
        vec!["README.md", "notes/todo.TXT", "src/main/App.java"]
    );
}

#[test]
fn skips_files_over_size_limit() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    write(root, "small.txt", &[b'a'; 10]);
    write(root, "large.txt", &[b'a'; 100]);

    let config = ScanConfig {
        max_file_size: 50,
        ..scan_config(root)
    };
    let files = scan_files(&config).expect("scan should succeed");

    assert_eq!(files, vec![root.join("small.txt")]);
}

#[test]
fn extensions_without_dot_are_accepted() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    write(root, "lib.rs", b"pub fn f() {}");

    let config = ScanConfig {
        extensions: vec!["RS".to_string()],
        ..scan_config(root)
    };
    let files = scan_files(&config).expect("scan should succeed");

    assert_eq!(files.len(), 1);
}

#[test]
fn missing_root_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = scan_config(&temp_dir.path().join("does-not-exist"));
    assert!(matches!(scan_files(&config), Err(RagError::Io(_))));
}

#[test]
fn read_source_replaces_invalid_utf8() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    write(temp_dir.path(), "bad.txt", b"ok \xff\xfe end");

    let text = read_source(&temp_dir.path().join("bad.txt")).expect("read should succeed");

    assert!(text.starts_with("ok "));
    assert!(text.ends_with(" end"));
    assert!(text.contains('\u{FFFD}'));
}
