use mbatch::core::file_scanner::{total_size, FileScanner, ScanOrder};
use mbatch::core::scratch::{prune_empty, ScratchDir, ScratchSpace};
use std::fs;
use tempfile::TempDir;

fn names(dir: &TempDir, order: ScanOrder) -> Vec<String> {
    FileScanner::new(dir.path())
        .unwrap()
        .extensions(&["mp3"])
        .order(order)
        .scan()
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect()
}

#[test]
fn test_scan_filters_and_orders() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["ch10.mp3", "ch9.MP3", "ch1.mp3", ".ch0.mp3", "cover.jpg"] {
        fs::write(temp_dir.path().join(name), b"data").unwrap();
    }
    fs::create_dir(temp_dir.path().join("extra.mp3")).unwrap();

    assert_eq!(
        names(&temp_dir, ScanOrder::Natural),
        vec!["ch1.mp3", "ch9.MP3", "ch10.mp3"]
    );
    assert_eq!(
        names(&temp_dir, ScanOrder::Name),
        vec!["ch1.mp3", "ch10.mp3", "ch9.MP3"]
    );
    assert_eq!(names(&temp_dir, ScanOrder::Directory).len(), 3);
}

#[test]
fn test_total_size() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.mp3"), vec![0u8; 1500]).unwrap();
    fs::write(temp_dir.path().join("b.mp3"), vec![0u8; 500]).unwrap();

    let files = FileScanner::new(temp_dir.path())
        .unwrap()
        .extensions(&[".mp3"])
        .scan()
        .unwrap();
    assert_eq!(total_size(&files), 2000);
}

#[test]
fn test_scanner_rejects_files() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("a.mp3");
    fs::write(&file, b"x").unwrap();

    assert!(FileScanner::new(&file).is_err());
    assert!(FileScanner::new(&temp_dir.path().join("missing")).is_err());
}

#[test]
fn test_prune_only_removes_empty_directories() {
    let temp_dir = TempDir::new().unwrap();
    let scratch = ScratchSpace::ensure(
        temp_dir.path(),
        &[ScratchDir::Out, ScratchDir::Dry, ScratchDir::Logs],
    )
    .unwrap();
    fs::write(scratch.path(ScratchDir::Dry).join("a.mp3"), b"x").unwrap();
    fs::create_dir(scratch.path(ScratchDir::Logs).join("nested")).unwrap();

    let pruned = scratch.prune_empty();

    assert_eq!(pruned, vec![scratch.path(ScratchDir::Out)]);
    assert!(scratch.path(ScratchDir::Dry).join("a.mp3").exists());
    assert!(scratch.path(ScratchDir::Logs).exists());

    // missing directories are skipped quietly
    assert!(prune_empty([scratch.path(ScratchDir::Out).as_path()]).is_empty());
}
