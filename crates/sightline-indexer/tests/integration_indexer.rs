//! Integration tests for the Sightline scan, reconcile and snapshot pipeline.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use sightline_indexer::{
    ChangeEventType, ChangeScheduler, IndexerConfig, Scanner, SnapshotStore, SymbolIndex,
    SymbolKind,
};

/// Helper to create a small multi-language project
fn create_test_project(base: &Path) -> PathBuf {
    let project = base.join("test_project");
    fs::create_dir_all(project.join("app")).unwrap();
    fs::create_dir_all(project.join("web")).unwrap();
    fs::create_dir_all(project.join("node_modules/dep")).unwrap();
    fs::create_dir_all(project.join(".git")).unwrap();

    fs::write(
        project.join("app/models.py"),
        r#"class User:
    """A registered user."""

    def display_name(self):
        return self.name


def load_users():
    return []
"#,
    )
    .unwrap();

    fs::write(
        project.join("web/app.js"),
        r#"/** Boot the page. */
function main() {}

class Router {
  route(path) {}
}
"#,
    )
    .unwrap();

    fs::write(
        project.join("web/index.html"),
        r#"<html>
  <body>
    <div id="root"></div>
  </body>
</html>
"#,
    )
    .unwrap();

    fs::write(project.join("node_modules/dep/index.js"), "function dep() {}\n").unwrap();
    fs::write(project.join(".git/config.py"), "x = 1\n").unwrap();
    fs::write(project.join("README.md"), "# readme\n").unwrap();

    project.canonicalize().unwrap()
}

fn paths(index: &SymbolIndex) -> Vec<PathBuf> {
    index.get_all().into_iter().map(|s| s.path).collect()
}

/// Test full scan pipeline end-to-end
#[test]
fn test_scan_pipeline_end_to_end() {
    let temp_dir = tempdir().unwrap();
    let project = create_test_project(temp_dir.path());

    let scanner = Scanner::new(&IndexerConfig::for_root(&project)).unwrap();
    let index = SymbolIndex::new(scanner.root().to_path_buf());
    scanner.rebuild_index(&index);

    assert_eq!(
        paths(&index),
        vec![
            project.join("app/models.py"),
            project.join("web/app.js"),
            project.join("web/index.html"),
        ]
    );

    let models = index.get_file(&project.join("app/models.py")).unwrap();
    let user = models.symbol("User").unwrap();
    assert_eq!(user.kind, SymbolKind::Class);
    assert_eq!(user.doc.as_deref(), Some("A registered user."));
    let method = models.symbol("display_name").unwrap();
    assert_eq!(method.kind, SymbolKind::Method);
    assert_eq!(method.parent.as_deref(), Some("User"));

    let html = index.get_file(&project.join("web/index.html")).unwrap();
    assert_eq!(html.symbols[0].name, "div#root");

    let hits: Vec<String> = index.search("route").into_iter().map(|s| s.name).collect();
    assert_eq!(hits, vec!["Router", "route"]);

    let tree = index.get_tree();
    assert_eq!(tree.children.keys().collect::<Vec<_>>(), vec!["app", "web"]);
    assert_eq!(tree.file_count(), 3);
}

/// Test snapshot persistence and warm start
#[tokio::test]
async fn test_snapshot_warm_start() {
    let temp_dir = tempdir().unwrap();
    let project = create_test_project(temp_dir.path());
    let config = IndexerConfig::for_root(&project);

    let scanner = Scanner::new(&config).unwrap();
    let store = SnapshotStore::for_root(scanner.root().to_path_buf(), &config);
    let index = Arc::new(SymbolIndex::new(scanner.root().to_path_buf()));
    scanner.scan_and_persist(&index, &store).await.unwrap();

    assert!(store.path().starts_with(project.join(".sightline")));

    // A second process hydrates before scanning
    let warm = SymbolIndex::new(scanner.root().to_path_buf());
    let loaded = scanner.hydrate_index(&warm, &store).await;

    assert_eq!(loaded, 3);
    assert_eq!(warm.get_all(), index.get_all());
    assert_eq!(warm.stats(), index.stats());
}

/// Test scheduler-driven reconciliation across create, edit, move and delete
#[test]
fn test_reconcile_flow() {
    let temp_dir = tempdir().unwrap();
    let project = create_test_project(temp_dir.path());

    let scanner = Scanner::new(&IndexerConfig::for_root(&project)).unwrap();
    let scheduler = ChangeScheduler::new(Duration::from_millis(10)).with_filter(scanner.filter());
    let index = SymbolIndex::new(scanner.root().to_path_buf());
    scanner.rebuild_index(&index);

    // New file, then an edit in the same window
    let util = project.join("app/util.py");
    fs::write(&util, "def helper():\n    pass\n").unwrap();
    scheduler.enqueue(ChangeEventType::Created, &util, None);
    fs::write(&util, "def helper():\n    pass\n\n\ndef other():\n    pass\n").unwrap();
    scheduler.enqueue(ChangeEventType::Modified, &util, None);

    let batch = scheduler.drain(true).unwrap();
    assert_eq!(batch.created, BTreeSet::from([util.clone()]));
    assert!(batch.modified.is_empty());

    let outcome = scanner.apply_change_batch(&index, &batch);
    assert_eq!(outcome.updated, BTreeSet::from([util.clone()]));
    assert_eq!(index.get_file(&util).unwrap().symbols.len(), 2);

    // Rename app.js to main.js
    let from = project.join("web/app.js");
    let to = project.join("web/main.js");
    fs::rename(&from, &to).unwrap();
    scheduler.enqueue(ChangeEventType::Moved, &from, Some(to.clone()));

    let batch = scheduler.drain(true).unwrap();
    scanner.apply_change_batch(&index, &batch);
    assert!(index.get_file(&from).is_none());
    assert!(index.get_file(&to).unwrap().symbol("Router").is_some());

    // Delete the whole markup file
    let html = project.join("web/index.html");
    fs::remove_file(&html).unwrap();
    scheduler.enqueue(ChangeEventType::Deleted, &html, None);

    let batch = scheduler.drain(true).unwrap();
    let outcome = scanner.apply_change_batch(&index, &batch);
    assert_eq!(outcome.deleted, BTreeSet::from([html.clone()]));

    // The incremental index now matches a fresh full scan
    let fresh = SymbolIndex::new(scanner.root().to_path_buf());
    scanner.rebuild_index(&fresh);
    assert_eq!(index.get_all(), fresh.get_all());
}

/// Test that a concurrent rebuild and reconciliation leave a consistent index
#[test]
fn test_concurrent_rebuild_and_reconcile() {
    let temp_dir = tempdir().unwrap();
    let project = create_test_project(temp_dir.path());

    let scanner = Scanner::new(&IndexerConfig::for_root(&project)).unwrap();
    let index = Arc::new(SymbolIndex::new(scanner.root().to_path_buf()));

    let extra = project.join("app/extra.py");
    fs::write(&extra, "def extra():\n    pass\n").unwrap();
    let scheduler = ChangeScheduler::new(Duration::ZERO);
    scheduler.enqueue(ChangeEventType::Created, &extra, None);
    let batch = scheduler.drain(true).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let scanner = scanner.clone();
            let index = index.clone();
            let batch = batch.clone();
            std::thread::spawn(move || {
                if i % 2 == 0 {
                    scanner.rebuild_index(&index);
                } else {
                    scanner.apply_change_batch(&index, &batch);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(index.len(), 4);
    assert!(index.contains(&extra));
}
