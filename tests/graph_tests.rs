//! Dependency graph tests through the full pipeline.

use std::path::Path;

use cartograph::config::IndexConfig;
use cartograph::pipeline::{artifact_paths, run_index};
use cartograph::store::Store;
use cartograph::{coupling_scores, detect_cycles};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn open_store(root: &Path) -> Store {
    let (store_path, _) = artifact_paths(root);
    Store::open(&store_path).unwrap()
}

#[test]
fn test_three_file_cycle_yields_one_chain() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.py", "import b\n");
    write(temp.path(), "b.py", "import c\n");
    write(temp.path(), "c.py", "import a\n");

    let config = IndexConfig::load(temp.path()).unwrap();
    run_index(temp.path(), &config).unwrap();

    let store = open_store(temp.path());
    let cycles = detect_cycles(&store.all_file_edges().unwrap());
    assert_eq!(cycles, vec![vec!["a.py", "b.py", "c.py"]]);
}

#[test]
fn test_acyclic_tree_yields_no_cycles() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.py", "import b\nimport c\n");
    write(temp.path(), "b.py", "import c\n");
    write(temp.path(), "c.py", "def leaf():\n    return 0\n");

    let config = IndexConfig::load(temp.path()).unwrap();
    run_index(temp.path(), &config).unwrap();

    let store = open_store(temp.path());
    assert!(detect_cycles(&store.all_file_edges().unwrap()).is_empty());
}

#[test]
fn test_coupling_in_bounds_and_zero_for_single_module() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "only.py", "def f():\n    return 0\n");

    let config = IndexConfig::load(temp.path()).unwrap();
    run_index(temp.path(), &config).unwrap();

    let store = open_store(temp.path());
    let paths: Vec<String> = store.all_files().unwrap().into_iter().map(|f| f.path).collect();
    let scores = coupling_scores(&paths, &store.all_file_edges().unwrap());
    assert_eq!(scores["only.py"], 0.0);

    // Add a second module that imports the first
    write(temp.path(), "user.py", "import only\n");
    run_index(temp.path(), &config).unwrap();

    let store = open_store(temp.path());
    let paths: Vec<String> = store.all_files().unwrap().into_iter().map(|f| f.path).collect();
    let scores = coupling_scores(&paths, &store.all_file_edges().unwrap());
    assert!(scores.values().all(|s| (0.0..=1.0).contains(s)));
    assert!(scores["only.py"] > 0.0);
}

#[test]
fn test_unresolved_imports_produce_no_edges() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.py", "import requests\nimport os\n");

    let config = IndexConfig::load(temp.path()).unwrap();
    let report = run_index(temp.path(), &config).unwrap();

    assert_eq!(report.resolution.stdlib, 1);
    assert_eq!(report.resolution.unresolved, 1);
    assert_eq!(report.resolution.file_edges, 0);

    let store = open_store(temp.path());
    assert!(store.all_file_edges().unwrap().is_empty());
}

#[test]
fn test_ambiguous_import_recorded_and_deterministic() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app/main.py", "import util\n");
    write(temp.path(), "app/util.py", "def near():\n    return 1\n");
    write(temp.path(), "lib/util.py", "def far():\n    return 2\n");

    let config = IndexConfig::load(temp.path()).unwrap();
    let report = run_index(temp.path(), &config).unwrap();

    assert_eq!(report.resolution.ambiguous.len(), 1);
    assert_eq!(report.resolution.ambiguous[0].chosen, "app/util.py");

    let store = open_store(temp.path());
    let deps = store.file_dependencies("app/main.py").unwrap();
    assert_eq!(deps.depends_on, vec!["app/util.py"]);
}
