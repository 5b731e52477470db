use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use recon_server::storage::{ModelHandle, ModelStore, StoreErr, persist};

const MODEL: &str = "H_2x2.csv";
const CSV: &str = "1,0,0,2\n0,3,1,0\n\n2,1,0,1\n0,0,4,1\n1,1,1,1\n";

/// A fresh directory holding a single model.
fn model_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("recon-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(MODEL), CSV).unwrap();
    dir
}

fn store(dir: &Path) -> ModelStore {
    ModelStore::new(dir, Some(dir.join("cache")))
}

#[test]
fn loads_csv_and_persists_the_binary_form() {
    let dir = model_dir("persist");

    let model = store(&dir).get(MODEL).unwrap();
    assert_eq!((model.rows(), model.cols()), (5, 4));

    let bin = dir.join("cache").join("H_2x2.csv.bin");
    let raw = persist::read_binary(&bin).unwrap().unwrap();
    assert_eq!(raw.dim(), (5, 4));
    assert_eq!(raw[[3, 2]], 4.);

    // The binary form is enough from now on.
    fs::remove_file(dir.join(MODEL)).unwrap();
    let cached = store(&dir).get(MODEL).unwrap();
    assert_eq!(cached.h(), model.h());
    assert_eq!(cached.stats(), model.stats());
}

#[test]
fn corrupt_binary_is_rebuilt() {
    let dir = model_dir("corrupt");
    let bin = dir.join("cache").join("H_2x2.csv.bin");
    fs::create_dir_all(bin.parent().unwrap()).unwrap();
    fs::write(&bin, b"RECONH01\x05").unwrap();

    let model = store(&dir).get(MODEL).unwrap();
    assert_eq!(model.cols(), 4);
    assert_eq!(persist::read_binary(&bin).unwrap().unwrap().dim(), (5, 4));
}

#[test]
fn cached_models_do_not_answer_for_other_ids() {
    let dir = model_dir("alias");
    store(&dir).get(MODEL).unwrap();

    let store = store(&dir);
    for id in ["H_2x2", "H_2x2.txt", "H_2x2.bogus"] {
        assert!(
            matches!(store.get(id), Err(StoreErr::NotFound(_))),
            "{id} should not resolve"
        );
    }
    assert!(store.ids().is_empty());
}

#[test]
fn concurrent_first_references_share_the_model() {
    let dir = model_dir("concurrent");
    let store = Arc::new(store(&dir));

    let models: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.get(MODEL).unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
    assert_eq!(store.ids(), [MODEL]);
}

#[test]
fn unresolvable_models_are_not_found() {
    let dir = model_dir("not-found");
    let store = store(&dir);

    for id in ["H_99x99.csv", "../H_2x2.csv", "cache/H_2x2.bin", ""] {
        assert!(
            matches!(store.get(id), Err(StoreErr::NotFound(_))),
            "{id} should not resolve"
        );
    }
}

#[test]
fn malformed_models_are_load_errors() {
    let dir = model_dir("malformed");
    fs::write(dir.join("ragged.csv"), "1,2,3\n4,5\n").unwrap();
    fs::write(dir.join("text.csv"), "1,2\nthree,4\n").unwrap();
    fs::write(dir.join("empty.csv"), "\n\n").unwrap();

    let store = store(&dir);
    assert!(matches!(store.get("ragged.csv"), Err(StoreErr::Ragged { .. })));
    assert!(matches!(store.get("text.csv"), Err(StoreErr::Parse { .. })));
    assert!(matches!(store.get("empty.csv"), Err(StoreErr::Model(_))));
    assert!(store.ids().is_empty());
}

#[test]
fn preload_continues_past_failures() {
    let dir = model_dir("preload");
    let store = store(&dir);

    assert_eq!(store.preload(&["H_60x60.csv", MODEL]), 1);
    assert_eq!(store.largest().unwrap().0, MODEL);
}

#[tokio::test(flavor = "multi_thread")]
async fn handle_bridges_blocking_loads() {
    let dir = model_dir("handle");
    let models = ModelHandle::new(store(&dir));

    let model = models.get(MODEL).await.unwrap();
    assert_eq!(model.rows(), 5);
    assert_eq!(models.preload(&[MODEL]).await, 1);
    assert!(matches!(
        models.get("missing.csv").await,
        Err(StoreErr::NotFound(_))
    ));
}
