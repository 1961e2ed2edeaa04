#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use tempfile::TempDir;

use cellbox::{
    Caller, NodePath, ODataStore, RetryPolicy, TreeConfig, TreeFacade,
};

pub const UNIT_URL: &str = "https://unit.example/";
pub const CELL: &str = "cellA";
pub const BOX: &str = "boxA";

fn test_config(temp_dir: &TempDir) -> TreeConfig {
    TreeConfig::new(temp_dir.path().join("cells"))
        .with_unit_url(UNIT_URL)
        .with_retry(RetryPolicy::immediate(2))
}

fn provision(facade: &TreeFacade) {
    let master = Caller::unit_master();
    facade.create_cell(&master, CELL).unwrap();
    facade.create_box(&master, CELL, BOX, None).unwrap();
}

/// Facade over a fresh root with `cellA/boxA` provisioned
pub fn setup_test_env() -> (TreeFacade, TempDir) {
    setup_test_env_with(|_| {})
}

pub fn setup_test_env_with(adjust: impl FnOnce(&mut TreeConfig)) -> (TreeFacade, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    adjust(&mut config);
    let facade = TreeFacade::new(config).unwrap();
    provision(&facade);
    (facade, temp_dir)
}

pub fn setup_test_env_with_store(store: Arc<dyn ODataStore>) -> (TreeFacade, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let facade = TreeFacade::with_odata_store(test_config(&temp_dir), store).unwrap();
    provision(&facade);
    (facade, temp_dir)
}

pub fn master() -> Caller {
    Caller::unit_master()
}

/// Path below the test box, e.g. `dav("col1/f.txt")`
pub fn dav(rel: &str) -> NodePath {
    NodePath::parse(&format!("/{CELL}/{BOX}/{rel}")).unwrap()
}

/// Absolute url below the test box, as a MOVE destination
pub fn dav_url(rel: &str) -> String {
    format!("{UNIT_URL}{CELL}/{BOX}/{rel}")
}

/// Canonical url of a box role
pub fn role(name: &str) -> String {
    format!("{UNIT_URL}{CELL}/__role/{BOX}/{name}")
}

pub fn put_text(facade: &TreeFacade, rel: &str, text: &str) {
    facade
        .put(
            &master(),
            &dav(rel),
            Some("text/plain"),
            Cursor::new(text.as_bytes().to_vec()),
            None,
        )
        .unwrap();
}
