//! End-to-end: manifest directory -> file-backed catalog -> queries

use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use pkgdex::catalog::{Catalog, UpdateRequest};
use pkgdex::config::Dsn;
use pkgdex::provider::ManifestProvider;
use pkgdex::query::{ArgumentFilter, Listing};
use pkgdex::sync::SyncOptions;
use serde_json::{Value, json};

fn write_manifest(root: &Path, rel: &str, value: &Value, mtime: u64) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime))
        .unwrap();
}

fn demo_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "Demo/Foo.json",
        &json!({
            "summary": "Does foo",
            "x.dist": "Demo-Dist",
            "functions": {
                "run": {
                    "summary": "Runs foo",
                    "args": {
                        "name": { "schema": "str*", "req": true, "pos": 0 },
                        "count": { "schema": "int" }
                    }
                }
            }
        }),
        1_000,
    );
    write_manifest(dir.path(), "Demo/Bar.json", &json!({ "summary": "Does bar" }), 1_000);
    dir
}

fn sync_options(selectors: &[&str]) -> SyncOptions {
    SyncOptions {
        selectors: selectors.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn names<T>(listing: Option<Listing<T>>) -> Vec<String> {
    match listing {
        Some(Listing::Names(names)) => names,
        _ => panic!("expected a name listing"),
    }
}

#[test]
fn sync_then_query() {
    let root = demo_root();
    let db = tempfile::tempdir().unwrap();
    let path = db.path().join("cat.db");
    let dsn = Dsn::parse(&format!("dbi:SQLite:dbname={}", path.display())).unwrap();
    let catalog = Catalog::open(&dsn).unwrap();
    let provider = ManifestProvider::new(root.path());

    let report = catalog
        .sync(&provider, &provider, &sync_options(&["Demo::"]), None)
        .into_result()
        .unwrap();
    assert_eq!(report.candidates, vec!["Demo::Bar", "Demo::Foo"]);
    assert_eq!(report.functions_written, 1);

    assert_eq!(names(catalog.packages(None, false).payload), vec!["Demo::Bar", "Demo::Foo"]);
    assert_eq!(
        names(catalog.functions(None, Some("Demo::Foo"), false).payload),
        vec!["Demo::Foo::run"]
    );

    let listing = catalog.arguments(&ArgumentFilter::default(), true).payload;
    let Some(Listing::Detailed(args)) = listing else {
        panic!("expected argument rows");
    };
    let types: Vec<(&str, Option<&str>)> = args
        .iter()
        .map(|a| (a.name.as_str(), a.argument.schema_type.as_deref()))
        .collect();
    assert_eq!(types, vec![("count", Some("int")), ("name", Some("str"))]);

    let meta = catalog.meta("Demo::Foo").into_result().unwrap();
    assert_eq!(meta["summary"], "Does foo");
    assert!(meta.get("functions").is_none());
}

#[test]
fn resync_follows_the_filesystem() {
    let root = demo_root();
    let catalog = Catalog::open_in_memory().unwrap();
    let provider = ManifestProvider::new(root.path());
    let all = sync_options(&["Demo::"]);

    catalog.sync(&provider, &provider, &all, None).into_result().unwrap();

    // Untouched files are skipped
    let report = catalog.sync(&provider, &provider, &all, None).into_result().unwrap();
    assert_eq!(report.unchanged, vec!["Demo::Bar", "Demo::Foo"]);

    // A newer manifest is picked up; a fresh provider drops its cache
    write_manifest(root.path(), "Demo/Bar.json", &json!({ "summary": "Does more bar" }), 2_000);
    let provider = ManifestProvider::new(root.path());
    let report = catalog.sync(&provider, &provider, &all, None).into_result().unwrap();
    assert_eq!(report.refreshed, vec!["Demo::Bar"]);
    let bar = catalog.store().get_package("Demo::Bar").unwrap().unwrap();
    assert_eq!(bar.summary.as_deref(), Some("Does more bar"));
    assert_eq!(bar.mtime, Some(2_000));

    // A removed manifest is deleted only when asked
    std::fs::remove_file(root.path().join("Demo/Foo.json")).unwrap();
    catalog.sync(&provider, &provider, &all, None).into_result().unwrap();
    assert_eq!(catalog.stats().payload.unwrap().packages, 2);

    let pruning = SyncOptions {
        delete: true,
        ..sync_options(&["Demo::"])
    };
    let report = catalog.sync(&provider, &provider, &pruning, None).into_result().unwrap();
    assert_eq!(report.deleted, vec!["Demo::Foo"]);
    assert_eq!(names(catalog.packages(None, false).payload), vec!["Demo::Bar"]);
    assert_eq!(catalog.stats().payload.unwrap().functions, 0);
}

#[test]
fn manual_entries_outside_scope_survive() {
    let root = demo_root();
    let catalog = Catalog::open_in_memory().unwrap();
    let provider = ManifestProvider::new(root.path());

    catalog
        .update(&UpdateRequest::package("Local::Tool", json!({ "summary": "Hand made" })))
        .into_result()
        .unwrap();

    let pruning = SyncOptions {
        delete: true,
        ..sync_options(&["Demo::"])
    };
    catalog.sync(&provider, &provider, &pruning, None).into_result().unwrap();
    assert_eq!(
        names(catalog.packages(None, false).payload),
        vec!["Demo::Bar", "Demo::Foo", "Local::Tool"]
    );
}

#[test]
fn excluded_manifest_removes_rows() {
    let root = demo_root();
    let catalog = Catalog::open_in_memory().unwrap();
    let provider = ManifestProvider::new(root.path());
    catalog
        .sync(&provider, &provider, &sync_options(&["Demo::"]), None)
        .into_result()
        .unwrap();

    write_manifest(
        root.path(),
        "Demo/Foo.json",
        &json!({ "summary": "Does foo", "x.pkgdex.exclude": true }),
        3_000,
    );
    let provider = ManifestProvider::new(root.path());
    let report = catalog
        .sync(&provider, &provider, &sync_options(&["Demo::Foo"]), None)
        .into_result()
        .unwrap();

    assert_eq!(report.excluded, vec!["Demo::Foo"]);
    assert_eq!(catalog.meta("Demo::Foo").status, 404);
    assert_eq!(catalog.meta("Demo::Foo::run").status, 404);
}

#[test]
fn broken_manifest_aborts_sync() {
    let root = demo_root();
    std::fs::write(root.path().join("Demo/Broken.json"), "{ nope").unwrap();
    let catalog = Catalog::open_in_memory().unwrap();
    let provider = ManifestProvider::new(root.path());

    let response = catalog.sync(&provider, &provider, &sync_options(&["Demo::"]), None);
    assert_eq!(response.status, 500);
    assert!(response.message.contains("Demo::Broken"));
}
