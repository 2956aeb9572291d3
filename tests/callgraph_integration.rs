//! Integration tests for the Python call-graph adapter, driven the way the
//! `calls` command drives it.

use std::path::{Path, PathBuf};

use codelens::callgraph::{CallGraphAdapter, Location, Position, PythonCallGraph};
use codelens::cli::{preload, query_calls, Direction};
use codelens::report::CallQueryResult;

fn shop() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("callgraph")
        .join("shop")
}

fn short(location: &Location) -> String {
    let name = location
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}:{}:{}", name, location.line, location.column)
}

async fn ready(preloaded: bool) -> PythonCallGraph {
    let adapter = PythonCallGraph::new();
    adapter.initialize(&shop()).await.unwrap();
    if preloaded {
        let loaded = preload(&adapter, &shop(), &[]).await.unwrap();
        assert_eq!(loaded, 3);
    }
    adapter
}

#[tokio::test]
async fn test_references_across_preloaded_files() {
    let adapter = ready(true).await;
    let util = shop().join("util.py");

    let result = query_calls(&adapter, &util, Direction::References, Position::new(1, 1))
        .await
        .unwrap();
    let CallQueryResult::References(locations) = result else {
        panic!("expected references");
    };
    let found: Vec<String> = locations.iter().map(short).collect();
    assert_eq!(found, vec!["billing.py:5:5", "orders.py:11:9", "orders.py:17:5"]);
}

#[tokio::test]
async fn test_references_need_the_caller_files_loaded() {
    let adapter = ready(false).await;
    let util = shop().join("util.py");

    let result = query_calls(&adapter, &util, Direction::References, Position::new(1, 1))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(adapter.cached_files(), vec![util]);
}

#[tokio::test]
async fn test_incoming_calls_name_the_enclosing_method() {
    let adapter = ready(true).await;
    let billing = shop().join("billing.py");

    let result = query_calls(&adapter, &billing, Direction::Incoming, Position::new(4, 1))
        .await
        .unwrap();
    let CallQueryResult::Incoming(calls) = result else {
        panic!("expected incoming calls");
    };
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].from.qualified_name, "OrderBook.place");
    assert_eq!(calls[0].from.line, 9);
    assert_eq!(calls[0].from_ranges, vec![Position::new(12, 16)]);
}

#[tokio::test]
async fn test_outgoing_calls_resolve_to_definitions() {
    let adapter = ready(true).await;
    let orders = shop().join("orders.py");

    let result = query_calls(&adapter, &orders, Direction::Outgoing, Position::new(15, 1))
        .await
        .unwrap();
    let CallQueryResult::Outgoing(calls) = result else {
        panic!("expected outgoing calls");
    };
    let callees: Vec<&str> = calls.iter().map(|c| c.callee.as_str()).collect();
    assert_eq!(callees, vec!["book.place", "log"]);

    let place = calls[0].to.as_ref().expect("place resolves");
    assert_eq!(place.file.file_name().unwrap(), "orders.py");
    assert_eq!(place.line, 9);
    assert_eq!(calls[0].from_ranges, vec![Position::new(16, 14)]);

    let log = calls[1].to.as_ref().expect("log resolves");
    assert_eq!(log.file.file_name().unwrap(), "util.py");
    assert_eq!(log.line, 1);
}

#[tokio::test]
async fn test_definition_of_a_call_site() {
    let adapter = ready(true).await;
    let billing = shop().join("billing.py");

    let result = query_calls(&adapter, &billing, Direction::Definition, Position::new(5, 5))
        .await
        .unwrap();
    let CallQueryResult::Definition(locations) = result else {
        panic!("expected definitions");
    };
    let found: Vec<String> = locations.iter().map(short).collect();
    assert_eq!(found, vec!["util.py:1:1"]);
}

#[tokio::test]
async fn test_file_symbols_of_a_class_module() {
    let adapter = ready(false).await;
    let symbols = adapter
        .get_file_symbols(Path::new("orders.py"))
        .await
        .unwrap();
    let names: Vec<&str> = symbols.iter().map(|s| s.qualified_name.as_str()).collect();
    assert!(names.contains(&"OrderBook"));
    assert!(names.contains(&"OrderBook.__init__"));
    assert!(names.contains(&"OrderBook.place"));
    assert!(names.contains(&"checkout"));
    adapter.shutdown().await;
    assert!(adapter.cached_files().is_empty());
}
