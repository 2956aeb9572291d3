//! Relative targets resolve against the working directory.
//!
//! Kept in its own test binary: it changes the process working directory.

use std::path::PathBuf;

use codelens::deadcode::{check_dead_code_dir, DeadCodeOptions};
use codelens::graph::{check_circular, normalize_path, CircularOptions};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

#[test]
fn test_relative_targets_from_working_directory() {
    assert_eq!(normalize_path(std::path::Path::new(".")), PathBuf::from("."));

    std::env::set_current_dir(testdata_path().join("circular").join("cycle")).unwrap();

    let result = check_circular(&PathBuf::from("."), &CircularOptions::default(), &[]);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.files_analyzed, 5);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].files, vec!["a.ts", "b.ts", "c.ts", "a.ts"]);

    let result = check_circular(&PathBuf::from("a.ts"), &CircularOptions::default(), &[]);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.issues.len(), 1);

    std::env::set_current_dir(testdata_path().join("deadcode")).unwrap();

    let report = check_dead_code_dir(&PathBuf::from("."), &[], &DeadCodeOptions::default());
    assert!(report.success, "{:?}", report.error);
    assert_eq!(report.files_analyzed, 5);
    assert_eq!(report.issues.len(), 25);

    let report = check_dead_code_dir(&PathBuf::from("cache.go"), &[], &DeadCodeOptions::default());
    assert!(report.success);
    assert_eq!(report.files_analyzed, 1);
    assert_eq!(report.issues.len(), 3);
}
