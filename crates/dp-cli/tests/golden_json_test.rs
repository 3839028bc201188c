//! Golden snapshot harness: each `tests/golden/<case>.dot` must parse to the
//! graph stored in `<case>.json`. Run with `BLESS=1` to rewrite snapshots.

use dp_parser::parse;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const CASE_IDS: &[&str] = &["strict_clusters", "undirected_multi", "nested_scopes"];

fn golden_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("golden")
}

fn run_case(case_id: &str, bless: bool) {
    let base = golden_dir();
    let input_path = base.join(format!("{case_id}.dot"));
    let expected_path = base.join(format!("{case_id}.json"));

    let input = fs::read_to_string(&input_path)
        .unwrap_or_else(|err| panic!("failed reading {}: {err}", input_path.display()));
    let graph = parse(&input).unwrap_or_else(|err| panic!("{case_id}: parse failed: {err}"));
    let actual = serde_json::to_value(&graph).expect("serialize graph");

    if bless {
        let pretty = serde_json::to_string_pretty(&actual).expect("pretty json");
        fs::write(&expected_path, format!("{pretty}\n"))
            .unwrap_or_else(|err| panic!("failed writing {}: {err}", expected_path.display()));
        return;
    }

    let expected_text = fs::read_to_string(&expected_path)
        .unwrap_or_else(|err| panic!("failed reading {}: {err}", expected_path.display()));
    let expected: Value = serde_json::from_str(&expected_text)
        .unwrap_or_else(|err| panic!("invalid golden json {}: {err}", expected_path.display()));

    assert_eq!(actual, expected, "golden mismatch for {case_id}");
}

#[test]
fn golden_graphs_match() {
    let bless = std::env::var_os("BLESS").is_some();
    for case_id in CASE_IDS {
        run_case(case_id, bless);
    }
}
