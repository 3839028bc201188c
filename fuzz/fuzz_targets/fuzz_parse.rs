#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    match dp_parser::parse(input) {
        Ok(graph) => {
            if graph.strict {
                assert!(graph.edges.iter().all(|edge| edge.occurrences.len() == 1));
            }
            let _ = serde_json::to_string(&graph);
        }
        Err(err) => {
            let span = err.span();
            assert!(span.start.byte <= input.len());
        }
    }
});
