#![no_main]

use dp_parser::{Token, tokenize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tokens) = tokenize(input) {
        assert_eq!(tokens.last().map(|spanned| &spanned.token), Some(&Token::Eof));
    }
});
