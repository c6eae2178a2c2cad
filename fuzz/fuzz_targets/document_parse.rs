#![no_main]

//! Fuzz target for project document parsing.
//!
//! Any text that parses must serialize back to exactly the same text.

use libfuzzer_sys::fuzz_target;
use projfix_xml::Document;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(doc) = Document::parse(s) {
        assert_eq!(doc.to_xml_string(), s);
    }
});
