#![no_main]

//! Fuzz target for the full normalization run.
//!
//! Builds a project from structured input so most cases get past the parser, then checks that
//! normalizing never panics and that normalized output is a fixed point.

use libfuzzer_sys::fuzz_target;
use projfix_domain::{ChangeLog, NormalizeOptions, SdkNormalizer};

#[derive(Debug, arbitrary::Arbitrary)]
struct ProjectInput {
    groups: Vec<Vec<Item>>,
    properties: Vec<(bool, String)>,
    sort: bool,
    delete_duplicates: bool,
}

#[derive(Debug, arbitrary::Arbitrary)]
struct Item {
    kind: u8,
    value: String,
    remove: bool,
    empty_body: bool,
}

const KINDS: &[&str] = &["Compile", "Content", "EmbeddedResource", "None", "Reference", "Page"];

fn escape(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render(input: &ProjectInput) -> String {
    let mut out = String::from("<Project>\n");
    for (conditioned, name) in &input.properties {
        let name: String = name.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        if name.is_empty() {
            continue;
        }
        if *conditioned {
            out.push_str("  <PropertyGroup Condition=\"'$(Configuration)' == 'Debug'\">\n");
        } else {
            out.push_str("  <PropertyGroup>\n");
        }
        out.push_str(&format!("    <{name}>x</{name}>\n  </PropertyGroup>\n"));
    }
    for items in &input.groups {
        out.push_str("  <ItemGroup>\n");
        for item in items {
            let kind = KINDS[item.kind as usize % KINDS.len()];
            let attr = if item.remove { "Remove" } else { "Include" };
            let value = escape(&item.value);
            if item.empty_body {
                out.push_str(&format!("    <{kind} {attr}=\"{value}\"></{kind}>\n"));
            } else {
                out.push_str(&format!("    <{kind} {attr}=\"{value}\" />\n"));
            }
        }
        out.push_str("  </ItemGroup>\n");
    }
    out.push_str("</Project>\n");
    out
}

fn normalize(text: &str, options: &NormalizeOptions) -> Option<(String, ChangeLog)> {
    let mut engine = SdkNormalizer::parse(text).ok()?;
    let mut changes = ChangeLog::new();
    engine.run(options, &mut changes).ok()?;
    Some((engine.document().to_xml_string(), changes))
}

fuzz_target!(|input: ProjectInput| {
    let options = NormalizeOptions {
        sort: input.sort,
        delete_duplicates: input.delete_duplicates,
    };
    let text = render(&input);
    let Some((once, _)) = normalize(&text, &options) else {
        return;
    };
    let (twice, changes) = normalize(&once, &options).expect("normalized output parses");
    assert_eq!(twice, once);
    assert!(changes.is_empty(), "second run changed {:?}", changes.entries());
});
