//! Property-based tests for the normalizer.
//!
//! These tests verify that:
//! - A second run over normalized output changes nothing (idempotence)
//! - Deduplication keeps exactly the first declaration per identity key
//! - Any edit to the text shows up in the change log
//! - Globbed declarations (`Compile`, `.resx` resources) never survive
//! - Sorted containers are ordered by `Include`, missing values first

use projfix_domain::{ChangeLog, NormalizeOptions, SdkNormalizer};
use projfix_xml::query::{attribute_value_by_name, elements_by_local_name};
use projfix_xml::{Document, ElementLike, NodeId};
use proptest::prelude::*;
use std::collections::HashSet;

const KINDS: &[&str] = &["Compile", "Content", "EmbeddedResource", "None", "Reference", "Folder"];

const VALUES: &[&str] = &[
    "A.cs",
    "a.cs",
    "B.resx",
    "Strings.resx",
    "Docs\\readme.txt",
    "Docs/readme.txt",
    "logo.png",
];

fn arb_item() -> impl Strategy<Value = String> {
    (
        prop::sample::select(KINDS.to_vec()),
        prop::sample::select(VALUES.to_vec()),
        any::<bool>(),
        0..4u8,
    )
        .prop_map(|(kind, value, use_remove, body)| {
            let attr = if kind == "None" && use_remove {
                "Remove"
            } else {
                "Include"
            };
            match body {
                0 => format!("    <{kind} {attr}=\"{value}\" />\n"),
                1 => format!("    <{kind} {attr}=\"{value}\"></{kind}>\n"),
                2 => format!("    <{kind} {attr}=\"{value}\">\n    </{kind}>\n"),
                _ => format!(
                    "    <{kind} {attr}=\"{value}\">\n      <Link>{value}</Link>\n    </{kind}>\n"
                ),
            }
        })
}

fn arb_project() -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        prop::collection::vec(prop::collection::vec(arb_item(), 0..5), 0..4),
        any::<bool>(),
    )
        .prop_map(|(leading_properties, groups, trailing_properties)| {
            let mut out = String::from("<Project ToolsVersion=\"15.0\">\n");
            if leading_properties {
                out.push_str(concat!(
                    "  <PropertyGroup>\n",
                    "    <RootNamespace>Demo</RootNamespace>\n",
                    "    <AssemblyName>Demo</AssemblyName>\n",
                    "  </PropertyGroup>\n",
                ));
            }
            for items in groups {
                out.push_str("  <ItemGroup>\n");
                for item in items {
                    out.push_str(&item);
                }
                out.push_str("  </ItemGroup>\n");
            }
            if trailing_properties {
                out.push_str(concat!(
                    "  <PropertyGroup Condition=\"'$(Configuration)' == 'Debug'\">\n",
                    "    <DebugType>full</DebugType>\n",
                    "  </PropertyGroup>\n",
                ));
            }
            out.push_str("  <Import Project=\"x.targets\" />\n</Project>\n");
            out
        })
}

fn arb_options() -> impl Strategy<Value = NormalizeOptions> {
    (any::<bool>(), any::<bool>()).prop_map(|(sort, delete_duplicates)| NormalizeOptions {
        sort,
        delete_duplicates,
    })
}

fn normalize(text: &str, options: NormalizeOptions) -> (String, ChangeLog) {
    let mut engine = SdkNormalizer::parse(text).unwrap();
    let mut changes = ChangeLog::new();
    engine.run(&options, &mut changes).unwrap();
    (engine.document().to_xml_string(), changes)
}

fn include_of(doc: &Document, id: NodeId) -> Option<String> {
    let el = doc.element(id)?;
    attribute_value_by_name(&el, "Include").map(str::to_string)
}

proptest! {
    #[test]
    fn second_run_changes_nothing(text in arb_project(), options in arb_options()) {
        let (once, _) = normalize(&text, options);
        let (twice, changes) = normalize(&once, options);
        prop_assert_eq!(&twice, &once);
        prop_assert!(changes.is_empty(), "second run logged {:?}", changes.entries());
    }

    #[test]
    fn dedupe_keeps_first_per_key(text in arb_project()) {
        let mut engine = SdkNormalizer::parse(&text).unwrap();
        let mut changes = ChangeLog::new();
        let entities = engine.collect_and_normalize(&mut changes).unwrap();

        for mut entity in entities {
            let attr = if entity.local_name == "None" { "Remove" } else { "Include" };
            let key_of = |id: NodeId| {
                let el = engine.document().element(id)?;
                attribute_value_by_name(&el, attr).map(str::to_string)
            };

            let mut seen = HashSet::new();
            let expected: Vec<_> = entity
                .elements
                .iter()
                .copied()
                .filter(|&id| key_of(id).is_none_or(|key| seen.insert(key)))
                .collect();

            engine.delete_duplicates(&mut entity, &mut changes).unwrap();
            prop_assert_eq!(&entity.elements, &expected);
        }
    }

    #[test]
    fn output_differs_implies_changes_logged(text in arb_project(), options in arb_options()) {
        let (out, changes) = normalize(&text, options);
        if out != text {
            prop_assert!(!changes.is_empty(), "silent rewrite:\n{}\n=>\n{}", text, out);
        }
    }

    #[test]
    fn globbed_declarations_are_dropped(text in arb_project()) {
        let mut engine = SdkNormalizer::parse(&text).unwrap();
        let mut changes = ChangeLog::new();
        let entities = engine.collect_and_normalize(&mut changes).unwrap();

        for mut entity in entities {
            engine.delete_references_to_non_existent_files(&mut entity, &mut changes);
            if entity.local_name == "Compile" {
                prop_assert!(entity.is_empty());
            }
            if entity.local_name == "EmbeddedResource" {
                for &id in &entity.elements {
                    let el = engine.document().element(id).unwrap();
                    prop_assert!(el.attributes().iter().all(|a| !a.value.ends_with(".resx")));
                }
            }
        }
    }

    #[test]
    fn sorted_containers_are_ordered_by_include(text in arb_project()) {
        let options = NormalizeOptions { sort: true, delete_duplicates: false };
        let (out, _) = normalize(&text, options);
        let doc = Document::parse(&out).unwrap();
        let root = doc.root_element();
        for group in elements_by_local_name(&root, "ItemGroup") {
            let includes: Vec<Option<String>> = group
                .child_elements()
                .map(|el| include_of(&doc, el.id()))
                .collect();
            prop_assert!(includes.windows(2).all(|w| w[0] <= w[1]), "unsorted: {:?}", includes);
        }
    }

    #[test]
    fn item_groups_are_never_empty(text in arb_project(), options in arb_options()) {
        let (out, _) = normalize(&text, options);
        let doc = Document::parse(&out).unwrap();
        let root = doc.root_element();
        for group in elements_by_local_name(&root, "ItemGroup") {
            prop_assert!(group.child_elements().next().is_some());
        }
    }
}
