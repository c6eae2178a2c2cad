//! Pure selectors and predicates over element-like nodes.
//!
//! Name matching is namespace-agnostic everywhere: `msb:ItemGroup` and `ItemGroup` are the
//! same element as far as these helpers are concerned.

use crate::document::Attribute;

/// Capabilities the query helpers need from a tree node.
pub trait ElementLike: Sized {
    /// Name without any namespace prefix.
    fn local_name(&self) -> &str;

    /// Attributes in document order.
    fn attributes(&self) -> &[Attribute];

    /// Immediate child elements in document order.
    fn child_elements(&self) -> impl Iterator<Item = Self>;

    /// Concatenated, unescaped text of all descendants.
    fn text(&self) -> String;
}

/// Strip a namespace prefix (`x:Name` -> `Name`).
pub fn local_name_of(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Case-sensitive suffix check against several candidates.
pub fn ends_with_any_of(subject: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| subject.ends_with(suffix))
}

/// Immediate children whose local name is `name`, in document order.
///
/// The iterator is a view; call again to walk the children a second time.
pub fn elements_by_local_name<'e, E: ElementLike + 'e>(
    element: &'e E,
    name: &'e str,
) -> impl Iterator<Item = E> + 'e {
    element
        .child_elements()
        .filter(move |child| child.local_name() == name)
}

/// No meaningful text and no child elements.
pub fn has_no_content<E: ElementLike>(element: &E) -> bool {
    element.text().trim().is_empty() && element.child_elements().next().is_none()
}

/// Value of the first attribute (document order) whose value ends with `extension`.
pub fn attribute_value_with_extension<'e, E: ElementLike>(
    element: &'e E,
    extension: &str,
) -> Option<&'e str> {
    element
        .attributes()
        .iter()
        .find(|attr| attr.value.ends_with(extension))
        .map(|attr| attr.value.as_str())
}

/// Value of the attribute called `name`.
///
/// A blank value is reported as `None`, exactly like a missing attribute; duplicate and
/// emptiness checks downstream rely on that.
pub fn attribute_value_by_name<'e, E: ElementLike>(element: &'e E, name: &str) -> Option<&'e str> {
    element
        .attributes()
        .iter()
        .find(|attr| attr.name == name)
        .map(|attr| attr.value.as_str())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn doc(xml: &str) -> Document {
        Document::parse(xml).expect("parse")
    }

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name_of("msb:ItemGroup"), "ItemGroup");
        assert_eq!(local_name_of("ItemGroup"), "ItemGroup");
    }

    #[test]
    fn ends_with_any_of_is_case_sensitive() {
        assert!(ends_with_any_of("App.csproj", &[".vbproj", ".csproj"]));
        assert!(!ends_with_any_of("App.CSPROJ", &[".csproj"]));
        assert!(!ends_with_any_of("App.csproj", &[]));
    }

    #[test]
    fn elements_by_local_name_ignores_namespace_prefix() {
        let d = doc(r#"<p:Project xmlns:p="urn:x"><p:ItemGroup/><PropertyGroup/><ItemGroup/></p:Project>"#);
        let root = d.root_element();
        let found: Vec<_> = elements_by_local_name(&root, "ItemGroup")
            .map(|e| e.name())
            .collect();
        assert_eq!(found, vec!["p:ItemGroup", "ItemGroup"]);
        // Restartable.
        assert_eq!(elements_by_local_name(&root, "ItemGroup").count(), 2);
    }

    #[test]
    fn has_no_content_treats_whitespace_as_empty() {
        let d = doc("<r><a>  \n </a><b>x</b><c><d/></c><e/></r>");
        let kids: Vec<_> = d.root_element().child_elements().collect();
        assert!(has_no_content(&kids[0]));
        assert!(!has_no_content(&kids[1]));
        assert!(!has_no_content(&kids[2]));
        assert!(has_no_content(&kids[3]));
    }

    #[test]
    fn attribute_value_by_name_treats_blank_as_absent() {
        let d = doc(r#"<r><a Include="  " Remove="x.resx"/><b/></r>"#);
        let kids: Vec<_> = d.root_element().child_elements().collect();
        assert_eq!(attribute_value_by_name(&kids[0], "Include"), None);
        assert_eq!(attribute_value_by_name(&kids[0], "Remove"), Some("x.resx"));
        assert_eq!(attribute_value_by_name(&kids[1], "Include"), None);
    }

    #[test]
    fn attribute_value_with_extension_returns_first_match() {
        let d = doc(r#"<r><a Include="Strings.resx" Link="Other.resx"/><b Include="a.cs"/></r>"#);
        let kids: Vec<_> = d.root_element().child_elements().collect();
        assert_eq!(
            attribute_value_with_extension(&kids[0], ".resx"),
            Some("Strings.resx")
        );
        assert_eq!(attribute_value_with_extension(&kids[1], ".resx"), None);
    }
}
