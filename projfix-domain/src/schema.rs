//! The fixed vocabulary of legacy project files that the normalizer understands.
//!
//! Everything else in the crate refers to these symbols instead of spelling names out.

/// Reserved element and attribute names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reserved {
    /// Item-declaration container.
    ItemGroup,
    /// Metadata container.
    PropertyGroup,
    /// Declaration kind used with `Remove` to negate a globbed file.
    ExcludeMarker,
    EmbeddedResource,
    Content,
    Compile,
    Include,
    Remove,
    Condition,
}

impl Reserved {
    pub const fn as_str(self) -> &'static str {
        match self {
            Reserved::ItemGroup => "ItemGroup",
            Reserved::PropertyGroup => "PropertyGroup",
            Reserved::ExcludeMarker => "None",
            Reserved::EmbeddedResource => "EmbeddedResource",
            Reserved::Content => "Content",
            Reserved::Compile => "Compile",
            Reserved::Include => "Include",
            Reserved::Remove => "Remove",
            Reserved::Condition => "Condition",
        }
    }

    /// Compare against a local (prefix-free) name.
    pub fn matches(self, local_name: &str) -> bool {
        self.as_str() == local_name
    }
}

impl std::fmt::Display for Reserved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource files picked up by the SDK's default `EmbeddedResource` glob.
pub const RESOURCE_EXTENSION: &str = ".resx";

/// Declaration kinds whose explicit includes turn into exclude markers. Only these two are
/// covered by the SDK's default globs in a way that needs an explicit `Remove`.
pub const GLOBBED_CONTENT_KINDS: [Reserved; 2] = [Reserved::EmbeddedResource, Reserved::Content];

/// File extensions of project files the tool accepts.
pub const PROJECT_EXTENSIONS: &[&str] = &[".csproj", ".vbproj", ".fsproj", ".proj"];
