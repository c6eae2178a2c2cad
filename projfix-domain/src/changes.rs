use tracing::debug;

/// Ordered record of every edit made during one run, formatted `"<LocalName>: <description>"`.
///
/// The log is threaded through each operation by `&mut` and only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLog {
    entries: Vec<String>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, local_name: &str, description: impl std::fmt::Display) {
        let entry = format!("{local_name}: {description}");
        debug!(change = %entry, "recorded change");
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}
