use std::collections::BTreeMap;
use std::path::Path;

use jrdb_fwf_to_csv::Layout;
use tracing::info;

use crate::error::LoaderError;

/// Fixed-width layouts keyed by file type, built once before a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutCatalog {
    layouts: BTreeMap<String, Layout>,
}

impl LayoutCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `<dir>/<type>.csv` for every known type. A missing or malformed
    /// table is an error: a run must not start with a partial catalog.
    pub fn load_dir(dir: &Path, known_types: &[&str]) -> Result<Self, LoaderError> {
        let mut catalog = Self::new();
        for file_type in known_types {
            let path = dir.join(format!("{file_type}.csv"));
            let layout = Layout::from_metadata_path(&path).map_err(|error| {
                LoaderError::Layout(format!(
                    "failed to load layout '{file_type}' from '{}': {error}",
                    path.display()
                ))
            })?;
            info!(file_type, columns = layout.len(), width = layout.total_width(), "layout loaded");
            catalog.insert(*file_type, layout);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, file_type: impl Into<String>, layout: Layout) {
        self.layouts.insert(file_type.into(), layout);
    }

    #[must_use]
    pub fn get(&self, file_type: &str) -> Option<&Layout> {
        self.layouts.get(file_type)
    }

    pub fn file_types(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Layout)> for LayoutCatalog {
    fn from_iter<I: IntoIterator<Item = (S, Layout)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (file_type, layout) in iter {
            catalog.insert(file_type, layout);
        }
        catalog
    }
}
