use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::Posting;

/// The posting catalog: an ordered, read-only collection loaded once per
/// session. Catalog order is meaningful downstream (it is the final
/// tie-break for every sort).
pub struct Catalog {
    postings: Vec<Posting>,
}

impl Catalog {
    pub fn new(postings: Vec<Posting>) -> Self {
        Self { postings }
    }

    /// Load a catalog from a JSON file holding an array of postings.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        let postings: Vec<Posting> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;
        debug!(count = postings.len(), path = %path.display(), "loaded catalog");
        Ok(Self { postings })
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn get(&self, id: &str) -> Option<&Posting> {
        self.postings.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}
