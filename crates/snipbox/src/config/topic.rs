use serde::{Deserialize, Serialize};

use crate::snippet::SnippetId;

/// A topic page: prose plus runnable examples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    /// Human-readable title (e.g., "Closures")
    pub title: String,

    /// Prose shown above the examples
    #[serde(default)]
    pub summary: String,

    /// Examples in display order
    #[serde(default)]
    pub examples: Vec<Example>,
}

impl Topic {
    /// Find an example by its name or its slug
    pub fn example(&self, name: &str) -> Option<&Example> {
        let slug = slugify(name);
        self.examples
            .iter()
            .find(|example| example.name == name || example.slug() == slug)
    }
}

/// A runnable example; its code seeds a snippet when the example is shown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Default source text
    pub code: String,

    /// Whether running the code is meant to fail (the example demonstrates an error)
    #[serde(default)]
    pub expect_error: bool,
}

impl Example {
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// ID of the snippet seeded from this example
    pub fn snippet_id(&self, topic_id: &str) -> SnippetId {
        SnippetId::new(format!("{topic_id}/{}", self.slug()))
    }
}

/// Lowercase `name`, collapsing every run of non-alphanumeric characters into one `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
