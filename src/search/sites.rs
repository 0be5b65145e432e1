use std::collections::BTreeSet;

/// Include/exclude domain lists pushed into every request
///
/// Include order is significant: it fixes both the round-robin order of per-site
/// pagination and the order of the `(site:a OR site:b)` clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteFilterSet {
    include: Vec<String>,
    exclude: BTreeSet<String>,
}

impl SiteFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include domain; repeats keep their first position.
    pub fn include(&mut self, domain: impl Into<String>) {
        let domain = normalize(domain.into());
        if !domain.is_empty() && !self.include.contains(&domain) {
            self.include.push(domain);
        }
    }

    pub fn exclude(&mut self, domain: impl Into<String>) {
        let domain = normalize(domain.into());
        if !domain.is_empty() {
            self.exclude.insert(domain);
        }
    }

    pub fn includes(&self) -> &[String] {
        &self.include
    }

    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

fn normalize(domain: String) -> String {
    domain.trim().to_ascii_lowercase()
}
