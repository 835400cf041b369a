//! Blocking classification for CI jobs.
//!
//! A job is blocking unless its name contains one of a set of non-blocking
//! substrings. Matching is case-insensitive and substring-based so that
//! suffixed variants (`coverage (ubuntu)`, `notify-slack / post`) still match.

/// Job-name fragments that never gate a merge.
pub const DEFAULT_NON_BLOCKING: &[&str] = &[
    "notify", "slack", "coverage", "codecov", "report", "dequeue",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingClassifier {
    patterns: Vec<String>,
}

impl Default for BlockingClassifier {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl BlockingClassifier {
    /// Builds a classifier from the defaults plus `extra` caller patterns.
    /// Blank patterns are ignored; they would otherwise match every job.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = DEFAULT_NON_BLOCKING
            .iter()
            .map(|p| (*p).to_owned())
            .collect();
        for p in extra {
            let p = p.as_ref().trim().to_lowercase();
            if !p.is_empty() && !patterns.contains(&p) {
                patterns.push(p);
            }
        }
        Self { patterns }
    }

    pub fn is_blocking(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        !self.patterns.iter().any(|p| name.contains(p.as_str()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
