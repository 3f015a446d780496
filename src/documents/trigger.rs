//! Compiled reaction triggers.

use regex::{Regex, RegexBuilder};

/// A stored pattern together with its compiled form.
#[derive(Debug, Clone)]
pub struct Trigger {
    source: String,
    regex: Regex,
}

impl Trigger {
    /// Compile `source` as a case-insensitive, Unicode-aware, multi-line pattern.
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .unicode(true)
            .multi_line(true)
            .build()?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches at the very start of `text`.
    pub fn matches(&self, text: &str) -> bool {
        // Leftmost-first: if any match starts at 0, `find` returns it.
        self.regex.find(text).is_some_and(|m| m.start() == 0)
    }
}
