//! Refusal Detector
//!
//! Looks at the first piece of content a stream produces and decides whether
//! the model opened with a refusal. Only the very start counts: a preamble
//! that shows up later in the text is ordinary prose.

/// Preamble the detector knows about out of the box
pub const DEFAULT_REFUSAL_PREAMBLE: &str = "I'm sorry";

/// Outcome of looking at the leading content of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefusalVerdict<'a> {
    /// The content opens with this preamble
    Refused(&'a str),
    /// No preamble can match any more
    Clear,
    /// The content so far is a strict prefix of some preamble
    Undecided,
}

/// Prefix matcher over a list of refusal preambles
#[derive(Clone, Debug)]
pub struct RefusalDetector {
    preambles: Vec<String>,
}

impl Default for RefusalDetector {
    fn default() -> Self {
        Self::new(vec![DEFAULT_REFUSAL_PREAMBLE.to_string()])
    }
}

impl RefusalDetector {
    /// Detector for the given preambles
    ///
    /// Content is matched after its leading whitespace, so preambles are
    /// stored the same way. Entries that are blank are ignored.
    #[must_use]
    pub fn new(preambles: Vec<String>) -> Self {
        Self {
            preambles: preambles
                .into_iter()
                .map(|p| p.trim_start().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Detector that never fires
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            preambles: Vec::new(),
        }
    }

    /// Configured preambles
    #[must_use]
    pub fn preambles(&self) -> &[String] {
        &self.preambles
    }

    /// Return the preamble `content` opens with, if any
    ///
    /// Leading whitespace is ignored; the comparison is an exact,
    /// case-sensitive prefix match.
    #[must_use]
    pub fn matched(&self, content: &str) -> Option<&str> {
        let leading = content.trim_start();
        self.preambles
            .iter()
            .find(|preamble| leading.starts_with(preamble.as_str()))
            .map(String::as_str)
    }

    /// Whether `content` opens with a refusal
    #[must_use]
    pub fn check(&self, content: &str) -> bool {
        self.matched(content).is_some()
    }

    /// Judge leading content that may still grow
    ///
    /// A provider can split a preamble across deltas (`"I'm"`, `" sorry"`),
    /// so content that could still turn into a preamble is `Undecided`
    /// rather than `Clear`.
    #[must_use]
    pub fn verdict(&self, content: &str) -> RefusalVerdict<'_> {
        if let Some(preamble) = self.matched(content) {
            return RefusalVerdict::Refused(preamble);
        }
        let leading = content.trim_start();
        if self.preambles.iter().any(|p| p.starts_with(leading)) {
            RefusalVerdict::Undecided
        } else {
            RefusalVerdict::Clear
        }
    }
}
