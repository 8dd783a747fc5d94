//! Payload extraction from `data:`-tagged event lines.

/// Tag marking a line that carries a payload.
pub const DATA_TAG: &str = "data:";

/// How an accepted payload is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSemantics {
    /// Payload is passed through verbatim, the empty string included.
    RawChunk,
    /// An empty payload stands for a line break and is emitted as `"\n"`.
    NewlinePreserving,
}

#[derive(Debug, Clone, Copy)]
pub struct EventExtractor {
    semantics: PayloadSemantics,
}

impl EventExtractor {
    pub fn new(semantics: PayloadSemantics) -> Self {
        Self { semantics }
    }

    /// Returns the payload of a tagged line, or `None` for any other line.
    ///
    /// The line is trimmed before the tag is checked, so the payload never
    /// carries surrounding whitespace of the line itself (a space right
    /// after the tag is kept).
    pub fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        let payload = line.trim().strip_prefix(DATA_TAG)?;

        match self.semantics {
            PayloadSemantics::RawChunk => Some(payload),
            PayloadSemantics::NewlinePreserving if payload.is_empty() => Some("\n"),
            PayloadSemantics::NewlinePreserving => Some(payload),
        }
    }
}
