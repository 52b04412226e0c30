//! Line-oriented document model.
//!
//! A document is a sequence of lines, each keeping its own terminator so the
//! text can be reassembled byte-for-byte. Lines that are ATX headings outside
//! fenced code blocks carry their rank (1 for `#`, 6 for `######`).

use std::sync::LazyLock;

use regex::Regex;

/// Matches an ATX heading opener: up to 3 spaces, 1-6 `#`, then space or end.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]|$)").expect("heading regex"));

/// Matches a code fence opener/closer (```` ``` ```` or `~~~`) and its info string.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})(.*)$").expect("fence regex"));

/// Rank of an ATX heading line (terminator already stripped), or `None`.
pub fn heading_rank(line: &str) -> Option<u8> {
    HEADING_RE
        .captures(line)
        .map(|caps| caps[1].len() as u8)
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn content_of(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

// ---------------------------------------------------------------------------
// Line / Document
// ---------------------------------------------------------------------------

/// One physical line of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    /// Raw text including the terminator, if any.
    pub raw: &'a str,
    /// Heading rank, `None` for body text and for anything inside a fence.
    pub rank: Option<u8>,
    /// Fence delimiter or fenced content.
    pub fenced: bool,
}

impl Line<'_> {
    pub fn is_terminated(&self) -> bool {
        self.raw.ends_with('\n')
    }

    pub fn content(&self) -> &str {
        content_of(self.raw)
    }
}

/// A parsed, immutable view over a text document.
#[derive(Debug, Clone)]
pub(crate) struct Document<'a> {
    lines: Vec<Line<'a>>,
    /// A fence was opened and never closed.
    unclosed_fence: bool,
}

impl<'a> Document<'a> {
    /// Split `text` into lines and classify headings.
    pub fn parse(text: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut open_fence: Option<&str> = None;

        for raw in text.split_inclusive('\n') {
            let content = content_of(raw);

            if let Some(caps) = FENCE_RE.captures(content) {
                let marker = caps.get(1).map_or("", |m| m.as_str());
                let info = caps.get(2).map_or("", |m| m.as_str());
                match open_fence {
                    None => open_fence = Some(marker),
                    // A closing fence carries no info string.
                    Some(open) if marker.starts_with(open) && info.trim().is_empty() => {
                        open_fence = None
                    }
                    Some(_) => {}
                }
                lines.push(Line {
                    raw,
                    rank: None,
                    fenced: true,
                });
                continue;
            }

            let fenced = open_fence.is_some();
            let rank = if fenced { None } else { heading_rank(content) };
            lines.push(Line { raw, rank, fenced });
        }

        Self {
            lines,
            unclosed_fence: open_fence.is_some(),
        }
    }

    pub fn lines(&self) -> &[Line<'a>] {
        &self.lines
    }

    /// Index of the first line outside a code fence whose content equals `marker`.
    pub fn find_marker(&self, marker: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| !line.fenced && line.content() == marker)
    }

    /// End (exclusive) of the section opened at `start`.
    ///
    /// The section stops at the next heading whose rank is equal to or
    /// higher than `rank` (any heading when `rank` is `None`), and never
    /// swallows an unterminated final line.
    pub fn section_end(&self, start: usize, rank: Option<u8>) -> usize {
        let limit = rank.unwrap_or(u8::MAX);

        let mut end = self.lines.len();
        if let Some(last) = self.lines.last() {
            if !last.is_terminated() {
                end -= 1;
            }
        }
        let end = end.max(start + 1);

        self.lines[start + 1..end]
            .iter()
            .position(|line| line.rank.is_some_and(|r| r <= limit))
            .map_or(end, |offset| start + 1 + offset)
    }

    pub fn has_unclosed_fence(&self) -> bool {
        self.unclosed_fence
    }

    /// Highest-ranked heading outside code fences (lowest number).
    pub fn top_rank(&self) -> Option<u8> {
        self.lines.iter().filter_map(|line| line.rank).min()
    }

    /// Concatenate the raw text of `lines[range]`.
    pub fn text(&self, range: std::ops::Range<usize>) -> String {
        self.lines[range].iter().map(|line| line.raw).collect()
    }
}
