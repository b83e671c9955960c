pub mod roster;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Constructed replies never nest deeper than this; keeps quote prefixes and
/// indentation bounded. The parser does not clamp — it reports whatever depth
/// the input actually has.
pub const MAX_REPLY_LEVEL: u32 = 3;

/// A transcript participant. The id is a single uppercase letter by
/// convention, unique within a transcript and immutable once assigned; the
/// display name is mutable and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    pub name: String,
}

/// One chat message. `author` references a Speaker id, it does not own the
/// speaker. `reply_level` — not list position — is authoritative for nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub reply_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Comment {
    /// New top-level comment (reply_level 0, no parent).
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Comment {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            content: content.into(),
            timestamp: Utc::now(),
            reply_level: 0,
            parent_id: None,
        }
    }

    /// New reply to `parent`, one level deeper, capped at MAX_REPLY_LEVEL.
    pub fn reply_to(parent: &Comment, author: impl Into<String>, content: impl Into<String>) -> Self {
        Comment {
            reply_level: (parent.reply_level + 1).min(MAX_REPLY_LEVEL),
            parent_id: Some(parent.id.clone()),
            ..Comment::new(author, content)
        }
    }

    /// Comment as produced by the parser: depth taken directly from the
    /// input's quote count, unclamped.
    pub fn parsed(author: impl Into<String>, content: impl Into<String>, reply_level: u32) -> Self {
        Comment {
            reply_level,
            ..Comment::new(author, content)
        }
    }
}

/// Partial update applied to a comment in place; None fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct CommentPatch {
    pub author: Option<String>,
    pub content: Option<String>,
}

/// The aggregate: an ordered comment sequence plus an ordered speaker
/// sequence, with structural edit operations and markdown regeneration.
///
/// All mutations are index-based and lenient — an out-of-range index is a
/// no-op reported through the return value, never a panic and never a
/// half-applied state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    comments: Vec<Comment>,
    speakers: Vec<Speaker>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    /// Assemble from parser output.
    pub fn from_parts(comments: Vec<Comment>, speakers: Vec<Speaker>) -> Self {
        Transcript { comments, speakers }
    }

    /// Fresh transcript with a fixed pool of pre-allocated, unnamed speakers.
    pub fn with_fixed_speakers(count: usize) -> Self {
        Transcript {
            comments: Vec::new(),
            speakers: roster::fixed_pool(count),
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Append a comment. Author existence is not validated; an unknown id
    /// simply renders as itself.
    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    /// Insert before `index`, clamped to `[0, len]`.
    pub fn insert_comment(&mut self, index: usize, comment: Comment) {
        let index = index.min(self.comments.len());
        self.comments.insert(index, comment);
    }

    /// Merge `patch` onto the comment at `index`. Returns false (untouched
    /// state) when the index is out of range.
    pub fn update_comment(&mut self, index: usize, patch: CommentPatch) -> bool {
        let Some(comment) = self.comments.get_mut(index) else {
            return false;
        };
        if let Some(author) = patch.author {
            comment.author = author;
        }
        if let Some(content) = patch.content {
            comment.content = content;
        }
        true
    }

    /// Remove and return the comment at `index`; None when out of range.
    pub fn delete_comment(&mut self, index: usize) -> Option<Comment> {
        if index < self.comments.len() {
            Some(self.comments.remove(index))
        } else {
            None
        }
    }

    /// Rename the speaker at position `index`. Returns false when out of
    /// range. Ids are never renamed.
    pub fn update_speaker_name(&mut self, index: usize, name: impl Into<String>) -> bool {
        let Some(speaker) = self.speakers.get_mut(index) else {
            return false;
        };
        speaker.name = name.into();
        true
    }

    pub fn speaker_by_id(&self, id: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == id)
    }

    /// Display label for a speaker id: the name when one is set, otherwise
    /// the id itself (so an unnamed speaker shows as "A", "B", ...).
    pub fn speaker_label<'a>(&'a self, id: &'a str) -> &'a str {
        match self.speaker_by_id(id) {
            Some(s) if !s.name.is_empty() => &s.name,
            _ => id,
        }
    }

    /// Id the next `add_next_speaker` call would assign, without mutating
    /// anything. None once the sequence is exhausted.
    pub fn next_available_speaker_id(&self) -> Option<char> {
        match self.speakers.last() {
            None => Some(roster::FIRST_ID),
            Some(s) => s.id.chars().next().and_then(roster::id_after),
        }
    }

    /// Allocate the next speaker id and append a speaker with the given name.
    /// Returns None — with the speaker list untouched — once ids run out.
    pub fn add_next_speaker(&mut self, name: impl Into<String>) -> Option<&Speaker> {
        let id = self.next_available_speaker_id()?;
        self.speakers.push(Speaker {
            id: id.to_string(),
            name: name.into(),
        });
        self.speakers.last()
    }

    /// Regenerate the chat-block body from current state: one line per
    /// comment, quote prefix one `>` longer than the reply level, blank line
    /// between comments, surrounding whitespace trimmed.
    ///
    /// Structural inverse of the parser: re-parsing the output reconstructs
    /// the same (label, content, reply_level) triples in the same order.
    pub fn generate_markdown(&self) -> String {
        let mut out = String::new();
        for comment in &self.comments {
            let label = self.speaker_label(&comment.author);
            let prefix = ">".repeat(comment.reply_level as usize + 1);
            out.push_str(&format!("{prefix} {label}: {}\n\n", comment.content));
        }
        out.trim().to_string()
    }
}
