//! chatlog — parse, edit, and regenerate ```chat blockquote transcripts
//! embedded in markdown documents.
//!
//! The notation encodes a threaded conversation as blockquote lines inside a
//! fenced block: one `>` per line is a top-level message, each additional `>`
//! nests one reply level deeper, and `Name: text` carries the speaker and
//! message. The [`parse`] module turns a document into a [`model::Transcript`],
//! the transcript supports structural edits and regenerates the block body,
//! and [`document`] splices the regenerated body back into the host document.

pub mod config;
pub mod document;
pub mod model;
pub mod output;
pub mod parse;
