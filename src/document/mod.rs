use thiserror::Error;
use tracing::debug;

use crate::parse::{FENCE_CLOSE, FENCE_OPEN};

/// Failures when locating a chat block inside a host document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("no ```chat block found in document")]
    NoChatBlock,
    #[error("```chat block opened on line {0} is never closed")]
    UnterminatedBlock(usize),
}

/// Line span of a chat block: `open` and `close` are zero-based indexes of
/// the fence lines themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub open: usize,
    pub close: usize,
}

/// First chat block resolved down to byte offsets: `body_start` is the byte
/// right after the open fence line, `close_start` is the first byte of the
/// close fence line. `crlf` reports the open fence line's terminator style.
struct RawBlock {
    open_line: usize,
    close_line: usize,
    body_start: usize,
    close_start: usize,
    crlf: bool,
}

fn locate_first_block(text: &str) -> Result<RawBlock, DocumentError> {
    let mut offset = 0;
    let mut open: Option<(usize, usize, bool)> = None;

    for (lineno, piece) in text.split_inclusive('\n').enumerate() {
        let trimmed = piece.trim();
        match open {
            None if trimmed == FENCE_OPEN => {
                open = Some((lineno, offset + piece.len(), piece.ends_with("\r\n")));
            }
            Some((open_line, body_start, crlf)) if trimmed == FENCE_CLOSE => {
                return Ok(RawBlock {
                    open_line,
                    close_line: lineno,
                    body_start,
                    close_start: offset,
                    crlf,
                });
            }
            _ => {}
        }
        offset += piece.len();
    }

    match open {
        // One-based in the error; that's what an editor shows.
        Some((line, _, _)) => Err(DocumentError::UnterminatedBlock(line + 1)),
        None => Err(DocumentError::NoChatBlock),
    }
}

/// Locate the first chat block in a document.
pub fn find_first_block(text: &str) -> Result<BlockSpan, DocumentError> {
    locate_first_block(text).map(|b| BlockSpan {
        open: b.open_line,
        close: b.close_line,
    })
}

/// Replace the body of the first chat block with `body`, splicing by byte
/// offset so every byte outside the block — line endings and a missing final
/// newline included — survives exactly. The regenerated body adopts the
/// block's own line-ending style. `body` is the fence-less block content as
/// produced by `Transcript::generate_markdown`.
pub fn replace_first_block(text: &str, body: &str) -> Result<String, DocumentError> {
    let block = locate_first_block(text)?;
    debug!(
        "replacing chat block at lines {}..={}",
        block.open_line, block.close_line
    );

    let mut out = String::with_capacity(text.len() + body.len() + 2);
    out.push_str(&text[..block.body_start]);
    if !body.is_empty() {
        if block.crlf {
            out.push_str(&body.replace('\n', "\r\n"));
            out.push_str("\r\n");
        } else {
            out.push_str(body);
            out.push('\n');
        }
    }
    out.push_str(&text[block.close_start..]);
    Ok(out)
}

/// Wrap a block body in the chat fence tokens — the export/clipboard form.
pub fn fenced(body: &str) -> String {
    if body.is_empty() {
        format!("{FENCE_OPEN}\n{FENCE_CLOSE}")
    } else {
        format!("{FENCE_OPEN}\n{body}\n{FENCE_CLOSE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Meeting notes\n\nintro text\n\n```chat\n> Alice: old line\n```\n\noutro text\n";

    #[test]
    fn finds_first_block_span() {
        let span = find_first_block(DOC).unwrap();
        assert_eq!(span, BlockSpan { open: 4, close: 6 });
    }

    #[test]
    fn missing_block_is_an_error() {
        assert_eq!(find_first_block("plain text\n"), Err(DocumentError::NoChatBlock));
    }

    #[test]
    fn unterminated_block_reports_opening_line() {
        let err = find_first_block("a\n```chat\n> Alice: x\n").unwrap_err();
        assert_eq!(err, DocumentError::UnterminatedBlock(2));
    }

    #[test]
    fn replace_preserves_surrounding_text() {
        let out = replace_first_block(DOC, "> Bob: new line\n\n>> Alice: reply").unwrap();
        assert!(out.starts_with("# Meeting notes\n\nintro text\n\n```chat\n"));
        assert!(out.contains("> Bob: new line\n\n>> Alice: reply\n```\n"));
        assert!(out.ends_with("\noutro text\n"));
        assert!(!out.contains("old line"));
    }

    #[test]
    fn replace_with_empty_body_leaves_empty_block() {
        let out = replace_first_block(DOC, "").unwrap();
        assert!(out.contains("```chat\n```\n"));
    }

    #[test]
    fn replace_touches_only_the_first_block() {
        let doc = "```chat\n> A: one\n```\n\n```chat\n> B: two\n```\n";
        let out = replace_first_block(doc, "> A: edited").unwrap();
        assert!(out.contains("> A: edited"));
        assert!(out.contains("> B: two"), "second block untouched");
        assert!(!out.contains("> A: one"));
    }

    #[test]
    fn crlf_document_keeps_its_line_endings() {
        let doc = "# Title\r\n\r\n```chat\r\n> Alice: hi\r\n```\r\ntrailer\r\n";
        let out = replace_first_block(doc, "> Alice: hi\n\n>> Bob: yo").unwrap();
        assert!(out.starts_with("# Title\r\n\r\n```chat\r\n"), "prose before the block is byte-identical");
        assert!(out.ends_with("```\r\ntrailer\r\n"), "prose after the block is byte-identical");
        assert!(out.contains("> Alice: hi\r\n\r\n>> Bob: yo\r\n```"), "body adopts the block's CRLF style");
    }

    #[test]
    fn missing_final_newline_is_preserved() {
        let doc = "```chat\n> A: x\n```";
        let out = replace_first_block(doc, "> A: y").unwrap();
        assert_eq!(out, "```chat\n> A: y\n```");
    }

    #[test]
    fn fenced_wraps_body() {
        assert_eq!(fenced("> Alice: hi"), "```chat\n> Alice: hi\n```");
        assert_eq!(fenced(""), "```chat\n```");
    }
}
