use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::model::{roster, Comment, Speaker, Transcript};

/// Line that opens a chat block (after trimming).
pub const FENCE_OPEN: &str = "```chat";
/// Line that closes a chat block (after trimming).
pub const FENCE_CLOSE: &str = "```";

/// Parse a whole markdown document into a transcript.
///
/// Only the first non-empty ```chat block is used; later blocks are ignored.
/// A document with no chat block, or an empty one, yields an empty
/// transcript — never an error.
pub fn parse_document(markdown: &str) -> Transcript {
    match extract_chat_blocks(markdown).into_iter().next() {
        Some(block) => parse_block(&block),
        None => Transcript::new(),
    }
}

/// Extract every ```chat block body from a document, trimmed, in source
/// order. Empty blocks are dropped; an open fence with no matching close
/// fence yields no block.
pub fn extract_chat_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut in_block = false;
    let mut body = String::new();

    for line in markdown.lines() {
        let trimmed = line.trim();
        if !in_block && trimmed == FENCE_OPEN {
            in_block = true;
            body.clear();
        } else if in_block && trimmed == FENCE_CLOSE {
            in_block = false;
            let captured = body.trim();
            if !captured.is_empty() {
                blocks.push(captured.to_string());
            }
        } else if in_block {
            body.push_str(line);
            body.push('\n');
        }
    }

    blocks
}

/// Parse one chat-block body into a transcript.
///
/// Speakers are created lazily in first-seen order, ids assigned A, B, C, ...
/// Malformed lines are skipped, not errors.
pub fn parse_block(block: &str) -> Transcript {
    let quote_run = Regex::new(r"^>+").expect("quote-run pattern is valid");

    let mut comments: Vec<Comment> = Vec::new();
    let mut speakers: Vec<Speaker> = Vec::new();
    let mut ids_by_name: HashMap<String, String> = HashMap::new();
    let mut next_id = roster::FIRST_ID;

    for line in block.lines().filter(|l| !l.trim().is_empty()) {
        let Some(parsed) = parse_line(&quote_run, line) else {
            debug!("skipping non-chat line: {line:?}");
            continue;
        };

        let id = match ids_by_name.get(&parsed.speaker) {
            Some(id) => id.clone(),
            None => {
                let id = next_id.to_string();
                ids_by_name.insert(parsed.speaker.clone(), id.clone());
                speakers.push(Speaker {
                    id: id.clone(),
                    name: parsed.speaker.clone(),
                });
                next_id = roster::wrapping_id_after(next_id);
                id
            }
        };

        comments.push(Comment::parsed(id, parsed.content, parsed.reply_level));
    }

    Transcript::from_parts(comments, speakers)
}

struct ParsedLine {
    reply_level: u32,
    speaker: String,
    content: String,
}

/// Split one line into (quote depth, speaker name, content).
///
/// Grammar: contiguous `>` run, then `name: content` with the FIRST colon as
/// the delimiter — content may contain further colons. Returns None for any
/// line that doesn't fit (no quote run, no colon, empty name or content).
fn parse_line(quote_run: &Regex, line: &str) -> Option<ParsedLine> {
    let trimmed = line.trim();
    let quotes = quote_run.find(trimmed)?;

    let rest = trimmed[quotes.end()..].trim();
    let (name, content) = rest.split_once(':')?;
    let name = name.trim();
    let content = content.trim();
    if name.is_empty() || content.is_empty() {
        return None;
    }

    Some(ParsedLine {
        // One `>` is the baseline; each extra one is a level of nesting.
        reply_level: (quotes.end() as u32).saturating_sub(1),
        speaker: name.to_string(),
        content: content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "```chat\n\
        > Alice: Hello, how are you?\n\
        >> Bob: I'm good, thanks! How about you?\n\
        >>> Alice: Great, can you help me with something?\n\
        ```\n";

    #[test]
    fn parses_threaded_conversation() {
        let t = parse_document(SAMPLE);
        assert_eq!(t.comments().len(), 3);

        let levels: Vec<u32> = t.comments().iter().map(|c| c.reply_level).collect();
        assert_eq!(levels, [0, 1, 2]);

        assert_eq!(t.speakers().len(), 2);
        assert_eq!(t.speakers()[0], crate::model::Speaker { id: "A".into(), name: "Alice".into() });
        assert_eq!(t.speakers()[1], crate::model::Speaker { id: "B".into(), name: "Bob".into() });

        let authors: Vec<&str> = t.comments().iter().map(|c| c.author.as_str()).collect();
        assert_eq!(authors, ["A", "B", "A"]);
    }

    #[test]
    fn quote_depth_maps_to_reply_level_minus_one() {
        let t = parse_block("> A: one\n>>>> A: four deep");
        assert_eq!(t.comments()[0].reply_level, 0);
        // The parser does not clamp; depth 4 really is level 3.
        assert_eq!(t.comments()[1].reply_level, 3);
    }

    #[test]
    fn no_chat_block_yields_empty_transcript() {
        let t = parse_document("# Notes\n\nJust prose, no chat here.\n");
        assert!(t.is_empty());
        assert!(t.speakers().is_empty());
    }

    #[test]
    fn empty_block_yields_empty_transcript() {
        let t = parse_document("```chat\n\n```\n");
        assert!(t.is_empty());
    }

    #[test]
    fn only_first_nonempty_block_is_used() {
        let doc = "```chat\n```\n\n```chat\n> Alice: first real block\n```\n\n```chat\n> Bob: second\n```\n";
        let t = parse_document(doc);
        assert_eq!(t.comments().len(), 1);
        assert_eq!(t.comments()[0].content, "first real block");
    }

    #[test]
    fn unterminated_block_is_ignored() {
        let t = parse_document("```chat\n> Alice: dangling\n");
        assert!(t.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped_silently() {
        let block = "\
            not a chat line\n\
            > no colon here\n\
            > : empty name\n\
            > Alice :\n\
            > Alice: survives\n";
        let t = parse_block(block);
        assert_eq!(t.comments().len(), 1);
        assert_eq!(t.comments()[0].content, "survives");
    }

    #[test]
    fn only_first_colon_delimits() {
        let t = parse_block("> Alice: see https://example.com: it works");
        assert_eq!(t.comments()[0].content, "see https://example.com: it works");
        assert_eq!(t.speakers()[0].name, "Alice");
    }

    #[test]
    fn repeated_speaker_name_resolves_to_one_speaker() {
        let t = parse_block("> Alice: one\n> Bob: two\n> Alice: three");
        assert_eq!(t.speakers().len(), 2);
        assert_eq!(t.comments()[0].author, t.comments()[2].author);
    }

    #[test]
    fn whitespace_around_name_and_content_is_trimmed() {
        let t = parse_block(">>   Alice  :   padded content  ");
        let c = &t.comments()[0];
        assert_eq!(c.content, "padded content");
        assert_eq!(c.reply_level, 1);
        assert_eq!(t.speakers()[0].name, "Alice");
    }

    #[test]
    fn allocator_wraps_past_z_in_the_parser_path() {
        // 27 distinct names: the 27th gets 'A' again (known collision).
        let block: String = (0..27).map(|i| format!("> speaker{i}: msg\n")).collect();
        let t = parse_block(&block);
        assert_eq!(t.speakers().len(), 27);
        assert_eq!(t.speakers()[26].id, "A");
    }

    #[test]
    fn extract_returns_all_blocks_in_order() {
        let doc = "```chat\n> A: x\n```\ntext\n```chat\n> B: y\n```\n";
        let blocks = extract_chat_blocks(doc);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "> A: x");
        assert_eq!(blocks[1], "> B: y");
    }
}
