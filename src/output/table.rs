use unicode_width::UnicodeWidthStr;

use crate::model::Transcript;

/// Default indentation per reply level in the threaded view.
pub const DEFAULT_INDENT_WIDTH: usize = 4;

/// Cut a string down to `max_width` terminal columns, appending "..." when
/// anything was dropped.
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 3 > max_width {
            out.push_str("...");
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

/// Print the transcript as an indented thread. Each line carries its index,
/// which is what the edit commands take.
pub fn print_thread(t: &Transcript, indent_width: usize) {
    if t.is_empty() {
        println!("(no comments — the chat block is empty)");
        return;
    }

    for (i, comment) in t.comments().iter().enumerate() {
        let indent = " ".repeat(comment.reply_level as usize * indent_width);
        let label = t.speaker_label(&comment.author);
        let content = comment.content.replace('\n', " ");
        println!("  [{i}] {indent}{label}: {content}");
    }
}

/// Print the speaker table: id, display name, comment count.
pub fn print_speakers(t: &Transcript) {
    if t.speakers().is_empty() {
        println!("No speakers.");
        return;
    }

    println!("  {:<4} {:<24} {:<8}", "ID", "NAME", "COMMENTS");
    println!("  {}", "-".repeat(38));

    for speaker in t.speakers() {
        let name = if speaker.name.is_empty() {
            "(unnamed)".to_string()
        } else {
            truncate(&speaker.name, 22)
        };
        let count = t
            .comments()
            .iter()
            .filter(|c| c.author == speaker.id)
            .count();
        println!("  {:<4} {:<24} {:<8}", speaker.id, name, count);
    }
}

/// Print transcript statistics for `chatlog stats`.
pub fn print_stats(t: &Transcript) {
    let replies = t.comments().iter().filter(|c| c.reply_level > 0).count();
    let max_depth = t.comments().iter().map(|c| c.reply_level).max().unwrap_or(0);
    let next_id = t
        .next_available_speaker_id()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "(exhausted)".to_string());

    println!("Transcript statistics:");
    println!("  Comments:     {}", t.comments().len());
    println!("  Top-level:    {}", t.comments().len() - replies);
    println!("  Replies:      {replies}");
    println!("  Max depth:    {max_depth}");
    println!("  Speakers:     {}", t.speakers().len());
    println!("  Next free id: {next_id}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings_intact() {
        assert_eq!(truncate("short", 22), "short");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        let cut = truncate("a rather long speaker display name", 10);
        assert!(cut.ends_with("..."));
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 10);
    }

    #[test]
    fn truncate_respects_wide_characters() {
        let cut = truncate("チャットログのテスト", 8);
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 8);
    }
}
