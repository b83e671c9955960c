use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use chatlog::config::{self, ChatlogConfig};
use chatlog::document;
use chatlog::model::{Comment, CommentPatch, Transcript};
use chatlog::output::{json as json_out, table};
use chatlog::parse;

#[derive(Parser)]
#[command(name = "chatlog", version, about = "Chat log notation — parse, edit, and regenerate ```chat blockquote transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to config file (default: ~/.chatlog/config.toml)
    #[arg(long, global = true, env = "CHATLOG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the threaded conversation from the first chat block
    Show {
        /// Markdown file to read
        file: Option<PathBuf>,

        /// Read the document from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// List the speakers of the first chat block
    Speakers {
        /// Markdown file to read
        file: PathBuf,
    },

    /// Show transcript statistics
    Stats {
        /// Markdown file to read
        file: PathBuf,
    },

    /// Regenerate the chat block in canonical form
    Fmt {
        /// Markdown file to format
        file: Option<PathBuf>,

        /// Read the document from stdin
        #[arg(long)]
        stdin: bool,

        /// Rewrite the file in place instead of printing
        #[arg(long)]
        write: bool,
    },

    /// Print just the regenerated fenced chat block
    Export {
        /// Markdown file to read
        file: Option<PathBuf>,

        /// Read the document from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// Append a top-level comment to the chat block
    Post {
        /// Markdown file to edit
        file: PathBuf,

        /// Author: an existing speaker id or display name
        #[arg(long)]
        speaker: Option<String>,

        /// Author: a new participant name (allocates the next free id)
        #[arg(long, conflicts_with = "speaker")]
        new_speaker: Option<String>,

        /// Message text
        #[arg(long)]
        message: String,

        /// Print the resulting document without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Reply to a comment (one level deeper, capped at depth 3)
    Reply {
        /// Markdown file to edit
        file: PathBuf,

        /// Index of the comment to reply to (see `chatlog show`)
        #[arg(long)]
        to: usize,

        /// Author: an existing speaker id or display name
        #[arg(long)]
        speaker: Option<String>,

        /// Author: a new participant name (allocates the next free id)
        #[arg(long, conflicts_with = "speaker")]
        new_speaker: Option<String>,

        /// Reply text
        #[arg(long)]
        message: String,

        /// Print the resulting document without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Edit a comment's text and/or author
    Edit {
        /// Markdown file to edit
        file: PathBuf,

        /// Index of the comment to edit
        #[arg(long)]
        at: usize,

        /// New message text
        #[arg(long)]
        message: Option<String>,

        /// New author: an existing speaker id or display name
        #[arg(long)]
        speaker: Option<String>,

        /// Print the resulting document without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a comment
    Delete {
        /// Markdown file to edit
        file: PathBuf,

        /// Index of the comment to delete
        #[arg(long)]
        at: usize,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Print the resulting document without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Allocate the next free speaker id for a new participant
    AddSpeaker {
        /// Markdown file the transcript lives in
        file: PathBuf,

        /// Display name for the new participant
        #[arg(long)]
        name: Option<String>,

        /// Only report the id that would be allocated, without allocating
        #[arg(long)]
        dry_run: bool,
    },

    /// Rename a speaker (changes every line they authored)
    RenameSpeaker {
        /// Markdown file to edit
        file: PathBuf,

        /// Speaker id (single letter, see `chatlog speakers`)
        id: String,

        /// New display name
        name: String,

        /// Print the resulting document without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a new markdown file containing an empty chat block
    Init {
        /// File to create
        file: PathBuf,

        /// Number of speaker ids to pre-allocate for posting (default from
        /// config, max 26)
        #[arg(long)]
        pool: Option<usize>,
    },

    /// Show the active configuration
    Config {
        /// Write a commented default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = ChatlogConfig::load(cli.config.as_deref())?;
    let json_output = cli.json || cfg.json_by_default();

    match cli.command {
        Commands::Show { file, stdin } => {
            let text = read_input(file.as_deref(), stdin)?;
            let t = parse::parse_document(&text);
            if json_output {
                json_out::print_json(&t)?;
            } else {
                table::print_thread(&t, cfg.indent_width());
            }
        }

        Commands::Speakers { file } => {
            let text = read_input(Some(&file), false)?;
            let t = parse::parse_document(&text);
            if json_output {
                json_out::print_json(&t.speakers())?;
            } else {
                table::print_speakers(&t);
            }
        }

        Commands::Stats { file } => {
            let text = read_input(Some(&file), false)?;
            let t = parse::parse_document(&text);
            if json_output {
                let replies = t.comments().iter().filter(|c| c.reply_level > 0).count();
                json_out::print_json(&serde_json::json!({
                    "comments": t.comments().len(),
                    "top_level": t.comments().len() - replies,
                    "replies": replies,
                    "max_depth": t.comments().iter().map(|c| c.reply_level).max().unwrap_or(0),
                    "speakers": t.speakers().len(),
                    "next_free_id": t.next_available_speaker_id().map(|c| c.to_string()),
                }))?;
            } else {
                table::print_stats(&t);
            }
        }

        Commands::Fmt { file, stdin, write } => {
            let text = read_input(file.as_deref(), stdin)?;
            let t = parse::parse_document(&text);
            let formatted = document::replace_first_block(&text, &t.generate_markdown())?;
            if write {
                let path = file.context("--write requires a file path, not --stdin")?;
                write_document(&path, &formatted, "Formatted")?;
            } else {
                print!("{formatted}");
            }
        }

        Commands::Export { file, stdin } => {
            let text = read_input(file.as_deref(), stdin)?;
            let t = parse::parse_document(&text);
            println!("{}", document::fenced(&t.generate_markdown()));
        }

        Commands::Post {
            file,
            speaker,
            new_speaker,
            message,
            dry_run,
        } => {
            let text = read_input(Some(&file), false)?;
            let mut t = load_for_edit(&text, &cfg);
            let author = resolve_author(&mut t, speaker.as_deref(), new_speaker.as_deref())?;
            t.add_comment(Comment::new(author, message));
            save_edit(&file, &text, &t, dry_run, "Posted comment")?;
        }

        Commands::Reply {
            file,
            to,
            speaker,
            new_speaker,
            message,
            dry_run,
        } => {
            let text = read_input(Some(&file), false)?;
            let mut t = load_for_edit(&text, &cfg);
            let author = resolve_author(&mut t, speaker.as_deref(), new_speaker.as_deref())?;
            let parent = t
                .comments()
                .get(to)
                .with_context(|| format!("No comment at index {to}"))?;
            let reply = Comment::reply_to(parent, author, message);
            // Convention: a reply sits immediately after its parent.
            t.insert_comment(to + 1, reply);
            save_edit(&file, &text, &t, dry_run, "Posted reply")?;
        }

        Commands::Edit {
            file,
            at,
            message,
            speaker,
            dry_run,
        } => {
            if message.is_none() && speaker.is_none() {
                bail!("Nothing to change. Provide --message and/or --speaker.");
            }
            let text = read_input(Some(&file), false)?;
            let mut t = load_for_edit(&text, &cfg);
            let author = speaker
                .as_deref()
                .map(|s| resolve_author(&mut t, Some(s), None))
                .transpose()?;
            let changed = t.update_comment(
                at,
                CommentPatch {
                    author,
                    content: message,
                },
            );
            if !changed {
                bail!("No comment at index {at}");
            }
            save_edit(&file, &text, &t, dry_run, "Edited comment")?;
        }

        Commands::Delete {
            file,
            at,
            force,
            dry_run,
        } => {
            let text = read_input(Some(&file), false)?;
            let mut t = load_for_edit(&text, &cfg);
            let target = t
                .comments()
                .get(at)
                .with_context(|| format!("No comment at index {at}"))?;

            if !force && !dry_run {
                let label = t.speaker_label(&target.author);
                eprint!("Delete message from {label}: \"{}\"? [y/N] ", target.content);
                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            t.delete_comment(at);
            save_edit(&file, &text, &t, dry_run, "Deleted comment")?;
        }

        Commands::AddSpeaker { file, name, dry_run } => {
            let text = read_input(Some(&file), false)?;
            let mut t = load_for_edit(&text, &cfg);
            if dry_run {
                let id = t
                    .next_available_speaker_id()
                    .context("No speaker ids left: A through Z are all taken")?;
                println!("Would allocate speaker id {id}");
                return Ok(());
            }
            let allocated = t
                .add_next_speaker(name.unwrap_or_default())
                .context("No speaker ids left: A through Z are all taken")?;
            let shown = if allocated.name.is_empty() {
                allocated.id.clone()
            } else {
                format!("{} ({})", allocated.id, allocated.name)
            };
            // The notation carries a speaker only through their comments, so
            // the allocation lands in the file with their first post.
            println!(
                "Allocated speaker {shown}. They enter the markdown with their first comment: `chatlog post {} --speaker {} --message ...`",
                file.display(),
                allocated.id,
            );
        }

        Commands::RenameSpeaker {
            file,
            id,
            name,
            dry_run,
        } => {
            let text = read_input(Some(&file), false)?;
            let mut t = load_for_edit(&text, &cfg);
            let index = t
                .speakers()
                .iter()
                .position(|s| s.id == id)
                .with_context(|| format!("Unknown speaker id: {id}"))?;
            t.update_speaker_name(index, name);
            save_edit(&file, &text, &t, dry_run, "Renamed speaker")?;
        }

        Commands::Init { file, pool } => {
            if file.exists() {
                bail!("File already exists: {}", file.display());
            }
            let t = Transcript::with_fixed_speakers(pool.unwrap_or_else(|| cfg.speaker_pool()));
            let content = format!("{}\n", document::fenced(&t.generate_markdown()));
            std::fs::write(&file, content)
                .with_context(|| format!("Failed to write: {}", file.display()))?;
            let ids = pool_summary(&t);
            if ids.is_empty() {
                println!("Created {} with an empty chat block", file.display());
            } else {
                println!(
                    "Created {} with an empty chat block (speaker ids {ids} ready to post)",
                    file.display()
                );
            }
        }

        Commands::Config { init } => {
            if init {
                let created = config::init_config()?;
                if created {
                    println!("Wrote {}", config::config_path()?.display());
                } else {
                    println!("Config already exists: {}", config::config_path()?.display());
                }
            } else {
                println!("Config file: {}", config::config_path()?.display());
                println!("{}", cfg.display());
            }
        }
    }

    Ok(())
}

/// Read the document from a file path or stdin.
fn read_input(file: Option<&Path>, stdin: bool) -> Result<String> {
    if stdin {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read from stdin")?;
        Ok(content)
    } else {
        let path = file.context("Provide a file path or --stdin")?;
        std::fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path.display()))
    }
}

/// Parse the document for editing. A completely fresh block (no comments, no
/// speakers) is seeded with the configured fixed speaker pool so the first
/// `post --speaker A` has ids to refer to.
fn load_for_edit(text: &str, cfg: &ChatlogConfig) -> Transcript {
    let t = parse::parse_document(text);
    if t.is_empty() && t.speakers().is_empty() {
        Transcript::with_fixed_speakers(cfg.speaker_pool())
    } else {
        t
    }
}

/// Resolve the author for post/reply/edit: `--new-speaker` allocates the next
/// free id, `--speaker` matches an existing id first and display name second.
fn resolve_author(
    t: &mut Transcript,
    speaker: Option<&str>,
    new_speaker: Option<&str>,
) -> Result<String> {
    if let Some(name) = new_speaker {
        let allocated = t
            .add_next_speaker(name)
            .context("No speaker ids left: A through Z are all taken")?;
        return Ok(allocated.id.clone());
    }

    let wanted = speaker.context("Provide --speaker <id|name> or --new-speaker <name>")?;
    t.speakers()
        .iter()
        .find(|s| s.id == wanted)
        .or_else(|| t.speakers().iter().find(|s| s.name == wanted))
        .map(|s| s.id.clone())
        .with_context(|| {
            format!(
                "Unknown speaker: {wanted}. Use --new-speaker <name>, or `chatlog add-speaker` to allocate an id first."
            )
        })
}

/// "A-E" style summary of a transcript's pre-allocated speaker ids.
fn pool_summary(t: &Transcript) -> String {
    match (t.speakers().first(), t.speakers().last()) {
        (Some(first), Some(last)) if first.id != last.id => format!("{}-{}", first.id, last.id),
        (Some(only), _) => only.id.clone(),
        _ => String::new(),
    }
}

/// Regenerate the chat block, splice it into the document, and write the file
/// (or print the result for --dry-run).
fn save_edit(path: &Path, original: &str, t: &Transcript, dry_run: bool, action: &str) -> Result<()> {
    let updated = document::replace_first_block(original, &t.generate_markdown())
        .with_context(|| format!("Cannot update {}. Run `chatlog init` to create a chat block.", path.display()))?;

    if dry_run {
        print!("{updated}");
        return Ok(());
    }

    write_document(path, &updated, action)
}

fn write_document(path: &Path, content: &str, action: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write: {}", path.display()))?;
    info!("{action}: updated {}", path.display());
    println!("{action}. Updated {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_for_edit_seeds_pool_for_fresh_block() {
        let cfg = ChatlogConfig::default();
        let t = load_for_edit("```chat\n```\n", &cfg);
        assert!(t.is_empty());
        assert_eq!(t.speakers().len(), cfg.speaker_pool());
    }

    #[test]
    fn load_for_edit_keeps_parsed_speakers() {
        let cfg = ChatlogConfig::default();
        let t = load_for_edit("```chat\n> Alice: hi\n```\n", &cfg);
        assert_eq!(t.speakers().len(), 1);
        assert_eq!(t.speakers()[0].name, "Alice");
    }

    #[test]
    fn resolve_author_matches_id_first_then_name() {
        let mut t = Transcript::new();
        t.add_next_speaker("Alice");
        t.add_next_speaker("Bob");
        assert_eq!(resolve_author(&mut t, Some("B"), None).unwrap(), "B");
        assert_eq!(resolve_author(&mut t, Some("Alice"), None).unwrap(), "A");
    }

    #[test]
    fn resolve_author_unknown_speaker_points_at_add_speaker() {
        let mut t = Transcript::new();
        t.add_next_speaker("Alice");
        let err = resolve_author(&mut t, Some("Zed"), None).unwrap_err();
        assert!(err.to_string().contains("add-speaker"));
    }

    #[test]
    fn resolve_author_new_speaker_allocates_next_id() {
        let mut t = Transcript::new();
        t.add_next_speaker("Alice");
        assert_eq!(resolve_author(&mut t, None, Some("Bob")).unwrap(), "B");
        assert_eq!(t.speakers().len(), 2);
        assert_eq!(t.speakers()[1].name, "Bob");
    }

    #[test]
    fn resolve_author_reports_exhaustion_cleanly() {
        let mut t = Transcript::with_fixed_speakers(26);
        let err = resolve_author(&mut t, None, Some("overflow")).unwrap_err();
        assert!(err.to_string().contains("A through Z"));
        assert_eq!(t.speakers().len(), 26, "failed allocation must not mutate");
    }

    #[test]
    fn pool_summary_formats_id_range() {
        assert_eq!(pool_summary(&Transcript::with_fixed_speakers(5)), "A-E");
        assert_eq!(pool_summary(&Transcript::with_fixed_speakers(1)), "A");
        assert_eq!(pool_summary(&Transcript::with_fixed_speakers(0)), "");
    }
}
