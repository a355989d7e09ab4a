//! Markdown rendering of card documents.
//!
//! A card document has a fixed layout: title heading, metadata block,
//! summary, further thoughts (a user section and a generated section), and
//! related cards.

use std::collections::BTreeSet;
use std::fmt::Write;

use time::format_description::well_known::Rfc3339;

use crate::connections::ZettelConnection;
use crate::error::Result;
use crate::models::Card;

/// File name used when a card is mirrored into a secondary folder.
pub const MIRROR_FILE_NAME: &str = "00_zettel.md";

/// The fixed recommendation placed in every generated section.
pub const RECOMMENDATION: &str = "Review this card regularly and split it into subtopics \
     when it grows, to keep the collection easy to navigate.";

const USER_PROMPT: &str = "(Add your own thoughts, hints or questions here.)";
const USER_HASHTAGS: &str = "#review #structure #future";
const NO_CONNECTIONS: &str = "(No direct connections found.)";
const SUMMARY_HEADING: &str = "## Summary";
const FALLBACK_HASHTAG: &str = "#organization";
const GENERATED_HASHTAGS: usize = 3;

/// Turns a tag into a hashtag: `"deep learning"` becomes `#deep_learning`.
pub fn hashtag(tag: &str) -> String {
    format!("#{}", tag.trim().replace(' ', "_"))
}

/// Hashtags for the generated section: the card's tags plus its category,
/// at most three, or `#organization` when there are none.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use zettel::document::derive_hashtags;
///
/// let tags: BTreeSet<String> = ["rivers".to_string()].into();
/// assert_eq!(derive_hashtags(&tags, "main"), vec!["#rivers", "#main"]);
/// assert_eq!(derive_hashtags(&BTreeSet::new(), ""), vec!["#organization"]);
/// ```
pub fn derive_hashtags(tags: &BTreeSet<String>, category: &str) -> Vec<String> {
    let mut hashtags: Vec<String> = tags
        .iter()
        .filter(|tag| !tag.trim().is_empty())
        .map(|tag| hashtag(tag))
        .collect();

    if !category.is_empty() {
        let category_tag = format!("#{category}");
        if !hashtags.contains(&category_tag) {
            hashtags.push(category_tag);
        }
    }

    hashtags.truncate(GENERATED_HASHTAGS);
    if hashtags.is_empty() {
        hashtags.push(FALLBACK_HASHTAG.to_string());
    }
    hashtags
}

/// Renders the full markdown document for `card`.
pub fn render(card: &Card, connections: &[ZettelConnection]) -> Result<String> {
    let created = card.created.format(&Rfc3339)?;
    let modified = card.modified.format(&Rfc3339)?;

    let mut doc = String::new();
    // Writing into a String cannot fail.
    let _ = write_document(&mut doc, card, &created, &modified, connections);
    Ok(doc)
}

/// The card content inside a rendered document: the text between the
/// summary heading and the next section rule.
///
/// Text without a summary heading is returned whole, trimmed.
///
/// # Examples
///
/// ```
/// use zettel::document::summary_section;
///
/// let doc = "# Rivers\n\n---\n\n## Summary\nSediment transport\n\n---\n\n## Related Cards\n";
/// assert_eq!(summary_section(doc), "Sediment transport");
/// assert_eq!(summary_section("  plain notes\n"), "plain notes");
/// ```
pub fn summary_section(text: &str) -> &str {
    let Some(start) = text.find(SUMMARY_HEADING) else {
        return text.trim();
    };
    let body = &text[start + SUMMARY_HEADING.len()..];
    body.split_once("\n---")
        .map_or(body, |(summary, _)| summary)
        .trim()
}

fn write_document(
    doc: &mut String,
    card: &Card,
    created: &str,
    modified: &str,
    connections: &[ZettelConnection],
) -> std::fmt::Result {
    writeln!(doc, "# {}\n", card.title)?;
    writeln!(doc, "**Card:** {}  ", card.id)?;
    writeln!(doc, "**Category:** {}  ", card.category)?;
    writeln!(doc, "**Created:** {created}  ")?;
    writeln!(doc, "**Modified:** {modified}  \n")?;
    writeln!(doc, "---\n")?;

    writeln!(doc, "{SUMMARY_HEADING}")?;
    writeln!(doc, "{}\n", card.content.trim())?;
    writeln!(doc, "---\n")?;

    writeln!(doc, "## Further Thoughts\n")?;
    writeln!(doc, "### User")?;
    writeln!(doc, "- {USER_HASHTAGS}")?;
    writeln!(doc, "- {USER_PROMPT}\n")?;
    writeln!(doc, "### Generated")?;
    writeln!(doc, "- {}", derive_hashtags(&card.tags, &card.category).join(" "))?;
    writeln!(doc, "- {RECOMMENDATION}\n")?;
    writeln!(doc, "---\n")?;

    writeln!(doc, "## Related Cards\n")?;
    if connections.is_empty() {
        writeln!(doc, "- {NO_CONNECTIONS}")?;
    } else {
        for connection in connections {
            writeln!(
                doc,
                "- **#{}**: {} - {}",
                connection.id, connection.hashtags, connection.description
            )?;
        }
    }
    writeln!(doc, "\n---")
}
