/// Schema of the search projection.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// Tags and cross-references are stored as JSON list text. `search_text`
/// holds the lowercased title, category and tags for case-insensitive
/// matching beyond ASCII.
pub const INITIAL_SCHEMA: &str = r#"
-- One row per indexed card
CREATE TABLE IF NOT EXISTS cards (
    card_id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    cross_references TEXT NOT NULL DEFAULT '[]',
    file_path TEXT NOT NULL DEFAULT '',
    content_preview TEXT NOT NULL DEFAULT '',
    search_text TEXT NOT NULL DEFAULT ''
);

-- Category filters in searches
CREATE INDEX IF NOT EXISTS idx_cards_category ON cards(category);
"#;
