use super::*;
use std::collections::BTreeSet;
use tempfile::{TempDir, tempdir};

fn summary(dir: &TempDir, id: &str, title: &str, tags: &[&str], body: Option<&str>) -> CardSummary {
    let file_path = dir.path().join(format!("{id}.md"));
    if let Some(body) = body {
        fs::write(&file_path, body).unwrap();
    }
    CardSummary {
        file_path,
        title: title.to_string(),
        category: "main".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

fn sample_index(dir: &TempDir) -> CardIndex {
    let mut index = CardIndex::new();
    index.insert(
        CardId::new("1"),
        summary(dir, "1", "Rivers and deltas", &["geography"], Some("# Rivers\n\nbody\n")),
    );
    index.insert(
        CardId::new("2"),
        summary(dir, "2", "Lakes", &["water_cycle"], Some("# Lakes\n")),
    );
    index
}

#[test]
fn rebuild_then_search_finds_title_substring() {
    let dir = tempdir().unwrap();
    let index = sample_index(&dir);
    let mut search = SearchIndex::in_memory().unwrap();

    assert_eq!(search.full_rebuild(&index).unwrap(), 2);

    let hits = search.search("DELTA").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].card_id, CardId::new("1"));
    assert_eq!(hits[0].tags, BTreeSet::from(["geography".to_string()]));
}

#[test]
fn search_matches_category_and_tags() {
    let dir = tempdir().unwrap();
    let index = sample_index(&dir);
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    assert_eq!(search.search("main").unwrap().len(), 2);
    assert_eq!(search.search("geography").unwrap().len(), 1);
}

#[test]
fn search_folds_case_beyond_ascii() {
    let dir = tempdir().unwrap();
    let mut index = CardIndex::new();
    index.insert(
        CardId::new("1"),
        summary(&dir, "1", "Über Flüsse", &["ÄSTUAR"], Some("# Über Flüsse\n")),
    );
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    assert_eq!(search.search("über").unwrap().len(), 1);
    assert_eq!(search.search("FLÜSSE").unwrap().len(), 1);
    assert_eq!(search.search("ästuar").unwrap().len(), 1);
    // the stored title keeps its original case
    assert_eq!(search.search("über").unwrap()[0].title, "Über Flüsse");
}

#[test]
fn like_wildcards_match_literally() {
    let dir = tempdir().unwrap();
    let index = sample_index(&dir);
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    assert!(search.search("%").unwrap().is_empty());
    // `_` only matches the tag that really contains one
    let hits = search.search("r_c").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].card_id, CardId::new("2"));
}

#[test]
fn new_card_is_unsearchable_until_upserted() {
    let dir = tempdir().unwrap();
    let mut index = sample_index(&dir);
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    index.insert(
        CardId::new("3"),
        summary(&dir, "3", "Glaciers", &[], Some("# Glaciers\n")),
    );
    assert!(search.search("Glaciers").unwrap().is_empty());
    assert_eq!(search.state(&index).unwrap(), IndexState::PartiallyStale);
    assert_eq!(search.stale_ids(&index).unwrap(), vec![CardId::new("3")]);

    assert!(search.upsert_one(&index, &CardId::new("3")).unwrap());

    assert_eq!(search.search("Glaciers").unwrap().len(), 1);
    assert_eq!(search.state(&index).unwrap(), IndexState::Consistent);
}

#[test]
fn upsert_of_unindexed_id_is_a_no_op() {
    let dir = tempdir().unwrap();
    let index = sample_index(&dir);
    let search = SearchIndex::in_memory().unwrap();

    assert!(!search.upsert_one(&index, &CardId::new("99")).unwrap());
    assert!(search.is_empty().unwrap());
    assert_eq!(search.state(&index).unwrap(), IndexState::Empty);
}

#[test]
fn preview_keeps_first_ten_lines() {
    let dir = tempdir().unwrap();
    let body: String = (1..=15).map(|n| format!("line {n}\n")).collect();
    let mut index = CardIndex::new();
    index.insert(CardId::new("1"), summary(&dir, "1", "Long", &[], Some(&body)));
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    let row = search.get(&CardId::new("1")).unwrap().unwrap();
    assert!(row.content_preview.starts_with("line 1\n"));
    assert!(row.content_preview.ends_with("line 10\n"));
    assert!(!row.content_preview.contains("line 11"));
}

#[test]
fn preview_is_capped_in_characters() {
    let dir = tempdir().unwrap();
    let body = "é".repeat(800);
    let mut index = CardIndex::new();
    index.insert(CardId::new("1"), summary(&dir, "1", "Wide", &[], Some(&body)));
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    let row = search.get(&CardId::new("1")).unwrap().unwrap();
    assert_eq!(row.content_preview.chars().count(), PREVIEW_CHARS);
}

#[test]
fn missing_title_is_taken_from_document() {
    let dir = tempdir().unwrap();
    let mut index = CardIndex::new();
    index.insert(
        CardId::new("1"),
        summary(&dir, "1", "", &[], Some("\n\n  # Untitled card  \nbody\n")),
    );
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    let row = search.get(&CardId::new("1")).unwrap().unwrap();
    assert_eq!(row.title, "# Untitled card");
}

#[test]
fn missing_and_unreadable_documents() {
    let dir = tempdir().unwrap();
    let mut index = CardIndex::new();
    index.insert(CardId::new("1"), summary(&dir, "1", "Gone", &[], None));

    let binary = dir.path().join("2.md");
    fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();
    index.insert(
        CardId::new("2"),
        CardSummary {
            file_path: binary,
            title: "Binary".to_string(),
            ..Default::default()
        },
    );

    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    let gone = search.get(&CardId::new("1")).unwrap().unwrap();
    assert_eq!(gone.content_preview, "");
    let binary = search.get(&CardId::new("2")).unwrap().unwrap();
    assert_eq!(binary.content_preview, READ_ERROR_PREVIEW);
}

#[test]
fn rebuild_drops_rows_for_removed_entries() {
    let dir = tempdir().unwrap();
    let index = sample_index(&dir);
    let mut search = SearchIndex::in_memory().unwrap();
    search.full_rebuild(&index).unwrap();

    let mut smaller = CardIndex::new();
    smaller.insert(CardId::new("9"), summary(&dir, "9", "Only", &[], None));
    search.full_rebuild(&smaller).unwrap();

    assert_eq!(search.len().unwrap(), 1);
    assert!(search.get(&CardId::new("1")).unwrap().is_none());
}

#[test]
fn open_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("index.db");

    let search = SearchIndex::open(&path).unwrap();
    assert!(search.is_empty().unwrap());
    assert!(path.exists());
}
