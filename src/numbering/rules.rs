use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::models::Category;

/// Category returned by [`NumberingRules::categorize`] when no extension matches.
pub const UNKNOWN_FILE_CATEGORY: &str = "unknown";

/// A per-bucket counter in the numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    MainTopic,
    Frequent,
    Quote,
}

impl Counter {
    /// Resolves the `increment_field` name used in the rule source.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "last_main_topic" => Some(Self::MainTopic),
            "last_frequent" => Some(Self::Frequent),
            "last_quote" => Some(Self::Quote),
            _ => None,
        }
    }

    /// The bucket whose membership list records ids allocated for
    /// `category`. Only the built-in bucket categories are tracked.
    pub fn bucket_of(category: &str) -> Option<Self> {
        match category {
            Category::MAIN => Some(Self::MainTopic),
            Category::FREQUENT => Some(Self::Frequent),
            Category::QUOTE => Some(Self::Quote),
            _ => None,
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            Self::MainTopic => "last_main_topic",
            Self::Frequent => "last_frequent",
            Self::Quote => "last_quote",
        }
    }
}

/// How ids are produced for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberingRule {
    /// `prefix + counter`, bumping the named counter.
    FixedPrefixIncrement { prefix: String, counter: Counter },
    /// `parent + first unused letter`.
    SubtopicLetter { parent: String },
    /// No id can be produced; allocation yields the `unknown` sentinel.
    Unhandled,
}

#[derive(Debug, Default, Deserialize)]
struct RuleSource {
    #[serde(default)]
    zettel_numbering_rules: HashMap<String, RawRule>,
    #[serde(default)]
    file_categorization_rules: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    increment_field: Option<String>,
}

/// Numbering and file categorization rules, resolved once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingRules {
    rules: HashMap<String, NumberingRule>,
    file_categories: Vec<(String, Vec<String>)>,
}

impl Default for NumberingRules {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            file_categories: Vec::new(),
        }
    }
}

impl NumberingRules {
    /// Loads rules from the rule source at `path`.
    ///
    /// A missing or malformed source, or one without numbering rules, falls
    /// back to the built-in table (`main`, `frequent`, `quote`, `subtopic`).
    /// The problem is logged; loading itself never fails.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(e) => {
                log::warn!(
                    "Rule source {} unavailable: {e}; using built-in rules",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Parses rules from JSON text, with the same fallbacks as [`load`](Self::load).
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<RuleSource>(text) {
            Ok(source) => Self::from_source(source),
            Err(e) => {
                log::warn!("Malformed rule source: {e}; using built-in rules");
                Self::default()
            }
        }
    }

    fn from_source(source: RuleSource) -> Self {
        let rules = if source.zettel_numbering_rules.is_empty() {
            log::warn!("Rule source defines no numbering rules; using built-in rules");
            default_rules()
        } else {
            source
                .zettel_numbering_rules
                .into_iter()
                .map(|(category, raw)| {
                    let rule = resolve_raw(&category, raw);
                    (category, rule)
                })
                .collect()
        };

        let mut file_categories: Vec<(String, Vec<String>)> = source
            .file_categorization_rules
            .into_iter()
            .map(|(category, extensions)| {
                let extensions = extensions.iter().map(|e| normalize_extension(e)).collect();
                (category, extensions)
            })
            .collect();
        file_categories.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            rules,
            file_categories,
        }
    }

    /// Returns the rule that applies to `category`.
    ///
    /// Configured categories use their resolved rule. Otherwise the built-in
    /// bucket rules apply to `main`, `frequent` and `quote`, and any other
    /// category is treated as a subtopic of its parent part.
    pub fn rule_for(&self, category: &Category) -> NumberingRule {
        if let Some(rule) = self.rules.get(category.as_str()) {
            return rule.clone();
        }

        if let Some(rule) = builtin_bucket_rule(category.as_str()) {
            return rule;
        }

        subtopic_rule(category.parent())
    }

    /// Every `(prefix, counter)` pair a category can be numbered with,
    /// sorted and without duplicates.
    pub fn bucket_prefixes(&self) -> Vec<(String, Counter)> {
        let builtin = [Category::MAIN, Category::FREQUENT, Category::QUOTE]
            .into_iter()
            .filter(|name| !self.rules.contains_key(*name))
            .filter_map(builtin_bucket_rule);

        let mut prefixes: Vec<(String, Counter)> = self
            .rules
            .values()
            .cloned()
            .chain(builtin)
            .filter_map(|rule| match rule {
                NumberingRule::FixedPrefixIncrement { prefix, counter } => Some((prefix, counter)),
                _ => None,
            })
            .collect();
        prefixes.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.field().cmp(b.1.field())));
        prefixes.dedup();
        prefixes
    }

    /// Classifies a file by extension using the file categorization rules.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use zettel::numbering::NumberingRules;
    ///
    /// let rules = NumberingRules::from_json(r#"{
    ///     "zettel_numbering_rules": { "main": { "prefix": "", "increment_field": "last_main_topic" } },
    ///     "file_categorization_rules": { "documents": [".pdf", ".md"] }
    /// }"#);
    /// assert_eq!(rules.categorize(Path::new("notes/Report.PDF")), "documents");
    /// assert_eq!(rules.categorize(Path::new("song.mp3")), "unknown");
    /// ```
    pub fn categorize(&self, path: &Path) -> &str {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return UNKNOWN_FILE_CATEGORY;
        };
        let extension = normalize_extension(extension);

        self.file_categories
            .iter()
            .find(|(_, extensions)| extensions.contains(&extension))
            .map_or(UNKNOWN_FILE_CATEGORY, |(category, _)| category.as_str())
    }
}

fn resolve_raw(category: &str, raw: RawRule) -> NumberingRule {
    if category == Category::SUBTOPIC {
        return NumberingRule::SubtopicLetter {
            parent: "1".to_string(),
        };
    }

    let Some(field) = raw.increment_field else {
        return NumberingRule::Unhandled;
    };

    match Counter::from_field(&field) {
        Some(counter) => NumberingRule::FixedPrefixIncrement {
            prefix: raw.prefix,
            counter,
        },
        None => {
            log::warn!("Rule for '{category}' names unknown counter '{field}'");
            NumberingRule::Unhandled
        }
    }
}

fn builtin_bucket_rule(category: &str) -> Option<NumberingRule> {
    let (prefix, counter) = match category {
        Category::MAIN => ("", Counter::MainTopic),
        Category::FREQUENT => ("A", Counter::Frequent),
        Category::QUOTE => ("Z", Counter::Quote),
        _ => return None,
    };
    Some(NumberingRule::FixedPrefixIncrement {
        prefix: prefix.to_string(),
        counter,
    })
}

fn subtopic_rule(parent: &str) -> NumberingRule {
    if !parent.is_empty() && parent.chars().all(|c| c.is_ascii_alphanumeric()) {
        NumberingRule::SubtopicLetter {
            parent: parent.to_string(),
        }
    } else {
        NumberingRule::Unhandled
    }
}

fn default_rules() -> HashMap<String, NumberingRule> {
    let mut rules: HashMap<String, NumberingRule> = [Category::MAIN, Category::FREQUENT, Category::QUOTE]
        .into_iter()
        .filter_map(|name| builtin_bucket_rule(name).map(|rule| (name.to_string(), rule)))
        .collect();
    rules.insert(
        Category::SUBTOPIC.to_string(),
        NumberingRule::SubtopicLetter {
            parent: "1".to_string(),
        },
    );
    rules
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
