use std::fmt;

/// Folder that holds frequently-accessed file reference cards.
pub const FREQUENT_FOLDER: &str = "A";
/// Folder that holds quote and excerpt cards.
pub const QUOTE_FOLDER: &str = "Z";

/// A card category as supplied by the caller.
///
/// Categories are free text. `main`, `frequent` and `quote` name the
/// counted buckets; a parent-qualified category such as `3` or `3/rivers`
/// places the card under parent `3` as a subtopic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(String);

impl Category {
    pub const MAIN: &'static str = "main";
    pub const FREQUENT: &'static str = "frequent";
    pub const QUOTE: &'static str = "quote";
    pub const SUBTOPIC: &'static str = "subtopic";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parent part of a parent-qualified category: everything before
    /// the first `/`, or the whole name when there is none.
    pub fn parent(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// Folder under the card directory where cards of this category live.
    ///
    /// # Examples
    ///
    /// ```
    /// use zettel::Category;
    ///
    /// assert_eq!(Category::new("frequent").folder_name(), "A");
    /// assert_eq!(Category::new("quote").folder_name(), "Z");
    /// assert_eq!(Category::new("3/rivers").folder_name(), "3");
    /// assert_eq!(Category::new("main").folder_name(), "main");
    /// ```
    pub fn folder_name(&self) -> &str {
        match self.0.as_str() {
            Self::FREQUENT => FREQUENT_FOLDER,
            Self::QUOTE => QUOTE_FOLDER,
            _ => self.parent(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
