//! Articles are markdown files addressed by their file name.
//!
//! File names double as identifiers and as the source of display titles:
//! `2021_03_01_hello_world.md` is listed as "2021 03 01 hello world". Naming
//! files with a sortable date prefix keeps the listing chronological.

use std::fmt;

use time::OffsetDateTime;

use super::error::DomainError;

/// A validated article file name.
///
/// Only bare file names are accepted: anything that could escape the articles
/// directory (separators, parent references) or address hidden files is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleName(String);

impl ArticleName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::validation("article name is empty"));
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(DomainError::validation(format!(
                "article name `{raw}` must not contain path separators"
            )));
        }
        if raw.contains("..") {
            return Err(DomainError::validation(format!(
                "article name `{raw}` must not contain `..`"
            )));
        }
        if raw.starts_with('.') {
            return Err(DomainError::validation(format!(
                "article name `{raw}` must not be hidden"
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(DomainError::validation(
                "article name must not contain control characters",
            ));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn title(&self) -> String {
        title_from_file_name(&self.0)
    }
}

impl fmt::Display for ArticleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArticleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A loaded article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub name: ArticleName,
    pub title: String,
    pub markdown: String,
    pub modified: OffsetDateTime,
}

impl Article {
    pub fn new(name: ArticleName, markdown: String, modified: OffsetDateTime) -> Self {
        let title = name.title();
        Self {
            name,
            title,
            markdown,
            modified,
        }
    }
}

/// Derive a display title: underscores become spaces, everything from the
/// first `.` is dropped and the first character is uppercased.
pub fn title_from_file_name(file_name: &str) -> String {
    let spaced = file_name.replace('_', " ");
    let stem = spaced.split('.').next().unwrap_or_default();
    if stem.trim().is_empty() {
        return file_name.to_string();
    }

    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => file_name.to_string(),
    }
}

/// Return the first `count` lines of `text`, each terminated by `\n`.
pub fn preview_lines(text: &str, count: usize) -> String {
    let mut preview = String::new();
    for line in text.lines().take(count) {
        preview.push_str(line);
        preview.push('\n');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_file_names() {
        let name = ArticleName::parse("2021_03_01_hello.md").expect("valid");
        assert_eq!(name.as_str(), "2021_03_01_hello.md");
    }

    #[test]
    fn parse_rejects_traversal_and_hidden_names() {
        for raw in ["", "../secret.md", "a/b.md", "a\\b.md", "..", ".env", "a..b"] {
            assert!(ArticleName::parse(raw).is_err(), "`{raw}` should be rejected");
        }
    }

    #[test]
    fn parse_rejects_control_characters() {
        assert!(ArticleName::parse("bad\nname.md").is_err());
    }

    #[test]
    fn title_replaces_underscores_and_drops_extension() {
        assert_eq!(title_from_file_name("hello_world.md"), "Hello world");
        assert_eq!(
            title_from_file_name("rust_ownership.draft.md"),
            "Rust ownership"
        );
    }

    #[test]
    fn title_uppercases_multibyte_first_character() {
        assert_eq!(title_from_file_name("élan_vital.md"), "Élan vital");
    }

    #[test]
    fn title_without_stem_keeps_original_name() {
        assert_eq!(title_from_file_name(".md"), ".md");
    }

    #[test]
    fn preview_takes_leading_lines() {
        let text = (0..20).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        let preview = preview_lines(&text, 10);
        assert_eq!(preview.lines().count(), 10);
        assert!(preview.starts_with("line 0\n"));
        assert!(preview.ends_with("line 9\n"));
    }

    #[test]
    fn preview_of_short_text_returns_everything() {
        assert_eq!(preview_lines("one\r\ntwo", 10), "one\ntwo\n");
        assert_eq!(preview_lines("", 10), "");
    }

    #[test]
    fn article_title_is_derived_from_name() {
        let name = ArticleName::parse("first_post.md").expect("valid");
        let article = Article::new(name, "# Hi".into(), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(article.title, "First post");
    }
}
