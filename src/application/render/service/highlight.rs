use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

/// HTML-escapes the wrapped string when formatted; mirrors syntect's
/// crate-private `escape::Escape`, which is not publicly exported.
struct Escape<'a>(&'a str);

impl std::fmt::Display for Escape<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0;
        let mut last = 0;
        for (i, b) in s.bytes().enumerate() {
            let rep = match b {
                b'>' => "&gt;",
                b'<' => "&lt;",
                b'&' => "&amp;",
                b'\'' => "&#39;",
                b'"' => "&quot;",
                _ => continue,
            };
            f.write_str(&s[last..i])?;
            f.write_str(rep)?;
            last = i + 1;
        }
        f.write_str(&s[last..])
    }
}

/// How the syntax for a code block was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageResolution {
    /// The block's language tag named a known syntax.
    Tagged(String),
    /// No usable tag; the syntax was detected from the code itself.
    Detected(String),
    /// Nothing matched; the code is emitted escaped but unhighlighted.
    Plain,
}

impl LanguageResolution {
    pub fn syntax_name(&self) -> Option<&str> {
        match self {
            LanguageResolution::Tagged(name) | LanguageResolution::Detected(name) => {
                Some(name.as_str())
            }
            LanguageResolution::Plain => None,
        }
    }
}

pub(crate) struct Highlighted {
    pub(crate) html: String,
    pub(crate) resolution: LanguageResolution,
}

/// Highlight one code block.
///
/// A recognised tag wins. Otherwise, when `auto_detect` is set, the first line
/// is matched against syntax signatures (shebangs, `<?xml`, `<?php`, ...) and,
/// failing that, the code is scored against common languages.
pub(crate) fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    auto_detect: bool,
) -> Result<Highlighted, RenderError> {
    let tag = language.map(str::trim).filter(|tag| !tag.is_empty());

    let tagged = tag.and_then(|token| find_syntax(syntax_set, token));
    let (syntax, resolution) = match tagged {
        Some(syntax) => (Some(syntax), LanguageResolution::Tagged(syntax.name.clone())),
        None if auto_detect => match detect_syntax(syntax_set, code) {
            Some(syntax) => (
                Some(syntax),
                LanguageResolution::Detected(syntax.name.clone()),
            ),
            None => (None, LanguageResolution::Plain),
        },
        None => (None, LanguageResolution::Plain),
    };

    let label = class_label(tag, &resolution);
    let body = match syntax {
        Some(syntax) => classed_html(syntax, code, syntax_set, class_style, &label)?,
        None => Escape(code).to_string(),
    };

    let html = format!(
        "<pre class=\"syntax-highlight syntax-lang-{label}\" data-language=\"{label}\"><code class=\"language-{label} syntax-code\">{body}</code></pre>"
    );

    Ok(Highlighted { html, resolution })
}

fn classed_html(
    syntax: &SyntaxReference,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    label: &str,
) -> Result<String, RenderError> {
    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: label.to_string(),
                message: err.to_string(),
            })?;
    }

    Ok(generator.finalize())
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

/// Languages tried when no first-line signature matches. Ties go to the
/// earlier entry. Markup and stylesheet grammars are left out because they
/// accept almost any text.
const DETECTION_CANDIDATES: &[&str] = &[
    "rust", "python", "go", "c", "cpp", "java", "cs", "js", "ts", "json", "sh", "rb", "sql",
    "hs", "lua",
];

/// Minimum score for a content-based guess.
const MIN_RELEVANCE: i64 = 3;

fn detect_syntax<'a>(syntax_set: &'a SyntaxSet, code: &str) -> Option<&'a SyntaxReference> {
    let first_line = code.lines().find(|line| !line.trim().is_empty())?;
    if let Some(syntax) = syntax_set
        .find_syntax_by_first_line(first_line)
        .filter(|syntax| syntax.name != "Plain Text")
    {
        return Some(syntax);
    }

    let mut best: Option<(&SyntaxReference, i64)> = None;
    for token in DETECTION_CANDIDATES {
        let Some(syntax) = syntax_set.find_syntax_by_token(token) else {
            continue;
        };
        let Some(score) = relevance(syntax, syntax_set, code) else {
            continue;
        };
        if score >= MIN_RELEVANCE && best.is_none_or(|(_, top)| score > top) {
            best = Some((syntax, score));
        }
    }
    best.map(|(syntax, _)| syntax)
}

/// Parse `code` with `syntax` and sum the weight of every non-blank token.
/// `None` when the grammar fails on the input.
fn relevance(syntax: &SyntaxReference, syntax_set: &SyntaxSet, code: &str) -> Option<i64> {
    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut score = 0;

    for line in LinesWithEndings::from(code) {
        let ops = state.parse_line(line, syntax_set).ok()?;
        let mut start = 0;
        for (index, op) in ops {
            score += token_weight(&line[start..index], &stack);
            stack.apply(&op).ok()?;
            start = index;
        }
        score += token_weight(&line[start..], &stack);
    }

    Some(score)
}

fn token_weight(token: &str, stack: &ScopeStack) -> i64 {
    if token.trim().is_empty() {
        return 0;
    }
    let scopes = stack.as_slice();
    if scopes
        .iter()
        .any(|scope| scope.build_string().starts_with("invalid"))
    {
        return -3;
    }

    let Some(innermost) = scopes.last().map(|scope| scope.build_string()) else {
        return 0;
    };
    const STRONG: &[&str] = &[
        "keyword",
        "storage",
        "entity.name",
        "support.function",
        "support.macro",
        "constant.language",
        "variable.language",
    ];
    if innermost.starts_with("keyword.operator") {
        0
    } else if STRONG.iter().any(|prefix| innermost.starts_with(prefix)) {
        2
    } else if ["string", "constant.numeric", "comment"]
        .iter()
        .any(|prefix| innermost.starts_with(prefix))
    {
        1
    } else {
        0
    }
}

/// CSS-safe label: the tag when one was given, else the resolved syntax name.
fn class_label(tag: Option<&str>, resolution: &LanguageResolution) -> String {
    let source = match (tag, resolution) {
        (Some(tag), _) => tag.to_string(),
        (None, LanguageResolution::Detected(name)) => name.clone(),
        _ => "text".to_string(),
    };

    let label: String = source
        .to_ascii_lowercase()
        .chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' | '+' | '#' | '_' | '-' => ch,
            _ => '-',
        })
        .collect();
    let trimmed = label.trim_matches('-');
    if trimmed.is_empty() {
        "text".to_string()
    } else {
        trimmed.to_string()
    }
}
