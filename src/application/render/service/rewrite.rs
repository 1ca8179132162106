use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::{html::ClassStyle, parsing::SyntaxSet};
use tracing::debug;

use crate::application::render::types::RenderError;

use super::highlight::{self, LanguageResolution};

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) languages: Vec<String>,
}

/// Replace every fenced or indented code block with pre-highlighted HTML.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    auto_detect: bool,
) -> Result<RewriteOutcome, RenderError> {
    let mut outcome = RewriteOutcome::default();

    for node in root.descendants() {
        let Some((info, literal)) = extract_code_block(node) else {
            continue;
        };

        let language = info.split_whitespace().next();
        let highlighted = highlight::highlight_code(
            language,
            &literal,
            syntax_set,
            class_style,
            auto_detect,
        )?;

        if let LanguageResolution::Detected(name) = &highlighted.resolution {
            debug!(
                target = "application::render::highlight",
                tag = language.unwrap_or_default(),
                detected = %name,
                "Detected code block language"
            );
        }
        if let Some(name) = highlighted.resolution.syntax_name()
            && !outcome.languages.iter().any(|known| known == name)
        {
            outcome.languages.push(name.to_string());
        }
        outcome.contains_code = true;

        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: highlighted.html,
        });
    }

    Ok(outcome)
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::CodeBlock(block) => Some((block.info.clone(), block.literal.clone())),
        _ => None,
    }
}
