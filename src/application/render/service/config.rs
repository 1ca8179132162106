use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

use super::RenderOptions;

pub(crate) fn comrak_options(render_options: &RenderOptions) -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = render_options.gfm;
    ext.table = render_options.gfm;
    ext.autolink = render_options.gfm;
    ext.tasklist = render_options.gfm;
    ext.tagfilter = false;
    ext.footnotes = true;
    ext.header_id_prefix = render_options.header_ids.then(String::new);

    options.parse.smart = render_options.smarty_pants;

    let render = &mut options.render;
    render.hardbreaks = render_options.breaks;
    render.github_pre_lang = true;
    render.tasklist_classes = render_options.gfm;
    render.list_style = ListStyleType::Dash;
    // Highlighted code is injected as raw HTML; ammonia runs afterwards.
    render.r#unsafe = true;

    options
}

pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "kbd",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "aria-hidden",
        "aria-label",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["alt", "width", "height", "loading"]);
    builder.add_tag_attributes("code", &["data-language"]);
    builder.add_tag_attributes("pre", &["data-language", "lang"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder.add_url_schemes(["http", "https", "mailto"].iter().copied());

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gfm_toggles_table_and_strikethrough() {
        let on = comrak_options(&RenderOptions::default());
        assert!(on.extension.table);
        assert!(on.extension.strikethrough);

        let off = comrak_options(&RenderOptions {
            gfm: false,
            ..RenderOptions::default()
        });
        assert!(!off.extension.table);
        assert!(!off.extension.autolink);
    }

    #[test]
    fn header_ids_and_breaks_follow_options() {
        let options = comrak_options(&RenderOptions {
            header_ids: true,
            breaks: true,
            smarty_pants: true,
            ..RenderOptions::default()
        });
        assert_eq!(options.extension.header_id_prefix.as_deref(), Some(""));
        assert!(options.render.hardbreaks);
        assert!(options.parse.smart);
    }

    #[test]
    fn sanitizer_strips_scripts_and_keeps_highlight_markup() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean(
                "<pre class=\"syntax-highlight\" data-language=\"rust\"><code class=\"syntax-code\">x</code></pre><script>alert(1)</script>",
            )
            .to_string();

        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("class=\"syntax-code\""));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn sanitizer_drops_javascript_links() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<a href=\"javascript:alert(1)\">x</a>")
            .to_string();
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn sanitizer_preserves_task_list_checkboxes() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<li><input type=\"checkbox\" checked=\"\" disabled=\"\" /> done</li>")
            .to_string();
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));
    }
}
