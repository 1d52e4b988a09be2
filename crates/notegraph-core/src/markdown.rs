//! Markdown export of note documents.

use serde_json::Value;

use crate::document::{Block, Document, Inline, Props, REFERENCE, TAG};

const DEFAULT_INDENT: usize = 2;

/// Renders documents as CommonMark-flavoured markdown.
///
/// Constructed once by whoever owns the service and handed to it; holds no
/// global state.
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    indent: usize,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_list_item(block_type: &str) -> bool {
    matches!(
        block_type,
        "bulletListItem" | "numberedListItem" | "checkListItem"
    )
}

fn prop_str<'a>(props: &'a Props, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

fn heading_level(props: &Props) -> usize {
    let level = match props.get("level") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(1) as usize,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(1),
        _ => 1,
    };
    level.clamp(1, 6)
}

fn style_on(styles: &Props, key: &str) -> bool {
    matches!(styles.get(key), Some(Value::Bool(true)))
}

fn styled_text(text: &str, styles: &Props) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    if style_on(styles, "code") {
        return format!("`{text}`");
    }
    let mut out = text.to_string();
    if style_on(styles, "strike") {
        out = format!("~~{out}~~");
    }
    if style_on(styles, "italic") {
        out = format!("*{out}*");
    }
    if style_on(styles, "bold") {
        out = format!("**{out}**");
    }
    out
}

fn render_inline(inline: &Inline) -> String {
    match inline.inline_type.as_str() {
        REFERENCE => {
            let label = prop_str(&inline.props, "title")
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .or_else(|| inline.props.get("id").map(|id| id.to_string().trim_matches('"').to_string()))
                .unwrap_or_default();
            format!("[[{label}]]")
        }
        TAG => prop_str(&inline.props, "tag").unwrap_or_default().to_string(),
        "link" => {
            let label = if inline.content.is_empty() {
                inline.text.clone().unwrap_or_default()
            } else {
                render_inlines(&inline.content)
            };
            let href = inline
                .href
                .as_deref()
                .or_else(|| prop_str(&inline.props, "href"))
                .unwrap_or_default();
            format!("[{label}]({href})")
        }
        _ => inline
            .text
            .as_deref()
            .map(|text| styled_text(text, &inline.styles))
            .unwrap_or_default(),
    }
}

fn render_inlines(inlines: &[Inline]) -> String {
    inlines.iter().map(render_inline).collect()
}

/// Unstyled text, for code blocks.
fn raw_text(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .filter_map(|inline| inline.text.as_deref())
        .collect()
}

impl MarkdownConverter {
    pub fn new() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }

    /// Spaces per nesting level of child blocks.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn convert(&self, doc: &Document) -> String {
        self.render_blocks(&doc.blocks)
    }

    /// Convert a serialized note body. Content that does not parse is
    /// returned as is.
    pub fn convert_content(&self, content: &str) -> String {
        match Document::try_parse(content) {
            Some(doc) => self.convert(&doc),
            None => content.to_string(),
        }
    }

    fn render_blocks(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut previous_was_list = false;
        let mut number = 0;

        for block in blocks {
            let list = is_list_item(&block.block_type);
            number = if block.block_type == "numberedListItem" {
                number + 1
            } else {
                0
            };
            let rendered = self.render_block(block, number);
            if rendered.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str(if list && previous_was_list { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            previous_was_list = list;
        }
        out
    }

    fn render_block(&self, block: &Block, number: usize) -> String {
        let text = render_inlines(&block.content);
        let own = match block.block_type.as_str() {
            "heading" => format!("{} {}", "#".repeat(heading_level(&block.props)), text),
            "bulletListItem" => format!("- {text}"),
            "numberedListItem" => format!("{number}. {text}"),
            "checkListItem" => {
                let checked = matches!(block.props.get("checked"), Some(Value::Bool(true)));
                format!("- [{}] {text}", if checked { "x" } else { " " })
            }
            "quote" => text
                .lines()
                .map(|line| format!("> {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
            "codeBlock" => {
                let language = prop_str(&block.props, "language").unwrap_or_default();
                format!("```{language}\n{}\n```", raw_text(&block.content))
            }
            "divider" => "---".to_string(),
            _ => text,
        };

        if block.children.is_empty() {
            return own;
        }
        let pad = " ".repeat(self.indent);
        let children = self.render_blocks(&block.children);
        let indented = children
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{pad}{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        if own.is_empty() {
            indented
        } else {
            format!("{own}\n{indented}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(json: &str) -> String {
        MarkdownConverter::new().convert(&Document::parse(json).unwrap())
    }

    #[test]
    fn headings_paragraphs_and_dividers() {
        let md = convert(
            r#"[
                {"type":"heading","props":{"level":2},"content":[{"type":"text","text":"Title"}]},
                {"type":"paragraph","content":[{"type":"text","text":"Body"}]},
                {"type":"divider"},
                {"type":"heading","props":{"level":"9"},"content":[{"type":"text","text":"Deep"}]}
            ]"#,
        );
        assert_eq!(md, "## Title\n\nBody\n\n---\n\n###### Deep");
    }

    #[test]
    fn inline_styles_links_references_and_tags() {
        let md = convert(
            r#"[{"type":"paragraph","content":[
                {"type":"text","text":"bold","styles":{"bold":true}},
                {"type":"text","text":" "},
                {"type":"text","text":"both","styles":{"bold":true,"italic":true}},
                {"type":"text","text":" "},
                {"type":"text","text":"x()","styles":{"code":true,"bold":true}},
                {"type":"text","text":" "},
                {"type":"text","text":"gone","styles":{"strike":true}},
                {"type":"text","text":" see "},
                {"type":"link","href":"https://example.com","content":[{"type":"text","text":"site"}]},
                {"type":"text","text":" "},
                {"type":"reference","props":{"id":4,"title":"Alpha"}},
                {"type":"text","text":" "},
                {"type":"tag","props":{"id":1,"tag":"@work"}}
            ]}]"#,
        );
        assert_eq!(
            md,
            "**bold** ***both*** `x()` ~~gone~~ see [site](https://example.com) [[Alpha]] @work"
        );
    }

    #[test]
    fn lists_number_consecutively_and_nest_children() {
        let md = convert(
            r#"[
                {"type":"numberedListItem","content":[{"type":"text","text":"one"}],
                 "children":[{"type":"bulletListItem","content":[{"type":"text","text":"inner"}]}]},
                {"type":"numberedListItem","content":[{"type":"text","text":"two"}]},
                {"type":"checkListItem","props":{"checked":true},"content":[{"type":"text","text":"done"}]},
                {"type":"paragraph","content":[{"type":"text","text":"after"}]},
                {"type":"numberedListItem","content":[{"type":"text","text":"restart"}]}
            ]"#,
        );
        assert_eq!(
            md,
            "1. one\n  - inner\n2. two\n- [x] done\n\nafter\n\n1. restart"
        );
    }

    #[test]
    fn code_blocks_keep_raw_text_and_quotes_prefix_lines() {
        let md = convert(
            r#"[
                {"type":"codeBlock","props":{"language":"rust"},"content":[{"type":"text","text":"let x = 1;\nx * 2","styles":{"bold":true}}]},
                {"type":"quote","content":[{"type":"text","text":"a\nb"}]}
            ]"#,
        );
        assert_eq!(md, "```rust\nlet x = 1;\nx * 2\n```\n\n> a\n> b");
    }

    #[test]
    fn unknown_blocks_render_as_paragraphs_and_empty_blocks_vanish() {
        let md = convert(
            r#"[
                {"type":"callout","content":[{"type":"text","text":"note"}]},
                {"type":"paragraph","content":[]},
                {"type":"paragraph","content":[{"type":"text","text":"end"}]}
            ]"#,
        );
        assert_eq!(md, "note\n\nend");
    }

    #[test]
    fn unparseable_content_is_exported_verbatim() {
        let converter = MarkdownConverter::new();
        assert_eq!(converter.convert_content("just text"), "just text");
        assert_eq!(converter.convert_content(""), "");
    }

    #[test]
    fn indent_width_is_configurable() {
        let doc = Document::parse(
            r#"[{"type":"bulletListItem","content":[{"type":"text","text":"a"}],
                 "children":[{"type":"bulletListItem","content":[{"type":"text","text":"b"}]}]}]"#,
        )
        .unwrap();
        assert_eq!(MarkdownConverter::new().with_indent(4).convert(&doc), "- a\n    - b");
    }
}
