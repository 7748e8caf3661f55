//! Markdown-subset block parser for post bodies.
//!
//! Single pass over lines, no nesting and no inline markup. Recognized:
//! code fences, `#`/`##`/`###` headings, `- ` list items, blank-line
//! separated paragraphs.

/// One rendered block of a post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem(String),
    Code(String),
}

const FENCE: &str = "```";
const HEADINGS: [(&str, u8); 3] = [("# ", 1), ("## ", 2), ("### ", 3)];

/// Splits `content` into blocks.
///
/// Headings, list items and fences close the open paragraph first. Lines
/// after an unterminated fence are dropped; the site renders nothing for them.
pub fn parse_blocks(content: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    for line in content.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.starts_with(FENCE) {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines.join("\n"))),
                None => {
                    flush_paragraph(&mut paragraph, &mut blocks);
                    code = Some(Vec::new());
                }
            }
            continue;
        }

        if let Some(lines) = code.as_mut() {
            lines.push(line);
            continue;
        }

        if let Some((level, text)) = heading(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level,
                text: text.to_string(),
            });
        } else if let Some(item) = line.strip_prefix("- ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem(item.to_string()));
        } else if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
        } else {
            paragraph.push(line);
        }
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

/// Renders blocks as a minimal HTML fragment with escaped text.
pub fn to_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                html.push_str(&format!("<h{level}>{}</h{level}>\n", escape_html(text)));
            }
            Block::Paragraph(text) => {
                html.push_str(&format!("<p>{}</p>\n", escape_html(text)));
            }
            Block::ListItem(text) => {
                html.push_str(&format!("<li>{}</li>\n", escape_html(text)));
            }
            Block::Code(text) => {
                html.push_str(&format!("<pre><code>{}</code></pre>\n", escape_html(text)));
            }
        }
    }
    html
}

/// Escapes text for use inside HTML element bodies and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn heading(line: &str) -> Option<(u8, &str)> {
    HEADINGS
        .iter()
        .find_map(|(prefix, level)| line.strip_prefix(*prefix).map(|text| (*level, text)))
}

fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(paragraph.join(" ")));
        paragraph.clear();
    }
}
