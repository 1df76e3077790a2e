use scraper::{ElementRef, Html, Node, Selector};

use super::latex::LatexConverter;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Inner HTML of the first `div.problem-statement` on a full problem page.
pub fn statement_html(page: &str) -> Option<String> {
    let doc = Html::parse_document(page);
    let sel = Selector::parse("div.problem-statement").ok()?;
    let html = doc.select(&sel).next()?.inner_html();
    Some(html)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// The fragment root; emits nothing itself.
    Root,
    /// An element re-serialized with its tags.
    Tag,
    /// Inside `<sub>`/`<sup>`: text only.
    Inline,
}

/// Re-serialize `raw` with `<sub>`/`<sup>` inlined as `_x`/`^x` and math
/// `<script>` nodes replaced by their converted text.
///
/// Walks the tree with an explicit stack, so nesting depth is bounded only by
/// memory.
pub fn rewrite_markup(raw: &str, latex: &dyn LatexConverter) -> String {
    let fragment = Html::parse_fragment(raw);
    let root = fragment.root_element();
    let mut out = String::with_capacity(raw.len());
    let mut stack = vec![(root, root.children(), Frame::Root)];

    while let Some((el, children, frame)) = stack.last_mut() {
        let (el, frame) = (*el, *frame);
        let Some(child) = children.next() else {
            if frame == Frame::Tag {
                out.push_str("</");
                out.push_str(el.value().name());
                out.push('>');
            }
            stack.pop();
            continue;
        };
        let inline = frame == Frame::Inline;

        match child.value() {
            Node::Text(text) => push_escaped(&mut out, text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                match name {
                    "sub" | "sup" => {
                        out.push(if name == "sub" { '_' } else { '^' });
                        stack.push((child, child.children(), Frame::Inline));
                    }
                    "script" if is_math_script(child.value().attr("type").unwrap_or("")) => {
                        let source: String = child.text().collect();
                        push_escaped(&mut out, &latex.to_text(&source));
                    }
                    "script" | "style" if inline => {}
                    _ if inline => stack.push((child, child.children(), Frame::Inline)),
                    _ => {
                        push_open_tag(&mut out, child);
                        if !VOID_ELEMENTS.contains(&name) {
                            stack.push((child, child.children(), Frame::Tag));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Visible text of `markup`: every text node trimmed, empty ones dropped,
/// joined with single spaces. Script and style contents are not text.
pub fn flatten_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut pieces = Vec::new();
    let mut stack = vec![fragment.root_element().children()];

    while let Some(children) = stack.last_mut() {
        let Some(child) = children.next() else {
            stack.pop();
            continue;
        };
        match child.value() {
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    pieces.push(t);
                }
            }
            Node::Element(e) if matches!(e.name(), "script" | "style") => {}
            Node::Element(_) => stack.push(child.children()),
            _ => {}
        }
    }
    pieces.join(" ")
}

fn is_math_script(kind: &str) -> bool {
    kind.starts_with("math/tex") || kind.contains("math")
}

fn push_open_tag(out: &mut String, el: ElementRef<'_>) {
    out.push('<');
    out.push_str(el.value().name());
    for (key, value) in el.value().attrs() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
