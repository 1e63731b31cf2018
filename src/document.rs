//! The owned XML tree the codec reads and writes.
//!
//! Construction and pretty serialization are handled here; parsing input
//! text goes through roxmltree and is bridged into the same tree shape.
//! The codec only ever sees "ordered labeled tree with text leaves";
//! nothing in it depends on a particular XML library.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<XmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = XmlNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_comment(self, text: impl Into<String>) -> Self {
        self.with_child(XmlNode::Comment(text.into()))
    }

    pub fn push(&mut self, node: impl Into<XmlNode>) {
        self.children.push(node.into());
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.push((key.into(), value.into()));
    }

    /// First element child with the given tag; comments never match.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.elements().find(|e| e.tag == tag)
    }

    /// Element children in document order, comments skipped.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Comment(_) => None,
        })
    }

    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Serialize as a standalone document with an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version='1.0' encoding='UTF-8'?>\n");
        self.write_into(&mut out, 0);
        out.push('\n');
        out
    }

    /// Serialize as a fragment, no declaration, no trailing newline.
    pub fn to_fragment(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let mut attrs = String::new();
        for (k, v) in &self.attrs {
            let _ = write!(attrs, " {k}=\"{}\"", escape_attr(v));
        }

        let only_comment = matches!(self.children.as_slice(), [XmlNode::Comment(_)]);
        if self.children.is_empty() || only_comment {
            match (&self.text, self.children.first()) {
                (Some(text), _) => {
                    let _ = write!(
                        out,
                        "{pad}<{tag}{attrs}>{}</{tag}>",
                        escape_text(text),
                        tag = self.tag
                    );
                }
                (None, Some(XmlNode::Comment(c))) => {
                    let _ = write!(
                        out,
                        "{pad}<{tag}{attrs}><!-- {c} --></{tag}>",
                        tag = self.tag
                    );
                }
                (None, _) => {
                    let _ = write!(out, "{pad}<{}{attrs}/>", self.tag);
                }
            }
            return;
        }

        let _ = write!(out, "{pad}<{}{attrs}>", self.tag);
        for child in &self.children {
            out.push('\n');
            match child {
                XmlNode::Element(e) => e.write_into(out, depth + 1),
                XmlNode::Comment(c) => {
                    let _ = write!(out, "{}<!-- {c} -->", "  ".repeat(depth + 1));
                }
            }
        }
        let _ = write!(out, "\n{pad}</{}>", self.tag);
    }
}

impl From<Element> for XmlNode {
    fn from(e: Element) -> Self {
        XmlNode::Element(e)
    }
}

/// Parse a document, bridging roxmltree's arena into our owned tree.
/// Comments survive as `Comment` nodes; indentation whitespace is dropped,
/// leaf text is kept verbatim.
pub fn parse(source: &str) -> Result<Element, roxmltree::Error> {
    let doc = roxmltree::Document::parse(source)?;
    Ok(convert(doc.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let mut el = Element::new(node.tag_name().name());
    for attr in node.attributes() {
        el.attrs.push((attr.name().to_string(), attr.value().to_string()));
    }
    for child in node.children() {
        if child.is_element() {
            el.children.push(XmlNode::Element(convert(child)));
        } else if child.is_comment() {
            let text = child.text().unwrap_or("").trim().to_string();
            el.children.push(XmlNode::Comment(text));
        } else if child.is_text() {
            let text = child.text().unwrap_or("");
            if !text.trim().is_empty() {
                el.text = Some(text.to_string());
            }
        }
    }
    el
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_elements_serialize_on_one_line() {
        let el = Element::new("a").with_text("hi");
        assert_eq!(el.to_fragment(), "<a>hi</a>");
        assert_eq!(Element::new("b").to_fragment(), "<b/>");
    }

    #[test]
    fn nested_elements_indent_two_spaces() {
        let el = Element::new("outer")
            .with_child(Element::new("inner").with_text("1"))
            .with_comment("note");
        assert_eq!(
            el.to_fragment(),
            "<outer>\n  <inner>1</inner>\n  <!-- note -->\n</outer>"
        );
    }

    #[test]
    fn attrs_and_text_are_escaped() {
        let el = Element::new("a")
            .with_attr("k", "a\"b")
            .with_text("1 < 2 & 3");
        assert_eq!(el.to_fragment(), "<a k=\"a&quot;b\">1 &lt; 2 &amp; 3</a>");
    }

    #[test]
    fn parse_round_trips_structure() {
        let el = Element::new("conf")
            .with_child(Element::new("count").with_text("3"))
            .with_comment("a note")
            .with_child(Element::new("empty"));
        let parsed = parse(&el.to_xml()).unwrap();
        assert_eq!(parsed, el);
    }

    #[test]
    fn child_lookup_skips_comments() {
        let el = Element::new("x")
            .with_comment("count")
            .with_child(Element::new("count").with_text("1"));
        assert_eq!(el.child("count").unwrap().text_content(), "1");
        assert_eq!(el.elements().count(), 1);
    }
}
