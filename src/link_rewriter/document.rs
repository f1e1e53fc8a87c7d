//! Typed view over a parsed HTML document.
//!
//! Wraps a kuchiki tree so the rewriter works against an [`ElementKind`]
//! enumeration and a small capability set (`get_attribute`, `set_attribute`,
//! `children`) rather than poking at raw tag names everywhere.

use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

/// Errors produced when turning a document back into markup.
///
/// Parsing itself never fails: html5ever recovers from malformed input and
/// treats unparseable fragments as text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("Invalid UTF-8 in serialized document: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Node kinds the rewriter cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `<a>` and `<area>`
    Anchor,
    /// `<link>`
    Link,
    Script,
    /// `<img>`
    Image,
    Form,
    Iframe,
    /// `<source>`, `<video>`, `<audio>`, `<track>`
    MediaSource,
    Style,
    Base,
    Other,
}

impl ElementKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "a" | "area" => Self::Anchor,
            "link" => Self::Link,
            "script" => Self::Script,
            "img" => Self::Image,
            "form" => Self::Form,
            "iframe" => Self::Iframe,
            "source" | "video" | "audio" | "track" => Self::MediaSource,
            "style" => Self::Style,
            "base" => Self::Base,
            _ => Self::Other,
        }
    }

    /// Whether the structural scan reads `href`/`src`/`action`/`data-src` on this kind
    #[must_use]
    pub const fn carries_links(self) -> bool {
        !matches!(self, Self::Style | Self::Base | Self::Other)
    }

    /// Whether `srcset` is meaningful on this kind
    #[must_use]
    pub const fn carries_srcset(self) -> bool {
        matches!(self, Self::Image | Self::MediaSource)
    }
}

/// A single element of a [`Document`]
#[derive(Clone)]
pub struct Element {
    inner: NodeDataRef<ElementData>,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        ElementKind::from_tag(self.tag_name())
    }

    pub fn tag_name(&self) -> &str {
        &self.inner.name.local
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.borrow().get(name).map(str::to_string)
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.inner
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        self.inner.attributes.borrow_mut().remove(name).is_some()
    }

    /// Direct element children, in document order
    pub fn children(&self) -> Vec<Element> {
        self.inner
            .as_node()
            .children()
            .elements()
            .map(|inner| Element { inner })
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        self.inner.as_node().text_contents()
    }

    /// Replace all children with a single text node
    pub fn set_text(&self, text: &str) {
        let node = self.inner.as_node();
        let children: Vec<NodeRef> = node.children().collect();
        for child in children {
            child.detach();
        }
        node.append(NodeRef::new_text(text));
    }

    /// Remove this element (and its subtree) from the document
    pub fn detach(&self) {
        self.inner.as_node().detach();
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag_name())
            .finish()
    }
}

/// Parsed, mutable HTML document
pub struct Document {
    root: NodeRef,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchiki::parse_html().one(html),
        }
    }

    /// Parse raw bytes, replacing invalid UTF-8 sequences
    pub fn parse_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Snapshot of all elements in document order.
    ///
    /// The snapshot stays valid while elements are detached or edited.
    pub fn elements(&self) -> Vec<Element> {
        self.root
            .descendants()
            .elements()
            .map(|inner| Element { inner })
            .collect()
    }

    pub fn elements_of(&self, kind: ElementKind) -> Vec<Element> {
        self.elements()
            .into_iter()
            .filter(|element| element.kind() == kind)
            .collect()
    }

    pub fn serialize(&self) -> Result<String, ParseError> {
        let mut output = Vec::new();
        self.root.serialize(&mut output)?;
        Ok(String::from_utf8(output)?)
    }
}
