//! A small owned XML element tree built on `quick_xml` events.
//!
//! Only what the package parts need is kept: elements, attributes and text. Comments and
//! processing instructions are dropped on the way through. Names are stored qualified
//! (`w:tc`), and lookups compare local names so that a part written with an unusual prefix
//! still resolves.

use crate::error::Res;
use anyhow::{bail, Context};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub(crate) name: String,
    attrs: Vec<(String, String)>,
    pub(crate) children: Vec<Node>,
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

impl Element {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub(crate) fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub(crate) fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// True when the local part of this element's name is `local_name(name)`.
    pub(crate) fn is(&self, name: &str) -> bool {
        local_name(&self.name) == local_name(name)
    }

    /// A qualified name for a new element that uses the same prefix as this one, so `row` next to
    /// `x:sheetData` becomes `x:row`.
    pub(crate) fn sibling_name(&self, local: &str) -> String {
        match self.name.split_once(':') {
            Some((prefix, _)) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    pub(crate) fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Finds an attribute by its local name, e.g. `id` matches `r:id`.
    pub(crate) fn attr_local(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_name(k) == local)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub(crate) fn remove_attr(&mut self, key: &str) {
        self.attrs.retain(|(k, _)| k != key);
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub(crate) fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub(crate) fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(name))
    }

    pub(crate) fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.elements_mut().filter(move |e| e.is(name))
    }

    pub(crate) fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(name))
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(name))
    }

    pub(crate) fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub(crate) fn remove_children_named(&mut self, name: &str) {
        self.children.retain(|n| match n {
            Node::Element(e) => !e.is(name),
            Node::Text(_) => true,
        });
    }

    /// Returns the child called `name`, creating it first when missing. New children are placed
    /// according to `order`, a list of sibling names in schema order, so that the result stays
    /// valid for formats that care about element order.
    pub(crate) fn ensure_child(&mut self, name: &str, order: &[&str]) -> &mut Element {
        let existing = self.children.iter().position(|n| match n {
            Node::Element(e) => e.is(name),
            Node::Text(_) => false,
        });
        let ix = match existing {
            Some(ix) => ix,
            None => self.insert_ordered(Element::new(name), order),
        };
        match &mut self.children[ix] {
            Node::Element(e) => e,
            Node::Text(_) => unreachable!("index points at an element"),
        }
    }

    /// Returns the child called `name`, creating it as the first child when missing. Property
    /// elements such as `w:pPr`, `w:rPr` and `w:tcPr` must come first in their parent.
    pub(crate) fn ensure_first_child(&mut self, name: &str) -> &mut Element {
        let ix = match self.children.iter().position(|n| match n {
            Node::Element(e) => e.is(name),
            Node::Text(_) => false,
        }) {
            Some(ix) => ix,
            None => {
                self.children.insert(0, Node::Element(Element::new(name)));
                0
            }
        };
        match &mut self.children[ix] {
            Node::Element(e) => e,
            Node::Text(_) => unreachable!("index points at an element"),
        }
    }

    /// Replaces any child with the same name as `child`, keeping `order`. Returns the node index.
    pub(crate) fn insert_ordered(&mut self, child: Element, order: &[&str]) -> usize {
        self.remove_children_named(&child.name);
        let rank = order.iter().position(|o| child.is(o));
        let ix = match rank {
            Some(rank) => self.children.iter().position(|n| match n {
                Node::Element(e) => order
                    .iter()
                    .position(|o| e.is(o))
                    .is_some_and(|other| other > rank),
                Node::Text(_) => false,
            }),
            None => None,
        };
        let ix = ix.unwrap_or(self.children.len());
        self.children.insert(ix, Node::Element(child));
        ix
    }

    /// Concatenated text of the direct text children.
    pub(crate) fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replaces all children with a single text node.
    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Visits this element and every descendant element, depth first.
    pub(crate) fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }
}

/// A parsed XML part: the optional declaration plus the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlDocument {
    decl: Option<BytesDecl<'static>>,
    pub(crate) root: Element,
}

impl XmlDocument {
    pub(crate) fn parse(bytes: &[u8]) -> Res<Self> {
        let xml = std::str::from_utf8(bytes).context("XML part is not valid UTF-8")?;
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);

        let mut decl = None;
        let mut root = None;
        let mut stack: Vec<Element> = Vec::new();
        loop {
            match reader.read_event().context("Malformed XML")? {
                Event::Decl(d) => decl = Some(d.into_owned()),
                Event::Start(e) => stack.push(element_from(&e)?),
                Event::Empty(e) => attach(&mut stack, &mut root, element_from(&e)?)?,
                Event::End(_) => {
                    let element = stack.pop().context("Unbalanced end tag")?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = t.unescape().context("Bad text content")?;
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Text(String::from_utf8_lossy(&c).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            bail!("XML ended with {} unclosed element(s)", stack.len());
        }
        let root = root.context("XML part has no root element")?;
        Ok(Self { decl, root })
    }

    pub(crate) fn to_bytes(&self) -> Res<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = &self.decl {
            writer.write_event(Event::Decl(decl.clone()))?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn element_from(start: &BytesStart<'_>) -> Res<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.context("Malformed attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().context("Bad attribute value")?;
        element.attrs.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Res<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => bail!("XML part has more than one root element"),
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Res<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
