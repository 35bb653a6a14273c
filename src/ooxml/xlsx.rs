//! Cell-level editing of the first worksheet of an `.xlsx` package.
//!
//! Written cells keep their style index (`s`), so a template's fonts, borders and number formats
//! carry over to the values written into it. Every other part of the package is left untouched.

use crate::error::Res;
use crate::ooxml::package::{rels_part_for, resolve_target};
use crate::ooxml::xml::Node;
use crate::ooxml::{CellRef, Element, Package, XmlDocument};
use anyhow::{bail, Context};
use std::collections::BTreeSet;
use std::fmt::Display;
use tracing::trace;

const ROOT_RELS: &str = "_rels/.rels";
const DEFAULT_WORKBOOK: &str = "xl/workbook.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const SHARED_STRINGS_REL: &str = "/sharedStrings";

/// Schema order of the children of `c`.
const CELL_ORDER: &[&str] = &["f", "v", "is", "extLst"];

/// An `.xlsx` package with its first worksheet parsed.
#[derive(Debug, Clone)]
pub(crate) struct Workbook {
    package: Package,
    sheet_part: String,
    sheet: XmlDocument,
    shared_strings: Vec<Element>,
}

impl Workbook {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Res<Self> {
        let package = Package::from_bytes(bytes).context("Unable to open the workbook")?;
        let workbook_part = workbook_part(&package)?;
        let workbook = package.xml(&workbook_part)?;
        let workbook_rels = package.xml(&rels_part_for(&workbook_part))?;

        let first_sheet = workbook
            .root
            .child("sheets")
            .and_then(|sheets| sheets.child("sheet"))
            .context("The workbook has no worksheets")?;
        let rel_id = first_sheet
            .attr_local("id")
            .context("The first worksheet has no relationship id")?;
        let target = workbook_rels
            .root
            .children_named("Relationship")
            .find(|rel| rel.attr("Id") == Some(rel_id))
            .and_then(|rel| rel.attr("Target"))
            .with_context(|| format!("The workbook has no relationship '{rel_id}'"))?;
        let sheet_part = resolve_target(&workbook_part, target);
        let sheet = package.xml(&sheet_part)?;
        if sheet.root.child("sheetData").is_none() {
            bail!("The worksheet '{sheet_part}' has no sheetData");
        }

        let shared_strings = match workbook_rels
            .root
            .children_named("Relationship")
            .find(|rel| rel.attr("Type").is_some_and(|t| t.ends_with(SHARED_STRINGS_REL)))
            .and_then(|rel| rel.attr("Target"))
        {
            Some(target) => {
                let part = resolve_target(&workbook_part, target);
                package
                    .xml(&part)?
                    .root
                    .children_named("si")
                    .cloned()
                    .collect()
            }
            None => Vec::new(),
        };

        trace!("Opened worksheet '{sheet_part}'");
        Ok(Self {
            package,
            sheet_part,
            sheet,
            shared_strings,
        })
    }

    fn sheet_data(&self) -> Option<&Element> {
        self.sheet.root.child("sheetData")
    }

    fn sheet_data_mut(&mut self) -> Res<&mut Element> {
        self.sheet
            .root
            .child_mut("sheetData")
            .context("The worksheet has no sheetData")
    }

    /// The displayed text of a cell, `None` when the cell does not exist.
    #[cfg(test)]
    pub(crate) fn cell_text(&self, cell: CellRef) -> Option<String> {
        let data = self.sheet_data()?;
        let row = numbered(data.children_named("row"), "r", row_number)
            .find(|(r, _)| *r == cell.row)
            .map(|(_, e)| e)?;
        let c = numbered(row.children_named("c"), "r", column_number)
            .find(|(col, _)| *col == cell.col)
            .map(|(_, e)| e)?;
        Some(self.value_of(c))
    }

    fn value_of(&self, c: &Element) -> String {
        match c.attr("t") {
            Some("s") => c
                .child("v")
                .and_then(|v| v.text().trim().parse::<usize>().ok())
                .and_then(|ix| self.shared_strings.get(ix))
                .map(rich_text)
                .unwrap_or_default(),
            Some("inlineStr") => c.child("is").map(rich_text).unwrap_or_default(),
            _ => c.child("v").map(|v| v.text()).unwrap_or_default(),
        }
    }

    /// The first row at or after `from` whose cell in column `col` is missing or blank.
    pub(crate) fn first_empty_row(&self, col: u32, from: u32) -> u32 {
        let occupied: BTreeSet<u32> = match self.sheet_data() {
            Some(data) => numbered(data.children_named("row"), "r", row_number)
                .filter_map(|(r, row)| {
                    numbered(row.children_named("c"), "r", column_number)
                        .find(|(c, _)| *c == col)
                        .filter(|(_, cell)| !self.value_of(cell).trim().is_empty())
                        .map(|_| r)
                })
                .collect(),
            None => BTreeSet::new(),
        };
        let mut row = from.max(1);
        while occupied.contains(&row) {
            row += 1;
        }
        row
    }

    /// Writes `text` as an inline string.
    pub(crate) fn set_text(&mut self, cell: CellRef, text: &str) -> Res<()> {
        let c = self.cell_mut(cell)?;
        let is_name = c.sibling_name("is");
        let t_name = c.sibling_name("t");
        c.set_attr("t", "inlineStr");
        c.remove_children_named("v");
        c.remove_children_named("f");
        c.insert_ordered(
            Element::new(is_name).with_child(
                Element::new(t_name)
                    .with_attr("xml:space", "preserve")
                    .with_text(text),
            ),
            CELL_ORDER,
        );
        Ok(())
    }

    /// Writes a numeric value.
    pub(crate) fn set_number(&mut self, cell: CellRef, value: impl Display) -> Res<()> {
        let c = self.cell_mut(cell)?;
        let v_name = c.sibling_name("v");
        c.remove_attr("t");
        c.remove_children_named("is");
        c.remove_children_named("f");
        c.insert_ordered(Element::new(v_name).with_text(value.to_string()), CELL_ORDER);
        Ok(())
    }

    /// Finds the `c` element for `cell`, creating the row and the cell in position when missing.
    fn cell_mut(&mut self, cell: CellRef) -> Res<&mut Element> {
        let data = self.sheet_data_mut()?;
        let row_name = data.sibling_name("row");
        let row_ix = position_for(data, "row", "r", row_number, cell.row, || {
            Element::new(row_name).with_attr("r", cell.row.to_string())
        });
        let row = element_at(data, row_ix)?;
        // Cached spans would no longer cover the row.
        row.remove_attr("spans");

        let c_name = row.sibling_name("c");
        let c_ix = position_for(row, "c", "r", column_number, cell.col, || {
            Element::new(c_name).with_attr("r", cell.to_string())
        });
        element_at(row, c_ix)
    }

    /// Replaces each `(token, value)` pair in every text cell of the worksheet, one text run at a
    /// time. Cells that reference a shared string are rewritten as inline strings so the shared
    /// string table, which other sheets may use, stays as it is. Returns the number of changed
    /// cells.
    pub(crate) fn replace_placeholders(&mut self, replacements: &[(&str, String)]) -> usize {
        let shared_strings = self.shared_strings.clone();
        let Ok(data) = self.sheet_data_mut() else {
            return 0;
        };
        let mut changed = 0;
        for row in data.children_named_mut("row") {
            for c in row.children_named_mut("c") {
                let mut inline = match c.attr("t") {
                    Some("s") => match c
                        .child("v")
                        .and_then(|v| v.text().trim().parse::<usize>().ok())
                        .and_then(|ix| shared_strings.get(ix))
                    {
                        Some(si) => {
                            let mut is = si.clone();
                            is.name = c.sibling_name("is");
                            is
                        }
                        None => continue,
                    },
                    Some("inlineStr") => match c.child("is") {
                        Some(is) => is.clone(),
                        None => continue,
                    },
                    _ => continue,
                };
                if !replace_in_text_runs(&mut inline, replacements) {
                    continue;
                }
                c.set_attr("t", "inlineStr");
                c.remove_children_named("v");
                c.insert_ordered(inline, CELL_ORDER);
                changed += 1;
            }
        }
        changed
    }

    pub(crate) fn to_bytes(&mut self) -> Res<Vec<u8>> {
        self.update_dimension();
        self.package.set_xml(&self.sheet_part, &self.sheet)?;
        self.package.to_bytes()
    }

    /// Keeps the `dimension` element in line with the cells that now exist.
    fn update_dimension(&mut self) {
        let mut bounds: Option<(CellRef, CellRef)> = None;
        if let Some(data) = self.sheet_data() {
            for row in data.children_named("row") {
                for c in row.children_named("c") {
                    let Some(cell) = c.attr("r").and_then(|r| r.parse::<CellRef>().ok()) else {
                        continue;
                    };
                    bounds = Some(match bounds {
                        None => (cell, cell),
                        Some((min, max)) => (
                            CellRef::new(min.row.min(cell.row), min.col.min(cell.col)),
                            CellRef::new(max.row.max(cell.row), max.col.max(cell.col)),
                        ),
                    });
                }
            }
        }
        let Some((min, max)) = bounds else {
            return;
        };
        if let Some(dimension) = self.sheet.root.child_mut("dimension") {
            let range = if min == max {
                min.to_string()
            } else {
                format!("{min}:{max}")
            };
            dimension.set_attr("ref", range);
        }
    }
}

fn workbook_part(package: &Package) -> Res<String> {
    if !package.has_part(ROOT_RELS) {
        return Ok(DEFAULT_WORKBOOK.to_string());
    }
    let rels = package.xml(ROOT_RELS)?;
    let part = rels
        .root
        .children_named("Relationship")
        .find(|rel| rel.attr("Type").is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL)))
        .and_then(|rel| rel.attr("Target"))
        .map(|target| resolve_target("", target))
        .unwrap_or_else(|| DEFAULT_WORKBOOK.to_string());
    Ok(part)
}

/// Text of a string item (`si` or `is`): a plain `t`, or the `t` of every rich text run.
fn rich_text(item: &Element) -> String {
    item.elements()
        .filter_map(|e| {
            if e.is("t") {
                Some(e.text())
            } else if e.is("r") {
                Some(e.children_named("t").map(|t| t.text()).collect())
            } else {
                None
            }
        })
        .collect()
}

fn replace_in_text_runs(item: &mut Element, replacements: &[(&str, String)]) -> bool {
    let mut changed = false;
    item.walk_mut(&mut |e| {
        if !e.is("t") {
            return;
        }
        let original = e.text();
        let mut replaced = original.clone();
        for (token, value) in replacements {
            replaced = replaced.replace(token, value);
        }
        if replaced != original {
            e.set_attr("xml:space", "preserve");
            e.set_text(replaced);
            changed = true;
        }
    });
    changed
}

fn row_number(r: &str) -> Option<u32> {
    r.trim().parse().ok()
}

fn column_number(r: &str) -> Option<u32> {
    r.parse::<CellRef>().ok().map(|cell| cell.col)
}

/// Pairs each element with its number, read from `attr` with `parse`. Elements without the
/// attribute follow their predecessor, which is how spreadsheet applications number them.
fn numbered<'a, I>(
    elements: I,
    attr: &'a str,
    parse: fn(&str) -> Option<u32>,
) -> impl Iterator<Item = (u32, &'a Element)> + 'a
where
    I: Iterator<Item = &'a Element> + 'a,
{
    let mut previous = 0;
    elements.map(move |e| {
        let n = e.attr(attr).and_then(parse).unwrap_or(previous + 1);
        previous = n;
        (n, e)
    })
}

/// The node index of the `name` child numbered `n`, inserting one built by `make` before the
/// first higher-numbered sibling when it does not exist.
fn position_for(
    parent: &mut Element,
    name: &str,
    attr: &str,
    parse: fn(&str) -> Option<u32>,
    n: u32,
    make: impl FnOnce() -> Element,
) -> usize {
    let mut previous = 0;
    let mut insert_at = None;
    for (ix, node) in parent.children.iter().enumerate() {
        let Node::Element(e) = node else {
            continue;
        };
        if !e.is(name) {
            continue;
        }
        let current = e.attr(attr).and_then(parse).unwrap_or(previous + 1);
        previous = current;
        if current == n {
            return ix;
        }
        if current > n {
            insert_at = Some(ix);
            break;
        }
    }
    let ix = insert_at.unwrap_or(parent.children.len());
    parent.children.insert(ix, Node::Element(make()));
    ix
}

fn element_at(parent: &mut Element, ix: usize) -> Res<&mut Element> {
    match parent.children.get_mut(ix) {
        Some(Node::Element(e)) => Ok(e),
        _ => bail!("Expected an element at position {ix}"),
    }
}
