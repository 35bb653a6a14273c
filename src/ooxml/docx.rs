//! Editing of the main document part of a `.docx` package.
//!
//! Table cells are addressed by grid column the way Word lays them out, so a cell that spans two
//! grid columns answers for both of them.

use crate::error::Res;
use crate::ooxml::xml::Node;
use crate::ooxml::{Element, Package, XmlDocument};
use anyhow::{bail, Context};
use tracing::trace;

const DOCUMENT_PART: &str = "word/document.xml";
const DEFAULT_GRID_COL_WIDTH: &str = "1000";

/// Schema order of the children of `w:pPr`.
const P_PR_ORDER: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

/// Schema order of the children of `w:tcPr`.
const TC_PR_ORDER: &[&str] = &[
    "cnfStyle",
    "tcW",
    "gridSpan",
    "hMerge",
    "vMerge",
    "tcBorders",
    "shd",
    "noWrap",
    "tcMar",
    "textDirection",
    "tcFitText",
    "vAlign",
    "hideMark",
    "headers",
    "cellIns",
    "cellDel",
    "cellMerge",
    "tcPrChange",
];

/// A `.docx` package with its main document part parsed.
#[derive(Debug, Clone)]
pub(crate) struct WordDocument {
    package: Package,
    document: XmlDocument,
}

impl WordDocument {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Res<Self> {
        let package = Package::from_bytes(bytes).context("Unable to open the Word document")?;
        let document = package.xml(DOCUMENT_PART)?;
        if document.root.child("body").is_none() {
            bail!("The Word document has no body");
        }
        Ok(Self { package, document })
    }

    fn body_mut(&mut self) -> Option<&mut Element> {
        self.document.root.child_mut("body")
    }

    /// Replaces each `(token, value)` pair inside the text of every run of every body paragraph.
    /// A run is the unit of replacement: a token that is split across runs stays as it is.
    /// Returns the number of runs that changed.
    pub(crate) fn replace_placeholders(&mut self, replacements: &[(&str, String)]) -> usize {
        let Some(body) = self.body_mut() else {
            return 0;
        };
        let mut changed = 0;
        for p in body.children_named_mut("p") {
            for run in p.children_named_mut("r") {
                if replace_in_run(run, replacements) {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// The first table directly inside the body.
    pub(crate) fn first_table_mut(&mut self) -> Option<WordTable<'_>> {
        self.body_mut()?
            .child_mut("tbl")
            .map(|tbl| WordTable { tbl })
    }

    pub(crate) fn to_bytes(&mut self) -> Res<Vec<u8>> {
        self.package.set_xml(DOCUMENT_PART, &self.document)?;
        self.package.to_bytes()
    }
}

fn replace_in_run(run: &mut Element, replacements: &[(&str, String)]) -> bool {
    let original: String = run.children_named("t").map(|t| t.text()).collect();
    if original.is_empty() {
        return false;
    }
    let mut replaced = original.clone();
    for (token, value) in replacements {
        replaced = replaced.replace(token, value);
    }
    if replaced == original {
        return false;
    }
    trace!("Replaced '{original}' with '{replaced}'");

    // The whole run text goes into the first w:t, the others are dropped.
    let mut seen_first = false;
    run.children.retain_mut(|node| match node {
        Node::Element(e) if e.is("t") => {
            if seen_first {
                return false;
            }
            seen_first = true;
            e.set_attr("xml:space", "preserve");
            e.set_text(replaced.as_str());
            true
        }
        _ => true,
    });
    true
}

/// A mutable view of one `w:tbl` element.
#[derive(Debug)]
pub(crate) struct WordTable<'a> {
    tbl: &'a mut Element,
}

impl WordTable<'_> {
    /// The number of grid columns. Tables without a `w:tblGrid` are measured by their widest row.
    pub(crate) fn grid_len(&self) -> usize {
        match self.tbl.child("tblGrid") {
            Some(grid) => grid.children_named("gridCol").count(),
            None => self
                .tbl
                .children_named("tr")
                .map(row_span)
                .max()
                .unwrap_or_default(),
        }
    }

    pub(crate) fn row_count(&self) -> usize {
        self.tbl.children_named("tr").count()
    }

    /// Width of each grid column, as written in the `w:w` attribute of `w:gridCol`.
    fn grid_widths(&self) -> Vec<Option<String>> {
        match self.tbl.child("tblGrid") {
            Some(grid) => grid
                .children_named("gridCol")
                .map(|c| c.attr_local("w").map(str::to_string))
                .collect(),
            None => vec![None; self.grid_len()],
        }
    }

    /// Appends a grid column and gives every existing row one more cell for it.
    pub(crate) fn add_column(&mut self) {
        let width = self
            .grid_widths()
            .into_iter()
            .last()
            .flatten()
            .unwrap_or_else(|| DEFAULT_GRID_COL_WIDTH.to_string());
        let grid_name = self.tbl.sibling_name("tblGrid");
        let grid_col_name = self.tbl.sibling_name("gridCol");
        let w_name = self.tbl.sibling_name("w");
        let grid = self
            .tbl
            .ensure_child(&grid_name, &["tblPr", "tblGrid", "tblPrEx", "tr"]);
        grid.push(Element::new(grid_col_name).with_attr(w_name, width.as_str()));

        let cell = self.new_cell(Some(width.as_str()));
        for tr in self.tbl.children_named_mut("tr") {
            tr.push(cell.clone());
        }
    }

    /// Appends a row with one empty cell per grid column and returns its index.
    pub(crate) fn add_row(&mut self) -> usize {
        let mut tr = Element::new(self.tbl.sibling_name("tr"));
        for width in self.grid_widths() {
            tr.push(self.new_cell(width.as_deref()));
        }
        self.tbl.push(tr);
        self.row_count() - 1
    }

    fn new_cell(&self, width: Option<&str>) -> Element {
        let mut tc = Element::new(self.tbl.sibling_name("tc"));
        if let Some(width) = width {
            let tc_w = Element::new(self.tbl.sibling_name("tcW"))
                .with_attr(self.tbl.sibling_name("w"), width)
                .with_attr(self.tbl.sibling_name("type"), "dxa");
            tc.push(Element::new(self.tbl.sibling_name("tcPr")).with_child(tc_w));
        }
        tc.push(Element::new(self.tbl.sibling_name("p")));
        tc
    }

    fn row_mut(&mut self, row: usize) -> Res<&mut Element> {
        self.tbl
            .children_named_mut("tr")
            .nth(row)
            .with_context(|| format!("The table has no row {row}"))
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Res<&mut Element> {
        let tr = self.row_mut(row)?;
        let mut start = 0;
        for tc in tr.children_named_mut("tc") {
            let end = start + grid_span(tc);
            if col < end {
                return Ok(tc);
            }
            start = end;
        }
        bail!("Row {row} of the table has no cell in column {col}")
    }

    /// Replaces the content of a cell with `text`. Cell properties, the first paragraph's
    /// properties and the first run's properties are kept so the template's formatting survives.
    pub(crate) fn set_cell_text(&mut self, row: usize, col: usize, text: &str) -> Res<()> {
        let tc = self.cell_mut(row, col)?;
        let p_name = tc.sibling_name("p");
        let r_name = tc.sibling_name("r");
        let t_name = tc.sibling_name("t");

        let first_p = tc.child("p");
        let p_pr = first_p.and_then(|p| p.child("pPr")).cloned();
        let r_pr = first_p
            .and_then(|p| p.child("r"))
            .and_then(|r| r.child("rPr"))
            .cloned();

        tc.children
            .retain(|n| matches!(n, Node::Element(e) if e.is("tcPr")));

        let mut p = Element::new(p_name);
        if let Some(p_pr) = p_pr {
            p.push(p_pr);
        }
        let mut r = Element::new(r_name);
        if let Some(r_pr) = r_pr {
            r.push(r_pr);
        }
        if !text.is_empty() {
            r.push(
                Element::new(t_name)
                    .with_attr("xml:space", "preserve")
                    .with_text(text),
            );
        }
        p.push(r);
        tc.push(p);
        Ok(())
    }

    /// Merges grid columns `[start, end)` of `row` into the cell that holds `start`. The merged
    /// cell is as wide as the grid columns it spans.
    pub(crate) fn merge_cells(&mut self, row: usize, start: usize, end: usize) -> Res<()> {
        if end <= start + 1 {
            return Ok(());
        }
        let grid_widths = self.grid_widths();
        let tr = self.row_mut(row)?;

        let mut first_ix = None;
        let mut first_col = 0;
        let mut span = 0;
        let mut doomed = Vec::new();
        let mut col = 0;
        for (ix, node) in tr.children.iter().enumerate() {
            let Node::Element(tc) = node else { continue };
            if !tc.is("tc") {
                continue;
            }
            let width = grid_span(tc);
            if col + width > start && col < end {
                match first_ix {
                    None => {
                        first_ix = Some(ix);
                        first_col = col;
                    }
                    Some(_) => doomed.push(ix),
                }
                span += width;
            }
            col += width;
        }
        let first_ix = first_ix
            .with_context(|| format!("Row {row} of the table has no cell in column {start}"))?;
        if col < end {
            bail!("Cannot merge columns {start}..{end}, row {row} only spans {col} columns");
        }

        for ix in doomed.into_iter().rev() {
            tr.children.remove(ix);
        }
        let Node::Element(tc) = &mut tr.children[first_ix] else {
            bail!("Merge target is not a cell");
        };
        let tc_pr_name = tc.sibling_name("tcPr");
        let span_name = tc.sibling_name("gridSpan");
        let val_name = tc.sibling_name("val");
        let tc_w_name = tc.sibling_name("tcW");
        let w_name = tc.sibling_name("w");
        let type_name = tc.sibling_name("type");
        let tc_pr = tc.ensure_first_child(&tc_pr_name);
        tc_pr.insert_ordered(
            Element::new(span_name).with_attr(val_name, span.to_string()),
            TC_PR_ORDER,
        );
        if let Some(width) = spanned_width(&grid_widths, first_col, first_col + span) {
            tc_pr.insert_ordered(
                Element::new(tc_w_name)
                    .with_attr(w_name, width.to_string())
                    .with_attr(type_name, "dxa"),
                TC_PR_ORDER,
            );
        }
        Ok(())
    }

    /// Right-aligns the first paragraph in a cell.
    pub(crate) fn align_right(&mut self, row: usize, col: usize) -> Res<()> {
        let tc = self.cell_mut(row, col)?;
        let p_name = tc.sibling_name("p");
        let p_pr_name = tc.sibling_name("pPr");
        let jc_name = tc.sibling_name("jc");
        let val_name = tc.sibling_name("val");

        if tc.child("p").is_none() {
            tc.push(Element::new(p_name));
        }
        let p = tc.child_mut("p").context("The cell has no paragraph")?;
        p.ensure_first_child(&p_pr_name).insert_ordered(
            Element::new(jc_name).with_attr(val_name, "right"),
            P_PR_ORDER,
        );
        Ok(())
    }

    /// The text of the cell at grid column `col` of `row`, paragraphs joined by newlines.
    #[cfg(test)]
    pub(crate) fn cell_text(&mut self, row: usize, col: usize) -> Res<String> {
        let tc = self.cell_mut(row, col)?;
        Ok(tc
            .children_named("p")
            .map(|p| {
                p.children_named("r")
                    .flat_map(|r| r.children_named("t"))
                    .map(|t| t.text())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// The number of `w:tc` elements in `row`.
    #[cfg(test)]
    pub(crate) fn physical_cells(&mut self, row: usize) -> Res<usize> {
        Ok(self.row_mut(row)?.children_named("tc").count())
    }
}

fn grid_span(tc: &Element) -> usize {
    tc.child("tcPr")
        .and_then(|pr| pr.child("gridSpan"))
        .and_then(|span| span.attr_local("val"))
        .and_then(|val| val.parse().ok())
        .filter(|span| *span > 0)
        .unwrap_or(1)
}

/// The summed width of grid columns `[start, end)`, `None` unless every one of them has a width.
fn spanned_width(widths: &[Option<String>], start: usize, end: usize) -> Option<u64> {
    widths
        .get(start..end)?
        .iter()
        .map(|w| w.as_deref().and_then(|w| w.trim().parse::<u64>().ok()))
        .sum()
}

fn row_span(tr: &Element) -> usize {
    tr.children_named("tc").map(grid_span).sum()
}
