//! Just enough Office Open XML to fill templates: the zip package, an XML element tree, Word body
//! and table editing, and worksheet cell editing.
mod cell_ref;
mod docx;
mod package;
pub(crate) mod xml;
mod xlsx;

pub(crate) use cell_ref::{column_index, column_letters, CellRef};
pub(crate) use docx::WordDocument;
pub(crate) use package::{write_zip, Package};
pub(crate) use xlsx::Workbook;
pub(crate) use xml::{Element, XmlDocument};
