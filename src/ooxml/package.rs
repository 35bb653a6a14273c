//! The zip container that `.docx` and `.xlsx` files are made of.
//!
//! A `Package` keeps every part as raw bytes in its original order. Parts that are never edited
//! (styles, themes, media, other worksheets) go back out byte for byte, which is what keeps a
//! template's formatting intact.

use crate::error::Res;
use crate::ooxml::XmlDocument;
use anyhow::Context;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Res<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("The file is not a zip package")?;
        let mut parts = Vec::with_capacity(archive.len());
        for ix in 0..archive.len() {
            let mut file = archive
                .by_index(ix)
                .with_context(|| format!("Unable to read zip entry {ix}"))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .with_context(|| format!("Unable to read package part '{name}'"))?;
            parts.push(Part { name, data });
        }
        Ok(Self { parts })
    }

    pub(crate) fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub(crate) fn xml(&self, name: &str) -> Res<XmlDocument> {
        let part = self
            .parts
            .iter()
            .find(|p| p.name == name)
            .with_context(|| format!("The package has no part '{name}'"))?;
        XmlDocument::parse(&part.data).with_context(|| format!("Unable to parse '{name}'"))
    }

    pub(crate) fn set_xml(&mut self, name: &str, document: &XmlDocument) -> Res<()> {
        let data = document
            .to_bytes()
            .with_context(|| format!("Unable to serialize '{name}'"))?;
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
        Ok(())
    }

    pub(crate) fn to_bytes(&self) -> Res<Vec<u8>> {
        write_zip(self.parts.iter().map(|p| (p.name.as_str(), p.data.as_slice())))
    }
}

/// Writes `entries` (name, contents) into a new deflated zip archive.
pub(crate) fn write_zip<'a, I>(entries: I) -> Res<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        writer
            .start_file(name, options)
            .with_context(|| format!("Unable to add '{name}' to the zip archive"))?;
        writer
            .write_all(data)
            .with_context(|| format!("Unable to write '{name}' to the zip archive"))?;
    }
    let cursor = writer.finish().context("Unable to finish the zip archive")?;
    Ok(cursor.into_inner())
}

/// Resolves a relationship `target` against the folder of the part that owns the relationship,
/// e.g. `worksheets/sheet1.xml` from `xl/workbook.xml` is `xl/worksheets/sheet1.xml`.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// The relationships part for `part`, e.g. `xl/_rels/workbook.xml.rels` for `xl/workbook.xml`.
pub(crate) fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}
