// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reading and editing PowerPoint (`.pptx`) decks.
//!
//! A deck is held in memory as its package parts. Slides are listed in
//! presentation order from `ppt/presentation.xml`. The shapes of a slide
//! are the top-level children of its shape tree, indexed from zero; only
//! plain shapes (`p:sp`) carry text. Edits re-serialize the touched part and
//! [`Deck::save`] writes the whole package back atomically.

mod xml;

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub use xml::{Element, Node};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const NOTES_SLIDE_REL: &str = "/notesSlide";
const NOTES_MASTER_REL: &str = "/notesMaster";
const REL_TYPE_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NOTES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    ("xmlns:r", REL_TYPE_BASE),
    ("xmlns:p", "http://schemas.openxmlformats.org/presentationml/2006/main"),
];
const SHAPE_TREE_PROPS: &[&str] = &["p:nvGrpSpPr", "p:grpSpPr", "p:extLst"];

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("cannot access deck {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid deck package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("deck part {0} is missing")]
    MissingPart(String),

    #[error("cannot parse deck part {part}: {message}")]
    Xml { part: String, message: String },

    #[error("slide {index} is out of range; the deck has {count} slides")]
    SlideOutOfRange { index: usize, count: usize },

    #[error("shape {shape} is out of range on slide {slide}; it has {count} shapes")]
    ShapeOutOfRange {
        slide: usize,
        shape: usize,
        count: usize,
    },

    #[error("shape {shape} on slide {slide} cannot hold text")]
    NoTextFrame { slide: usize, shape: usize },
}

/// A top-level shape on a slide.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub index: usize,
    pub id: u32,
    pub name: String,
    /// Paragraphs joined by `\n`; `None` for shapes without a text frame
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slide {
    pub index: usize,
    pub id: u32,
    pub name: String,
    pub shapes: Vec<Shape>,
}

#[derive(Clone, Debug)]
struct SlideRef {
    id: u32,
    part: String,
    notes_part: Option<String>,
}

/// An opened deck.
pub struct Deck {
    path: PathBuf,
    parts: Vec<(String, Vec<u8>)>,
    slides: Vec<SlideRef>,
}

impl Deck {
    /// Read the package at `path` and index its slides.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| DeckError::Io {
            path: path.clone(),
            source,
        })?;
        let mut archive = ZipArchive::new(file)?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|source| DeckError::Io {
                    path: path.clone(),
                    source,
                })?;
            parts.push((entry.name().to_string(), data));
        }

        let mut deck = Self {
            path,
            parts,
            slides: Vec::new(),
        };
        deck.slides = deck.index_slides()?;
        tracing::debug!(path = %deck.path.display(), slides = deck.slides.len(), "opened deck");
        Ok(deck)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Parse slide `index` into its shapes.
    pub fn slide(&self, index: usize) -> Result<Slide, DeckError> {
        let slide_ref = self.slide_ref(index)?;
        let root = self.parse_part(&slide_ref.part)?;
        let c_sld = root.child("p:cSld");
        let name = c_sld
            .and_then(|c| c.attr("name"))
            .unwrap_or_default()
            .to_string();
        let shapes = c_sld
            .and_then(|c| c.child("p:spTree"))
            .map(|tree| {
                shape_elements(tree)
                    .enumerate()
                    .map(|(i, el)| read_shape(i, el))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Slide {
            index,
            id: slide_ref.id,
            name,
            shapes,
        })
    }

    /// Text of the notes body of slide `index`, if it has notes.
    pub fn notes_text(&self, index: usize) -> Result<Option<String>, DeckError> {
        let Some(notes_part) = self.slide_ref(index)?.notes_part.clone() else {
            return Ok(None);
        };
        let root = self.parse_part(&notes_part)?;
        Ok(notes_body(&root).map(|sp| {
            sp.child("p:txBody")
                .map(text_body_text)
                .unwrap_or_default()
        }))
    }

    /// Replace the text of a shape, one paragraph per line.
    pub fn set_shape_text(
        &mut self,
        slide: usize,
        shape: usize,
        text: &str,
    ) -> Result<(), DeckError> {
        self.edit_shape(slide, shape, |sp| {
            if let Some(body) = ensure_text_body(sp) {
                set_text_body(body, text);
            }
        })
    }

    /// Add one paragraph at the end of a shape's text, sized in points.
    pub fn append_shape_paragraph(
        &mut self,
        slide: usize,
        shape: usize,
        text: &str,
        size_pt: u32,
    ) -> Result<(), DeckError> {
        let props = Element::new("a:pPr")
            .with_child(Element::new("a:defRPr").with_attr("sz", (size_pt * 100).to_string()));
        self.edit_shape(slide, shape, |sp| {
            if let Some(body) = ensure_text_body(sp) {
                body.children
                    .push(Node::Element(paragraph(Some(props), text)));
            }
        })
    }

    /// Append `text` to the notes of slide `index`, creating the notes page
    /// or its body placeholder when the slide has none.
    pub fn append_notes(&mut self, index: usize, text: &str) -> Result<(), DeckError> {
        let notes_part = self.ensure_notes(index)?;
        let mut root = self.parse_part(&notes_part)?;
        let tree = root
            .child_mut("p:cSld")
            .and_then(|c| c.child_mut("p:spTree"))
            .ok_or_else(|| DeckError::Xml {
                part: notes_part.clone(),
                message: "notes page has no shape tree".to_string(),
            })?;
        if !tree.elements().any(|e| e.name == "p:sp" && is_body_placeholder(e)) {
            let id = next_shape_id(tree);
            tree.children.push(Node::Element(notes_placeholder(id)));
        }
        if let Some(body) = notes_body_mut(&mut root).and_then(ensure_text_body) {
            let combined = format!("{}{text}", text_body_text(body));
            set_text_body(body, &combined);
        }
        self.store_part(&notes_part, &root)
    }

    /// Name of the notes part of slide `index`, adding an empty notes page
    /// to the package when the slide has none.
    fn ensure_notes(&mut self, index: usize) -> Result<String, DeckError> {
        let slide_ref = self.slide_ref(index)?;
        if let Some(part) = &slide_ref.notes_part {
            return Ok(part.clone());
        }
        let slide_part = slide_ref.part.clone();
        let notes_part = (1..)
            .map(|n| format!("ppt/notesSlides/notesSlide{n}.xml"))
            .find(|name| self.part(name).is_none())
            .unwrap_or_default();

        let master = self
            .relationships(PRESENTATION_PART)?
            .into_iter()
            .find(|(_, kind, _)| kind.ends_with(NOTES_MASTER_REL))
            .map(|(_, _, target)| target);
        let mut notes_rels = relationships_root();
        add_relationship(&mut notes_rels, "slide", &slide_part);
        if let Some(master) = &master {
            add_relationship(&mut notes_rels, "notesMaster", master);
        }
        self.store_part(&rels_part_name(&notes_part), &notes_rels)?;
        self.store_part(&notes_part, &empty_notes_page())?;

        let slide_rels_part = rels_part_name(&slide_part);
        let mut slide_rels = match self.part(&slide_rels_part) {
            Some(_) => self.parse_part(&slide_rels_part)?,
            None => relationships_root(),
        };
        add_relationship(&mut slide_rels, "notesSlide", &notes_part);
        self.store_part(&slide_rels_part, &slide_rels)?;

        let mut types = self.parse_part(CONTENT_TYPES_PART)?;
        types.children.push(Node::Element(
            Element::new("Override")
                .with_attr("PartName", format!("/{notes_part}"))
                .with_attr("ContentType", NOTES_CONTENT_TYPE),
        ));
        self.store_part(CONTENT_TYPES_PART, &types)?;

        tracing::debug!(slide = index, part = %notes_part, "created notes page");
        if let Some(slide_ref) = self.slides.get_mut(index) {
            slide_ref.notes_part = Some(notes_part.clone());
        }
        Ok(notes_part)
    }

    /// Write the deck back to the file it was opened from.
    pub fn save(&self) -> Result<(), DeckError> {
        self.save_as(&self.path)
    }

    /// Write the deck to `path`, replacing it atomically.
    pub fn save_as(&self, path: &Path) -> Result<(), DeckError> {
        let io_err = |source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = ZipWriter::new(tmp.as_file_mut());
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, data) in &self.parts {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(data).map_err(io_err)?;
            }
            writer.finish()?;
        }
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        tracing::debug!(path = %path.display(), "saved deck");
        Ok(())
    }

    fn slide_ref(&self, index: usize) -> Result<&SlideRef, DeckError> {
        self.slides.get(index).ok_or(DeckError::SlideOutOfRange {
            index,
            count: self.slides.len(),
        })
    }

    fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    fn parse_part(&self, name: &str) -> Result<Element, DeckError> {
        let data = self
            .part(name)
            .ok_or_else(|| DeckError::MissingPart(name.to_string()))?;
        let text = String::from_utf8_lossy(data);
        xml::parse(&text).map_err(|message| DeckError::Xml {
            part: name.to_string(),
            message,
        })
    }

    fn store_part(&mut self, name: &str, root: &Element) -> Result<(), DeckError> {
        let data = xml::write(root).map_err(|message| DeckError::Xml {
            part: name.to_string(),
            message,
        })?;
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
        Ok(())
    }

    /// Relationship id → target part for the part `source`.
    fn relationships(&self, source: &str) -> Result<Vec<(String, String, String)>, DeckError> {
        let rels = rels_part_name(source);
        if self.part(&rels).is_none() {
            return Ok(Vec::new());
        }
        let root = self.parse_part(&rels)?;
        Ok(root
            .elements()
            .filter(|e| e.name == "Relationship")
            .filter_map(|e| {
                let id = e.attr("Id")?.to_string();
                let kind = e.attr("Type").unwrap_or_default().to_string();
                let target = resolve_target(source, e.attr("Target")?);
                Some((id, kind, target))
            })
            .collect())
    }

    fn index_slides(&self) -> Result<Vec<SlideRef>, DeckError> {
        let presentation = self.parse_part(PRESENTATION_PART)?;
        let rels = self.relationships(PRESENTATION_PART)?;
        let Some(list) = presentation.child("p:sldIdLst") else {
            return Ok(Vec::new());
        };

        let mut slides = Vec::new();
        for entry in list.elements().filter(|e| e.name == "p:sldId") {
            let id = entry.attr("id").and_then(|v| v.parse().ok()).unwrap_or(0);
            let Some(rid) = entry.attr("r:id") else {
                continue;
            };
            let Some((_, _, part)) = rels.iter().find(|(r, _, _)| r == rid) else {
                return Err(DeckError::MissingPart(format!("slide relationship {rid}")));
            };
            let notes_part = self
                .relationships(part)?
                .into_iter()
                .find(|(_, kind, _)| kind.ends_with(NOTES_SLIDE_REL))
                .map(|(_, _, target)| target);
            slides.push(SlideRef {
                id,
                part: part.clone(),
                notes_part,
            });
        }
        Ok(slides)
    }

    fn edit_shape(
        &mut self,
        slide: usize,
        shape: usize,
        edit: impl FnOnce(&mut Element),
    ) -> Result<(), DeckError> {
        let part = self.slide_ref(slide)?.part.clone();
        let mut root = self.parse_part(&part)?;
        let tree = root
            .child_mut("p:cSld")
            .and_then(|c| c.child_mut("p:spTree"))
            .ok_or_else(|| DeckError::Xml {
                part: part.clone(),
                message: "slide has no shape tree".to_string(),
            })?;
        let count = shape_elements(tree).count();
        let target = tree
            .elements_mut()
            .filter(|e| !SHAPE_TREE_PROPS.contains(&e.name.as_str()))
            .nth(shape)
            .ok_or(DeckError::ShapeOutOfRange {
                slide,
                shape,
                count,
            })?;
        if target.name != "p:sp" {
            return Err(DeckError::NoTextFrame { slide, shape });
        }
        edit(target);
        self.store_part(&part, &root)
    }
}

impl std::fmt::Debug for Deck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deck")
            .field("path", &self.path)
            .field("parts", &self.parts.len())
            .field("slides", &self.slides.len())
            .finish()
    }
}

fn shape_elements(tree: &Element) -> impl Iterator<Item = &Element> {
    tree.elements()
        .filter(|e| !SHAPE_TREE_PROPS.contains(&e.name.as_str()))
}

fn read_shape(index: usize, element: &Element) -> Shape {
    let c_nv_pr = element.find("p:cNvPr");
    let id = c_nv_pr
        .and_then(|c| c.attr("id"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let name = c_nv_pr
        .and_then(|c| c.attr("name"))
        .unwrap_or_default()
        .to_string();
    let text = (element.name == "p:sp")
        .then(|| element.child("p:txBody").map(text_body_text).unwrap_or_default());
    Shape {
        index,
        id,
        name,
        text,
    }
}

fn paragraph_text(p: &Element) -> String {
    let mut out = String::new();
    for child in p.elements() {
        match child.name.as_str() {
            "a:r" | "a:fld" => {
                if let Some(t) = child.child("a:t") {
                    out.push_str(&t.text());
                }
            }
            "a:br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn text_body_text(body: &Element) -> String {
    body.elements()
        .filter(|e| e.name == "a:p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A paragraph whose lines are separated by soft breaks.
fn paragraph(props: Option<Element>, text: &str) -> Element {
    let mut p = Element::new("a:p");
    if let Some(props) = props {
        p = p.with_child(props);
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            p = p.with_child(Element::new("a:br"));
        }
        if !line.is_empty() {
            p = p.with_child(
                Element::new("a:r").with_child(Element::new("a:t").with_text(line)),
            );
        }
    }
    p
}

fn ensure_text_body(sp: &mut Element) -> Option<&mut Element> {
    if sp.child("p:txBody").is_none() {
        sp.children.push(Node::Element(
            Element::new("p:txBody")
                .with_child(Element::new("a:bodyPr"))
                .with_child(Element::new("a:lstStyle")),
        ));
    }
    sp.child_mut("p:txBody")
}

/// Replace every paragraph of a text body, one paragraph per line.
///
/// The first paragraph's properties are kept for all new paragraphs.
fn set_text_body(body: &mut Element, text: &str) {
    let props = body
        .child("a:p")
        .and_then(|p| p.child("a:pPr"))
        .cloned();
    body.remove_children("a:p");
    for line in text.split('\n') {
        body.children
            .push(Node::Element(paragraph(props.clone(), line)));
    }
}

fn is_body_placeholder(sp: &Element) -> bool {
    sp.find("p:ph")
        .and_then(|ph| ph.attr("type"))
        .is_some_and(|t| t == "body")
}

fn notes_body(root: &Element) -> Option<&Element> {
    root.child("p:cSld")?
        .child("p:spTree")?
        .elements()
        .find(|e| e.name == "p:sp" && is_body_placeholder(e))
}

fn notes_body_mut(root: &mut Element) -> Option<&mut Element> {
    root.child_mut("p:cSld")?
        .child_mut("p:spTree")?
        .elements_mut()
        .find(|e| e.name == "p:sp" && is_body_placeholder(e))
}

fn next_shape_id(tree: &Element) -> u32 {
    tree.elements()
        .filter_map(|e| e.find("p:cNvPr"))
        .filter_map(|c| c.attr("id")?.parse::<u32>().ok())
        .max()
        .unwrap_or(1)
        + 1
}

fn notes_placeholder(id: u32) -> Element {
    Element::new("p:sp")
        .with_child(
            Element::new("p:nvSpPr")
                .with_child(
                    Element::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", format!("Notes Placeholder {id}")),
                )
                .with_child(Element::new("p:cNvSpPr"))
                .with_child(
                    Element::new("p:nvPr").with_child(
                        Element::new("p:ph")
                            .with_attr("type", "body")
                            .with_attr("idx", "1"),
                    ),
                ),
        )
        .with_child(Element::new("p:spPr"))
}

fn empty_notes_page() -> Element {
    let group = Element::new("p:nvGrpSpPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", "1")
                .with_attr("name", ""),
        )
        .with_child(Element::new("p:cNvGrpSpPr"))
        .with_child(Element::new("p:nvPr"));
    let tree = Element::new("p:spTree")
        .with_child(group)
        .with_child(Element::new("p:grpSpPr"))
        .with_child(notes_placeholder(2));
    let mut root = Element::new("p:notes")
        .with_child(Element::new("p:cSld").with_child(tree));
    for (key, value) in NAMESPACES {
        root.set_attr(*key, *value);
    }
    root
}

fn relationships_root() -> Element {
    Element::new("Relationships").with_attr("xmlns", RELS_NS)
}

/// Add a relationship of `kind` to the package-absolute `target`.
fn add_relationship(rels: &mut Element, kind: &str, target: &str) {
    let next = rels
        .elements()
        .filter_map(|e| e.attr("Id")?.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    rels.children.push(Node::Element(
        Element::new("Relationship")
            .with_attr("Id", format!("rId{next}"))
            .with_attr("Type", format!("{REL_TYPE_BASE}/{kind}"))
            .with_attr("Target", format!("/{target}")),
    ));
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`
fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the directory of `source`.
fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
#[path = "fixture.rs"]
pub(crate) mod fixture;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
