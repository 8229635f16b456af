// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Builds small decks for tests. Only the parts [`Deck`](super::Deck)
//! reads are written; layouts and masters are left out.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const SLIDE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const NOTES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

enum FixtureShape {
    Text(String),
    Picture,
}

pub(crate) struct FixtureSlide {
    name: String,
    shapes: Vec<FixtureShape>,
    notes: Option<String>,
}

impl FixtureSlide {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shapes: Vec::new(),
            notes: None,
        }
    }

    pub(crate) fn text(mut self, text: &str) -> Self {
        self.shapes.push(FixtureShape::Text(text.to_string()));
        self
    }

    pub(crate) fn picture(mut self) -> Self {
        self.shapes.push(FixtureShape::Picture);
        self
    }

    pub(crate) fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn text_body(text: &str) -> String {
    let paragraphs: String = text
        .split('\n')
        .map(|line| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", escape(line)))
        .collect();
    format!("<p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody>")
}

fn shape_xml(index: usize, shape: &FixtureShape) -> String {
    let id = index + 2;
    match shape {
        FixtureShape::Text(text) => format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {n}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/>{body}</p:sp>"#,
            n = index + 1,
            body = text_body(text),
        ),
        FixtureShape::Picture => format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {n}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>"#,
            n = index + 1,
        ),
    }
}

fn slide_xml(slide: &FixtureSlide) -> String {
    let shapes: String = slide
        .shapes
        .iter()
        .enumerate()
        .map(|(i, s)| shape_xml(i, s))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld name="{name}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#,
        name = escape(&slide.name),
    )
}

fn notes_xml(notes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>{body}</p:sp></p:spTree></p:cSld></p:notes>"#,
        body = text_body(notes),
    )
}

/// Write a deck with `slides` in order to `path`.
pub(crate) fn write_deck(path: &Path, slides: &[FixtureSlide]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    let mut put = |name: &str, body: String| {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    };

    put(
        "[Content_Types].xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#
            .to_string(),
    );

    let ids: String = (0..slides.len())
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 1))
        .collect();
    put(
        "ppt/presentation.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
        ),
    );

    let rels: String = (0..slides.len())
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="{SLIDE_REL}" Target="slides/slide{}.xml"/>"#,
                i + 1,
                i + 1
            )
        })
        .collect();
    put(
        "ppt/_rels/presentation.xml.rels",
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}">{rels}</Relationships>"#),
    );

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        put(&format!("ppt/slides/slide{n}.xml"), slide_xml(slide));
        if let Some(notes) = &slide.notes {
            put(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{NOTES_REL}" Target="../notesSlides/notesSlide{n}.xml"/></Relationships>"#
                ),
            );
            put(&format!("ppt/notesSlides/notesSlide{n}.xml"), notes_xml(notes));
        }
    }

    zip.finish().unwrap();
}
