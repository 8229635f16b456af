// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

//! Shared helpers: minimal decks and run configs in a temp workspace.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const SLIDE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Write a deck with one slide per entry, each slide holding one text box
/// per string.
pub fn write_deck(path: &Path, slides: &[&[&str]]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    let mut put = |name: &str, body: String| {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    };

    put(
        "[Content_Types].xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
    );

    let ids: String = (0..slides.len())
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 1))
        .collect();
    put(
        "ppt/presentation.xml",
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#),
    );

    let rels: String = (1..=slides.len())
        .map(|n| {
            format!(r#"<Relationship Id="rId{n}" Type="{SLIDE_REL}" Target="slides/slide{n}.xml"/>"#)
        })
        .collect();
    put(
        "ppt/_rels/presentation.xml.rels",
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}">{rels}</Relationships>"#),
    );

    for (i, texts) in slides.iter().enumerate() {
        let shapes: String = texts
            .iter()
            .enumerate()
            .map(|(j, text)| {
                format!(
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {n}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{t}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                    id = j + 2,
                    n = j + 1,
                    t = escape(text),
                )
            })
            .collect();
        put(
            &format!("ppt/slides/slide{}.xml", i + 1),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld name="Slide {n}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#, n = i + 1),
        );
    }

    zip.finish().unwrap();
}

/// A temp directory holding a prompt deck, a matching shots deck, a
/// context file and an empty `reports/` directory.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// One slide per prompt, each with a single `<GENERATE>` text box.
    pub fn with_prompts(prompts: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let generate: Vec<String> = prompts
            .iter()
            .map(|p| format!("<GENERATE>{p}</GENERATE>"))
            .collect();
        let prompt_slides: Vec<[&str; 1]> = generate.iter().map(|g| [g.as_str()]).collect();
        let prompt_refs: Vec<&[&str]> = prompt_slides.iter().map(|s| s.as_slice()).collect();
        let shot_refs: Vec<&[&str]> = prompts.iter().map(|_| &["An example."][..]).collect();

        write_deck(&dir.path().join("prompts.pptx"), &prompt_refs);
        write_deck(&dir.path().join("shots.pptx"), &shot_refs);
        std::fs::write(dir.path().join("context.txt"), "Company context.\n").unwrap();
        std::fs::create_dir(dir.path().join("reports")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.path().join("reports")
    }

    pub fn reports(&self) -> Vec<PathBuf> {
        let mut reports: Vec<PathBuf> = std::fs::read_dir(self.reports_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        reports.sort();
        reports
    }

    pub fn decoder(&self) -> Value {
        json!({
            "type": "pptx",
            "prompts_path": self.path().join("prompts.pptx"),
            "shots_path": self.path().join("shots.pptx"),
            "context_path": self.path().join("context.txt"),
            "instruction": { "type": "one-shot-with-context" },
        })
    }

    pub fn report_encoder(&self) -> Value {
        json!({ "type": "transparency-report", "report_dir": self.reports_dir() })
    }

    /// Write `bisheng.yaml` using `engine` and a transparency report.
    pub fn write_config(&self, engine: Value) -> PathBuf {
        let config = json!({
            "engine": engine,
            "encoders": [self.report_encoder()],
            "decoder": self.decoder(),
        });
        let path = self.path().join("bisheng.yaml");
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();
        path
    }
}
