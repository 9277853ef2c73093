//! Minimal in-memory model of a Word (`.docx`) package.
//!
//! A `.docx` is a ZIP archive of XML parts. [`Document`] keeps every entry
//! as raw bytes and parses only `word/document.xml` (plus the style names
//! from `word/styles.xml`). Paragraphs are addressed through
//! [`ParagraphRef`]s so callers can read and edit them without holding
//! borrows across the tree. Saving rewrites `word/document.xml` and copies
//! all other entries unchanged.

pub mod xml;

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use serde::Deserialize;

use crate::highlight::{Background, HighlightColor};
use xml::{Element, Node};

const DOCUMENT_XML: &str = "word/document.xml";
const STYLES_XML: &str = "word/styles.xml";
/// Maximum decompressed bytes to read from a single ZIP entry.
const MAX_ENTRY_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Xml(#[from] xml::XmlError),

    #[error("{0} not found in package")]
    MissingPart(&'static str),

    #[error("ZIP entry {0} exceeds size limit")]
    TooLarge(String),

    #[error("document has no body")]
    NoBody,
}

struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// Which paragraphs an operation looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ContentScope {
    /// Body text, headings and tables.
    #[default]
    All,
    /// Body paragraphs that are not headings.
    Text,
    /// Heading paragraphs in the body.
    Headings,
    /// Paragraphs inside tables.
    Tables,
    /// Headings and tables.
    TablesHeadings,
}

impl ContentScope {
    pub fn covers(self, location: Location, is_heading: bool) -> bool {
        match (self, location) {
            (ContentScope::All, _) => true,
            (ContentScope::Text, Location::Body) => !is_heading,
            (ContentScope::Headings, Location::Body) => is_heading,
            (ContentScope::TablesHeadings, Location::Body) => is_heading,
            (ContentScope::Tables | ContentScope::TablesHeadings, Location::Table) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Body,
    Table,
}

/// Address of a paragraph: child indices from the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphRef {
    path: Vec<usize>,
    pub location: Location,
}

pub struct Document {
    entries: Vec<Entry>,
    root: Element,
    styles: HashMap<String, String>,
}

impl Document {
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            file.take(MAX_ENTRY_BYTES).read_to_end(&mut data)?;
            if data.len() as u64 >= MAX_ENTRY_BYTES {
                return Err(DocxError::TooLarge(name));
            }
            entries.push(Entry { name, data, is_dir });
        }

        let doc_xml = entries
            .iter()
            .find(|e| e.name == DOCUMENT_XML)
            .ok_or(DocxError::MissingPart(DOCUMENT_XML))?;
        let root = xml::parse(&doc_xml.data)?;
        if root.child("w:body").is_none() {
            return Err(DocxError::NoBody);
        }

        let styles = match entries.iter().find(|e| e.name == STYLES_XML) {
            Some(e) => read_style_names(&xml::parse(&e.data)?),
            None => HashMap::new(),
        };

        Ok(Self {
            entries,
            root,
            styles,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for entry in &self.entries {
                if entry.is_dir {
                    zip.add_directory(entry.name.as_str(), options)?;
                    continue;
                }
                zip.start_file(entry.name.as_str(), options)?;
                if entry.name == DOCUMENT_XML {
                    zip.write_all(&xml::to_bytes(&self.root))?;
                } else {
                    zip.write_all(&entry.data)?;
                }
            }
            zip.finish()?;
        }
        Ok(buf)
    }

    /// Write the package to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), DocxError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Display name of a style id, falling back to the id itself.
    pub fn style_name<'a>(&'a self, style_id: &'a str) -> &'a str {
        self.styles
            .get(style_id)
            .map(String::as_str)
            .unwrap_or(style_id)
    }

    /// Paragraphs that are direct children of the body, in order.
    pub fn body_paragraphs(&self) -> Vec<ParagraphRef> {
        let (Some(body_idx), Some(body)) = (self.body_index(), self.body()) else {
            return Vec::new();
        };
        body.children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Element(e) if e.is("w:p")))
            .map(|(i, _)| ParagraphRef {
                path: vec![body_idx, i],
                location: Location::Body,
            })
            .collect()
    }

    /// Paragraphs inside tables, row by row and cell by cell; nested
    /// tables are visited after the paragraphs of their cell.
    pub fn table_paragraphs(&self) -> Vec<ParagraphRef> {
        let mut out = Vec::new();
        let (Some(body_idx), Some(body)) = (self.body_index(), self.body()) else {
            return out;
        };
        for (i, node) in body.children.iter().enumerate() {
            if let Node::Element(tbl) = node {
                if tbl.is("w:tbl") {
                    collect_table(tbl, vec![body_idx, i], &mut out);
                }
            }
        }
        out
    }

    /// Body paragraphs followed by table paragraphs.
    pub fn paragraphs(&self) -> Vec<ParagraphRef> {
        let mut all = self.body_paragraphs();
        all.extend(self.table_paragraphs());
        all
    }

    pub fn paragraph(&self, r: &ParagraphRef) -> Option<Paragraph<'_>> {
        let el = element_at(&self.root, &r.path)?;
        Some(Paragraph { el, doc: self })
    }

    pub fn paragraph_mut(&mut self, r: &ParagraphRef) -> Option<ParagraphMut<'_>> {
        let el = element_at_mut(&mut self.root, &r.path)?;
        Some(ParagraphMut { el })
    }

    /// Remove a body paragraph. References to later body paragraphs are
    /// invalidated; re-read [`Document::body_paragraphs`] afterwards.
    pub fn remove_paragraph(&mut self, r: &ParagraphRef) -> bool {
        let Some((last, parent_path)) = r.path.split_last() else {
            return false;
        };
        match element_at_mut(&mut self.root, parent_path) {
            Some(parent) if *last < parent.children.len() => {
                parent.children.remove(*last);
                true
            }
            _ => false,
        }
    }

    fn body_index(&self) -> Option<usize> {
        self.root
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is("w:body")))
    }

    fn body(&self) -> Option<&Element> {
        self.root.child("w:body")
    }
}

fn collect_table(tbl: &Element, path: Vec<usize>, out: &mut Vec<ParagraphRef>) {
    for (ri, row) in tbl.children.iter().enumerate() {
        let Node::Element(row) = row else { continue };
        if !row.is("w:tr") {
            continue;
        }
        for (ci, cell) in row.children.iter().enumerate() {
            let Node::Element(cell) = cell else { continue };
            if !cell.is("w:tc") {
                continue;
            }
            let cell_path = [path.as_slice(), &[ri, ci]].concat();
            let mut nested = Vec::new();
            for (pi, node) in cell.children.iter().enumerate() {
                let Node::Element(e) = node else { continue };
                let mut p = cell_path.clone();
                p.push(pi);
                if e.is("w:p") {
                    out.push(ParagraphRef {
                        path: p,
                        location: Location::Table,
                    });
                } else if e.is("w:tbl") {
                    nested.push((e, p));
                }
            }
            for (tbl, p) in nested {
                collect_table(tbl, p, out);
            }
        }
    }
}

fn element_at<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    let mut cur = root;
    for &i in path {
        match cur.children.get(i)? {
            Node::Element(e) => cur = e,
            Node::Text(_) => return None,
        }
    }
    Some(cur)
}

fn element_at_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut cur = root;
    for &i in path {
        match cur.children.get_mut(i)? {
            Node::Element(e) => cur = e,
            Node::Text(_) => return None,
        }
    }
    Some(cur)
}

fn read_style_names(styles: &Element) -> HashMap<String, String> {
    styles
        .elements()
        .filter(|s| s.is("w:style"))
        .filter_map(|s| {
            let id = s.attr("w:styleId")?;
            let name = s.child("w:name")?.attr("w:val")?;
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// Deepest heading level Word offers.
pub const MAX_HEADING_LEVEL: u32 = 9;

/// Heading level from a style name: `Heading 2` → 2, `heading` → 1.
///
/// Only the last word counts (`Heading 2 Alt 3` → 3) and the result is
/// clamped to `1..=MAX_HEADING_LEVEL`.
pub fn heading_level(style_name: &str) -> Option<u32> {
    let name = style_name.trim();
    if !name.to_lowercase().starts_with("heading") {
        return None;
    }
    let last = name.split_whitespace().last().unwrap_or_default();
    let digits = &last[last.trim_end_matches(|c: char| c.is_ascii_digit()).len()..];
    let level = if digits.is_empty() {
        1
    } else {
        digits.parse::<u32>().unwrap_or(MAX_HEADING_LEVEL)
    };
    Some(level.clamp(1, MAX_HEADING_LEVEL))
}

/// Read-only view of a paragraph.
pub struct Paragraph<'a> {
    el: &'a Element,
    doc: &'a Document,
}

impl<'a> Paragraph<'a> {
    pub fn style_id(&self) -> Option<&'a str> {
        self.el.child("w:pPr")?.child("w:pStyle")?.attr("w:val")
    }

    pub fn style_name(&self) -> Option<&'a str> {
        self.style_id().map(|id| self.doc.style_name(id))
    }

    pub fn heading_level(&self) -> Option<u32> {
        self.style_name().and_then(heading_level)
    }

    pub fn is_heading(&self) -> bool {
        self.heading_level().is_some()
    }

    pub fn has_drawing(&self) -> bool {
        self.el.contains("w:drawing") || self.el.contains("w:pict")
    }

    pub fn runs(&self) -> Vec<Run> {
        paragraph_runs(self.el)
    }

    pub fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }
}

/// Mutable view of a paragraph.
pub struct ParagraphMut<'a> {
    el: &'a mut Element,
}

impl ParagraphMut<'_> {
    pub fn runs(&self) -> Vec<Run> {
        paragraph_runs(self.el)
    }

    pub fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }

    /// Replace the byte ranges `spans` of the concatenated text of `runs`
    /// with `replacement`.
    ///
    /// `runs` must be this paragraph's runs in order; their text may differ
    /// from the stored text (normalised for matching) as long as the run
    /// count is the same. Only the `w:r` elements a span touches are
    /// rewritten, each in its own place, so hyperlinks, revisions, fields,
    /// bookmarks and untouched runs stay exactly as they were. Spans must be
    /// sorted and non-overlapping; the replacement lands in the run where
    /// its span starts.
    pub fn splice(&mut self, runs: &[Run], spans: &[(usize, usize)], replacement: &[Run]) {
        let slots = run_slots(self.el);
        let edits = splice_slots(runs, spans, replacement);
        for (slot, edit) in slots.iter().zip(edits).rev() {
            if let Some(new_runs) = edit {
                replace_slot(self.el, slot, &new_runs);
            }
        }
    }

    /// Insert text at byte offsets of the paragraph text. Each insertion
    /// joins the run holding the character just before it (the first run
    /// for offset 0) and takes its formatting; other runs are untouched.
    pub fn insert_text(&mut self, inserts: &[(usize, String)]) {
        let mut inserts: Vec<&(usize, String)> = inserts.iter().filter(|(_, t)| !t.is_empty()).collect();
        inserts.sort_by_key(|(at, _)| std::cmp::Reverse(*at));
        for (at, text) in inserts {
            let runs = self.runs();
            let slots = run_slots(self.el);
            let mut start = 0;
            let mut target = None;
            for (i, run) in runs.iter().enumerate() {
                let end = start + run.text.len();
                if !run.text.is_empty() && ((start < *at && *at <= end) || (*at == 0 && start == 0)) {
                    target = Some((i, *at - start));
                    break;
                }
                start = end;
            }
            match target {
                Some((i, local)) => {
                    let run = &runs[i];
                    let mut joined = run.clone();
                    joined.text = format!("{}{}{}", &run.text[..local], text, &run.text[local..]);
                    replace_slot(self.el, &slots[i], &[joined]);
                }
                None => {
                    // Nothing to attach to: add a run formatted like the first one.
                    let props = runs.iter().find_map(|r| r.props.clone());
                    self.el.push(
                        Run {
                            text: text.clone(),
                            props,
                            objects: Vec::new(),
                        }
                        .to_element(),
                    );
                }
            }
        }
    }

    /// Replace the text, formatted like the first run. Runs without text
    /// (drawings, field marks) and non-run content are kept.
    pub fn set_text(&mut self, text: &str) {
        let runs = self.runs();
        let total: usize = runs.iter().map(|r| r.text.len()).sum();
        if total == 0 {
            self.insert_text(&[(0, text.to_string())]);
            return;
        }
        let replacement = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run {
                text: text.to_string(),
                props: runs.iter().find_map(|r| r.props.clone()),
                objects: Vec::new(),
            }]
        };
        self.splice(&runs, &[(0, total)], &replacement);
    }

    /// Apply `format` to every run of the paragraph.
    pub fn apply_format(&mut self, format: &RunFormat) {
        for slot in run_slots(self.el) {
            if let Some(run) = element_at_mut(self.el, &slot) {
                format.apply_to(ensure_rpr(run));
            }
        }
    }

    /// Drop direct font, size, bold, italic and colour so the paragraph
    /// style shows through.
    pub fn clear_direct_format(&mut self) {
        for slot in run_slots(self.el) {
            let Some(run) = element_at_mut(self.el, &slot) else {
                continue;
            };
            if let Some(rpr) = run.child_mut("w:rPr") {
                for name in ["w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:sz", "w:szCs", "w:color"] {
                    rpr.remove_children(name);
                }
            }
        }
    }
}

/// Containers whose runs are not part of the visible paragraph text.
const HIDDEN_CONTAINERS: &[&str] = &["w:pPr", "w:del", "w:moveFrom", "w:sdtPr", "w:sdtEndPr", "mc:Fallback"];

/// Paths (child indices from the paragraph) of every visible `w:r`, in
/// document order. Runs nested in hyperlinks, insertions, smart tags,
/// simple fields and content controls are included.
fn run_slots(p: &Element) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    collect_run_slots(p, &mut Vec::new(), &mut out);
    out
}

fn collect_run_slots(el: &Element, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, node) in el.children.iter().enumerate() {
        let Node::Element(child) = node else { continue };
        path.push(i);
        if child.is("w:r") {
            out.push(path.clone());
        } else if !HIDDEN_CONTAINERS.contains(&child.name.as_str()) {
            collect_run_slots(child, path, out);
        }
        path.pop();
    }
}

/// Swap the `w:r` at `slot` for `runs` (possibly none).
fn replace_slot(p: &mut Element, slot: &[usize], runs: &[Run]) {
    let Some((last, parent_path)) = slot.split_last() else {
        return;
    };
    let Some(parent) = element_at_mut(p, parent_path) else {
        return;
    };
    if *last >= parent.children.len() {
        return;
    }
    let nodes: Vec<Node> = runs.iter().map(|r| Node::Element(r.to_element())).collect();
    parent.children.splice(*last..=*last, nodes);
}

fn ensure_rpr(run: &mut Element) -> &mut Element {
    if run.child("w:rPr").is_none() {
        run.prepend(Element::new("w:rPr"));
    }
    run.ensure_child("w:rPr")
}

fn paragraph_runs(p: &Element) -> Vec<Run> {
    run_slots(p)
        .iter()
        .filter_map(|slot| element_at(p, slot))
        .map(Run::from_element)
        .collect()
}

/// A run of uniformly formatted text.
///
/// `props` is the original `w:rPr` element, carried over verbatim so
/// untouched text keeps its exact formatting. `objects` holds non-text run
/// content such as drawings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Run {
    pub text: String,
    pub props: Option<Element>,
    pub objects: Vec<Element>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, format: &RunFormat) -> Self {
        let mut rpr = Element::new("w:rPr");
        format.apply_to(&mut rpr);
        Self {
            text: text.into(),
            props: Some(rpr),
            objects: Vec::new(),
        }
    }

    /// Same formatting as `self`, different text, no objects.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            props: self.props.clone(),
            objects: Vec::new(),
        }
    }

    pub fn format(&self) -> RunFormat {
        self.props
            .as_ref()
            .map(RunFormat::from_rpr)
            .unwrap_or_default()
    }

    fn from_element(r: &Element) -> Self {
        let mut run = Run::default();
        for child in r.elements() {
            match child.name.as_str() {
                "w:rPr" => run.props = Some(child.clone()),
                "w:t" => run.text.push_str(&child.text()),
                "w:tab" => run.text.push('\t'),
                "w:br" | "w:cr" => run.text.push('\n'),
                "w:noBreakHyphen" => run.text.push('\u{2011}'),
                "w:drawing" | "w:pict" | "w:object" => run.objects.push(child.clone()),
                _ => {}
            }
        }
        run
    }

    fn to_element(&self) -> Element {
        let mut r = Element::new("w:r");
        if let Some(props) = &self.props {
            r.push(props.clone());
        }
        for obj in &self.objects {
            r.push(obj.clone());
        }
        let mut pending = String::new();
        for ch in self.text.chars() {
            match ch {
                '\t' | '\n' => {
                    flush_text(&mut r, &mut pending);
                    r.push(Element::new(if ch == '\t' { "w:tab" } else { "w:br" }));
                }
                _ => pending.push(ch),
            }
        }
        flush_text(&mut r, &mut pending);
        r
    }
}

fn flush_text(r: &mut Element, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    r.push(
        Element::new("w:t")
            .with_attr("xml:space", "preserve")
            .with_text(std::mem::take(pending)),
    );
}

/// Character formatting of a run. `None` means "not set on the run".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunFormat {
    pub font: Option<String>,
    pub size_pt: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    /// `RRGGBB` without `#`.
    pub color: Option<String>,
    pub highlight: Option<HighlightColor>,
    /// `RRGGBB` shading fill without `#`.
    pub shading: Option<String>,
}

impl RunFormat {
    pub fn is_empty(&self) -> bool {
        *self == RunFormat::default()
    }

    /// Set highlight or shading from a background colour.
    pub fn with_background(mut self, background: Option<Background>) -> Self {
        match background {
            Some(Background::Highlight(c)) => self.highlight = Some(c),
            Some(Background::Shading(fill)) => self.shading = Some(fill),
            None => {}
        }
        self
    }

    pub fn from_rpr(rpr: &Element) -> Self {
        let toggle = |name: &str| {
            rpr.child(name)
                .map(|e| !matches!(e.attr("w:val"), Some("0" | "false" | "off")))
        };
        RunFormat {
            font: rpr
                .child("w:rFonts")
                .and_then(|f| f.attr("w:ascii").or_else(|| f.attr("w:hAnsi")))
                .map(str::to_string),
            size_pt: rpr
                .child("w:sz")
                .and_then(|s| s.attr("w:val"))
                .and_then(|v| v.parse::<f32>().ok())
                .map(|half| half / 2.0),
            bold: toggle("w:b"),
            italic: toggle("w:i"),
            underline: rpr
                .child("w:u")
                .map(|u| !matches!(u.attr("w:val"), Some("none"))),
            color: rpr
                .child("w:color")
                .and_then(|c| c.attr("w:val"))
                .map(str::to_string),
            highlight: rpr
                .child("w:highlight")
                .and_then(|h| h.attr("w:val"))
                .and_then(HighlightColor::from_ooxml),
            shading: rpr
                .child("w:shd")
                .and_then(|s| s.attr("w:fill"))
                .map(str::to_string),
        }
    }

    /// Write the set fields into `rpr`, leaving other properties alone.
    pub fn apply_to(&self, rpr: &mut Element) {
        if let Some(font) = &self.font {
            let fonts = rpr.ensure_child("w:rFonts");
            for key in ["w:ascii", "w:hAnsi", "w:eastAsia", "w:cs"] {
                fonts.set_attr(key, font.as_str());
            }
        }
        if let Some(size) = self.size_pt {
            let half = ((size * 2.0).round() as i64).max(1).to_string();
            rpr.ensure_child("w:sz").set_attr("w:val", half.as_str());
            rpr.ensure_child("w:szCs").set_attr("w:val", half);
        }
        set_toggle(rpr, "w:b", self.bold);
        set_toggle(rpr, "w:i", self.italic);
        if let Some(u) = self.underline {
            rpr.ensure_child("w:u")
                .set_attr("w:val", if u { "single" } else { "none" });
        }
        if let Some(color) = &self.color {
            rpr.ensure_child("w:color").set_attr("w:val", color.as_str());
        }
        match self.highlight {
            Some(HighlightColor::None) => rpr.remove_children("w:highlight"),
            Some(c) => rpr
                .ensure_child("w:highlight")
                .set_attr("w:val", c.ooxml_value()),
            None => {}
        }
        if let Some(fill) = &self.shading {
            let shd = rpr.ensure_child("w:shd");
            shd.set_attr("w:val", "clear");
            shd.set_attr("w:color", "auto");
            shd.set_attr("w:fill", fill.as_str());
        }
        sort_rpr(rpr);
    }
}

fn set_toggle(rpr: &mut Element, name: &str, value: Option<bool>) {
    match value {
        Some(true) => {
            let el = rpr.ensure_child(name);
            el.attrs.retain(|(k, _)| k != "w:val");
        }
        Some(false) => rpr.ensure_child(name).set_attr("w:val", "0"),
        None => {}
    }
}

/// Order of `w:rPr` children required by the schema (subset we touch).
const RPR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps", "w:smallCaps",
    "w:strike", "w:dstrike", "w:outline", "w:shadow", "w:emboss", "w:imprint",
    "w:noProof", "w:snapToGrid", "w:vanish", "w:webHidden", "w:color", "w:spacing",
    "w:w", "w:kern", "w:position", "w:sz", "w:szCs", "w:highlight", "w:u", "w:effect",
    "w:bdr", "w:shd", "w:fitText", "w:vertAlign", "w:rtl", "w:cs", "w:em", "w:lang",
    "w:eastAsianLayout", "w:specVanish", "w:oMath",
];

fn sort_rpr(rpr: &mut Element) {
    let rank = |n: &Node| match n {
        Node::Element(e) => RPR_ORDER
            .iter()
            .position(|name| *name == e.name)
            .unwrap_or(RPR_ORDER.len()),
        Node::Text(_) => RPR_ORDER.len(),
    };
    rpr.children.sort_by_key(rank);
}

/// New content for each run when the byte ranges `spans` of the runs'
/// concatenated text become `replacement`. `None` leaves a run untouched;
/// runs without text are never touched.
fn splice_slots(runs: &[Run], spans: &[(usize, usize)], replacement: &[Run]) -> Vec<Option<Vec<Run>>> {
    let mut out = Vec::with_capacity(runs.len());
    let mut start = 0;
    for run in runs {
        let end = start + run.text.len();
        out.push(splice_one(run, start, end, spans, replacement));
        start = end;
    }
    out
}

fn splice_one(
    run: &Run,
    start: usize,
    end: usize,
    spans: &[(usize, usize)],
    replacement: &[Run],
) -> Option<Vec<Run>> {
    if start == end {
        return None;
    }
    let touching: Vec<(usize, usize)> = spans
        .iter()
        .copied()
        .filter(|&(s, e)| s < end && (e > start || s >= start))
        .collect();
    if touching.is_empty() {
        return None;
    }

    let mut pieces = Vec::new();
    if !run.objects.is_empty() {
        pieces.push(Run {
            text: String::new(),
            props: run.props.clone(),
            objects: run.objects.clone(),
        });
    }
    let mut cursor = start;
    for (s, e) in touching {
        if s > cursor {
            pieces.push(run.with_text(&run.text[cursor - start..s - start]));
        }
        if s >= start {
            pieces.extend(replacement.iter().cloned());
        }
        cursor = cursor.max(e.min(end));
    }
    if cursor < end {
        pieces.push(run.with_text(&run.text[cursor - start..]));
    }
    pieces.retain(|r| !r.text.is_empty() || !r.objects.is_empty());
    Some(pieces)
}
