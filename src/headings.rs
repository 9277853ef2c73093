//! Heading extraction and numbering for Word documents.
//!
//! Headings are the body paragraphs whose style name starts with
//! `Heading`; the trailing digit is the level. Two numbering schemes exist:
//!
//! - [`NumberingScheme::Outline`]: plain outline counters (`1`, `1.1`,
//!   `1.1.1`, ...), skipping levels that were never opened.
//! - [`NumberingScheme::Rerooted`]: cleans heading text first and, when a
//!   document has a single title-like H1, drops it and numbers from H2.
//!
//! Results go to `<stem>_headings.txt` and, optionally, to a numbered copy
//! `<stem>_numbered.docx`.

use anyhow::{Context, Result};
use globset::Glob;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::docx::{Document, MAX_HEADING_LEVEL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScheme {
    Outline,
    #[default]
    Rerooted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedHeading {
    /// Level of the heading style in the source document.
    pub source_level: u32,
    /// Level in the numbered outline.
    pub level: u32,
    pub number: String,
    pub text: String,
}

impl NumberedHeading {
    fn new(source_level: u32, level: u32, number: String, text: &str) -> Self {
        Self {
            source_level,
            level,
            number,
            text: text.to_string(),
        }
    }
}

/// `(level, text)` for each heading paragraph of the body, text trimmed.
pub fn extract_headings(doc: &Document) -> Vec<(u32, String)> {
    doc.body_paragraphs()
        .iter()
        .filter_map(|r| doc.paragraph(r))
        .filter_map(|p| p.heading_level().map(|lvl| (lvl, p.text().trim().to_string())))
        .collect()
}

static SYMBOLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-:\?\(\)]").expect("valid regex"));
static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+(\.\d+)*\s*-\s*").expect("valid regex"));
static TRAILING_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*$").expect("valid regex"));

/// Strip icons and symbols (keeping `-:?()`), a leading `1-`/`1.2 -`
/// number and one trailing colon.
pub fn clean_heading_text(text: &str) -> String {
    let text = SYMBOLS.replace_all(text, "");
    let text = NUMBER_PREFIX.replace(&text, "");
    let text = TRAILING_COLON.replace(&text, "");
    text.trim().to_string()
}

pub fn number_headings(scheme: NumberingScheme, headings: &[(u32, String)]) -> Vec<NumberedHeading> {
    match scheme {
        NumberingScheme::Outline => number_outline(headings),
        NumberingScheme::Rerooted => number_rerooted(headings),
    }
}

fn number_outline(headings: &[(u32, String)]) -> Vec<NumberedHeading> {
    let mut counters: Vec<u32> = Vec::new();
    let mut out = Vec::with_capacity(headings.len());

    for (source_level, text) in headings {
        let level = (*source_level).clamp(1, MAX_HEADING_LEVEL);
        let depth = level as usize;
        if counters.len() < depth {
            counters.resize(depth, 0);
        }
        counters[depth - 1] += 1;
        for c in counters.iter_mut().skip(depth) {
            *c = 0;
        }
        let number = counters[..depth]
            .iter()
            .filter(|c| **c != 0)
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        out.push(NumberedHeading::new(*source_level, level, number, text.trim()));
    }

    out
}

fn number_rerooted(headings: &[(u32, String)]) -> Vec<NumberedHeading> {
    let cleaned: Vec<(u32, String)> = headings
        .iter()
        .map(|(lvl, text)| ((*lvl).max(1), clean_heading_text(text)))
        .collect();

    let h1_count = cleaned.iter().filter(|(lvl, _)| *lvl == 1).count();
    let has_deep = cleaned.iter().any(|(lvl, _)| *lvl >= 3);
    let mut out = Vec::new();

    if h1_count == 1 && has_deep {
        // One title H1 over a real hierarchy: H2 becomes the top level.
        let (mut top, mut sub) = (0u32, 0u32);
        for (lvl, text) in &cleaned {
            match lvl {
                2 => {
                    top += 1;
                    sub = 0;
                    out.push(NumberedHeading::new(2, 1, top.to_string(), text));
                }
                3 => {
                    sub += 1;
                    out.push(NumberedHeading::new(3, 2, format!("{}.{}", top, sub), text));
                }
                _ => {}
            }
        }
        return out;
    }

    if h1_count == 1 {
        let subs: Vec<&String> = cleaned
            .iter()
            .filter(|(lvl, _)| *lvl == 2)
            .map(|(_, t)| t)
            .collect();
        if subs.is_empty() {
            if let Some((_, title)) = cleaned.iter().find(|(lvl, _)| *lvl == 1) {
                out.push(NumberedHeading::new(1, 1, "1".to_string(), title));
            }
            return out;
        }
        for (i, text) in subs.into_iter().enumerate() {
            out.push(NumberedHeading::new(2, 1, (i + 1).to_string(), text));
        }
        return out;
    }

    let mut counters = [0u32; 4];
    for (lvl, text) in &cleaned {
        let depth = *lvl as usize;
        if depth > counters.len() {
            continue;
        }
        counters[depth - 1] += 1;
        for c in counters.iter_mut().skip(depth) {
            *c = 0;
        }
        let number = counters[..depth]
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        out.push(NumberedHeading::new(*lvl, *lvl, number, text));
    }
    out
}

/// One `"<number> <text>"` line per heading.
pub fn headings_listing(numbered: &[NumberedHeading]) -> String {
    numbered
        .iter()
        .map(|h| format!("{} {}\n", h.number, h.text))
        .collect()
}

/// Text a heading paragraph gets in the numbered copy.
pub fn numbered_label(scheme: NumberingScheme, heading: &NumberedHeading) -> String {
    match scheme {
        NumberingScheme::Outline => format!("{} {}", heading.number, heading.text),
        NumberingScheme::Rerooted => {
            let indent = "   ".repeat(heading.level.saturating_sub(1) as usize);
            format!("{}{}-{}", indent, heading.number, heading.text)
        }
    }
}

/// Rewrite heading paragraphs of `doc` with their numbers. Headings are
/// matched in order per source level; headings without a number keep their
/// text. Returns the number of paragraphs changed.
pub fn apply_numbering(
    doc: &mut Document,
    scheme: NumberingScheme,
    numbered: &[NumberedHeading],
) -> usize {
    let mut queues: HashMap<u32, VecDeque<&NumberedHeading>> = HashMap::new();
    for h in numbered {
        queues.entry(h.source_level.max(1)).or_default().push_back(h);
    }

    let mut changed = 0;
    for r in doc.body_paragraphs() {
        let Some(level) = doc.paragraph(&r).and_then(|p| p.heading_level()) else {
            continue;
        };
        let Some(heading) = queues.get_mut(&level.max(1)).and_then(|q| q.pop_front()) else {
            continue;
        };
        if let Some(mut p) = doc.paragraph_mut(&r) {
            p.set_text(&numbered_label(scheme, heading));
            changed += 1;
        }
    }
    changed
}

#[derive(Debug, Clone)]
pub struct HeadingsOptions {
    pub scheme: NumberingScheme,
    /// Glob matched against file names when the source is a folder.
    pub pattern: String,
    pub recursive: bool,
    pub write_docx: bool,
}

#[derive(Debug, Default)]
pub struct HeadingsReport {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Number one document and write its outputs into `out_dir`.
pub fn process_file(
    path: &Path,
    out_dir: &Path,
    opts: &HeadingsOptions,
) -> Result<Vec<NumberedHeading>> {
    let mut doc =
        Document::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let headings = extract_headings(&doc);
    let numbered = number_headings(opts.scheme, &headings);
    tracing::debug!(
        path = %path.display(),
        found = headings.len(),
        numbered = numbered.len(),
        "numbered headings"
    );

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let text_out = out_dir.join(format!("{}_headings.txt", stem));
    std::fs::write(&text_out, headings_listing(&numbered))
        .with_context(|| format!("Failed to write {}", text_out.display()))?;

    if opts.write_docx {
        apply_numbering(&mut doc, opts.scheme, &numbered);
        let docx_out = out_dir.join(format!("{}_numbered.docx", stem));
        doc.save(&docx_out)
            .with_context(|| format!("Failed to write {}", docx_out.display()))?;
    }

    Ok(numbered)
}

fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with("~$"))
}

/// Process a single document or every matching document in a folder,
/// mirroring sub-folders under `out_dir`.
pub fn process_path(src: &Path, out_dir: &Path, opts: &HeadingsOptions) -> Result<HeadingsReport> {
    let mut report = HeadingsReport::default();

    if src.is_file() {
        if !is_lock_file(src) {
            process_file(src, out_dir, opts)?;
            report.processed.push(src.to_path_buf());
        }
        return Ok(report);
    }
    if !src.is_dir() {
        anyhow::bail!("Source not found: {}", src.display());
    }

    let matcher = Glob::new(&opts.pattern)
        .with_context(|| format!("Invalid pattern: {}", opts.pattern))?
        .compile_matcher();

    let mut walker = WalkDir::new(src).min_depth(1).sort_by_file_name();
    if !opts.recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || is_lock_file(entry.path()) {
            continue;
        }
        if !matcher.is_match(entry.file_name()) {
            continue;
        }
        let path = entry.path();
        let rel_dir = path
            .parent()
            .and_then(|p| p.strip_prefix(src).ok())
            .unwrap_or_else(|| Path::new(""));
        match process_file(path, &out_dir.join(rel_dir), opts) {
            Ok(_) => report.processed.push(path.to_path_buf()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping document");
                report.failed.push((path.to_path_buf(), format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{docx, para, run};
    use tempfile::TempDir;

    fn h(items: &[(u32, &str)]) -> Vec<(u32, String)> {
        items.iter().map(|(l, t)| (*l, t.to_string())).collect()
    }

    fn numbers(out: &[NumberedHeading]) -> Vec<(u32, &str, &str)> {
        out.iter()
            .map(|n| (n.level, n.number.as_str(), n.text.as_str()))
            .collect()
    }

    #[test]
    fn cleans_symbols_prefixes_and_trailing_colon() {
        assert_eq!(clean_heading_text("📌 1.2 - Setup:"), "Setup");
        assert_eq!(clean_heading_text("22-Why (now)?"), "Why (now)?");
        assert_eq!(clean_heading_text("  Plain  "), "Plain");
        assert_eq!(clean_heading_text("a:b:"), "a:b");
    }

    #[test]
    fn single_h1_with_h3_reroots_at_h2() {
        let input = h(&[
            (1, "Title"),
            (2, "Intro"),
            (3, "Scope"),
            (3, "Terms"),
            (2, "Body"),
            (3, "Detail"),
            (4, "Dropped"),
        ]);
        let out = number_headings(NumberingScheme::Rerooted, &input);
        assert_eq!(
            numbers(&out),
            vec![
                (1, "1", "Intro"),
                (2, "1.1", "Scope"),
                (2, "1.2", "Terms"),
                (1, "2", "Body"),
                (2, "2.1", "Detail"),
            ]
        );
    }

    #[test]
    fn single_h1_with_only_h2_is_flat() {
        let input = h(&[(1, "Title"), (2, "A"), (2, "B")]);
        let out = number_headings(NumberingScheme::Rerooted, &input);
        assert_eq!(numbers(&out), vec![(1, "1", "A"), (1, "2", "B")]);

        let lone = number_headings(NumberingScheme::Rerooted, &h(&[(1, "Only")]));
        assert_eq!(numbers(&lone), vec![(1, "1", "Only")]);
    }

    #[test]
    fn several_h1_use_full_hierarchy_with_zeros() {
        let input = h(&[(1, "A"), (3, "A-deep"), (2, "A1"), (1, "B"), (5, "skip"), (2, "B1")]);
        let out = number_headings(NumberingScheme::Rerooted, &input);
        assert_eq!(
            numbers(&out),
            vec![
                (1, "1", "A"),
                (3, "1.0.1", "A-deep"),
                (2, "1.1", "A1"),
                (1, "2", "B"),
                (2, "2.1", "B1"),
            ]
        );
    }

    #[test]
    fn outline_skips_unopened_levels() {
        let input = h(&[(1, "A"), (3, "deep"), (2, "B"), (0, "zero"), (2, "C")]);
        let out = number_headings(NumberingScheme::Outline, &input);
        assert_eq!(
            numbers(&out),
            vec![
                (1, "1", "A"),
                (3, "1.1", "deep"),
                (2, "1.1", "B"),
                (1, "2", "zero"),
                (2, "2.1", "C"),
            ]
        );
    }

    #[test]
    fn outline_clamps_deep_levels() {
        let input = h(&[(1, "A"), (400_000_000, "deep"), (12, "deeper")]);
        let out = number_headings(NumberingScheme::Outline, &input);
        assert_eq!(
            numbers(&out),
            vec![(1, "1", "A"), (9, "1.1", "deep"), (9, "1.2", "deeper")]
        );
    }

    #[test]
    fn listing_and_labels() {
        let out = number_headings(NumberingScheme::Rerooted, &h(&[(1, "T"), (2, "A"), (3, "B")]));
        assert_eq!(headings_listing(&out), "1 A\n1.1 B\n");
        assert_eq!(numbered_label(NumberingScheme::Rerooted, &out[1]), "   1.1-B");
        assert_eq!(numbered_label(NumberingScheme::Outline, &out[0]), "1 A");
    }

    fn sample_docx() -> Vec<u8> {
        let body = [
            para(Some("Heading1"), &run("Report")),
            para(None, &run("intro text")),
            para(Some("Heading2"), &run("Scope:")),
            para(Some("Heading3"), &run("Details")),
        ]
        .concat();
        docx(&body)
    }

    #[test]
    fn process_path_writes_outputs_and_mirrors_folders() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("report.docx"), sample_docx()).unwrap();
        std::fs::write(src.join("sub/inner.docx"), sample_docx()).unwrap();
        std::fs::write(src.join("~$report.docx"), b"lock").unwrap();
        std::fs::write(src.join("notes.txt"), b"x").unwrap();

        let out = tmp.path().join("out");
        let opts = HeadingsOptions {
            scheme: NumberingScheme::Rerooted,
            pattern: "*.docx".to_string(),
            recursive: true,
            write_docx: true,
        };
        let report = process_path(&src, &out, &opts).unwrap();
        assert_eq!(report.processed.len(), 2);
        assert!(report.failed.is_empty());

        let listing = std::fs::read_to_string(out.join("report_headings.txt")).unwrap();
        assert_eq!(listing, "1 Scope\n1.1 Details\n");
        assert!(out.join("sub/inner_headings.txt").exists());

        let numbered = Document::open(&out.join("report_numbered.docx")).unwrap();
        let texts: Vec<String> = numbered
            .body_paragraphs()
            .iter()
            .map(|r| numbered.paragraph(r).unwrap().text())
            .collect();
        assert_eq!(texts, vec!["Report", "intro text", "1-Scope", "   1.1-Details"]);
    }

    #[test]
    fn non_recursive_ignores_subfolders() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("sub/inner.docx"), sample_docx()).unwrap();

        let opts = HeadingsOptions {
            scheme: NumberingScheme::Outline,
            pattern: "*.docx".to_string(),
            recursive: false,
            write_docx: false,
        };
        let report = process_path(&src, &tmp.path().join("out"), &opts).unwrap();
        assert!(report.processed.is_empty());
    }
}
