//! Line-level edits around matches: drop blank lines next to a matching
//! line, or insert text before/after it.
//!
//! Plain text works on lines; Word documents work on body paragraphs for
//! removal and on the lines inside each paragraph (split at breaks) for
//! insertion.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::docx::{Document, DocxError};
use crate::search::{collect_files, DocumentKind, KindFilter, Matcher};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    #[default]
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert {
    Space,
    Newline,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Remove the blank line(s) on one side of each matching line. When
    /// there is none, one newline inside the matching line goes instead.
    RemoveBlank { position: Position, all: bool },
    /// Insert `what` `repeat` times on the line `offset` lines away from
    /// each match (towards `position`, clamped to the text).
    Insert {
        what: Insert,
        repeat: usize,
        position: Position,
        offset: usize,
    },
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Apply `op` to plain text. Returns the edit count and the new text.
pub fn edit_text(content: &str, matcher: &Matcher, op: &EditOp) -> (usize, String) {
    match op {
        EditOp::RemoveBlank { position, all } => remove_blank_lines(content, matcher, *position, *all),
        EditOp::Insert {
            what,
            repeat,
            position,
            offset,
        } => {
            let (body, trailing) = match content.strip_suffix('\n') {
                Some(b) => (b, "\n"),
                None => (content, ""),
            };
            let lines: Vec<&str> = body.split('\n').collect();
            let (count, plan) = plan_inserts(&lines, matcher, what, *repeat, *position, *offset);
            let edited: Vec<String> = lines
                .iter()
                .zip(&plan)
                .map(|(line, ins)| format!("{}{}{}", ins.leading(), line, ins.trailing()))
                .collect();
            (count, format!("{}{}", edited.join("\n"), trailing))
        }
    }
}

fn remove_blank_lines(content: &str, matcher: &Matcher, position: Position, all: bool) -> (usize, String) {
    let mut lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    let matched: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| matcher.is_match(l.trim_end_matches(['\n', '\r'])))
        .map(|(i, _)| i)
        .collect();

    let mut removed = 0;
    // Walk backwards so removals never shift lines still to be visited.
    for &idx in matched.iter().rev() {
        let mut here = 0;
        match position {
            Position::Before => {
                let mut i = idx;
                while i > 0 && is_blank(&lines[i - 1]) {
                    lines.remove(i - 1);
                    i -= 1;
                    here += 1;
                    if !all {
                        break;
                    }
                }
            }
            Position::After => {
                while idx + 1 < lines.len() && is_blank(&lines[idx + 1]) {
                    lines.remove(idx + 1);
                    here += 1;
                    if !all {
                        break;
                    }
                }
            }
        }
        if here == 0 {
            if let Some(pos) = lines[idx].find('\n') {
                lines[idx].remove(pos);
                here += 1;
            }
        }
        removed += here;
    }

    (removed, lines.concat())
}

/// What goes around one line: blank lines and text before and after it.
#[derive(Debug, Clone, Default)]
struct LineInsert {
    prefix: String,
    suffix: String,
    blank_before: usize,
    blank_after: usize,
}

impl LineInsert {
    fn leading(&self) -> String {
        format!("{}{}", "\n".repeat(self.blank_before), self.prefix)
    }

    fn trailing(&self) -> String {
        format!("{}{}", self.suffix, "\n".repeat(self.blank_after))
    }
}

/// Work out the insertions for each line. Targets are computed against the
/// original lines, so several inserts never push each other around.
fn plan_inserts(
    lines: &[&str],
    matcher: &Matcher,
    what: &Insert,
    repeat: usize,
    position: Position,
    offset: usize,
) -> (usize, Vec<LineInsert>) {
    let n = lines.len();
    let unit = match what {
        Insert::Space => " ".to_string(),
        Insert::Newline => String::new(),
        Insert::Text(t) => t.clone(),
    };
    let repeat = repeat.max(1);
    let mut plan = vec![LineInsert::default(); n];
    let mut count = 0;

    for (idx, line) in lines.iter().enumerate() {
        if !matcher.is_match(line) {
            continue;
        }
        let target = match position {
            Position::After => (idx + offset).min(n - 1),
            Position::Before => idx.saturating_sub(offset),
        };
        let slot = &mut plan[target];
        match (what, position) {
            (Insert::Newline, Position::Before) => slot.blank_before += repeat,
            (Insert::Newline, Position::After) => slot.blank_after += repeat,
            (_, Position::Before) => slot.prefix.insert_str(0, &unit.repeat(repeat)),
            (_, Position::After) => slot.suffix.push_str(&unit.repeat(repeat)),
        }
        count += 1;
    }
    (count, plan)
}

/// Apply `op` to a Word document. Returns the edit count.
pub fn edit_document(doc: &mut Document, matcher: &Matcher, op: &EditOp) -> usize {
    match op {
        EditOp::RemoveBlank { position, all } => remove_blank_paragraphs(doc, matcher, *position, *all),
        EditOp::Insert {
            what,
            repeat,
            position,
            offset,
        } => {
            let mut count = 0;
            for r in doc.body_paragraphs() {
                let Some(text) = doc.paragraph(&r).map(|p| p.text()) else {
                    continue;
                };
                let lines: Vec<&str> = text.split('\n').collect();
                let (n, plan) = plan_inserts(&lines, matcher, what, *repeat, *position, *offset);
                if n == 0 {
                    continue;
                }
                let inserts = paragraph_inserts(&lines, &plan);
                if let Some(mut p) = doc.paragraph_mut(&r) {
                    p.insert_text(&inserts);
                    count += n;
                }
            }
            count
        }
    }
}

/// Byte offsets into the paragraph text where each line's insertions go.
fn paragraph_inserts(lines: &[&str], plan: &[LineInsert]) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (line, ins) in lines.iter().zip(plan) {
        let end = start + line.len();
        let (leading, trailing) = (ins.leading(), ins.trailing());
        if start == end {
            out.push((start, format!("{}{}", leading, trailing)));
        } else {
            out.push((start, leading));
            out.push((end, trailing));
        }
        start = end + 1;
    }
    out.retain(|(_, t)| !t.is_empty());
    out
}

fn paragraph_text(doc: &Document, idx: usize) -> Option<String> {
    let refs = doc.body_paragraphs();
    doc.paragraph(refs.get(idx)?).map(|p| p.text())
}

fn remove_body_paragraph(doc: &mut Document, idx: usize) -> bool {
    let refs = doc.body_paragraphs();
    match refs.get(idx) {
        Some(r) => doc.remove_paragraph(r),
        None => false,
    }
}

fn remove_blank_paragraphs(doc: &mut Document, matcher: &Matcher, position: Position, all: bool) -> usize {
    let matched: Vec<usize> = doc
        .body_paragraphs()
        .iter()
        .enumerate()
        .filter(|(_, r)| doc.paragraph(r).is_some_and(|p| matcher.is_match(&p.text())))
        .map(|(i, _)| i)
        .collect();

    let mut removed = 0;
    for &idx in matched.iter().rev() {
        let mut here = 0;
        match position {
            Position::Before => {
                let mut i = idx;
                while i > 0 && paragraph_text(doc, i - 1).is_some_and(|t| is_blank(&t)) {
                    if !remove_body_paragraph(doc, i - 1) {
                        break;
                    }
                    i -= 1;
                    here += 1;
                    if !all {
                        break;
                    }
                }
            }
            Position::After => {
                while paragraph_text(doc, idx + 1).is_some_and(|t| is_blank(&t)) {
                    if !remove_body_paragraph(doc, idx + 1) {
                        break;
                    }
                    here += 1;
                    if !all {
                        break;
                    }
                }
            }
        }
        if here == 0 {
            here += remove_one_break(doc, idx);
        }
        removed += here;
    }
    removed
}

/// Drop the first line break inside body paragraph `idx`.
fn remove_one_break(doc: &mut Document, idx: usize) -> usize {
    let refs = doc.body_paragraphs();
    let Some(r) = refs.get(idx) else {
        return 0;
    };
    let Some(mut p) = doc.paragraph_mut(r) else {
        return 0;
    };
    let runs = p.runs();
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    let Some(pos) = text.find('\n') else {
        return 0;
    };
    p.splice(&runs, &[(pos, pos + 1)], &[]);
    1
}

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Docx(#[from] DocxError),
    #[error("unsupported file type")]
    Unsupported,
}

/// Edit one file in place, writing only when something changed.
pub fn edit_file(path: &Path, matcher: &Matcher, op: &EditOp) -> Result<usize, EditError> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::Text) => {
            let bytes = std::fs::read(path)?;
            let (count, text) = edit_text(&String::from_utf8_lossy(&bytes), matcher, op);
            if count > 0 {
                std::fs::write(path, text)?;
            }
            Ok(count)
        }
        Some(DocumentKind::Docx) => {
            let mut doc = Document::open(path)?;
            let count = edit_document(&mut doc, matcher, op);
            if count > 0 {
                doc.save(path)?;
            }
            Ok(count)
        }
        _ => Err(EditError::Unsupported),
    }
}

#[derive(Debug, Default)]
pub struct EditReport {
    pub edited: Vec<(PathBuf, usize)>,
    pub skipped: Vec<(PathBuf, String)>,
}

impl EditReport {
    pub fn total(&self) -> usize {
        self.edited.iter().map(|(_, n)| n).sum()
    }
}

pub fn edit_path(path: &Path, matcher: &Matcher, op: &EditOp, recursive: bool) -> Result<EditReport> {
    let kinds = KindFilter(vec![DocumentKind::Text, DocumentKind::Docx]);
    let mut report = EditReport::default();
    for file in collect_files(path, recursive, &kinds)? {
        match edit_file(&file, matcher, op) {
            Ok(0) => {}
            Ok(n) => report.edited.push((file, n)),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "edit skipped");
                report.skipped.push((file, e.to_string()));
            }
        }
    }
    Ok(report)
}
