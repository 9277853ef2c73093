//! Text search across `.txt`, `.docx` and `.pdf` files.
//!
//! Each supported file is turned into a list of lines ([`document_lines`]):
//! text lines for plain text, non-blank paragraphs for Word documents and
//! extracted text lines for PDFs. A [`Matcher`] then reports every line
//! with at least one hit, with 1-based line numbers and byte spans.
//!
//! The same [`Matcher`] and [`collect_files`] drive `replace` and `edit`.

use regex::{NoExpand, Regex, RegexBuilder};
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::docx::{ContentScope, Document, DocxError};

/// A compiled literal or regex pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    literal: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("search pattern is empty")]
    Empty,
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

impl Matcher {
    pub fn new(pattern: &str, use_regex: bool, case_sensitive: bool) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let source: Cow<str> = if use_regex {
            Cow::Borrowed(pattern)
        } else {
            Cow::Owned(regex::escape(pattern))
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()?;
        Ok(Self {
            regex,
            literal: !use_regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Non-overlapping match spans as byte ranges.
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    /// Replace every match. Regex patterns expand `$1`-style groups in
    /// `replacement`; literal patterns insert it verbatim.
    pub fn replace_all(&self, text: &str, replacement: &str) -> (String, usize) {
        let count = self.regex.find_iter(text).count();
        if count == 0 {
            return (text.to_string(), 0);
        }
        let replaced = if self.literal {
            self.regex.replace_all(text, NoExpand(replacement))
        } else {
            self.regex.replace_all(text, replacement)
        };
        (replaced.into_owned(), count)
    }
}

/// File formats the text tools understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[value(name = "txt")]
    Text,
    Docx,
    Pdf,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "txt" => Some(DocumentKind::Text),
            "docx" => Some(DocumentKind::Docx),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Text => "txt",
            DocumentKind::Docx => "docx",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// Restricts folder scans to some kinds. Empty means every file.
#[derive(Debug, Clone, Default)]
pub struct KindFilter(pub Vec<DocumentKind>);

impl KindFilter {
    pub fn accepts(&self, path: &Path) -> bool {
        if self.0.is_empty() {
            return true;
        }
        DocumentKind::from_path(path).is_some_and(|k| self.0.contains(&k))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Docx(#[from] DocxError),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Files to process under `path`: the file itself, or the folder's files
/// (optionally recursive) accepted by `kinds`, sorted by path.
pub fn collect_files(path: &Path, recursive: bool, kinds: &KindFilter) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("Path not found: {}", path.display());
    }
    let mut walker = WalkDir::new(path).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }
    Ok(walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && kinds.accepts(e.path()))
        .map(|e| e.into_path())
        .collect())
}

/// Searchable lines of a document.
pub fn document_lines(
    path: &Path,
    kind: DocumentKind,
    scope: ContentScope,
) -> Result<Vec<String>, ReadError> {
    match kind {
        DocumentKind::Text => {
            let bytes = std::fs::read(path)?;
            Ok(String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect())
        }
        DocumentKind::Docx => {
            let doc = Document::open(path)?;
            Ok(docx_lines(&doc, scope))
        }
        DocumentKind::Pdf => {
            let bytes = std::fs::read(path)?;
            let text = pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ReadError::Pdf(e.to_string()))?;
            Ok(text.lines().map(str::to_string).collect())
        }
    }
}

/// Trimmed, non-blank paragraph texts in scope: body paragraphs first,
/// then table cells.
pub fn docx_lines(doc: &Document, scope: ContentScope) -> Vec<String> {
    doc.paragraphs()
        .iter()
        .filter_map(|r| {
            let p = doc.paragraph(r)?;
            if !scope.covers(r.location, p.is_heading()) {
                return None;
            }
            let text = p.text();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct LineMatch {
    pub line_no: usize,
    pub line: String,
    pub spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Searched { matches: Vec<LineMatch> },
    Unsupported,
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileResult {
    pub fn match_count(&self) -> usize {
        match &self.outcome {
            FileOutcome::Searched { matches } => matches.iter().map(|m| m.spans.len()).sum(),
            _ => 0,
        }
    }
}

/// Matching lines of `lines`, numbered from 1.
pub fn match_lines(lines: &[String], matcher: &Matcher) -> Vec<LineMatch> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let spans = matcher.spans(line);
            (!spans.is_empty()).then(|| LineMatch {
                line_no: i + 1,
                line: line.clone(),
                spans,
            })
        })
        .collect()
}

pub fn search_file(path: &Path, matcher: &Matcher, scope: ContentScope) -> FileResult {
    let outcome = match DocumentKind::from_path(path) {
        None => FileOutcome::Unsupported,
        Some(kind) => match document_lines(path, kind, scope) {
            Ok(lines) => FileOutcome::Searched {
                matches: match_lines(&lines, matcher),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read file");
                FileOutcome::Error {
                    message: e.to_string(),
                }
            }
        },
    };
    FileResult {
        path: path.to_path_buf(),
        outcome,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub recursive: bool,
    pub kinds: KindFilter,
    pub scope: ContentScope,
}

pub fn search_path(path: &Path, matcher: &Matcher, opts: &SearchOptions) -> anyhow::Result<Vec<FileResult>> {
    let files = collect_files(path, opts.recursive, &opts.kinds)?;
    tracing::debug!(files = files.len(), "searching");
    Ok(files
        .iter()
        .map(|f| search_file(f, matcher, opts.scope))
        .collect())
}

/// Human-readable report: each file with hits, its matching lines with the
/// hits wrapped in `[[...]]`, then totals.
pub fn render(results: &[FileResult]) -> String {
    let mut out = String::new();
    let mut total = 0;
    let mut files_with_hits = 0;

    for r in results {
        match &r.outcome {
            FileOutcome::Unsupported => {
                out.push_str(&format!("Unsupported file type: {}\n\n", r.path.display()));
            }
            FileOutcome::Error { message } => {
                out.push_str(&format!(
                    "Error reading file: {} -> {}\n\n",
                    r.path.display(),
                    message
                ));
            }
            FileOutcome::Searched { matches } if !matches.is_empty() => {
                let count = r.match_count();
                total += count;
                files_with_hits += 1;
                out.push_str(&format!("{} ({} matches)\n", r.path.display(), count));
                for m in matches {
                    out.push_str(&format!("line [{}]: {}\n", m.line_no, mark_spans(&m.line, &m.spans)));
                }
                out.push('\n');
            }
            FileOutcome::Searched { .. } => {}
        }
    }

    out.push_str(&format!(
        "Total: {} matches in {} file(s), {} file(s) searched\n",
        total,
        files_with_hits,
        results.len()
    ));
    out
}

fn mark_spans(line: &str, spans: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(line.len() + spans.len() * 4);
    let mut cursor = 0;
    for &(s, e) in spans {
        out.push_str(&line[cursor..s]);
        out.push_str("[[");
        out.push_str(&line[s..e]);
        out.push_str("]]");
        cursor = e;
    }
    out.push_str(&line[cursor..]);
    out
}
