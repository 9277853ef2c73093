//! Find and replace in `.txt` and `.docx` files.
//!
//! Plain text is substituted wholesale. In Word documents only the matched
//! characters change: runs a match does not touch are left as they are,
//! touched runs keep their formatting around the match, and the match
//! becomes the replacement runs. Hyperlinks, tracked insertions, fields and
//! bookmarks around the runs are never rebuilt.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::docx::{ContentScope, Document, DocxError, ParagraphMut, Run, RunFormat};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::search::{collect_files, DocumentKind, KindFilter, Matcher};

/// What a match becomes.
#[derive(Debug, Clone, Default)]
pub struct Replacement {
    /// Text used for plain-text files and for headings when
    /// `apply_heading_format` is set.
    pub plain: String,
    /// Formatted runs inserted into Word paragraphs. Empty deletes the match.
    pub segments: Vec<Run>,
}

impl Replacement {
    /// One segment with `format`; an empty `text` deletes matches.
    pub fn formatted(text: &str, format: &RunFormat) -> Self {
        let segments = if text.is_empty() {
            Vec::new()
        } else if format.is_empty() {
            vec![Run::plain(text)]
        } else {
            vec![Run::styled(text, format)]
        };
        Self {
            plain: text.to_string(),
            segments,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    pub scope: ContentScope,
    /// Headings get the plain replacement and lose direct run formatting.
    pub apply_heading_format: bool,
    pub recursive: bool,
    pub kinds: KindFilter,
}

/// Non-breaking hyphen → `-`, no-break space → space.
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{2011}', "-").replace('\u{00A0}', " ")
}

/// Substitute every match in `content`; returns the new text and count.
pub fn replace_in_text(content: &str, matcher: &Matcher, replacement: &str) -> (String, usize) {
    matcher.replace_all(content, replacement)
}

/// Replace matches inside one paragraph. Paragraphs without matches are
/// left untouched.
pub fn replace_in_paragraph(p: &mut ParagraphMut<'_>, matcher: &Matcher, segments: &[Run]) -> usize {
    let mut runs = p.runs();
    for run in &mut runs {
        run.text = normalize_text(&run.text);
    }
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    if text.is_empty() {
        return 0;
    }
    let spans = matcher.spans(&text);
    if spans.is_empty() {
        return 0;
    }
    p.splice(&runs, &spans, segments);
    spans.len()
}

/// Replace across all in-scope paragraphs of `doc`.
pub fn replace_in_document(
    doc: &mut Document,
    matcher: &Matcher,
    replacement: &Replacement,
    opts: &ReplaceOptions,
) -> usize {
    let plain = if replacement.plain.is_empty() {
        Vec::new()
    } else {
        vec![Run::plain(replacement.plain.as_str())]
    };
    let mut total = 0;

    for r in doc.paragraphs() {
        let Some(is_heading) = doc.paragraph(&r).map(|p| p.is_heading()) else {
            continue;
        };
        if !opts.scope.covers(r.location, is_heading) {
            continue;
        }
        let Some(mut p) = doc.paragraph_mut(&r) else {
            continue;
        };
        if is_heading && opts.apply_heading_format {
            let n = replace_in_paragraph(&mut p, matcher, &plain);
            if n > 0 {
                p.clear_direct_format();
            }
            total += n;
        } else {
            total += replace_in_paragraph(&mut p, matcher, &replacement.segments);
        }
    }

    total
}

#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Docx(#[from] DocxError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Replaced(usize),
    Unsupported,
    Failed(String),
}

/// Replace in a single file, writing it back only when something changed.
pub fn replace_in_file(
    path: &Path,
    matcher: &Matcher,
    replacement: &Replacement,
    opts: &ReplaceOptions,
) -> Result<FileOutcome, ReplaceError> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::Text) => {
            let bytes = std::fs::read(path)?;
            let content = String::from_utf8_lossy(&bytes);
            let (new_content, count) = replace_in_text(&content, matcher, &replacement.plain);
            if count > 0 {
                std::fs::write(path, new_content)?;
            }
            Ok(FileOutcome::Replaced(count))
        }
        Some(DocumentKind::Docx) => {
            let mut doc = Document::open(path)?;
            let count = replace_in_document(&mut doc, matcher, replacement, opts);
            if count > 0 {
                doc.save(path)?;
            }
            Ok(FileOutcome::Replaced(count))
        }
        Some(DocumentKind::Pdf) | None => Ok(FileOutcome::Unsupported),
    }
}

#[derive(Debug, Default)]
pub struct ReplaceSummary {
    pub files: Vec<(PathBuf, FileOutcome)>,
}

impl ReplaceSummary {
    pub fn total_replacements(&self) -> usize {
        self.files
            .iter()
            .map(|(_, o)| match o {
                FileOutcome::Replaced(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn files_with_replacements(&self) -> usize {
        self.files
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Replaced(n) if *n > 0))
            .count()
    }

    pub fn render(&self) -> String {
        let mut out = format!("Processing {} file(s)...\n\n", self.files.len());
        for (path, outcome) in &self.files {
            let line = match outcome {
                FileOutcome::Replaced(n) => format!("{}: {} replacement(s)\n", path.display(), n),
                FileOutcome::Unsupported => {
                    format!("Replace not supported: {}\n", path.display())
                }
                FileOutcome::Failed(e) => format!("Error processing {}: {}\n", path.display(), e),
            };
            out.push_str(&line);
        }
        out.push_str(&format!(
            "\nTotal: {} replacement(s) in {} file(s)\n",
            self.total_replacements(),
            self.files_with_replacements()
        ));
        out
    }
}

/// Replace in a file or every matching file of a folder. Per-file errors
/// are recorded and the run continues.
pub fn replace_path(
    path: &Path,
    matcher: &Matcher,
    replacement: &Replacement,
    opts: &ReplaceOptions,
    reporter: &dyn ProgressReporter,
) -> Result<ReplaceSummary> {
    let files = collect_files(path, opts.recursive, &opts.kinds)?;
    let total = files.len() as u64;
    let mut summary = ReplaceSummary::default();

    for (i, file) in files.iter().enumerate() {
        reporter.report(ProgressEvent::Working {
            task: "replace".to_string(),
            n: i as u64 + 1,
            total,
            item: file.display().to_string(),
        });
        let outcome = match replace_in_file(file, matcher, replacement, opts) {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "replace failed");
                FileOutcome::Failed(e.to_string())
            }
        };
        if let FileOutcome::Replaced(n) = outcome {
            tracing::debug!(path = %file.display(), replacements = n, "processed");
        }
        summary.files.push((file.clone(), outcome));
    }

    reporter.report(ProgressEvent::Finished {
        task: "replace".to_string(),
        total,
    });
    Ok(summary)
}
