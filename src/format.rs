//! Apply a character style to selected paragraphs of Word documents.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::docx::{Document, Location, RunFormat};
use crate::search::{collect_files, DocumentKind, KindFilter};

/// Which paragraphs get the style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FormatTarget {
    HeadingsOnly,
    TablesOnly,
    /// Paragraphs that contain a picture, in the body or in tables.
    ImagesOnly,
    /// Body paragraphs that are neither headings nor pictures.
    TextOnly,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterOption {
    #[default]
    Included,
    Excluded,
}

/// Case-insensitive paragraph text filter, compiled once.
#[derive(Debug, Clone, Default)]
pub struct ParagraphFilter {
    needle: Needle,
    option: FilterOption,
}

#[derive(Debug, Clone, Default)]
enum Needle {
    #[default]
    Any,
    Literal(String),
    Pattern(Regex),
    /// The pattern did not compile.
    Nothing,
}

impl ParagraphFilter {
    /// An empty `text` accepts everything; an invalid regex matches nothing.
    pub fn new(text: &str, use_regex: bool, option: FilterOption) -> Self {
        let text = text.trim();
        let needle = if text.is_empty() {
            Needle::Any
        } else if use_regex {
            match RegexBuilder::new(text).case_insensitive(true).build() {
                Ok(re) => Needle::Pattern(re),
                Err(e) => {
                    tracing::warn!(pattern = %text, error = %e, "invalid filter regex matches nothing");
                    Needle::Nothing
                }
            }
        } else {
            Needle::Literal(text.to_lowercase())
        };
        Self { needle, option }
    }

    pub fn accepts(&self, paragraph_text: &str) -> bool {
        let found = match &self.needle {
            Needle::Any => return true,
            Needle::Literal(needle) => paragraph_text.to_lowercase().contains(needle.as_str()),
            Needle::Pattern(re) => re.is_match(paragraph_text),
            Needle::Nothing => false,
        };
        match self.option {
            FilterOption::Included => found,
            FilterOption::Excluded => !found,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub style: RunFormat,
    pub target: FormatTarget,
    /// Toggles used by [`FormatTarget::All`].
    pub include_headings: bool,
    pub include_images: bool,
    pub include_tables: bool,
    pub filter: ParagraphFilter,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            style: RunFormat::default(),
            target: FormatTarget::All,
            include_headings: true,
            include_images: true,
            include_tables: true,
            filter: ParagraphFilter::default(),
        }
    }
}

impl FormatOptions {
    fn selects(&self, location: Location, is_heading: bool, has_image: bool) -> bool {
        match self.target {
            FormatTarget::HeadingsOnly => location == Location::Body && is_heading,
            FormatTarget::TablesOnly => location == Location::Table,
            FormatTarget::ImagesOnly => has_image,
            FormatTarget::TextOnly => location == Location::Body && !is_heading && !has_image,
            FormatTarget::All => {
                (location == Location::Body || self.include_tables)
                    && (!is_heading || self.include_headings)
                    && (!has_image || self.include_images)
            }
        }
    }
}

/// Style the selected paragraphs; returns how many were styled.
pub fn format_document(doc: &mut Document, opts: &FormatOptions) -> usize {
    let mut styled = 0;
    for r in doc.paragraphs() {
        let selected = match doc.paragraph(&r) {
            Some(p) => {
                opts.selects(r.location, p.is_heading(), p.has_drawing())
                    && opts.filter.accepts(&p.text())
            }
            None => false,
        };
        if !selected {
            continue;
        }
        if let Some(mut p) = doc.paragraph_mut(&r) {
            p.apply_format(&opts.style);
            styled += 1;
        }
    }
    styled
}

#[derive(Debug, Default)]
pub struct FormatReport {
    pub files: Vec<(PathBuf, usize)>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Style one `.docx` or every `.docx` in a folder, saving each in place.
pub fn format_path(path: &Path, recursive: bool, opts: &FormatOptions) -> Result<FormatReport> {
    let files = collect_files(path, recursive, &KindFilter(vec![DocumentKind::Docx]))?;
    if files.is_empty() {
        tracing::info!(path = %path.display(), "no .docx files found");
    }

    let mut report = FormatReport::default();
    for file in files {
        match format_file(&file, opts) {
            Ok(n) => report.files.push((file, n)),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "formatting failed");
                report.failed.push((file, format!("{:#}", e)));
            }
        }
    }
    Ok(report)
}

fn format_file(path: &Path, opts: &FormatOptions) -> Result<usize> {
    let mut doc = Document::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let n = format_document(&mut doc, opts);
    doc.save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{docx, para, run, table};
    use crate::highlight::HighlightColor;

    const IMAGE_RUN: &str = "<w:r><w:drawing><wp:inline xmlns:wp=\"urn:wp\"/></w:drawing></w:r>";

    fn sample() -> Document {
        let body = [
            para(Some("Heading1"), &run("Heading")),
            para(None, &run("Alpha text")),
            para(None, &format!("{}{}", run("Figure"), IMAGE_RUN)),
            table(&[para(None, &run("Cell beta")).as_str()]),
        ]
        .concat();
        Document::from_bytes(&docx(&body)).unwrap()
    }

    fn bold() -> RunFormat {
        RunFormat {
            bold: Some(true),
            ..RunFormat::default()
        }
    }

    fn bolded(doc: &Document) -> Vec<String> {
        doc.paragraphs()
            .iter()
            .filter_map(|r| doc.paragraph(r))
            .filter(|p| p.runs().iter().any(|r| r.format().bold == Some(true)))
            .map(|p| p.text())
            .collect()
    }

    fn run_target(target: FormatTarget) -> Vec<String> {
        let mut doc = sample();
        let opts = FormatOptions {
            style: bold(),
            target,
            ..FormatOptions::default()
        };
        format_document(&mut doc, &opts);
        bolded(&doc)
    }

    #[test]
    fn targets_select_expected_paragraphs() {
        assert_eq!(run_target(FormatTarget::HeadingsOnly), vec!["Heading"]);
        assert_eq!(run_target(FormatTarget::TablesOnly), vec!["Cell beta"]);
        assert_eq!(run_target(FormatTarget::ImagesOnly), vec!["Figure"]);
        assert_eq!(run_target(FormatTarget::TextOnly), vec!["Alpha text"]);
        assert_eq!(run_target(FormatTarget::All).len(), 4);
    }

    #[test]
    fn all_respects_toggles() {
        let mut doc = sample();
        let opts = FormatOptions {
            style: bold(),
            include_headings: false,
            include_images: false,
            include_tables: false,
            ..FormatOptions::default()
        };
        format_document(&mut doc, &opts);
        assert_eq!(bolded(&doc), vec!["Alpha text"]);
    }

    #[test]
    fn text_filter_includes_or_excludes() {
        let f = ParagraphFilter::new("ALPHA", false, FilterOption::Included);
        assert!(f.accepts("alpha text"));
        assert!(!f.accepts("beta"));

        let f = ParagraphFilter::new(r"^cell\s", true, FilterOption::Excluded);
        assert!(!f.accepts("Cell beta"));
        assert!(f.accepts("Alpha"));

        let invalid = ParagraphFilter::new("(", true, FilterOption::Included);
        assert!(!invalid.accepts("("));
        let invalid_excluded = ParagraphFilter::new("(", true, FilterOption::Excluded);
        assert!(invalid_excluded.accepts("("));
        assert!(ParagraphFilter::new("  ", true, FilterOption::Excluded).accepts("x"));
        assert!(ParagraphFilter::default().accepts("anything"));
    }

    #[test]
    fn style_fields_are_written() {
        let mut doc = sample();
        let style = RunFormat {
            font: Some("Arial".into()),
            size_pt: Some(14.0),
            color: Some("112233".into()),
            highlight: Some(HighlightColor::Teal),
            ..RunFormat::default()
        };
        let opts = FormatOptions {
            style: style.clone(),
            target: FormatTarget::TextOnly,
            ..FormatOptions::default()
        };
        assert_eq!(format_document(&mut doc, &opts), 1);
        let r = &doc.body_paragraphs()[1];
        let fmt = doc.paragraph(r).unwrap().runs()[0].format();
        assert_eq!(fmt.font.as_deref(), Some("Arial"));
        assert_eq!(fmt.size_pt, Some(14.0));
        assert_eq!(fmt.color.as_deref(), Some("112233"));
        assert_eq!(fmt.highlight, Some(HighlightColor::Teal));
    }
}
