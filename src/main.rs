//! # Desk Clerk CLI (`clerk`)
//!
//! The `clerk` binary exposes every Desk Clerk tool as a subcommand.
//!
//! ## Usage
//!
//! ```bash
//! clerk --config ./config/clerk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `clerk tree <dir>` | Render a folder tree |
//! | `clerk list <dir>` | List files and folders with filters |
//! | `clerk count <dir>` | Count files per folder |
//! | `clerk copy <src> <dest>` | Copy a folder skeleton |
//! | `clerk copy-docs <src> <dest>` | Copy Word documents, never overwriting |
//! | `clerk wipe <dir>` | Safely delete a folder tree |
//! | `clerk headings <src>` | Number headings of Word documents |
//! | `clerk search <path> <pattern>` | Search `.txt`, `.docx` and `.pdf` files |
//! | `clerk replace <path> <pattern> <with>` | Find and replace with formatting |
//! | `clerk format <path>` | Style paragraphs of Word documents |
//! | `clerk edit ...` | Remove blank lines or insert text at matches |
//! | `clerk db clear/inspect/structure` | Copy databases with their data cleared, report rows or columns |
//!
//! A missing config file is not an error; built-in defaults are used.
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use desk_clerk::config::{self, Config};
use desk_clerk::copy::{copy_documents, copy_listed, CopyMode};
use desk_clerk::dbcopy::{self, NoPrompt, PasswordPrompt, SqliteDriver, StdinPrompt};
use desk_clerk::docx::{ContentScope, RunFormat};
use desk_clerk::edit::{edit_path, EditOp, Insert, Position};
use desk_clerk::filter::{FilterMode, FilterSpec};
use desk_clerk::format::{format_path, FilterOption, FormatOptions, FormatTarget, ParagraphFilter};
use desk_clerk::headings::{process_path, HeadingsOptions, NumberingScheme};
use desk_clerk::highlight::{normalize_hex, Background, HighlightColor};
use desk_clerk::listing::{count_files, list_items, FolderLevel, ListOptions, OutputFormat};
use desk_clerk::progress::ProgressMode;
use desk_clerk::replace::{replace_path, ReplaceOptions, Replacement};
use desk_clerk::search::{self, DocumentKind, KindFilter, Matcher, SearchOptions};
use desk_clerk::tree::{render_tree, Separator, TreeOptions};
use desk_clerk::wipe::{wipe_and_recycle, DirectoryTrash, PermanentDelete, Trash};

/// Desk Clerk: office and file automation utilities.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Sections that are missing use their defaults.
#[derive(Parser)]
#[command(
    name = "clerk",
    about = "Desk Clerk: folder trees, bulk copying, safe deletion and Word document editing",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/clerk.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal,
    /// `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a folder tree with box-drawing characters.
    Tree {
        root: PathBuf,
        /// Write the tree to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        separator: Option<Separator>,
        /// Include entries whose name starts with a dot.
        #[arg(long)]
        show_hidden: bool,
    },

    /// List the files and folders of a directory.
    List {
        root: PathBuf,
        #[arg(long, conflicts_with = "folders_only")]
        files_only: bool,
        #[arg(long)]
        folders_only: bool,
        #[arg(long, short)]
        recursive: bool,
        /// Deepest folder level to descend into (0 = unlimited).
        #[arg(long, default_value_t = 0)]
        max_depth: usize,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum, default_value = "full-path")]
        format: ListFormat,
        /// Trailing folder components shown by `--format folder-level`.
        #[arg(long)]
        level: Option<usize>,
        #[arg(long)]
        no_folder: bool,
        #[arg(long)]
        no_file: bool,
        #[arg(long)]
        no_extension: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Count files, in total and per folder.
    Count {
        root: PathBuf,
        /// Print the count of every folder, not just the total.
        #[arg(long)]
        per_folder: bool,
    },

    /// Copy a folder's structure into another folder.
    Copy {
        src: PathBuf,
        dest: PathBuf,
        #[arg(long, value_enum, default_value = "folders-only")]
        mode: CopyMode,
    },

    /// Copy every Word document out of a folder tree. Existing files are
    /// never overwritten; copies get a `_copyN` suffix.
    CopyDocs {
        src: PathBuf,
        dest: PathBuf,
        /// Only look at the top folder.
        #[arg(long)]
        top_only: bool,
    },

    /// Delete a folder tree, including files held by other programs.
    Wipe {
        root: PathBuf,
        /// Skip the trash and delete permanently.
        #[arg(long)]
        permanent: bool,
        /// Trash folder, overriding `[wipe].trash_dir`.
        #[arg(long)]
        trash_dir: Option<PathBuf>,
    },

    /// Extract and number the headings of Word documents.
    Headings {
        src: PathBuf,
        /// Output folder, overriding `[headings].output_dir`.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum)]
        scheme: Option<NumberingScheme>,
        /// File-name glob used when `src` is a folder.
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long, short)]
        recursive: bool,
        /// Only write the `_headings.txt` listings.
        #[arg(long)]
        no_docx: bool,
    },

    /// Search `.txt`, `.docx` and `.pdf` files.
    Search {
        #[command(flatten)]
        target: MatchArgs,
        #[arg(long, value_enum, default_value = "all")]
        scope: ContentScope,
        /// Restrict to these kinds (repeatable).
        #[arg(long = "kind", value_enum)]
        kinds: Vec<DocumentKind>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find and replace in `.txt` and `.docx` files.
    Replace {
        #[command(flatten)]
        target: MatchArgs,
        /// Replacement text; empty deletes matches.
        replacement: String,
        #[arg(long, value_enum, default_value = "all")]
        scope: ContentScope,
        /// In headings, insert plain text and clear direct formatting so
        /// the heading style shows through.
        #[arg(long)]
        heading_format: bool,
        #[command(flatten)]
        style: StyleArgs,
    },

    /// Apply character formatting to paragraphs of Word documents.
    Format {
        path: PathBuf,
        #[arg(long, short)]
        recursive: bool,
        #[arg(long, value_enum, default_value = "all")]
        target: FormatTarget,
        #[arg(long)]
        skip_headings: bool,
        #[arg(long)]
        skip_images: bool,
        #[arg(long)]
        skip_tables: bool,
        /// Only paragraphs containing this text (case-insensitive).
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        filter_regex: bool,
        /// Style paragraphs that do NOT match `--filter`.
        #[arg(long)]
        exclude_filter: bool,
        #[command(flatten)]
        style: StyleArgs,
    },

    /// Line edits around matching lines.
    Edit {
        #[command(subcommand)]
        action: EditAction,
    },

    /// Database structure copier.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum EditAction {
    /// Remove blank lines (or paragraphs) next to each match.
    RemoveBlank {
        #[command(flatten)]
        target: MatchArgs,
        /// Remove the blank line before the match instead of after.
        #[arg(long)]
        before: bool,
        /// Remove every consecutive blank line, not just one.
        #[arg(long)]
        all: bool,
    },
    /// Insert text near each match.
    Insert {
        #[command(flatten)]
        target: MatchArgs,
        #[arg(long, conflicts_with_all = ["space", "newline"])]
        text: Option<String>,
        #[arg(long, conflicts_with = "newline")]
        space: bool,
        #[arg(long)]
        newline: bool,
        #[arg(long, default_value_t = 1)]
        repeat: usize,
        #[arg(long)]
        before: bool,
        /// Lines away from the match to insert at.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Copy databases into `dest` and delete all their rows.
    Clear {
        src: PathBuf,
        dest: PathBuf,
        /// Skip password-protected files instead of asking.
        #[arg(long)]
        no_prompt: bool,
    },
    /// Report meaningful row and column counts per table.
    Inspect {
        path: PathBuf,
        #[arg(long)]
        no_prompt: bool,
        #[arg(long)]
        json: bool,
    },
    /// List each table's columns with their declared types.
    Structure {
        path: PathBuf,
        /// Only this table.
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        no_prompt: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct MatchArgs {
    /// File or folder to process.
    path: PathBuf,
    pattern: String,
    /// Treat the pattern as a regular expression.
    #[arg(long)]
    regex: bool,
    #[arg(long)]
    case_sensitive: bool,
    #[arg(long, short)]
    recursive: bool,
}

impl MatchArgs {
    fn matcher(&self) -> Result<Matcher> {
        Matcher::new(&self.pattern, self.regex, self.case_sensitive)
            .with_context(|| format!("Invalid pattern: {}", self.pattern))
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Comma-separated extensions, e.g. `.docx,.pdf`.
    #[arg(long)]
    ext: Option<String>,
    /// Comma-separated name prefixes.
    #[arg(long)]
    names: Option<String>,
    /// Comma-separated full file names.
    #[arg(long)]
    full_names: Option<String>,
    #[arg(long, value_enum)]
    filter_mode: Option<FilterMode>,
}

impl FilterArgs {
    /// Flags win; with none given the `[listing]` defaults apply.
    fn spec(&self, cfg: &Config) -> FilterSpec {
        if self.ext.is_none() && self.names.is_none() && self.full_names.is_none() && self.filter_mode.is_none() {
            return cfg.listing.filter();
        }
        FilterSpec::from_lists(
            self.ext.as_deref().unwrap_or(""),
            self.names.as_deref().unwrap_or(""),
            self.full_names.as_deref().unwrap_or(""),
            self.filter_mode.unwrap_or_default(),
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ListFormat {
    FullPath,
    Stem,
    FileName,
    Extension,
    FolderLevel,
}

#[derive(Args)]
struct StyleArgs {
    #[arg(long)]
    font: Option<String>,
    /// Font size in points.
    #[arg(long)]
    size: Option<f32>,
    #[arg(long)]
    bold: bool,
    #[arg(long)]
    italic: bool,
    #[arg(long)]
    underline: bool,
    /// Text colour as `#RRGGBB`.
    #[arg(long)]
    color: Option<String>,
    #[arg(long, value_enum, conflicts_with = "background")]
    highlight: Option<HighlightColor>,
    /// Background as `#RRGGBB`; palette colours become a highlight,
    /// others become shading.
    #[arg(long)]
    background: Option<String>,
}

impl StyleArgs {
    fn run_format(&self) -> Result<RunFormat> {
        let color = match &self.color {
            Some(c) => Some(
                normalize_hex(c)
                    .with_context(|| format!("Invalid colour: {}", c))?
                    .trim_start_matches('#')
                    .to_string(),
            ),
            None => None,
        };
        let background = match (&self.background, self.highlight) {
            (Some(hex), _) => Some(Background::from_hex(hex).with_context(|| format!("Invalid colour: {}", hex))?),
            (None, Some(h)) => Some(Background::Highlight(h)),
            (None, None) => None,
        };
        Ok(RunFormat {
            font: self.font.clone(),
            size_pt: self.size,
            bold: self.bold.then_some(true),
            italic: self.italic.then_some(true),
            underline: self.underline.then_some(true),
            color,
            ..RunFormat::default()
        }
        .with_background(background))
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "desk_clerk=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_or_default(&cli.config)?;
    let reporter = cli.progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();

    match cli.command {
        Commands::Tree {
            root,
            output,
            separator,
            show_hidden,
        } => {
            let mut opts = TreeOptions::from(&cfg.tree);
            if let Some(sep) = separator {
                opts.separator = sep;
            }
            if show_hidden {
                opts.hide_dot_entries = false;
            }
            let tree = render_tree(&root, &opts)?;
            write_output(output.as_deref(), &tree)?;
        }

        Commands::List {
            root,
            files_only,
            folders_only,
            recursive,
            max_depth,
            filter,
            format,
            level,
            no_folder,
            no_file,
            no_extension,
            output,
        } => {
            let format = match format {
                ListFormat::FullPath => OutputFormat::FullPath,
                ListFormat::Stem => OutputFormat::Stem,
                ListFormat::FileName => OutputFormat::FileName,
                ListFormat::Extension => OutputFormat::Extension,
                ListFormat::FolderLevel => OutputFormat::FolderLevel(FolderLevel {
                    level,
                    folder: !no_folder,
                    file: !no_file,
                    extension: !no_extension,
                }),
            };
            let opts = ListOptions {
                list_files: !folders_only,
                list_folders: !files_only,
                recursive,
                max_depth,
                filter: filter.spec(&cfg),
                format,
            };
            let listing = list_items(&root, &opts)?;
            let text: String = listing.lines().map(|l| format!("{}\n", l)).collect();
            write_output(output.as_deref(), &text)?;
        }

        Commands::Count { root, per_folder } => {
            let report = count_files(&root, &cfg.count.ignored_folders, &cfg.count.ignored_files)?;
            if per_folder {
                for (folder, n) in &report.per_folder {
                    println!("{}: {}", folder.display(), n);
                }
            }
            println!("Total files: {}", report.total);
        }

        Commands::Copy { src, dest, mode } => {
            let summary = copy_listed(&src, &dest, mode)?;
            println!(
                "Created {} folder(s), copied {} file(s) into {}",
                summary.folders_created,
                summary.files_copied,
                dest.display()
            );
        }

        Commands::CopyDocs { src, dest, top_only } => {
            let report = copy_documents(&src, &dest, !top_only, reporter.as_ref())?;
            println!("Copied {} document(s) into {}", report.copied.len(), dest.display());
            for (path, err) in &report.failed {
                println!("Failed: {} ({})", path.display(), err);
            }
        }

        Commands::Wipe {
            root,
            permanent,
            trash_dir,
        } => {
            let trash: Box<dyn Trash> = if permanent || !cfg.wipe.use_trash {
                Box::new(PermanentDelete)
            } else {
                match trash_dir.or_else(|| cfg.wipe.resolved_trash_dir()) {
                    Some(dir) => Box::new(
                        DirectoryTrash::new(&dir)
                            .with_context(|| format!("Failed to create trash folder {}", dir.display()))?,
                    ),
                    None => {
                        tracing::warn!("no trash folder available, deleting permanently");
                        Box::new(PermanentDelete)
                    }
                }
            };
            let report = wipe_and_recycle(&root, &cfg.wipe.retry_policy(), trash.as_ref(), reporter.as_ref())?;
            println!(
                "Deleted {}/{} file(s) and {}/{} folder(s)",
                report.files_deleted, report.files_found, report.folders_deleted, report.folders_found
            );
            if report.root_removed {
                println!("Removed {}", root.display());
            }
            for f in &report.failures {
                println!("Failed ({:?}): {} ({})", f.stage, f.path.display(), f.message);
            }
            if !report.failures.is_empty() {
                bail!("{} item(s) could not be removed", report.failures.len());
            }
        }

        Commands::Headings {
            src,
            out,
            scheme,
            pattern,
            recursive,
            no_docx,
        } => {
            let opts = HeadingsOptions {
                scheme: scheme.unwrap_or(cfg.headings.scheme),
                pattern: pattern.unwrap_or_else(|| cfg.headings.pattern.clone()),
                recursive,
                write_docx: !no_docx,
            };
            let out_dir = out.unwrap_or_else(|| cfg.headings.output_dir.clone());
            let report = process_path(&src, &out_dir, &opts)?;
            println!(
                "Processed {} document(s) into {}",
                report.processed.len(),
                out_dir.display()
            );
            for (path, err) in &report.failed {
                println!("Failed: {} ({})", path.display(), err);
            }
        }

        Commands::Search {
            target,
            scope,
            kinds,
            json,
        } => {
            let matcher = target.matcher()?;
            let kinds = if kinds.is_empty() {
                KindFilter(vec![DocumentKind::Text, DocumentKind::Docx, DocumentKind::Pdf])
            } else {
                KindFilter(kinds)
            };
            let opts = SearchOptions {
                recursive: target.recursive,
                kinds,
                scope,
            };
            let results = search::search_path(&target.path, &matcher, &opts)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", search::render(&results));
            }
        }

        Commands::Replace {
            target,
            replacement,
            scope,
            heading_format,
            style,
        } => {
            let matcher = target.matcher()?;
            let replacement = Replacement::formatted(&replacement, &style.run_format()?);
            let opts = ReplaceOptions {
                scope,
                apply_heading_format: heading_format,
                recursive: target.recursive,
                kinds: KindFilter(vec![DocumentKind::Text, DocumentKind::Docx]),
            };
            let summary = replace_path(&target.path, &matcher, &replacement, &opts, reporter.as_ref())?;
            print!("{}", summary.render());
        }

        Commands::Format {
            path,
            recursive,
            target,
            skip_headings,
            skip_images,
            skip_tables,
            filter,
            filter_regex,
            exclude_filter,
            style,
        } => {
            let opts = FormatOptions {
                style: style.run_format()?,
                target,
                include_headings: !skip_headings,
                include_images: !skip_images,
                include_tables: !skip_tables,
                filter: ParagraphFilter::new(
                    filter.as_deref().unwrap_or_default(),
                    filter_regex,
                    if exclude_filter {
                        FilterOption::Excluded
                    } else {
                        FilterOption::Included
                    },
                ),
            };
            if opts.style.is_empty() {
                bail!("No formatting given; use --bold, --font, --color, ...");
            }
            let report = format_path(&path, recursive, &opts)?;
            for (file, n) in &report.files {
                println!("{}: {} paragraph(s) formatted", file.display(), n);
            }
            for (file, err) in &report.failed {
                println!("Failed: {} ({})", file.display(), err);
            }
        }

        Commands::Edit { action } => {
            let (target, op) = match action {
                EditAction::RemoveBlank { target, before, all } => {
                    let position = if before { Position::Before } else { Position::After };
                    (target, EditOp::RemoveBlank { position, all })
                }
                EditAction::Insert {
                    target,
                    text,
                    space,
                    newline,
                    repeat,
                    before,
                    offset,
                } => {
                    let what = match (text, space, newline) {
                        (Some(t), _, _) => Insert::Text(t),
                        (None, true, _) => Insert::Space,
                        (None, false, true) => Insert::Newline,
                        (None, false, false) => bail!("Nothing to insert; use --text, --space or --newline"),
                    };
                    let position = if before { Position::Before } else { Position::After };
                    (
                        target,
                        EditOp::Insert {
                            what,
                            repeat,
                            position,
                            offset,
                        },
                    )
                }
            };
            let matcher = target.matcher()?;
            let report = edit_path(&target.path, &matcher, &op, target.recursive)?;
            for (file, n) in &report.edited {
                println!("{}: {} edit(s)", file.display(), n);
            }
            for (file, err) in &report.skipped {
                println!("Skipped: {} ({})", file.display(), err);
            }
            println!("Total: {} edit(s) in {} file(s)", report.total(), report.edited.len());
        }

        Commands::Db { action } => {
            let extensions = cfg.db.extension_list();
            match action {
                DbAction::Clear { src, dest, no_prompt } => {
                    let prompt = password_prompt(no_prompt);
                    let report = dbcopy::process_folder(
                        &SqliteDriver,
                        prompt.as_ref(),
                        &src,
                        &dest,
                        &extensions,
                        reporter.as_ref(),
                    )
                    .await?;
                    for db in &report.cleared {
                        println!("Cleared {} ({} table(s))", db.copy.display(), db.tables.len());
                    }
                    for path in &report.skipped {
                        println!("Skipped (no password): {}", path.display());
                    }
                    for (path, err) in &report.failed {
                        println!("Failed: {} ({})", path.display(), err);
                    }
                }
                DbAction::Inspect { path, no_prompt, json } => {
                    let prompt = password_prompt(no_prompt);
                    let inspections =
                        dbcopy::inspect_path(&SqliteDriver, prompt.as_ref(), &path, &extensions).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&inspections)?);
                    } else {
                        for i in &inspections {
                            println!("{}", i.render());
                        }
                    }
                }
                DbAction::Structure { path, table, no_prompt, json } => {
                    let prompt = password_prompt(no_prompt);
                    let found = dbcopy::structure_path(
                        &SqliteDriver,
                        prompt.as_ref(),
                        &path,
                        &extensions,
                        table.as_deref(),
                    )
                    .await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&found)?);
                    } else {
                        for db in &found {
                            println!("{}", db.render());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn password_prompt(no_prompt: bool) -> Box<dyn PasswordPrompt> {
    if no_prompt {
        Box::new(NoPrompt)
    } else {
        Box::new(StdinPrompt)
    }
}
