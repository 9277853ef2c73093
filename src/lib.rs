//! # Desk Clerk
//!
//! Office and file automation utilities behind one CLI (`clerk`).
//!
//! Desk Clerk bundles the chores that pile up around shared folders and
//! Word documents: drawing folder trees, listing and counting files,
//! copying folder skeletons or every document in a tree, deleting folders
//! that other programs keep locked, numbering headings, and bulk
//! search/replace/formatting inside `.txt` and `.docx` files. Database
//! files can be copied with their data cleared.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Filesystem  │   │  DOCX model  │   │   SQLite     │
//! │ tree/list/.. │   │ zip + xml    │   │   (sqlx)     │
//! │ copy / wipe  │   │ runs, paras  │   │              │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │      ┌───────────┴────────┐         │
//!        │      ▼                    ▼         │
//!        │  headings   search/replace/format   │
//!        │              edit                   │
//!        └──────────────┬──────────────────────┘
//!                       ▼
//!                ┌─────────────┐
//!                │ CLI (clerk) │
//!                └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! clerk tree ~/Projects --output tree.txt
//! clerk copy-docs ./incoming ./flat
//! clerk headings ./reports --scheme outline
//! clerk search ./docs "invoice \d+" --regex
//! clerk replace ./docs ACME "Acme Ltd" --bold --highlight yellow
//! clerk wipe ./stale-build
//! clerk db clear ./templates ./empty-templates
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`sort`] | Natural sort keys |
//! | [`filter`] | Extension/name filter predicate |
//! | [`tree`] | Folder tree renderer |
//! | [`listing`] | Per-folder listings and file counts |
//! | [`copy`] | Folder skeleton and document copying |
//! | [`retry`] | Retry policy for locked files |
//! | [`wipe`] | Safe delete through a trash |
//! | [`docx`] | Word document model |
//! | [`highlight`] | Highlight palette |
//! | [`headings`] | Heading extraction and numbering |
//! | [`search`] | Pattern search over documents |
//! | [`replace`] | Formatted find and replace |
//! | [`format`] | Paragraph styling |
//! | [`edit`] | Blank-line removal and insertion at matches |
//! | [`dbcopy`] | Database structure copier |
//! | [`progress`] | Progress reporting |

pub mod config;
pub mod copy;
pub mod dbcopy;
pub mod docx;
pub mod edit;
pub mod filter;
pub mod format;
pub mod headings;
pub mod highlight;
pub mod listing;
pub mod progress;
pub mod replace;
pub mod retry;
pub mod search;
pub mod sort;
pub mod tree;
pub mod wipe;
