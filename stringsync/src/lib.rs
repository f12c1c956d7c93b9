#![forbid(unsafe_code)]
//! Android `strings.xml` synchronization toolkit for Rust.
//!
//! Finds the string resources of every module in a project, works out what
//! each translation lacks compared with the default language, and merges new
//! translations back into the files without disturbing anything else in them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stringsync::{ScanOptions, check_missing, scan};
//!
//! let modules = scan(&["./app"], &ScanOptions::new())?;
//! let report = check_missing(&modules);
//! for (module, languages) in &report.modules {
//!     println!("{module}: {} incomplete languages", languages.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Building blocks
//!
//! - [`module::scan`]: discovers `values*/strings.xml` files, honoring `.gitignore`
//!   files or an explicit folder exclusion list
//! - [`ResourceDocument`] and [`Baseline`]: what a file contains, and the merged
//!   default-language view of a module
//! - [`diff::diff`]: the strings and plural groups a translation still needs
//! - [`escape::escape`]: Android escaping, aligned with the base text's markup
//! - [`writer::flush`]: surgical write-back that keeps comments, order and indentation
//! - [`translate::translate_modules`]: drives a [`Translator`] over everything pending

pub mod diff;
pub mod document;
pub mod error;
pub mod escape;
pub mod ignore_rules;
pub mod language;
pub mod module;
pub mod report;
pub mod scan_options;
pub mod traits;
pub mod translate;
pub mod types;
pub mod writer;
pub mod xml;

// Re-export most used types for easy consumption
pub use crate::{
    diff::{DiffResult, diff, diff_documents},
    document::{Baseline, ResourceDocument},
    error::Error,
    escape::escape,
    module::{Modules, ResourceModule, scan},
    report::{
        MissingReport, MissingTranslations, check_missing, render_missing_report,
        render_translation_report,
    },
    scan_options::ScanOptions,
    traits::{TranslationContext, Translator},
    translate::{
        TranslateOptions, TranslationLog, TranslationSummary, translate_document,
        translate_modules,
    },
    types::{Language, QuantityCategory, QuantityMap},
};
