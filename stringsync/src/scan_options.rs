//! Options controlling how resource roots are scanned.

pub const DEFAULT_FILE_NAME: &str = "strings.xml";

/// Scan behavior options for [`crate::module::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Name of the resource files to collect.
    pub file_name: String,
    /// Directory names to exclude. When non-empty, pattern files are not consulted.
    pub ignore_folders: Vec<String>,
    /// Whether `.gitignore` files above and inside the roots exclude files.
    pub use_pattern_files: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            file_name: DEFAULT_FILE_NAME.to_string(),
            ignore_folders: Vec::new(),
            use_pattern_files: true,
        }
    }
}

impl ScanOptions {
    /// Creates default scan options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Sets the explicit folder exclusion list.
    pub fn with_ignore_folders(mut self, ignore_folders: Vec<String>) -> Self {
        self.ignore_folders = ignore_folders;
        self
    }

    /// Enables/disables `.gitignore` handling.
    pub fn with_pattern_files(mut self, use_pattern_files: bool) -> Self {
        self.use_pattern_files = use_pattern_files;
        self
    }
}
