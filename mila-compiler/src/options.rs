use serde::{Deserialize, Serialize};

/// How a declared `array [lower .. upper]` maps source indices to cells.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayIndexing {
    /// `|upper - lower|` cells, source index used as the cell offset.
    #[default]
    ZeroBased,
    /// `|upper - lower| + 1` cells, cell offset is `index - min(lower, upper)`.
    LowerBoundRelative,
}

impl ArrayIndexing {
    pub fn element_count(self, lower: i32, upper: i32) -> usize {
        let span = (i64::from(upper) - i64::from(lower)).unsigned_abs() as usize;
        match self {
            ArrayIndexing::ZeroBased => span,
            ArrayIndexing::LowerBoundRelative => span + 1,
        }
    }

    /// Index that maps to cell 0.
    pub fn origin(self, lower: i32, upper: i32) -> i32 {
        match self {
            ArrayIndexing::ZeroBased => 0,
            ArrayIndexing::LowerBoundRelative => lower.min(upper),
        }
    }
}

fn default_module_name() -> String {
    "mila".to_string()
}

fn default_true() -> bool {
    true
}

/// Options for [`crate::generate`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CodegenOptions {
    #[serde(default = "default_module_name")]
    pub module_name: String,
    #[serde(default)]
    pub array_indexing: ArrayIndexing,
    /// Run the IR verifier on the generated module.
    #[serde(default = "default_true")]
    pub verify: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            module_name: default_module_name(),
            array_indexing: ArrayIndexing::ZeroBased,
            verify: true,
        }
    }
}
