//! Declarative case catalog: modules, cases, and O(1) lookup by name.
//!
//! The catalog is a JSON array of module records, conventionally at
//! `cases/cases.json`:
//!
//! ```json
//! [
//!   {
//!     "name": "adder",
//!     "g_in_tdata_width": 8,
//!     "g_out_tdata_width": 8,
//!     "cases": [
//!       { "number": "001", "title": "two operands" },
//!       { "number": "002", "invert": true }
//!     ]
//!   }
//! ]
//! ```
//!
//! Loading validates the whole catalog up front; there is no mutation API.
//! Reload by calling [`Catalog::load`] again.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ── Records ──────────────────────────────────────────────────────────────

/// One module under test: a named group of cases sharing interface widths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Unique module name, passed to the simulator as `-gg_module`.
    pub name: String,
    /// Input data-path width in bits. Must be positive.
    pub g_in_tdata_width: u32,
    /// Output data-path width in bits. Must be positive.
    pub g_out_tdata_width: u32,
    /// Cases in declaration order; results preserve this order.
    pub cases: Vec<Case>,
}

/// One test scenario within a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Case number, unique within its module (e.g. `"001"`).
    pub number: String,
    /// Optional human-readable title, appended to the case name in
    /// narration and reports.
    #[serde(default)]
    pub title: Option<String>,
    /// The simulator is expected to *fail* (exit non-zero) for this case.
    #[serde(default)]
    pub invert: bool,
}

impl Case {
    /// Display name used in narration and the report.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) => format!("{} {title}", self.number),
            None => self.number.clone(),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Reasons a catalog fails to load. All of these abort the run before any
/// child process is spawned.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read catalog at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse catalog at {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("duplicate module name `{0}`")]
    DuplicateModule(String),

    #[error("module `{module}`: duplicate case number `{number}`")]
    DuplicateCase { module: String, number: String },

    #[error("module `{module}`: {reason}")]
    InvalidModule { module: String, reason: String },
}

// ── Catalog ──────────────────────────────────────────────────────────────

/// Immutable, order-preserving collection of modules with indexed lookup.
#[derive(Debug, Clone)]
pub struct Catalog {
    modules: Vec<Module>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load and validate a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read, the JSON is
    /// malformed or missing required fields, a module name or case number
    /// is duplicated, or a width parameter is zero.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let modules: Vec<Module> =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_modules(modules)
    }

    /// Validate and index an in-memory module list.
    ///
    /// # Errors
    ///
    /// Same validation failures as [`Catalog::load`], minus the I/O ones.
    pub fn from_modules(modules: Vec<Module>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(modules.len());
        for (i, module) in modules.iter().enumerate() {
            if module.g_in_tdata_width == 0 || module.g_out_tdata_width == 0 {
                return Err(CatalogError::InvalidModule {
                    module: module.name.clone(),
                    reason: "tdata widths must be positive".to_owned(),
                });
            }
            let mut numbers = HashSet::with_capacity(module.cases.len());
            for case in &module.cases {
                if !numbers.insert(case.number.as_str()) {
                    return Err(CatalogError::DuplicateCase {
                        module: module.name.clone(),
                        number: case.number.clone(),
                    });
                }
            }
            if index.insert(module.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateModule(module.name.clone()));
            }
        }
        Ok(Self { modules, index })
    }

    /// Look up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.index.get(name).map(|&i| &self.modules[i])
    }

    /// All modules in catalog declaration order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
