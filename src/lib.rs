//! svnorm: structural variant VCF normalizer
//!
//! Rebuilds every record of a structural-variant VCF from a field-mapping
//! configuration, so calls from different callers end up with the same INFO
//! and FORMAT schema. Mated breakends can be folded into breakpoint records
//! and breakpoint records split into breakend pairs.
//!
//! # Example
//!
//! ```rust,no_run
//! use svnorm::{commands::NormalizeCommand, config::Configuration, notation::Notation};
//!
//! let config = Configuration::from_path("delly.yaml").unwrap();
//! let cmd = NormalizeCommand::new().with_notation(Notation::Breakpoint);
//! let stats = cmd.run("calls.vcf.gz", &config, std::io::stdout()).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod commands;
pub mod config;
pub mod function;
pub mod header;
pub mod notation;
pub mod output;
pub mod record;
pub mod resolve;
pub mod standardize;
pub mod vcf;
pub mod warnings;

// Re-export commonly used types
pub use config::Configuration;
pub use header::Header;
pub use record::Record;
pub use vcf::{parse_vcf, read_vcf, Result, VcfError, VcfFile, VcfReader};
pub use warnings::Warnings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{NormalizeCommand, NormalizeStats};
    pub use crate::config::{ConfigFieldSpec, Configuration, ConfigurationBuilder};
    pub use crate::notation::Notation;
    pub use crate::record::Record;
    pub use crate::standardize::{to_text, Standardizer};
    pub use crate::vcf::{parse_vcf, read_vcf, VcfFile, VcfReader};
    pub use crate::warnings::Warnings;
}
