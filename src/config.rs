//! Field-mapping configuration.
//!
//! A configuration says how every output attribute is rebuilt from the
//! original record: an id template, an SVTYPE remapping table and one
//! [`ConfigFieldSpec`] per output INFO and FORMAT field.
//!
//! Configuration is built in two steps. [`ConfigurationBuilder`] is what the
//! YAML file deserializes into; [`ConfigurationBuilder::finalize`] injects the
//! built-in fields and yields a read-only [`Configuration`].
//!
//! ```
//! use svnorm::config::Configuration;
//!
//! let config = Configuration::from_yaml_str("id: sample\nalt:\n  BND: TRA\n").unwrap();
//! assert_eq!(config.remap_alt("BND"), Some("TRA"));
//! assert!(config.info("SVTYPE").is_some());
//! ```

use crate::header::FieldType;
use crate::vcf::{Result, VcfError};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// How one output field is computed and declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigFieldSpec {
    /// Template resolved against the original record.
    #[serde(deserialize_with = "scalar")]
    pub value: String,
    /// Replacement values for references missing from a record, keyed by the
    /// exact reference token (e.g. `$INFO/SVLEN`).
    #[serde(deserialize_with = "scalar_map")]
    pub defaults: BTreeMap<String, String>,
    #[serde(deserialize_with = "scalar")]
    pub description: String,
    #[serde(deserialize_with = "scalar")]
    pub number: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Templates that replace `value` for specific SVTYPEs.
    #[serde(rename = "alts", alias = "overrides", deserialize_with = "scalar_map")]
    pub overrides: BTreeMap<String, String>,
}

impl ConfigFieldSpec {
    pub fn new(value: impl Into<String>, number: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            value: value.into(),
            number: number.into(),
            field_type,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_override(mut self, svtype: impl Into<String>, template: impl Into<String>) -> Self {
        self.overrides.insert(svtype.into(), template.into());
        self
    }

    pub fn with_default(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(token.into(), value.into());
        self
    }

    /// Template to use for a record of the given SVTYPE.
    pub fn template_for(&self, svtype: &str) -> &str {
        self.overrides
            .get(svtype)
            .map(String::as_str)
            .unwrap_or(&self.value)
    }

    #[inline]
    pub fn is_flag(&self) -> bool {
        self.field_type == FieldType::Flag
    }
}

/// Configuration as read from YAML, before built-in fields are injected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigurationBuilder {
    #[serde(deserialize_with = "scalar")]
    pub id: String,
    #[serde(deserialize_with = "scalar_map")]
    pub alt: BTreeMap<String, String>,
    pub info: BTreeMap<String, ConfigFieldSpec>,
    pub format: BTreeMap<String, ConfigFieldSpec>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn with_id(mut self, template: impl Into<String>) -> Self {
        self.id = template.into();
        self
    }

    pub fn with_alt(mut self, svtype: impl Into<String>, remapped: impl Into<String>) -> Self {
        self.alt.insert(svtype.into(), remapped.into());
        self
    }

    pub fn with_info(mut self, id: impl Into<String>, spec: ConfigFieldSpec) -> Self {
        self.info.insert(id.into(), spec);
        self
    }

    pub fn with_format(mut self, id: impl Into<String>, spec: ConfigFieldSpec) -> Self {
        self.format.insert(id.into(), spec);
        self
    }

    /// Inject missing built-in fields and freeze.
    pub fn finalize(mut self) -> Configuration {
        for (id, spec) in builtin_info_fields() {
            self.info.entry(id.to_string()).or_insert(spec);
        }
        for (id, spec) in builtin_format_fields() {
            self.format.entry(id.to_string()).or_insert(spec);
        }
        for spec in self.info.values_mut().chain(self.format.values_mut()) {
            if spec.number.trim().is_empty() {
                spec.number = if spec.is_flag() { "0" } else { "." }.to_string();
            }
        }

        Configuration {
            id_template: self.id,
            alt_remap: self.alt,
            info: self.info,
            format: self.format,
        }
    }
}

fn builtin_info_fields() -> Vec<(&'static str, ConfigFieldSpec)> {
    vec![
        (
            "SVTYPE",
            ConfigFieldSpec::new("$INFO/SVTYPE", "1", FieldType::String)
                .with_description("Type of structural variant"),
        ),
        (
            "SVLEN",
            ConfigFieldSpec::new("$INFO/SVLEN", "1", FieldType::Integer)
                .with_description("Difference in length between REF and ALT alleles"),
        ),
        (
            "END",
            ConfigFieldSpec::new("$INFO/END", "1", FieldType::Integer)
                .with_description("End position of the variant described in this record")
                .with_override("BND", ""),
        ),
        (
            "CHR2",
            ConfigFieldSpec::new("", "1", FieldType::String)
                .with_description("Chromosome of the end position of the variant")
                .with_override("TRA", "$INFO/CHR2"),
        ),
        (
            "IMPRECISE",
            ConfigFieldSpec::new("$INFO/IMPRECISE", "0", FieldType::Flag)
                .with_description("Imprecise structural variation"),
        ),
    ]
}

fn builtin_format_fields() -> Vec<(&'static str, ConfigFieldSpec)> {
    vec![(
        "GT",
        ConfigFieldSpec::new("$FORMAT/GT", "1", FieldType::String).with_description("Genotype"),
    )]
}

/// Finalized, read-only configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    id_template: String,
    alt_remap: BTreeMap<String, String>,
    info: BTreeMap<String, ConfigFieldSpec>,
    format: BTreeMap<String, ConfigFieldSpec>,
}

impl Default for Configuration {
    fn default() -> Self {
        ConfigurationBuilder::new().finalize()
    }
}

impl Configuration {
    /// Parse and finalize a YAML configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(ConfigurationBuilder::from_yaml_str(content)?.finalize())
    }

    /// Load and finalize a YAML configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VcfError::Config(format!(
                "Failed to open the config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn id_template(&self) -> &str {
        &self.id_template
    }

    /// Replacement SVTYPE for `svtype`, if one is configured.
    pub fn remap_alt(&self, svtype: &str) -> Option<&str> {
        self.alt_remap.get(svtype).map(String::as_str)
    }

    pub fn info(&self, id: &str) -> Option<&ConfigFieldSpec> {
        self.info.get(id)
    }

    pub fn format(&self, id: &str) -> Option<&ConfigFieldSpec> {
        self.format.get(id)
    }

    /// Configured INFO fields in id order.
    pub fn info_fields(&self) -> impl Iterator<Item = (&str, &ConfigFieldSpec)> {
        self.info.iter().map(|(id, spec)| (id.as_str(), spec))
    }

    /// Configured FORMAT fields in id order.
    pub fn format_fields(&self) -> impl Iterator<Item = (&str, &ConfigFieldSpec)> {
        self.format.iter().map(|(id, spec)| (id.as_str(), spec))
    }
}

/// Accept any YAML scalar where a string is expected (`number: 1`, `defaults: {X: 0}`).
fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(value).map_err(serde::de::Error::custom)
}

fn scalar_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error> {
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect::<std::result::Result<_, _>>()
        .map_err(serde::de::Error::custom)
}

fn scalar_to_string(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        other => Err(format!("expected a scalar value, found {:?}", other)),
    }
}
