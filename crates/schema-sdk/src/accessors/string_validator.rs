//! Named string pattern validators.

use regex::Regex;

use crate::document::{SchemaDocument, StringPattern};
use crate::error::{Result, SchemaError};

/// A compiled string pattern.
#[derive(Debug, Clone)]
pub struct StringValidator {
    name: String,
    regex: Regex,
}

impl StringValidator {
    /// Compiles `pattern`, translating its flags into inline regex flags.
    ///
    /// Supported flags are `i`, `m`, `s` and `x`. `g`, `u` and `y` only
    /// affect matching state in other engines and are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Parse` for an unknown flag or an invalid regex.
    pub fn compile(name: &str, pattern: &StringPattern) -> Result<Self> {
        let mut inline = String::new();
        for flag in pattern.flags().unwrap_or_default().chars() {
            match flag {
                'i' | 'm' | 's' | 'x' => inline.push(flag),
                'g' | 'u' | 'y' => {}
                other => {
                    return Err(SchemaError::parse(format!(
                        "string pattern `{name}` has unsupported flag `{other}`"
                    )));
                }
            }
        }

        let source = if inline.is_empty() {
            pattern.pattern().to_string()
        } else {
            format!("(?{inline}){}", pattern.pattern())
        };
        let regex = Regex::new(&source)
            .map_err(|e| SchemaError::parse(format!("string pattern `{name}`: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            regex,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }
}

/// Compiles the validator for pattern `name`.
///
/// # Errors
///
/// Returns `SchemaError::InvalidStringPattern` if the schema declares no
/// such pattern.
pub fn get_string_validator(document: &SchemaDocument, name: &str) -> Result<StringValidator> {
    let pattern = document
        .schema
        .string_patterns
        .get(name)
        .ok_or_else(|| SchemaError::InvalidStringPattern(name.to_string()))?;
    StringValidator::compile(name, pattern)
}
