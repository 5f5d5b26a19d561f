// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Turns figment errors into miette reports that point at the offending line
//! of `herald.toml` and, for misspelt keys, name the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a valid key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {section}")]
    #[diagnostic(
        code(herald::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// `[section]` the key appeared in, or "the top level".
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(herald::config::wrong_type), help("expected {expected}"))]
    WrongType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(herald::config::missing_key),
        help("add `{key} = <value>` to herald.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(herald::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(herald::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// TOML files that may have contributed to a failed load, by display path.
struct Sources<'a> {
    files: &'a [(String, String)],
}

impl<'a> Sources<'a> {
    /// The file the error came from. When figment cannot say (inline
    /// strings, env overrides) and there is only one candidate, that one.
    fn origin(&self, error: &FigmentError) -> Option<&'a (String, String)> {
        let from_metadata = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });
        match from_metadata {
            Some(path) => self.files.iter().find(|(p, _)| *p == path),
            None if self.files.len() == 1 => self.files.first(),
            None => None,
        }
    }

    fn locate(
        &self,
        error: &FigmentError,
        section: &[String],
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((path, content)) = self.origin(error) else {
            return (None, None);
        };
        match find_key_offset(content, section, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(path, content.clone())),
            ),
            None => (None, None),
        }
    }
}

/// Converts every error inside `err` into a diagnostic.
pub fn figment_to_config_errors(
    err: FigmentError,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = Sources {
        files: toml_sources,
    };

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = sources.locate(&error, &path, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section: describe_section(&path),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&path, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let (section, key) = match path.split_last() {
                        Some((key, section)) => (section.to_vec(), key.clone()),
                        None => (Vec::new(), String::new()),
                    };
                    let (span, src) = sources.locate(&error, &section, &key);
                    ConfigError::WrongType {
                        key: path.join("."),
                        found: actual.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn describe_section(path: &[String]) -> String {
    if path.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{}]", path.join("."))
    }
}

fn dotted(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

/// Byte offset of `key` inside the `[a.b]` table named by `section`.
///
/// Only lines between that table header and the next header are searched.
/// An empty `section` searches the top level, before the first header.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut in_table = section.is_empty();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.trim_start_matches('[').split(']').next().unwrap_or("");
            in_table = !section.is_empty() && name.trim() == wanted;
            continue;
        }
        if !in_table {
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        let Some(rest) = line.trim_start().strip_prefix(key) else {
            continue;
        };
        if rest.trim_start().starts_with('=') {
            return Some(start + indent);
        }
    }

    None
}

/// The valid key closest to `unknown`, if any is close enough to be a typo.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints each diagnostic to stderr with miette's graphical renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggests_close_key() {
        let valid = &["enabled", "schedule", "retention_days", "media_dir"];
        assert_eq!(
            suggest_key("retention_dyas", valid),
            Some("retention_days".to_string())
        );
        assert_eq!(
            suggest_key("max_atempts", &["max_attempts", "retry_delay_ms"]),
            Some("max_attempts".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(suggest_key("zzzzzz", &["name", "log_level"]), None);
    }

    #[test]
    fn finds_key_inside_its_section_only() {
        let content = "[service]\nprot = 1\n[gateway]\nprot = 3000\n";
        let offset = find_key_offset(content, &path(&["gateway"]), "prot").unwrap();
        assert_eq!(&content[offset..offset + 4], "prot");
        assert!(offset > content.find("[gateway]").unwrap());
    }

    #[test]
    fn nested_tables_and_top_level() {
        let content = "log = 1\n[gateway]\nport = 1\n[gateway.tokens]\n  abc = \"t\"\n";
        let offset = find_key_offset(content, &path(&["gateway", "tokens"]), "abc").unwrap();
        assert_eq!(&content[offset..offset + 3], "abc");
        assert_eq!(find_key_offset(content, &[], "log"), Some(0));
        assert_eq!(find_key_offset(content, &[], "port"), None);
    }

    #[test]
    fn missing_section_has_no_offset() {
        let content = "[service]\nname = \"x\"\n";
        assert_eq!(find_key_offset(content, &path(&["relay"]), "name"), None);
    }

    #[test]
    fn key_prefix_is_not_a_match() {
        let content = "[dispatch]\nmax_attempts_total = 3\n";
        assert_eq!(
            find_key_offset(content, &path(&["dispatch"]), "max_attempts"),
            None
        );
    }
}
