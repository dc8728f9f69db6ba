//! Minimal INI document that round-trips a `my.cnf` template.
//!
//! Sections and keys keep their template order. Comments and blank lines
//! survive a load/write cycle; key lines are normalized to `key = value`.
//! Values can only be overwritten, never added, so a generated file always
//! has exactly the shape of its template.

use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use crate::{MyCnfError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    /// `None` for flag-style keys such as `skip-name-resolve`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank,
    Comment(String),
    Entry(Entry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    lines: Vec<Line>,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(entry) => Some(entry),
            _ => None,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries().find(|e| e.key.eq_ignore_ascii_case(key))
    }

    fn matching_mut<'a>(&'a mut self, key: &'a str) -> impl Iterator<Item = &'a mut Entry> {
        self.lines.iter_mut().filter_map(move |line| match line {
            Line::Entry(entry) if entry.key.eq_ignore_ascii_case(key) => Some(entry),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MyCnfDocument {
    // Comments and blank lines ahead of the first section header.
    preamble: Vec<Line>,
    sections: Vec<Section>,
}

impl MyCnfDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MyCnfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Value of `key` in `section`; `None` when the key is missing or valueless.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)?.value.as_deref()
    }

    /// Overwrites the value of an existing key. Repeated keys are all
    /// overwritten, since mysqld reads the last occurrence.
    pub fn set(&mut self, section: &str, key: &str, value: impl ToString) -> Result<()> {
        let sect = self
            .sections
            .iter_mut()
            .find(|s| s.name == section)
            .ok_or_else(|| MyCnfError::MissingSection(section.to_string()))?;

        let value = value.to_string();
        let mut updated = 0;
        for entry in sect.matching_mut(key) {
            entry.value = Some(value.clone());
            updated += 1;
        }
        if updated == 0 {
            return Err(MyCnfError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

impl FromStr for MyCnfDocument {
    type Err = MyCnfError;

    fn from_str(text: &str) -> Result<Self> {
        let mut doc = MyCnfDocument::default();

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                doc.current_lines().push(Line::Blank);
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                doc.current_lines().push(Line::Comment(raw.trim_end().to_string()));
                continue;
            }

            // Indented lines continue the value of the entry right above them.
            if raw.starts_with(char::is_whitespace) {
                let previous = doc.sections.last_mut().and_then(|s| s.lines.last_mut());
                if let Some(Line::Entry(entry)) = previous {
                    let value = entry.value.get_or_insert_with(String::new);
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                    continue;
                }
            }

            if let Some(inner) = trimmed.strip_prefix('[') {
                let name = inner.strip_suffix(']').ok_or_else(|| MyCnfError::Parse {
                    line: lineno,
                    message: format!("unterminated section header {trimmed:?}"),
                })?;
                if doc.has_section(name) {
                    return Err(MyCnfError::Parse {
                        line: lineno,
                        message: format!("duplicate section [{name}]"),
                    });
                }
                doc.sections.push(Section {
                    name: name.to_string(),
                    lines: Vec::new(),
                });
                continue;
            }

            let section = doc.sections.last_mut().ok_or_else(|| MyCnfError::Parse {
                line: lineno,
                message: format!("{trimmed:?} appears before any section header"),
            })?;
            section.lines.push(Line::Entry(parse_entry(trimmed)));
        }

        Ok(doc)
    }
}

impl MyCnfDocument {
    fn current_lines(&mut self) -> &mut Vec<Line> {
        match self.sections.last_mut() {
            Some(section) => &mut section.lines,
            None => &mut self.preamble,
        }
    }
}

fn parse_entry(line: &str) -> Entry {
    match line.find(|c: char| c == '=' || c == ':') {
        Some(pos) => Entry {
            key: line[..pos].trim().to_string(),
            value: Some(line[pos + 1..].trim().to_string()),
        },
        None => Entry {
            key: line.to_string(),
            value: None,
        },
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Blank => writeln!(f),
            Line::Comment(text) => writeln!(f, "{text}"),
            Line::Entry(Entry { key, value: None }) => writeln!(f, "{key}"),
            Line::Entry(Entry {
                key,
                value: Some(value),
            }) => writeln!(f, "{key} = {}", value.replace('\n', "\n\t")),
        }
    }
}

impl Display for MyCnfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.preamble {
            write!(f, "{line}")?;
        }
        for section in &self.sections {
            writeln!(f, "[{}]", section.name)?;
            for line in &section.lines {
                write!(f, "{line}")?;
            }
        }
        Ok(())
    }
}
