//! Reader and writer for the sectioned `key = value` configuration format.
//!
//! The reader is strict: duplicate sections or options inside one text,
//! options outside of any section, and lines that are neither headers nor
//! options are rejected with the offending line number. Only whole lines
//! starting with `;` or `#` are comments; anything after a value belongs to
//! the value.

use crate::errors::ConfigError;

/// One `[section]` block as it appeared in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    pub name: String,
    pub options: Vec<(String, String)>,
}

impl ParsedSection {
    fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|(name, _)| name == option)
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::ConfigParseError {
        line,
        message: message.into(),
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with(';') || trimmed.starts_with('#')
}

/// `[name]`, optionally followed by a comment.
fn section_header(trimmed: &str) -> Option<&str> {
    let (name, rest) = trimmed.strip_prefix('[')?.split_once(']')?;
    let rest = rest.trim_start();
    if name.is_empty() || !(rest.is_empty() || is_comment(rest)) {
        return None;
    }
    Some(name)
}

/// Split `key = value` / `key: value` at the first delimiter.
fn split_option(line: &str) -> (&str, &str) {
    match line.find(['=', ':']) {
        Some(pos) => (line[..pos].trim(), line[pos + 1..].trim()),
        None => (line.trim(), ""),
    }
}

pub fn parse(text: &str) -> Result<Vec<ParsedSection>, ConfigError> {
    let mut sections: Vec<ParsedSection> = Vec::new();
    // Whether the previous meaningful line was an option that can continue.
    let mut in_value = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            in_value = false;
            continue;
        }
        if is_comment(trimmed) {
            continue;
        }

        let indented = raw_line.starts_with([' ', '\t']);
        if indented && in_value {
            if let Some((_, value)) = sections
                .last_mut()
                .and_then(|section| section.options.last_mut())
            {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(trimmed);
            }
            continue;
        }

        if let Some(name) = section_header(trimmed) {
            if sections.iter().any(|section| section.name == name) {
                return Err(parse_error(
                    line_no,
                    format!("section '{}' already exists", name),
                ));
            }
            sections.push(ParsedSection {
                name: name.to_string(),
                options: Vec::new(),
            });
            in_value = false;
            continue;
        }

        let Some(section) = sections.last_mut() else {
            return Err(parse_error(
                line_no,
                format!("option outside of a section: '{}'", trimmed),
            ));
        };

        let (key, value) = split_option(trimmed);
        if key.is_empty() {
            return Err(parse_error(line_no, format!("malformed line: '{}'", trimmed)));
        }
        let key = key.to_lowercase();
        if section.has_option(&key) {
            return Err(parse_error(
                line_no,
                format!("option '{}' in section '{}' already exists", key, section.name),
            ));
        }
        section.options.push((key, value.to_string()));
        in_value = true;
    }

    Ok(sections)
}

/// Append one section block, followed by a blank line.
pub fn write_section<'a>(
    out: &mut String,
    name: &str,
    options: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
    out.push('[');
    out.push_str(name);
    out.push_str("]\n");
    for (key, value) in options {
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(&value.replace('\n', "\n\t"));
        out.push('\n');
    }
    out.push('\n');
}
