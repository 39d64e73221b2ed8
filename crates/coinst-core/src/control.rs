use anyhow::{anyhow, Result};

/// One RFC822-style stanza from a `Packages` or `Sources` file.
///
/// Fields keep their on-disk order and their continuation lines verbatim so a
/// stanza can be written back exactly as it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Case-insensitive lookup; the first matching field wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_control_string(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push(':');
            if !value.is_empty() && !value.starts_with('\n') {
                out.push(' ');
            }
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

pub fn parse_paragraphs(input: &str) -> Result<Vec<Paragraph>> {
    let mut paragraphs = Vec::new();
    let mut current = Paragraph::new();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let Some((_, value)) = current.fields.last_mut() else {
                return Err(anyhow!(
                    "line {line_no}: continuation line before any field"
                ));
            };
            value.push('\n');
            value.push_str(line);
            continue;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("line {line_no}: expected 'Name: value', got '{line}'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("line {line_no}: empty field name"));
        }
        current.push(name, value.trim());
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs)
}

pub fn write_paragraphs<'a>(paragraphs: impl IntoIterator<Item = &'a Paragraph>) -> String {
    paragraphs
        .into_iter()
        .map(Paragraph::to_control_string)
        .collect::<Vec<_>>()
        .join("\n")
}
