use anyhow::{anyhow, Context, Result};

use crate::{
    parse_conjunction, parse_flat_list, parse_provides, ConjunctiveSet, Dependency, Paragraph,
    Provision,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    #[default]
    Unknown = 0,
    Required = 1,
    Important = 2,
    Standard = 3,
    Optional = 4,
    Extra = 5,
}

impl Priority {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "required" => Self::Required,
            "important" => Self::Important,
            "standard" => Self::Standard,
            "optional" => Self::Optional,
            "extra" => Self::Extra,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepField {
    PreDepends,
    Depends,
    Recommends,
    Suggests,
}

impl DepField {
    pub const ALL: [DepField; 4] = [
        DepField::PreDepends,
        DepField::Depends,
        DepField::Recommends,
        DepField::Suggests,
    ];

    /// Fields that must be satisfied for a package to count as installable.
    pub const SOLVER: [DepField; 2] = [DepField::PreDepends, DepField::Depends];

    pub fn field_name(self) -> &'static str {
        match self {
            Self::PreDepends => "Pre-Depends",
            Self::Depends => "Depends",
            Self::Recommends => "Recommends",
            Self::Suggests => "Suggests",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.field_name().eq_ignore_ascii_case(input.trim()))
    }

    fn index(self) -> usize {
        match self {
            Self::PreDepends => 0,
            Self::Depends => 1,
            Self::Recommends => 2,
            Self::Suggests => 3,
        }
    }
}

/// A binary package as described by one `Packages` stanza. Immutable once
/// built; universes and sources share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub source: String,
    pub source_version: String,
    pub priority: Priority,
    pub arch_all: bool,
    depends: [ConjunctiveSet; 4],
    pub conflicts: Vec<Dependency>,
    pub provides: Vec<Provision>,
    pub record: Option<Paragraph>,
}

/// Field values handed over by a planner adding a binary by hand. `None`
/// means the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryFields {
    pub version: String,
    pub source: String,
    pub source_version: String,
    pub architecture: String,
    pub pre_depends: Option<String>,
    pub depends: Option<String>,
    pub conflicts: Option<String>,
    pub provides: Option<String>,
}

impl Package {
    pub fn depends(&self, field: DepField) -> &ConjunctiveSet {
        &self.depends[field.index()]
    }

    pub fn from_paragraph(paragraph: Paragraph) -> Result<Self> {
        let name = required_field(&paragraph, "Package")?.to_string();
        let version = required_field(&paragraph, "Version")
            .with_context(|| format!("package '{name}'"))?
            .to_string();

        let (source, source_version) = match paragraph.get("Source") {
            Some(raw) => parse_source_field(raw, &version)
                .with_context(|| format!("package '{name}' has an invalid Source field"))?,
            None => (name.clone(), version.clone()),
        };

        let mut depends: [ConjunctiveSet; 4] = Default::default();
        for field in DepField::ALL {
            if let Some(raw) = paragraph.get(field.field_name()) {
                depends[field.index()] = parse_conjunction(raw).with_context(|| {
                    format!("package '{name}' has an invalid {} field", field.field_name())
                })?;
            }
        }

        let conflicts = match paragraph.get("Conflicts") {
            Some(raw) => parse_flat_list(raw)
                .with_context(|| format!("package '{name}' has an invalid Conflicts field"))?,
            None => Vec::new(),
        };
        let provides = match paragraph.get("Provides") {
            Some(raw) => parse_provides(raw)
                .with_context(|| format!("package '{name}' has an invalid Provides field"))?,
            None => Vec::new(),
        };

        Ok(Self {
            priority: paragraph
                .get("Priority")
                .map(Priority::parse)
                .unwrap_or_default(),
            arch_all: paragraph
                .get("Architecture")
                .map(|arch| arch.trim() == "all")
                .unwrap_or(false),
            name,
            version,
            source,
            source_version,
            depends,
            conflicts,
            provides,
            record: Some(paragraph),
        })
    }

    pub fn from_fields(name: &str, fields: &BinaryFields) -> Result<Self> {
        let parse_set = |raw: &Option<String>, field: DepField| -> Result<ConjunctiveSet> {
            raw.as_deref()
                .map(parse_conjunction)
                .transpose()
                .with_context(|| format!("binary '{name}' has an invalid {}", field.field_name()))
                .map(Option::unwrap_or_default)
        };

        let mut depends: [ConjunctiveSet; 4] = Default::default();
        depends[DepField::PreDepends.index()] = parse_set(&fields.pre_depends, DepField::PreDepends)?;
        depends[DepField::Depends.index()] = parse_set(&fields.depends, DepField::Depends)?;

        Ok(Self {
            name: name.to_string(),
            version: fields.version.clone(),
            source: fields.source.clone(),
            source_version: fields.source_version.clone(),
            priority: Priority::Unknown,
            arch_all: fields.architecture == "all",
            depends,
            conflicts: fields
                .conflicts
                .as_deref()
                .map(parse_flat_list)
                .transpose()
                .with_context(|| format!("binary '{name}' has invalid Conflicts"))?
                .unwrap_or_default(),
            provides: fields
                .provides
                .as_deref()
                .map(parse_provides)
                .transpose()
                .with_context(|| format!("binary '{name}' has invalid Provides"))?
                .unwrap_or_default(),
            record: None,
        })
    }

    /// Raw field from the original stanza, if the package was parsed from one.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.record.as_ref().and_then(|record| record.get(name))
    }

    /// The stanza to write for this package: the original record when there is
    /// one, otherwise a minimal synthesized one.
    pub fn to_paragraph(&self) -> Paragraph {
        if let Some(record) = &self.record {
            return record.clone();
        }

        let mut paragraph = Paragraph::new();
        paragraph.push("Package", self.name.as_str());
        paragraph.push("Version", self.version.as_str());
        if self.arch_all {
            paragraph.push("Architecture", "all");
        }
        if self.source != self.name || self.source_version != self.version {
            paragraph.push(
                "Source",
                format!("{} ({})", self.source, self.source_version),
            );
        }
        for field in DepField::ALL {
            let set = self.depends(field);
            if !set.is_empty() {
                paragraph.push(field.field_name(), set.to_string());
            }
        }
        if !self.conflicts.is_empty() {
            let rendered = self
                .conflicts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            paragraph.push("Conflicts", rendered);
        }
        if !self.provides.is_empty() {
            let rendered = self
                .provides
                .iter()
                .map(|provision| match &provision.version {
                    Some(version) => format!("{} (= {version})", provision.name),
                    None => provision.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            paragraph.push("Provides", rendered);
        }
        paragraph
    }
}

fn required_field<'a>(paragraph: &'a Paragraph, name: &str) -> Result<&'a str> {
    paragraph
        .get(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing required field '{name}'"))
}

// `Source: name` or `Source: name (version)`.
fn parse_source_field(raw: &str, binary_version: &str) -> Result<(String, String)> {
    let raw = raw.trim();
    match raw.split_once('(') {
        None => {
            if raw.is_empty() || raw.contains(char::is_whitespace) {
                return Err(anyhow!("malformed source name '{raw}'"));
            }
            Ok((raw.to_string(), binary_version.to_string()))
        }
        Some((name, rest)) => {
            let version = rest
                .strip_suffix(')')
                .map(str::trim)
                .filter(|version| !version.is_empty())
                .ok_or_else(|| anyhow!("malformed source version in '{raw}'"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(anyhow!("missing source name in '{raw}'"));
            }
            Ok((name.to_string(), version.to_string()))
        }
    }
}
