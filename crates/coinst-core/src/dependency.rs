use std::fmt;

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    None,
    Lt,
    LtEq,
    Eq,
    GtEq,
    Gt,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lt => "<<",
            Self::LtEq => "<=",
            Self::Eq => "=",
            Self::GtEq => ">=",
            Self::Gt => ">>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    pub relation: Relation,
    pub version: Option<String>,
}

impl Dependency {
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation: Relation::None,
            version: None,
        }
    }

    pub fn versioned(name: impl Into<String>, relation: Relation, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation,
            version: Some(version.into()),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relation, &self.version) {
            (Relation::None, _) | (_, None) => f.write_str(&self.name),
            (relation, Some(version)) => {
                write!(f, "{} ({} {})", self.name, relation.symbol(), version)
            }
        }
    }
}

/// `a | b`: any one member satisfies the group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AlternativeGroup(pub Vec<Dependency>);

impl AlternativeGroup {
    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.0.iter()
    }
}

impl fmt::Display for AlternativeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, dep) in self.0.iter().enumerate() {
            if index != 0 {
                f.write_str(" | ")?;
            }
            dep.fmt(f)?;
        }
        Ok(())
    }
}

/// `a, b`: every group must be satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConjunctiveSet(pub Vec<AlternativeGroup>);

impl ConjunctiveSet {
    pub fn iter(&self) -> std::slice::Iter<'_, AlternativeGroup> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConjunctiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, group) in self.0.iter().enumerate() {
            if index != 0 {
                f.write_str(", ")?;
            }
            group.fmt(f)?;
        }
        Ok(())
    }
}

/// A `Provides` entry. Only `(= version)` declares a provided version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Provision {
    pub name: String,
    pub version: Option<String>,
}

pub fn parse_conjunction(input: &str) -> Result<ConjunctiveSet> {
    let mut groups = Vec::new();
    for clause in input.split(',') {
        if clause.trim().is_empty() {
            continue;
        }
        groups.push(
            parse_alternatives(clause)
                .with_context(|| format!("invalid dependency clause '{}'", clause.trim()))?,
        );
    }
    Ok(ConjunctiveSet(groups))
}

pub fn parse_alternatives(input: &str) -> Result<AlternativeGroup> {
    let mut alternatives = Vec::new();
    for alternative in input.split('|') {
        alternatives.push(parse_dependency(alternative)?);
    }
    Ok(AlternativeGroup(alternatives))
}

/// Comma separated relations without alternatives, as used by `Conflicts`.
pub fn parse_flat_list(input: &str) -> Result<Vec<Dependency>> {
    input
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| {
            if item.contains('|') {
                return Err(anyhow!("alternatives are not allowed here: '{}'", item.trim()));
            }
            parse_dependency(item)
        })
        .collect()
}

pub fn parse_provides(input: &str) -> Result<Vec<Provision>> {
    parse_flat_list(input).map(|deps| {
        deps.into_iter()
            .map(|dep| Provision {
                version: match dep.relation {
                    Relation::Eq => dep.version,
                    _ => None,
                },
                name: dep.name,
            })
            .collect()
    })
}

fn parse_dependency(input: &str) -> Result<Dependency> {
    let text = input.trim();
    let (name, rest) = match text.find(|ch: char| ch == '(' || ch.is_whitespace()) {
        Some(split) => (&text[..split], text[split..].trim_start()),
        None => (text, ""),
    };
    if name.is_empty() {
        return Err(anyhow!("empty package name in relation '{text}'"));
    }

    if rest.is_empty() {
        return Ok(Dependency::unversioned(name));
    }

    let Some(inner) = rest.strip_prefix('(') else {
        return Err(anyhow!("unexpected text after package name: '{rest}'"));
    };
    let Some(close) = inner.find(')') else {
        return Err(anyhow!("unterminated version in relation '{text}'"));
    };
    if !inner[close + 1..].trim().is_empty() {
        return Err(anyhow!("trailing text after version in relation '{text}'"));
    }

    let (relation, version) = split_relation(inner[..close].trim());
    let version = version.trim();
    if version.is_empty() || version.contains(char::is_whitespace) {
        return Err(anyhow!("missing or malformed version in relation '{text}'"));
    }

    Ok(Dependency::versioned(name, relation, version))
}

// `<` and `>` on their own are the obsolete spellings of `<=` and `>=`, and a
// bare version is taken as `=`.
fn split_relation(input: &str) -> (Relation, &str) {
    const OPERATORS: [(&str, Relation); 9] = [
        ("<<", Relation::Lt),
        ("<=", Relation::LtEq),
        ("=<", Relation::LtEq),
        (">>", Relation::Gt),
        (">=", Relation::GtEq),
        ("=>", Relation::GtEq),
        ("<", Relation::LtEq),
        (">", Relation::GtEq),
        ("=", Relation::Eq),
    ];

    for (symbol, relation) in OPERATORS {
        if let Some(rest) = input.strip_prefix(symbol) {
            return (relation, rest);
        }
    }
    (Relation::Eq, input)
}
