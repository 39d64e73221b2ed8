use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use coinst_core::{parse_paragraphs, write_paragraphs, Package, Paragraph, Source};
use tracing::{debug, info, warn};

use crate::SourceUniverse;

pub const SOURCES_FILE: &str = "Sources";

pub fn packages_file_name(arch: &str) -> String {
    format!("Packages_{arch}")
}

/// Loads `dir/Sources` and `dir/Packages_<arch>` for every arch. Binaries
/// naming a source missing from `Sources` get a fake source at the version
/// their `Source` field declares.
pub fn read_directory(dir: &Path, arches: &[String]) -> Result<SourceUniverse> {
    let sources_path = dir.join(SOURCES_FILE);
    let mut sources = read_sources(&sources_path)?;
    info!(
        path = %sources_path.display(),
        count = sources.len(),
        "loaded source packages"
    );

    for arch in arches {
        let path = dir.join(packages_file_name(arch));
        let binaries = read_binaries(&path)?;
        info!(path = %path.display(), arch = %arch, count = binaries.len(), "loaded binary packages");

        for binary in binaries {
            let source = sources.entry(binary.source.clone()).or_insert_with(|| {
                debug!(
                    source = %binary.source,
                    package = %binary.name,
                    "synthesizing fake source"
                );
                Source::fake(binary.source.clone(), binary.source_version.clone())
            });
            source.add_binary(arch, Arc::new(binary));
        }
    }

    let sources = sources
        .into_iter()
        .map(|(name, source)| (name, Arc::new(source)))
        .collect();
    Ok(SourceUniverse::new(arches.to_vec(), sources))
}

fn read_sources(path: &Path) -> Result<BTreeMap<String, Source>> {
    let paragraphs = read_paragraphs(path)?;

    let mut sources = BTreeMap::new();
    for (index, paragraph) in paragraphs.into_iter().enumerate() {
        let source = Source::from_paragraph(paragraph).with_context(|| {
            format!("invalid stanza {} in {}", index + 1, path.display())
        })?;
        if sources.contains_key(&source.name) {
            warn!(source = %source.name, path = %path.display(), "duplicate source stanza ignored");
            continue;
        }
        sources.insert(source.name.clone(), source);
    }
    Ok(sources)
}

fn read_binaries(path: &Path) -> Result<Vec<Package>> {
    let paragraphs = read_paragraphs(path)?;

    let mut seen = HashSet::new();
    let mut binaries = Vec::with_capacity(paragraphs.len());
    for (index, paragraph) in paragraphs.into_iter().enumerate() {
        let package = Package::from_paragraph(paragraph).with_context(|| {
            format!("invalid stanza {} in {}", index + 1, path.display())
        })?;
        if !seen.insert(package.name.clone()) {
            debug!(package = %package.name, path = %path.display(), "duplicate binary stanza ignored");
            continue;
        }
        binaries.push(package);
    }
    Ok(binaries)
}

fn read_paragraphs(path: &Path) -> Result<Vec<Paragraph>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading control file: {}", path.display()))?;
    parse_paragraphs(&text).with_context(|| format!("failed parsing control file: {}", path.display()))
}

/// Writes `Sources` (real sources only) and one `Packages_<arch>` per arch,
/// stanzas sorted by name.
pub fn write_directory<'a>(
    dir: &Path,
    arches: &[String],
    sources: impl IntoIterator<Item = &'a Source>,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed creating output directory: {}", dir.display()))?;

    let mut sources: Vec<&Source> = sources.into_iter().collect();
    sources.sort_by(|left, right| left.name.cmp(&right.name));

    let source_stanzas: Vec<Paragraph> = sources
        .iter()
        .filter(|source| !source.fake)
        .map(|source| source.to_paragraph())
        .collect();
    write_control_file(&dir.join(SOURCES_FILE), &source_stanzas)?;

    for arch in arches {
        let mut binaries: Vec<&Arc<Package>> = sources
            .iter()
            .flat_map(|source| source.binaries(arch))
            .collect();
        binaries.sort_by(|left, right| left.name.cmp(&right.name));

        let stanzas: Vec<Paragraph> = binaries.iter().map(|binary| binary.to_paragraph()).collect();
        write_control_file(&dir.join(packages_file_name(arch)), &stanzas)?;
    }

    Ok(())
}

fn write_control_file(path: &Path, stanzas: &[Paragraph]) -> Result<()> {
    fs::write(path, write_paragraphs(stanzas))
        .with_context(|| format!("failed writing control file: {}", path.display()))?;
    debug!(path = %path.display(), count = stanzas.len(), "wrote control file");
    Ok(())
}
