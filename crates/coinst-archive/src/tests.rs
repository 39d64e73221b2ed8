use super::*;
use coinst_core::{DebianVersions, LookupError};
use coinst_resolver::Installability;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_ARCHIVE_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

const SOURCES: &str = "\
Package: hello
Version: 2.10-3
Maintainer: Hello Maintainers <hello@example.org>
Section: devel

Package: libfoo
Version: 1.0-1
";

const PACKAGES_AMD64: &str = "\
Package: hello
Version: 2.10-3
Architecture: amd64
Depends: libfoo1 (>= 1.0)
Description: example package
 based on GNU hello
 .
 second paragraph

Package: libfoo1
Version: 1.0-1
Architecture: amd64
Source: libfoo

Package: libfoo-doc
Version: 1.0-1
Architecture: all
Source: libfoo

Package: stray
Version: 0.5+b1
Architecture: amd64
Source: orphaned (0.5)

Package: libfoo1
Version: 0.9-1
Architecture: amd64
Source: libfoo
";

const PACKAGES_I386: &str = "\
Package: libfoo1
Version: 1.0-1
Architecture: i386
Source: libfoo

Package: libfoo-doc
Version: 1.0-1
Architecture: all
Source: libfoo
";

fn arches() -> Vec<String> {
    vec!["amd64".to_string(), "i386".to_string()]
}

fn seed_archive(root: &Path) {
    fs::create_dir_all(root).expect("must create archive root");
    fs::write(root.join("Sources"), SOURCES).expect("must write Sources");
    fs::write(root.join("Packages_amd64"), PACKAGES_AMD64).expect("must write Packages_amd64");
    fs::write(root.join("Packages_i386"), PACKAGES_I386).expect("must write Packages_i386");
}

#[test]
fn read_directory_attaches_binaries_to_their_sources() {
    let root = test_archive_root();
    seed_archive(&root);

    let archive = SourceUniverse::load(&root, &arches()).expect("archive must load");
    assert_eq!(archive.names(), vec!["hello", "libfoo", "orphaned"]);
    assert_eq!(archive.version("hello").expect("hello is present"), "2.10-3");
    assert_eq!(
        archive.field("hello", "section").expect("hello is present"),
        Some("devel")
    );

    let names = |src: &str, arch: &str| -> Vec<String> {
        archive
            .binaries(src, arch)
            .expect("source and arch are known")
            .iter()
            .map(|binary| binary.name.clone())
            .collect()
    };
    assert_eq!(names("libfoo", "amd64"), vec!["libfoo1", "libfoo-doc"]);
    assert_eq!(names("libfoo", "i386"), vec!["libfoo1", "libfoo-doc"]);
    assert_eq!(names("hello", "i386"), Vec::<String>::new());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn read_directory_keeps_first_duplicate_binary_stanza() {
    let root = test_archive_root();
    seed_archive(&root);

    let archive = SourceUniverse::load(&root, &arches()).expect("archive must load");
    let libfoo = archive
        .binaries("libfoo", "amd64")
        .expect("libfoo is present");
    assert_eq!(libfoo.len(), 2);
    assert_eq!(libfoo[0].version, "1.0-1");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn read_directory_synthesizes_fake_sources() {
    let root = test_archive_root();
    seed_archive(&root);

    let archive = SourceUniverse::load(&root, &arches()).expect("archive must load");
    assert!(archive.is_fake("orphaned").expect("orphaned is present"));
    assert!(!archive.is_fake("hello").expect("hello is present"));
    assert_eq!(archive.version("orphaned").expect("orphaned is present"), "0.5");
    assert_eq!(archive.field("orphaned", "Section").expect("orphaned is present"), None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn lookups_report_unknown_names() {
    let root = test_archive_root();
    seed_archive(&root);

    let archive = SourceUniverse::load(&root, &arches()).expect("archive must load");
    assert_eq!(
        archive.version("ghost"),
        Err(LookupError::UnknownSource("ghost".to_string()))
    );
    assert_eq!(
        archive.binaries("hello", "s390x").map(|binaries| binaries.len()),
        Err(LookupError::UnknownArchitecture("s390x".to_string()))
    );
    assert!(archive
        .packages_for_arch("s390x", Arc::new(DebianVersions))
        .is_err());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn read_directory_reports_missing_and_malformed_files() {
    let root = test_archive_root();
    seed_archive(&root);

    let err = SourceUniverse::load(&root, &["arm64".to_string()]).expect_err("must fail");
    assert!(format!("{err:#}").contains("Packages_arm64"));

    fs::write(root.join("Packages_amd64"), "Package: broken\nDepends: x\n")
        .expect("must overwrite Packages_amd64");
    let err = SourceUniverse::load(&root, &arches()).expect_err("must fail");
    let message = format!("{err:#}");
    assert!(message.contains("invalid stanza 1"));
    assert!(message.contains("Version"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn packages_for_arch_builds_a_solvable_universe() {
    let root = test_archive_root();
    seed_archive(&root);

    let archive = SourceUniverse::load(&root, &arches()).expect("archive must load");
    let mut amd64 = archive
        .packages_for_arch("amd64", Arc::new(DebianVersions))
        .expect("amd64 is loaded");
    assert_eq!(
        amd64.list_packages(),
        vec!["hello", "libfoo-doc", "libfoo1", "stray"]
    );
    assert_eq!(
        amd64.is_installable("hello").expect("hello is present"),
        Installability::Installable
    );
    assert_eq!(
        amd64.field("hello", "Description").expect("hello is present"),
        Some("example package\n based on GNU hello\n .\n second paragraph")
    );

    let i386 = archive
        .packages_for_arch("i386", Arc::new(DebianVersions))
        .expect("i386 is loaded");
    assert_eq!(i386.list_packages(), vec!["libfoo-doc", "libfoo1"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn write_directory_round_trips_real_sources_and_binaries() {
    let root = test_archive_root();
    let output = root.join("out");
    seed_archive(&root);

    let archive = SourceUniverse::load(&root, &arches()).expect("archive must load");
    archive.write(&output).expect("archive must write");

    let sources = fs::read_to_string(output.join("Sources")).expect("must read Sources");
    assert_eq!(sources, SOURCES);

    let packages = fs::read_to_string(output.join("Packages_amd64")).expect("must read packages");
    let names: Vec<&str> = packages
        .lines()
        .filter_map(|line| line.strip_prefix("Package: "))
        .collect();
    assert_eq!(names, vec!["hello", "libfoo-doc", "libfoo1", "stray"]);
    assert!(packages.contains(" based on GNU hello\n .\n second paragraph\n"));

    let reloaded = SourceUniverse::load(&output, &arches()).expect("output must load");
    assert_eq!(reloaded.names(), archive.names());
    assert!(reloaded.is_fake("orphaned").expect("orphaned is present"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn write_directory_synthesizes_stanzas_for_recordless_entries() {
    let root = test_archive_root();

    let mut source = Source::new("ghostly", "2.0");
    let binary = Package::from_fields(
        "ghostly-bin",
        &coinst_core::BinaryFields {
            version: "2.0+b1".to_string(),
            source: "ghostly".to_string(),
            source_version: "2.0".to_string(),
            architecture: "amd64".to_string(),
            depends: Some("libc6 (>= 2.36)".to_string()),
            ..Default::default()
        },
    )
    .expect("fields should parse");
    source.add_binary("amd64", Arc::new(binary));

    write_directory(&root, &["amd64".to_string()], [&source]).expect("must write");
    assert_eq!(
        fs::read_to_string(root.join("Sources")).expect("must read Sources"),
        "Package: ghostly\nVersion: 2.0\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("Packages_amd64")).expect("must read packages"),
        "Package: ghostly-bin\nVersion: 2.0+b1\nSource: ghostly (2.0)\nDepends: libc6 (>= 2.36)\n"
    );

    let _ = fs::remove_dir_all(&root);
}

fn test_archive_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_ARCHIVE_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "coinst-archive-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
