use std::sync::Arc;

use coinst_core::{parse_paragraphs, BinaryFields, DebianVersions, DepField, Package};

use super::*;

fn packages(stanzas: &str) -> Vec<Package> {
    parse_paragraphs(stanzas)
        .expect("stanzas should parse")
        .into_iter()
        .map(|paragraph| Package::from_paragraph(paragraph).expect("package should parse"))
        .collect()
}

fn universe_of(packages: impl IntoIterator<Item = Package>) -> PackageUniverse {
    let mut universe = PackageUniverse::new("amd64", Arc::new(DebianVersions));
    for package in packages {
        assert!(universe.add_package(Arc::new(package)), "names must be unique");
    }
    universe
}

fn universe(stanzas: &str) -> PackageUniverse {
    universe_of(packages(stanzas))
}

fn installability(universe: &mut PackageUniverse, name: &str) -> Installability {
    universe
        .is_installable(name)
        .expect("package must be present")
}

fn assert_counters_idle(universe: &PackageUniverse) {
    for name in universe.list_packages() {
        assert_eq!(
            universe.simulation_counters(&name),
            Some((0, 0)),
            "counters for {name} must be restored"
        );
    }
}

const CHAIN: &str = "\
Package: app
Version: 1.0
Depends: lib

Package: lib
Version: 2.0
Depends: base

Package: base
Version: 3.0
";

#[test]
fn package_without_relations_is_installable() {
    let mut universe = universe("Package: lonely\nVersion: 1\n");
    assert_eq!(installability(&mut universe, "lonely"), Installability::Installable);
    assert!(universe.is_cached_installable("lonely"));
    assert_counters_idle(&universe);
}

#[test]
fn dependency_without_provider_is_not_installable() {
    let mut universe = universe("Package: app\nVersion: 1\nDepends: nowhere\n");
    assert_eq!(installability(&mut universe, "app"), Installability::NotInstallable);
    assert!(!universe.is_cached_installable("app"));
    assert!(universe.is_uninstallable("app").expect("app is present"));
    assert_counters_idle(&universe);
}

#[test]
fn transitive_dependencies_record_may_affect_edges() {
    let mut universe = universe(CHAIN);
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
    assert_eq!(universe.may_affect("lib"), vec!["app".to_string()]);
    assert_eq!(universe.may_affect("base"), vec!["app".to_string()]);
    assert!(!universe.is_cached_installable("lib"));
    assert_counters_idle(&universe);
}

#[test]
fn repeated_check_is_served_from_cache() {
    let mut universe = universe(CHAIN);
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
    let edges = universe.may_affect("base");

    // a zero budget would fail any real search
    universe.set_config(SolverConfig { step_budget: 0 });
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
    assert_eq!(universe.may_affect("base"), edges);
    assert_counters_idle(&universe);
}

#[test]
fn removing_a_dependency_invalidates_cached_verdict() {
    let mut universe = universe(CHAIN);
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);

    let removed = universe.remove_binary("base").expect("base is present");
    assert_eq!(removed.version, "3.0");
    assert!(!universe.is_cached_installable("app"));
    assert_eq!(installability(&mut universe, "app"), Installability::NotInstallable);
    assert_eq!(installability(&mut universe, "lib"), Installability::NotInstallable);
    assert!(universe.remove_binary("base").is_none());
}

#[test]
fn alternative_falls_back_when_first_choice_is_broken() {
    let mut universe = universe(
        "\
Package: app
Version: 1
Depends: broken | working

Package: broken
Version: 1
Depends: nowhere

Package: working
Version: 1
",
    );
    assert_eq!(installability(&mut universe, "broken"), Installability::NotInstallable);
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
    assert_eq!(universe.may_affect("working"), vec!["app".to_string()]);
    assert!(universe.may_affect("broken").is_empty());
    assert_counters_idle(&universe);
}

#[test]
fn forced_dependency_is_chosen_before_alternatives_and_then_reused() {
    let mut universe = universe(
        "\
Package: x
Version: 1
Depends: a | b, b

Package: a
Version: 1

Package: b
Version: 1
",
    );
    assert_eq!(installability(&mut universe, "x"), Installability::Installable);
    assert!(universe.may_affect("a").is_empty());
    assert_eq!(universe.may_affect("b"), vec!["x".to_string()]);
    assert_counters_idle(&universe);
}

#[test]
fn rejected_alternative_is_not_retried_through_a_forced_dependency() {
    const GRAPH: &str = "\
Package: x
Version: 1
Depends: a | b

Package: a
Version: 1
Depends: nowhere

Package: b
Version: 1
Depends: a
";
    // x, a fails, b needs a again, back out of the group, back out of x.
    let mut tight = universe(GRAPH).with_step_budget(5);
    assert_eq!(installability(&mut tight, "x"), Installability::NotInstallable);
    assert_counters_idle(&tight);

    let mut short = universe(GRAPH).with_step_budget(4);
    assert_eq!(installability(&mut short, "x"), Installability::BudgetExceeded);
    assert_counters_idle(&short);
}

#[test]
fn conflicting_packages_cannot_be_installed_together() {
    let mut universe = universe(
        "\
Package: postfix
Version: 1
Conflicts: sendmail

Package: sendmail
Version: 1

Package: both-ways
Version: 1
Depends: postfix, sendmail

Package: other-way
Version: 1
Depends: sendmail, postfix
",
    );
    assert_eq!(installability(&mut universe, "both-ways"), Installability::NotInstallable);
    assert_eq!(installability(&mut universe, "other-way"), Installability::NotInstallable);
    assert_eq!(installability(&mut universe, "postfix"), Installability::Installable);
    assert_eq!(installability(&mut universe, "sendmail"), Installability::Installable);
    assert_counters_idle(&universe);
}

#[test]
fn versioned_conflict_only_hits_matching_versions() {
    let phpldapadmin = BinaryFields {
        version: "1.0".to_string(),
        source: "phpldapadmin".to_string(),
        source_version: "1.0".to_string(),
        architecture: "all".to_string(),
        depends: Some("apache2 (>= 2.0)".to_string()),
        ..BinaryFields::default()
    };
    let apache2 = BinaryFields {
        version: "2.0".to_string(),
        source: "apache2".to_string(),
        source_version: "2.0".to_string(),
        architecture: "i386".to_string(),
        conflicts: Some("phpldapadmin (<= 1.0~)".to_string()),
        ..BinaryFields::default()
    };

    let mut universe = PackageUniverse::from_binaries(
        "i386",
        Arc::new(DebianVersions),
        [("phpldapadmin", &phpldapadmin), ("apache2", &apache2)],
    )
    .expect("fake system should build");
    assert_eq!(
        installability(&mut universe, "phpldapadmin"),
        Installability::Installable
    );

    universe.remove_binary("apache2").expect("apache2 is present");
    assert_eq!(
        installability(&mut universe, "phpldapadmin"),
        Installability::NotInstallable
    );

    assert!(universe
        .add_binary("apache2", &apache2)
        .expect("fields should parse"));
    assert_eq!(
        installability(&mut universe, "phpldapadmin"),
        Installability::Installable
    );
    assert_eq!(universe.is_arch_all("phpldapadmin"), Some(true));
}

#[test]
fn virtual_dependencies_resolve_through_provides() {
    let mut universe = universe(
        "\
Package: mutt
Version: 1
Depends: mail-transport-agent

Package: exim4
Version: 4.96
Provides: mail-transport-agent

Package: wants-abi
Version: 1
Depends: libfoo-abi (>= 2)

Package: wants-newer-abi
Version: 1
Depends: libfoo-abi (>= 4)

Package: libfoo3
Version: 3.1
Provides: libfoo-abi (= 3)

Package: libfoo-compat
Version: 9
Provides: libfoo-abi
",
    );
    assert_eq!(installability(&mut universe, "mutt"), Installability::Installable);
    assert_eq!(universe.may_affect("exim4"), vec!["mutt".to_string()]);

    assert_eq!(installability(&mut universe, "wants-abi"), Installability::Installable);
    assert_eq!(universe.may_affect("libfoo3"), vec!["wants-abi".to_string()]);
    assert_eq!(
        installability(&mut universe, "wants-newer-abi"),
        Installability::NotInstallable
    );
}

#[test]
fn versioned_dependency_on_real_package_checks_its_version() {
    let mut universe = universe(
        "\
Package: app
Version: 1
Depends: lib (>= 2.0~rc1)

Package: lib
Version: 1.9
",
    );
    assert_eq!(installability(&mut universe, "app"), Installability::NotInstallable);
}

#[test]
fn providers_are_ordered_by_priority_then_name() {
    let mut universe = universe(
        "\
Package: app
Version: 1
Depends: mta

Package: postfix
Version: 1
Priority: optional
Provides: mta

Package: exim4
Version: 1
Priority: standard
Provides: mta

Package: courier
Version: 1
Priority: optional
Provides: mta

Package: zmailer
Version: 1
Provides: mta
Depends: nowhere
",
    );
    assert_eq!(
        universe.provider_names("mta"),
        vec!["zmailer", "exim4", "courier", "postfix"]
    );
    assert_eq!(universe.provider_names("exim4"), vec!["exim4"]);

    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
    assert_eq!(universe.may_affect("exim4"), vec!["app".to_string()]);
    assert!(universe.may_affect("courier").is_empty());

    universe.remove_binary("exim4").expect("exim4 is present");
    assert_eq!(universe.provider_names("mta"), vec!["zmailer", "courier", "postfix"]);
    assert!(universe.provider_names("exim4").is_empty());
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
    assert_eq!(universe.may_affect("courier"), vec!["app".to_string()]);
}

#[test]
fn any_installable_roots_at_every_candidate() {
    let mut universe = universe(
        "\
Package: broken
Version: 1
Depends: nowhere

Package: working
Version: 1
",
    );
    assert_eq!(
        universe
            .is_any_installable(&["broken", "working"])
            .expect("both are present"),
        Installability::Installable
    );
    assert!(universe.is_cached_installable("working"));
    assert!(!universe.is_cached_installable("broken"));
    assert_eq!(
        universe
            .is_any_installable(&["broken"])
            .expect("broken is present"),
        Installability::NotInstallable
    );
    assert!(universe.is_any_installable(&["ghost"]).is_err());
}

#[test]
fn exhausted_budget_is_reported_separately_and_not_cached() {
    let mut universe = universe(CHAIN).with_step_budget(2);
    assert_eq!(installability(&mut universe, "app"), Installability::BudgetExceeded);
    assert!(!universe.is_cached_installable("app"));
    assert!(universe.may_affect("base").is_empty());
    assert_counters_idle(&universe);

    universe.set_config(SolverConfig::default());
    assert_eq!(universe.config().step_budget, DEFAULT_STEP_BUDGET);
    assert_eq!(installability(&mut universe, "app"), Installability::Installable);
}

#[test]
fn dependency_cycles_terminate() {
    let mut universe = universe(
        "\
Package: chicken
Version: 1
Depends: egg

Package: egg
Version: 1
Depends: chicken
",
    );
    assert_eq!(installability(&mut universe, "chicken"), Installability::Installable);
    assert_eq!(universe.may_affect("egg"), vec!["chicken".to_string()]);
    assert_counters_idle(&universe);
}

#[test]
fn verdicts_do_not_depend_on_insertion_order() {
    let stanzas = "\
Package: desktop
Version: 1
Depends: browser | lynx, mta, libc6 (>= 2.36)

Package: browser
Version: 120
Depends: libgtk, libc6
Conflicts: lynx

Package: libgtk
Version: 3
Depends: nowhere | libc6

Package: lynx
Version: 2.9
Priority: optional

Package: mta
Version: 1
Depends: exim4 | postfix

Package: exim4
Version: 4
Priority: standard
Conflicts: postfix

Package: postfix
Version: 3
Priority: optional

Package: libc6
Version: 2.36-9
Priority: required

Package: orphan
Version: 1
Depends: libc6 (>= 3)
";

    let run = |reverse: bool| {
        let mut list = packages(stanzas);
        if reverse {
            list.reverse();
        }
        let mut universe = universe_of(list);
        let names = universe.list_packages();
        let verdicts = names
            .iter()
            .map(|name| (name.clone(), installability(&mut universe, name)))
            .collect::<Vec<_>>();
        let edges = names
            .iter()
            .map(|name| (name.clone(), universe.may_affect(name)))
            .collect::<Vec<_>>();
        assert_counters_idle(&universe);
        (verdicts, edges)
    };

    let first = run(false);
    assert_eq!(first, run(false));
    assert_eq!(first, run(true));
    assert!(first
        .0
        .contains(&("orphan".to_string(), Installability::NotInstallable)));
    assert!(first
        .0
        .contains(&("desktop".to_string(), Installability::Installable)));
}

#[test]
fn unsatisfiable_deps_lists_groups_nothing_can_satisfy() {
    let mut universe = universe(
        "\
Package: app
Version: 1
Depends: libc6, missing | also-missing, broken, broken | libc6

Package: libc6
Version: 2.36

Package: broken
Version: 1
Depends: nowhere
",
    );
    let app = Arc::clone(universe.package("app").expect("app is present"));
    let report = universe.unsatisfiable_deps(&app, DepField::Depends);
    assert_eq!(
        report,
        vec![
            UnsatisfiedDep {
                dependency: "missing | also-missing".to_string(),
                candidates: Vec::new(),
            },
            UnsatisfiedDep {
                dependency: "broken".to_string(),
                candidates: vec!["broken".to_string()],
            },
        ]
    );
    assert!(universe
        .unsatisfiable_deps(&app, DepField::PreDepends)
        .is_empty());
    assert_counters_idle(&universe);
}

#[test]
fn accessors_report_unknown_packages() {
    let universe = universe("Package: hello\nVersion: 2.10-3\nSource: hello-src (2.10-2)\nSection: devel\n");
    assert_eq!(universe.version("hello"), Some("2.10-3"));
    assert_eq!(universe.source("hello"), Some("hello-src"));
    assert_eq!(universe.source_version("hello"), Some("2.10-2"));
    assert_eq!(
        universe.field("hello", "section").expect("hello is present"),
        Some("devel")
    );
    assert_eq!(universe.field("hello", "Homepage").expect("hello is present"), None);
    assert!(universe.field("ghost", "Version").is_err());
    assert!(universe.is_present("hello"));
    assert!(!universe.is_present("ghost"));
    assert_eq!(universe.len(), 1);
    assert_eq!(universe.arch(), "amd64");
}

#[test]
fn duplicate_names_are_not_added_twice() {
    let mut universe = universe(CHAIN);
    let again = packages("Package: base\nVersion: 9\n").remove(0);
    assert!(!universe.add_package(Arc::new(again)));
    assert_eq!(universe.version("base"), Some("3.0"));
}
