// tests/registry_and_config.rs

use std::error::Error;
use std::io::Write;
use std::sync::Arc;

use parbuild::config::{OutputSection, load_and_validate, parse_str};
use parbuild::config::ConfigFile;
use parbuild::dag::DagGraph;
use parbuild::engine::RunOptions;
use parbuild::errors::ParbuildError;
use parbuild::task::{BodyError, Task, TaskRegistry, from_fn};
use parbuild_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

fn noop(name: &str) -> Task {
    Task::new(name, Arc::new(from_fn(|| async { Ok::<(), BodyError>(()) })))
}

#[test]
fn registry_rejects_duplicate_names() -> TestResult {
    let mut registry = TaskRegistry::new();
    registry.register(noop("esm"))?;

    match registry.register(noop("esm")) {
        Err(ParbuildError::DuplicateTask(name)) => assert_eq!(name, "esm"),
        other => panic!("expected DuplicateTask, got {other:?}"),
    }
    assert_eq!(registry.len(), 1);

    Ok(())
}

#[test]
fn registry_preserves_registration_order() -> TestResult {
    let mut registry = TaskRegistry::new();
    for name in ["zeta", "alpha", "mid"] {
        registry.register(noop(name))?;
    }

    let names: Vec<_> = registry.all_tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert_eq!(registry.position("alpha"), Some(1));
    assert!(registry.get("missing").is_none());

    Ok(())
}

#[test]
fn registry_validation_reports_unknown_prerequisite() -> TestResult {
    let mut registry = TaskRegistry::new();
    registry.register(noop("api").after("types"))?;

    match registry.validate() {
        Err(ParbuildError::UnknownTask { task, dependency }) => {
            assert_eq!(task, "api");
            assert_eq!(dependency, "types");
        }
        other => panic!("expected UnknownTask, got {other:?}"),
    }

    Ok(())
}

#[test]
fn registry_validation_reports_cycles() -> TestResult {
    let mut registry = TaskRegistry::new();
    registry.register(noop("A").after("C"))?;
    registry.register(noop("B").after("A"))?;
    registry.register(noop("C").after("B"))?;

    assert!(matches!(registry.validate(), Err(ParbuildError::DagCycle(_))));

    Ok(())
}

#[test]
fn sequential_edges_that_close_a_cycle_are_rejected() -> TestResult {
    // api-2 is registered after api-1 but api-1 waits on api-2; chaining the
    // group in registration order would deadlock.
    let mut registry = TaskRegistry::new();
    registry.register(noop("api-1").after("api-2").in_group("api"))?;
    registry.register(noop("api-2").in_group("api"))?;

    assert!(DagGraph::from_registry(&registry, None).is_ok());
    assert!(matches!(
        DagGraph::from_registry(&registry, Some("api")),
        Err(ParbuildError::DagCycle(_))
    ));

    Ok(())
}

#[test]
fn waves_follow_dependency_depth() -> TestResult {
    let mut registry = TaskRegistry::new();
    registry.register(noop("api").after("types"))?;
    registry.register(noop("types"))?;
    registry.register(noop("bundle"))?;
    registry.register(noop("docs").after("api"))?;

    let graph = DagGraph::from_registry(&registry, None)?;
    assert_eq!(
        graph.waves(),
        vec![
            vec!["types".to_string(), "bundle".to_string()],
            vec!["api".to_string()],
            vec!["docs".to_string()],
        ]
    );
    assert_eq!(graph.dependents_of("types"), ["api".to_string()]);

    Ok(())
}

#[test]
fn toml_tasks_keep_declaration_order() -> TestResult {
    let raw = parse_str(
        r#"
[config]
max_workers = 20
sequential_group = "api"

[[task]]
name = "esm-types"
cmd = "tsc --outDir types"

[[task]]
name = "bundle"
cmd = "node scripts/build.cjs esm"

[[task]]
name = "api-esm"
cmd = "api-extractor run"
after = ["esm-types"]
group = "api"
"#,
    )?;
    let cfg = ConfigFile::try_from(raw)?;

    let names: Vec<_> = cfg.task.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["esm-types", "bundle", "api-esm"]);
    assert_eq!(cfg.config.max_workers, 20);
    assert!(cfg.config.fail_fast);
    assert!(cfg.output.is_none());

    let off = RunOptions::from_config(&cfg.config, false);
    assert_eq!(off.sequential_group, None);
    let on = RunOptions::from_config(&cfg.config, true);
    assert_eq!(on.sequential_group.as_deref(), Some("api"));
    assert_eq!(on.max_workers, 20);

    Ok(())
}

#[test]
fn config_defaults_apply() -> TestResult {
    let cfg = ConfigFile::try_from(parse_str(
        r#"
[[task]]
name = "only"
cmd = "true"
"#,
    )?)?;

    assert_eq!(cfg.config.max_workers, 8);
    assert!(cfg.config.fail_fast);
    assert_eq!(cfg.config.sequential_group, None);
    assert!(cfg.task[0].after.is_empty());

    Ok(())
}

#[test]
fn dag_cycle_in_file_returns_structured_error() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[[task]]
name = "A"
cmd = "echo A"
after = ["B"]

[[task]]
name = "B"
cmd = "echo B"
after = ["A"]
"#
    )?;

    match load_and_validate(file.path()) {
        Err(ParbuildError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        other => panic!("expected DagCycle error, got {other:?}"),
    }

    Ok(())
}

#[test]
fn unknown_dependency_in_file_is_rejected() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[[task]]
name = "A"
cmd = "echo A"
after = ["NonExistent"]
"#
    )?;

    match load_and_validate(file.path()) {
        Err(ParbuildError::UnknownTask { task, dependency }) => {
            assert_eq!(task, "A");
            assert_eq!(dependency, "NonExistent");
        }
        other => panic!("expected UnknownTask, got {other:?}"),
    }

    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(file, "[[task]\nname = ")?;

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ParbuildError::TomlError(_))
    ));

    Ok(())
}

#[test]
fn missing_config_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("definitely/not/here/Parbuild.toml"),
        Err(ParbuildError::IoError(_))
    ));
}

#[test]
fn config_validation_errors() {
    let cases = vec![
        ("no tasks", ConfigFileBuilder::new()),
        (
            "zero workers",
            ConfigFileBuilder::new()
                .max_workers(0)
                .with_task(TaskConfigBuilder::new("A", "true").build()),
        ),
        (
            "self dependency",
            ConfigFileBuilder::new().with_task(TaskConfigBuilder::new("A", "true").after("A").build()),
        ),
        (
            "temp_dir without output",
            ConfigFileBuilder::new()
                .with_task(TaskConfigBuilder::new("A", "tsc --outDir {temp_dir}/esm").build()),
        ),
        (
            "files without output",
            ConfigFileBuilder::new().with_task(
                TaskConfigBuilder::new("A", "true")
                    .file("esm/package.json", "{}")
                    .build(),
            ),
        ),
        (
            "file escaping staging",
            ConfigFileBuilder::new()
                .with_output(OutputSection::default())
                .with_task(TaskConfigBuilder::new("A", "true").file("../evil", "x").build()),
        ),
        (
            "profile with unknown task",
            ConfigFileBuilder::new()
                .with_task(TaskConfigBuilder::new("A", "true").build())
                .with_profile("lite", None, Some(vec!["B"])),
        ),
        (
            "profile missing prerequisite",
            ConfigFileBuilder::new()
                .with_task(TaskConfigBuilder::new("A", "true").build())
                .with_task(TaskConfigBuilder::new("B", "true").after("A").build())
                .with_profile("lite", None, Some(vec!["B"])),
        ),
        (
            "profile with zero workers",
            ConfigFileBuilder::new()
                .with_task(TaskConfigBuilder::new("A", "true").build())
                .with_profile("lite", Some(0), None),
        ),
    ];

    for (label, builder) in cases {
        match builder.try_build() {
            Err(ParbuildError::ConfigError(_)) => {}
            other => panic!("{label}: expected ConfigError, got {other:?}"),
        }
    }
}

#[test]
fn profile_narrows_tasks_and_workers() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .max_workers(20)
        .with_task(TaskConfigBuilder::new("types", "true").build())
        .with_task(TaskConfigBuilder::new("bundle", "true").build())
        .with_task(TaskConfigBuilder::new("api", "true").after("types").build())
        .with_profile("lite", Some(8), Some(vec!["api", "types"]))
        .try_build()?;

    let lite = cfg.with_profile("lite").ok_or("profile missing")?;
    assert_eq!(lite.config.max_workers, 8);
    let names: Vec<_> = lite.task.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["types", "api"]);

    assert!(cfg.with_profile("nope").is_none());

    Ok(())
}

#[test]
fn duplicate_task_in_config_surfaces_at_registration() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("A", "true").build())
        .with_task(TaskConfigBuilder::new("A", "false").build())
        .try_build()?;

    match TaskRegistry::from_config(&cfg, std::path::Path::new("."), None) {
        Err(ParbuildError::DuplicateTask(name)) => assert_eq!(name, "A"),
        other => panic!("expected DuplicateTask, got {other:?}"),
    }

    Ok(())
}
