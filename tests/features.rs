use std::{fs, path::Path};

use cucumber::gherkin::{Feature, GherkinEnv};

fn feature_files() -> Vec<std::path::PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    let mut files: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "feature"))
        .collect();
    files.sort();
    files
}

#[test]
fn every_feature_file_parses() {
    let files = feature_files();
    assert_eq!(files.len(), 2, "expected token and topic features, got {files:?}");

    for path in files {
        let feature = Feature::parse_path(&path, GherkinEnv::default())
            .unwrap_or_else(|err| panic!("{} does not parse: {err}", path.display()));
        assert!(
            !feature.scenarios.is_empty(),
            "{} has no scenarios",
            path.display()
        );
        for scenario in &feature.scenarios {
            assert!(
                !scenario.steps.is_empty(),
                "{}: scenario `{}` has no steps",
                path.display(),
                scenario.name
            );
        }
    }
}

#[test]
fn token_feature_keeps_every_scenario() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("features/token.feature");
    let feature = Feature::parse_path(&path, GherkinEnv::default()).unwrap();
    let names: Vec<_> = feature.scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Create a mintable token",
            "Create a fixed supply token",
            "Transfer tokens between 2 accounts",
            "Transfer tokens between 2 accounts and pay fees",
            "Transfer tokens between multiple accounts",
        ]
    );
}
