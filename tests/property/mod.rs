//! Property-based testing for dirsubset
//!
//! Uses proptest to check the verdict against byte-level ground truth
//! across randomly generated trees and mutations.

use ::dirsubset::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Change applied to B after it starts as a copy of A
#[derive(Debug, Clone)]
pub enum Mutation {
    Remove,
    Replace(Vec<u8>),
    FlipByte(usize),
    Append(Vec<u8>),
}

/// Relative paths of 1-3 lowercase components
fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}", 1..=3).prop_map(|parts| parts.join("/"))
}

fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        Just(Mutation::Remove),
        content_strategy().prop_map(Mutation::Replace),
        any::<usize>().prop_map(Mutation::FlipByte),
        prop::collection::vec(any::<u8>(), 1..16).prop_map(Mutation::Append),
    ]
}

/// A tree where no path is a prefix directory of another path
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(path_strategy(), content_strategy(), 0..20).prop_map(|files| {
        let mut accepted: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (path, content) in files {
            let clashes = accepted.keys().any(|existing| {
                existing.starts_with(&format!("{}/", path)) || path.starts_with(&format!("{}/", existing))
            });
            if !clashes {
                accepted.insert(path, content);
            }
        }
        accepted
    })
}

pub fn materialize(root: &Path, files: &BTreeMap<String, Vec<u8>>) {
    for (relative, content) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn apply(root: &Path, relative: &str, mutation: &Mutation) {
    let path = root.join(relative);
    match mutation {
        Mutation::Remove => fs::remove_file(path).unwrap(),
        Mutation::Replace(content) => fs::write(path, content).unwrap(),
        Mutation::FlipByte(at) => {
            let mut bytes = fs::read(&path).unwrap();
            if !bytes.is_empty() {
                let at = at % bytes.len();
                bytes[at] ^= 0xFF;
            }
            fs::write(path, bytes).unwrap();
        }
        Mutation::Append(extra) => {
            let mut bytes = fs::read(&path).unwrap();
            bytes.extend_from_slice(extra);
            fs::write(path, bytes).unwrap();
        }
    }
}

fn verify(a: &Path, b: &Path, workers: usize) -> ComparisonResult {
    VerifierBuilder::new()
        .parallel_workers(workers)
        .case_policy(CasePolicy::Preserve)
        .build()
        .unwrap()
        .verify(a, b)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A copy of a tree always contains it
    #[test]
    fn copy_is_always_contained(files in tree_strategy()) {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        materialize(a.path(), &files);
        materialize(b.path(), &files);

        let result = verify(a.path(), b.path(), 2);
        prop_assert!(result.all_matched, "diagnostics: {:?}", result.diagnostics);
        prop_assert_eq!(result.stats.files_checked, files.len());
    }

    /// Flagged paths are exactly the paths whose bytes differ or are gone
    #[test]
    fn verdict_matches_byte_equality(
        files in tree_strategy(),
        mutations in prop::collection::vec((any::<prop::sample::Index>(), mutation_strategy()), 0..6),
        workers in 1usize..5,
    ) {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        materialize(a.path(), &files);
        materialize(b.path(), &files);

        let paths: Vec<&String> = files.keys().collect();
        let mut removed = std::collections::BTreeSet::new();
        if !paths.is_empty() {
            for (index, mutation) in &mutations {
                let relative = index.get(&paths);
                if removed.contains(*relative) {
                    continue;
                }
                if matches!(mutation, Mutation::Remove) {
                    removed.insert((*relative).clone());
                }
                apply(b.path(), relative, mutation);
            }
        }

        let result = verify(a.path(), b.path(), workers);
        let flagged: Vec<&str> = result.diagnostics.iter().map(|d| d.path()).collect();

        let mut expected = Vec::new();
        for relative in files.keys() {
            let same = fs::read(b.path().join(relative))
                .map(|bytes| &bytes == files.get(relative).unwrap())
                .unwrap_or(false);
            if !same {
                expected.push(relative.as_str());
            }
        }

        prop_assert_eq!(&flagged, &expected);
        prop_assert_eq!(result.all_matched, expected.is_empty());
    }

    /// Running twice on unchanged trees gives the same report
    #[test]
    fn verification_is_idempotent(a_files in tree_strategy(), b_files in tree_strategy()) {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        materialize(a.path(), &a_files);
        materialize(b.path(), &b_files);

        let first = verify(a.path(), b.path(), 1);
        let second = verify(a.path(), b.path(), 3);
        prop_assert_eq!(first.all_matched, second.all_matched);
        prop_assert_eq!(first.diagnostics, second.diagnostics);
    }

    /// Keys never contain backslashes or leading separators
    #[test]
    fn keys_are_slash_separated(files in tree_strategy()) {
        let a = TempDir::new().unwrap();
        materialize(a.path(), &files);

        let index = TreeIndex::build(a.path(), &IndexOptions::new().with_case_policy(CasePolicy::Preserve)).unwrap();
        prop_assert_eq!(index.len(), files.len());
        for file in &index {
            prop_assert!(!file.key.as_str().starts_with('/'));
            prop_assert!(!file.key.as_str().contains('\\'));
            prop_assert!(files.contains_key(file.key.as_str()));
        }
    }
}
