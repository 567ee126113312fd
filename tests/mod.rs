//! Main test module for dirsubset
//!
//! This module includes all test suites:
//! - Integration tests for end-to-end verification scenarios
//! - Property-based tests for invariants

pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::dirsubset::*;
    use std::fs;
    use tempfile::TempDir;

    fn verifier() -> SubsetVerifier {
        VerifierBuilder::new()
            .case_policy(CasePolicy::Preserve)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_a_is_always_contained() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(b.path().join("anything.txt"), "content").unwrap();

        let result = verifier().verify(a.path(), b.path()).unwrap();
        assert!(result.all_matched);
        assert_eq!(result.stats.files_checked, 0);

        // B empty as well
        let empty = TempDir::new().unwrap();
        assert!(verifier().verify(a.path(), empty.path()).unwrap().all_matched);
    }

    #[test]
    fn test_empty_directories_do_not_count() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::create_dir_all(a.path().join("only/in/a")).unwrap();

        let result = verifier().verify(a.path(), b.path()).unwrap();
        assert!(result.all_matched);
    }

    #[test]
    fn test_special_filenames() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file_with_underscores.txt",
            "file.multiple.dots.txt",
            "ファイル.txt",
            "émoji-🎉.txt",
        ];

        for name in &special_names {
            fs::write(a.path().join(name), name.as_bytes()).unwrap();
            fs::write(b.path().join(name), name.as_bytes()).unwrap();
        }

        let result = verifier().verify(a.path(), b.path()).unwrap();
        assert!(result.all_matched);
        assert_eq!(result.stats.files_checked, special_names.len());
    }

    #[test]
    fn test_zero_byte_files() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("empty.txt"), "").unwrap();
        fs::write(b.path().join("empty.txt"), "").unwrap();

        let result = verifier().verify(a.path(), b.path()).unwrap();
        assert!(result.all_matched);
        assert_eq!(result.stats.files_hashed, 2);
        assert_eq!(result.stats.bytes_hashed, 0);
    }

    #[test]
    fn test_directory_in_b_where_a_has_file() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("thing"), "file").unwrap();
        fs::create_dir_all(b.path().join("thing")).unwrap();
        fs::write(b.path().join("thing/inner.txt"), "file").unwrap();

        let result = verifier().verify(a.path(), b.path()).unwrap();
        assert_eq!(result.diagnostics, vec![DiffEntry::Missing { path: "thing".into() }]);
    }

    #[test]
    fn test_case_fold_matches_across_case() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("Photo.JPG"), "pixels").unwrap();
        fs::write(b.path().join("photo.jpg"), "pixels").unwrap();

        let preserve = verifier().verify(a.path(), b.path()).unwrap();
        assert_eq!(preserve.diagnostics, vec![DiffEntry::Missing { path: "Photo.JPG".into() }]);

        let fold = VerifierBuilder::new()
            .case_policy(CasePolicy::Fold)
            .build()
            .unwrap();
        let result = fold.verify(a.path(), b.path()).unwrap();
        assert!(result.all_matched);
    }

    #[test]
    fn test_excluded_files_are_not_required() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("keep.txt"), "keep").unwrap();
        fs::write(b.path().join("keep.txt"), "keep").unwrap();
        fs::write(a.path().join(".DS_Store"), "junk").unwrap();
        fs::create_dir_all(a.path().join("target")).unwrap();
        fs::write(a.path().join("target/build.o"), "obj").unwrap();

        let verifier = VerifierBuilder::new()
            .case_policy(CasePolicy::Preserve)
            .exclude_patterns(vec!["**/.DS_Store".to_string(), "target".to_string()])
            .build()
            .unwrap();

        let result = verifier.verify(a.path(), b.path()).unwrap();
        assert!(result.all_matched, "diagnostics: {:?}", result.diagnostics);
        assert_eq!(result.stats.files_checked, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_not_matched_by_another() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        if fs::write(a.path().join(OsStr::from_bytes(b"\xff.txt")), "x").is_err()
            || fs::write(b.path().join(OsStr::from_bytes(b"\xfe.txt")), "x").is_err()
        {
            // Filesystem only accepts UTF-8 names.
            return;
        }

        let result = verifier().verify(a.path(), b.path()).unwrap();
        assert!(!result.all_matched);
        assert!(matches!(&result.diagnostics[..], [DiffEntry::Missing { .. }]));
    }

    #[test]
    fn test_same_root_for_both_sides() {
        let a = TempDir::new().unwrap();
        fs::write(a.path().join("x.txt"), "self").unwrap();

        let result = verifier().verify(a.path(), a.path()).unwrap();
        assert!(result.all_matched);
    }
}
