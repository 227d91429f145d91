//! Main test module for easegit
//!
//! This module includes all test suites:
//! - Integration tests for complete capture and undo scenarios
//! - Property-based tests for invariants
//! - Edge cases around file names, modes and links

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use crate::integration::RepoHarness;
    use std::fs;

    #[test]
    fn test_special_filenames() {
        let repo = RepoHarness::new().unwrap();

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "file@with#special$chars.txt",
            "file(with)parens.txt",
            "file[with]brackets.txt",
            "quote'in\"name.txt",
        ];

        let mut created = Vec::new();
        for name in &special_names {
            // Skip if OS doesn't support this filename
            if fs::write(repo.path().join(name), format!("Content of {}", name)).is_ok() {
                created.push(*name);
            }
        }

        repo.easegit.checkpoint("rebase").unwrap();

        for name in &created {
            fs::remove_file(repo.path().join(name)).unwrap();
        }
        repo.write("Removing later.txt", "tricky").unwrap();

        let result = repo.easegit.undo().unwrap();

        for name in &created {
            let content = fs::read_to_string(repo.path().join(name)).unwrap();
            assert_eq!(content, format!("Content of {}", name));
        }
        assert!(!repo.path().join("Removing later.txt").exists());
        assert_eq!(result.files_restored, created.len());
    }

    #[test]
    fn test_unicode_filenames() {
        let repo = RepoHarness::new().unwrap();

        let unicode_names = vec![
            "файл.txt",
            "文件.txt",
            "ファイル.txt",
            "αρχείο.txt",
            "🚀🌟💾.txt",
        ];

        let mut created = Vec::new();
        for name in &unicode_names {
            if fs::write(repo.path().join(name), format!("Unicode content: {}", name)).is_ok() {
                created.push(*name);
            }
        }
        if created.is_empty() {
            // No unicode support on this system
            return;
        }

        repo.easegit.checkpoint("merge").unwrap();
        for name in &created {
            fs::remove_file(repo.path().join(name)).unwrap();
        }
        repo.easegit.undo().unwrap();

        for name in &created {
            let content = fs::read_to_string(repo.path().join(name)).unwrap();
            assert_eq!(content, format!("Unicode content: {}", name));
        }
    }

    #[test]
    fn test_executable_bit_preserved() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let repo = RepoHarness::new().unwrap();
            repo.write("run.sh", "#!/bin/sh\necho hi\n").unwrap();
            repo.write("data.txt", "plain").unwrap();
            fs::set_permissions(repo.path().join("run.sh"), fs::Permissions::from_mode(0o755))
                .unwrap();

            repo.easegit.checkpoint("push").unwrap();
            fs::set_permissions(repo.path().join("run.sh"), fs::Permissions::from_mode(0o644))
                .unwrap();
            repo.easegit.undo().unwrap();

            let mode = fs::metadata(repo.path().join("run.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_symlinks() {
        #[cfg(unix)]
        {
            let repo = RepoHarness::new().unwrap();
            repo.write("target.txt", "Target content").unwrap();
            std::os::unix::fs::symlink("target.txt", repo.path().join("link.txt")).unwrap();

            repo.easegit.checkpoint("checkout").unwrap();
            fs::remove_file(repo.path().join("link.txt")).unwrap();
            fs::remove_file(repo.path().join("target.txt")).unwrap();

            let result = repo.easegit.undo().unwrap();
            assert_eq!(result.files_restored, 2);

            let link = repo.path().join("link.txt");
            assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
            assert_eq!(fs::read_to_string(&link).unwrap(), "Target content");
        }
    }

    #[test]
    fn test_ignored_build_output_survives_undo() {
        let repo = RepoHarness::new().unwrap();
        repo.write(".gitignore", "target/\n").unwrap();
        repo.write("src/lib.rs", "pub fn f() {}").unwrap();
        repo.easegit.checkpoint("rebase").unwrap();

        repo.write("target/debug/build.log", "artifact").unwrap();
        repo.write("src/extra.rs", "// new").unwrap();
        let result = repo.easegit.undo().unwrap();

        assert!(repo.path().join("target/debug/build.log").exists());
        assert!(!repo.path().join("src/extra.rs").exists());
        assert_eq!(
            result.files_removed,
            vec![std::path::PathBuf::from("src/extra.rs")]
        );
    }
}
