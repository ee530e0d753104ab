//! Integration tests for stepcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn stepcache() -> Command {
        cargo_bin_cmd!("stepcache")
    }

    /// Config pointing the bloom filter into `dir` and the registry at a closed port
    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        fs::write(
            &path,
            format!(
                "[registry]\nurl = \"http://127.0.0.1:9\"\ntimeout_secs = 2\n\n[bloom]\npath = \"{}\"\n",
                dir.join("bloom.json").display()
            ),
        )
        .unwrap();
        path
    }

    fn write_step(dir: &Path, extra: &str) -> PathBuf {
        let src = dir.join("main.c");
        fs::write(&src, "int main(void) { return 0; }").unwrap();

        let path = dir.join("step.toml");
        fs::write(
            &path,
            format!(
                "name = \"compile main\"\ncommand = \"touch '{out}'\"\nversion = 1\ndependencies = [\"{src}\"]\n{extra}\n[outputs]\nobj = \"{out}\"\n",
                out = dir.join("main.o").display(),
                src = src.display(),
                extra = extra,
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn help_displays() {
        stepcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build artifact cache"));
    }

    #[test]
    fn version_displays() {
        stepcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("stepcache"));
    }

    #[test]
    fn hash_is_stable() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let step = write_step(dir.path(), "");

        let first = stepcache()
            .arg("--config")
            .arg(&config)
            .arg("hash")
            .arg(&step)
            .assert()
            .success()
            .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap())
            .get_output()
            .stdout
            .clone();

        let second = stepcache()
            .arg("--config")
            .arg(&config)
            .arg("hash")
            .arg(&step)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        assert_eq!(first, second);
    }

    #[test]
    fn hash_follows_arch() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        let step_a = write_step(dir.path(), "arch = \"x86_64\"");
        let a = stepcache()
            .arg("--config")
            .arg(&config)
            .args(["hash"])
            .arg(&step_a)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let step_b = write_step(dir.path(), "arch = \"aarch64\"");
        let b = stepcache()
            .arg("--config")
            .arg(&config)
            .args(["hash"])
            .arg(&step_b)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        assert_ne!(a, b);
    }

    #[test]
    fn hash_missing_dependency_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let step = write_step(dir.path(), "");
        fs::remove_file(dir.path().join("main.c")).unwrap();

        stepcache()
            .arg("--config")
            .arg(&config)
            .arg("hash")
            .arg(&step)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read dependency"));
    }

    #[test]
    fn build_without_filter_warns_builds_and_reports_store_failure() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let step = write_step(dir.path(), "");

        stepcache()
            .arg("--config")
            .arg(&config)
            .arg("build")
            .arg(&step)
            .assert()
            .failure()
            .stderr(predicate::str::contains("bloom filter not found"))
            .stderr(predicate::str::contains("store-entry"));

        // The local build ran even though publishing failed
        assert!(dir.path().join("main.o").exists());
    }

    #[test]
    fn bloom_check_without_filter_hints_refresh() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let step = write_step(dir.path(), "");

        stepcache()
            .arg("--config")
            .arg(&config)
            .args(["bloom", "check"])
            .arg(&step)
            .assert()
            .failure()
            .stderr(predicate::str::contains("stepcache bloom refresh"));
    }

    #[test]
    fn invalid_step_file_fails_before_network() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let step = dir.path().join("step.toml");
        fs::write(&step, "name = \"x\"\ncommand = \"true\"\n[outputs]\n").unwrap();

        stepcache()
            .arg("--config")
            .arg(&config)
            .arg("build")
            .arg(&step)
            .assert()
            .failure()
            .stderr(predicate::str::contains("declares no outputs"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");

        stepcache()
            .arg("--config")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();

        stepcache()
            .arg("--config")
            .arg(dir.path().join("absent.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[registry]"));
    }

    #[test]
    fn config_init_writes_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");

        stepcache()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();

        assert!(fs::read_to_string(&config).unwrap().contains("[bloom]"));
    }
}
