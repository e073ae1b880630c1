//! Integration tests for offcache

mod support {
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    /// Minimal HTTP origin serving fixed pages on a background thread
    pub struct Site {
        pub origin: String,
    }

    impl Site {
        pub fn start(pages: &[(&str, &str)]) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let origin = format!("http://{}", listener.local_addr().unwrap());
            let pages: Arc<HashMap<String, String>> = Arc::new(
                pages
                    .iter()
                    .map(|(path, body)| (path.to_string(), body.to_string()))
                    .collect(),
            );

            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    let pages = Arc::clone(&pages);
                    thread::spawn(move || serve(stream, &pages));
                }
            });

            Self { origin }
        }
    }

    fn serve(mut stream: TcpStream, pages: &HashMap<String, String>) {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => raw.extend_from_slice(&buf[..n]),
            }
        }

        let head = String::from_utf8_lossy(&raw);
        let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
        let (status, body) = match pages.get(&path) {
            Some(body) => ("200 OK", body.as_str()),
            None => ("404 Not Found", "missing"),
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
    }

    /// Temporary config whose stores, registration and journal live in a tempdir
    pub struct Workspace {
        pub dir: TempDir,
    }

    impl Workspace {
        pub fn new(scope: &str, version: &str, seeds: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            let seeds = seeds
                .iter()
                .map(|s| format!("\"{}\"", s))
                .collect::<Vec<_>>()
                .join(", ");
            let config = format!(
                "[worker]\nscope = \"{}\"\nstore_version = \"{}\"\nseed_resources = [{}]\n\n[storage]\nroot = '{}'\n",
                scope,
                version,
                seeds,
                dir.path().join("data").display()
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        pub fn config(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        pub fn data(&self) -> PathBuf {
            self.dir.path().join("data")
        }
    }

    pub fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

mod cli_tests {
    use super::support::{read, Site, Workspace};
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn offcache() -> Command {
        cargo_bin_cmd!("offcache")
    }

    fn offcache_in(workspace: &Workspace) -> Command {
        let mut cmd = offcache();
        cmd.arg("--config").arg(workspace.config());
        cmd
    }

    fn site() -> Site {
        Site::start(&[
            ("/", "<h1>home</h1>"),
            ("/index.html", "<h1>index</h1>"),
            ("/app.js", "console.log(1)"),
        ])
    }

    #[test]
    fn help_displays() {
        offcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline cache controller"));
    }

    #[test]
    fn version_displays() {
        offcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("offcache"));
    }

    #[test]
    fn config_path() {
        offcache()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[worker]"))
            .stdout(predicate::str::contains("site-v1"));
    }

    #[test]
    fn config_set_persists() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .args(["config", "set", "worker.store_version", "site-v9"])
            .assert()
            .success();

        assert!(read(&workspace.config()).contains("site-v9"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .args(["config", "set", "worker.nope", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn missing_explicit_config_fails() {
        offcache()
            .args(["--config", "/nonexistent/offcache.toml", "status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn stores_list_empty() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .args(["stores", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn activate_without_install_fails() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No worker is waiting"))
            .stderr(predicate::str::contains("offcache install"));
    }

    #[test]
    fn fetch_offline_without_worker_fails() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .args(["fetch", "--offline", "/index.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network unavailable"));
    }

    #[test]
    fn install_fails_on_missing_seed() {
        let site = site();
        let workspace = Workspace::new(&site.origin, "site-v1", &["/", "/missing.html"]);

        offcache_in(&workspace)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("returned status 404"));

        offcache_in(&workspace)
            .args(["stores", "show", "site-v1", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
        assert!(read(&workspace.data().join("events.log")).contains("install.failed"));
    }

    #[test]
    fn register_then_serve_offline() {
        let site = site();
        let workspace = Workspace::new(&site.origin, "site-v1", &["/", "/index.html"]);

        offcache_in(&workspace)
            .arg("register")
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed site-v1"))
            .stdout(predicate::str::contains("Activated site-v1"));

        offcache_in(&workspace)
            .args(["fetch", "--offline", "/index.html"])
            .assert()
            .success()
            .stdout("<h1>index</h1>");

        offcache_in(&workspace)
            .args(["fetch", "--offline", "--include", "/other.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("HTTP 503"))
            .stdout(predicate::str::contains("text/html; charset=utf-8"))
            .stdout(predicate::str::contains("Offline and not cached"));

        let journal = read(&workspace.data().join("events.log"));
        assert!(journal.contains("install.completed"));
        assert!(journal.contains("fetch.fallback"));
    }

    #[test]
    fn network_response_is_written_back() {
        let site = site();
        let workspace = Workspace::new(&site.origin, "site-v1", &["/"]);
        offcache_in(&workspace).arg("register").assert().success();

        offcache_in(&workspace)
            .args(["fetch", "/app.js"])
            .assert()
            .success()
            .stdout("console.log(1)");

        offcache_in(&workspace)
            .args(["stores", "show", "site-v1", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/app.js"));
    }

    #[test]
    fn new_version_sweeps_old_store() {
        let site = site();
        let workspace = Workspace::new(&site.origin, "site-v1", &["/"]);
        offcache_in(&workspace).arg("register").assert().success();

        offcache_in(&workspace)
            .args(["config", "set", "worker.store_version", "site-v2"])
            .assert()
            .success();
        offcache_in(&workspace)
            .arg("register")
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted stale store site-v1"));

        offcache_in(&workspace)
            .args(["stores", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout("site-v2\n");

        offcache_in(&workspace)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("site-v2"));
    }

    #[test]
    fn post_is_not_intercepted() {
        let site = site();
        let workspace = Workspace::new(&site.origin, "site-v1", &["/"]);
        offcache_in(&workspace).arg("register").assert().success();

        offcache_in(&workspace)
            .args(["fetch", "--offline", "--method", "POST", "/"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network unavailable"));
    }

    #[test]
    fn stores_clear_requires_confirmation() {
        let site = site();
        let workspace = Workspace::new(&site.origin, "site-v1", &["/"]);
        offcache_in(&workspace).arg("install").assert().success();

        offcache_in(&workspace)
            .args(["stores", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing deleted"));

        offcache_in(&workspace)
            .args(["stores", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted store site-v1"));

        offcache_in(&workspace)
            .args(["stores", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn stores_delete_missing_fails() {
        let workspace = Workspace::new("http://localhost:8080/", "site-v1", &["/"]);
        offcache_in(&workspace)
            .args(["stores", "delete", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Store not found"));
    }
}
