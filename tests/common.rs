use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

// Not every test binary uses every helper.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub work_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let cache_dir = temp_dir.path().join("cache");
        let work_dir = temp_dir.path().join("addon");
        std::fs::create_dir_all(&work_dir).expect("Failed to create work dir");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_get-blender"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            cache_dir,
            work_dir,
            bin_path,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self._temp_dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.current_dir(&self.work_dir);
        cmd.env("GET_BLENDER_CONFIG", &self.config_path);
        cmd.env("BLENDER_CACHE", &self.cache_dir);
        // Isolate from the developer's own settings and proxies
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("config"));
        for var in [
            "HTTP_PROXY",
            "HTTPS_PROXY",
            "ALL_PROXY",
            "http_proxy",
            "https_proxy",
            "all_proxy",
            "RUST_LOG",
            "GET_BLENDER_STABLE_INDEX",
            "GET_BLENDER_NIGHTLY_INDEX",
            "GET_BLENDER_STRICT_BOOTSTRAP",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// A command pointed at `server` for both release indexes.
    pub fn cmd_with_indexes(&self, server: &IndexServer) -> Command {
        let mut cmd = self.cmd();
        cmd.env(
            "GET_BLENDER_STABLE_INDEX",
            server.url("/release/Blender{version}"),
        );
        cmd.env("GET_BLENDER_NIGHTLY_INDEX", server.url("/download"));
        cmd
    }
}

/// Minimal HTTP/1.1 server answering GETs from a fixed route table.
#[allow(dead_code)]
pub struct IndexServer {
    port: u16,
    hits: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl IndexServer {
    pub fn start(routes: HashMap<String, Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
        let port = listener.local_addr().expect("No local address").port();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) => break,
                        Ok(_) if header == "\r\n" || header == "\n" => break,
                        Ok(_) => continue,
                        Err(_) => break,
                    }
                }

                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                log.lock().unwrap().push(path.clone());

                let (status, body) = match routes.get(&path) {
                    Some(body) => ("200 OK", body.as_slice()),
                    None => ("404 Not Found", b"not found".as_slice()),
                };
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body);
                let _ = stream.flush();
            }
        });

        Self { port, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

/// An HTML listing linking to each of `names`.
#[allow(dead_code)]
pub fn listing(names: &[&str]) -> Vec<u8> {
    let links: String = names
        .iter()
        .map(|n| format!("<a href=\"{}\">{}</a><br>\n", n, n))
        .collect();
    format!("<html><body><pre>\n{}</pre></body></html>\n", links).into_bytes()
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
