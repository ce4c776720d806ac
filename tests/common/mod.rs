#![allow(dead_code)]

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::TempDir;

/// Address nothing listens on
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Helper struct to run backoffice commands in an isolated temp directory
pub struct BackofficeTest {
    pub temp_dir: TempDir,
    backend_url: String,
}

impl BackofficeTest {
    pub fn new() -> Self {
        Self::with_backend(UNREACHABLE_URL)
    }

    pub fn with_backend(url: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        BackofficeTest {
            temp_dir,
            backend_url: url.to_string(),
        }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        let home = self.temp_dir.path().join("home");
        Command::new(env!("CARGO_BIN_EXE_backoffice"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("BACKOFFICE_URL", &self.backend_url)
            .env_remove("BACKOFFICE_TOKEN")
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .output()
            .expect("Failed to execute backoffice command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn write_config(&self, content: &str) {
        let dir = self.temp_dir.path().join(".backoffice");
        fs::create_dir_all(&dir).expect("Failed to create .backoffice directory");
        fs::write(dir.join("config.yaml"), content).expect("Failed to write config file");
    }

    pub fn read_config(&self) -> Option<String> {
        fs::read_to_string(self.temp_dir.path().join(".backoffice").join("config.yaml")).ok()
    }
}

/// Answers every request with the same JSON body and records request lines.
pub struct CannedBackend {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedBackend {
    pub fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test backend");
        let url = format!("http://{}", listener.local_addr().expect("no local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let body = body.to_string();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                let mut content_length = 0;
                let mut line = String::new();
                while reader.read_line(&mut line).is_ok() && line != "\r\n" && !line.is_empty() {
                    if let Some((name, value)) = line.split_once(':')
                        && name.eq_ignore_ascii_case("content-length")
                    {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                    line.clear();
                }
                let mut request_body = vec![0; content_length];
                let _ = reader.read_exact(&mut request_body);
                recorded
                    .lock()
                    .expect("request log poisoned")
                    .push(request_line.trim().to_string());

                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        CannedBackend { url, requests }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}
