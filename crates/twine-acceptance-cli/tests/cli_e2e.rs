use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use twine_acceptance_core::test_support::{PageBuilder, StubResponse, StubServer};
use twine_acceptance_core::vocab::{FOAF_PERSON_IRI, FRBR_WORK_IRI};

fn cli_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_twine-acceptance"))
}

/// Removed with everything in it when dropped.
fn run_dir(label: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("twine_acceptance_{label}_"))
        .tempdir()
        .expect("create run dir")
}

struct ChildGuard {
    child: Child,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start `twine-acceptance remote` on an ephemeral port and wait for its ready file.
fn start_remote(dir: &Path, ingest_command: &str, update_command: Option<&str>) -> (ChildGuard, String) {
    let ready = dir.join("ready.json");
    let mut cmd = Command::new(cli_bin());
    cmd.args(["remote", "--listen", "127.0.0.1:0", "--ingest-command", ingest_command])
        .arg("--data-file")
        .arg(dir.join("remote-data.nq"))
        .arg("--ready-file")
        .arg(&ready);
    if let Some(update) = update_command {
        cmd.args(["--update-command", update]);
    }
    let guard = ChildGuard {
        child: cmd.spawn().expect("spawn remote"),
    };

    let deadline = Instant::now() + Duration::from_secs(20);
    loop {
        if let Ok(text) = fs::read_to_string(&ready) {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
                let addr = json["addr"].as_str().expect("addr in ready file").to_string();
                return (guard, addr);
            }
        }
        assert!(Instant::now() < deadline, "remote control did not become ready");
        std::thread::sleep(Duration::from_millis(50));
    }
}

struct RawReply {
    status: u16,
    head: String,
    json: serde_json::Value,
}

fn http_request(addr: &str, method: &str, path: &str, body: &[u8]) -> RawReply {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(10))).ok();
    stream.set_write_timeout(Some(Duration::from_secs(10))).ok();

    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: text/x-nquads\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(request.as_bytes()).expect("write request");
    stream.write_all(body).expect("write body");
    stream.flush().ok();

    let mut response_bytes = Vec::new();
    stream
        .read_to_end(&mut response_bytes)
        .expect("read response");
    let response = String::from_utf8_lossy(&response_bytes);

    let (head, body_text) = response
        .split_once("\r\n\r\n")
        .unwrap_or(("", response.as_ref()));
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);
    RawReply {
        status,
        head: head.to_ascii_lowercase(),
        json: serde_json::from_str(body_text).expect("parse JSON response"),
    }
}

const FIXTURE: &str = "\
<http://example.org/people/alice> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://xmlns.com/foaf/0.1/Person> <http://example.org/graph> .
<http://example.org/works/w1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://purl.org/vocab/frbr/core#Work> <http://example.org/graph> .
<http://example.org/works/w1> <http://purl.org/dc/terms/title> \"A Work\" <http://example.org/graph> .
";

// ============================================================================
// Remote control
// ============================================================================

#[test]
fn remote_ingest_stores_the_upload_and_runs_the_command() {
    let dir = run_dir("remote_ingest");
    let (_guard, addr) = start_remote(dir.path(), "cat", None);

    let reply = http_request(&addr, "POST", "/ingest", FIXTURE.as_bytes());
    assert_eq!(reply.status, 200, "{}", reply.json);
    assert!(reply.head.contains("content-type: text/json;charset=utf-8"));
    assert_eq!(reply.json["message"], "Ingest completed");
    assert_eq!(reply.json["logs"], FIXTURE);
    assert!(reply.json["command"]
        .as_str()
        .unwrap()
        .starts_with("cat '"));

    let stored = fs::read_to_string(dir.path().join("remote-data.nq")).expect("data file");
    assert_eq!(stored, FIXTURE);
}

#[test]
fn remote_reports_a_failing_ingest_command_as_500() {
    let dir = run_dir("remote_fail");
    let (_guard, addr) = start_remote(dir.path(), "echo boom; false", None);

    let reply = http_request(&addr, "POST", "/ingest", FIXTURE.as_bytes());
    assert_eq!(reply.status, 500);
    assert!(reply.json["message"].as_str().unwrap().starts_with("Error: "));
    assert!(reply.json["logs"].as_str().unwrap().contains("boom"));
}

#[test]
fn remote_ingests_overlapping_uploads_one_at_a_time() {
    let dir = run_dir("remote_overlap");
    let (_guard, addr) = start_remote(dir.path(), "sleep 0.5; cat", None);

    let uploads: Vec<_> = ["AAAA", "BBBB"]
        .into_iter()
        .map(|body| {
            let addr = addr.clone();
            std::thread::spawn(move || (body, http_request(&addr, "POST", "/ingest", body.as_bytes())))
        })
        .collect();

    for upload in uploads {
        let (body, reply) = upload.join().expect("upload thread");
        assert_eq!(reply.status, 200, "{}", reply.json);
        assert_eq!(reply.json["logs"], body, "reply reported another upload's document");
    }
}

#[test]
fn remote_update_and_banner_routes() {
    let dir = run_dir("remote_routes");
    let (_guard, addr) = start_remote(dir.path(), "cat", Some("echo reprocessed"));

    let update = http_request(&addr, "GET", "/update", b"");
    assert_eq!(update.status, 200);
    assert_eq!(update.json["message"], "Update completed");
    assert_eq!(update.json["logs"], "reprocessed\n");

    let banner = http_request(&addr, "GET", "/anything", b"");
    assert_eq!(banner.status, 200);
    assert_eq!(banner.json, serde_json::json!({ "message": "Twine remote control" }));

    let missing = http_request(&addr, "POST", "/nope", b"");
    assert_eq!(missing.status, 404);
}

#[test]
fn remote_update_without_command_answers_the_banner() {
    let dir = run_dir("remote_no_update");
    let (_guard, addr) = start_remote(dir.path(), "cat", None);

    let update = http_request(&addr, "GET", "/update", b"");
    assert_eq!(update.status, 200);
    assert_eq!(update.json["message"], "Twine remote control");
}

// ============================================================================
// Acceptance check against stub services
// ============================================================================

/// Twine and Quilt on one stub: `/collections/A` holds `collection_entities`
/// of the two entities in the dataset.
fn stub_deployment(collection_entities: usize) -> StubServer {
    StubServer::start(move |req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/ingest") => StubResponse::ok(r#"{"message":"Ingest completed"}"#),
        ("GET", "/update") => StubResponse::ok(r#"{"message":"Twine remote control"}"#),
        ("GET", "/") => match req.query_param("uri").as_deref() {
            Some("http://example.org/collectionA") => StubResponse::see_other("/collections/A#id"),
            _ => StubResponse::new(404),
        },
        ("GET", "/everything.nt") => StubResponse::ok(
            PageBuilder::new()
                .typed("http://quilt/people/alice#id", FOAF_PERSON_IRI)
                .typed("http://quilt/works/w1#id", FRBR_WORK_IRI)
                .build(),
        ),
        ("GET", "/collections/A.nt") => {
            let mut page = PageBuilder::new();
            if collection_entities > 0 {
                page = page.typed("http://quilt/people/alice#id", FOAF_PERSON_IRI);
            }
            if collection_entities > 1 {
                page = page.typed("http://quilt/works/w1#id", FRBR_WORK_IRI);
            }
            StubResponse::ok(page.build())
        }
        _ => StubResponse::new(404),
    })
    .expect("stub deployment")
}

fn run_cli(server: &StubServer, args: &[&str]) -> Output {
    Command::new(cli_bin())
        .args(args)
        .args(["--twine-url", &server.url()])
        .args(["--resolver-url", &format!("{}/", server.url())])
        .args(["--catalog-url", &server.url()])
        .args(["--timeout-secs", "10"])
        .env_remove("TWINE_URL")
        .env_remove("QUILT_RESOLVER_URL")
        .env_remove("QUILT_CATALOG_URL")
        .env_remove("TWINE_TIMEOUT_SECS")
        .env_remove("QUILT_PAGE_LIMIT")
        .output()
        .expect("run cli")
}

fn write_fixture(label: &str) -> (TempDir, PathBuf) {
    let dir = run_dir(label);
    let path = dir.path().join("fixture.nq");
    fs::write(&path, FIXTURE).expect("write fixture");
    (dir, path)
}

#[test]
fn check_passes_when_the_collection_matches_the_dataset() {
    let server = stub_deployment(2);
    let (_dir, fixture) = write_fixture("check_ok");

    let out = run_cli(
        &server,
        &[
            "check",
            "--fixture",
            fixture.to_str().unwrap(),
            "--collection",
            "http://example.org/collectionA",
            "--compare-fixture",
            "--json",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["everything"], 2);
    assert_eq!(report["fixture_relevant"], 2);
    assert_eq!(report["fixture_matches"], true);
    assert_eq!(report["collections"][0]["location"], "/collections/A");
    assert_eq!(report["collections"][0]["count"], 2);

    let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec!["/ingest", "/update", "/everything.nt", "/", "/collections/A.nt"]
    );
}

#[test]
fn check_fails_on_a_smaller_collection_unless_subsets_are_allowed() {
    let server = stub_deployment(1);
    let (_dir, fixture) = write_fixture("check_subset");
    let fixture = fixture.to_str().unwrap();
    let collection = "http://example.org/collectionA";

    let strict = run_cli(&server, &["check", "--fixture", fixture, "--collection", collection]);
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr).contains("acceptance check failed"));

    let relaxed = run_cli(
        &server,
        &["check", "--fixture", fixture, "--collection", collection, "--allow-subset"],
    );
    assert!(relaxed.status.success(), "{}", String::from_utf8_lossy(&relaxed.stderr));
}

#[test]
fn resolve_prints_the_canonical_location() {
    let server = stub_deployment(2);

    let out = run_cli(&server, &["resolve", "http://example.org/collectionA"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "/collections/A");

    let unknown = run_cli(&server, &["resolve", "http://example.org/unknown"]);
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("404"));
}

#[test]
fn count_json_reports_per_type_totals() {
    let server = stub_deployment(2);

    let out = run_cli(&server, &["count", "--json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["total"], 2);
    assert_eq!(report["pages"], 1);
}
