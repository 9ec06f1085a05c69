use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use trials_cli::api_client::{ApiClient, ApiError, SearchCriteria};

/// Serves the given HTTP exchanges on an ephemeral local port, one
/// connection each, and hands back the captured request heads on join.
fn spawn_stub(
    responses: Vec<(&'static str, &'static str, String)>,
) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status_line, content_type, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request_head(&mut stream));
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                content_type,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        requests
    });

    (base_url, handle)
}

/// Reads up to the blank line ending the request head. GETs carry no body.
fn read_request_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&head).to_string()
}

#[test]
fn success_returns_the_decoded_body_unmodified() {
    let body = r#"{"studies": [{"id": "NCT001"}]}"#.to_string();
    let (base_url, handle) = spawn_stub(vec![("200 OK", "application/json", body)]);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");
    let document = client.fetch_studies(&criteria).unwrap();

    assert_eq!(document, json!({"studies": [{"id": "NCT001"}]}));

    let requests = handle.join().unwrap();
    assert!(requests[0].starts_with("GET /api/v2/studies?"));
}

#[test]
fn parameters_map_verbatim_and_in_order() {
    let (base_url, handle) = spawn_stub(vec![("200 OK", "application/json", "{}".to_string())]);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("asthma", "RECRUITING", "Japan");
    client.fetch_studies(&criteria).unwrap();

    let requests = handle.join().unwrap();
    assert!(requests[0]
        .contains("/api/v2/studies?query.cond=asthma&filter.overallStatus=RECRUITING&query.locn=Japan"));
}

#[test]
fn empty_parameters_are_still_sent() {
    let (base_url, handle) = spawn_stub(vec![("200 OK", "application/json", "{}".to_string())]);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("", "", "");
    client.fetch_studies(&criteria).unwrap();

    let requests = handle.join().unwrap();
    assert!(requests[0].contains("query.cond=&filter.overallStatus=&query.locn="));
}

#[test]
fn http_error_carries_status_and_remote_message() {
    let body = r#"{"error": "not found"}"#.to_string();
    let (base_url, _handle) = spawn_stub(vec![("404 Not Found", "application/json", body)]);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");
    let err = client.fetch_studies(&criteria).unwrap_err();

    match &err {
        ApiError::Http { status, message } => {
            assert_eq!(*status, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("expected Http error, got {:?}", other),
    }

    // What the shells show: prefix, status code and remote message
    let shown = err.to_string();
    assert!(shown.starts_with("HTTP Error:"));
    assert!(shown.contains("404"));
    assert!(shown.contains("not found"));
}

#[test]
fn non_json_success_body_is_a_decode_error() {
    let (base_url, _handle) = spawn_stub(vec![("200 OK", "text/plain", "not json".to_string())]);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");
    let err = client.fetch_studies(&criteria).unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
}

#[test]
fn unreachable_endpoint_is_a_transport_error() {
    // Bind to grab a free port, then drop the listener so nothing answers
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");
    let err = client.fetch_studies(&criteria).unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
}

#[test]
fn identical_searches_return_identical_documents() {
    let body = r#"{"studies": [{"id": "NCT001"}], "totalCount": 1}"#.to_string();
    let (base_url, handle) = spawn_stub(vec![
        ("200 OK", "application/json", body.clone()),
        ("200 OK", "application/json", body),
    ]);

    let client = ApiClient::new(&base_url).unwrap();
    let criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");

    let first: Value = client.fetch_studies(&criteria).unwrap();
    let second: Value = client.fetch_studies(&criteria).unwrap();
    assert_eq!(first, second);

    // Both requests went out the same way - no state accumulates
    let requests = handle.join().unwrap();
    let query_of = |head: &str| head.lines().next().unwrap().to_string();
    assert_eq!(query_of(&requests[0]), query_of(&requests[1]));
}
