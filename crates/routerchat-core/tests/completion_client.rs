use std::io::ErrorKind;

use routerchat_core::{
    ChatMessage, ChatRole, ChatSession, Completer, Completion, CompletionClient, Config,
    NO_VALID_RESPONSE,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const TEST_KEY: &str = "sk-test-key";
const TEST_MODEL: &str = "deepseek/deepseek-chat";

struct CapturedRequest {
    head: String,
    body: String,
}

impl CapturedRequest {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Serve one canned response per connection, in order, and hand back what
/// each request looked like.
async fn start_server(
    responses: Vec<(&'static str, &'static str)>,
) -> Option<(String, JoinHandle<Vec<CapturedRequest>>)> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => return None,
        Err(err) => panic!("failed to bind local test listener: {err}"),
    };
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            captured.push(read_request(&mut socket).await);

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        captured
    });

    Some((format!("http://{addr}/api/v1/chat/completions"), handle))
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(request) = complete_request(&buf) {
            return request;
        }
    }
    CapturedRequest {
        head: String::from_utf8_lossy(&buf).to_string(),
        body: String::new(),
    }
}

fn complete_request(buf: &[u8]) -> Option<CapturedRequest> {
    let end = buf.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = String::from_utf8_lossy(&buf[..end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = end + 4;
    if buf.len() < body_start + content_length {
        return None;
    }
    Some(CapturedRequest {
        head,
        body: String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string(),
    })
}

fn client_for(url: &str) -> CompletionClient {
    let url = url.to_string();
    let config = Config::from_lookup(move |key| match key {
        "API_KEY" => Some(TEST_KEY.to_string()),
        "API_URL" => Some(url.clone()),
        _ => None,
    })
    .unwrap();
    CompletionClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_reply_is_first_choice_content() {
    let Some((url, server)) =
        start_server(vec![("200 OK", r#"{"choices":[{"message":{"content":"hi"}}]}"#)]).await
    else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let history = vec![ChatMessage::user("hello")];
    let completion = client_for(&url).complete(&history).await;
    assert_eq!(completion, Completion::Reply("hi".to_string()));
    assert_eq!(completion.into_text(), "hi");

    let requests = server.await.unwrap();
    let request = &requests[0];
    let head = request.head.to_ascii_lowercase();
    assert!(head.starts_with("post /api/v1/chat/completions "));
    assert!(head.contains(&format!("authorization: bearer {}", TEST_KEY.to_ascii_lowercase())));
    assert!(head.contains("content-type: application/json"));
    assert_eq!(
        request.json(),
        json!({
            "model": TEST_MODEL,
            "messages": [{ "role": "user", "content": "hello" }]
        })
    );
}

#[tokio::test]
async fn test_empty_choices_falls_back() {
    let Some((url, server)) = start_server(vec![("200 OK", r#"{"choices":[]}"#)]).await else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let completion = client_for(&url).complete(&[ChatMessage::user("hello")]).await;
    assert_eq!(completion, Completion::NoCandidate);
    assert_eq!(completion.into_text(), NO_VALID_RESPONSE);
    server.await.unwrap();
}

#[tokio::test]
async fn test_malformed_choice_falls_back() {
    let Some((url, server)) =
        start_server(vec![("200 OK", r#"{"id":"gen-1","choices":[{"text":"legacy"}]}"#)]).await
    else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let completion = client_for(&url).complete(&[ChatMessage::user("hello")]).await;
    assert_eq!(completion.into_text(), "No valid response from API.");
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let Some((url, server)) = start_server(vec![(
        "500 Internal Server Error",
        r#"{"error":{"message":"upstream exploded"}}"#,
    )])
    .await
    else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let completion = client_for(&url).complete(&[ChatMessage::user("hello")]).await;
    assert!(completion.is_failure());
    let text = completion.into_text();
    assert!(text.starts_with("Error: "), "got {text}");
    assert!(text.contains("500"), "got {text}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_non_json_body_is_reported() {
    let Some((url, server)) = start_server(vec![("200 OK", "<html>gateway</html>")]).await else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let completion = client_for(&url).complete(&[ChatMessage::user("hello")]).await;
    assert!(completion.into_text().starts_with("Error: "));
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_is_reported() {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(l) => l,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            eprintln!("skipping test: sandbox does not permit local TCP listeners");
            return;
        }
        Err(err) => panic!("failed to bind: {err}"),
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{addr}/api/v1/chat/completions"));
    let completion = client.complete(&[ChatMessage::user("hello")]).await;
    assert!(completion.into_text().starts_with("Error: "));
}

#[tokio::test]
async fn test_session_resends_whole_transcript() {
    let Some((url, server)) = start_server(vec![
        ("200 OK", r#"{"choices":[{"message":{"content":"first answer"}}]}"#),
        ("500 Internal Server Error", "{}"),
        ("200 OK", r#"{"choices":[{"message":{"content":"third answer"}}]}"#),
    ])
    .await
    else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let client = client_for(&url);
    let mut session = ChatSession::new();

    session.submit(&client, "question one").await;
    let after_first = session.log().snapshot().to_vec();
    session.submit(&client, "question two").await;
    let after_second = session.log().snapshot().to_vec();
    session.submit(&client, "question three").await;

    let log = session.log().snapshot();
    assert_eq!(log.len(), 6);
    assert_eq!(log[1].content, "first answer");
    assert_eq!(log[3].role, ChatRole::Assistant);
    assert!(log[3].content.starts_with("Error: "));
    assert_eq!(log[5].content, "third answer");

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 3);

    let mut expected_second = after_first.clone();
    expected_second.push(ChatMessage::user("question two"));
    assert_eq!(
        requests[1].json()["messages"],
        serde_json::to_value(&expected_second).unwrap()
    );

    let mut expected_third = after_second.clone();
    expected_third.push(ChatMessage::user("question three"));
    assert_eq!(
        requests[2].json()["messages"],
        serde_json::to_value(&expected_third).unwrap()
    );
}
