//! WebQuery client against a mock TeamSpeak server.

use serde_json::json;
use tsbot::teamspeak::{TeamSpeakError, UserList, WebQueryClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "BAByFoiEXZfnSJyE6dbXFiW_nn_SKfmFH1Y8V1j";

fn voice(nick: &str, away: &str, muted: &str) -> serde_json::Value {
    json!({
        "cid": "1",
        "clid": "2",
        "client_database_id": "3",
        "client_nickname": nick,
        "client_type": "0",
        "client_away": away,
        "client_away_message": "",
        "client_output_muted": muted,
    })
}

async fn server_with(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/clientlist"))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_fetch_user_list() {
    let server = server_with(
        200,
        json!({
            "body": [
                voice("zed", "0", "0"),
                voice("Anna", "0", "0"),
                voice("mike", "1", "0"),
                voice("Bea", "0", "1"),
                {"client_nickname": "serveradmin from 127.0.0.1:51234", "client_type": "1",
                 "client_away": "0", "client_output_muted": "0"}
            ],
            "status": {"code": 0, "message": "ok"}
        }),
    )
    .await;

    let client = WebQueryClient::new(&server.uri(), API_KEY, 1).unwrap();
    let list = client.fetch_user_list().await.unwrap();

    assert_eq!(
        list,
        UserList {
            active: vec!["Anna".to_string(), "zed".to_string()],
            away: vec!["Bea".to_string(), "mike".to_string()],
        }
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), Some("-voice%20-away"));
}

#[tokio::test]
async fn test_empty_result_set_is_empty_list() {
    let server = server_with(
        200,
        json!({"status": {"code": 1281, "message": "database empty result set"}}),
    )
    .await;

    let client = WebQueryClient::new(&server.uri(), API_KEY, 1).unwrap();
    let list = client.fetch_user_list().await.unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_query_error_status() {
    let server = server_with(
        200,
        json!({"status": {"code": 1024, "message": "invalid serverID"}}),
    )
    .await;

    let client = WebQueryClient::new(&server.uri(), API_KEY, 1).unwrap();
    let err = client.fetch_user_list().await.unwrap_err();
    assert!(matches!(err, TeamSpeakError::Query { code: 1024, .. }));
    assert!(err.to_string().contains("invalid serverID"));
}

#[tokio::test]
async fn test_wrong_api_key() {
    // Requests without the expected key fall through to wiremock's 404
    let server = server_with(200, json!({"body": [], "status": {"code": 0, "message": "ok"}})).await;

    let client = WebQueryClient::new(&server.uri(), "wrong-key", 1).unwrap();
    let err = client.fetch_user_list().await.unwrap_err();
    assert!(matches!(err, TeamSpeakError::Status(404, _)));
}

#[tokio::test]
async fn test_error_status_with_query_body() {
    let server = server_with(
        403,
        json!({"status": {"code": 5122, "message": "invalid apikey"}}),
    )
    .await;

    let client = WebQueryClient::new(&server.uri(), API_KEY, 1).unwrap();
    let err = client.fetch_user_list().await.unwrap_err();
    assert!(matches!(err, TeamSpeakError::Query { code: 5122, .. }));
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/clientlist"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let client = WebQueryClient::new(&server.uri(), API_KEY, 1).unwrap();
    let err = client.fetch_user_list().await.unwrap_err();
    assert!(matches!(err, TeamSpeakError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_server() {
    // Nothing listens on port 1
    let client = WebQueryClient::new("http://127.0.0.1:1", API_KEY, 1).unwrap();
    let err = client.fetch_user_list().await.unwrap_err();
    assert!(matches!(err, TeamSpeakError::Http(_)));
}
