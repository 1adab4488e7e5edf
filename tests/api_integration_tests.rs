mod common;

use common::StubServer;
use dotenv::dotenv;
use recipe_muse::api_connection::endpoints::{DEFAULT_MODEL, OPENROUTER_CHAT_COMPLETIONS_URL};
use recipe_muse::api_connection::{CompletionError, CompletionGateway, CompletionService, GatewaySettings};
use recipe_muse::config::{load_api_key, DEFAULT_API_KEY_ENV_VAR};
use std::time::Duration;

fn settings(endpoint: String, api_key: &str) -> GatewaySettings {
    GatewaySettings {
        endpoint,
        model: DEFAULT_MODEL.to_string(),
        api_key: api_key.to_string(),
        site_url: "http://localhost:3000".to_string(),
        app_name: "RecipeMuseTests".to_string(),
        temperature: None,
        max_tokens: None,
        request_timeout: Duration::from_secs(10),
    }
}

async fn gateway_against(status: u16, body: &str) -> (StubServer, CompletionGateway) {
    let server = StubServer::start(status, body).await;
    let gateway = CompletionGateway::new(settings(server.url("/api/v1/chat/completions"), "sk-test")).unwrap();
    (server, gateway)
}

const OK_BODY: &str = r#"{
    "id": "gen-123",
    "model": "openai/gpt-3.5-turbo",
    "choices": [
        {"index": 0, "finish_reason": "stop", "message": {"role": "assistant", "content": "\"Smoky Catalan Escalivada\"\n"}}
    ],
    "usage": {"prompt_tokens": 80, "completion_tokens": 7, "total_tokens": 87}
}"#;

#[tokio::test]
async fn test_complete_returns_first_choice_text() {
    let (_server, gateway) = gateway_against(200, OK_BODY).await;
    let text = gateway.complete("assistant", "suggest something").await.unwrap();
    assert_eq!(text, "\"Smoky Catalan Escalivada\"");
}

#[tokio::test]
async fn test_suggest_strips_quotes_from_live_response_shape() {
    let (_server, gateway) = gateway_against(200, OK_BODY).await;
    let text = gateway.suggest("assistant", "suggest something").await.unwrap();
    assert_eq!(text, "Smoky Catalan Escalivada");
}

#[tokio::test]
async fn test_request_carries_model_roles_and_auth() {
    let (server, gateway) = gateway_against(200, OK_BODY).await;
    gateway.complete("You are a chef", "chicken soup").await.unwrap();

    let requests = server.recorded();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /api/v1/chat/completions"));
    assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
    assert_eq!(request.header("x-title"), Some("RecipeMuseTests"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], DEFAULT_MODEL);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "You are a chef");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "chicken soup");
}

#[tokio::test]
async fn test_api_error_status_is_reported() {
    let (_server, gateway) = gateway_against(500, r#"{"error": {"message": "upstream down"}}"#).await;
    let result = gateway.complete("assistant", "hello").await;
    match result {
        Err(CompletionError::ApiError { status, error_body }) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            assert!(error_body.contains("upstream down"));
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let (_server, gateway) = gateway_against(200, r#"{"id": "gen-1", "choices": []}"#).await;
    let result = gateway.complete("assistant", "hello").await;
    assert!(matches!(result, Err(CompletionError::NoChoices)), "{:?}", result);
}

#[tokio::test]
async fn test_null_content_is_an_error() {
    let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]}"#;
    let (_server, gateway) = gateway_against(200, body).await;
    let result = gateway.complete("assistant", "hello").await;
    assert!(matches!(result, Err(CompletionError::EmptyContent)), "{:?}", result);
}

#[tokio::test]
async fn test_malformed_body_is_a_serialization_error() {
    let (_server, gateway) = gateway_against(200, "this is not json").await;
    let result = gateway.complete("assistant", "hello").await;
    assert!(matches!(result, Err(CompletionError::SerializationError(_))), "{:?}", result);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
    drop(listener);

    let gateway = CompletionGateway::new(settings(endpoint, "sk-test")).unwrap();
    let result = gateway.complete("assistant", "hello").await;
    assert!(matches!(result, Err(CompletionError::NetworkError(_))), "{:?}", result);
}

#[tokio::test]
#[ignore]
async fn test_successful_live_call() {
    dotenv().ok();
    let Ok(api_key) = load_api_key(DEFAULT_API_KEY_ENV_VAR) else {
        println!("Skipping test_successful_live_call: {} not set.", DEFAULT_API_KEY_ENV_VAR);
        return;
    };

    let gateway = CompletionGateway::new(settings(OPENROUTER_CHAT_COMPLETIONS_URL.to_string(), &api_key)).unwrap();
    let result = gateway
        .complete("assistant", "What is the capital of France? Respond concisely.")
        .await;
    assert!(result.is_ok(), "API call failed: {:?}", result.err());
    assert!(result.unwrap().to_lowercase().contains("paris"));
}
