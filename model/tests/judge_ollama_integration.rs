use model::{Judge, JudgeConfig, ModelError, ModelProvider, OllamaConfig, OllamaProvider};
use mockito::Matcher;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const MODEL: &str = "llama3.1:8b";

#[derive(Debug, Deserialize)]
struct Completion {
    score: f64,
}

fn reply(content: &str) -> String {
    json!({
        "model": MODEL,
        "message": {"role": "assistant", "content": content},
        "done": true,
        "prompt_eval_count": 42,
        "eval_count": 7
    })
    .to_string()
}

fn make_judge(base_url: String) -> Judge {
    let provider = OllamaProvider::new(
        OllamaConfig::default()
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    Judge::new(Arc::new(provider), JudgeConfig::new(MODEL))
}

#[tokio::test]
async fn test_judge_requests_json_format() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "model": MODEL,
            "stream": false,
            "format": "json",
            "options": {"temperature": 0.0}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply(r#"{"task": "t", "outcome": "o", "score": 0.8}"#))
        .create_async()
        .await;

    let judge = make_judge(server.url());
    let completion: Completion = judge.ask_json("Grade this answer.").await.unwrap();

    assert_eq!(completion.score, 0.8);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_model_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error": "model 'llama3.1:8b' not found"}"#)
        .create_async()
        .await;

    let judge = make_judge(server.url());
    let result = judge.ask_json::<Completion>("Grade this answer.").await;

    match result {
        Err(ModelError::ModelNotFound { model }) => assert_eq!(model, MODEL),
        other => panic!("expected ModelNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_reply_is_invalid() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(reply(""))
        .create_async()
        .await;

    let judge = make_judge(server.url());
    let result = judge.ask_json::<Completion>("Grade this answer.").await;
    assert!(matches!(result, Err(ModelError::InvalidResponse { .. })));
}

#[tokio::test]
#[ignore]
async fn test_live_health_check() {
    let provider = OllamaProvider::new(OllamaConfig::default()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(30), provider.health_check()).await;
    assert!(result.expect("health_check timed out").is_ok());
}
