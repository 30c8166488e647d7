//! Live provider connectivity. Run with `--features api` and keys in `.env`.

use strictly_gateway::{
    build_provider, BreakerSettings, FallbackHint, GenerationGateway, Prompt, ProviderConfig,
    ProviderKind, RetryPolicy, SessionMode,
};
use tracing::instrument;
use tracing_subscriber::EnvFilter;

fn hello() -> Prompt {
    Prompt::new(
        "You are a helpful assistant.",
        "Say 'Hello, world!' and nothing else.",
        FallbackHint::default(),
    )
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_connectivity() {
    dotenvy::dotenv().ok();

    let config = ProviderConfig::new("claude", ProviderKind::Anthropic)
        .with_model("claude-3-5-haiku-20241022")
        .with_max_tokens(50);
    let provider = build_provider(&config).expect("ANTHROPIC_API_KEY not set");

    let response = provider.generate(&hello()).await.expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_connectivity() {
    dotenvy::dotenv().ok();

    let config = ProviderConfig::new("gpt", ProviderKind::OpenAi).with_max_tokens(50);
    let provider = build_provider(&config).expect("OPENAI_API_KEY not set");

    let response = provider.generate(&hello()).await.expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_realtime_session_answers_twice() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
    dotenvy::dotenv().ok();

    let config = ProviderConfig::new("live", ProviderKind::Realtime)
        .with_model("gpt-4o-realtime-preview")
        .with_max_tokens(50);
    let gateway = GenerationGateway::from_configs(
        &[config],
        RetryPolicy::default(),
        BreakerSettings::default(),
    )
    .expect("Failed to build gateway");
    assert_eq!(gateway.provider_names(), vec!["live"], "OPENAI_API_KEY not set");

    for _ in 0..2 {
        let response = gateway
            .generate(&hello(), SessionMode::Streaming)
            .await
            .expect("Failed to generate");
        assert!(!response.is_empty());
        eprintln!("Response: {}", response);
    }
}
