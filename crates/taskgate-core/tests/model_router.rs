//! Router behavior: caching, ordered fallback, timeouts, JSON handling.

use std::sync::Arc;
use std::time::Duration;

use taskgate_core::router::{
    CallOptions, MemoryResponseCache, ModelRouter, ResponseFormat, Route, RouteBinding,
    RouterError, ScriptedProvider, ScriptedReply,
};

fn router_with(providers: Vec<Arc<ScriptedProvider>>) -> ModelRouter {
    providers
        .into_iter()
        .fold(ModelRouter::builder(), |builder, p| builder.provider(p))
        .build()
}

#[tokio::test]
async fn test_identical_json_calls_hit_cache_on_second_call() {
    let openai = Arc::new(ScriptedProvider::replying("openai", r#"{"ok": true}"#));
    let router = router_with(vec![openai.clone()]);

    let options = CallOptions::new(Route::Fast, "price a lawn mowing task").system("be brief");
    let first = router.call_json(options.clone()).await.unwrap();
    assert!(!first.call.cached);
    assert_eq!(openai.calls(), 1);

    let second = router.call_json(options).await.unwrap();
    assert!(second.call.cached);
    assert_eq!(second.data, first.data);
    assert_eq!(second.call.provider, "openai");
    assert_eq!(second.call.model, "gpt-4o-mini");
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn test_no_cache_always_reaches_provider() {
    let openai = Arc::new(ScriptedProvider::replying("openai", "plain text"));
    let router = router_with(vec![openai.clone()]);

    for _ in 0..2 {
        let result = router
            .call(CallOptions::new(Route::Primary, "same prompt").no_cache())
            .await
            .unwrap();
        assert!(!result.cached);
    }
    assert_eq!(openai.calls(), 2);
}

#[tokio::test]
async fn test_primary_failure_falls_back_to_backup() {
    let openai = Arc::new(ScriptedProvider::failing("openai", "503 service unavailable"));
    let anthropic = Arc::new(ScriptedProvider::replying("anthropic", "from backup"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let result = router
        .call(CallOptions::new(Route::Primary, "rank workers"))
        .await
        .unwrap();
    assert_eq!(result.content, "from backup");
    assert_eq!(result.route, Route::Backup);
    assert_eq!(result.provider, "anthropic");
    assert_eq!(result.model, "claude-3-5-haiku-latest");
    assert_eq!(openai.calls(), 1);
    assert_eq!(anthropic.calls(), 1);
}

#[tokio::test]
async fn test_cached_fallback_answer_keeps_its_true_provenance() {
    let openai = Arc::new(
        ScriptedProvider::replying("openai", "from gpt-4o")
            .then(ScriptedReply::Fail("503 service unavailable".into())),
    );
    let anthropic = Arc::new(ScriptedProvider::replying("anthropic", "from haiku"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let options = CallOptions::new(Route::Primary, "rank workers for t-9");
    let first = router.call(options.clone()).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.route, Route::Backup);
    assert_eq!(first.model, "claude-3-5-haiku-latest");

    let second = router.call(options).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.content, "from haiku");
    assert_eq!(second.provider, "anthropic");
    assert_eq!(second.model, "claude-3-5-haiku-latest");
    assert_eq!(second.route, Route::Backup);
    assert_eq!(openai.calls(), 1);
    assert_eq!(anthropic.calls(), 1);
}

#[tokio::test]
async fn test_unconfigured_provider_is_skipped_without_a_call() {
    let anthropic = Arc::new(ScriptedProvider::unconfigured("anthropic"));
    let openai = Arc::new(ScriptedProvider::replying("openai", "from primary"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let result = router
        .call(CallOptions::new(Route::Reasoning, "assess"))
        .await
        .unwrap();
    assert_eq!(result.route, Route::Primary);
    assert_eq!(anthropic.calls(), 0);
    assert!(!router.is_route_configured(Route::Reasoning));
    assert!(router.is_route_configured(Route::Primary));
}

#[tokio::test]
async fn test_exhausted_chain_reports_every_attempt() {
    let openai = Arc::new(ScriptedProvider::failing("openai", "rate limited"));
    let anthropic = Arc::new(ScriptedProvider::failing("anthropic", "overloaded"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let err = router
        .call(CallOptions::new(Route::Fast, "hello"))
        .await
        .unwrap_err();
    match &err {
        RouterError::AllProvidersFailed {
            route, attempts, ..
        } => {
            assert_eq!(route, "fast");
            // fast -> primary -> backup
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.last_attempt(),
        Some(RouterError::ProviderError { provider, .. }) if provider == "anthropic"
    ));
    assert_eq!(openai.calls(), 2);
    assert_eq!(anthropic.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out_and_next_route_answers() {
    let openai = Arc::new(
        ScriptedProvider::replying("openai", "too late").with_delay(Duration::from_secs(30)),
    );
    let anthropic = Arc::new(ScriptedProvider::replying("anthropic", "on time"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let result = router
        .call(CallOptions::new(Route::Primary, "slow").timeout(Duration::from_millis(500)))
        .await
        .unwrap();
    assert_eq!(result.content, "on time");
    assert_eq!(result.provider, "anthropic");
}

#[tokio::test]
async fn test_explicit_chain_overrides_route_table() {
    let openai = Arc::new(ScriptedProvider::failing("openai", "down"));
    let anthropic = Arc::new(ScriptedProvider::replying("anthropic", "reasoned"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let result = router
        .call(CallOptions::new(Route::Fast, "x").fallback_chain(vec![Route::Reasoning]))
        .await
        .unwrap();
    assert_eq!(result.route, Route::Reasoning);
    assert_eq!(result.model, "claude-3-5-sonnet-latest");
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn test_fenced_json_is_extracted() {
    let openai = Arc::new(ScriptedProvider::replying(
        "openai",
        "Here you go:\n```json\n{\"price_cents\": 4200}\n```\nAnything else?",
    ));
    let router = router_with(vec![openai.clone()]);

    let result = router
        .call_json(CallOptions::new(Route::Fast, "price"))
        .await
        .unwrap();
    assert_eq!(result.data["price_cents"], 4200);

    let request = &openai.requests()[0];
    assert_eq!(request.response_format, ResponseFormat::Json);
}

#[tokio::test]
async fn test_non_json_reply_is_an_error_not_a_fallback() {
    let openai = Arc::new(ScriptedProvider::replying("openai", "I cannot help with that."));
    let router = router_with(vec![openai.clone()]);

    let err = router
        .call_json(CallOptions::new(Route::Fast, "price"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::ResponseNotJson { .. }));
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn test_queued_replies_then_default() {
    let openai = Arc::new(
        ScriptedProvider::replying("openai", "steady")
            .then(ScriptedReply::Fail("blip".into())),
    );
    let anthropic = Arc::new(ScriptedProvider::replying("anthropic", "backup"));
    let router = router_with(vec![openai.clone(), anthropic.clone()]);

    let first = router
        .call(CallOptions::new(Route::Primary, "a").no_cache())
        .await
        .unwrap();
    assert_eq!(first.content, "backup");
    let second = router
        .call(CallOptions::new(Route::Primary, "a").no_cache())
        .await
        .unwrap();
    assert_eq!(second.content, "steady");
}

#[tokio::test]
async fn test_rebinding_and_custom_cache() {
    let local = Arc::new(ScriptedProvider::replying("local", "local answer"));
    let router = ModelRouter::builder()
        .provider(local.clone())
        .bind(Route::Fast, RouteBinding::new("local", "tiny-1"))
        .fallback_chain(Route::Fast, vec![])
        .cache(Arc::new(MemoryResponseCache::new(0)))
        .build();

    for _ in 0..2 {
        let result = router.call(CallOptions::new(Route::Fast, "q")).await.unwrap();
        assert_eq!(result.model, "tiny-1");
        assert!(!result.cached);
    }
    assert_eq!(local.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_each_reach_provider() {
    let openai = Arc::new(
        ScriptedProvider::replying("openai", "{}").with_delay(Duration::from_millis(50)),
    );
    let router = router_with(vec![openai.clone()]);

    let calls = (0..4).map(|_| router.call_json(CallOptions::new(Route::Fast, "same")));
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|r| r.is_ok()));
    // No in-flight coalescing: concurrent misses are independent calls.
    assert_eq!(openai.calls(), 4);

    let after = router
        .call_json(CallOptions::new(Route::Fast, "same"))
        .await
        .unwrap();
    assert!(after.call.cached);
    assert_eq!(openai.calls(), 4);
}
