//! Tests for the progressive preamble.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rivulet::config::ProgressiveConfig;
use rivulet::prelude::*;

use common::{drain_frames, delta_text, store, Call, Item, ScriptedProvider};

fn progressive(enabled: bool) -> ProgressiveConfig {
    ProgressiveConfig {
        enabled,
        model: "mini".to_string(),
        max_tokens: 32,
        temperature: 0.5,
    }
}

fn relay_with_preamble(
    calls: Vec<Call>,
    enabled: bool,
) -> (StreamRelay, Arc<ScriptedProvider>, SessionStore) {
    let store = store(10);
    let provider = Arc::new(ScriptedProvider::new(calls));
    let relay = StreamRelay::new(store.clone(), provider.clone(), "primary")
        .with_preamble(PreambleGenerator::new(provider.clone(), progressive(enabled)));
    (relay, provider, store)
}

#[tokio::test]
async fn preamble_precedes_primary_content_and_is_not_persisted() {
    let (relay, provider, store) = relay_with_preamble(
        vec![
            Call::Complete("One moment.".into()),
            Call::Stream(vec![Item::content("Hi"), Item::finish(FinishReason::Stop)]),
        ],
        true,
    );

    let (channel, mut rx) = ClientChannel::new();
    let request = ChatRequest::builder()
        .session_id("s1")
        .messages(vec![ChatMessage::user("long question")])
        .build();
    relay.handle(request, &channel).await;

    let frames = drain_frames(&mut rx);
    assert_eq!(delta_text(&frames), "One moment.Hi");
    assert_eq!(frames.last(), Some(&Frame::Done));

    // The preamble is never part of the persisted assistant message.
    let session = store.resolve(Some("s1"));
    assert_eq!(session.history.last().unwrap().text_content(), "Hi");

    // The secondary call used the secondary model and its own token limit.
    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen[0].model, "mini");
    assert_eq!(seen[0].settings.max_tokens, Some(32));
    assert_eq!(seen[1].model, "primary");
}

#[tokio::test]
async fn explicit_false_override_disables_an_enabled_deployment() {
    // Script contains no Complete call: reaching for one would panic.
    let (relay, _, _) = relay_with_preamble(
        vec![Call::Stream(vec![
            Item::content("Hi"),
            Item::finish(FinishReason::Stop),
        ])],
        true,
    );

    let (channel, mut rx) = ClientChannel::new();
    let request = ChatRequest::builder()
        .messages(vec![ChatMessage::user("hi")])
        .progressive_override(false)
        .build();
    relay.handle(request, &channel).await;

    assert_eq!(delta_text(&drain_frames(&mut rx)), "Hi");
}

#[tokio::test]
async fn explicit_true_override_enables_a_disabled_deployment() {
    let (relay, _, _) = relay_with_preamble(
        vec![
            Call::Complete("Working on it.".into()),
            Call::Stream(vec![Item::content("Hi"), Item::finish(FinishReason::Stop)]),
        ],
        false,
    );

    let (channel, mut rx) = ClientChannel::new();
    let request = ChatRequest::builder()
        .messages(vec![ChatMessage::user("hi")])
        .progressive_override(true)
        .build();
    relay.handle(request, &channel).await;

    assert_eq!(delta_text(&drain_frames(&mut rx)), "Working on it.Hi");
}

#[tokio::test]
async fn no_preamble_when_latest_message_is_not_from_the_user() {
    let (relay, _, _) = relay_with_preamble(
        vec![Call::Stream(vec![
            Item::content("Hi"),
            Item::finish(FinishReason::Stop),
        ])],
        true,
    );

    let (channel, mut rx) = ClientChannel::new();
    // No supplied messages: the freshly seeded history ends with the
    // instruction message.
    let request = ChatRequest::builder().build();
    relay.handle(request, &channel).await;

    assert_eq!(delta_text(&drain_frames(&mut rx)), "Hi");
}

#[tokio::test]
async fn preamble_failure_is_swallowed_and_primary_proceeds() {
    let (relay, _, _) = relay_with_preamble(
        vec![
            Call::CompleteFail("secondary model down".into()),
            Call::Stream(vec![Item::content("Hi"), Item::finish(FinishReason::Stop)]),
        ],
        true,
    );

    let (channel, mut rx) = ClientChannel::new();
    let request = ChatRequest::builder()
        .messages(vec![ChatMessage::user("hi")])
        .build();
    relay.handle(request, &channel).await;

    let frames = drain_frames(&mut rx);
    assert_eq!(delta_text(&frames), "Hi");
    assert_eq!(frames.last(), Some(&Frame::Done));
}

#[tokio::test]
async fn generator_reports_whether_a_preamble_was_emitted() {
    let provider = Arc::new(ScriptedProvider::new(vec![Call::Complete("Hold on.".into())]));
    let generator = PreambleGenerator::new(provider, progressive(true));
    let (channel, mut rx) = ClientChannel::new();

    let history = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
    assert!(generator.maybe_emit(None, &history, &channel).await);
    assert_eq!(delta_text(&drain_frames(&mut rx)), "Hold on.");

    // Disabled by override, the provider is never consulted.
    assert!(!generator.maybe_emit(Some(false), &history, &channel).await);
}
