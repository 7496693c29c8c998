//! Tests for the byte stream to event pipeline.

mod common;

use futures::StreamExt;
use pretty_assertions::assert_eq;

use khoj_chat::error::KhojError;
use khoj_chat::protocol::{event_stream, FrameDecoder, DELIMITER};
use khoj_chat::types::{AssetPayload, ChatEvent, MessagePayload, TurnMetadata};

use common::{body, byte_stream, chunked};

fn transcript() -> String {
    body(&[
        r#"{"type":"status","data":"Searching notes for plans"}"#,
        r#"{"type":"start_llm_response","data":""}"#,
        "Café ",
        "plans: ship 🚀",
        r#"{"type":"end_llm_response","data":""}"#,
        r#"{"type":"metadata","data":{"turnId":"t-9"}}"#,
        r#"{"type":"end_response","data":""}"#,
    ])
}

fn expected() -> Vec<ChatEvent> {
    vec![
        ChatEvent::Status("Searching notes for plans".into()),
        ChatEvent::StartLlmResponse,
        ChatEvent::text("Café "),
        ChatEvent::text("plans: ship 🚀"),
        ChatEvent::EndLlmResponse,
        ChatEvent::Metadata(TurnMetadata {
            turn_id: Some("t-9".into()),
        }),
        ChatEvent::EndResponse,
    ]
}

async fn collect(chunks: Vec<Vec<u8>>, fail_with: Option<KhojError>) -> Vec<Result<ChatEvent, KhojError>> {
    event_stream(byte_stream(chunks, fail_with)).collect().await
}

#[tokio::test]
async fn events_are_identical_for_every_chunk_size() {
    let text = transcript();
    for size in 1..=text.len() {
        let events: Vec<ChatEvent> = collect(chunked(&text, size), None)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(events, expected(), "chunk size {size}");
    }
}

#[tokio::test]
async fn trailing_frame_without_delimiter_is_flushed() {
    let text = format!("{}tail", body(&["head"]));
    let events: Vec<ChatEvent> = collect(chunked(&text, 3), None)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(events, vec![ChatEvent::text("head"), ChatEvent::text("tail")]);
}

#[tokio::test]
async fn transport_error_is_last_item_and_drops_partial_frame() {
    let text = format!("{}partial", body(&["done"]));
    let items = collect(chunked(&text, 4), Some(KhojError::Stream("reset".into()))).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &ChatEvent::text("done"));
    assert!(matches!(items[1], Err(KhojError::Stream(_))));
}

#[tokio::test]
async fn consecutive_delimiters_yield_nothing() {
    let text = format!("{DELIMITER}{DELIMITER}");
    assert!(collect(chunked(&text, 2), None).await.is_empty());
}

#[tokio::test]
async fn image_message_is_structured() {
    let text = body(&[r#"{"type":"message","data":{"images":["https://x/a.png"]}}"#]);
    let items = collect(chunked(&text, 7), None).await;
    assert_eq!(
        items[0].as_ref().unwrap(),
        &ChatEvent::Message(MessagePayload::Structured(AssetPayload {
            images: Some(vec!["https://x/a.png".into()]),
            ..Default::default()
        }))
    );
}

#[test]
fn decoder_holds_partial_delimiter() {
    let mut decoder = FrameDecoder::new();
    let (head, tail) = DELIMITER.as_bytes().split_at(2);
    let mut first = b"abc".to_vec();
    first.extend_from_slice(head);

    assert!(decoder.push(&first).is_empty());
    assert_eq!(decoder.push(tail), vec!["abc".to_string()]);
    assert_eq!(decoder.finish(), None);
}
