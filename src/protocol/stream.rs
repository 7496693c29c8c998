//! Byte stream to event stream adapter.

use futures::stream::{BoxStream, Stream};
use futures::StreamExt;

use super::classify::classify;
use super::frame::FrameDecoder;
use crate::error::KhojError;
use crate::types::ChatEvent;

/// Decode and classify a chunked response body.
///
/// Transport agnostic: any stream of byte chunks works, which keeps the
/// protocol testable without a server. Empty frames are dropped. A transport
/// error is yielded once and ends the stream; the trailing buffered frame is
/// only flushed when the upstream completes cleanly.
pub fn event_stream<S, B, E>(chunks: S) -> BoxStream<'static, Result<ChatEvent, KhojError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<KhojError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures::pin_mut!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let err: KhojError = err.into();
                    tracing::warn!(error = %err, buffered = decoder.buffered_len(), "Chat stream failed");
                    yield Err(err);
                    return;
                }
            };

            for frame in decoder.push(chunk) {
                let event = classify(&frame);
                if event != ChatEvent::Empty {
                    yield Ok(event);
                }
            }
        }

        if let Some(frame) = decoder.finish() {
            let event = classify(&frame);
            if event != ChatEvent::Empty {
                yield Ok(event);
            }
        }
    };

    Box::pin(stream)
}
