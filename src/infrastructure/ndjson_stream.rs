// Chunked NDJSON streaming utilities
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Create a chunked NDJSON streaming response, one JSON document per line
pub fn ndjson_stream<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let byte_stream = stream.map(|msg| serialize_line(&msg));
    let body = Body::from_stream(byte_stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single message to a newline-terminated chunk
fn serialize_line<T: Serialize>(msg: &T) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(msg).map_err(std::io::Error::other)?;

    let mut chunk = BytesMut::with_capacity(json.len() + 1);
    chunk.put_slice(&json);
    chunk.put_u8(b'\n');

    Ok(chunk.freeze())
}

/// Runs the wrapped callback once, when dropped.
struct OnClose<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for OnClose<F> {
    fn drop(&mut self) {
        if let Some(on_close) = self.0.take() {
            on_close();
        }
    }
}

/// Helper to create a streaming response from a receiver. `on_close` runs when
/// the stream ends or the client goes away.
pub fn stream_from_receiver<T, F>(mut rx: mpsc::Receiver<T>, on_close: F) -> impl IntoResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    let guard = OnClose(Some(on_close));
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(msg) = rx.recv().await {
            yield msg;
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_line_is_newline_terminated_json() {
        let line = serialize_line(&json!({"command": "destroy", "column": "mc"})).unwrap();
        assert_eq!(&line[..], b"{\"column\":\"mc\",\"command\":\"destroy\"}\n");
    }

    #[tokio::test]
    async fn test_receiver_streams_until_closed() {
        let closed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(8);
        tx.send(json!({"n": 1})).await.unwrap();
        tx.send(json!({"n": 2})).await.unwrap();
        drop(tx);

        let flag = closed.clone();
        let response = stream_from_receiver(rx, move || flag.store(true, Ordering::SeqCst))
            .into_response();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            NDJSON_CONTENT_TYPE
        );
        assert!(!closed.load(Ordering::SeqCst));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"n\":1}\n{\"n\":2}\n");
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dropped_response_runs_on_close() {
        let closed = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = mpsc::channel::<Value>(8);

        let flag = closed.clone();
        let response = stream_from_receiver(rx, move || flag.store(true, Ordering::SeqCst))
            .into_response();
        drop(response);
        assert!(closed.load(Ordering::SeqCst));
    }
}
