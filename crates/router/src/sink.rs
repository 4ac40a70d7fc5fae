//! The hand-off point between the engine and the transport.
//!
//! The engine never writes to a socket. Once a request is finished the [`Context`](crate::Context)
//! pushes the buffered response into a [`ResponseSink`] exactly once, and the transport takes it
//! from there.

use bytes::Bytes;
use http::Response;
use tokio::sync::oneshot;
use tracing::warn;

/// Receives the finished response of one request.
#[cfg_attr(test, mockall::automock)]
pub trait ResponseSink: Send {
    fn send(&mut self, response: Response<Bytes>);
}

/// A [`ResponseSink`] backed by a tokio oneshot channel.
#[derive(Debug)]
pub struct OneshotSink {
    sender: Option<oneshot::Sender<Response<Bytes>>>,
}

/// Creates a sink and the receiver the transport awaits the response on.
pub fn oneshot_sink() -> (OneshotSink, oneshot::Receiver<Response<Bytes>>) {
    let (sender, receiver) = oneshot::channel();
    (OneshotSink { sender: Some(sender) }, receiver)
}

impl ResponseSink for OneshotSink {
    fn send(&mut self, response: Response<Bytes>) {
        let Some(sender) = self.sender.take() else {
            warn!("response has already been sent, dropping the new one");
            return;
        };
        if sender.send(response).is_err() {
            warn!("response receiver has been dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oneshot_sink_delivers_first_response_only() {
        let (mut sink, receiver) = oneshot_sink();

        sink.send(Response::new(Bytes::from_static(b"first")));
        sink.send(Response::new(Bytes::from_static(b"second")));

        let response = receiver.await.unwrap();
        assert_eq!(response.body(), &Bytes::from_static(b"first"));
    }
}
