//! Scripted transport shared by the unit tests.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use super::*;
use crate::gateway::{InboundResponse, OutboundRequest, Transport, TransportFuture};

/// One queued response, optionally held back until its gate is released.
struct Reply {
  /// HTTP status to answer with
  status: u16,
  /// Raw body to answer with
  body:   String,
  /// Held until its sender fires or is dropped
  gate:   Option<oneshot::Receiver<()>>,
}

/// Records every request and answers from a queue, in call order.
#[derive(Default)]
pub(crate) struct MockTransport {
  /// Every request seen so far
  requests: Mutex<Vec<OutboundRequest>>,
  /// Replies still to hand out
  script:   Mutex<VecDeque<Reply>>,
}

impl MockTransport {
  /// An empty mock, shared so a gateway and the test can both hold it.
  pub(crate) fn new() -> Arc<Self> { Arc::new(Self::default()) }

  /// Queues a JSON reply.
  pub(crate) fn reply(&self, status: u16, body: Value) { self.reply_raw(status, &body.to_string()) }

  /// Queues a reply with a verbatim body.
  pub(crate) fn reply_raw(&self, status: u16, body: &str) {
    self.script.lock().unwrap().push_back(Reply { status, body: body.to_string(), gate: None });
  }

  /// Queues a reply that is only delivered once the returned sender fires (or is dropped).
  pub(crate) fn reply_gated(&self, status: u16, body: Value) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    self.script.lock().unwrap().push_back(Reply { status, body: body.to_string(), gate: Some(rx) });
    tx
  }

  /// The requests received, in order.
  pub(crate) fn requests(&self) -> Vec<OutboundRequest> { self.requests.lock().unwrap().clone() }
}

impl Transport for MockTransport {
  fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
    self.requests.lock().unwrap().push(request);
    let reply = self.script.lock().unwrap().pop_front();
    Box::pin(async move {
      let reply = reply.expect("no scripted reply left");
      if let Some(gate) = reply.gate {
        let _ = gate.await;
      }
      Ok(InboundResponse { status: reply.status, body: reply.body })
    })
  }
}

/// A gateway on the default local endpoint backed by `mock`.
pub(crate) fn gateway_with(mock: &Arc<MockTransport>, session: SessionStore) -> Gateway {
  let config = Config::new(Url::parse(config::DEFAULT_API_URL).unwrap());
  Gateway::with_transport(&config, session, mock.clone())
}
