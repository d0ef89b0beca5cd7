// announcer-core/src/grpc.rs

//! Plumbing shared by the manager and trainer gRPC clients.
//!
//! Both services are driven through a client-streaming call whose request
//! messages are fed through a bounded queue while the generated client runs
//! the call on its own task.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Endpoint;
use tonic::{Response, Status};

/// Builds an endpoint for a `host:port` address.
pub(crate) fn endpoint(
    addr: &str,
    connect_timeout: Duration,
) -> Result<Endpoint, tonic::transport::Error> {
    Ok(Endpoint::from_shared(format!("http://{addr}"))?.connect_timeout(connect_timeout))
}

/// An open client-streaming call.
///
/// Messages passed to [`StreamingCall::send`] are queued and written by the
/// call task in order. Dropping an unfinished call aborts it.
pub(crate) struct StreamingCall<Req, Resp> {
    sender: Option<mpsc::Sender<Req>>,
    call: Option<JoinHandle<Result<Response<Resp>, Status>>>,
}

impl<Req, Resp> StreamingCall<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// Starts `call` on its own task, feeding it a stream of the messages
    /// later passed to [`StreamingCall::send`].
    pub(crate) fn spawn<F, Fut>(capacity: usize, call: F) -> Self
    where
        F: FnOnce(ReceiverStream<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity);
        let call = tokio::spawn(call(ReceiverStream::new(receiver)));

        Self {
            sender: Some(sender),
            call: Some(call),
        }
    }

    /// Queues one request message.
    ///
    /// If the call already ended, its final status is returned instead.
    pub(crate) async fn send(&mut self, message: Req) -> Result<(), Status> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Status::failed_precondition("request stream already closed"))?;

        if sender.send(message).await.is_ok() {
            return Ok(());
        }

        // The call task dropped the receiver, so the call is over.
        self.sender = None;
        match self.join().await {
            Ok(_) => Err(Status::aborted(
                "server ended the call before the request stream closed",
            )),
            Err(status) => Err(status),
        }
    }

    /// Resolves once the call stopped taking requests, which means it
    /// finished or failed.
    pub(crate) async fn closed(&self) {
        match &self.sender {
            Some(sender) => sender.closed().await,
            None => std::future::pending().await,
        }
    }

    /// Half-closes the request stream and waits for the response.
    pub(crate) async fn close_and_recv(mut self) -> Result<Resp, Status> {
        self.sender = None;
        self.join().await
    }

    async fn join(&mut self) -> Result<Resp, Status> {
        let call = self
            .call
            .take()
            .ok_or_else(|| Status::failed_precondition("call already finished"))?;

        match call.await {
            Ok(response) => response.map(Response::into_inner),
            Err(e) => Err(Status::internal(format!("call task failed: {e}"))),
        }
    }
}

impl<Req, Resp> Drop for StreamingCall<Req, Resp> {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            call.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn test_invalid_address() {
        let result = endpoint("not a uri", Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_messages_reach_the_call_in_order() {
        let mut call = StreamingCall::spawn(1, |requests: ReceiverStream<u32>| async move {
            let received: Vec<u32> = requests.collect().await;
            Ok(Response::new(received))
        });

        for n in 0..5 {
            call.send(n).await.unwrap();
        }
        assert_eq!(call.close_and_recv().await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_send_after_call_failed_returns_its_status() {
        let mut call = StreamingCall::<u32, ()>::spawn(1, |_requests| async move {
            Err(Status::permission_denied("cluster is frozen"))
        });

        // The first send may still land in the queue before the task runs.
        let mut result = Ok(());
        for n in 0..3 {
            result = call.send(n).await;
            if result.is_err() {
                break;
            }
        }
        let status = result.unwrap_err();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
        assert_eq!(status.message(), "cluster is frozen");
    }

    #[tokio::test]
    async fn test_dropping_unfinished_call_aborts_it() {
        let (alive, ended) = tokio::sync::oneshot::channel::<()>();
        let call = StreamingCall::<u32, ()>::spawn(1, move |requests| async move {
            let _alive = alive;
            let _ = requests.collect::<Vec<_>>().await;
            Ok(Response::new(()))
        });

        // Keep a sender so the request stream never ends on its own.
        let sender = call.sender.clone();
        drop(call);

        // The aborted task drops the oneshot sender without sending.
        let result = tokio::time::timeout(Duration::from_secs(5), ended).await;
        assert!(result.unwrap().is_err());
        drop(sender);
    }
}
