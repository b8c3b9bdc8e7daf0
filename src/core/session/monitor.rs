use crate::core::session::transport::{CorrelationId, DeviceFrame, Request, Transport};
use crate::domain::error::{PeriboardError, PeriboardResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

/// Background listener attached to one open transport.
///
/// The listener task exclusively owns the transport and the table of
/// in-flight requests; callers talk to it over channels. Stopping the
/// monitor aborts the task, which drops the transport handle, so the
/// link is released on every exit path including panics and early
/// returns in the caller.
pub struct Monitor {
    request_tx: mpsc::UnboundedSender<Pending>,
    connected_rx: watch::Receiver<bool>,
    listener: tokio::task::JoinHandle<()>,
}

struct Pending {
    payload: Vec<u8>,
    reply: oneshot::Sender<PeriboardResult<Vec<u8>>>,
}

impl Monitor {
    /// Take ownership of an open transport and start its listener.
    pub fn start(transport: Box<dyn Transport>) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected_rx) = watch::channel(false);
        let listener = tokio::spawn(listen(transport, request_rx, connected_tx));

        Self {
            request_tx,
            connected_rx,
            listener,
        }
    }

    /// Wait until the device has signalled the end of its handshake.
    ///
    /// Resolves immediately if the signal was already observed. Callers
    /// bound the wait with `tokio::time::timeout`.
    pub async fn connected(&self) -> PeriboardResult<()> {
        let mut connected = self.connected_rx.clone();
        connected
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| PeriboardError::Transport {
                reason: "link closed during handshake".to_string(),
            })
    }

    /// Whether the handshake has completed and the listener is alive.
    pub fn is_connected(&self) -> bool {
        !self.listener.is_finished() && *self.connected_rx.borrow()
    }

    /// Submit one request and wait for the matching response.
    ///
    /// On timeout the caller is released with `RequestTimeout` while the
    /// listener keeps running; the stale table entry is reaped when the
    /// late response arrives (or the link dies).
    pub async fn request(&self, payload: Vec<u8>, timeout: Duration) -> PeriboardResult<Vec<u8>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(Pending {
                payload,
                reply: reply_tx,
            })
            .map_err(|_| PeriboardError::Transport {
                reason: "monitor listener is not running".to_string(),
            })?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PeriboardError::Transport {
                reason: "connection dropped mid-request".to_string(),
            }),
            Err(_) => Err(PeriboardError::RequestTimeout { timeout }),
        }
    }

    /// Stop the listener and release the transport. Idempotent.
    pub fn stop(&self) {
        self.listener.abort();
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(
    mut transport: Box<dyn Transport>,
    mut request_rx: mpsc::UnboundedReceiver<Pending>,
    connected_tx: watch::Sender<bool>,
) {
    let mut pending: HashMap<CorrelationId, oneshot::Sender<PeriboardResult<Vec<u8>>>> =
        HashMap::new();
    let mut next_id: CorrelationId = 0;

    loop {
        tokio::select! {
            submitted = request_rx.recv() => {
                match submitted {
                    Some(Pending { payload, reply }) => {
                        next_id = next_id.wrapping_add(1);
                        let id = next_id;
                        debug!(id, payload = %String::from_utf8_lossy(&payload), "dispatching request");
                        match transport.send(Request { id, payload }).await {
                            Ok(()) => {
                                pending.insert(id, reply);
                            }
                            Err(e) => {
                                let _ = reply.send(Err(e));
                            }
                        }
                    }
                    // All monitor handles dropped.
                    None => break,
                }
            }
            frame = transport.recv() => {
                match frame {
                    Ok(Some(DeviceFrame::Ready)) => {
                        debug!("device handshake complete");
                        let _ = connected_tx.send(true);
                    }
                    Ok(Some(DeviceFrame::Response { id, payload })) => {
                        match pending.remove(&id) {
                            // The receiver may have timed out and gone away;
                            // the failed send reaps the entry either way.
                            Some(reply) => {
                                let _ = reply.send(Ok(payload));
                            }
                            None => {
                                debug!(id, "dropping response with unknown correlation id");
                            }
                        }
                    }
                    Ok(None) => {
                        warn!("device link closed");
                        fail_all(&mut pending, "connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "device link failed");
                        fail_all(&mut pending, &e.to_string());
                        break;
                    }
                }
            }
        }
    }

    let _ = connected_tx.send(false);
}

fn fail_all(
    pending: &mut HashMap<CorrelationId, oneshot::Sender<PeriboardResult<Vec<u8>>>>,
    reason: &str,
) {
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(PeriboardError::Transport {
            reason: reason.to_string(),
        }));
    }
}
