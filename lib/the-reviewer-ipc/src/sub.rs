use crate::error::IpcError;
use nng::{Error, Socket};
use serde::de::DeserializeOwned;
use std::{marker::PhantomData, sync::Arc};

/// Pull side of the hand-off. Listens, so it has to be created before (or
/// independently of) any publisher.
///
/// Receiving parks a blocking thread in nng until a message arrives. Closing the
/// subscriber, explicitly or by dropping it, wakes that thread with
/// [`IpcError::Closed`].
#[derive(Debug)]
pub struct IpcSubscriber<T: DeserializeOwned> {
    socket: Arc<Socket>,
    _data_type: PhantomData<T>,
}

impl<T: DeserializeOwned + Send + Sync> IpcSubscriber<T> {
    pub fn new(url: &str) -> Result<Self, Error> {
        let socket = Arc::new(Socket::new(nng::Protocol::Pull0)?);
        socket.listen(url)?;
        Ok(Self {
            socket,
            _data_type: PhantomData,
        })
    }

    /// Wait for the next request. One that does not decode is an error for that
    /// request only, the socket stays usable.
    pub async fn recv(&self) -> Result<T, IpcError> {
        let socket = self.socket.clone();
        let message = tokio::task::spawn_blocking(move || socket.recv())
            .await?
            .map_err(|err| match err {
                Error::Closed => IpcError::Closed,
                err => IpcError::Socket(err),
            })?;
        Ok(bincode::deserialize(&message)?)
    }

    /// Stop listening. Pending and later receives fail with [`IpcError::Closed`].
    pub fn close(&self) {
        self.socket.close();
    }
}

impl<T: DeserializeOwned> Drop for IpcSubscriber<T> {
    fn drop(&mut self) {
        // The blocking receive holds a clone of the socket
        self.socket.close();
    }
}
