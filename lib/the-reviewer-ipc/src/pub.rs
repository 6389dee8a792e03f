use crate::error::IpcError;
use nng::options::{Options, SendTimeout};
use nng::{Error, Socket};
use serde::Serialize;
use std::{marker::PhantomData, sync::Arc, time::Duration};

#[derive(Debug)]
pub struct IpcPublisher<T: Serialize> {
    socket: Arc<Socket>,
    _data_type: PhantomData<T>,
}

impl<T: Serialize + Send + Sync> IpcPublisher<T> {
    /// Dial in the background, so messages queue until a subscriber listens on `url`.
    pub fn new(url: &str) -> Result<Self, Error> {
        let socket = Arc::new(Socket::new(nng::Protocol::Push0)?);
        socket.dial_async(url)?;
        Ok(Self {
            socket,
            _data_type: PhantomData,
        })
    }

    /// Give up on [`Self::publish`] when no subscriber takes the message in time.
    pub fn set_send_timeout(&self, timeout: Duration) -> Result<(), Error> {
        self.socket.set_opt::<SendTimeout>(Some(timeout))
    }

    /// Hand `data` to a subscriber. Blocks until one takes it or the send
    /// timeout runs out.
    pub async fn publish(&self, data: T) -> Result<(), IpcError> {
        let request = bincode::serialize(&data)?;
        let socket = self.socket.clone();
        tokio::task::spawn_blocking(move || socket.send(request.as_slice()))
            .await?
            .map_err(|(_, err)| match err {
                Error::Closed => IpcError::Closed,
                err => IpcError::Socket(err),
            })
    }
}
