//! Message sources that misbehave in controlled ways, for exercising the
//! writer and anything built on it.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, ReadBuf};

/// Hands out `data` until `fail_at` bytes have been read, then errors the
/// way a dropped client connection would.
#[derive(Debug)]
pub struct FailingSource {
    data: Vec<u8>,
    position: usize,
    fail_at: usize,
}

impl FailingSource {
    pub fn new(data: impl Into<Vec<u8>>, fail_at: usize) -> Self {
        Self {
            data: data.into(),
            position: 0,
            fail_at,
        }
    }
}

impl AsyncRead for FailingSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.position >= self.fail_at {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client aborted the transfer",
            )));
        }

        let end = self
            .fail_at
            .min(self.data.len())
            .min(self.position + buf.remaining());
        let chunk = &self.data[self.position..end];
        buf.put_slice(chunk);
        self.position = end;

        Poll::Ready(Ok(()))
    }
}

/// Hands out `data` once, then never produces anything again.
#[derive(Debug)]
pub struct StallingSource {
    data: Option<Vec<u8>>,
}

impl StallingSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }
}

impl AsyncRead for StallingSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.data.take() {
            Some(data) => {
                buf.put_slice(&data);
                Poll::Ready(Ok(()))
            }
            None => Poll::Pending,
        }
    }
}
