//! Byte tunnel for upgraded connections.

use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::proxy::buffer_pool::BufferPool;

/// Copy `reader` into `writer` until EOF, then shut the writer down.
pub async fn pipe<R, W>(mut reader: R, mut writer: W, pool: &BufferPool) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = pool.get();
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            writer.shutdown().await?;
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}

/// Copy both directions between `client` and `upstream`.
///
/// Returns once both sides reach EOF, or as soon as either direction fails;
/// the surviving direction is dropped with it.
pub async fn bridge<C, U>(client: C, upstream: U, pool: &BufferPool) -> std::io::Result<(u64, u64)>
where
    C: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    tokio::try_join!(
        pipe(client_read, upstream_write, pool),
        pipe(upstream_read, client_write, pool),
    )
}

/// Bridge the client and upstream sides of a `101 Switching Protocols`
/// exchange. `hold` is dropped when the tunnel closes.
pub fn spawn<H>(client: OnUpgrade, upstream: OnUpgrade, pool: BufferPool, routing_key: String, hold: H)
where
    H: Send + 'static,
{
    tokio::spawn(async move {
        let _hold = hold;

        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(routing_key = %routing_key, error = %e, "Upgrade failed");
                return;
            }
        };

        match bridge(TokioIo::new(client), TokioIo::new(upstream), &pool).await {
            Ok((sent, received)) => {
                tracing::debug!(routing_key = %routing_key, sent, received, "Tunnel closed");
            }
            Err(e) => {
                tracing::debug!(routing_key = %routing_key, error = %e, "Tunnel closed with error");
            }
        }
    });
}
