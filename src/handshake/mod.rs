mod c0c1;
mod s0s1s2;
mod state;

pub use c0c1::*;
pub use s0s1s2::*;
pub use state::*;

use crate::{Error, Result};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Run the server side of the handshake on a freshly accepted connection.
/// Blocks until C0/C1/C2 have been exchanged or fails; no chunk data is
/// valid before this returns.
pub async fn serve<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = HandshakeState::new();

    let mut c0c1_buf = vec![0u8; 1 + HANDSHAKE_SIZE];
    reader
        .read_exact(&mut c0c1_buf)
        .await
        .map_err(|e| Error::handshake(format!("Short read on C0+C1: {}", e)))?;
    let c0c1 = C0C1::parse(&c0c1_buf)?;

    let response = S0S1S2::generate(&c0c1);
    writer
        .write_all(&response.encode())
        .await
        .map_err(|e| Error::handshake(format!("Failed to write S0+S1+S2: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::handshake(format!("Failed to flush S0+S1+S2: {}", e)))?;
    state.transition(HandshakeEvent::ReceivedC0C1)?;

    // C2 must arrive in full; its content is only checked informally
    let mut c2_buf = vec![0u8; HANDSHAKE_SIZE];
    reader
        .read_exact(&mut c2_buf)
        .await
        .map_err(|e| Error::handshake(format!("Short read on C2: {}", e)))?;
    if c2_buf[8..] != response.s1_random[..] {
        debug!("C2 random echo does not match S1 (ignored)");
    }
    state.transition(HandshakeEvent::ReceivedC2)?;

    debug!("Handshake complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serve_completes_against_well_behaved_client() {
        let (mut client, server) = tokio::io::duplex(8192);

        let server_task = tokio::spawn(async move {
            let (mut read_half, mut write_half) = tokio::io::split(server);
            serve(&mut read_half, &mut write_half).await
        });

        // Client: C0+C1
        let c0c1 = C0C1::create_client();
        client.write_all(&c0c1.encode()).await.unwrap();

        // Client: read S0+S1+S2
        let mut response = vec![0u8; 1 + HANDSHAKE_SIZE * 2];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(response[0], RTMP_VERSION);

        // S2 echoes C1's timestamp and random payload
        let s2 = &response[1 + HANDSHAKE_SIZE..];
        assert_eq!(&s2[0..4], &c0c1.timestamp.to_be_bytes());
        assert_eq!(&s2[8..], &c0c1.random_data[..]);

        // Client: C2 echoes S1
        client
            .write_all(&response[1..1 + HANDSHAKE_SIZE])
            .await
            .unwrap();

        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_short_c1_is_handshake_incomplete() {
        let (mut client, server) = tokio::io::duplex(8192);

        let server_task = tokio::spawn(async move {
            let (mut read_half, mut write_half) = tokio::io::split(server);
            serve(&mut read_half, &mut write_half).await
        });

        client.write_all(&[3u8; 100]).await.unwrap();
        drop(client);

        match server_task.await.unwrap() {
            Err(Error::HandshakeIncomplete(_)) => {}
            other => panic!("Expected HandshakeIncomplete, got {:?}", other),
        }
    }
}
