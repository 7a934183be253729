//! Newline framing shared by client and server.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Write `line` followed by `\n` and flush.
pub(crate) async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    check_single_line(line)?;
    let mut framed = String::with_capacity(line.len() + 1);
    framed.push_str(line);
    framed.push('\n');
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one line, without its terminator.
///
/// `\r\n` is accepted as a terminator. A final line cut off by EOF is
/// returned as is; EOF before any byte is [`Error::ConnectionClosed`].
pub(crate) async fn read_line<R>(reader: &mut R, max_len: usize) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    // Room for the content plus a `\r\n` terminator.
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX).saturating_add(2);
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(Error::ConnectionClosed);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > max_len {
        return Err(Error::LineTooLong { max: max_len });
    }

    String::from_utf8(buf).map_err(|_| Error::InvalidMessage("line is not UTF-8".into()))
}

/// Reject text that would not survive newline framing.
pub(crate) fn check_single_line(line: &str) -> Result<()> {
    if line.contains(['\n', '\r']) {
        return Err(Error::InvalidMessage("message contains a line break".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_lines_with_either_terminator() {
        let mut reader = BufReader::new(&b"OFFER:a\r\nICE:b\nrest"[..]);
        assert_eq!(read_line(&mut reader, 64).await.unwrap(), "OFFER:a");
        assert_eq!(read_line(&mut reader, 64).await.unwrap(), "ICE:b");
        assert_eq!(read_line(&mut reader, 64).await.unwrap(), "rest");
        assert!(matches!(read_line(&mut reader, 64).await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn enforces_length_limit() {
        let mut exact = BufReader::new(&b"12345\n"[..]);
        assert_eq!(read_line(&mut exact, 5).await.unwrap(), "12345");

        let mut long = BufReader::new(&b"123456\n"[..]);
        assert!(matches!(
            read_line(&mut long, 5).await,
            Err(Error::LineTooLong { max: 5 })
        ));

        let mut unterminated = BufReader::new(&b"1234567"[..]);
        assert!(matches!(
            read_line(&mut unterminated, 5).await,
            Err(Error::LineTooLong { max: 5 })
        ));
    }

    #[tokio::test]
    async fn crlf_does_not_count_toward_limit() {
        let mut exact = BufReader::new(&b"12345\r\nnext\n"[..]);
        assert_eq!(read_line(&mut exact, 5).await.unwrap(), "12345");
        assert_eq!(read_line(&mut exact, 5).await.unwrap(), "next");

        let mut long = BufReader::new(&b"123456\r\n"[..]);
        assert!(matches!(
            read_line(&mut long, 5).await,
            Err(Error::LineTooLong { max: 5 })
        ));
    }

    #[tokio::test]
    async fn write_appends_newline() {
        let mut out = Vec::new();
        write_line(&mut out, "ANSWER:xyz").await.unwrap();
        assert_eq!(out, b"ANSWER:xyz\n");
    }

    #[tokio::test]
    async fn write_rejects_embedded_newlines() {
        let mut out = Vec::new();
        assert!(matches!(
            write_line(&mut out, "OFFER:v=0\r\no=-").await,
            Err(Error::InvalidMessage(_))
        ));
        assert!(out.is_empty());
    }
}
