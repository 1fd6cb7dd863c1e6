use std::{fmt, io};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{command::CommandError, moderation::Denial};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Line a client sends to leave the room. Also the last line the server sends
/// before closing a connection.
pub const QUIT: &str = "quit";

pub const HELP: &str = "Please choose your nickname: /nick <nickname>\n\
                        Send a private message: /pm <nickname> <message>\n\
                        Complain about a user: /complaint <nickname>\n\
                        Send a delayed message: /delay <minutes> <message>\n\
                        Write quit to leave chat";

/// Everything the server writes to a client, rendered through `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Welcome,
    Help,
    Chat { nickname: String, text: String },
    Private { from: String, text: String },
    NicknameChanged { nickname: String },
    NoSuchUser { nickname: String },
    SelfMessage,
    SelfComplaint,
    ComplaintAccepted { nickname: String },
    DelayScheduled { minutes: u64 },
    Denied(Denial),
    Rejected(CommandError),
    Left { nickname: String },
    LineTooLong { max: usize },
    Quit,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome => write!(f, "Welcome to chat\n{HELP}"),
            ServerMessage::Help => f.write_str(HELP),
            ServerMessage::Chat { nickname, text } => write!(f, "{nickname}: {text}"),
            ServerMessage::Private { from, text } => {
                write!(f, "private message from {from}: {text}")
            }
            ServerMessage::NicknameChanged { nickname } => {
                write!(f, "Nickname changed to {nickname}")
            }
            ServerMessage::NoSuchUser { nickname } => {
                write!(f, "No user with nickname: {nickname}")
            }
            ServerMessage::SelfMessage => f.write_str("Can't send message to yourself"),
            ServerMessage::SelfComplaint => f.write_str("Can't complain about yourself"),
            ServerMessage::ComplaintAccepted { nickname } => {
                write!(f, "Complaint against {nickname} accepted")
            }
            ServerMessage::DelayScheduled { minutes: 1 } => {
                f.write_str("Message scheduled in 1 minute")
            }
            ServerMessage::DelayScheduled { minutes } => {
                write!(f, "Message scheduled in {minutes} minutes")
            }
            ServerMessage::Denied(denial) => write!(f, "{denial}"),
            ServerMessage::Rejected(err) => write!(f, "{err}"),
            ServerMessage::Left { nickname } => write!(f, "{nickname} has left!"),
            ServerMessage::LineTooLong { max } => {
                write!(f, "Line too long, the limit is {max} bytes")
            }
            ServerMessage::Quit => f.write_str(QUIT),
        }
    }
}

/// One unit of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Line(String),
    /// A line over the length limit. Its bytes have been discarded.
    TooLong,
}

/// Reads the next non-empty line, without its line ending.
///
/// At most `max_len` bytes, line ending included, are buffered for one line.
/// Anything longer is skipped up to the next newline and reported as
/// [`Incoming::TooLong`]. Returns `Ok(None)` at end of stream. Bytes that are
/// not UTF-8 surface as an `InvalidData` error.
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> io::Result<Option<Incoming>>
where
    R: AsyncBufRead + Unpin,
{
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let bytes = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
        if bytes == 0 {
            return Ok(None);
        }

        if buf.len() >= max_len && !buf.ends_with(b"\n") {
            skip_line(reader).await?;
            return Ok(Some(Incoming::TooLong));
        }

        let line = std::str::from_utf8(&buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let trimmed = line.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }

        return Ok(Some(Incoming::Line(trimmed.to_string())));
    }
}

/// Consumes input up to and including the next newline.
async fn skip_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        let len = available.len();
        let newline = available.iter().position(|&byte| byte == b'\n');
        match newline {
            Some(at) => {
                reader.consume(at + 1);
                return Ok(());
            }
            None => reader.consume(len),
        }
    }
}

pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = Vec::with_capacity(line.len() + 1);
    encoded.extend_from_slice(line.as_bytes());
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 64;

    fn line(text: &str) -> Incoming {
        Incoming::Line(text.to_string())
    }

    #[tokio::test]
    async fn oversized_line_is_skipped_without_buffering_it() {
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        // A small read buffer makes the skip span many fills.
        let mut reader = tokio::io::BufReader::with_capacity(16, reader);

        let writes = tokio::spawn(async move {
            writer.write_all(b"before\n").await.expect("write");
            writer
                .write_all(&vec![b'x'; 4 * 1024 * 1024])
                .await
                .expect("write");
            writer.write_all(b"\nafter\n").await.expect("write");
        });

        assert_eq!(
            read_line(&mut reader, LIMIT).await.unwrap(),
            Some(line("before"))
        );
        assert_eq!(
            read_line(&mut reader, LIMIT).await.unwrap(),
            Some(Incoming::TooLong)
        );
        assert_eq!(
            read_line(&mut reader, LIMIT).await.unwrap(),
            Some(line("after"))
        );
        writes.await.expect("writer task");
        assert_eq!(read_line(&mut reader, LIMIT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        let fits = "y".repeat(LIMIT - 1);
        let over = "z".repeat(LIMIT);
        writer
            .write_all(format!("{fits}\n{over}\nok\n").as_bytes())
            .await
            .expect("write");
        drop(writer);

        assert_eq!(read_line(&mut reader, LIMIT).await.unwrap(), Some(line(&fits)));
        assert_eq!(
            read_line(&mut reader, LIMIT).await.unwrap(),
            Some(Incoming::TooLong)
        );
        assert_eq!(read_line(&mut reader, LIMIT).await.unwrap(), Some(line("ok")));
    }

    #[tokio::test]
    async fn lines_are_stripped_and_blank_lines_skipped() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        writer
            .write_all(b"hello\r\n\n\r\n/nick bob\n")
            .await
            .expect("write");
        drop(writer);

        assert_eq!(
            read_line(&mut reader, LIMIT).await.unwrap(),
            Some(line("hello"))
        );
        assert_eq!(
            read_line(&mut reader, LIMIT).await.unwrap(),
            Some(line("/nick bob"))
        );
        assert_eq!(read_line(&mut reader, LIMIT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_error() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        writer.write_all(&[0xff, 0xfe, b'\n']).await.expect("write");
        drop(writer);

        let err = read_line(&mut reader, LIMIT).await.expect_err("invalid data");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn written_lines_are_newline_terminated() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        let message = ServerMessage::Chat {
            nickname: "alice".into(),
            text: "hello".into(),
        };
        write_line(&mut writer, &message.to_string())
            .await
            .expect("write message");

        let mut raw = String::new();
        reader.read_line(&mut raw).await.expect("read");
        assert_eq!(raw, "alice: hello\n");
    }

    #[test]
    fn notices_render_as_documented() {
        assert_eq!(
            ServerMessage::NicknameChanged {
                nickname: "alice".into()
            }
            .to_string(),
            "Nickname changed to alice"
        );
        assert_eq!(
            ServerMessage::NoSuchUser {
                nickname: "bob".into()
            }
            .to_string(),
            "No user with nickname: bob"
        );
        assert_eq!(
            ServerMessage::Left {
                nickname: "carol".into()
            }
            .to_string(),
            "carol has left!"
        );
        assert_eq!(
            ServerMessage::Rejected(CommandError::Unknown).to_string(),
            "Invalid Command"
        );
        assert_eq!(
            ServerMessage::DelayScheduled { minutes: 5 }.to_string(),
            "Message scheduled in 5 minutes"
        );
        assert_eq!(
            ServerMessage::LineTooLong { max: 8192 }.to_string(),
            "Line too long, the limit is 8192 bytes"
        );
        assert_eq!(ServerMessage::Quit.to_string(), "quit");
        assert!(ServerMessage::Welcome.to_string().starts_with("Welcome to chat\n"));
    }
}
