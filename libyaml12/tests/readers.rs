//! Byte-oriented entry points: encoding detection, cancellation and the
//! async reader.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libyaml12::{parse_reader, parse_with_options, ParseError, ParseOptions};

fn utf16le(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[test]
fn test_reader_detects_utf16() {
    let stream = parse_reader(Cursor::new(utf16le("key: välue\n")), &ParseOptions::default())
        .unwrap();
    let root = stream.documents()[0].root().unwrap();
    assert_eq!(root.get("key").and_then(|n| n.as_str()), Some("välue"));
}

#[test]
fn test_reader_utf8_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"a: 1\nb: 2\n");
    let stream = parse_reader(Cursor::new(bytes), &ParseOptions::default()).unwrap();
    let pairs = stream.documents()[0].root().and_then(|n| n.as_mapping()).unwrap();
    assert_eq!(pairs.len(), 2);
}

#[test]
fn test_reader_invalid_utf8() {
    let err = parse_reader(Cursor::new(vec![b'a', b':', b' ', 0xC3]), &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, ParseError::InvalidEncoding(..)));
}

#[test]
fn test_cancelled_parse() {
    let flag = Arc::new(AtomicBool::new(false));
    let options = ParseOptions::default().with_cancellation(flag.clone());
    assert!(parse_with_options("a: 1\n", &options).is_ok());
    flag.store(true, Ordering::Relaxed);
    assert!(matches!(
        parse_with_options("a: 1\n", &options),
        Err(ParseError::Cancelled)
    ));
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_parse_async() {
    let input: &[u8] = b"--- [1, 2]\n--- {a: b}\n";
    let stream = libyaml12::parse_async(input, &ParseOptions::default())
        .await
        .unwrap();
    assert_eq!(stream.len(), 2);
    assert_eq!(
        stream.documents()[0]
            .root()
            .and_then(|n| n.as_sequence())
            .map(|items| items.len()),
        Some(2)
    );
}

/// Endless input that raises `flag` on its first read.
#[cfg(feature = "async")]
struct EndlessReader {
    flag: Arc<AtomicBool>,
    reads: usize,
}

#[cfg(feature = "async")]
impl tokio::io::AsyncRead for EndlessReader {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        self.reads += 1;
        self.flag.store(true, Ordering::Relaxed);
        let n = buf.remaining().min(6);
        buf.put_slice(&b"- a\n- "[..n]);
        std::task::Poll::Ready(Ok(()))
    }
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_parse_async_cancelled_while_reading() {
    let flag = Arc::new(AtomicBool::new(false));
    let options = ParseOptions::default().with_cancellation(flag.clone());
    let mut reader = EndlessReader { flag, reads: 0 };
    let result = libyaml12::parse_async(&mut reader, &options).await;
    assert!(matches!(result, Err(ParseError::Cancelled)));
    assert_eq!(reader.reads, 1);
}
