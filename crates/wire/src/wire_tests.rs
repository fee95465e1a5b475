// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Ping {
    n: u32,
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&Ping { n: 1 }).expect("encode failed");
    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'));
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";
    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_big_endian_length_prefix() {
    let data = b"test data";
    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");
    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_request_decodes_typed_payload() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Ping { n: 42 }).await.unwrap();
    let mut cursor = std::io::Cursor::new(buffer);
    let decoded: Ping = read_request(&mut cursor).await.unwrap();
    assert_eq!(decoded, Ping { n: 42 });
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&(MAX_MESSAGE_BYTES + 1).to_be_bytes());
    let mut cursor = std::io::Cursor::new(buffer);
    assert!(matches!(read_message(&mut cursor).await, Err(ProtocolError::MessageTooLarge(_))));
}
