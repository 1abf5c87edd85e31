// SPDX-License-Identifier: MIT

use proptest::prelude::*;

use super::*;

#[test]
fn accept_key_matches_the_rfc_6455_worked_example() {
    assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
}

#[test]
fn parse_upgrade_request_extracts_the_client_key() {
    let req = b"GET /chat HTTP/1.1\r\nHost: example.com\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";
    let key = parse_upgrade_request(req).unwrap().unwrap();
    assert_eq!(key, "dGhlIHNhbXBsZSBub25jZQ==");
}

#[test]
fn parse_upgrade_request_rejects_a_plain_get() {
    let req = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
    assert!(matches!(parse_upgrade_request(req), Err(WsError::NotAnUpgrade)));
}

#[test]
fn parse_upgrade_request_returns_none_for_a_partial_header_block() {
    let req = b"GET /chat HTTP/1.1\r\nHost: example";
    assert_eq!(parse_upgrade_request(req).unwrap(), None);
}

#[test]
fn decode_then_encode_round_trips_a_masked_text_frame() {
    let payload = b"hello";
    let key = [0x12, 0x34, 0x56, 0x78];
    let mut masked = payload.to_vec();
    for (i, b) in masked.iter_mut().enumerate() {
        *b ^= key[i % 4];
    }
    let mut frame = vec![0x81u8, 0x80 | payload.len() as u8];
    frame.extend_from_slice(&key);
    frame.extend_from_slice(&masked);

    let (decoded, consumed) = decode_frame(&frame).unwrap().unwrap();
    assert_eq!(consumed, frame.len());
    assert_eq!(decoded.opcode, Opcode::Text);
    assert_eq!(decoded.payload, payload);
}

#[test]
fn decode_frame_returns_none_when_the_payload_is_incomplete() {
    let frame = [0x81u8, 0x05, b'h', b'e'];
    assert_eq!(decode_frame(&frame).unwrap(), None);
}

#[test]
fn decode_frame_rejects_fragmented_frames() {
    let frame = [0x01u8, 0x03, b'h', b'e', b'y'];
    assert!(matches!(decode_frame(&frame), Err(WsError::FragmentedFrame)));
}

#[test]
fn decode_frame_rejects_oversized_control_payloads() {
    let mut frame = vec![0x89u8, 126];
    frame.extend_from_slice(&200u16.to_be_bytes());
    frame.extend(std::iter::repeat(0u8).take(200));
    assert!(matches!(decode_frame(&frame), Err(WsError::ControlPayloadTooLarge(200))));
}

#[test]
fn encode_frame_never_sets_the_mask_bit() {
    let frame = encode_frame(Opcode::Text, b"hi");
    assert_eq!(frame[1] & 0x80, 0);
}

#[test]
fn encode_frame_uses_extended_length_for_large_payloads() {
    let payload = vec![0u8; 70_000];
    let frame = encode_frame(Opcode::Binary, &payload);
    assert_eq!(frame[1], 127);
}

fn masked_text_frame(payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    let mut masked = payload.to_vec();
    for (i, b) in masked.iter_mut().enumerate() {
        *b ^= key[i % 4];
    }
    let mut frame = vec![0x81u8, 0x80 | payload.len() as u8];
    frame.extend_from_slice(&key);
    frame.extend_from_slice(&masked);
    frame
}

proptest! {
    /// Masking is an involution under the same key: decoding a client
    /// frame masked with an arbitrary 4-byte key always recovers the
    /// original payload, for any payload small enough to use the 7-bit
    /// length encoding.
    #[test]
    fn decode_frame_unmasks_any_key_and_payload(payload in prop::collection::vec(any::<u8>(), 0..125), key in any::<[u8; 4]>()) {
        let frame = masked_text_frame(&payload, key);
        let (decoded, consumed) = decode_frame(&frame).unwrap().unwrap();
        prop_assert_eq!(consumed, frame.len());
        prop_assert_eq!(decoded.payload, payload);
        prop_assert_eq!(decoded.opcode, Opcode::Text);
    }

    /// A frame encoded by this server, then fed back through the
    /// decoder as if it were client-sent and masked, round-trips.
    #[test]
    fn encode_then_masked_decode_round_trips(payload in prop::collection::vec(any::<u8>(), 0..300), key in any::<[u8; 4]>()) {
        let server_frame = encode_frame(Opcode::Binary, &payload);
        prop_assert_eq!(server_frame[1] & 0x80, 0);

        // Re-mask the same payload as a client frame and confirm the
        // decoder's unmask path is the exact inverse regardless of
        // where the length crosses the 126/127 extended-length
        // boundary.
        let header_len = match payload.len() {
            n if n <= 125 => 2,
            _ => 4,
        };
        let mut client_frame = vec![server_frame[0], server_frame[1] | 0x80];
        client_frame.extend_from_slice(&server_frame[2..header_len]);
        client_frame.extend_from_slice(&key);
        let mut masked_payload = payload.clone();
        for (i, b) in masked_payload.iter_mut().enumerate() {
            *b ^= key[i % 4];
        }
        client_frame.extend_from_slice(&masked_payload);

        let (decoded, consumed) = decode_frame(&client_frame).unwrap().unwrap();
        prop_assert_eq!(consumed, client_frame.len());
        prop_assert_eq!(decoded.payload, payload);
    }
}
