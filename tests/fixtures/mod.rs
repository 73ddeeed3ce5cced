#![allow(dead_code)]

//! Upload and upstream payload fixtures

use serde_json::{json, Value};

/// Bytes with a PNG signature; enough for format sniffing.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

/// Bytes with a JPEG SOI marker.
pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

/// A GIF header: a real image, but not one of the accepted upload formats.
pub fn gif_bytes() -> Vec<u8> {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

pub fn not_an_image() -> Vec<u8> {
    b"just some text, definitely not pixels".to_vec()
}

/// Chat completion whose content narrates a step before the final image.
pub fn completion_with_images() -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Working on it\n![draft](https://cdn.example.com/draft.png)\nRefining\n![final](https://cdn.example.com/final.png)"
            },
            "finish_reason": "stop"
        }]
    })
}

pub fn completion_without_image() -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "I am unable to edit this photo." },
            "finish_reason": "stop"
        }]
    })
}
