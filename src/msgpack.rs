//! The msgpack sink used to pre-encode task headers for the runtime. Specified as an
//! external collaborator (`writeMapHeader(n)`, `writeString(bytes)`); a concrete
//! implementation over the `rmp` crate ships so the Transformer has something to call.

use crate::model::TaskHeader;

/// The narrow sink surface the Transformer writes headers through. Swappable for a
/// test double that records calls instead of producing real bytes.
pub trait MsgpackSink {
    fn write_map_header(&mut self, len: u32);
    fn write_str(&mut self, bytes: &[u8]);
    fn into_bytes(self: Box<Self>) -> Vec<u8>;
}

/// Default sink: writes real msgpack via the `rmp` crate's low-level encoder
/// functions directly into a growable buffer.
#[derive(Default)]
pub struct RmpSink {
    buf: Vec<u8>,
}

impl RmpSink {
    pub fn new() -> Self {
        RmpSink { buf: Vec::new() }
    }
}

impl MsgpackSink for RmpSink {
    fn write_map_header(&mut self, len: u32) {
        // A malformed header count cannot occur here (`len` is always the header
        // vector's length), so the only failure mode `rmp` exposes is an I/O error,
        // which a `Vec<u8>` target never produces.
        rmp::encode::write_map_len(&mut self.buf, len).expect("writing to a Vec<u8> cannot fail");
    }

    fn write_str(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        rmp::encode::write_str(&mut self.buf, &text).expect("writing to a Vec<u8> cannot fail");
    }

    fn into_bytes(self: Box<Self>) -> Vec<u8> {
        self.buf
    }
}

/// Encodes declared headers as a msgpack map, emitting key then value for each
/// header in declaration order. A header missing its key or value encodes as an
/// empty string in that position — the Validator independently rejects the header
/// for the missing attribute; encoding must still complete without panicking.
pub fn encode_headers(headers: &[TaskHeader]) -> Vec<u8> {
    if headers.is_empty() {
        return Vec::new();
    }
    let mut sink: Box<dyn MsgpackSink> = Box::new(RmpSink::new());
    sink.write_map_header(headers.len() as u32);
    for header in headers {
        let key = header.key.as_ref().map(|k| k.as_bytes()).unwrap_or(&[]);
        let value = header.value.as_ref().map(|v| v.as_bytes()).unwrap_or(&[]);
        sink.write_str(key);
        sink.write_str(value);
    }
    sink.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdBytes;

    fn header(key: &str, value: &str) -> TaskHeader {
        TaskHeader {
            key: Some(IdBytes::from(key)),
            value: Some(IdBytes::from(value)),
        }
    }

    #[test]
    fn empty_headers_encode_to_empty_buffer() {
        assert!(encode_headers(&[]).is_empty());
    }

    #[test]
    fn headers_decode_back_to_the_same_pairs_in_order() {
        let headers = vec![header("retries", "3"), header("owner", "ops")];
        let encoded = encode_headers(&headers);
        assert!(!encoded.is_empty());

        let mut cursor = &encoded[..];
        let len = rmp::decode::read_map_len(&mut cursor).unwrap();
        assert_eq!(len, 2);

        let mut pairs = Vec::new();
        for _ in 0..len {
            let k = read_str(&mut cursor);
            let v = read_str(&mut cursor);
            pairs.push((k, v));
        }
        assert_eq!(
            pairs,
            vec![
                ("retries".to_string(), "3".to_string()),
                ("owner".to_string(), "ops".to_string()),
            ]
        );
    }

    #[test]
    fn header_with_missing_value_still_encodes_without_panicking() {
        let headers = vec![TaskHeader {
            key: Some(IdBytes::from("k")),
            value: None,
        }];
        let encoded = encode_headers(&headers);
        assert!(!encoded.is_empty());
    }

    fn read_str(cursor: &mut &[u8]) -> String {
        let len = rmp::decode::read_str_len(cursor).unwrap();
        let (bytes, rest) = cursor.split_at(len as usize);
        *cursor = rest;
        String::from_utf8_lossy(bytes).into_owned()
    }
}
