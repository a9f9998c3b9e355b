//! RLP decoding.
//!
//! `RLP.decodeString` and `RLP.decodeList` both abort the transaction on
//! malformed input, non-canonical encodings, and trailing data.

use crate::errors::{EvalResult, RuntimeError};

enum ItemKind {
    String,
    List,
}

struct Item {
    kind: ItemKind,
    /// Payload byte range within the input.
    payload_start: usize,
    payload_len: usize,
    /// Total encoded length including the header.
    encoded_len: usize,
}

fn error(message: impl Into<String>) -> RuntimeError {
    RuntimeError::RlpDecode(message.into())
}

/// Parse the single item starting at `offset`.
fn parse_item(input: &[u8], offset: usize) -> EvalResult<Item> {
    let Some(&prefix) = input.get(offset) else {
        return Err(error("unexpected end of input"));
    };
    let after_prefix = offset + 1;
    match prefix {
        // Single byte: its own encoding.
        0x00..=0x7f => Ok(Item {
            kind: ItemKind::String,
            payload_start: offset,
            payload_len: 1,
            encoded_len: 1,
        }),
        // Short string.
        0x80..=0xb7 => {
            let len = (prefix - 0x80) as usize;
            check_available(input, after_prefix, len)?;
            if len == 1 && input[after_prefix] < 0x80 {
                return Err(error("non-canonical single byte encoding"));
            }
            Ok(Item {
                kind: ItemKind::String,
                payload_start: after_prefix,
                payload_len: len,
                encoded_len: 1 + len,
            })
        }
        // Long string.
        0xb8..=0xbf => {
            let (len, header) = parse_long_length(input, after_prefix, prefix - 0xb7)?;
            Ok(Item {
                kind: ItemKind::String,
                payload_start: after_prefix + header,
                payload_len: len,
                encoded_len: 1 + header + len,
            })
        }
        // Short list.
        0xc0..=0xf7 => {
            let len = (prefix - 0xc0) as usize;
            check_available(input, after_prefix, len)?;
            Ok(Item {
                kind: ItemKind::List,
                payload_start: after_prefix,
                payload_len: len,
                encoded_len: 1 + len,
            })
        }
        // Long list.
        0xf8..=0xff => {
            let (len, header) = parse_long_length(input, after_prefix, prefix - 0xf7)?;
            Ok(Item {
                kind: ItemKind::List,
                payload_start: after_prefix + header,
                payload_len: len,
                encoded_len: 1 + header + len,
            })
        }
    }
}

/// Parse a multi-byte big-endian length of `len_of_len` bytes.
fn parse_long_length(input: &[u8], offset: usize, len_of_len: u8) -> EvalResult<(usize, usize)> {
    let len_of_len = len_of_len as usize;
    check_available(input, offset, len_of_len)?;
    let bytes = &input[offset..offset + len_of_len];
    if bytes.first() == Some(&0) {
        return Err(error("length has leading zero bytes"));
    }
    let mut len: usize = 0;
    for &byte in bytes {
        len = len
            .checked_mul(256)
            .and_then(|l| l.checked_add(byte as usize))
            .ok_or_else(|| error("length overflows"))?;
    }
    if len <= 55 {
        return Err(error("non-canonical long-form length"));
    }
    check_available(input, offset + len_of_len, len)?;
    Ok((len, len_of_len))
}

fn check_available(input: &[u8], offset: usize, len: usize) -> EvalResult<()> {
    if offset + len > input.len() {
        return Err(error("input too short"));
    }
    Ok(())
}

/// Decode a single RLP-encoded string. Trailing data aborts.
pub fn decode_string(input: &[u8]) -> EvalResult<Vec<u8>> {
    let item = parse_item(input, 0)?;
    if item.encoded_len != input.len() {
        return Err(error("trailing bytes after string"));
    }
    match item.kind {
        ItemKind::String => {
            Ok(input[item.payload_start..item.payload_start + item.payload_len].to_vec())
        }
        ItemKind::List => Err(error("expected a string, found a list")),
    }
}

/// Decode a single RLP-encoded list into the encodings of its elements.
/// Trailing data aborts.
pub fn decode_list(input: &[u8]) -> EvalResult<Vec<Vec<u8>>> {
    let item = parse_item(input, 0)?;
    if item.encoded_len != input.len() {
        return Err(error("trailing bytes after list"));
    }
    let ItemKind::List = item.kind else {
        return Err(error("expected a list, found a string"));
    };

    let payload_end = item.payload_start + item.payload_len;
    let mut elements = Vec::new();
    let mut offset = item.payload_start;
    while offset < payload_end {
        let element = parse_item(input, offset)?;
        let end = offset + element.encoded_len;
        if end > payload_end {
            return Err(error("element exceeds list payload"));
        }
        elements.push(input[offset..end].to_vec());
        offset = end;
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_byte() {
        assert_eq!(decode_string(&[0x42]).unwrap(), vec![0x42]);
    }

    #[test]
    fn test_decode_short_string() {
        // "abc"
        assert_eq!(
            decode_string(&[0x83, b'a', b'b', b'c']).unwrap(),
            b"abc".to_vec()
        );
    }

    #[test]
    fn test_decode_empty_string() {
        assert_eq!(decode_string(&[0x80]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_trailing_bytes_abort() {
        // "abc" with one junk byte appended.
        let err = decode_string(&[0x83, b'a', b'b', b'c', 0x01]).unwrap_err();
        assert!(matches!(err, RuntimeError::RlpDecode(_)));
    }

    #[test]
    fn test_non_canonical_single_byte_rejected() {
        // 0x05 must be encoded as itself, not as a length-1 string.
        let err = decode_string(&[0x81, 0x05]).unwrap_err();
        assert!(matches!(err, RuntimeError::RlpDecode(_)));
    }

    #[test]
    fn test_decode_list_of_strings() {
        // ["cat", "dog"]
        let input = [0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let elements = decode_list(&input).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], vec![0x83, b'c', b'a', b't']);
        assert_eq!(elements[1], vec![0x83, b'd', b'o', b'g']);
    }

    #[test]
    fn test_decode_empty_list() {
        assert_eq!(decode_list(&[0xc0]).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn test_string_is_not_a_list() {
        assert!(decode_list(&[0x83, b'a', b'b', b'c']).is_err());
        assert!(decode_string(&[0xc0]).is_err());
    }

    #[test]
    fn test_truncated_input_rejected() {
        assert!(decode_string(&[0x83, b'a']).is_err());
        assert!(decode_string(&[]).is_err());
        assert!(decode_list(&[0xc8, 0x83]).is_err());
    }
}
