use std::io::{Read, Write};

use super::error::{ProtocolError, TransportError};

pub const LENGTH_PREFIX_SIZE: usize = 4;
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Validates a length field read off the wire.
#[inline]
pub fn check_frame_len(len: usize) -> Result<usize, ProtocolError> {
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameLength { len });
    }
    Ok(len)
}

pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len = check_frame_len(payload.len())?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + len);
    frame.extend_from_slice(&(len as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Blocks until one whole frame has been read. A short read at EOF surfaces
/// as `UnexpectedEof`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut header)?;

    let len = check_frame_len(u32::from_le_bytes(header) as usize)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind};

    use super::*;

    #[test]
    fn frame_header_is_little_endian_length() {
        let frame = encode_frame(&[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(frame, vec![3, 0, 0, 0, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn reads_consecutive_frames() {
        let mut bytes = encode_frame(b"first").unwrap();
        bytes.extend(encode_frame(b"second").unwrap());
        let mut cursor = Cursor::new(bytes);

        assert_eq!(read_frame(&mut cursor).unwrap(), b"first");
        assert_eq!(read_frame(&mut cursor).unwrap(), b"second");
        assert!(read_frame(&mut cursor).is_err());
    }

    #[test]
    fn rejects_zero_and_oversized_lengths() {
        let mut cursor = Cursor::new(0u32.to_le_bytes().to_vec());
        assert!(matches!(
            read_frame(&mut cursor),
            Err(TransportError::Protocol(ProtocolError::FrameLength { len: 0 }))
        ));

        let mut cursor = Cursor::new(2_000_000u32.to_le_bytes().to_vec());
        assert!(matches!(
            read_frame(&mut cursor),
            Err(TransportError::Protocol(ProtocolError::FrameLength { len: 2_000_000 }))
        ));

        assert!(encode_frame(&[]).is_err());
        assert!(encode_frame(&vec![0u8; MAX_FRAME_LEN + 1]).is_err());
        assert!(encode_frame(&vec![0u8; MAX_FRAME_LEN]).is_ok());
    }

    #[test]
    fn truncated_body_is_unexpected_eof() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut cursor = Cursor::new(bytes);

        match read_frame(&mut cursor) {
            Err(TransportError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }
}
