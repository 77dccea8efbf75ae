//! Forward scanning over JPEG marker segments.

use crate::byte_cursor::ByteCursor;
use crate::constants::{JPEG_SIGNATURE, MARKER_SIZE, SEGMENT_LENGTH_SIZE};
use crate::error::{DecodeError, MalformedCheck};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};

/// A marker and the payload that follows its length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSegment<'a> {
    pub code: u8,
    /// Offset of the 0xFF byte that starts the marker.
    pub offset: usize,
    /// Declared length, including the length field itself. Zero for standalone markers.
    pub length: u16,
    pub payload: &'a [u8],
}

impl MarkerSegment<'_> {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> usize {
        if self.length == 0 {
            self.offset + MARKER_SIZE
        } else {
            self.offset + MARKER_SIZE + SEGMENT_LENGTH_SIZE
        }
    }

    /// Offset just past the segment.
    pub fn end_offset(&self) -> usize {
        self.payload_offset() + self.payload.len()
    }

    pub fn marker(&self) -> Option<JpegMarkerCode> {
        JpegMarkerCode::try_from(self.code).ok()
    }
}

/// Lazily yields marker segments, starting right after SOI.
///
/// A single scanner serves every marker lookup of one decode; it never
/// rescans from the start unless [`MarkerScanner::rewind`] is called.
#[derive(Debug, Clone)]
pub struct MarkerScanner<'a> {
    cursor: ByteCursor<'a>,
    position: usize,
    failed: bool,
}

impl<'a> MarkerScanner<'a> {
    pub fn new(source: &'a [u8]) -> Result<Self, DecodeError> {
        let cursor = ByteCursor::new(source);
        if cursor.len() < MARKER_SIZE || cursor.slice(0, MARKER_SIZE)? != JPEG_SIGNATURE {
            return Err(DecodeError::SignatureMismatch { expected: "JPEG" });
        }
        Ok(Self {
            cursor,
            position: MARKER_SIZE,
            failed: false,
        })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Length of the whole stream, SOI included.
    pub fn stream_length(&self) -> usize {
        self.cursor.len()
    }

    /// Continues scanning from `position`, e.g. after entropy-coded data.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn rewind(&mut self) {
        self.position = MARKER_SIZE;
        self.failed = false;
    }

    pub fn next_segment(&mut self) -> Result<Option<MarkerSegment<'a>>, DecodeError> {
        let bytes = self.cursor.as_bytes();
        let Some(start) = find_marker(bytes, self.position) else {
            self.position = bytes.len();
            return Ok(None);
        };
        let code = bytes[start + 1];

        if JpegMarkerCode::is_standalone(code) {
            self.position = start + MARKER_SIZE;
            return Ok(Some(MarkerSegment {
                code,
                offset: start,
                length: 0,
                payload: &[],
            }));
        }

        let length_offset = start + MARKER_SIZE;
        let length = self
            .cursor
            .u16be(length_offset)
            .map_err(|_| DecodeError::malformed(length_offset, MalformedCheck::SegmentLength))?;
        if (length as usize) < SEGMENT_LENGTH_SIZE {
            return Err(DecodeError::malformed(
                length_offset,
                MalformedCheck::SegmentLength,
            ));
        }
        let payload = self
            .cursor
            .slice(
                length_offset + SEGMENT_LENGTH_SIZE,
                length as usize - SEGMENT_LENGTH_SIZE,
            )
            .map_err(|_| DecodeError::malformed(length_offset, MalformedCheck::SegmentLength))?;

        self.position = length_offset + length as usize;
        Ok(Some(MarkerSegment {
            code,
            offset: start,
            length,
            payload,
        }))
    }

    /// Advances to the next segment carrying `code`.
    pub fn find(&mut self, code: u8) -> Result<MarkerSegment<'a>, DecodeError> {
        while let Some(segment) = self.next_segment()? {
            if segment.code == code {
                return Ok(segment);
            }
        }
        Err(DecodeError::MissingMarker(code))
    }
}

impl<'a> Iterator for MarkerScanner<'a> {
    type Item = Result<MarkerSegment<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_segment() {
            Ok(segment) => segment.map(Ok),
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

/// Finds 0xFF followed by a code byte that is neither 0x00 (stuffing) nor 0xFF (fill).
fn find_marker(bytes: &[u8], from: usize) -> Option<usize> {
    let search = bytes.get(from..)?;
    search
        .windows(2)
        .position(|pair| pair[0] == JPEG_MARKER_START_BYTE && pair[1] != 0x00 && pair[1] != 0xFF)
        .map(|index| from + index)
}
