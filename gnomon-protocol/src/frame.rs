//! Segment framing and code tables.
//!
//! Code table record format:
//! - KIND (1 byte): 0 = command, 1 = data
//! - LENGTH (1 byte): payload length (1-255)
//! - PAYLOAD (LENGTH bytes): sent with the control line at KIND's level

use heapless::Vec;

/// Maximum segments in one transmission frame
pub const MAX_SEGMENTS: usize = 8;

/// Code table tag for a command segment
pub const TAG_COMMAND: u8 = 0;

/// Code table tag for a data segment
pub const TAG_DATA: u8 = 1;

/// Errors raised while building frames or decoding code tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Frame already holds `MAX_SEGMENTS` segments
    TooManySegments,
    /// Segment payload is empty
    EmptySegment,
    /// Code table ends in the middle of a record
    Truncated,
    /// Code table record carries an unknown kind tag
    UnknownKind(u8),
}

/// Whether a segment's bytes are command opcodes or data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SegmentKind {
    /// Control line low
    Command,
    /// Control line high
    Data,
}

impl SegmentKind {
    /// Decode a code table tag
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_COMMAND => Some(SegmentKind::Command),
            TAG_DATA => Some(SegmentKind::Data),
            _ => None,
        }
    }

    /// Code table tag for this kind
    pub const fn tag(self) -> u8 {
        match self {
            SegmentKind::Command => TAG_COMMAND,
            SegmentKind::Data => TAG_DATA,
        }
    }

    /// Control line level expected by the controller (true = high)
    pub const fn is_data(self) -> bool {
        matches!(self, SegmentKind::Data)
    }
}

/// Typed run of bytes sent at one control line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment<'a> {
    /// Command or data
    pub kind: SegmentKind,
    /// Bytes to send
    pub payload: &'a [u8],
}

impl<'a> Segment<'a> {
    /// Command segment
    pub const fn command(payload: &'a [u8]) -> Self {
        Self {
            kind: SegmentKind::Command,
            payload,
        }
    }

    /// Data segment
    pub const fn data(payload: &'a [u8]) -> Self {
        Self {
            kind: SegmentKind::Data,
            payload,
        }
    }
}

/// One logical controller instruction
///
/// Frames are transient: built on the stack, handed to a sender and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmissionFrame<'a> {
    segments: Vec<Segment<'a>, MAX_SEGMENTS>,
}

impl<'a> TransmissionFrame<'a> {
    /// Create an empty frame
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Append a segment
    pub fn push(&mut self, segment: Segment<'a>) -> Result<(), FrameError> {
        if segment.payload.is_empty() {
            return Err(FrameError::EmptySegment);
        }
        self.segments
            .push(segment)
            .map_err(|_| FrameError::TooManySegments)
    }

    /// Append a command segment
    pub fn push_command(&mut self, payload: &'a [u8]) -> Result<(), FrameError> {
        self.push(Segment::command(payload))
    }

    /// Append a data segment
    pub fn push_data(&mut self, payload: &'a [u8]) -> Result<(), FrameError> {
        self.push(Segment::data(payload))
    }

    /// Segments in transmission order
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if the frame has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total payload bytes across all segments
    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(|s| s.payload.len()).sum()
    }
}

impl<'f, 'a> IntoIterator for &'f TransmissionFrame<'a> {
    type Item = &'f Segment<'a>;
    type IntoIter = core::slice::Iter<'f, Segment<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Fixed command sequence stored as `[kind, length, payload...]` records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeTable<'a> {
    bytes: &'a [u8],
}

impl<'a> CodeTable<'a> {
    /// Wrap raw table bytes (not validated until decoded)
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Raw table bytes
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Decode records lazily
    pub fn segments(&self) -> CodeTableIter<'a> {
        CodeTableIter {
            remaining: self.bytes,
        }
    }

    /// Check every record, returning the segment count
    pub fn validate(&self) -> Result<usize, FrameError> {
        let mut count = 0;
        for segment in self.segments() {
            segment?;
            count += 1;
        }
        Ok(count)
    }
}

/// Iterator over the segments of a [`CodeTable`]
///
/// Yields at most one error, then ends.
#[derive(Debug, Clone)]
pub struct CodeTableIter<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for CodeTableIter<'a> {
    type Item = Result<Segment<'a>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.remaining;
        if bytes.is_empty() {
            return None;
        }
        // Any error ends iteration
        self.remaining = &[];

        let [tag, len, rest @ ..] = bytes else {
            return Some(Err(FrameError::Truncated));
        };
        let Some(kind) = SegmentKind::from_tag(*tag) else {
            return Some(Err(FrameError::UnknownKind(*tag)));
        };
        let len = *len as usize;
        if len == 0 {
            return Some(Err(FrameError::EmptySegment));
        }
        if rest.len() < len {
            return Some(Err(FrameError::Truncated));
        }

        let (payload, tail) = rest.split_at(len);
        self.remaining = tail;
        Some(Ok(Segment { kind, payload }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_table() {
        let table = CodeTable::new(&[0, 1, 0x36, 1, 2, 0x00, 0x20, 0, 3, 0x35, 0x21, 0x11]);
        let segments: heapless::Vec<_, 4> = table.segments().map(|s| s.unwrap()).collect();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::command(&[0x36]));
        assert_eq!(segments[1], Segment::data(&[0x00, 0x20]));
        // Multi-byte command records send each opcode with the line low
        assert_eq!(segments[2], Segment::command(&[0x35, 0x21, 0x11]));
        assert_eq!(table.validate(), Ok(3));
    }

    #[test]
    fn test_truncated_record() {
        let table = CodeTable::new(&[0, 1, 0x29, 1, 4, 0x00, 0x01]);
        let mut iter = table.segments();
        assert!(iter.next().unwrap().is_ok());
        assert_eq!(iter.next(), Some(Err(FrameError::Truncated)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_lone_tag_is_truncated() {
        assert_eq!(CodeTable::new(&[1]).validate(), Err(FrameError::Truncated));
    }

    #[test]
    fn test_unknown_kind() {
        let table = CodeTable::new(&[7, 1, 0x29]);
        assert_eq!(table.validate(), Err(FrameError::UnknownKind(7)));
    }

    #[test]
    fn test_zero_length_record() {
        let table = CodeTable::new(&[0, 0]);
        assert_eq!(table.validate(), Err(FrameError::EmptySegment));
    }

    #[test]
    fn test_frame_capacity() {
        let byte = [0x00];
        let mut frame = TransmissionFrame::new();
        for _ in 0..MAX_SEGMENTS {
            frame.push_data(&byte).unwrap();
        }
        assert_eq!(frame.push_command(&byte), Err(FrameError::TooManySegments));
        assert_eq!(frame.len(), MAX_SEGMENTS);
    }

    #[test]
    fn test_frame_rejects_empty_segment() {
        let mut frame = TransmissionFrame::new();
        assert_eq!(frame.push_data(&[]), Err(FrameError::EmptySegment));
        assert!(frame.is_empty());
    }

    #[test]
    fn test_frame_byte_len() {
        let mut frame = TransmissionFrame::new();
        frame.push_command(&[0x2A]).unwrap();
        frame.push_data(&[0, 0, 0, 239]).unwrap();
        assert_eq!(frame.byte_len(), 5);
        assert_eq!(frame.segments()[1].kind, SegmentKind::Data);
    }

    proptest! {
        // Decoding arbitrary bytes never reads past the table and never panics
        #[test]
        fn prop_decode_is_bounded(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let table = CodeTable::new(&bytes);
            let mut consumed = 0usize;
            for segment in table.segments() {
                match segment {
                    Ok(s) => consumed += 2 + s.payload.len(),
                    Err(_) => break,
                }
            }
            prop_assert!(consumed <= bytes.len());
        }
    }
}
