use bytes::{Buf, Bytes, BytesMut};
use tracing::warn;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const MAX_BUFFER_BYTES: usize = 16 * 1024 * 1024;

/// Re-frames a chunked byte stream into complete JPEG images.
///
/// One extractor lives for one response. Bytes before a start marker are
/// dropped; a started frame is kept until its end marker arrives.
#[derive(Debug, Default)]
pub struct JpegFrameExtractor {
    buffer: BytesMut,
}

impl JpegFrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every frame completed by it, in stream order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.buffer, &JPEG_SOI) else {
                // A trailing 0xFF may be the first half of a start marker.
                let keep = usize::from(self.buffer.last() == Some(&JPEG_SOI[0]));
                let discard = self.buffer.len() - keep;
                self.buffer.advance(discard);
                break;
            };
            self.buffer.advance(start);

            let Some(end_rel) = find_marker(&self.buffer[JPEG_SOI.len()..], &JPEG_EOI) else {
                if self.buffer.len() > MAX_BUFFER_BYTES {
                    warn!(
                        "dropping partial jpeg frame of {} bytes without end marker",
                        self.buffer.len()
                    );
                    self.buffer.clear();
                }
                break;
            };

            let end = JPEG_SOI.len() + end_rel + JPEG_EOI.len();
            frames.push(self.buffer.split_to(end).freeze());
        }

        frames
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_marker(buffer: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buffer.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::JpegFrameExtractor;

    fn fake_jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn collect(acc: &mut JpegFrameExtractor, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        chunks
            .iter()
            .flat_map(|chunk| acc.push_chunk(chunk))
            .map(|frame| frame.to_vec())
            .collect()
    }

    #[test]
    fn extracts_frame_from_single_chunk() {
        let mut acc = JpegFrameExtractor::new();
        let frame = fake_jpeg(b"abc");
        let mut chunk = b"header".to_vec();
        chunk.extend_from_slice(&frame);
        chunk.extend_from_slice(b"tail");

        let out = acc.push_chunk(&chunk);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], frame);
    }

    #[test]
    fn extracts_frame_across_multiple_chunks() {
        let mut acc = JpegFrameExtractor::new();
        let frame = fake_jpeg(b"hello-world");
        let (first, second) = frame.split_at(5);

        assert!(acc.push_chunk(first).is_empty());
        let out = collect(&mut acc, &[second]);
        assert_eq!(out, vec![frame]);
    }

    #[test]
    fn yields_every_frame_in_one_chunk_in_order() {
        let mut acc = JpegFrameExtractor::new();
        let frame1 = fake_jpeg(b"111");
        let frame2 = fake_jpeg(b"222");
        let mut chunk = frame1.clone();
        chunk.extend_from_slice(&frame2);

        let out = collect(&mut acc, &[&chunk]);
        assert_eq!(out, vec![frame1, frame2]);
        assert_eq!(acc.buffered_len(), 0);
    }

    #[test]
    fn detects_start_marker_split_across_chunks() {
        let mut acc = JpegFrameExtractor::new();
        let frame = fake_jpeg(b"split");
        let mut first = b"noise".to_vec();
        first.push(0xFF);
        let second = &frame[1..];

        assert!(acc.push_chunk(&first).is_empty());
        assert_eq!(acc.buffered_len(), 1, "only the dangling 0xFF is retained");
        let out = collect(&mut acc, &[second]);
        assert_eq!(out, vec![frame]);
    }

    #[test]
    fn detects_end_marker_split_across_chunks() {
        let mut acc = JpegFrameExtractor::new();
        let frame = fake_jpeg(b"tail-split");
        let (first, second) = frame.split_at(frame.len() - 1);

        assert!(acc.push_chunk(first).is_empty());
        let out = collect(&mut acc, &[second]);
        assert_eq!(out, vec![frame]);
    }

    #[test]
    fn discards_noise_without_start_marker() {
        let mut acc = JpegFrameExtractor::new();
        assert!(acc.push_chunk(b"garbage without markers").is_empty());
        assert_eq!(acc.buffered_len(), 0);
    }

    #[test]
    fn truncated_trailing_frame_is_never_yielded() {
        let mut acc = JpegFrameExtractor::new();
        let complete = fake_jpeg(b"done");
        let mut chunk = complete.clone();
        chunk.extend_from_slice(&[0xFF, 0xD8, 1, 2, 3]);

        let out = collect(&mut acc, &[&chunk]);
        assert_eq!(out, vec![complete]);
        assert_eq!(acc.buffered_len(), 5);
    }

    #[test]
    fn any_chunking_yields_the_same_frames() {
        let frames = vec![
            fake_jpeg(b"first"),
            fake_jpeg(&[0xFF, 0x00, 0xAB]),
            fake_jpeg(b""),
            fake_jpeg(b"last-one"),
        ];
        let mut stream = b"junk\xFF".to_vec();
        for (idx, frame) in frames.iter().enumerate() {
            stream.extend_from_slice(frame);
            stream.extend(std::iter::repeat_n(0x42_u8, idx));
        }
        stream.extend_from_slice(&[0xFF, 0xD8, 9, 9]);

        for size in 1..=9 {
            let mut acc = JpegFrameExtractor::new();
            let chunks: Vec<&[u8]> = stream.chunks(size).collect();
            let out = collect(&mut acc, &chunks);
            assert_eq!(out, frames, "chunk size {size} changed the extracted frames");
        }
    }

    #[test]
    fn oversized_partial_frame_is_dropped_and_scanning_resumes() {
        let mut acc = JpegFrameExtractor::new();
        let mut runaway = vec![0xFF, 0xD8];
        runaway.resize(17 * 1024 * 1024, 0x00);

        assert!(acc.push_chunk(&runaway).is_empty());
        assert_eq!(acc.buffered_len(), 0);

        let frame = fake_jpeg(b"after-overflow");
        assert_eq!(collect(&mut acc, &[&frame]), vec![frame]);
    }
}
