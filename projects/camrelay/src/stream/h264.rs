use tracing::debug;

const PROGRESS_STEP_BYTES: u64 = 1024 * 1024;

/// Byte accounting for the H264 passthrough. Chunks are forwarded untouched;
/// a client joining mid-stream gets whatever NAL unit comes next, keyframe or not.
#[derive(Debug, Default)]
pub struct H264Relay {
    total_bytes: u64,
    since_report: u64,
}

impl H264Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a forwarded chunk. Returns the running total each time another
    /// mebibyte has gone through.
    pub fn record(&mut self, chunk_len: usize) -> Option<u64> {
        let len = chunk_len as u64;
        self.total_bytes += len;
        self.since_report += len;
        if self.since_report < PROGRESS_STEP_BYTES {
            return None;
        }

        self.since_report = 0;
        debug!("H264 sent {}KB", self.total_bytes / 1024);
        Some(self.total_bytes)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::H264Relay;

    #[test]
    fn reports_progress_once_per_mebibyte() {
        let mut relay = H264Relay::new();
        let chunk = 256 * 1024;

        let reports: Vec<u64> = (0..9).filter_map(|_| relay.record(chunk)).collect();

        assert_eq!(reports, vec![1024 * 1024, 2 * 1024 * 1024]);
        assert_eq!(relay.total_bytes(), 9 * 256 * 1024);
    }
}
