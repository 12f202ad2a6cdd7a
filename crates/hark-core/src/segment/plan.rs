//! Pure budget math for the two-stage compress-then-chunk policy.
//!
//! All decisions derive from the asset's effective bitrate (payload bytes
//! per second), so the same arithmetic covers PCM WAV and encoded MP3.

/// Remote upload budget a chunk must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub max_bytes: u64,
    pub max_secs: f64,
    pub safety_margin: f64,
}

impl Budget {
    pub fn from_limits(limits: &crate::settings::UploadLimits) -> Self {
        Self {
            max_bytes: limits.max_upload_bytes,
            max_secs: limits.max_chunk_secs,
            safety_margin: limits.safety_margin,
        }
    }
}

/// A contiguous chunk window within the source asset, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start_secs: f64,
    pub len_secs: f64,
}

/// Fragments shorter than this are dropped instead of emitted as their own
/// chunk.
pub const MIN_FRAGMENT_SECS: f64 = 1.0;

fn bitrate(size_bytes: u64, duration_secs: f64) -> f64 {
    size_bytes as f64 / duration_secs.max(f64::EPSILON)
}

/// Fast path: the asset already satisfies both budgets.
pub fn fits(size_bytes: u64, duration_secs: f64, budget: &Budget) -> bool {
    size_bytes <= budget.max_bytes && duration_secs <= budget.max_secs
}

/// Whether a chunk capped at the duration budget would still exceed the size
/// budget at the asset's current bitrate. If so, the asset must be
/// transcoded once before chunking; chunking alone cannot get under budget.
pub fn needs_compression(size_bytes: u64, duration_secs: f64, budget: &Budget) -> bool {
    let target_chunk_secs = budget.max_secs.min(duration_secs) * budget.safety_margin;
    bitrate(size_bytes, duration_secs) * target_chunk_secs > budget.max_bytes as f64
}

/// Chunk duration satisfying both budgets at the asset's bitrate, scaled by
/// the safety margin to leave headroom for container overhead.
pub fn chunk_duration_secs(size_bytes: u64, duration_secs: f64, budget: &Budget) -> f64 {
    let max_secs_by_size = budget.max_bytes as f64 / bitrate(size_bytes, duration_secs);
    max_secs_by_size.min(budget.max_secs) * budget.safety_margin
}

/// Contiguous, non-overlapping chunk windows covering the asset in time
/// order. A trailing fragment under [`MIN_FRAGMENT_SECS`] is dropped rather
/// than emitted as a degenerate chunk.
pub fn chunk_spans(total_secs: f64, chunk_secs: f64) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0.0;
    while start < total_secs {
        let len = chunk_secs.min(total_secs - start);
        if !spans.is_empty() && len < MIN_FRAGMENT_SECS {
            break;
        }
        spans.push(Span {
            start_secs: start,
            len_secs: len,
        });
        start += chunk_secs;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn budget() -> Budget {
        Budget {
            max_bytes: 25 * MB,
            max_secs: 600.0,
            safety_margin: 0.95,
        }
    }

    #[test]
    fn test_fits_is_fast_path() {
        let b = budget();
        assert!(fits(10 * MB, 300.0, &b));
        assert!(!fits(30 * MB, 300.0, &b));
        assert!(!fits(10 * MB, 900.0, &b));
    }

    #[test]
    fn test_long_but_lean_asset_only_chunks() {
        // 20 minutes at ~8.7 kB/s: over the duration budget, but a 570 s
        // chunk is nowhere near 25 MB, so no transcode.
        let b = budget();
        let (size, dur) = (10 * MB, 1200.0);
        assert!(!needs_compression(size, dur, &b));

        let chunk = chunk_duration_secs(size, dur, &b);
        assert!((chunk - 570.0).abs() < 1.0);

        let spans = chunk_spans(dur, chunk);
        assert_eq!(spans.len(), 3);
        for span in &spans {
            assert!(span.len_secs <= b.max_secs * b.safety_margin + 1e-9);
        }
    }

    #[test]
    fn test_uncompressed_meeting_triggers_compression() {
        // 70 minutes of 48 kHz mono 16-bit PCM (~96 kB/s, ~385 MB): a 570 s
        // chunk would be ~52 MB, so the policy must transcode first.
        let b = budget();
        let dur = 70.0 * 60.0;
        let size = (96_000.0 * dur) as u64;
        assert!(needs_compression(size, dur, &b));

        // After a 64 kbps mono transcode (8 kB/s), chunking takes over.
        let compressed_size = (8_000.0 * dur) as u64;
        assert!(!fits(compressed_size, dur, &b));
        assert!(!needs_compression(compressed_size, dur, &b));

        let chunk = chunk_duration_secs(compressed_size, dur, &b);
        let spans = chunk_spans(dur, chunk);
        assert!(spans.len() >= 7, "expected >= 7 chunks, got {}", spans.len());
        for span in &spans {
            assert!(span.len_secs <= b.max_secs * b.safety_margin + 1e-9);
            let est_bytes = 8_000.0 * span.len_secs;
            assert!(est_bytes <= b.max_bytes as f64);
        }
    }

    #[test]
    fn test_spans_are_contiguous_and_ordered() {
        let spans = chunk_spans(1500.0, 570.0);
        assert_eq!(spans.len(), 3);
        let mut expected_start = 0.0;
        for span in &spans {
            assert!((span.start_secs - expected_start).abs() < 1e-9);
            expected_start += 570.0;
        }
    }

    #[test]
    fn test_sub_second_trailing_fragment_is_dropped() {
        let spans = chunk_spans(570.5, 570.0);
        assert_eq!(spans.len(), 1);

        // Exactly one second survives.
        let spans = chunk_spans(571.0, 570.0);
        assert_eq!(spans.len(), 2);
        assert!((spans[1].len_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_asset_is_single_span() {
        let spans = chunk_spans(120.0, 570.0);
        assert_eq!(spans.len(), 1);
        assert!((spans[0].len_secs - 120.0).abs() < 1e-9);
    }
}
