//! Range Resolver Module
//!
//! Parses the textual byte-range expressions the protocol exchanges — the
//! `Content-Range` form placing an incoming chunk and the `Range` form
//! requesting partial content — and validates read requests against a known
//! total size. Malformed text is a distinct failure class rejected before
//! bounds validation runs.

use crate::{Result, StaError};

/// Chunk placement parsed from `Content-Range: bytes <start>-<end>/<total>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlacement {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

/// Requested span parsed from `Range: bytes=<start>-[<end>]`. The end is
/// open when the client wants everything from `start` onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: u64,
    pub end: Option<u64>,
}

/// A read request validated against a known total, ready to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ResolvedRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Outbound `Content-Range` confirmation, echoed verbatim in 206
    /// responses.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

fn parse_u64(text: &str, what: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|_| StaError::RangeMalformed(format!("invalid {}: {:?}", what, text.trim())))
}

/// Parse a `Content-Range` header value of the form
/// `bytes <start>-<end>/<total>`.
pub fn parse_content_range(header: &str) -> Result<ChunkPlacement> {
    let rest = header
        .trim()
        .strip_prefix("bytes")
        .ok_or_else(|| {
            StaError::RangeMalformed(format!("Content-Range must start with 'bytes': {:?}", header))
        })?
        .trim_start();

    let (span, total) = rest.split_once('/').ok_or_else(|| {
        StaError::RangeMalformed(format!("Content-Range missing '/<total>': {:?}", header))
    })?;
    let (start, end) = span.split_once('-').ok_or_else(|| {
        StaError::RangeMalformed(format!("Content-Range missing '-' separator: {:?}", header))
    })?;

    let start = parse_u64(start, "start offset")?;
    let end = parse_u64(end, "end offset")?;
    let total = parse_u64(total, "total size")?;

    if start > end {
        return Err(StaError::RangeMalformed(format!(
            "Content-Range start {} exceeds end {}",
            start, end
        )));
    }

    Ok(ChunkPlacement { start, end, total })
}

/// Parse a `Range` header value of the form `bytes=<start>-` or
/// `bytes=<start>-<end>`.
pub fn parse_range_request(header: &str) -> Result<RangeRequest> {
    let rest = header.trim().strip_prefix("bytes=").ok_or_else(|| {
        StaError::RangeMalformed(format!("Range must start with 'bytes=': {:?}", header))
    })?;

    let (start, end) = rest.split_once('-').ok_or_else(|| {
        StaError::RangeMalformed(format!("Range missing '-' separator: {:?}", header))
    })?;

    let start = parse_u64(start, "start offset")?;
    let end = match end.trim() {
        "" => None,
        text => Some(parse_u64(text, "end offset")?),
    };

    Ok(RangeRequest { start, end })
}

/// Validate a requested span against a known total size.
///
/// An open end defaults to `total - 1`. Out-of-bounds requests are rejected
/// outright; nothing is clamped.
pub fn resolve(request: &RangeRequest, total: u64) -> Result<ResolvedRange> {
    let end = match request.end {
        Some(end) => end,
        None if total == 0 => {
            return Err(StaError::RangeNotSatisfiable(
                "open-ended range against an empty object".to_string(),
            ));
        }
        None => total - 1,
    };

    if end >= total {
        return Err(StaError::RangeNotSatisfiable(format!(
            "range {}-{} exceeds total size {}",
            request.start, end, total
        )));
    }
    if request.start > end {
        return Err(StaError::RangeNotSatisfiable(format!(
            "range start {} exceeds end {}",
            request.start, end
        )));
    }

    Ok(ResolvedRange {
        start: request.start,
        end,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chunk_placement() {
        let placement = parse_content_range("bytes 0-499/2000").unwrap();
        assert_eq!(
            placement,
            ChunkPlacement {
                start: 0,
                end: 499,
                total: 2000
            }
        );
    }

    #[test]
    fn chunk_placement_rejects_wrong_prefix_and_missing_parts() {
        assert!(matches!(
            parse_content_range("0-499/2000"),
            Err(StaError::RangeMalformed(_))
        ));
        assert!(matches!(
            parse_content_range("bytes 0-499"),
            Err(StaError::RangeMalformed(_))
        ));
        assert!(matches!(
            parse_content_range("bytes abc-499/2000"),
            Err(StaError::RangeMalformed(_))
        ));
        assert!(matches!(
            parse_content_range("bytes 500-499/2000"),
            Err(StaError::RangeMalformed(_))
        ));
    }

    #[test]
    fn parses_read_requests() {
        assert_eq!(
            parse_range_request("bytes=0-99").unwrap(),
            RangeRequest {
                start: 0,
                end: Some(99)
            }
        );
        assert_eq!(
            parse_range_request("bytes=50-").unwrap(),
            RangeRequest {
                start: 50,
                end: None
            }
        );
    }

    #[test]
    fn negative_offsets_are_malformed_not_unsatisfiable() {
        // A leading minus never parses as u64, so "-1-5" is rejected before
        // bounds validation.
        assert!(matches!(
            parse_range_request("bytes=-1-5"),
            Err(StaError::RangeMalformed(_))
        ));
    }

    #[test]
    fn resolve_defaults_open_end_to_total() {
        let request = RangeRequest {
            start: 50,
            end: None,
        };
        let resolved = resolve(&request, 100).unwrap();
        assert_eq!(resolved.end, 99);
        assert_eq!(resolved.len(), 50);
        assert_eq!(resolved.content_range(), "bytes 50-99/100");
    }

    #[test]
    fn resolve_rejects_out_of_bounds_without_clamping() {
        let request = RangeRequest {
            start: 50,
            end: Some(200),
        };
        assert!(matches!(
            resolve(&request, 100),
            Err(StaError::RangeNotSatisfiable(_))
        ));
    }

    #[test]
    fn resolve_accepts_exact_full_coverage() {
        let request = RangeRequest {
            start: 0,
            end: Some(99),
        };
        let resolved = resolve(&request, 100).unwrap();
        assert_eq!((resolved.start, resolved.end), (0, 99));
    }

    #[test]
    fn resolve_rejects_inverted_span() {
        let request = RangeRequest {
            start: 80,
            end: Some(20),
        };
        assert!(matches!(
            resolve(&request, 100),
            Err(StaError::RangeNotSatisfiable(_))
        ));
    }
}
