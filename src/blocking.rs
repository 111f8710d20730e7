use crate::error::Result;

/// Outcome of a single non-blocking I/O attempt.
///
/// Packed into one integer so the hot path allocates nothing: non-negative
/// values are byte counts, the two reserved negative values mean the
/// operation could not make progress without blocking. The sentinels are
/// part of the documented contract — they are not failures and are never
/// raised as errors.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockingResult(isize);

impl BlockingResult {
    /// The handle must become readable before the call can make progress.
    pub const WOULD_BLOCK_READ: BlockingResult = BlockingResult(-1);

    /// The handle must become writable before the call can make progress.
    pub const WOULD_BLOCK_WRITE: BlockingResult = BlockingResult(-2);

    /// Wraps a completed byte count.
    #[inline]
    pub fn count(n: usize) -> Self {
        BlockingResult(n as isize)
    }

    /// True iff the value is a non-negative count.
    #[inline]
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub fn is_would_block(self) -> bool {
        self.0 < 0
    }

    /// The byte count, or `None` for a would-block sentinel.
    #[inline]
    pub fn bytes(self) -> Option<usize> {
        if self.0 >= 0 { Some(self.0 as usize) } else { None }
    }
}

impl std::fmt::Debug for BlockingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            -1 => f.write_str("WouldBlockRead"),
            -2 => f.write_str("WouldBlockWrite"),
            n => write!(f, "Count({})", n),
        }
    }
}

/// Non-blocking aggregate write: drives a single-shot send until the whole
/// buffer is written or the socket stops accepting data.
///
/// Policy: a would-block with zero bytes written so far reports the
/// sentinel itself; a would-block after partial progress reports the
/// partial count as a success. Partial progress is never silently dropped.
pub fn send_all_with<F>(buf: &[u8], mut send_once: F) -> Result<BlockingResult>
where
    F: FnMut(&[u8]) -> Result<BlockingResult>,
{
    let mut off = 0;
    while off < buf.len() {
        let step = send_once(&buf[off..])?;
        match step.bytes() {
            Some(0) => break,
            Some(n) => off += n,
            None => {
                return Ok(if off == 0 {
                    step
                } else {
                    BlockingResult::count(off)
                });
            }
        }
    }
    Ok(BlockingResult::count(off))
}

/// Blocking aggregate write: like [`send_all_with`], but on a would-block
/// sentinel invokes `wait` for readiness and retries at the same offset.
///
/// Returns the cumulative total, always equal to `buf.len()` on success.
/// The loop is explicit and bounded by progress — never recursion.
pub fn write_retrying<F, W>(buf: &[u8], mut send_once: F, mut wait: W) -> Result<usize>
where
    F: FnMut(&[u8]) -> Result<BlockingResult>,
    W: FnMut(BlockingResult) -> Result<()>,
{
    let mut off = 0;
    while off < buf.len() {
        let step = send_once(&buf[off..])?;
        match step.bytes() {
            Some(n) => off += n,
            None => wait(step)?,
        }
    }
    Ok(off)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_success_iff_nonnegative() {
        assert!(BlockingResult::count(0).is_success());
        assert!(BlockingResult::count(17).is_success());
        assert!(!BlockingResult::WOULD_BLOCK_READ.is_success());
        assert!(!BlockingResult::WOULD_BLOCK_WRITE.is_success());
        assert_eq!(BlockingResult::count(17).bytes(), Some(17));
        assert_eq!(BlockingResult::WOULD_BLOCK_WRITE.bytes(), None);
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_ne!(
            BlockingResult::WOULD_BLOCK_READ,
            BlockingResult::WOULD_BLOCK_WRITE
        );
    }

    #[test]
    fn retrying_write_accumulates_across_would_blocks() {
        // would-block, would-block, 5 bytes, then the rest.
        let buf = [0u8; 64];
        let mut script = vec![
            BlockingResult::WOULD_BLOCK_WRITE,
            BlockingResult::WOULD_BLOCK_WRITE,
            BlockingResult::count(5),
            BlockingResult::count(59),
        ]
        .into_iter();
        let mut waits = 0;
        let total = write_retrying(
            &buf,
            |_| Ok(script.next().expect("script exhausted")),
            |r| {
                assert_eq!(r, BlockingResult::WOULD_BLOCK_WRITE);
                waits += 1;
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(total, buf.len());
        assert_eq!(waits, 2);
    }

    #[test]
    fn aggregate_reports_would_block_only_with_zero_progress() {
        let buf = [0u8; 10];
        let r = send_all_with(&buf, |_| Ok(BlockingResult::WOULD_BLOCK_WRITE)).unwrap();
        assert_eq!(r, BlockingResult::WOULD_BLOCK_WRITE);
    }

    #[test]
    fn aggregate_reports_partial_progress_as_count() {
        let buf = [0u8; 10];
        let mut script = vec![BlockingResult::count(4), BlockingResult::WOULD_BLOCK_WRITE].into_iter();
        let r = send_all_with(&buf, |_| Ok(script.next().unwrap())).unwrap();
        assert_eq!(r, BlockingResult::count(4));
    }

    #[test]
    fn aggregate_completes_when_socket_keeps_accepting() {
        let buf = [0u8; 12];
        let mut script = vec![BlockingResult::count(7), BlockingResult::count(5)].into_iter();
        let r = send_all_with(&buf, |_| Ok(script.next().unwrap())).unwrap();
        assert_eq!(r.bytes(), Some(12));
    }
}
