use crate::TransferError;

/// An inclusive byte interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

// An inclusive range covers at least one byte, so there is no `is_empty`.
#[allow(clippy::len_without_is_empty)]
impl ByteRange {
    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Ordered, gapless split of a file into ranges of at most `chunk_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    total_size: u64,
    chunk_size: u64,
    thread_count: usize,
    ranges: Vec<ByteRange>,
}

impl DownloadPlan {
    /// Builds the plan for `total_size` bytes.
    ///
    /// Fails when `total_size` or `chunk_size` is zero, or when the file
    /// could not be held in memory.
    pub fn new(total_size: u64, chunk_size: u64, thread_count: usize) -> Result<Self, TransferError> {
        if total_size == 0 {
            return Err(TransferError::Validation(
                "\"size\" (total bytes) is required and must be > 0".into(),
            ));
        }
        if chunk_size == 0 {
            return Err(TransferError::Validation("chunk size must be > 0".into()));
        }

        if total_size > isize::MAX as u64 {
            return Err(too_large(total_size));
        }

        let count = usize::try_from(total_size.div_ceil(chunk_size))
            .map_err(|_| too_large(total_size))?;
        let mut ranges = Vec::new();
        ranges
            .try_reserve_exact(count)
            .map_err(|_| too_large(total_size))?;
        let mut start = 0u64;
        while start < total_size {
            let end_exclusive = start.saturating_add(chunk_size).min(total_size);
            ranges.push(ByteRange {
                start,
                end: end_exclusive - 1,
            });
            start = end_exclusive;
        }

        Ok(Self {
            total_size,
            chunk_size,
            thread_count,
            ranges,
        })
    }

    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of concurrent workers to run (at least one).
    pub fn worker_count(&self) -> usize {
        self.thread_count.max(1)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn too_large(total_size: u64) -> TransferError {
    TransferError::Validation(format!("file of {total_size} bytes does not fit in memory"))
}
