use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::TransferError;
use crate::plan::{ByteRange, DownloadPlan};

/// Pre-allocated output buffer for a ranged download.
///
/// The buffer is handed out as one [`RangeSlot`] per plan range. Slots are
/// disjoint `&mut` views, so concurrent workers fill them without locking.
pub struct AssemblyBuffer {
    bytes: Vec<u8>,
    ranges: Vec<ByteRange>,
    filled: AtomicUsize,
}

/// Exclusive write access to one range of an [`AssemblyBuffer`].
pub struct RangeSlot<'a> {
    range: ByteRange,
    target: &'a mut [u8],
    filled: &'a AtomicUsize,
}

impl AssemblyBuffer {
    /// Allocates `plan.total_size()` zeroed bytes.
    pub fn new(plan: &DownloadPlan) -> Result<Self, TransferError> {
        let too_large = || {
            TransferError::Validation(format!(
                "file of {} bytes does not fit in memory",
                plan.total_size()
            ))
        };
        let size = usize::try_from(plan.total_size()).map_err(|_| too_large())?;
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).map_err(|_| too_large())?;
        bytes.resize(size, 0u8);
        Ok(Self {
            bytes,
            ranges: plan.ranges().to_vec(),
            filled: AtomicUsize::new(0),
        })
    }

    /// Splits the buffer into one slot per range, in plan order.
    ///
    /// Issuing slots resets completion tracking: every slot of the latest
    /// issue must be filled before [`into_bytes`](Self::into_bytes) succeeds.
    pub fn slots(&mut self) -> Vec<RangeSlot<'_>> {
        let Self {
            bytes,
            ranges,
            filled,
        } = self;
        filled.store(0, Ordering::SeqCst);

        let mut rest: &mut [u8] = bytes.as_mut_slice();
        let mut slots = Vec::with_capacity(ranges.len());
        for range in ranges.iter() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() as usize);
            slots.push(RangeSlot {
                range: *range,
                target: head,
                filled: &*filled,
            });
            rest = tail;
        }
        slots
    }

    /// Number of ranges written so far.
    pub fn filled(&self) -> usize {
        self.filled.load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.filled() == self.ranges.len()
    }

    /// Returns the assembled bytes once every range has been written.
    pub fn into_bytes(self) -> Result<Vec<u8>, TransferError> {
        let filled = self.filled();
        if filled != self.ranges.len() {
            return Err(TransferError::IncompleteAssembly {
                filled,
                total: self.ranges.len(),
            });
        }
        Ok(self.bytes)
    }
}

impl RangeSlot<'_> {
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Writes `data` into the slot.
    ///
    /// `data` must be exactly as long as the range; otherwise nothing is
    /// written and [`TransferError::LengthMismatch`] is returned.
    pub fn fill(self, data: &[u8]) -> Result<ByteRange, TransferError> {
        let expected = self.range.len();
        if data.len() as u64 != expected {
            return Err(TransferError::LengthMismatch {
                start: self.range.start,
                end: self.range.end,
                expected,
                actual: data.len() as u64,
            });
        }
        self.target.copy_from_slice(data);
        self.filled.fetch_add(1, Ordering::SeqCst);
        trace!(start = self.range.start, end = self.range.end, "range assembled");
        Ok(self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn in_order_fill_reproduces_source() {
        let source = sample(1000);
        let plan = DownloadPlan::new(1000, 64, 4).unwrap();
        let mut buffer = AssemblyBuffer::new(&plan).unwrap();

        for slot in buffer.slots() {
            let r = slot.range();
            slot.fill(&source[r.start as usize..=r.end as usize]).unwrap();
        }

        assert!(buffer.is_complete());
        assert_eq!(buffer.into_bytes().unwrap(), source);
    }

    #[test]
    fn out_of_order_fill_lands_at_offsets() {
        let source = sample(10);
        let plan = DownloadPlan::new(10, 4, 2).unwrap();
        let mut buffer = AssemblyBuffer::new(&plan).unwrap();

        let mut slots = buffer.slots();
        slots.reverse();
        for slot in slots {
            let r = slot.range();
            slot.fill(&source[r.start as usize..=r.end as usize]).unwrap();
        }
        assert_eq!(buffer.into_bytes().unwrap(), source);
    }

    #[test]
    fn length_mismatch_writes_nothing() {
        let plan = DownloadPlan::new(8, 4, 1).unwrap();
        let mut buffer = AssemblyBuffer::new(&plan).unwrap();

        let mut slots = buffer.slots();
        let second = slots.pop().unwrap();
        let first = slots.pop().unwrap();
        first.fill(&[1, 2, 3, 4]).unwrap();
        let err = second.fill(&[9, 9]).unwrap_err();
        assert!(matches!(
            err,
            TransferError::LengthMismatch { start: 4, end: 7, expected: 4, actual: 2 }
        ));

        assert_eq!(buffer.filled(), 1);
        assert_eq!(&buffer.bytes[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn incomplete_buffer_refuses_bytes() {
        let plan = DownloadPlan::new(8, 4, 1).unwrap();
        let mut buffer = AssemblyBuffer::new(&plan).unwrap();
        let slot = buffer.slots().into_iter().next().unwrap();
        slot.fill(&[0; 4]).unwrap();

        let err = buffer.into_bytes().unwrap_err();
        assert!(matches!(
            err,
            TransferError::IncompleteAssembly { filled: 1, total: 2 }
        ));
    }
}
