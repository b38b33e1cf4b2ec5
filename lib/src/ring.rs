//! Ring memory pool for variable-length records.
//!
//! Records are allocated at the head and consumed at the tail in strict FIFO
//! order.  Each record is prefixed by a small header holding its payload
//! length.  When a record does not fit between the head and the physical end
//! of the buffer, the head wraps to offset zero and the old head is kept as
//! the wrap point; the reader follows once it reaches that point.
//!
//! The allocating side and the consuming side each only move their own
//! offset, but the pool is a plain `&mut` structure: callers that split
//! production and consumption across contexts must serialize access.

use crate::Error;

/// Bytes in front of every payload: the payload length, little endian.
pub const HEADER_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Not enough contiguous space right now; pop something and retry.
    OutOfMemory,
    /// Bookkeeping is inconsistent.  The pool refuses all work until reset.
    Critical,
}

impl From<PoolError> for Error {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::OutOfMemory => Error::OutOfMemory,
            PoolError::Critical => Error::CriticalPoolCorruption,
        }
    }
}

pub struct RingPool<'buf> {
    mem: &'buf mut [u8],
    // next write offset
    head: usize,
    // next read offset
    tail: usize,
    // end of the live data behind the tail once the head has wrapped
    wrap_point: Option<usize>,
    count: usize,
    last_err: Option<PoolError>,
}

impl<'buf> RingPool<'buf> {
    pub fn new(mem: &'buf mut [u8]) -> Self {
        Self { mem, head: 0, tail: 0, wrap_point: None, count: 0, last_err: None }
    }

    /// Forget all records and any previous error.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.wrap_point = None;
        self.count = 0;
        self.last_err = None;
    }

    pub fn capacity(&self) -> usize {
        self.mem.len()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn wrap_point(&self) -> Option<usize> {
        self.wrap_point
    }

    /// Result of the last allocate or pop.
    pub fn last_error(&self) -> Option<PoolError> {
        self.last_err
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.wrap_point.is_none() && self.head == self.tail
    }

    fn is_corrupt(&self) -> bool {
        self.last_err == Some(PoolError::Critical)
    }

    /// Contiguous bytes available for the next allocation, header included.
    pub fn remaining(&self) -> usize {
        if self.is_corrupt() {
            return 0;
        }
        match self.wrap_point {
            // head trails tail: only the gap between them is free
            Some(_) => self.tail.saturating_sub(self.head),
            None if self.head == self.tail => self.capacity(),
            None => self.capacity().saturating_sub(self.head).max(self.tail),
        }
    }

    /// Reserve `size` bytes at the head and return them for writing.
    ///
    /// A zero-sized request succeeds without allocating anything.
    pub fn allocate(&mut self, size: usize) -> Result<Option<&mut [u8]>, PoolError> {
        self.check()?;
        if size == 0 {
            self.last_err = None;
            return Ok(None);
        }
        let needed = size + HEADER_SIZE;
        if size > u32::MAX as usize || self.remaining() < needed {
            self.last_err = Some(PoolError::OutOfMemory);
            return Err(PoolError::OutOfMemory);
        }

        if self.wrap_point.is_none() {
            if self.head == self.tail {
                // empty: start over at the front, nothing to wrap around
                self.head = 0;
                self.tail = 0;
            } else if self.capacity() - self.head < needed {
                // remaining() promised the space in front of the tail
                self.wrap_point = Some(self.head);
                self.head = 0;
            }
        }

        let start = self.head;
        let end = start + needed;
        let limit = if self.wrap_point.is_some() { self.tail } else { self.capacity() };
        if end > limit {
            return Err(self.corrupt());
        }

        self.mem[start..start + HEADER_SIZE].copy_from_slice(&(size as u32).to_le_bytes());
        self.head = end;
        self.count += 1;
        self.last_err = None;
        Ok(Some(&mut self.mem[start + HEADER_SIZE..end]))
    }

    /// The oldest record's payload, left in place.
    pub fn peek(&self) -> Option<&[u8]> {
        if self.is_corrupt() || self.is_empty() {
            return None;
        }
        self.oldest().map(|(start, end)| &self.mem[start..end])
    }

    /// Drop the oldest record and return its payload length, or 0 if there
    /// was nothing to drop.
    pub fn pop(&mut self) -> usize {
        if self.check().is_err() || self.is_empty() {
            return 0;
        }
        let (start, end) = match self.oldest() {
            Some(span) => span,
            None => {
                self.corrupt();
                return 0;
            }
        };

        match self.wrap_point {
            // continue reading the lap written at the front of the buffer
            Some(wrap) if end >= wrap => {
                self.tail = 0;
                self.wrap_point = None;
            }
            _ => self.tail = end,
        }
        self.count = self.count.saturating_sub(1);
        self.last_err = None;
        end - start
    }

    /// Payload span of the record at the tail, validated against the live region.
    fn oldest(&self) -> Option<(usize, usize)> {
        let limit = self.wrap_point.unwrap_or(self.head);
        let start = self.tail.checked_add(HEADER_SIZE)?;
        if start > limit {
            return None;
        }
        let header = <[u8; HEADER_SIZE]>::try_from(&self.mem[self.tail..start]).ok()?;
        let end = start.checked_add(u32::from_le_bytes(header) as usize)?;
        if end > limit {
            None
        } else {
            Some((start, end))
        }
    }

    fn check(&mut self) -> Result<(), PoolError> {
        if self.is_corrupt() {
            return Err(PoolError::Critical);
        }
        let cap = self.capacity();
        let consistent = match self.wrap_point {
            None => self.tail <= self.head && self.head <= cap,
            Some(wrap) => self.head <= self.tail && self.tail < wrap && wrap <= cap,
        };
        if consistent {
            Ok(())
        } else {
            Err(self.corrupt())
        }
    }

    fn corrupt(&mut self) -> PoolError {
        log::error!("ring pool corrupted: head {} tail {} wrap {:?} capacity {}",
                    self.head, self.tail, self.wrap_point, self.capacity());
        self.last_err = Some(PoolError::Critical);
        PoolError::Critical
    }
}
