use std::mem;
use std::sync::{PoisonError, RwLock};

// ===== Буфер записей =====

/// Накопитель байтов под RwLock.
///
/// `append` и `drain` берут блокировку на запись, `len` на чтение, так что
/// опрос размера не мешает производителям. `drain` забирает всё содержимое
/// целиком и оставляет буфер пустым: один и тот же байт не может вернуться
/// из двух вызовов.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    buf: RwLock<Vec<u8>>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RecordBuffer {
            buf: RwLock::new(Vec::with_capacity(capacity)),
        }
    }

    /// Дописывает запись и возвращает длину буфера после неё.
    pub fn append(&self, bytes: &[u8]) -> usize {
        let mut buf = self.buf.write().unwrap_or_else(PoisonError::into_inner);
        buf.extend_from_slice(bytes);
        buf.len()
    }

    pub fn len(&self) -> usize {
        self.buf.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Забирает всё накопленное. На пустом буфере ничего не делает.
    pub fn drain(&self) -> Vec<u8> {
        let mut buf = self.buf.write().unwrap_or_else(PoisonError::into_inner);
        if buf.is_empty() {
            return Vec::new();
        }
        let capacity = buf.capacity();
        mem::replace(&mut *buf, Vec::with_capacity(capacity))
    }

    /// Возвращает ранее забранный блок в начало буфера, если итоговый размер
    /// не превысит `limit`. Вызывается только тем же путём сброса, что и
    /// `drain`, поэтому порядок записей сохраняется.
    pub(crate) fn restore(&self, block: Vec<u8>, limit: usize) -> bool {
        let mut buf = self.buf.write().unwrap_or_else(PoisonError::into_inner);
        if block.len() + buf.len() > limit {
            return false;
        }
        let tail = mem::replace(&mut *buf, block);
        buf.extend_from_slice(&tail);
        true
    }

    #[cfg(test)]
    pub(crate) fn hold(&self) -> std::sync::RwLockWriteGuard<'_, Vec<u8>> {
        self.buf.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drain_returns_everything_and_resets() {
        let buffer = RecordBuffer::new();
        assert_eq!(buffer.append(b"first\n"), 6);
        assert_eq!(buffer.append(b"second\n"), 13);

        assert_eq!(buffer.drain(), b"first\nsecond\n".to_vec());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn drain_on_empty_buffer_is_noop() {
        let buffer = RecordBuffer::with_capacity(64);
        assert!(buffer.drain().is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn concurrent_appends_keep_per_producer_order() {
        let buffer = Arc::new(RecordBuffer::new());
        let producers = 8;
        let per_producer = 500;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        buffer.append(format!("{}:{}\n", p, i).as_bytes());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let expected_len = buffer.len();
        let drained = buffer.drain();
        assert_eq!(drained.len(), expected_len);
        assert_eq!(buffer.len(), 0);

        let text = String::from_utf8(drained).unwrap();
        let mut next = vec![0usize; producers];
        for line in text.lines() {
            let (p, i) = line.split_once(':').unwrap();
            let p: usize = p.parse().unwrap();
            let i: usize = i.parse().unwrap();
            assert_eq!(i, next[p], "producer {} out of order", p);
            next[p] += 1;
        }
        assert!(next.iter().all(|&n| n == per_producer));
    }

    #[test]
    fn restore_puts_block_in_front() {
        let buffer = RecordBuffer::new();
        buffer.append(b"a\n");
        let block = buffer.drain();
        buffer.append(b"b\n");

        assert!(buffer.restore(block, 1024));
        assert_eq!(buffer.drain(), b"a\nb\n".to_vec());
    }

    #[test]
    fn restore_respects_limit() {
        let buffer = RecordBuffer::new();
        buffer.append(b"0123456789");
        assert!(!buffer.restore(b"abcdef".to_vec(), 12));
        assert_eq!(buffer.len(), 10);
    }
}
