//! Hand-off channel between the delivery callback and the encode worker.
//!
//! Unbounded on purpose: the capture path must never block and never
//! drop a frame. The accepted risk is that a sustained mismatch between
//! capture rate and encode rate grows memory without bound; nothing in
//! here silently caps it.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::device::Frame;

/// One queue slot: a real frame, or the end-of-stream sentinel.
pub enum QueueItem {
    Frame(Frame),
    /// No more real items will follow. The consumer loop terminates on
    /// this and on nothing else.
    End,
}

pub fn frame_queue() -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = unbounded();
    (FrameProducer { tx }, FrameConsumer { rx })
}

/// Producer half, held by the delivery callback. Cloneable so the
/// orchestrator can keep a handle for the sentinel.
#[derive(Clone)]
pub struct FrameProducer {
    tx: Sender<QueueItem>,
}

impl FrameProducer {
    /// Non-blocking enqueue. If the consumer is already gone the frame
    /// is dropped on the floor, which recycles its buffer.
    pub fn enqueue(&self, frame: Frame) {
        let _ = self.tx.send(QueueItem::Frame(frame));
    }

    /// Enqueue the end-of-stream sentinel.
    pub fn finish(&self) {
        let _ = self.tx.send(QueueItem::End);
    }
}

/// Consumer half, owned by the encode worker.
pub struct FrameConsumer {
    rx: Receiver<QueueItem>,
}

impl FrameConsumer {
    /// Block until the next item. A disconnected producer is treated as
    /// end of stream so the worker can never hang on a dead channel.
    pub fn dequeue(&self) -> QueueItem {
        self.rx.recv().unwrap_or(QueueItem::End)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded as raw_channel;

    fn test_frame(sequence: u64) -> Frame {
        // The recycle target is irrelevant here; Frame tolerates a
        // closed pool.
        let (tx, _rx) = raw_channel();
        Frame::new(sequence, 2, 2, vec![0u8; 4], tx)
    }

    #[test]
    fn items_come_out_in_fifo_order() {
        let (producer, consumer) = frame_queue();
        for seq in 0..5 {
            producer.enqueue(test_frame(seq));
        }
        producer.finish();

        let mut seen = Vec::new();
        loop {
            match consumer.dequeue() {
                QueueItem::Frame(frame) => seen.push(frame.sequence),
                QueueItem::End => break,
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn dropped_producer_reads_as_end() {
        let (producer, consumer) = frame_queue();
        drop(producer);
        assert!(matches!(consumer.dequeue(), QueueItem::End));
    }

    #[test]
    fn enqueue_after_consumer_gone_does_not_panic() {
        let (producer, consumer) = frame_queue();
        drop(consumer);
        producer.enqueue(test_frame(1));
        producer.finish();
    }
}
