/// Display link: presents finished pixel buffers on its own thread and hands
/// each one back once it is no longer being read.
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::error::PipelineError;
use crate::rendering::framebuffer::PixelBuffer;

/// Whatever shows a finished frame: a panel, a window, a file
pub trait FrameSink: Send {
    fn present(&mut self, frame: &PixelBuffer);
}

/// Discards frames
#[derive(Debug, Default)]
pub struct NullSink {
    pub presented: u64,
}

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &PixelBuffer) {
        self.presented += 1;
    }
}

impl<F: FnMut(&PixelBuffer) + Send> FrameSink for F {
    fn present(&mut self, frame: &PixelBuffer) {
        self(frame)
    }
}

pub struct DisplayLink {
    handle: JoinHandle<Box<dyn FrameSink>>,
}

impl DisplayLink {
    /// Present every buffer arriving on `frames` and send it back on `free`.
    /// Stops when `frames` closes; the sink is returned by `join`.
    pub fn spawn(
        mut sink: Box<dyn FrameSink>,
        frames: Receiver<PixelBuffer>,
        free: Sender<PixelBuffer>,
    ) -> Result<Self, PipelineError> {
        let handle = std::thread::Builder::new()
            .name("display".into())
            .spawn(move || {
                for frame in frames.iter() {
                    sink.present(&frame);
                    if free.send(frame).is_err() {
                        break;
                    }
                }
                log::debug!("display link stopped");
                sink
            })
            .map_err(|source| PipelineError::Spawn { name: "display", source })?;
        Ok(Self { handle })
    }

    pub fn join(self) -> Result<Box<dyn FrameSink>, PipelineError> {
        self.handle
            .join()
            .map_err(|_| PipelineError::WorkerStopped("display"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn buffers_come_back_after_present() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let sink = move |frame: &PixelBuffer| {
            counter.fetch_add(frame.pixels.len(), Ordering::Relaxed);
        };

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let (free_tx, free_rx) = crossbeam_channel::bounded(1);
        let link = DisplayLink::spawn(Box::new(sink), frame_rx, free_tx).unwrap();

        for _ in 0..3 {
            frame_tx.send(PixelBuffer::new(4, 2)).unwrap();
            let back = free_rx.recv().unwrap();
            assert_eq!(back.width, 4);
        }
        drop(frame_tx);
        link.join().unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 24);
    }
}
