/// Frame handoff between the world loop and the raster worker.
///
/// A frame is started (queues sent to the worker), finished (the worker hands
/// the job back) and swapped (the rendered buffer goes to the display and the
/// generation flips). Any other order is a logic error in the caller.
use crate::error::PipelineError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HandoffState {
    /// No job in flight
    #[default]
    Idle,
    /// The raster worker owns a job
    Rendering,
    /// The job is back; its buffer still has to be presented
    AwaitingSwap,
}

#[derive(Debug, Default)]
pub struct Handoff {
    state: HandoffState,
    frames: u64,
}

impl Handoff {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Completed start/finish/swap cycles
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn transition(&mut self, from: HandoffState, to: HandoffState, event: &'static str) -> Result<(), PipelineError> {
        if self.state != from {
            return Err(PipelineError::Handoff {
                state: self.state,
                event,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.transition(HandoffState::Idle, HandoffState::Rendering, "start")
    }

    pub fn finish(&mut self) -> Result<(), PipelineError> {
        self.transition(HandoffState::Rendering, HandoffState::AwaitingSwap, "finish")
    }

    pub fn swap(&mut self) -> Result<(), PipelineError> {
        self.transition(HandoffState::AwaitingSwap, HandoffState::Idle, "swap")?;
        self.frames += 1;
        Ok(())
    }
}
