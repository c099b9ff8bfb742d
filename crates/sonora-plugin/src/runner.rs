//! Block processing.
//!
//! Real-time safe: no allocation, no locking, no logging on the normal path.

use crate::binder::{AudioBuffers, BoundInstance};
use crate::error::{HostError, Result};
use crate::instance::{Instance, InstanceState};

impl BoundInstance<'_> {
    /// Process `frames` samples through the plugin.
    ///
    /// Running an instance that is not active is a caller bug: it panics in
    /// debug builds and is skipped in release builds. `frames` beyond
    /// [`frames_available`](Self::frames_available) is treated the same way
    /// and truncated.
    pub fn run(&mut self, frames: usize) {
        let instance = &mut *self.instance;
        if instance.state != InstanceState::Active {
            debug_assert!(
                false,
                "run on {} instance of {}",
                instance.state,
                instance.descriptor().uri()
            );
            tracing::warn!(
                "Skipping run on {} instance of {}",
                instance.state,
                instance.descriptor().uri()
            );
            return;
        }

        let frames = if frames > self.frames {
            debug_assert!(
                false,
                "run of {} frames exceeds bound buffers ({})",
                frames, self.frames
            );
            self.frames
        } else {
            frames
        };

        if frames == 0 {
            return;
        }

        // SAFETY: every connected audio buffer holds at least `self.frames`
        // samples and is borrowed by `self`; control values outlive the instance.
        unsafe { instance.native.run(frames) };
    }

    /// Checked [`run`](Self::run) for offline callers: misuse is an error
    /// instead of an assertion.
    pub fn try_run(&mut self, frames: usize) -> Result<()> {
        let state = self.instance.state;
        if state != InstanceState::Active {
            return Err(HostError::InvalidStateTransition {
                from: state,
                operation: "run",
            });
        }
        self.run(frames.min(self.frames));
        Ok(())
    }
}

impl Instance {
    /// [`bind`](Self::bind) then run `frames`, capped at the caller's buffers.
    ///
    /// Returns `false` without running when a connected buffer is shorter than
    /// the block (the scratch output of a stereo plugin on a mono path is only
    /// `max_block_size` long). A block is never partly processed.
    pub fn process(&mut self, buffers: &mut AudioBuffers<'_>, frames: usize) -> bool {
        let frames = frames.min(buffers.frames());
        let mut bound = self.bind(buffers);
        if bound.frames_available() < frames {
            return false;
        }
        bound.run(frames);
        true
    }
}
