//! Lock-free cells shared between the control and audio threads.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, Ordering};

/// Control-port value slot.
///
/// Cache-line aligned so neighbouring ports never share a line. The inner
/// value has the size and alignment of an `f32`, so its address can be handed
/// to native code that reads and writes it as a plain float.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }

    /// Raw address of the stored float.
    ///
    /// Stable for as long as `self` does not move. Native writes through this
    /// pointer are single aligned 32-bit stores and never tear.
    #[inline]
    pub fn as_mut_ptr(&self) -> *mut f32 {
        (&self.value as *const AtomicF32).cast_mut().cast::<f32>()
    }
}

/// Cross-thread flag: slot faults and single-processor ownership.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    /// Store `value`, returning the previous one. Used to claim ownership.
    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}
