//! Port binding.
//!
//! Control ports are connected once, at instantiation, to the slot's
//! [`ControlStorage`]. Audio ports are connected per block by
//! [`Instance::bind`], and only reconnected when the host hands over a
//! different buffer than the one already connected.
//!
//! Routing: the first audio input/output is the left channel, the second
//! the right channel. Further audio ports stay unconnected. A plugin with a
//! right input but no right buffer reads the left buffer on both; a right
//! output with no right buffer writes into the instance's scratch buffer.

use crate::backend::NativeInstance;
use crate::controls::ControlStorage;
use crate::instance::Instance;
use crate::port::PortTable;

/// Host audio buffers for one block.
pub struct AudioBuffers<'a> {
    pub in_left: &'a [f32],
    pub in_right: Option<&'a [f32]>,
    pub out_left: &'a mut [f32],
    pub out_right: Option<&'a mut [f32]>,
}

impl<'a> AudioBuffers<'a> {
    pub fn mono(input: &'a [f32], output: &'a mut [f32]) -> Self {
        Self {
            in_left: input,
            in_right: None,
            out_left: output,
            out_right: None,
        }
    }

    pub fn stereo(
        in_left: &'a [f32],
        in_right: &'a [f32],
        out_left: &'a mut [f32],
        out_right: &'a mut [f32],
    ) -> Self {
        Self {
            in_left,
            in_right: Some(in_right),
            out_left,
            out_right: Some(out_right),
        }
    }

    /// Frames every supplied buffer can hold.
    pub fn frames(&self) -> usize {
        let mut frames = self.in_left.len().min(self.out_left.len());
        if let Some(right) = self.in_right {
            frames = frames.min(right.len());
        }
        if let Some(right) = self.out_right.as_deref() {
            frames = frames.min(right.len());
        }
        frames
    }

    /// Copy inputs straight to outputs. Used when no instance can run.
    pub fn bypass(&mut self, frames: usize) {
        let frames = frames.min(self.frames());
        self.out_left[..frames].copy_from_slice(&self.in_left[..frames]);
        if let Some(out) = self.out_right.as_deref_mut() {
            let source = self.in_right.unwrap_or(self.in_left);
            out[..frames].copy_from_slice(&source[..frames]);
        }
    }
}

/// Audio port indices of an instance, by channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioRouting {
    pub in_left: Option<usize>,
    pub in_right: Option<usize>,
    pub out_left: Option<usize>,
    pub out_right: Option<usize>,
}

impl AudioRouting {
    fn from_ports(ports: &PortTable) -> Self {
        let mut inputs = ports.iter().filter(|p| p.is_audio_input()).map(|p| p.index);
        let mut outputs = ports.iter().filter(|p| p.is_audio_output()).map(|p| p.index);
        Self {
            in_left: inputs.next(),
            in_right: inputs.next(),
            out_left: outputs.next(),
            out_right: outputs.next(),
        }
    }

    fn as_array(&self) -> [Option<usize>; 4] {
        [self.in_left, self.in_right, self.out_left, self.out_right]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Connection {
    addr: usize,
    len: usize,
}

impl Connection {
    fn of(ptr: *const f32, len: usize) -> Self {
        Self {
            addr: ptr as usize,
            len,
        }
    }
}

/// Per-instance audio connection state.
#[derive(Debug, Default)]
pub(crate) struct AudioBindings {
    routing: AudioRouting,
    connected: [Option<Connection>; 4],
}

impl AudioBindings {
    pub(crate) fn new(ports: &PortTable) -> Self {
        Self {
            routing: AudioRouting::from_ports(ports),
            connected: [None; 4],
        }
    }
}

pub(crate) fn connect_controls(native: &mut dyn NativeInstance, controls: &ControlStorage) {
    for (index, value) in controls.addresses() {
        // SAFETY: the values live in a boxed slice owned by `controls`, which
        // every instance keeps alive through its `Arc` until it is freed.
        unsafe { native.connect_port(index, value) };
    }
}

/// An instance whose audio ports point at the current block's buffers.
///
/// Borrows both the instance and the buffers, so neither can change until
/// the block has run.
pub struct BoundInstance<'a> {
    pub(crate) instance: &'a mut Instance,
    pub(crate) frames: usize,
}

impl BoundInstance<'_> {
    /// Largest frame count every connected buffer can hold.
    pub fn frames_available(&self) -> usize {
        self.frames
    }
}

impl Instance {
    pub fn audio_routing(&self) -> AudioRouting {
        self.audio.routing
    }

    /// Connect the audio ports to `buffers`.
    pub fn bind<'a>(&'a mut self, buffers: &'a mut AudioBuffers<'_>) -> BoundInstance<'a> {
        let in_left = Connection::of(buffers.in_left.as_ptr(), buffers.in_left.len());
        let in_right = buffers
            .in_right
            .map(|right| Connection::of(right.as_ptr(), right.len()))
            .unwrap_or(in_left);
        let out_left = Connection::of(buffers.out_left.as_mut_ptr(), buffers.out_left.len());
        let out_right = match buffers.out_right.as_deref_mut() {
            Some(right) => Connection::of(right.as_mut_ptr(), right.len()),
            None => Connection::of(self.scratch.as_mut_ptr(), self.scratch.len()),
        };
        let targets = [in_left, in_right, out_left, out_right];

        let mut frames = buffers.frames();
        for (channel, port) in self.audio.routing.as_array().into_iter().enumerate() {
            let Some(port) = port else { continue };
            let target = targets[channel];
            frames = frames.min(target.len);
            if self.audio.connected[channel] != Some(target) {
                // SAFETY: the returned `BoundInstance` borrows `buffers` (and
                // `self.scratch`) for as long as the plugin may run against
                // them. Input buffers are only read by the plugin.
                unsafe { self.native.connect_port(port, target.addr as *mut f32) };
                self.audio.connected[channel] = Some(target);
            }
        }

        BoundInstance {
            instance: self,
            frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginDescriptor;
    use crate::testing::MockPlugin;
    use std::sync::Arc;

    fn instance(plugin: MockPlugin) -> Instance {
        let descriptor = Arc::new(PluginDescriptor::new(Arc::new(plugin)));
        let controls = Arc::new(ControlStorage::new(descriptor.ports()));
        Instance::create_active(descriptor, controls, 48000, 64).unwrap()
    }

    #[test]
    fn test_routing_uses_first_two_audio_ports() {
        let stereo = instance(MockPlugin::stereo_gain("urn:example:stereo"));
        assert_eq!(
            stereo.audio_routing(),
            AudioRouting {
                in_left: Some(0),
                in_right: Some(1),
                out_left: Some(2),
                out_right: Some(3),
            }
        );

        let mono = instance(MockPlugin::gain("urn:example:gain"));
        assert_eq!(mono.audio_routing().in_right, None);
        assert_eq!(mono.audio_routing().out_right, None);
    }

    #[test]
    fn test_mono_plugin_never_sees_right_buffers() {
        let plugin = MockPlugin::gain("urn:example:gain");
        let log = plugin.connection_log();
        let mut instance = instance(plugin);

        let in_l = [0.0f32; 16];
        let in_r = [0.0f32; 16];
        let mut out_l = [0.0f32; 16];
        let mut out_r = [0.0f32; 16];
        let right_addrs = [in_r.as_ptr() as usize, out_r.as_ptr() as usize];

        let mut buffers = AudioBuffers::stereo(&in_l, &in_r, &mut out_l, &mut out_r);
        instance.bind(&mut buffers).run(16);

        let log = log.lock();
        assert!(log.iter().all(|(_, addr)| !right_addrs.contains(addr)));
        assert!(log.iter().all(|(index, _)| [0, 1, 2].contains(index)));
    }

    #[test]
    fn test_missing_right_buffers_fall_back() {
        let plugin = MockPlugin::stereo_gain("urn:example:stereo");
        let log = plugin.connection_log();
        let mut instance = instance(plugin);
        let scratch = instance.scratch.as_ptr() as usize;

        let input = [0.5f32; 32];
        let mut output = [0.0f32; 32];
        let left_in = input.as_ptr() as usize;
        let mut buffers = AudioBuffers::mono(&input, &mut output);
        let bound = instance.bind(&mut buffers);
        assert_eq!(bound.frames_available(), 32);

        let log = log.lock();
        assert!(log.contains(&(0, left_in)));
        assert!(log.contains(&(1, left_in)));
        assert!(log.contains(&(3, scratch)));
    }

    #[test]
    fn test_reconnects_only_on_buffer_change() {
        let plugin = MockPlugin::gain("urn:example:gain");
        let log = plugin.connection_log();
        let mut instance = instance(plugin);

        let input = vec![0.0f32; 64];
        let mut output = vec![0.0f32; 64];
        for _ in 0..3 {
            let mut buffers = AudioBuffers::mono(&input, &mut output);
            instance.bind(&mut buffers).run(64);
        }
        // gain_db at create, then in + out once.
        assert_eq!(log.lock().len(), 3);

        let other = vec![0.0f32; 64];
        let mut buffers = AudioBuffers::mono(&other, &mut output);
        instance.bind(&mut buffers).run(64);
        assert_eq!(log.lock().len(), 4);
        assert_eq!(log.lock().last(), Some(&(0, other.as_ptr() as usize)));
    }

    #[test]
    fn test_frames_limited_by_shortest_buffer() {
        let mut instance = instance(MockPlugin::stereo_gain("urn:example:stereo"));
        let input = [0.0f32; 128];
        let mut output = [0.0f32; 128];
        let mut buffers = AudioBuffers::mono(&input, &mut output);
        // Right output lands in the 64-frame scratch buffer.
        assert_eq!(instance.bind(&mut buffers).frames_available(), 64);
    }

    #[test]
    fn test_bypass_copies_input() {
        let in_l = [1.0f32, 2.0, 3.0];
        let in_r = [4.0f32, 5.0, 6.0];
        let mut out_l = [0.0f32; 3];
        let mut out_r = [0.0f32; 3];
        {
            let mut buffers = AudioBuffers::stereo(&in_l, &in_r, &mut out_l, &mut out_r);
            buffers.bypass(3);
        }
        assert_eq!(out_l, in_l);
        assert_eq!(out_r, in_r);
    }
}
