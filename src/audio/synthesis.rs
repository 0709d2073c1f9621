//! Procedural demo track rendered by Glicol.

use glicol::Engine;
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::params::audio_constants::BLOCK_SIZE;

/// Glicol composition (procedural music code): a kick-driven bass line so
/// the equalizer has low-end hits to react to
pub const DEMO_COMPOSITION: &str = r#"
~gate: speed 2.0 >> seq 60 _60 _~a 48
~a: choose 48 48 48 72 0 0 0
~amp: ~gate >> envperc 0.001 0.2
~pit: ~gate >> mul 55.0
~bass: saw ~pit >> mul ~amp >> lpf ~mod 3.0 >> mul 0.3
~mod: sin 0.2 >> mul 300 >> add 400
~kick: speed 4.0 >> seq 60 >> bd 0.2 >> mul 0.8
o: mix ~bass ~kick >> plate 0.1
"#;

/// Stereo frame generator backed by a Glicol engine
pub struct DemoSynth {
    engine: Engine<BLOCK_SIZE>,
    pending: VecDeque<[f32; 2]>,
}

impl DemoSynth {
    pub fn new(sample_rate: u32) -> Result<Self> {
        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(sample_rate as usize);
        engine.update_with_code(DEMO_COMPOSITION);
        engine
            .update()
            .map_err(|e| Error::Audio(format!("Glicol engine init failed: {:?}", e)))?;

        Ok(Self {
            engine,
            pending: VecDeque::with_capacity(BLOCK_SIZE),
        })
    }

    /// Next stereo frame, rendering a fresh block when the last one is used up
    pub fn next_frame(&mut self) -> [f32; 2] {
        if self.pending.is_empty() {
            let (buffers, _) = self.engine.next_block(vec![]);
            for i in 0..BLOCK_SIZE {
                let left = buffers[0][i];
                let right = buffers.get(1).map_or(left, |b| b[i]);
                self.pending.push_back([left, right]);
            }
        }
        self.pending.pop_front().unwrap_or([0.0; 2])
    }
}
