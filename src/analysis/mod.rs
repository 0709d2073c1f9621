//! Frequency-domain sampling of the playing audio.
//!
//! The renderer only ever sees the [`FrequencySampler`] contract; the
//! analyser behind it is created and owned by the audio collaborator.

mod analyser;
mod window;

use std::sync::Arc;

pub use analyser::AnalyserNode;
pub use window::blackman_window;

/// Read-only source of spectrum snapshots
pub trait FrequencySampler {
    /// Number of bins in every snapshot (fixed for the sampler's lifetime)
    fn frequency_bin_count(&self) -> usize;

    /// Fill `out` with the current per-bin energy (0-255)
    ///
    /// Must not block; called once per animation frame.
    fn sample_spectrum(&self, out: &mut [u8]);
}

impl<S: FrequencySampler + ?Sized> FrequencySampler for &S {
    fn frequency_bin_count(&self) -> usize {
        (**self).frequency_bin_count()
    }

    fn sample_spectrum(&self, out: &mut [u8]) {
        (**self).sample_spectrum(out)
    }
}

impl<S: FrequencySampler + ?Sized> FrequencySampler for Arc<S> {
    fn frequency_bin_count(&self) -> usize {
        (**self).frequency_bin_count()
    }

    fn sample_spectrum(&self, out: &mut [u8]) {
        (**self).sample_spectrum(out)
    }
}
