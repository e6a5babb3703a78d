//! Real/imaginary channel views of complex bins.

use mela_core::keys::Channel;
use mela_jack::Bins;
use num_complex::Complex64;

/// Component of `value` selected by `channel`.
pub fn component(value: Complex64, channel: Channel) -> f64 {
    match channel {
        Channel::Re => value.re,
        Channel::Im => value.im,
    }
}

/// Real-valued bins of one channel.
pub fn channel_bins(bins: &Bins<Complex64>, channel: Channel) -> Bins<f64> {
    bins.map(|v| component(v, channel))
}
