//! Planar to interleaved repacking in the layout frame-based hosts expect.

use crate::error::{Error, Result};
use crate::source::{AudioProperties, HostSampleType};

/// Interleave `count` samples from each planar buffer.
///
/// 24-bit samples are emitted tightly packed as three bytes, dropping the
/// low padding byte of the left-justified 32-bit storage.
pub fn interleave<P: AsRef<[u8]>>(
    planes: &[P],
    properties: &AudioProperties,
    count: usize,
) -> Result<Vec<u8>> {
    let host = properties.host_format()?;
    let in_bytes = properties.bytes_per_sample();
    let out_bytes = host.bytes_per_sample();

    if planes.len() != properties.channels {
        return Err(Error::OutputBuffer {
            message: format!(
                "expected {} channel buffers, got {}",
                properties.channels,
                planes.len()
            ),
        });
    }
    if let Some(short) = planes.iter().position(|p| p.as_ref().len() < count * in_bytes) {
        return Err(Error::OutputBuffer {
            message: format!("channel {short} holds fewer than {count} samples"),
        });
    }

    // Bytes taken from each stored sample.
    let skip = match host {
        HostSampleType::Int24 => 1,
        _ => 0,
    };

    let mut packed = Vec::with_capacity(count * out_bytes * planes.len());
    for i in 0..count {
        let offset = i * in_bytes + skip;
        for plane in planes {
            packed.extend_from_slice(&plane.as_ref()[offset..offset + out_bytes]);
        }
    }
    Ok(packed)
}
