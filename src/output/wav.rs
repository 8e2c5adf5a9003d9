//! WAV and raw PCM file writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter as HoundWriter};

use super::pack::interleave;
use super::writer::SampleWriter;
use crate::error::{Error, Result};
use crate::source::{AudioProperties, SampleFormat};

/// Writes extracted samples to a WAV file.
///
/// 64-bit float audio is narrowed to 32-bit float, the widest float WAV
/// `hound` writes.
pub struct WavFileWriter {
    path: PathBuf,
    format: SampleFormat,
    writer: HoundWriter<BufWriter<File>>,
}

impl WavFileWriter {
    /// Create a WAV file matching `properties`.
    pub fn create(path: &Path, properties: &AudioProperties) -> Result<Self> {
        let channels = u16::try_from(properties.channels).map_err(|_| Error::OutputBuffer {
            message: format!("{} channels do not fit a WAV header", properties.channels),
        })?;
        let (bits_per_sample, sample_format) = match properties.format {
            SampleFormat::U8 => (8, WavSampleFormat::Int),
            SampleFormat::S16 => (16, WavSampleFormat::Int),
            SampleFormat::S24 => (24, WavSampleFormat::Int),
            SampleFormat::S32 => (32, WavSampleFormat::Int),
            SampleFormat::F32 | SampleFormat::F64 => (32, WavSampleFormat::Float),
        };
        let spec = WavSpec {
            channels,
            sample_rate: properties.sample_rate,
            bits_per_sample,
            sample_format,
        };

        let writer = HoundWriter::create(path, spec).map_err(|e| Error::WavWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            format: properties.format,
            writer,
        })
    }

    fn write_one(&mut self, bytes: &[u8]) -> hound::Result<()> {
        match self.format {
            SampleFormat::U8 => {
                #[allow(clippy::cast_possible_wrap)]
                let value = (bytes[0] ^ 0x80) as i8;
                self.writer.write_sample(value)
            }
            SampleFormat::S16 => self
                .writer
                .write_sample(i16::from_le_bytes([bytes[0], bytes[1]])),
            SampleFormat::S24 => {
                let stored = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                self.writer.write_sample(stored >> 8)
            }
            SampleFormat::S32 => self
                .writer
                .write_sample(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            SampleFormat::F32 => self
                .writer
                .write_sample(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            SampleFormat::F64 => {
                let mut wide = [0_u8; 8];
                wide.copy_from_slice(&bytes[..8]);
                #[allow(clippy::cast_possible_truncation)]
                let narrowed = f64::from_le_bytes(wide) as f32;
                self.writer.write_sample(narrowed)
            }
        }
    }

    fn wav_error(&self, source: hound::Error) -> Error {
        Error::WavWriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

impl SampleWriter for WavFileWriter {
    fn write_block(&mut self, planes: &[Vec<u8>], count: usize) -> Result<()> {
        let width = self.format.bytes_per_sample();
        for i in 0..count {
            let offset = i * width;
            for plane in planes {
                self.write_one(&plane[offset..offset + width])
                    .map_err(|e| self.wav_error(e))?;
            }
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        let path = self.path;
        self.writer
            .finalize()
            .map_err(|e| Error::WavWriteFailed { path, source: e })
    }
}

/// Writes interleaved raw PCM in the host-packed layout.
pub struct RawFileWriter {
    properties: AudioProperties,
    writer: BufWriter<File>,
}

impl RawFileWriter {
    /// Create (or truncate) a raw PCM file.
    pub fn create(path: &Path, properties: &AudioProperties) -> Result<Self> {
        // Reject formats with no host layout before creating the file.
        properties.host_format()?;
        let file = File::create(path)?;
        Ok(Self {
            properties: properties.clone(),
            writer: BufWriter::new(file),
        })
    }
}

impl SampleWriter for RawFileWriter {
    fn write_block(&mut self, planes: &[Vec<u8>], count: usize) -> Result<()> {
        let packed = interleave(planes, &self.properties, count)?;
        self.writer.write_all(&packed)?;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn props(format: SampleFormat, channels: usize) -> AudioProperties {
        AudioProperties {
            format,
            channels,
            channel_layout: 0,
            sample_rate: 8_000,
            num_samples: 0,
            exact_samples: true,
        }
    }

    #[test]
    fn test_wav_s24_round_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let values = [-8_388_608_i32, 0, 8_388_607];
        let plane: Vec<u8> = values.iter().flat_map(|v| (v << 8).to_le_bytes()).collect();

        let mut writer = Box::new(WavFileWriter::create(&path, &props(SampleFormat::S24, 1)).unwrap());
        writer.write_block(&[plane], 3).unwrap();
        writer.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        let read: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, values);
    }

    #[test]
    fn test_wav_u8_keeps_unsigned_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");

        let mut writer = Box::new(WavFileWriter::create(&path, &props(SampleFormat::U8, 1)).unwrap());
        writer.write_block(&[vec![0x80, 0x00, 0xff]], 3).unwrap();
        writer.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let read: Vec<i8> = reader.samples::<i8>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0, -128, 127]);
    }

    #[test]
    fn test_wav_interleaves_channels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let left: Vec<u8> = [1_i16, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let right: Vec<u8> = [-1_i16, -2].iter().flat_map(|v| v.to_le_bytes()).collect();

        let mut writer = Box::new(WavFileWriter::create(&path, &props(SampleFormat::S16, 2)).unwrap());
        writer.write_block(&[left, right], 2).unwrap();
        writer.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![1, -1, 2, -2]);
    }

    #[test]
    fn test_raw_writer_packs_interleaved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pcm");

        let mut writer = Box::new(RawFileWriter::create(&path, &props(SampleFormat::S16, 2)).unwrap());
        writer.write_block(&[vec![1, 0], vec![2, 0]], 1).unwrap();
        writer.finalize().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_raw_writer_rejects_f64() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pcm");
        assert!(RawFileWriter::create(&path, &props(SampleFormat::F64, 1)).is_err());
        assert!(!path.exists());
    }
}
