// WAV codec - file edge of the engine
//
// Clips are read as interleaved f32 whatever the on-disk format and always
// written as 32-bit float.

use std::path::Path;

use super::clip::Clip;
use crate::error::AudioError;

fn codec_error(path: &Path, err: impl std::fmt::Display) -> AudioError {
    AudioError::WavCodec {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Load a WAV file into a clip named after the file stem.
///
/// Integer PCM is scaled into [-1, 1) by `1 << (bits - 1)`.
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<Clip, AudioError> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path).map_err(|e| codec_error(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(AudioError::UnsupportedFormat {
                    details: format!("{}-bit float WAV", spec.bits_per_sample),
                });
            }
            reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| codec_error(path, e))?
        }
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::UnsupportedFormat {
                    details: format!("{}-bit integer WAV", spec.bits_per_sample),
                });
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| codec_error(path, e))?
        }
    };

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let clip = Clip::new(name, spec.sample_rate, spec.channels as usize, samples);
    log::info!("[Wav] Loaded {} from {}", clip, path.display());
    Ok(clip)
}

/// Write `clip` as a 32-bit float WAV.
pub fn save_wav<P: AsRef<Path>>(path: P, clip: &Clip) -> Result<(), AudioError> {
    let path = path.as_ref();
    let channels = u16::try_from(clip.channels()).map_err(|_| AudioError::UnsupportedFormat {
        details: format!("{} channels", clip.channels()),
    })?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: clip.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| codec_error(path, e))?;
    for &sample in clip.samples() {
        writer
            .write_sample(sample)
            .map_err(|e| codec_error(path, e))?;
    }
    writer.finalize().map_err(|e| codec_error(path, e))?;

    log::info!("[Wav] Saved {} to {}", clip, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("multitrack_wav_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_save_then_load_float() {
        let path = temp_path("float.wav");
        let clip = Clip::new("x", 48000, 2, vec![0.5, -0.5, 0.25, -0.25]);
        save_wav(&path, &clip).expect("save");

        let loaded = load_wav(&path).expect("load");
        assert_eq!(loaded.sample_rate(), 48000);
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.samples(), clip.samples());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_int16_scales_to_unit_range() {
        let path = temp_path("int16.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for v in [0i16, 16384, -32768] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let loaded = load_wav(&path).expect("load");
        assert_eq!(loaded.samples(), &[0.0, 0.5, -1.0]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_codec_error() {
        let result = load_wav(temp_path("does_not_exist.wav"));
        assert!(matches!(result, Err(AudioError::WavCodec { .. })));
    }
}
