/// Sound engine: procedural cues and an ambient loop via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Cues are fire-and-forget (non-blocking) via rodio's Sink, so a
/// cue never stalls the frame loop. The ambient track plays on its own
/// Sink, repeated for the whole session.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{info, warn};

    use crate::config::SoundConfig;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Pre-generated WAV buffers for each cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        _music: Option<Sink>,
        handle: OutputStreamHandle,
        sfx_step: Arc<Vec<u8>>,
        sfx_clear: Arc<Vec<u8>>,
        sfx_victory: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        /// `None` when no output device is available.
        pub fn new(cfg: &SoundConfig) -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, running silent");
                    return None;
                }
            };

            let music = if cfg.music {
                start_music(&handle, cfg.music_volume)
            } else {
                None
            };

            let engine = SoundEngine {
                _stream: stream,
                _music: music,
                handle,
                sfx_step: Arc::new(make_wav(&gen_step())),
                sfx_clear: Arc::new(make_wav(&gen_clear())),
                sfx_victory: Arc::new(make_wav(&gen_victory())),
            };
            info!(music = engine._music.is_some(), "audio ready");
            Some(engine)
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "could not open audio sink");
                    return;
                }
            };
            let cursor = Cursor::new(buf.as_ref().clone());
            match rodio::Decoder::new(cursor) {
                Ok(src) => {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
                Err(e) => warn!(error = %e, "could not decode cue"),
            }
        }

        pub fn play_step(&self) { self.play(&self.sfx_step); }
        pub fn play_level_clear(&self) { self.play(&self.sfx_clear); }
        pub fn play_victory(&self) { self.play(&self.sfx_victory); }
    }

    /// Loop the ambient track on a dedicated sink until the engine drops.
    fn start_music(handle: &OutputStreamHandle, volume: f32) -> Option<Sink> {
        let sink = match Sink::try_new(handle) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not open music sink");
                return None;
            }
        };
        let wav = make_wav(&gen_ambient());
        match rodio::Decoder::new(Cursor::new(wav)) {
            Ok(src) => {
                sink.set_volume(volume);
                sink.append(src.repeat_infinite());
                Some(sink)
            }
            Err(e) => {
                warn!(error = %e, "could not decode music");
                None
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Footstep: very short low thump
    pub(super) fn gen_step() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.03) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let p = i as f32 / n as f32;
                let freq = 180.0 - p * 80.0;
                let env = (1.0 - p).powf(2.0);
                (t * freq * TAU).sin() * env * 0.2
            })
            .collect()
    }

    /// Append one note with harmonics and a gentle decay.
    fn push_note(samples: &mut Vec<f32>, freq: f32, dur: f32, volume: f32) {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32) * 0.3;
            let wave = (t * freq * TAU).sin() * 0.6
                + (t * freq * 2.0 * TAU).sin() * 0.3
                + (t * freq * 3.0 * TAU).sin() * 0.1;
            samples.push(wave * env * volume);
        }
    }

    /// Append a sustained note fading to silence.
    fn push_tail(samples: &mut Vec<f32>, freq: f32, dur: f32, volume: f32) {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            samples.push((t * freq * TAU).sin() * env * volume);
        }
    }

    /// Level clear: ascending arpeggio C5→E5→G5→C6
    pub(super) fn gen_clear() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[523.0_f32, 659.0, 784.0, 1047.0] {
            push_note(&mut samples, freq, 0.1, 0.3);
        }
        push_tail(&mut samples, 1047.0, 0.25, 0.3);
        samples
    }

    /// All levels done: longer fanfare ending on a held chord root
    pub(super) fn gen_victory() -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in &[
            (392.0_f32, 0.12), (523.0, 0.12), (659.0, 0.12),
            (784.0, 0.24), (659.0, 0.12), (784.0, 0.12), (1047.0, 0.2),
        ] {
            push_note(&mut samples, freq, dur, 0.3);
        }
        push_tail(&mut samples, 1047.0, 0.6, 0.3);
        samples
    }

    /// Length of one ambient loop in seconds.
    pub(super) const AMBIENT_SECS: u32 = 8;

    /// Ambient: low drone on A with a slowly pulsing fifth.
    ///
    /// Every frequency completes whole cycles per loop, so the repeat
    /// seam is silent.
    pub(super) fn gen_ambient() -> Vec<f32> {
        let n = (SAMPLE_RATE * AMBIENT_SECS) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let pulse = 0.5 - 0.5 * (t * 0.25 * TAU).cos();
                let drone = (t * 55.0 * TAU).sin() * 0.5
                    + (t * 110.0 * TAU).sin() * 0.2;
                let fifth = (t * 165.0 * TAU).sin() * 0.25 * pulse;
                let shimmer = (t * 440.0 * TAU).sin() * 0.05 * (1.0 - pulse);
                (drone + fifth + shimmer) * 0.6
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new(_cfg: &crate::config::SoundConfig) -> Option<Self> { Some(SoundEngine) }
    pub fn play_step(&self) {}
    pub fn play_level_clear(&self) {}
    pub fn play_victory(&self) {}
}

#[cfg(all(test, feature = "sound"))]
mod tests {
    use super::inner::{gen_ambient, gen_clear, gen_step, gen_victory, make_wav, AMBIENT_SECS};

    #[test]
    fn wav_header_sizes_match_samples() {
        let samples = gen_step();
        let wav = make_wav(&samples);
        assert_eq!(wav.len(), 44 + samples.len() * 2);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size as usize, samples.len() * 2);
    }

    #[test]
    fn cues_stay_in_range() {
        for cue in [gen_step(), gen_clear(), gen_victory(), gen_ambient()] {
            assert!(!cue.is_empty());
            assert!(cue.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn ambient_loop_seam_is_quiet() {
        let track = gen_ambient();
        assert_eq!(track.len(), 22050 * AMBIENT_SECS as usize);
        let first = track[0];
        let last = track[track.len() - 1];
        assert!(first.abs() < 0.05);
        assert!((first - last).abs() < 0.05);
    }

    #[test]
    fn victory_outlasts_level_clear() {
        assert!(gen_victory().len() > gen_clear().len());
    }
}
