use log::debug;

use crate::{
    error::AudioError,
    wav_header::{WavHeader, HEADER_LEN},
};

pub const WAV_CONTENT_TYPE: &str = "audio/wav";
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

/// A complete RIFF/WAVE file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBlob {
    pub bytes: Vec<u8>,
}

impl WavBlob {
    pub fn content_type(&self) -> &'static str {
        WAV_CONTENT_TYPE
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn header(&self) -> Result<WavHeader, AudioError> {
        WavHeader::parse(&self.bytes)
    }

    /// The data sub-chunk, exactly as many bytes as the header declares.
    pub fn pcm_data(&self) -> Result<&[u8], AudioError> {
        let header = self.header()?;
        let start = header.data_start();
        let end = start + header.data_size as usize;
        if end > self.bytes.len() {
            return Err(AudioError::InvalidHeader(format!(
                "data chunk declares {} bytes but only {} follow the header",
                header.data_size,
                self.bytes.len() - start
            )));
        }
        Ok(&self.bytes[start..end])
    }
}

fn data_size(len: usize) -> Result<u32, AudioError> {
    u32::try_from(len).map_err(|_| AudioError::InvalidFormat(format!("{} pcm bytes is too large for wav", len)))
}

/// Wraps mono s16le PCM in a canonical 44-byte WAV header.
pub fn encode_wav(pcm: &[u8], sample_rate: u32) -> Result<WavBlob, AudioError> {
    let header = WavHeader::pcm(sample_rate, CHANNELS, BITS_PER_SAMPLE, data_size(pcm.len())?)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + pcm.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(pcm);

    debug!("encoded {} pcm bytes at {} Hz into wav", pcm.len(), sample_rate);

    Ok(WavBlob { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sine;
    use std::io::Cursor;
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::probe::Hint;

    #[test]
    fn round_trips_pcm_data() {
        let pcm: Vec<u8> = (0..=255u8).collect();
        let blob = encode_wav(&pcm, 24000).unwrap();

        assert_eq!(blob.content_type(), "audio/wav");
        assert_eq!(blob.pcm_data().unwrap(), &pcm[..]);
        assert_eq!(blob.header().unwrap().data_size as usize, pcm.len());
    }

    #[test]
    fn header_rates_for_24k_mono() {
        let blob = encode_wav(&[0, 0, 1, 0], 24000).unwrap();
        let header = blob.header().unwrap();

        assert_eq!(header.number_of_channels, 1);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.bytes_per_second, 48000);
        assert_eq!(header.bytes_per_frame, 2);
        assert_eq!(header.file_size, 36 + 4);
    }

    #[test]
    fn empty_pcm_is_header_only() {
        let blob = encode_wav(&[], 24000).unwrap();
        assert_eq!(blob.len(), 44);
        assert!(blob.pcm_data().unwrap().is_empty());
    }

    #[test]
    fn oversized_rate_is_an_error() {
        assert!(matches!(encode_wav(&[0, 0], 3_000_000_000), Err(AudioError::InvalidFormat(_))));
        assert!(matches!(encode_wav(&[0, 0], 0), Err(AudioError::InvalidFormat(_))));
        assert_eq!(encode_wav(&[0, 0], 192_000).unwrap().header().unwrap().bytes_per_second, 384_000);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn data_past_four_gib_is_an_error() {
        assert_eq!(data_size(u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(data_size(u32::MAX as usize + 1), Err(AudioError::InvalidFormat(_))));
    }

    #[test]
    fn truncated_blob_is_an_error() {
        let mut blob = encode_wav(&[1, 2, 3, 4], 24000).unwrap();
        blob.bytes.truncate(46);
        assert!(matches!(blob.pcm_data(), Err(AudioError::InvalidHeader(_))));
    }

    #[test]
    fn tone_container_length() {
        let pcm = sine::tone_pcm(440.0, 2.0, 24000);
        let blob = encode_wav(&pcm, 24000).unwrap();
        assert_eq!(blob.len(), 44 + pcm.len());
    }

    #[test]
    fn opens_with_a_standard_reader() {
        let pcm = sine::tone_pcm(220.0, 0.25, 24000);
        let blob = encode_wav(&pcm, 24000).unwrap();

        let mss = MediaSourceStream::new(Box::new(Cursor::new(blob.bytes.clone())), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("wav");
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &Default::default(), &Default::default())
            .unwrap();
        let mut format = probed.format;

        let track = format.default_track().unwrap();
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        assert_eq!(codec_params.sample_rate, Some(24000));
        assert_eq!(codec_params.channels.map(|c| c.count()), Some(1));
        assert_eq!(codec_params.n_frames, Some(pcm.len() as u64 / 2));

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &Default::default())
            .unwrap();

        let mut decoded: Vec<i16> = Vec::new();
        while let Ok(packet) = format.next_packet() {
            if packet.track_id() != track_id {
                continue;
            }
            let audio_buf = decoder.decode(&packet).unwrap();
            let mut sample_buf = SampleBuffer::<i16>::new(audio_buf.capacity() as u64, *audio_buf.spec());
            sample_buf.copy_interleaved_ref(audio_buf);
            decoded.extend_from_slice(sample_buf.samples());
        }

        let expected: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(decoded, expected);
    }
}
