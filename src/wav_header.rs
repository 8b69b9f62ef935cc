use crate::error::AudioError;

pub const HEADER_LEN: usize = 44;
pub const FORMAT_PCM: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WavHeader {
    pub riff: [u8; 4],
    pub file_size: u32, // 36 + data_size for the canonical layout
    pub file_type: [u8; 4],
    pub format_chunk_marker: [u8; 4],
    pub format_data_length: u32,
    pub format_type: u16,
    pub number_of_channels: u16,
    pub sample_rate: u32,
    pub bytes_per_second: u32,
    pub bytes_per_frame: u16,
    pub bits_per_sample: u16,
    pub data_chunk_marker: [u8; 4],
    pub data_size: u32,
    data_start: usize,
}

fn find_chunk(bytes: &[u8], start: usize, name: &[u8]) -> Option<usize> {
    if start >= bytes.len() {
        return None;
    }
    bytes[start..]
        .windows(name.len())
        .position(|w| w == name)
        .map(|i| start + i)
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_tag(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

impl WavHeader {
    /// Canonical 44-byte header for integer PCM. Fails when a derived field
    /// does not fit its 32-bit slot.
    pub fn pcm(
        sample_rate: u32,
        number_of_channels: u16,
        bits_per_sample: u16,
        data_size: u32,
    ) -> Result<WavHeader, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidFormat("sample rate must be positive".into()));
        }
        let bytes_per_frame = number_of_channels
            .checked_mul(bits_per_sample / 8)
            .ok_or_else(|| AudioError::InvalidFormat(format!("{} channels is too many", number_of_channels)))?;
        let bytes_per_second = sample_rate.checked_mul(bytes_per_frame as u32).ok_or_else(|| {
            AudioError::InvalidFormat(format!("byte rate for {} Hz does not fit in 32 bits", sample_rate))
        })?;
        let file_size = data_size
            .checked_add(36)
            .ok_or_else(|| AudioError::InvalidFormat(format!("{} data bytes is too large for wav", data_size)))?;

        Ok(WavHeader {
            riff: *b"RIFF",
            file_size,
            file_type: *b"WAVE",
            format_chunk_marker: *b"fmt ",
            format_data_length: FMT_CHUNK_LEN,
            format_type: FORMAT_PCM,
            number_of_channels,
            sample_rate,
            bytes_per_second,
            bytes_per_frame,
            bits_per_sample,
            data_chunk_marker: *b"data",
            data_size,
            data_start: HEADER_LEN,
        })
    }

    pub fn parse(header_bytes: &[u8]) -> Result<WavHeader, AudioError> {
        if header_bytes.len() < HEADER_LEN {
            return Err(AudioError::InvalidHeader(format!(
                "should be at least {} bytes, but was {}",
                HEADER_LEN,
                header_bytes.len()
            )));
        }

        let riff = read_tag(header_bytes, 0);
        let file_type = read_tag(header_bytes, 8);
        if &riff != b"RIFF" || &file_type != b"WAVE" {
            return Err(AudioError::InvalidHeader("missing RIFF/WAVE tags".into()));
        }

        let format_data_length = read_u32(header_bytes, 16);
        let data_chunk_start = find_chunk(header_bytes, 20 + format_data_length as usize, b"data")
            .ok_or_else(|| AudioError::InvalidHeader("could not find data chunk".into()))?;

        let needed_byte_len = data_chunk_start + 8;
        if header_bytes.len() < needed_byte_len {
            return Err(AudioError::InvalidHeader(format!(
                "should be at least {} bytes, but was {}",
                needed_byte_len,
                header_bytes.len()
            )));
        }

        Ok(WavHeader {
            riff,
            file_size: read_u32(header_bytes, 4),
            file_type,
            format_chunk_marker: read_tag(header_bytes, 12),
            format_data_length,
            format_type: read_u16(header_bytes, 20),
            number_of_channels: read_u16(header_bytes, 22),
            sample_rate: read_u32(header_bytes, 24),
            bytes_per_second: read_u32(header_bytes, 28),
            bytes_per_frame: read_u16(header_bytes, 32),
            bits_per_sample: read_u16(header_bytes, 34),
            data_chunk_marker: read_tag(header_bytes, data_chunk_start),
            data_size: read_u32(header_bytes, data_chunk_start + 4),
            data_start: needed_byte_len,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.riff);
        out[4..8].copy_from_slice(&self.file_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.file_type);
        out[12..16].copy_from_slice(&self.format_chunk_marker);
        out[16..20].copy_from_slice(&self.format_data_length.to_le_bytes());
        out[20..22].copy_from_slice(&self.format_type.to_le_bytes());
        out[22..24].copy_from_slice(&self.number_of_channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.bytes_per_second.to_le_bytes());
        out[32..34].copy_from_slice(&self.bytes_per_frame.to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(&self.data_chunk_marker);
        out[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    /// Byte offset of the first PCM sample.
    pub fn data_start(&self) -> usize {
        self.data_start
    }
}
