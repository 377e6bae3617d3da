// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WAV decode, concatenate, and re-encode.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use snare_core::{AudioFormat, SnareError};
use tracing::{debug, warn};

enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

fn decode(bytes: &[u8]) -> Result<(WavSpec, Samples), hound::Error> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Int => Samples::Int(reader.samples::<i32>().collect::<Result<_, _>>()?),
        SampleFormat::Float => Samples::Float(reader.samples::<f32>().collect::<Result<_, _>>()?),
    };
    Ok((spec, samples))
}

/// Decodes each chunk independently and re-encodes the concatenated
/// samples as one WAV file.
///
/// Chunks that fail to decode, or whose sample format differs from the
/// first decodable chunk, are dropped. Returns `None` when nothing decoded.
pub fn merge_wav_chunks(chunks: &[Vec<u8>]) -> Option<Vec<u8>> {
    let mut spec: Option<WavSpec> = None;
    let mut ints: Vec<i32> = Vec::new();
    let mut floats: Vec<f32> = Vec::new();
    let mut merged = 0usize;

    for (index, chunk) in chunks.iter().enumerate() {
        let (chunk_spec, samples) = match decode(chunk) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(index, error = %e, "dropping undecodable wav chunk");
                continue;
            }
        };
        match spec {
            None => spec = Some(chunk_spec),
            Some(s) if s != chunk_spec => {
                warn!(index, ?chunk_spec, expected = ?s, "dropping wav chunk with mismatched format");
                continue;
            }
            Some(_) => {}
        }
        match samples {
            Samples::Int(s) => ints.extend(s),
            Samples::Float(s) => floats.extend(s),
        }
        merged += 1;
    }

    let spec = spec?;
    match encode(spec, &ints, &floats) {
        Ok(bytes) => {
            debug!(chunks = merged, bytes = bytes.len(), "merged wav chunks");
            Some(bytes)
        }
        Err(e) => {
            warn!(error = %e, "failed to re-encode merged wav");
            None
        }
    }
}

fn encode(spec: WavSpec, ints: &[i32], floats: &[f32]) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    match spec.sample_format {
        SampleFormat::Int => {
            for sample in ints {
                writer.write_sample(*sample)?;
            }
        }
        SampleFormat::Float => {
            for sample in floats {
                writer.write_sample(*sample)?;
            }
        }
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

/// Duration of a WAV file in milliseconds, from its header.
pub fn wav_duration_ms(bytes: &[u8]) -> Option<f64> {
    let reader = WavReader::new(Cursor::new(bytes)).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    Some(f64::from(reader.duration()) / f64::from(rate) * 1000.0)
}

/// Encodes 16 kHz mono 16-bit PCM samples as WAV.
pub fn pcm16_to_wav(samples: &[i16]) -> Result<Vec<u8>, SnareError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let ints: Vec<i32> = samples.iter().map(|s| i32::from(*s)).collect();
    encode(spec, &ints, &[]).map_err(|e| SnareError::Transcription {
        message: "failed to encode wav".into(),
        source: Some(Box::new(e)),
    })
}

/// Combines a buffer window into one payload for the transcription worker.
///
/// WAV windows are merged sample-wise, falling back to the first chunk if
/// none decode. Streamed containers (WebM/Ogg fragments) cannot be joined
/// at the container level, so only the most recent chunk is kept.
pub fn merge_chunks(chunks: &[Vec<u8>]) -> Option<(Vec<u8>, AudioFormat)> {
    let first = chunks.first()?;
    let format = AudioFormat::detect(first);
    if chunks.len() == 1 {
        return Some((first.clone(), format));
    }
    match format {
        AudioFormat::Wav => {
            let merged = merge_wav_chunks(chunks).unwrap_or_else(|| first.clone());
            Some((merged, AudioFormat::Wav))
        }
        _ => {
            let last = chunks.last()?;
            debug!(
                discarded = chunks.len() - 1,
                "streamed container, keeping only the latest chunk"
            );
            Some((last.clone(), AudioFormat::detect(last)))
        }
    }
}
