//! Frame encoding and delivery contracts
//!
//! The compositor hands every display-sized frame to a [`FrameEncoder`] and
//! forwards the resulting buffer to a [`FrameSink`] under a logical event
//! name. The network client of a real display service is one such sink; the
//! implementations here cover in-process, file and pipe delivery.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::imageops::{self, BiLevel, FilterType};
use image::GrayImage;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

/// Turns a display-sized image into the sink's fixed-length wire buffer.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, image: &GrayImage) -> Result<Vec<u8>>;

    /// Length every encoded buffer must have
    fn encoded_len(&self) -> usize;
}

/// Destination for encoded frames.
///
/// Implementations return [`Error::Sink`] for failures worth retrying on the
/// next frame and [`Error::Connection`] when the destination is gone.
pub trait FrameSink: Send + Sync {
    fn send(&self, event: &str, frame: &[u8]) -> Result<()>;
}

/// 1 bit per pixel, MSB first, row-major; Floyd-Steinberg dithered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonochromeEncoder {
    pub width: u32,
    pub height: u32,
}

impl MonochromeEncoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for MonochromeEncoder {
    fn default() -> Self {
        Self::new(128, 40)
    }
}

impl FrameEncoder for MonochromeEncoder {
    fn encode(&self, image: &GrayImage) -> Result<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Encode(format!(
                "cannot encode a {}x{} frame",
                self.width, self.height
            )));
        }
        let mut mono = if image.dimensions() == (self.width, self.height) {
            image.clone()
        } else {
            imageops::resize(image, self.width, self.height, FilterType::Lanczos3)
        };
        imageops::dither(&mut mono, &BiLevel);

        let mut out = vec![0u8; self.encoded_len()];
        for (i, px) in mono.pixels().enumerate() {
            if px.0[0] > 127 {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Ok(out)
    }

    fn encoded_len(&self) -> usize {
        (self.width as usize * self.height as usize).div_ceil(8)
    }
}

/// Hex SHA-256 of an encoded frame
pub fn frame_digest(frame: &[u8]) -> String {
    hex::encode(Sha256::digest(frame))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub event: String,
    pub data: Vec<u8>,
}

/// Keeps every delivered frame in memory (bounded by `capacity`, oldest
/// dropped first).
#[derive(Debug)]
pub struct MemorySink {
    frames: Mutex<VecDeque<SentFrame>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn frames(&self) -> Vec<SentFrame> {
        self.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<SentFrame> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SentFrame>> {
        self.frames.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for MemorySink {
    fn send(&self, event: &str, frame: &[u8]) -> Result<()> {
        let mut frames = self.lock();
        if frames.len() >= self.capacity {
            frames.pop_front();
        }
        frames.push_back(SentFrame {
            event: event.to_string(),
            data: frame.to_vec(),
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct FrameLine<'a> {
    event: &'a str,
    length: usize,
    digest: String,
    data: String,
}

/// Writes one JSON object per frame (`event`, `length`, `digest`, base64
/// `data`) to any writer, e.g. stdout piped into a display bridge.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn send(&self, event: &str, frame: &[u8]) -> Result<()> {
        let line = FrameLine {
            event,
            length: frame.len(),
            digest: frame_digest(frame),
            data: STANDARD.encode(frame),
        };
        let json = serde_json::to_string(&line)?;
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        writeln!(out, "{}", json)
            .and_then(|_| out.flush())
            .map_err(io_to_sink_error)
    }
}

fn io_to_sink_error(e: std::io::Error) -> Error {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected => Error::Connection(e.to_string()),
        _ => Error::Sink(e.to_string()),
    }
}
