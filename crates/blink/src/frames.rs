//! Turning an uploaded clip into a fixed-size RGB frame sequence.
//!
//! Animated GIF, WebP and APNG (and plain stills) are decoded in-process with
//! the `image` crate. Everything else (webm, mp4, mov, ...) is handed to
//! ffmpeg, which is asked for `rgb24` rawvideo already scaled to the frame
//! size, so the output can be split into frames with [`parse_raw_frames`].

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat, RgbImage};
use std::io::{self, Cursor};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::{BlinkError, FrameConfig};

/// A decoded frame, already resized to `frame_size x frame_size`.
pub type Frame = RgbImage;

/// Decodes `bytes` into at most `cfg.max_frames` frames in decoding order.
///
/// A clip with no decodable frames yields an empty vector; an empty or
/// unreadable payload is [`BlinkError::InvalidVideo`].
pub async fn decode_frames(bytes: Vec<u8>, cfg: &FrameConfig) -> Result<Vec<Frame>, BlinkError> {
    if bytes.is_empty() {
        return Err(BlinkError::InvalidVideo("empty video payload".into()));
    }

    match image::guess_format(&bytes) {
        Ok(format) => {
            let size = cfg.frame_size;
            let max = cfg.max_frames;
            tokio::task::spawn_blocking(move || decode_image_frames(&bytes, format, size, max))
                .await
                .map_err(|e| BlinkError::Inference(format!("frame decoding task failed: {e}")))?
        }
        Err(_) => decode_with_ffmpeg(&bytes, cfg).await,
    }
}

fn decode_image_frames(
    bytes: &[u8],
    format: ImageFormat,
    size: u32,
    max_frames: usize,
) -> Result<Vec<Frame>, BlinkError> {
    let animation: Option<Vec<image::Frame>> = match format {
        ImageFormat::Gif => {
            let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(invalid)?;
            Some(take_frames(decoder, max_frames)?)
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes)).map_err(invalid)?;
            if decoder.has_animation() {
                Some(take_frames(decoder, max_frames)?)
            } else {
                None
            }
        }
        ImageFormat::Png => {
            let decoder = PngDecoder::new(Cursor::new(bytes)).map_err(invalid)?;
            if decoder.is_apng().map_err(invalid)? {
                Some(take_frames(decoder.apng().map_err(invalid)?, max_frames)?)
            } else {
                None
            }
        }
        _ => None,
    };

    let frames = match animation {
        Some(frames) => frames
            .into_iter()
            .map(|frame| resize_frame(DynamicImage::ImageRgba8(frame.into_buffer()), size))
            .collect(),
        None => {
            let still = image::load_from_memory_with_format(bytes, format).map_err(invalid)?;
            vec![resize_frame(still, size)]
        }
    };

    tracing::debug!(?format, frames = frames.len(), "decoded clip in-process");
    Ok(frames)
}

fn take_frames<'a, D: AnimationDecoder<'a>>(
    decoder: D,
    max_frames: usize,
) -> Result<Vec<image::Frame>, BlinkError> {
    decoder
        .into_frames()
        .take(max_frames)
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)
}

fn resize_frame(image: DynamicImage, size: u32) -> Frame {
    image.resize_exact(size, size, FilterType::Triangle).to_rgb8()
}

fn invalid(err: image::ImageError) -> BlinkError {
    BlinkError::InvalidVideo(err.to_string())
}

async fn decode_with_ffmpeg(bytes: &[u8], cfg: &FrameConfig) -> Result<Vec<Frame>, BlinkError> {
    // ffmpeg cannot seek a pipe, and mp4 often keeps its index at the end.
    let clip = tempfile::Builder::new()
        .prefix("facegate-clip-")
        .tempfile()?;
    tokio::fs::write(clip.path(), bytes).await?;

    let size = cfg.frame_size;
    let mut command = Command::new(&cfg.ffmpeg_path);
    command
        .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
        .arg(clip.path())
        .args(["-vf", &format!("scale={size}:{size}")])
        .args(["-frames:v", &cfg.max_frames.to_string()])
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let timeout = Duration::from_secs(cfg.decode_timeout_secs);
    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) if err.kind() == io::ErrorKind::NotFound => {
            return Err(BlinkError::Decoder(format!(
                "'{}' is not installed or not on PATH",
                cfg.ffmpeg_path
            )));
        }
        Ok(Err(err)) => return Err(BlinkError::Decoder(err.to_string())),
        Err(_) => {
            return Err(BlinkError::Decoder(format!(
                "ffmpeg did not finish within {}s",
                cfg.decode_timeout_secs
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("ffmpeg could not decode the clip");
        return Err(BlinkError::InvalidVideo(reason.trim().to_string()));
    }

    let frames = parse_raw_frames(&output.stdout, size)?;
    tracing::debug!(frames = frames.len(), "decoded clip with ffmpeg");
    Ok(frames)
}

/// Splits packed `rgb24` rawvideo into `size x size` frames.
///
/// The byte count must be a whole number of frames.
pub fn parse_raw_frames(raw: &[u8], size: u32) -> Result<Vec<Frame>, BlinkError> {
    if size == 0 {
        return Err(BlinkError::InvalidConfig("frame_size must be > 0".into()));
    }
    let frame_len = (size as usize) * (size as usize) * 3;
    if raw.len() % frame_len != 0 {
        return Err(BlinkError::InvalidVideo(format!(
            "raw stream of {} bytes is not a whole number of {size}x{size} frames",
            raw.len()
        )));
    }

    raw.chunks_exact(frame_len)
        .map(|chunk| {
            RgbImage::from_raw(size, size, chunk.to_vec())
                .ok_or_else(|| BlinkError::InvalidVideo("frame buffer size mismatch".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba, RgbaImage};

    fn gif_bytes(levels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            let frames = levels.iter().map(|&level| {
                let img = RgbaImage::from_pixel(16, 16, Rgba([level, level, level, 255]));
                image::Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(40, 1))
            });
            encoder.encode_frames(frames).unwrap();
        }
        out
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(10, 8, image::Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn raw_frames_split_evenly() {
        let raw = vec![7u8; 2 * 4 * 4 * 3];
        let frames = parse_raw_frames(&raw, 4).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].dimensions(), (4, 4));
        assert_eq!(frames[1].get_pixel(3, 3).0, [7, 7, 7]);
    }

    #[test]
    fn partial_trailing_frame_rejected() {
        let raw = vec![0u8; 4 * 4 * 3 + 5];
        assert!(matches!(
            parse_raw_frames(&raw, 4),
            Err(BlinkError::InvalidVideo(_))
        ));
    }

    #[test]
    fn empty_raw_stream_is_zero_frames() {
        assert!(parse_raw_frames(&[], 64).unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_payload_is_invalid() {
        let err = decode_frames(Vec::new(), &FrameConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn animated_gif_decodes_every_frame() {
        let cfg = FrameConfig {
            frame_size: 8,
            ..Default::default()
        };
        let frames = decode_frames(gif_bytes(&[250, 20, 250, 250]), &cfg)
            .await
            .unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].dimensions(), (8, 8));
        assert!(frames[1].get_pixel(4, 4).0[0] < frames[0].get_pixel(4, 4).0[0]);
    }

    #[tokio::test]
    async fn max_frames_caps_decoding() {
        let cfg = FrameConfig {
            frame_size: 8,
            max_frames: 2,
            ..Default::default()
        };
        let frames = decode_frames(gif_bytes(&[10, 20, 30, 40, 50]), &cfg)
            .await
            .unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn still_image_is_single_frame() {
        let frames = decode_frames(png_bytes(), &FrameConfig::default())
            .await
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].dimensions(), (64, 64));
    }

    #[tokio::test]
    async fn unknown_container_without_ffmpeg_is_decoder_error() {
        let cfg = FrameConfig {
            ffmpeg_path: "/nonexistent/facegate-ffmpeg".into(),
            ..Default::default()
        };
        let err = decode_frames(b"\x1a\x45\xdf\xa3not really webm".to_vec(), &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, BlinkError::Decoder(_)));
    }
}
