use crate::vision::PixelImage;
use std::time::Duration;
use url::Url;

/// Error type shared by all pluggable analysis backends.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Extracts visible text from a decoded image.
pub trait OcrEngine: Send + Sync {
    fn extract_text(&self, image: &PixelImage) -> Result<String, CollaboratorError>;
}

/// Label with model confidence, as returned by a text classifier.
#[derive(Debug, Clone)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

/// Scores raw text with an external model.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Classification, CollaboratorError>;
}

/// Turns raw image bytes into RGB pixels.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PixelImage, CollaboratorError>;
}

/// Retrieves image bytes for http/https references.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CollaboratorError>;
}

/// Fetcher backed by a blocking HTTP client with a fixed timeout.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("phish-signal/0.1.0")
            .build()?;

        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CollaboratorError> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("unsupported url scheme: {}", parsed.scheme()).into());
        }

        let response = self.client.get(parsed).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Decoder for binary PNM images (P6 color, P5 grayscale).
///
/// PNM covers the screenshot fixtures used in tests and keeps decoding free
/// of native library requirements. Other formats come from a custom
/// `ImageDecoder` implementation.
pub struct PnmDecoder;

impl PnmDecoder {
    fn next_token(bytes: &[u8], pos: &mut usize) -> Result<String, CollaboratorError> {
        loop {
            while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
                *pos += 1;
            }
            if *pos < bytes.len() && bytes[*pos] == b'#' {
                while *pos < bytes.len() && bytes[*pos] != b'\n' {
                    *pos += 1;
                }
            } else {
                break;
            }
        }

        let start = *pos;
        while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if start == *pos {
            return Err("truncated pnm header".into());
        }
        Ok(String::from_utf8_lossy(&bytes[start..*pos]).into_owned())
    }
}

impl ImageDecoder for PnmDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PixelImage, CollaboratorError> {
        let mut pos = 0;
        let magic = Self::next_token(bytes, &mut pos)?;
        let width: usize = Self::next_token(bytes, &mut pos)?.parse()?;
        let height: usize = Self::next_token(bytes, &mut pos)?.parse()?;
        let maxval: usize = Self::next_token(bytes, &mut pos)?.parse()?;

        if width == 0 || height == 0 {
            return Err("empty pnm image".into());
        }
        if width > 1 << 15 || height > 1 << 15 {
            return Err("pnm image too large".into());
        }
        if maxval == 0 || maxval > 255 {
            return Err(format!("unsupported pnm maxval: {}", maxval).into());
        }

        // Single whitespace byte separates the header from the raster.
        pos += 1;

        let pixel_count = width * height;
        let pixels = match magic.as_str() {
            "P6" => {
                let data = bytes
                    .get(pos..pos + pixel_count * 3)
                    .ok_or("truncated pnm raster")?;
                data.chunks_exact(3)
                    .map(|rgb| [rgb[0], rgb[1], rgb[2]])
                    .collect()
            }
            "P5" => {
                let data = bytes
                    .get(pos..pos + pixel_count)
                    .ok_or("truncated pnm raster")?;
                data.iter().map(|&g| [g, g, g]).collect()
            }
            other => return Err(format!("unsupported pnm magic: {}", other).into()),
        };

        Ok(PixelImage {
            width,
            height,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_p6() {
        let mut bytes = b"P6\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[
            255, 0, 0, 0, 255, 0, //
            0, 0, 255, 255, 255, 255,
        ]);

        let image = PnmDecoder.decode(&bytes).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 2);
        assert_eq!(image.pixels[0], [255, 0, 0]);
        assert_eq!(image.pixels[3], [255, 255, 255]);
    }

    #[test]
    fn test_decode_p5_with_comment() {
        let mut bytes = b"P5\n# camera shot\n2 1\n255\n".to_vec();
        bytes.extend_from_slice(&[0, 200]);

        let image = PnmDecoder.decode(&bytes).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 1);
        assert_eq!(image.pixels[0], [0, 0, 0]);
        assert_eq!(image.pixels[1], [200, 200, 200]);
    }

    #[test]
    fn test_decode_truncated_raster_fails() {
        let bytes = b"P6\n4 4\n255\n\x00\x01".to_vec();
        assert!(PnmDecoder.decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_unknown_magic_fails() {
        let bytes = b"P3\n1 1\n255\n1 2 3".to_vec();
        assert!(PnmDecoder.decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_zero_dimension_fails() {
        let bytes = b"P6\n0 3\n255\n".to_vec();
        assert!(PnmDecoder.decode(&bytes).is_err());
    }
}
