use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use futures_util::StreamExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, RgbImage};
use percent_encoding::percent_decode_str;

use crate::fetch::{map_reqwest_error, proxied_url, FetchSettings};
use crate::format::ImageFormat;

const JPEG_QUALITY: u8 = 92;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("failed to load {url}: {message}")]
    Load { url: String, message: String },
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("image has no pixels")]
    Empty,
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Pixel payload ready to be placed in a PDF image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterData {
    /// Baseline JPEG bytes (`DCTDecode`).
    Jpeg(Vec<u8>),
    /// Uncompressed 8-bit RGB samples, row-major.
    Rgb(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: RasterData,
}

/// Where the bytes of a selected image come from.
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, url: &str) -> Result<Vec<u8>, RasterError>;
}

#[derive(Debug, Clone)]
pub struct ImageLoadSettings {
    pub request_timeout: Duration,
    pub max_bytes: u64,
    /// Route image requests through the page proxy as well.
    pub via_proxy: bool,
}

impl Default for ImageLoadSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_bytes: 25 * 1024 * 1024,
            via_proxy: false,
        }
    }
}

/// Loads images over HTTP(S); `data:` URLs are decoded in place.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
    fetch: FetchSettings,
    settings: ImageLoadSettings,
}

impl HttpImageSource {
    pub fn new(fetch: FetchSettings, settings: ImageLoadSettings) -> Result<Self, RasterError> {
        let client = reqwest::Client::builder()
            .connect_timeout(fetch.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(fetch.user_agent.clone())
            .build()
            .map_err(|err| RasterError::Load {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            fetch,
            settings,
        })
    }
}

#[async_trait::async_trait]
impl ImageSource for HttpImageSource {
    async fn load(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        if url.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
            return decode_data_url(url);
        }

        let load_err = |message: String| RasterError::Load {
            url: url.to_string(),
            message,
        };
        let request_url = if self.settings.via_proxy {
            proxied_url(&self.fetch, url)
        } else {
            url.to_string()
        };

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(|err| load_err(map_reqwest_error(err).to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(load_err(format!("http status {}", status.as_u16())));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| load_err(map_reqwest_error(err).to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return Err(load_err(format!(
                    "image larger than {} bytes",
                    self.settings.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, RasterError> {
    let load_err = |message: &str| RasterError::Load {
        url: url.chars().take(48).collect(),
        message: message.to_string(),
    };
    let (header, payload) = url[5..]
        .split_once(',')
        .ok_or_else(|| load_err("data url without payload"))?;
    if header
        .split(';')
        .any(|part| part.trim().eq_ignore_ascii_case("base64"))
    {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        B64.decode(compact.as_bytes())
            .map_err(|err| load_err(&err.to_string()))
    } else {
        Ok(percent_decode_str(payload).collect())
    }
}

/// Decodes `bytes` and converts them into what the PDF page embeds.
///
/// The URL-derived `hint` is tried first; when it does not match the actual
/// bytes, the format is sniffed from the content. Transparent pixels are
/// composited onto white.
pub fn rasterize(bytes: &[u8], hint: ImageFormat) -> Result<RasterImage, RasterError> {
    let decoded = image::load_from_memory_with_format(bytes, hint.decoder_format())
        .or_else(|_| image::load_from_memory(bytes))
        .map_err(|err| RasterError::Decode(err.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(RasterError::Empty);
    }

    let rgb = flatten_onto_white(&decoded);
    let data = if hint.is_lossy() {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|err| RasterError::Encode(err.to_string()))?;
        RasterData::Jpeg(jpeg)
    } else {
        RasterData::Rgb(rgb.into_raw())
    };

    Ok(RasterImage {
        width,
        height,
        format: hint,
        data,
    })
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat as Codec, Rgba, RgbaImage};

    use super::*;

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, Codec::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_keeps_exact_pixels_and_size() {
        let bytes = png_bytes(RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255])));
        let raster = rasterize(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((raster.width, raster.height), (4, 2));
        match raster.data {
            RasterData::Rgb(px) => {
                assert_eq!(px.len(), 4 * 2 * 3);
                assert_eq!(&px[..3], &[10, 20, 30]);
            }
            other => panic!("expected raw rgb, got {other:?}"),
        }
    }

    #[test]
    fn transparent_pixels_become_white() {
        let bytes = png_bytes(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        let raster = rasterize(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(raster.data, RasterData::Rgb(vec![255, 255, 255]));
    }

    #[test]
    fn wrong_hint_falls_back_to_sniffing() {
        let bytes = png_bytes(RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])));
        let raster = rasterize(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(raster.format, ImageFormat::Jpeg);
        match raster.data {
            RasterData::Jpeg(jpeg) => assert_eq!(&jpeg[..2], &[0xFF, 0xD8]),
            other => panic!("expected jpeg, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = rasterize(b"definitely not an image", ImageFormat::Png).unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[test]
    fn data_url_base64_and_percent_forms() {
        assert_eq!(decode_data_url("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_data_url("data:,a%20b").unwrap(), b"a b");
        assert!(decode_data_url("data:image/png;base64").is_err());
    }
}
