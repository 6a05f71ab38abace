use url::Url;

/// Image format as guessed from a URL. Anything unrecognised is treated as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    pub fn from_url(url: &str) -> Self {
        if let Some(media) = data_url_media_type(url) {
            return media
                .strip_prefix("image/")
                .and_then(Self::from_extension)
                .unwrap_or_default();
        }

        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
        };
        path.rsplit('/')
            .next()
            .and_then(|file| file.rsplit_once('.'))
            .and_then(|(_, ext)| Self::from_extension(ext))
            .unwrap_or_default()
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" | "pjpeg" => Some(Self::Jpeg),
            "png" | "apng" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Whether the image is embedded with lossy compression.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    pub(crate) fn decoder_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
            Self::Webp => image::ImageFormat::WebP,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// `data:image/png;base64,...` -> `image/png`
pub(crate) fn data_url_media_type(url: &str) -> Option<&str> {
    let rest = url.get(..5).filter(|p| p.eq_ignore_ascii_case("data:")).map(|_| &url[5..])?;
    let header = rest.split(',').next()?;
    header.split(';').next().map(str::trim)
}
