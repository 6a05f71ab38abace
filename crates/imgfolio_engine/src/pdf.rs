use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::fetch::ProgressSink;
use crate::format::ImageFormat;
use crate::raster::{rasterize, ImageSource, RasterData, RasterError, RasterImage};
use crate::{EngineEvent, JobProgress, RequestId, Stage};
use imgfolio_logging::{folio_debug, folio_info, folio_warn};

const PT_PER_MM: f64 = 72.0 / 25.4;
/// Resource name every page uses for its image.
pub const IMAGE_RESOURCE: &str = "Im0";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PdfError {
    #[error("no images selected")]
    NoImages,
    #[error("image {index} ({url}): {source}")]
    Image {
        index: usize,
        url: String,
        source: RasterError,
    },
    #[error("failed to assemble pdf: {0}")]
    Assemble(String),
    #[error("failed to save pdf: {0}")]
    Persist(String),
    #[error("pdf job lost: {0}")]
    Internal(String),
}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        PdfError::Assemble(err.to_string())
    }
}

/// Page geometry in millimetres. Defaults are an A4 portrait page with the
/// image 10 mm from the top-left corner and 180 mm wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_x_mm: f64,
    pub margin_y_mm: f64,
    pub image_width_mm: f64,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_x_mm: 10.0,
            margin_y_mm: 10.0,
            image_width_mm: 180.0,
        }
    }
}

impl PdfLayout {
    /// Where an image with the given pixel size lands on the page, in points
    /// from the bottom-left corner.
    ///
    /// Width is fixed and height follows the aspect ratio. An image that
    /// would run past the bottom margin is shrunk to fit, keeping its ratio.
    pub fn place(&self, width_px: u32, height_px: u32) -> PagePlacement {
        let aspect = f64::from(height_px) / f64::from(width_px.max(1));
        let page_w = self.page_width_mm * PT_PER_MM;
        let page_h = self.page_height_mm * PT_PER_MM;
        let max_h = ((self.page_height_mm - 2.0 * self.margin_y_mm) * PT_PER_MM).max(1.0);

        let mut width = self.image_width_mm * PT_PER_MM;
        let mut height = width * aspect;
        if height > max_h {
            height = max_h;
            width = height / aspect;
        }

        let x = self.margin_x_mm * PT_PER_MM;
        let y = page_h - self.margin_y_mm * PT_PER_MM - height;
        PagePlacement {
            page_width: page_w,
            page_height: page_h,
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub layout: PdfLayout,
    pub producer: String,
    /// PDF date string, e.g. `D:20240101120000Z`.
    pub creation_date: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            layout: PdfLayout::default(),
            producer: concat!("imgfolio ", env!("CARGO_PKG_VERSION")).to_string(),
            creation_date: None,
        }
    }
}

/// Builds a document one image page at a time.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    placements: Vec<PagePlacement>,
    layout: PdfLayout,
}

impl PdfAssembler {
    pub fn new(layout: PdfLayout) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            placements: Vec::new(),
            layout,
        }
    }

    /// Appends a page showing `raster`.
    pub fn add_page(&mut self, raster: &RasterImage) -> Result<PagePlacement, PdfError> {
        let placement = self.layout.place(raster.width, raster.height);
        let image_id = self.doc.add_object(image_stream(raster)?);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        real(placement.width),
                        0.into(),
                        0.into(),
                        real(placement.height),
                        real(placement.x),
                        real(placement.y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                real(placement.page_width),
                real(placement.page_height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_RESOURCE => image_id,
                },
            },
        });
        self.kids.push(page_id.into());
        self.placements.push(placement);
        Ok(placement)
    }

    /// Serializes the document.
    pub fn finish(mut self, options: &PdfOptions) -> Result<PdfDocument, PdfError> {
        let page_count = self.kids.len();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => page_count as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });

        let mut info = dictionary! {
            "Producer" => Object::string_literal(options.producer.as_str()),
        };
        if let Some(date) = options.creation_date.as_deref() {
            info.set("CreationDate", Object::string_literal(date));
        }
        let info_id = self.doc.add_object(info);

        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|err| PdfError::Assemble(err.to_string()))?;

        Ok(PdfDocument {
            bytes,
            page_count,
            placements: self.placements,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub placements: Vec<PagePlacement>,
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn image_stream(raster: &RasterImage) -> Result<Stream, PdfError> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(raster.width),
        "Height" => i64::from(raster.height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    let stream = match &raster.data {
        RasterData::Jpeg(jpeg) => {
            let mut dict = dict;
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, jpeg.clone()).with_compression(false)
        }
        RasterData::Rgb(rgb) => {
            let mut stream = Stream::new(dict, rgb.clone());
            stream.compress()?;
            stream
        }
    };
    Ok(stream)
}

/// Loads, rasterizes and places every url in order, one page each.
///
/// Images are processed strictly one after another. The first image that
/// cannot be loaded or decoded aborts the whole document.
pub async fn build_pdf(
    source: &dyn ImageSource,
    urls: &[String],
    options: &PdfOptions,
    request_id: RequestId,
    sink: &dyn ProgressSink,
) -> Result<PdfDocument, PdfError> {
    if urls.is_empty() {
        return Err(PdfError::NoImages);
    }

    let total = urls.len();
    let mut assembler = PdfAssembler::new(options.layout);
    for (i, url) in urls.iter().enumerate() {
        sink.emit(EngineEvent::Progress(JobProgress {
            request_id,
            stage: Stage::Rasterizing { index: i + 1, total },
            bytes: None,
        }));

        let image_err = |source: RasterError| PdfError::Image {
            index: i + 1,
            url: url.clone(),
            source,
        };
        let bytes = source.load(url).await.map_err(image_err)?;
        let hint = ImageFormat::from_url(url);
        let raster = rasterize(&bytes, hint).map_err(|err| {
            folio_warn!("Rasterizing {} as {:?} failed: {}", url, hint, err);
            image_err(err)
        })?;
        folio_debug!(
            "Page {}/{}: {}x{} px, {:?}, {} bytes in",
            i + 1,
            total,
            raster.width,
            raster.height,
            hint,
            bytes.len()
        );
        assembler.add_page(&raster)?;
    }

    sink.emit(EngineEvent::Progress(JobProgress {
        request_id,
        stage: Stage::Assembling,
        bytes: None,
    }));
    let document = assembler.finish(options)?;
    folio_info!(
        "Assembled pdf with {} pages ({} bytes)",
        document.page_count,
        document.bytes.len()
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::{PdfLayout, PT_PER_MM};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn width_is_fixed_and_height_proportional() {
        let layout = PdfLayout::default();
        let wide = layout.place(400, 200);
        assert!(approx(wide.width, 180.0 * PT_PER_MM));
        assert!(approx(wide.height, 90.0 * PT_PER_MM));
        assert!(approx(wide.x, 10.0 * PT_PER_MM));
        assert!(approx(wide.y, (297.0 - 10.0 - 90.0) * PT_PER_MM));
    }

    #[test]
    fn tall_images_shrink_to_fit_the_page() {
        let layout = PdfLayout::default();
        let tall = layout.place(100, 1000);
        assert!(approx(tall.height, 277.0 * PT_PER_MM));
        assert!(approx(tall.width, 27.7 * PT_PER_MM));
        assert!(approx(tall.y, 10.0 * PT_PER_MM));
    }
}
