//! The serialized record format.
//!
//! A record, little-endian:
//!
//! | field | type | note |
//! |---|---|---|
//! | magic | `[u8; 4]` | `b"BXD1"` |
//! | encoding | `u8` | 0 raw CHW pixels, 1 encoded image file |
//! | channels, height, width | `u32` x 3 | ignored for encoded images |
//! | n_boxes | `u32` | |
//! | boxes | `(i32, f32, f32, f32, f32)` x n_boxes | class, x, y, w, h |
//! | payload_len | `u32` | |
//! | payload | `[u8]` | |
//!
//! Box coordinates are ratios of the image size, anchored at the top-left
//! corner of the box.

use crate::{common::*, error::BoxDataError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

const MAGIC: &[u8; 4] = b"BXD1";

/// A box of a record in ratio units with its class id.
pub type Annotation = Label<XYWH<f32>, i32>;

/// Decoded pixels in `[channels, height, width]` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pixels: Array3<u8>,
}

impl Image {
    pub fn new(pixels: Array3<u8>) -> Self {
        Self { pixels }
    }

    pub fn from_raw(shape: [usize; 3], data: Vec<u8>) -> Result<Self> {
        let pixels = Array3::from_shape_vec(shape, data)?;
        Ok(Self { pixels })
    }

    /// The `[channels, height, width]` shape.
    pub fn shape(&self) -> [usize; 3] {
        let (c, h, w) = self.pixels.dim();
        [c, h, w]
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub image: Image,
    pub annotations: Vec<Annotation>,
}

impl Datum {
    /// Serialize with raw pixels.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_record(&self.annotations, RecordPayload::Raw(&self.image))
    }
}

/// The pixel payload of a record being serialized.
#[derive(Debug, Clone, Copy)]
pub enum RecordPayload<'a> {
    Raw(&'a Image),
    /// The bytes of an image file in a format supported by the `image` crate.
    Encoded(&'a [u8]),
}

/// Serialize a record.
pub fn encode_record(annotations: &[Annotation], payload: RecordPayload<'_>) -> Result<Vec<u8>> {
    let mut bytes = vec![];
    bytes.write_all(MAGIC)?;

    let (encoding, [c, h, w], data) = match payload {
        RecordPayload::Raw(image) => {
            let data = image
                .pixels
                .as_slice()
                .map(Cow::Borrowed)
                .unwrap_or_else(|| Cow::Owned(image.pixels.iter().copied().collect()));
            (0, image.shape(), data)
        }
        RecordPayload::Encoded(data) => (1, [0, 0, 0], Cow::Borrowed(data)),
    };

    bytes.write_u8(encoding)?;
    for dim in [c, h, w] {
        bytes.write_u32::<LittleEndian>(dim.try_into()?)?;
    }

    bytes.write_u32::<LittleEndian>(annotations.len().try_into()?)?;
    for label in annotations {
        bytes.write_i32::<LittleEndian>(label.class)?;
        for value in label.rect.xywh() {
            bytes.write_f32::<LittleEndian>(value)?;
        }
    }

    bytes.write_u32::<LittleEndian>(data.len().try_into()?)?;
    bytes.write_all(&data)?;

    Ok(bytes)
}

/// Parses raw record bytes into an image and its annotations.
pub trait RecordDecoder
where
    Self: Debug + Send,
{
    fn parse(&self, bytes: &[u8]) -> Result<Datum>;
}

/// The decoder of the built-in record format.
#[derive(Debug, Clone)]
pub struct DatumDecoder {
    encoded_channels: usize,
}

impl Default for DatumDecoder {
    fn default() -> Self {
        Self {
            encoded_channels: 3,
        }
    }
}

impl DatumDecoder {
    /// Create a decoder that converts encoded images to 1 (luma) or 3
    /// (RGB) channels.
    pub fn new(encoded_channels: usize) -> Result<Self> {
        ensure!(
            encoded_channels == 1 || encoded_channels == 3,
            "encoded_channels must be 1 or 3"
        );
        Ok(Self { encoded_channels })
    }

    fn parse_datum(&self, bytes: &[u8]) -> Result<Datum> {
        let mut reader = io::Cursor::new(bytes);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        ensure!(&magic == MAGIC, "bad magic {:?}", magic);

        let encoding = reader.read_u8()?;
        let shape = {
            let mut shape = [0usize; 3];
            for dim in &mut shape {
                *dim = reader.read_u32::<LittleEndian>()? as usize;
            }
            shape
        };

        let n_boxes = reader.read_u32::<LittleEndian>()? as usize;
        let max_boxes = bytes.len() / 20;
        ensure!(
            n_boxes <= max_boxes,
            "the record claims {} boxes, but it has only {} bytes",
            n_boxes,
            bytes.len()
        );
        let annotations: Vec<_> = (0..n_boxes)
            .map(|_| -> Result<_> {
                let class = reader.read_i32::<LittleEndian>()?;
                let mut xywh = [0f32; 4];
                reader.read_f32_into::<LittleEndian>(&mut xywh)?;
                ensure!(
                    xywh.iter().all(|value| value.is_finite()),
                    "non-finite box coordinates {:?}",
                    xywh
                );
                let rect = XYWH::try_from_xywh(xywh)?;
                Ok(Label { rect, class })
            })
            .try_collect()?;

        let payload_len = reader.read_u32::<LittleEndian>()? as usize;
        let start = reader.position() as usize;
        let payload = bytes
            .get(start..)
            .filter(|rest| rest.len() == payload_len)
            .ok_or_else(|| {
                format_err!(
                    "expect {} payload bytes, but get {}",
                    payload_len,
                    bytes.len().saturating_sub(start)
                )
            })?;

        let image = match encoding {
            0 => {
                let [c, h, w] = shape;
                let size = c
                    .checked_mul(h)
                    .and_then(|size| size.checked_mul(w))
                    .ok_or_else(|| format_err!("raw image of shape {:?} is too large", shape))?;
                ensure!(
                    size == payload_len,
                    "raw image of shape {:?} needs {} bytes, but get {}",
                    shape,
                    size,
                    payload_len
                );
                Image::from_raw(shape, payload.to_vec())?
            }
            1 => self.decode_image(payload)?,
            _ => bail!("unknown encoding {}", encoding),
        };

        Ok(Datum { image, annotations })
    }

    fn decode_image(&self, payload: &[u8]) -> Result<Image> {
        let image = image::load_from_memory(payload)?;

        let pixels = match self.encoded_channels {
            1 => {
                let luma = image.to_luma8();
                let (w, h) = luma.dimensions();
                Array3::from_shape_fn((1, h as usize, w as usize), |(_, y, x)| {
                    luma.get_pixel(x as u32, y as u32)[0]
                })
            }
            3 => {
                let rgb = image.to_rgb8();
                let (w, h) = rgb.dimensions();
                Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
                    rgb.get_pixel(x as u32, y as u32)[c]
                })
            }
            _ => unreachable!(),
        };

        Ok(Image { pixels })
    }
}

impl RecordDecoder for DatumDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Datum> {
        self.parse_datum(bytes)
            .map_err(|err| BoxDataError::Decode(format!("{:#}", err)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum() -> Datum {
        let pixels = Array3::from_shape_fn((3, 2, 4), |(c, y, x)| (c * 8 + y * 4 + x) as u8);
        Datum {
            image: Image::new(pixels),
            annotations: vec![
                Label {
                    rect: XYWH::from_xywh([0.25, 0.5, 0.5, 0.25]),
                    class: 3,
                },
                Label {
                    rect: XYWH::from_xywh([0.0, 0.0, 1.0, 1.0]),
                    class: 0,
                },
            ],
        }
    }

    fn decode_error(bytes: &[u8]) -> bool {
        let err = DatumDecoder::default().parse(bytes).unwrap_err();
        matches!(err.downcast_ref::<BoxDataError>(), Some(BoxDataError::Decode(_)))
    }

    #[test]
    fn raw_record() {
        let datum = datum();
        let bytes = datum.to_bytes().unwrap();
        let decoded = DatumDecoder::default().parse(&bytes).unwrap();
        assert_eq!(decoded, datum);
        assert_eq!(decoded.image.shape(), [3, 2, 4]);
    }

    #[test]
    fn malformed_records() {
        let bytes = datum().to_bytes().unwrap();

        assert!(decode_error(b""));
        assert!(decode_error(b"XXXX"));
        assert!(decode_error(&bytes[..bytes.len() - 1]));

        let mut extra = bytes.clone();
        extra.push(0);
        assert!(decode_error(&extra));

        let mut bad_encoding = bytes;
        bad_encoding[4] = 7;
        assert!(decode_error(&bad_encoding));

        // raw image with overflowing dimensions and an empty payload
        let mut huge = b"BXD1".to_vec();
        huge.push(0);
        for _ in 0..3 {
            huge.extend_from_slice(&u32::MAX.to_le_bytes());
        }
        huge.extend_from_slice(&0u32.to_le_bytes());
        huge.extend_from_slice(&0u32.to_le_bytes());
        assert!(decode_error(&huge));
    }

    #[test]
    fn negative_box_size_is_rejected() {
        let mut bytes = datum().to_bytes().unwrap();
        // the w field of the first box
        let offset = 4 + 1 + 12 + 4 + 4 + 8;
        bytes[offset..offset + 4].copy_from_slice(&(-1f32).to_le_bytes());
        assert!(decode_error(&bytes));
    }

    #[test]
    fn encoded_record() {
        let mut png = vec![];
        {
            let buffer = image::RgbImage::from_fn(5, 3, |x, y| image::Rgb([x as u8, y as u8, 7]));
            image::DynamicImage::ImageRgb8(buffer)
                .write_to(&mut png, image::ImageOutputFormat::Png)
                .unwrap();
        }

        let annotations = datum().annotations;
        let bytes = encode_record(&annotations, RecordPayload::Encoded(&png)).unwrap();
        let decoded = DatumDecoder::default().parse(&bytes).unwrap();
        assert_eq!(decoded.image.shape(), [3, 3, 5]);
        assert_eq!(decoded.image.pixels()[[0, 1, 4]], 4);
        assert_eq!(decoded.image.pixels()[[1, 2, 0]], 2);
        assert_eq!(decoded.image.pixels()[[2, 0, 0]], 7);
        assert_eq!(decoded.annotations, annotations);

        let decoded = DatumDecoder::new(1).unwrap().parse(&bytes).unwrap();
        assert_eq!(decoded.image.shape(), [1, 3, 5]);
    }
}
