//! Weekly schedules stored as 1-bit X BitMap (XBM) images.
//!
//! The raster is 7 pixels wide and 48 pixels tall: column `x` is the weekday
//! (Monday = 0) and row `y` is the half-hour slot. A white pixel (bit set)
//! marks an available slot, a black pixel (bit clear) an unavailable one.
//!
//! XBM stores each row as `ceil(width / 8)` bytes with the leftmost pixel in
//! the least significant bit, written as C source:
//!
//! ```text
//! #define schedule_width 7
//! #define schedule_height 48
//! static char schedule_bits[] = {
//! 0x7f,0x00,...
//! };
//! ```

use crate::error::BitmapError;
use crate::slot::SLOTS_PER_DAY;
use crate::week::{WeekSchedule, DAYS_PER_WEEK};
use itertools::Itertools;
use log::{debug, trace, warn};

pub const BITMAP_WIDTH: usize = DAYS_PER_WEEK;
pub const BITMAP_HEIGHT: usize = SLOTS_PER_DAY;

/// Full-scale pixel value written for an available slot.
pub const WHITE: u8 = 255;
pub const BLACK: u8 = 0;

const IMAGE_NAME: &str = "schedule";
const BYTES_PER_LINE: usize = 12;

/// Any non-zero pixel is available, whatever scale produced it.
fn is_lit(value: u8) -> bool {
    value > 0
}

/// Row-major grayscale pixel grid, one `u8` per pixel.
///
/// Pixels are kept at full scale (0 or 255) so that every producer and
/// consumer in the crate agrees on a single scaling; reading back goes
/// through the same `value > 0` threshold regardless.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Raster {
        Raster {
            width,
            height,
            pixels: vec![BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        self.pixels[y * self.width + x] = value;
    }

    pub fn from_week(week: &WeekSchedule) -> Raster {
        let mut raster = Raster::new(BITMAP_WIDTH, BITMAP_HEIGHT);
        for x in 0..BITMAP_WIDTH {
            for y in 0..BITMAP_HEIGHT {
                let value = if week.get(x, y) { WHITE } else { BLACK };
                raster.set_pixel(x, y, value);
            }
        }
        raster
    }

    /// Reads the raster back as a week, column per weekday.
    pub fn to_week(&self) -> Result<WeekSchedule, BitmapError> {
        if self.width != BITMAP_WIDTH || self.height != BITMAP_HEIGHT {
            return Err(BitmapError::corrupt(format!(
                "expected a {}x{} raster, found {}x{}",
                BITMAP_WIDTH, BITMAP_HEIGHT, self.width, self.height
            )));
        }

        let mut week = WeekSchedule::default();
        for x in 0..BITMAP_WIDTH {
            for y in 0..BITMAP_HEIGHT {
                week.set(x, y, is_lit(self.pixel(x, y)));
            }
        }
        Ok(week)
    }

    /// Packs the raster as XBM source text.
    pub fn to_xbm(&self, name: &str) -> Vec<u8> {
        let row_bytes = packed_row_bytes(self.width);
        let mut packed = vec![0_u8; row_bytes * self.height];

        for y in 0..self.height {
            for x in 0..self.width {
                if is_lit(self.pixel(x, y)) {
                    packed[y * row_bytes + x / 8] |= 1 << (x % 8);
                }
            }
        }

        let body = packed
            .chunks(BYTES_PER_LINE)
            .map(|line| line.iter().map(|b| format!("0x{:02x}", b)).join(","))
            .join(",\n");

        format!(
            "#define {name}_width {}\n#define {name}_height {}\nstatic char {name}_bits[] = {{\n{}\n}};\n",
            self.width,
            self.height,
            body,
            name = name
        )
        .into_bytes()
    }

    /// Parses XBM source text into a full-scale raster.
    pub fn from_xbm(bytes: &[u8]) -> Result<Raster, BitmapError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| BitmapError::corrupt("bitmap is not valid text"))?;

        let open = text
            .find('{')
            .ok_or_else(|| BitmapError::corrupt("missing pixel data block"))?;
        let close = text[open..]
            .find('}')
            .map(|offset| open + offset)
            .ok_or_else(|| BitmapError::corrupt("unterminated pixel data block"))?;

        let header = &text[..open];
        let width = header_value(header, "_width")?;
        let height = header_value(header, "_height")?;

        if width == 0 || height == 0 {
            return Err(BitmapError::corrupt("empty raster"));
        }

        if !header.contains("_bits") || !header.contains("char") {
            return Err(BitmapError::corrupt("missing bits declaration"));
        }

        let data = text[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(parse_byte)
            .collect::<Result<Vec<u8>, BitmapError>>()?;

        let row_bytes = packed_row_bytes(width);
        let expected = row_bytes
            .checked_mul(height)
            .ok_or_else(|| BitmapError::corrupt("raster dimensions overflow"))?;
        if data.len() != expected {
            return Err(BitmapError::corrupt(format!(
                "expected {} bytes of pixel data, found {}",
                expected,
                data.len()
            )));
        }

        let mut raster = Raster::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let byte = data[y * row_bytes + x / 8];
                if (byte >> (x % 8)) & 1 == 1 {
                    raster.set_pixel(x, y, WHITE);
                }
            }
        }

        trace!("Read {}x{} xbm raster", width, height);
        Ok(raster)
    }
}

fn packed_row_bytes(width: usize) -> usize {
    width / 8 + usize::from(width % 8 != 0)
}

fn header_value(header: &str, suffix: &str) -> Result<usize, BitmapError> {
    let value = header
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("#define"))
        .map(str::split_whitespace)
        .find_map(|mut parts| match (parts.next(), parts.next()) {
            (Some(name), Some(value)) if name.ends_with(suffix) => Some(value),
            _ => None,
        })
        .ok_or_else(|| BitmapError::corrupt(format!("missing {} define", suffix)))?;

    value
        .parse()
        .map_err(|_| BitmapError::corrupt(format!("unparsable {} define", suffix)))
}

fn parse_byte(token: &str) -> Result<u8, BitmapError> {
    let parsed = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => token.parse(),
    };
    parsed.map_err(|_| BitmapError::corrupt(format!("invalid byte literal {:?}", token)))
}

/// Encodes a week as an XBM image. Equal weeks always produce identical bytes
///
/// # Examples
/// ```
/// use slotplan_libs::bitmap::{decode, encode};
/// use slotplan_libs::week::WeekSchedule;
///
/// let week = WeekSchedule::all(true);
/// let blob = encode(&week);
///
/// assert!(blob.starts_with(b"#define schedule_width 7\n"));
/// assert_eq!(decode(&blob), Ok(week));
/// ```
pub fn encode(week: &WeekSchedule) -> Vec<u8> {
    let blob = Raster::from_week(week).to_xbm(IMAGE_NAME);
    debug!("Encoded week schedule into {} byte bitmap", blob.len());
    blob
}

/// Decodes an XBM image back into a week.
///
/// # Errors
/// `BitmapError::CorruptBitmap` when the bytes are not a 7x48 1-bit raster.
///
/// ```
/// use slotplan_libs::bitmap::decode;
/// use slotplan_libs::error::BitmapError;
///
/// let wrong_size = b"#define a_width 8\n#define a_height 1\nstatic char a_bits[] = { 0xff };";
/// assert!(matches!(decode(wrong_size), Err(BitmapError::CorruptBitmap { .. })));
/// ```
pub fn decode(blob: &[u8]) -> Result<WeekSchedule, BitmapError> {
    Raster::from_xbm(blob)
        .and_then(|raster| raster.to_week())
        .map_err(|e| {
            warn!("Refusing bitmap of {} bytes: {}", blob.len(), e);
            e
        })
}
