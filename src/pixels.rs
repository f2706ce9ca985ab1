//! Owned 8-bit, 4-channel pixel buffers.
//!
//! PDFium renders BGRA while the `image` crate and PNG want RGBA, so every
//! [`PixelBuffer`] carries its [`ChannelOrder`] and row stride explicitly.
//! Conversions are in-place byte swaps; no colour transform happens.
//!
//! Buffers are allocated with `try_reserve_exact`, so a page or canvas too
//! large for the process reports [`PixelError::Allocation`] instead of
//! aborting.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use thiserror::Error;

/// Bytes per pixel for every supported layout.
pub const BYTES_PER_PIXEL: usize = 4;

/// Opaque white, identical in both channel orders.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Byte order of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
}

#[derive(Debug, Error)]
pub enum PixelError {
    #[error("cannot allocate a {width}x{height} pixel buffer")]
    Allocation { width: u64, height: u64 },

    #[error("invalid pixel layout: {0}")]
    Layout(String),

    #[error("resize failed: {0}")]
    Resize(String),
}

/// A width × height grid of 4-byte pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("order", &self.order)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    /// A compact buffer with every pixel set to `pixel`.
    pub fn filled(
        width: u32,
        height: u32,
        order: ChannelOrder,
        pixel: [u8; 4],
    ) -> Result<Self, PixelError> {
        let alloc_err = || PixelError::Allocation {
            width: u64::from(width),
            height: u64::from(height),
        };
        if width == 0 || height == 0 {
            return Err(PixelError::Layout(format!(
                "{width}x{height} has no pixels"
            )));
        }
        let stride = (width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(alloc_err)?;
        let len = stride.checked_mul(height as usize).ok_or_else(alloc_err)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| alloc_err())?;
        data.extend(std::iter::repeat(pixel).take(len / BYTES_PER_PIXEL).flatten());

        Ok(Self {
            width,
            height,
            stride,
            order,
            data,
        })
    }

    /// Wrap raw bytes, e.g. a rendered bitmap whose rows may be padded.
    pub fn from_raw(
        width: u32,
        height: u32,
        stride: usize,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, PixelError> {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if width == 0 || height == 0 {
            return Err(PixelError::Layout(format!(
                "{width}x{height} has no pixels"
            )));
        }
        if stride < row_bytes {
            return Err(PixelError::Layout(format!(
                "stride {stride} is shorter than a {width}-pixel row"
            )));
        }
        let needed = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_bytes));
        if needed.map_or(true, |needed| data.len() < needed) {
            return Err(PixelError::Layout(format!(
                "{} bytes cannot hold {width}x{height} at stride {stride}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            order,
            data,
        })
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            stride: width as usize * BYTES_PER_PIXEL,
            order: ChannelOrder::Rgba,
            data: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// The pixels of row `y`, without stride padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * BYTES_PER_PIXEL;
        &mut self.data[start..start + len]
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = x as usize * BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[i], row[i + 1], row[i + 2], row[i + 3]]
    }

    /// Swap red and blue in place if `target` differs from the current order.
    pub fn convert_channel_order(&mut self, target: ChannelOrder) {
        if self.order == target {
            return;
        }
        for y in 0..self.height {
            for px in self.row_mut(y).chunks_exact_mut(BYTES_PER_PIXEL) {
                px.swap(0, 2);
            }
        }
        self.order = target;
    }

    pub fn into_channel_order(mut self, target: ChannelOrder) -> Self {
        self.convert_channel_order(target);
        self
    }

    /// Drop any row padding so that `stride == width * 4`.
    pub fn into_compact(self) -> Result<Self, PixelError> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if self.stride == row_bytes && self.data.len() == row_bytes * self.height as usize {
            return Ok(self);
        }
        let mut data = Vec::new();
        data.try_reserve_exact(row_bytes * self.height as usize)
            .map_err(|_| PixelError::Allocation {
                width: u64::from(self.width),
                height: u64::from(self.height),
            })?;
        for y in 0..self.height {
            data.extend_from_slice(self.row(y));
        }
        Ok(Self {
            stride: row_bytes,
            data,
            ..self
        })
    }

    /// Convert to RGBA and hand the bytes to an [`RgbaImage`].
    pub fn into_rgba_image(self) -> Result<RgbaImage, PixelError> {
        let compact = self.into_channel_order(ChannelOrder::Rgba).into_compact()?;
        let (w, h) = (compact.width, compact.height);
        RgbaImage::from_raw(w, h, compact.data)
            .ok_or_else(|| PixelError::Layout(format!("buffer does not fit {w}x{h}")))
    }

    /// Bilinear resample to `width` × `height`, keeping the channel order.
    pub fn resize(&self, width: u32, height: u32) -> Result<Self, PixelError> {
        if width == 0 || height == 0 {
            return Err(PixelError::Resize(format!(
                "target {width}x{height} has a zero dimension"
            )));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        reserve_resample(self.height, width, height)?;
        let order = self.order;
        // The filter treats the four channels independently, so BGRA data
        // can go through an RGBA image unchanged.
        let source = self.clone().into_compact()?;
        let image = RgbaImage::from_raw(source.width, source.height, source.data)
            .ok_or_else(|| PixelError::Resize("source buffer is truncated".into()))?;
        let resized = imageops::resize(&image, width, height, FilterType::Triangle);
        let mut out = Self::from_rgba_image(resized);
        out.order = order;
        Ok(out)
    }

    /// Copy `src` so its top-left corner lands at (`x`, `y`), clipped to
    /// this buffer. Pixels are converted to this buffer's channel order.
    pub fn blit_region(&mut self, src: &PixelBuffer, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width.min(self.width - x) as usize;
        let rows = src.height.min(self.height - y);
        let swap = src.order != self.order;
        let dx = x as usize * BYTES_PER_PIXEL;

        for row in 0..rows {
            let from = &src.row(row)[..cols * BYTES_PER_PIXEL];
            let to = &mut self.row_mut(y + row)[dx..dx + cols * BYTES_PER_PIXEL];
            to.copy_from_slice(from);
            if swap {
                for px in to.chunks_exact_mut(BYTES_PER_PIXEL) {
                    px.swap(0, 2);
                }
            }
        }
    }
}

/// Check that the resampler's working memory can be allocated.
///
/// `imageops::resize` first samples horizontally into a `width` × source
/// height buffer of `f32` RGBA, then vertically into the `u8` output. Both
/// are allocated infallibly, so an oversized target is refused here instead.
fn reserve_resample(source_height: u32, width: u32, height: u32) -> Result<(), PixelError> {
    let alloc_err = || PixelError::Allocation {
        width: u64::from(width),
        height: u64::from(height),
    };
    let intermediate = (width as usize)
        .checked_mul(source_height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL * std::mem::size_of::<f32>()));
    let output = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL));
    let total = intermediate
        .zip(output)
        .and_then(|(a, b)| a.checked_add(b))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(alloc_err)?;

    let mut working: Vec<u8> = Vec::new();
    working.try_reserve_exact(total).map_err(|_| alloc_err())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra_2x1() -> PixelBuffer {
        // blue, then red, in BGRA
        PixelBuffer::from_raw(
            2,
            1,
            8,
            ChannelOrder::Bgra,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
        )
        .unwrap()
    }

    #[test]
    fn bgra_to_rgba_swaps_red_and_blue() {
        let rgba = bgra_2x1().into_channel_order(ChannelOrder::Rgba);
        assert_eq!(rgba.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(rgba.pixel(1, 0), [255, 0, 0, 255]);
        assert_eq!(rgba.channel_order(), ChannelOrder::Rgba);
    }

    #[test]
    fn same_order_conversion_is_a_no_op() {
        let before = bgra_2x1();
        let after = before.clone().into_channel_order(ChannelOrder::Bgra);
        assert_eq!(before, after);
    }

    #[test]
    fn padded_rows_are_respected() {
        // 1x2 image, stride 8 with 4 junk bytes per row
        let data = vec![1, 2, 3, 4, 9, 9, 9, 9, 5, 6, 7, 8];
        let buf = PixelBuffer::from_raw(1, 2, 8, ChannelOrder::Rgba, data).unwrap();
        assert_eq!(buf.row(1), &[5, 6, 7, 8]);

        let swapped = buf.into_channel_order(ChannelOrder::Bgra);
        assert_eq!(swapped.pixel(0, 0), [3, 2, 1, 4]);

        let compact = swapped.into_compact().unwrap();
        assert_eq!(compact.stride(), 4);
        assert_eq!(compact.pixel(0, 1), [7, 6, 5, 8]);
    }

    #[test]
    fn from_raw_rejects_short_data_and_stride() {
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, 4, ChannelOrder::Rgba, vec![0; 16]),
            Err(PixelError::Layout(_))
        ));
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, 8, ChannelOrder::Rgba, vec![0; 15]),
            Err(PixelError::Layout(_))
        ));
    }

    #[test]
    fn huge_canvas_reports_allocation_failure() {
        let err = PixelBuffer::filled(u32::MAX, u32::MAX, ChannelOrder::Rgba, WHITE).unwrap_err();
        assert!(matches!(err, PixelError::Allocation { .. }), "got {err:?}");
    }

    #[test]
    fn resize_keeps_order_and_size() {
        let buf = PixelBuffer::filled(40, 20, ChannelOrder::Bgra, [10, 20, 30, 255]).unwrap();
        let small = buf.resize(10, 5).unwrap();
        assert_eq!((small.width(), small.height()), (10, 5));
        assert_eq!(small.channel_order(), ChannelOrder::Bgra);
        assert_eq!(small.pixel(3, 3), [10, 20, 30, 255]);
    }

    #[test]
    fn oversized_resize_target_reports_allocation_failure() {
        let buf = PixelBuffer::filled(2, 1, ChannelOrder::Rgba, WHITE).unwrap();
        for (w, h) in [(u32::MAX, u32::MAX), (u32::MAX, u32::MAX / 2)] {
            let err = buf.resize(w, h).unwrap_err();
            assert!(matches!(err, PixelError::Allocation { .. }), "{w}x{h}: {err:?}");
        }
    }

    #[test]
    fn from_raw_rejects_overflowing_stride() {
        let err = PixelBuffer::from_raw(1, 3, usize::MAX / 2, ChannelOrder::Rgba, vec![0; 16]);
        assert!(matches!(err, Err(PixelError::Layout(_))));
    }

    #[test]
    fn filled_sets_every_pixel() {
        let buf = PixelBuffer::filled(3, 2, ChannelOrder::Bgra, [1, 2, 3, 4]).unwrap();
        assert_eq!(buf.data.len(), 24);
        assert!(buf.data.chunks(4).all(|px| px == [1, 2, 3, 4]));
    }

    #[test]
    fn resize_to_zero_is_an_error() {
        let buf = PixelBuffer::filled(4, 4, ChannelOrder::Rgba, WHITE).unwrap();
        assert!(matches!(buf.resize(0, 4), Err(PixelError::Resize(_))));
    }

    #[test]
    fn blit_converts_and_clips() {
        let mut canvas = PixelBuffer::filled(3, 3, ChannelOrder::Rgba, WHITE).unwrap();
        let tile = PixelBuffer::filled(2, 2, ChannelOrder::Bgra, [1, 2, 3, 4]).unwrap();

        canvas.blit_region(&tile, 2, 1);

        assert_eq!(canvas.pixel(2, 1), [3, 2, 1, 4]);
        assert_eq!(canvas.pixel(2, 2), [3, 2, 1, 4]);
        assert_eq!(canvas.pixel(1, 1), WHITE);
        assert_eq!(canvas.pixel(2, 0), WHITE);
    }

    #[test]
    fn into_rgba_image_round_trip() {
        let img = bgra_2x1().into_rgba_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }
}
