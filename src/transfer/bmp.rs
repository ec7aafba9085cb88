use image::RgbImage;

pub const FILE_HEADER_LEN: u32 = 14;
pub const INFO_HEADER_LEN: u32 = 40;
pub const PIXEL_OFFSET: u32 = FILE_HEADER_LEN + INFO_HEADER_LEN;

/// Bytes of padding after each row so rows start on a 4-byte boundary.
pub fn row_padding(width: u32) -> u32 {
    (4 - width * 3 % 4) % 4
}

/// Uncompressed 24-bit BMP: 54-byte header, then BGR rows bottom to top,
/// each padded to a multiple of 4 bytes.
pub fn encode_bmp(img: &RgbImage) -> Vec<u8> {
    let (width, height) = img.dimensions();
    let padding = row_padding(width);
    let image_size = (width * 3 + padding) * height;
    let file_size = image_size + PIXEL_OFFSET;

    let mut out = Vec::with_capacity(file_size as usize);

    /// file header
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&PIXEL_OFFSET.to_le_bytes());

    /// info header
    out.extend_from_slice(&INFO_HEADER_LEN.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&image_size.to_le_bytes());
    // resolution, palette size, important colors
    out.extend_from_slice(&[0; 16]);

    for y in (0..height).rev() {
        for x in 0..width {
            let [r, g, b] = img.get_pixel(x, y).0;
            out.extend_from_slice(&[b, g, r]);
        }
        out.extend(std::iter::repeat(0).take(padding as usize));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn test_padding() {
        assert_eq!(row_padding(1), 1);
        assert_eq!(row_padding(2), 2);
        assert_eq!(row_padding(3), 3);
        assert_eq!(row_padding(4), 0);
        assert_eq!(row_padding(640), 0);
    }

    #[test]
    fn test_header() {
        let img = RgbImage::new(3, 2);
        let bmp = encode_bmp(&img);

        /// 3 px * 3 bytes + 3 pad = 12 per row
        assert_eq!(bmp.len(), 54 + 24);
        assert_eq!(&bmp[0..2], b"BM");
        assert_eq!(u32_at(&bmp, 2), 78);
        assert_eq!(u32_at(&bmp, 10), 54);
        assert_eq!(u32_at(&bmp, 14), 40);
        assert_eq!(u32_at(&bmp, 18), 3);
        assert_eq!(u32_at(&bmp, 22), 2);
        assert_eq!(&bmp[26..30], &[1, 0, 24, 0]);
        assert_eq!(u32_at(&bmp, 30), 0);
        assert_eq!(u32_at(&bmp, 34), 24);
        assert!(bmp[38..54].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rows_bottom_up_bgr() {
        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgb([1, 2, 3]));
        img.put_pixel(0, 1, image::Rgb([4, 5, 6]));
        let bmp = encode_bmp(&img);

        /// bottom row first, one pad byte after each row
        assert_eq!(&bmp[54..], &[6, 5, 4, 0, 3, 2, 1, 0]);
    }
}
