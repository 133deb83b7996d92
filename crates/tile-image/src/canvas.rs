//! In-memory tile canvas.
//!
//! A square, 8-bit canvas of up to three data band planes plus one alpha
//! plane, zero-initialized so pixels outside the written destination
//! window stay transparent black. Partial tiles at the raster's edge
//! write only their destination window; the rest of the canvas is left
//! untouched.

use tiles_common::{PixelWindow, TilerError, TilerResult};

pub struct TileCanvas {
    size: u32,
    data_bands: usize,
    planes: Vec<Vec<u8>>,
    alpha: Vec<u8>,
}

impl TileCanvas {
    /// Allocate a `size x size` canvas with `data_bands` band planes
    /// (1..=3) and one alpha plane.
    ///
    /// # Panics
    /// Panics if `data_bands` is 0 or greater than 3.
    pub fn new(size: u32, data_bands: usize) -> Self {
        assert!(
            (1..=3).contains(&data_bands),
            "canvas supports 1..=3 data bands, got {data_bands}"
        );
        let pixels = (size as usize) * (size as usize);
        Self {
            size,
            data_bands,
            planes: vec![vec![0u8; pixels]; data_bands],
            alpha: vec![0u8; pixels],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn data_bands(&self) -> usize {
        self.data_bands
    }

    fn check_dst(&self, dst: &PixelWindow) -> TilerResult<()> {
        let size = self.size as usize;
        if dst.is_empty() || dst.x + dst.width > size || dst.y + dst.height > size {
            return Err(TilerError::EncodeFailed(format!(
                "destination window {},{} {}x{} outside {size}x{size} canvas",
                dst.x, dst.y, dst.width, dst.height
            )));
        }
        Ok(())
    }

    fn write_plane(&mut self, plane_index: usize, dst: &PixelWindow, data: &[u8]) {
        let size = self.size as usize;
        let plane = if plane_index < self.data_bands {
            &mut self.planes[plane_index]
        } else {
            &mut self.alpha
        };
        for row in 0..dst.height {
            let src_start = row * dst.width;
            let dst_start = (dst.y + row) * size + dst.x;
            plane[dst_start..dst_start + dst.width]
                .copy_from_slice(&data[src_start..src_start + dst.width]);
        }
    }

    /// Write band-sequential 8-bit planes into the destination window.
    pub fn write_bands(&mut self, dst: PixelWindow, data: &[u8]) -> TilerResult<()> {
        self.check_dst(&dst)?;
        let plane_len = dst.width * dst.height;
        if data.len() != plane_len * self.data_bands {
            return Err(TilerError::EncodeFailed(format!(
                "expected {} band samples, got {}",
                plane_len * self.data_bands,
                data.len()
            )));
        }
        for band in 0..self.data_bands {
            self.write_plane(band, &dst, &data[band * plane_len..(band + 1) * plane_len]);
        }
        Ok(())
    }

    /// Write the alpha plane into the destination window.
    pub fn write_alpha(&mut self, dst: PixelWindow, data: &[u8]) -> TilerResult<()> {
        self.check_dst(&dst)?;
        if data.len() != dst.width * dst.height {
            return Err(TilerError::EncodeFailed(format!(
                "expected {} alpha samples, got {}",
                dst.width * dst.height,
                data.len()
            )));
        }
        self.write_plane(self.data_bands, &dst, data);
        Ok(())
    }

    /// Interleave the planes to RGBA.
    ///
    /// One band replicates across RGB; with two bands the second fills
    /// both green and blue.
    pub fn to_rgba(&self) -> Vec<u8> {
        let pixels = (self.size as usize) * (self.size as usize);
        let r = &self.planes[0];
        let g = &self.planes[1.min(self.data_bands - 1)];
        let b = &self.planes[2.min(self.data_bands - 1)];

        let mut rgba = Vec::with_capacity(pixels * 4);
        for i in 0..pixels {
            rgba.push(r[i]);
            rgba.push(g[i]);
            rgba.push(b[i]);
            rgba.push(self.alpha[i]);
        }
        rgba
    }
}
