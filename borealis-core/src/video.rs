// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `video` module provides video frame buffers and colour conversion.

/// The luminance plane index.
pub const PLANE_Y: usize = 0;
/// The first chrominance plane index.
pub const PLANE_U: usize = 1;
/// The second chrominance plane index.
pub const PLANE_V: usize = 2;
/// The alpha plane index.
pub const PLANE_A: usize = 3;

/// The geometry of one plane of a `YuvaBuffer`.
///
/// Planes are stored padded out to whole 8x8 blocks: `stride >= width` and `rows >= height`.
/// Only the top-left `width` x `height` region carries picture data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlaneSpec {
    /// The picture width of the plane in pixels.
    pub width: usize,
    /// The picture height of the plane in pixels.
    pub height: usize,
    /// The distance between the start of two consecutive rows in bytes.
    pub stride: usize,
    /// The allocated number of rows.
    pub rows: usize,
}

impl PlaneSpec {
    fn full(width: u32, height: u32) -> Self {
        PlaneSpec {
            width: width as usize,
            height: height as usize,
            stride: (width as usize + 7) & !7,
            rows: (height as usize + 7) & !7,
        }
    }

    fn half(width: u32, height: u32) -> Self {
        PlaneSpec {
            width: (width / 2) as usize,
            height: (height / 2) as usize,
            // Half-resolution planes are blocked on 16 pixel boundaries of the full image.
            stride: ((width as usize + 15) / 16) * 8,
            rows: ((height as usize + 15) / 16) * 8,
        }
    }
}

/// A `YuvaBuffer` is a set of four owned byte planes: full-resolution luminance and alpha, and
/// two quarter-resolution (4:2:0) chrominance planes.
pub struct YuvaBuffer {
    width: u32,
    height: u32,
    specs: [PlaneSpec; 4],
    planes: [Vec<u8>; 4],
}

impl YuvaBuffer {
    /// Allocates a buffer for the given picture dimensions: black luminance and chrominance with
    /// a fully opaque alpha plane.
    pub fn new(width: u32, height: u32) -> Self {
        let specs = [
            PlaneSpec::full(width, height),
            PlaneSpec::half(width, height),
            PlaneSpec::half(width, height),
            PlaneSpec::full(width, height),
        ];

        let planes = [
            vec![0x00; specs[PLANE_Y].stride * specs[PLANE_Y].rows],
            vec![0x00; specs[PLANE_U].stride * specs[PLANE_U].rows],
            vec![0x00; specs[PLANE_V].stride * specs[PLANE_V].rows],
            vec![0xff; specs[PLANE_A].stride * specs[PLANE_A].rows],
        ];

        YuvaBuffer { width, height, specs, planes }
    }

    /// The picture width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The picture height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Gets the geometry of a plane.
    pub fn spec(&self, plane: usize) -> PlaneSpec {
        self.specs[plane]
    }

    /// Gets an immutable slice of a plane.
    pub fn plane(&self, plane: usize) -> &[u8] {
        &self.planes[plane]
    }

    /// Gets a mutable slice of a plane.
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        &mut self.planes[plane]
    }

    /// Resets the buffer to its initial state: black with full opacity.
    pub fn reset(&mut self) {
        for plane in [PLANE_Y, PLANE_U, PLANE_V].iter() {
            self.planes[*plane].iter_mut().for_each(|p| *p = 0x00);
        }
        self.planes[PLANE_A].iter_mut().for_each(|p| *p = 0xff);
    }
}

#[inline(always)]
fn clamp_u8(val: i32) -> u8 {
    val.max(0).min(255) as u8
}

/// A `BgraBuffer` is a packed 8-bit-per-channel BGRA frame with a top-left origin.
pub struct BgraBuffer {
    width: u32,
    height: u32,
    pitch: usize,
    data: Vec<u8>,
}

impl BgraBuffer {
    /// Allocates a fully transparent black frame of `pitch * height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        let pitch = width as usize;
        BgraBuffer { width, height, pitch, data: vec![0x00; pitch * height as usize * 4] }
    }

    /// The picture width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The picture height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The distance between the start of two consecutive rows in pixels.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Gets the frame contents as a byte slice of `pitch * height * 4` bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Converts a YUVA frame into this buffer, flipping it vertically in the process.
    ///
    /// The conversion is integer full-range BT.601 with nearest-neighbour chroma upsampling.
    /// The source buffer must have the same picture dimensions as this buffer.
    pub fn convert_from_yuva(&mut self, src: &YuvaBuffer) {
        assert!(src.width() == self.width && src.height() == self.height);

        let y_spec = src.spec(PLANE_Y);
        let c_spec = src.spec(PLANE_U);
        let a_spec = src.spec(PLANE_A);

        let y_plane = src.plane(PLANE_Y);
        let u_plane = src.plane(PLANE_U);
        let v_plane = src.plane(PLANE_V);
        let a_plane = src.plane(PLANE_A);

        let height = self.height as usize;
        let width = self.width as usize;

        for out_row in 0..height {
            let src_row = height - 1 - out_row;

            let y_line = &y_plane[src_row * y_spec.stride..];
            let a_line = &a_plane[src_row * a_spec.stride..];
            let u_line = &u_plane[(src_row / 2) * c_spec.stride..];
            let v_line = &v_plane[(src_row / 2) * c_spec.stride..];

            let out_line = &mut self.data[out_row * self.pitch * 4..][..width * 4];

            for (x, out) in out_line.chunks_exact_mut(4).enumerate() {
                let y = i32::from(y_line[x]);
                let cu = i32::from(u_line[x / 2]) - 128;
                let cv = i32::from(v_line[x / 2]) - 128;

                out[0] = clamp_u8(y + ((116130 * cu) >> 16));
                out[1] = clamp_u8(y - ((22554 * cu + 46802 * cv) >> 16));
                out[2] = clamp_u8(y + ((91881 * cv) >> 16));
                out[3] = a_line[x];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BgraBuffer, YuvaBuffer, PLANE_A, PLANE_U, PLANE_V, PLANE_Y};

    #[test]
    fn verify_plane_geometry() {
        let buf = YuvaBuffer::new(20, 12);

        let y = buf.spec(PLANE_Y);
        assert_eq!((y.width, y.height, y.stride, y.rows), (20, 12, 24, 16));

        let u = buf.spec(PLANE_U);
        assert_eq!((u.width, u.height, u.stride, u.rows), (10, 6, 16, 8));

        assert_eq!(buf.spec(PLANE_U), buf.spec(PLANE_V));
        assert_eq!(buf.spec(PLANE_A), buf.spec(PLANE_Y));
    }

    #[test]
    fn verify_initial_planes() {
        let buf = YuvaBuffer::new(8, 8);

        assert!(buf.plane(PLANE_Y).iter().all(|&p| p == 0x00));
        assert!(buf.plane(PLANE_U).iter().all(|&p| p == 0x00));
        assert!(buf.plane(PLANE_A).iter().all(|&p| p == 0xff));
    }

    #[test]
    fn verify_bt601_grey_point() {
        // A mid-grey YUVA frame must convert to mid-grey BGRA exactly.
        let mut yuva = YuvaBuffer::new(8, 8);
        yuva.plane_mut(PLANE_Y).iter_mut().for_each(|p| *p = 128);
        yuva.plane_mut(PLANE_U).iter_mut().for_each(|p| *p = 128);
        yuva.plane_mut(PLANE_V).iter_mut().for_each(|p| *p = 128);

        let mut bgra = BgraBuffer::new(8, 8);
        bgra.convert_from_yuva(&yuva);

        for px in bgra.bytes().chunks_exact(4) {
            assert_eq!(px, &[128, 128, 128, 255]);
        }
    }

    #[test]
    fn verify_bt601_white_and_black() {
        let mut yuva = YuvaBuffer::new(8, 8);
        yuva.plane_mut(PLANE_U).iter_mut().for_each(|p| *p = 128);
        yuva.plane_mut(PLANE_V).iter_mut().for_each(|p| *p = 128);

        let mut bgra = BgraBuffer::new(8, 8);
        bgra.convert_from_yuva(&yuva);
        assert_eq!(&bgra.bytes()[0..4], &[0, 0, 0, 255]);

        yuva.plane_mut(PLANE_Y).iter_mut().for_each(|p| *p = 255);
        bgra.convert_from_yuva(&yuva);
        assert_eq!(&bgra.bytes()[0..4], &[255, 255, 255, 255]);
    }

    #[test]
    fn verify_vertical_flip() {
        let mut yuva = YuvaBuffer::new(8, 8);
        yuva.plane_mut(PLANE_U).iter_mut().for_each(|p| *p = 128);
        yuva.plane_mut(PLANE_V).iter_mut().for_each(|p| *p = 128);

        // Paint only the top source row white.
        let stride = yuva.spec(PLANE_Y).stride;
        yuva.plane_mut(PLANE_Y)[..stride].iter_mut().for_each(|p| *p = 255);

        let mut bgra = BgraBuffer::new(8, 8);
        bgra.convert_from_yuva(&yuva);

        // It must come out as the bottom output row.
        let last_row = &bgra.bytes()[7 * 8 * 4..];
        assert!(last_row.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
        assert_eq!(&bgra.bytes()[0..4], &[0, 0, 0, 255]);
    }
}
