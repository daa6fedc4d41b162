use crate::foundation::core::Canvas;
use crate::foundation::error::{CartoError, CartoResult};

/// Premultiplied RGBA8 raster target backed by a `vello_cpu` pixmap.
pub struct Surface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> CartoResult<Self> {
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| CartoError::resource("surface width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| CartoError::resource("surface height exceeds u16"))?;
        if width_u16 == 0 || height_u16 == 0 {
            return Err(CartoError::resource(format!(
                "cannot allocate a {width}x{height} surface"
            )));
        }
        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        pixmap.data_as_u8_slice_mut().fill(0);
        Ok(Self {
            width: width_u16,
            height: height_u16,
            pixmap,
        })
    }

    pub fn for_canvas(canvas: Canvas) -> CartoResult<Self> {
        Self::new(canvas.width, canvas.height)
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    /// Fill every pixel with a premultiplied color.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for px in self.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let d = &self.data()[idx..idx + 4];
        Some([d[0], d[1], d[2], d[3]])
    }

    pub(crate) fn dims_u16(&self) -> (u16, u16) {
        (self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
