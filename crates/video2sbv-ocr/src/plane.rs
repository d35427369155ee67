use std::fmt;

use video2sbv_types::Region;

/// Immutable view over a tightly packed single-channel 8-bit image.
#[derive(Clone)]
pub struct LumaPlane<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> LumaPlane<'a> {
    pub fn from_region(region: &'a Region) -> Self {
        Self {
            width: region.width(),
            height: region.height(),
            data: region.data(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl fmt::Debug for LumaPlane<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LumaPlane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use video2sbv_types::RegionBounds;

    #[test]
    fn region_view_keeps_dimensions_and_pixels() {
        let region = Region::from_owned(RegionBounds::new(5, 5, 3, 2), vec![7; 6]).unwrap();
        let plane = LumaPlane::from_region(&region);
        assert_eq!((plane.width(), plane.height()), (3, 2));
        assert_eq!(plane.data(), &[7; 6]);
    }
}
