use crate::pattern::Raster;

/// The single sampled image the background quad displays.
///
/// `replace` is the only mutator. The renderer uploads on the next draw while
/// [`TextureSurface::needs_upload`] is set and clears it afterwards.
#[derive(Debug, Default)]
pub struct TextureSurface {
    raster: Option<Raster>,
    needs_upload: bool,
    version: u64,
}

impl TextureSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the previous raster and marks the surface for upload.
    pub fn replace(&mut self, raster: Raster) {
        self.raster = Some(raster);
        self.needs_upload = true;
        self.version += 1;
    }

    pub fn raster(&self) -> Option<&Raster> {
        self.raster.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.raster.is_none()
    }

    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
    }

    /// Incremented by every `replace`.
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::pattern::draw_pattern;
    use crate::settings::{PatternStyle, StyleSelection, Theme};

    fn small_raster(aspect: f64) -> Raster {
        let mut rng = StdRng::seed_from_u64(3);
        draw_pattern(
            aspect,
            &StyleSelection::Known(PatternStyle::Cherokee),
            Theme::Dark,
            &mut rng,
        )
    }

    #[test]
    fn replace_marks_dirty_and_bumps_version() {
        let mut surface = TextureSurface::new();
        assert!(surface.is_empty());
        assert!(!surface.needs_upload());

        surface.replace(small_raster(2.0));
        assert!(surface.needs_upload());
        assert_eq!(surface.version(), 1);

        surface.mark_uploaded();
        assert!(!surface.needs_upload());

        surface.replace(small_raster(0.5));
        assert!(surface.needs_upload());
        assert_eq!(surface.version(), 2);
        let raster = surface.raster().expect("raster present");
        assert_eq!((raster.width(), raster.height()), (1024, 2048));
    }
}
