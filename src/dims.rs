use crate::imagesize::ImageMetadata;
use crate::matcher::Density;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CssSize {
    pub width: String,
    pub height: String,
}

// An @2x asset with odd pixel dimensions cannot halve to whole CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DensityMismatch;

pub(crate) fn scaled_size(
    metadata: &ImageMetadata,
    density: Density,
) -> Result<CssSize, DensityMismatch> {
    match density {
        Density::Single => Ok(CssSize {
            width: format!("{}px", metadata.width),
            height: format!("{}px", metadata.height),
        }),
        Density::Double => {
            if metadata.width % 2 != 0 || metadata.height % 2 != 0 {
                return Err(DensityMismatch);
            }
            Ok(CssSize {
                width: format!("{}px", metadata.width / 2),
                height: format!("{}px", metadata.height / 2),
            })
        }
        // No parity check at 3x: exact division is the asset author's
        // responsibility, and a fractional result is emitted as-is.
        Density::Triple => Ok(CssSize {
            width: format!("{}px", f64::from(metadata.width) / 3.0),
            height: format!("{}px", f64::from(metadata.height) / 3.0),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagesize::ImageFormat;

    fn meta(width: u32, height: u32) -> ImageMetadata {
        ImageMetadata {
            width,
            height,
            format: ImageFormat::Png,
        }
    }

    #[test]
    fn single_density_passes_raw_dimensions_through() {
        let size = scaled_size(&meta(200, 100), Density::Single).expect("size");
        assert_eq!(size.width, "200px");
        assert_eq!(size.height, "100px");
    }

    #[test]
    fn double_density_halves_even_dimensions() {
        let size = scaled_size(&meta(200, 100), Density::Double).expect("size");
        assert_eq!(size.width, "100px");
        assert_eq!(size.height, "50px");
    }

    #[test]
    fn double_density_rejects_odd_dimensions() {
        assert_eq!(
            scaled_size(&meta(201, 100), Density::Double),
            Err(DensityMismatch)
        );
        assert_eq!(
            scaled_size(&meta(200, 101), Density::Double),
            Err(DensityMismatch)
        );
    }

    #[test]
    fn triple_density_divides_exactly_when_possible() {
        let size = scaled_size(&meta(120, 90), Density::Triple).expect("size");
        assert_eq!(size.width, "40px");
        assert_eq!(size.height, "30px");
    }

    #[test]
    fn triple_density_keeps_fractional_results() {
        let size = scaled_size(&meta(100, 50), Density::Triple).expect("size");
        assert_eq!(size.width, "33.333333333333336px");
        assert_eq!(size.height, "16.666666666666668px");
    }
}
