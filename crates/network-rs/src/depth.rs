//! Cortical depth bands
//!
//! A population's depth interval is chosen from its layer label. Labels are
//! matched by substring in a fixed order, `"23"`, `"4"`, `"56"`, `"5"`, `"6"`,
//! so that a merged `L56` label reaches the merged band before either of the
//! single-layer bands can claim it.

use crate::{NetworkError, Result};
use tcmodel_core::Depth;

/// `[upper, lower]` in um below pia
pub type DepthRange = [Depth; 2];

/// Usable layer bands, pia excluded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerBands {
    pub l23: DepthRange,
    pub l4: DepthRange,
    pub l5: DepthRange,
    pub l6: DepthRange,
}

impl LayerBands {
    /// Bands from the five configured boundaries (pia, L2/3, L4, L5, L6)
    pub fn from_boundaries(boundaries: &[DepthRange; 5]) -> Result<Self> {
        let bands = Self {
            l23: checked("L23", boundaries[1])?,
            l4: checked("L4", boundaries[2])?,
            l5: checked("L5", boundaries[3])?,
            l6: checked("L6", boundaries[4])?,
        };
        Ok(bands)
    }

    /// Top of layer 5 to the bottom of layer 6
    pub fn merged_deep(&self) -> Result<DepthRange> {
        checked("L56", [self.l5[0], self.l6[1]])
    }

    pub fn depth_for(&self, layer: &str) -> Result<DepthRange> {
        if layer.contains("23") {
            Ok(self.l23)
        } else if layer.contains('4') {
            Ok(self.l4)
        } else if layer.contains("56") {
            self.merged_deep()
        } else if layer.contains('5') {
            Ok(self.l5)
        } else if layer.contains('6') {
            Ok(self.l6)
        } else {
            Err(NetworkError::UnrecognizedLayer(layer.to_string()))
        }
    }
}

fn checked(band: &str, range: DepthRange) -> Result<DepthRange> {
    if range[0] < range[1] {
        Ok(range)
    } else {
        Err(NetworkError::InvalidDepthBand {
            band: band.to_string(),
            upper: range[0],
            lower: range[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcmodel_core::ModelConfig;

    fn default_bands() -> LayerBands {
        LayerBands::from_boundaries(&ModelConfig::default().layer_boundaries).unwrap()
    }

    #[test]
    fn test_layer_matching() {
        let bands = default_bands();
        assert_eq!(bands.depth_for("L23").unwrap(), [81.6, 587.1]);
        assert_eq!(bands.depth_for("L4").unwrap(), [587.1, 922.2]);
        assert_eq!(bands.depth_for("L5").unwrap(), [922.2, 1170.0]);
        assert_eq!(bands.depth_for("L6").unwrap(), [1170.0, 1491.7]);
    }

    #[test]
    fn test_merged_deep_band() {
        let bands = default_bands();
        assert_eq!(bands.depth_for("L56").unwrap(), [922.2, 1491.7]);
    }

    #[test]
    fn test_unrecognized_layer() {
        let err = default_bands().depth_for("thalamus").unwrap_err();
        assert!(matches!(err, NetworkError::UnrecognizedLayer(ref l) if l == "thalamus"));
    }

    #[test]
    fn test_inverted_bands() {
        let mut boundaries = ModelConfig::default().layer_boundaries;
        boundaries[3] = [1170.0, 922.2];
        assert!(matches!(
            LayerBands::from_boundaries(&boundaries),
            Err(NetworkError::InvalidDepthBand { .. })
        ));

        // Individually valid bands whose merge is empty
        let bands = LayerBands {
            l23: [81.6, 587.1],
            l4: [587.1, 922.2],
            l5: [1400.0, 1450.0],
            l6: [1100.0, 1300.0],
        };
        let err = bands.depth_for("L56").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidDepthBand { ref band, .. } if band == "L56"));
        assert_eq!(bands.depth_for("L6").unwrap(), [1100.0, 1300.0]);
    }
}
