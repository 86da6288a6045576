/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::fmt;

use crate::math::Vector3;

/// A detector mounted at the end of the detector chain. The variants carry
/// the pixel geometry of position-sensitive detectors; image processing
/// itself is out of scope, only the kf direction matters here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Detector {
    /// A point detector.
    ZeroD,
    /// A strip detector.
    OneD { pixels: u32, pitch_mm: f64 },
    /// An area detector.
    TwoD {
        width: u32,
        height: u32,
        pitch_mm: f64,
    },
}

impl Detector {
    /// The direction of the outgoing beam in detector-local coordinates
    /// (the reference pixel for position-sensitive detectors).
    pub fn kf_direction(&self) -> Vector3 {
        Vector3::x()
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::ZeroD
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroD => write!(f, "0D detector"),
            Self::OneD { pixels, pitch_mm } => {
                write!(f, "1D detector ({pixels} px, {pitch_mm} mm pitch)")
            }
            Self::TwoD {
                width,
                height,
                pitch_mm,
            } => write!(f, "2D detector ({width}x{height} px, {pitch_mm} mm pitch)"),
        }
    }
}

#[cfg(test)]
mod ut_detector {
    use super::{Detector, Vector3};

    #[test]
    fn test_kinds() {
        let detectors = [
            Detector::ZeroD,
            Detector::OneD {
                pixels: 1280,
                pitch_mm: 0.05,
            },
            Detector::TwoD {
                width: 1024,
                height: 512,
                pitch_mm: 0.172,
            },
        ];
        for detector in detectors {
            // The reference pixel always looks down the beam.
            assert_eq!(detector.kf_direction(), Vector3::x());
            assert!(!detector.to_string().is_empty());
        }
        assert_eq!(Detector::default(), Detector::ZeroD);
    }
}
