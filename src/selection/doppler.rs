// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Converting frequencies between frames of reference.
//!
//! Channel frequencies are always recorded in the observatory (topocentric)
//! frame. A frequency in another frame is related to the observed frequency by
//! the velocity of the observatory relative to that frame, projected onto the
//! direction of the phase centre.

use hifitime::Epoch;

use super::{FrameOfReference, SelectionError};
use crate::{
    constants::*,
    coord::{dot, get_lmst, LatLngHeight, RADec},
};

/// A multiplicative Doppler factor taking a frequency in some frame to the
/// observed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyTransform {
    factor: f64,
}

impl FrequencyTransform {
    pub fn identity() -> FrequencyTransform {
        FrequencyTransform { factor: 1.0 }
    }

    /// The transform for an observer moving towards the source at
    /// `radial_velocity` \[metres/second\] relative to the frame.
    pub fn from_radial_velocity(radial_velocity: f64) -> FrequencyTransform {
        FrequencyTransform {
            factor: 1.0 + radial_velocity / VEL_C,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    #[inline]
    pub fn to_observed(&self, freq_hz: f64) -> f64 {
        freq_hz * self.factor
    }

    #[inline]
    pub fn from_observed(&self, freq_hz: f64) -> f64 {
        freq_hz / self.factor
    }
}

/// Something that knows how to get from a frame of reference to the observed
/// frame at an epoch.
pub trait FrequencyConverter: Send + Sync {
    fn transform(
        &self,
        frame: FrameOfReference,
        epoch: Epoch,
    ) -> Result<FrequencyTransform, SelectionError>;
}

/// Treats every frame as the observed frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl FrequencyConverter for IdentityConverter {
    fn transform(
        &self,
        frame: FrameOfReference,
        _epoch: Epoch,
    ) -> Result<FrequencyTransform, SelectionError> {
        match frame {
            FrameOfReference::Channels => Err(SelectionError::Conversion {
                frame,
                reason: "channel indices have no frequencies".to_string(),
            }),
            _ => Ok(FrequencyTransform::identity()),
        }
    }
}

/// First-order Doppler corrections for an observatory looking at a phase
/// centre. The Earth's rotation, its orbit around the Sun and the Sun's motion
/// relative to the local standard of rest are included; the Earth's orbit is
/// taken to be circular, which is good to about 500 m/s.
#[derive(Debug, Clone, Copy)]
pub struct DopplerConverter {
    array_position: LatLngHeight,
    phase_centre: RADec,
}

impl DopplerConverter {
    pub fn new(array_position: LatLngHeight, phase_centre: RADec) -> DopplerConverter {
        DopplerConverter {
            array_position,
            phase_centre,
        }
    }

    /// The velocity of the observatory due to the Earth's rotation, in
    /// equatorial coordinates \[metres/second\].
    fn diurnal_velocity(&self, epoch: Epoch) -> [f64; 3] {
        let lmst = get_lmst(epoch, self.array_position.longitude_rad);
        let speed = EARTH_ROTATION_RAD_PER_S
            * (EARTH_RADIUS_M + self.array_position.height_metres)
            * self.array_position.latitude_rad.cos();
        [-speed * lmst.sin(), speed * lmst.cos(), 0.0]
    }

    /// The Earth's velocity around the Sun, in equatorial coordinates
    /// \[metres/second\].
    fn orbital_velocity(epoch: Epoch) -> [f64; 3] {
        let n = epoch.to_mjd_utc_days() - MJD_J2000;
        let mean_longitude = (280.460 + 0.985_647_4 * n).to_radians();
        let mean_anomaly = (357.528 + 0.985_600_3 * n).to_radians();
        // The ecliptic longitude of the Sun as seen from the Earth.
        let lambda = mean_longitude
            + 1.915_f64.to_radians() * mean_anomaly.sin()
            + 0.020_f64.to_radians() * (2.0 * mean_anomaly).sin();

        let (x, y) = (
            EARTH_ORBITAL_SPEED_M_PER_S * lambda.sin(),
            -EARTH_ORBITAL_SPEED_M_PER_S * lambda.cos(),
        );
        let (s_eps, c_eps) = OBLIQUITY_J2000_DEG.to_radians().sin_cos();
        [x, y * c_eps, y * s_eps]
    }

    /// The Sun's velocity relative to the kinematic local standard of rest
    /// \[metres/second\].
    fn solar_velocity() -> [f64; 3] {
        let apex = RADec::new_degrees(SOLAR_APEX_LSRK_RA_DEG, SOLAR_APEX_LSRK_DEC_DEG);
        apex.to_unit_vector()
            .map(|c| c * SOLAR_MOTION_LSRK_M_PER_S)
    }

    /// The velocity of the observatory relative to `frame`.
    fn observer_velocity(
        &self,
        frame: FrameOfReference,
        epoch: Epoch,
    ) -> Result<[f64; 3], SelectionError> {
        let add = |a: [f64; 3], b: [f64; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
        let v = match frame {
            FrameOfReference::Channels => {
                return Err(SelectionError::Conversion {
                    frame,
                    reason: "channel indices have no frequencies".to_string(),
                })
            }
            FrameOfReference::Topo => [0.0; 3],
            FrameOfReference::Geo => self.diurnal_velocity(epoch),
            FrameOfReference::Bary => add(
                self.diurnal_velocity(epoch),
                Self::orbital_velocity(epoch),
            ),
            FrameOfReference::Lsrk => add(
                add(self.diurnal_velocity(epoch), Self::orbital_velocity(epoch)),
                Self::solar_velocity(),
            ),
        };
        Ok(v)
    }
}

impl FrequencyConverter for DopplerConverter {
    fn transform(
        &self,
        frame: FrameOfReference,
        epoch: Epoch,
    ) -> Result<FrequencyTransform, SelectionError> {
        let v = self.observer_velocity(frame, epoch)?;
        let radial = dot(v, self.phase_centre.to_unit_vector());
        if !radial.is_finite() {
            return Err(SelectionError::Conversion {
                frame,
                reason: format!("non-finite radial velocity at {epoch}"),
            });
        }
        Ok(FrequencyTransform::from_radial_velocity(radial))
    }
}
