// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Handle the small amount of coordinate work needed to convert frequencies
between reference frames.
 */

use std::f64::consts::TAU;

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::constants::MJD_J2000;

/// A struct containing a Right Ascension and Declination. All units are in
/// radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RADec {
    /// Right ascension \[radians\]
    pub ra: f64,
    /// Declination \[radians\]
    pub dec: f64,
}

impl RADec {
    /// Make a new `RADec` struct from values in radians.
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    /// Make a new `RADec` struct from values in degrees.
    pub fn new_degrees(ra: f64, dec: f64) -> Self {
        Self::new(ra.to_radians(), dec.to_radians())
    }

    /// The unit vector pointing at these coordinates in the equatorial frame.
    pub fn to_unit_vector(self) -> [f64; 3] {
        let (s_ra, c_ra) = self.ra.sin_cos();
        let (s_dec, c_dec) = self.dec.sin_cos();
        [c_dec * c_ra, c_dec * s_ra, s_dec]
    }
}

impl std::fmt::Display for RADec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}°, {}°)", self.ra.to_degrees(), self.dec.to_degrees())
    }
}

/// A geodetic position on the Earth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLngHeight {
    /// Longitude \[radians\]
    pub longitude_rad: f64,
    /// Latitude \[radians\]
    pub latitude_rad: f64,
    /// Height above the ellipsoid \[metres\]
    pub height_metres: f64,
}

impl LatLngHeight {
    /// The MWA's location.
    pub fn new_mwa() -> Self {
        Self {
            longitude_rad: 2.0362897754687257,
            latitude_rad: -0.46606083776035967,
            height_metres: 377.0,
        }
    }
}

impl std::fmt::Display for LatLngHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({:.4}°, {:.4}°, {}m)",
            self.longitude_rad.to_degrees(),
            self.latitude_rad.to_degrees(),
            self.height_metres
        )
    }
}

/// Get the local mean sidereal time \[radians\] for an epoch and longitude,
/// ignoring precession and nutation. This uses the IAU 1982 GMST expression,
/// which is more than good enough for Doppler corrections.
pub fn get_lmst(time: Epoch, array_longitude_rad: f64) -> f64 {
    let mjd = time.to_mjd_utc_days();
    let d = mjd - MJD_J2000;
    let t = d / 36525.0;
    let gmst_deg =
        280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t - t * t * t / 38_710_000.0;
    (gmst_deg.to_radians() + array_longitude_rad).rem_euclid(TAU)
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_unit_vector_is_normalised() {
        let radec = RADec::new_degrees(123.4, -56.7);
        let v = radec.to_unit_vector();
        assert_abs_diff_eq!(dot(v, v), 1.0, epsilon = 1e-12);

        let pole = RADec::new_degrees(0.0, 90.0).to_unit_vector();
        assert_abs_diff_eq!(pole[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lmst_advances_sidereally() {
        let t0 = Epoch::from_gpst_seconds(1090008640.0);
        let lst0 = get_lmst(t0, 0.0);
        assert!((0.0..TAU).contains(&lst0));

        // After one solar hour, the sidereal time has advanced by a little
        // more than 15 degrees.
        let t1 = Epoch::from_gpst_seconds(1090008640.0 + 3600.0);
        let lst1 = get_lmst(t1, 0.0);
        let diff = (lst1 - lst0).rem_euclid(TAU).to_degrees();
        assert_abs_diff_eq!(diff, 15.041, epsilon = 1e-3);

        // Longitude is a pure offset.
        let lst_east = get_lmst(t0, 1.0);
        assert_abs_diff_eq!((lst_east - lst0).rem_euclid(TAU), 1.0, epsilon = 1e-9);
    }
}
