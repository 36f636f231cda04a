// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Frequencies and velocities are
converted as late as possible.
 */

/// The number of ready row blocks the prefetch queue holds when no depth is
/// given.
pub const DEFAULT_LOOKAHEAD_DEPTH: usize = 1;

/// The name given to the prefetch producer thread.
pub const PREFETCH_THREAD_NAME: &str = "vis-prefetch";

// Things that should never change.

/// Speed of light \[metres/second\]
pub const VEL_C: f64 = 299_792_458.0;

/// The MJD of the J2000 epoch (2000 January 1.5 TT, treated as UTC here).
pub const MJD_J2000: f64 = 51544.5;

/// Earth's equatorial radius \[metres\] (WGS84).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Earth's angular rotation rate \[radians/second\].
pub const EARTH_ROTATION_RAD_PER_S: f64 = 7.292_115_146_706_979e-5;

/// Earth's mean orbital speed \[metres/second\].
pub const EARTH_ORBITAL_SPEED_M_PER_S: f64 = 29_784.8;

/// Mean obliquity of the ecliptic at J2000 \[degrees\].
pub const OBLIQUITY_J2000_DEG: f64 = 23.439_291;

/// The kinematic local standard of rest: the Sun moves at this speed
/// \[metres/second\] ...
pub const SOLAR_MOTION_LSRK_M_PER_S: f64 = 20_000.0;
/// ... towards this right ascension \[degrees, J2000\] ...
pub const SOLAR_APEX_LSRK_RA_DEG: f64 = 270.957_875;
/// ... and this declination \[degrees, J2000\].
pub const SOLAR_APEX_LSRK_DEC_DEG: f64 = 30.004_666;
