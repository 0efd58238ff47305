/// WGS84 semi-major axis (meters); also the sphere radius used by EPSG:3857.
pub const WGS84_A: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined (degrees).
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Project WGS84 longitude/latitude (EPSG:4326, degrees) to Web Mercator
/// (EPSG:3857, meters). Latitude is clamped to the Mercator domain.
pub fn lon_lat_to_web_mercator(lon_deg: f64, lat_deg: f64) -> [f64; 2] {
    let lat = lat_deg.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let x = WGS84_A * lon_deg.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    [x, y]
}

/// Inverse of [`lon_lat_to_web_mercator`].
pub fn web_mercator_to_lon_lat(x: f64, y: f64) -> [f64; 2] {
    let lon = (x / WGS84_A).to_degrees();
    let lat = (2.0 * (y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    [lon, lat]
}
