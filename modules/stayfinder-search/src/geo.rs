/// Kilometres per degree of great-circle arc.
const KM_PER_DEGREE: f64 = 111.111;

/// Great-circle distance in kilometres between two lat/lng points given in
/// degrees, by the spherical law of cosines.
///
/// Always finite and non-negative for finite input; identical points give
/// exactly zero.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if lat1 == lat2 && lng1 == lng2 {
        return 0.0;
    }

    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let delta = (lng2 - lng1).to_radians();

    // Rounding can push the cosine a hair outside [-1, 1].
    let cos_angle = (phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * delta.cos()).clamp(-1.0, 1.0);

    KM_PER_DEGREE * cos_angle.acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        for (lat, lng) in [(0.0, 0.0), (48.8566, 2.3522), (-33.87, 151.21), (89.999, -179.5)] {
            assert_eq!(distance_km(lat, lng, lat, lng), 0.0);
        }
    }

    #[test]
    fn is_symmetric() {
        let pairs = [
            ((48.8566, 2.3522), (45.764, 4.8357)),
            ((44.96, -93.27), (44.94, -93.09)),
            ((-33.87, 151.21), (51.5072, -0.1276)),
        ];
        for ((a, b), (c, d)) in pairs {
            let there = distance_km(a, b, c, d);
            let back = distance_km(c, d, a, b);
            assert!((there - back).abs() < 1e-9, "{there} != {back}");
        }
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_km(10.0, 20.0, 11.0, 20.0);
        assert!((d - 111.111).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn paris_to_lyon() {
        let d = distance_km(48.8566, 2.3522, 45.764, 4.8357);
        assert!(d > 385.0 && d < 400.0, "Expected ~392km, got {d}");
    }

    #[test]
    fn antipodes_are_finite() {
        let d = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - 180.0 * KM_PER_DEGREE).abs() < 1e-6);
    }
}
