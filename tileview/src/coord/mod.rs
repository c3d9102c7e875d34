//! Coordinate normalization module
//!
//! Provides the geographic value types used throughout the crate and the
//! antimeridian ("dateline") handling that makes comparisons and iteration
//! work across the ±180° longitude seam.
//!
//! A wrapping box is represented with `left > right` and iterates as two
//! half-open longitude intervals, `[left, 180)` and `[-180, right)`.

mod types;

pub use types::{
    Bounds, CoordError, TimeRange, View, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON, WORLD_HEIGHT,
    WORLD_WIDTH,
};

/// Wraps a western edge into `[-180, 180)`.
fn wrap_left(lon: f64) -> f64 {
    if (MIN_LON..MAX_LON).contains(&lon) {
        lon
    } else {
        let wrapped = (lon - MIN_LON).rem_euclid(WORLD_WIDTH) + MIN_LON;
        // rem_euclid can round up to the modulus itself
        if wrapped >= MAX_LON {
            MIN_LON
        } else {
            wrapped
        }
    }
}

/// Wraps an eastern edge into `(-180, 180]`.
fn wrap_right(lon: f64) -> f64 {
    let wrapped = wrap_left(lon);
    if wrapped == MIN_LON {
        MAX_LON
    } else {
        wrapped
    }
}

impl Bounds {
    /// Returns the canonical representation of these bounds.
    ///
    /// - Latitudes are clamped to `[-90, 90]` and ordered.
    /// - An unwrapped box spanning 360° or more becomes the whole world.
    /// - Longitudes are wrapped onto the world; if the result crosses the
    ///   antimeridian, `left > right`.
    /// - Boxes that exactly touch ±180 are non-wrapping: a western edge of
    ///   `180` becomes `-180` and an eastern edge of `-180` becomes `180`.
    pub fn normalize(&self) -> Bounds {
        let mut bottom = self.bottom.clamp(MIN_LAT, MAX_LAT);
        let mut top = self.top.clamp(MIN_LAT, MAX_LAT);
        if bottom > top {
            std::mem::swap(&mut bottom, &mut top);
        }

        if self.left == self.right {
            let lon = wrap_left(self.left);
            return Bounds::new(lon, bottom, lon, top);
        }

        if self.left < self.right && self.right - self.left >= WORLD_WIDTH {
            return Bounds::new(MIN_LON, bottom, MAX_LON, top);
        }

        let left = wrap_left(self.left);
        let right = wrap_right(self.right);
        if left == right {
            // A wrapped input whose edges coincide spans the full circle.
            return Bounds::new(MIN_LON, bottom, MAX_LON, top);
        }

        Bounds::new(left, bottom, right, top)
    }

    /// Whether these (normalized) bounds cross the antimeridian.
    #[inline]
    pub fn is_wrapping(&self) -> bool {
        self.left > self.right
    }

    /// Longitude span in degrees, accounting for antimeridian wrap.
    pub fn width(&self) -> f64 {
        if self.is_wrapping() {
            (MAX_LON - self.left) + (self.right - MIN_LON)
        } else {
            self.right - self.left
        }
    }

    /// Latitude span in degrees.
    #[inline]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Angular area in square degrees.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Iterates the longitude intervals covered by these bounds.
    ///
    /// A non-wrapping box yields `[left, right)`; a wrapping box yields
    /// `[left, 180)` followed by `[-180, right)`.
    pub fn lon_intervals(&self) -> impl Iterator<Item = (f64, f64)> {
        let (first, second) = if self.is_wrapping() {
            ((self.left, MAX_LON), Some((MIN_LON, self.right)))
        } else {
            ((self.left, self.right), None)
        };
        std::iter::once(first).chain(second)
    }

    /// Trims the bounds outward to the nearest boundaries of a grid with
    /// cells of `tile_width` × `tile_height` degrees anchored at `(-180, -90)`.
    pub fn snap_to_grid(&self, tile_width: f64, tile_height: f64) -> Bounds {
        let floor_to = |value: f64, origin: f64, step: f64| {
            ((value - origin) / step).floor() * step + origin
        };
        let ceil_to = |value: f64, origin: f64, step: f64| {
            ((value - origin) / step).ceil() * step + origin
        };

        Bounds::new(
            floor_to(self.left, MIN_LON, tile_width),
            floor_to(self.bottom, MIN_LAT, tile_height),
            ceil_to(self.right, MIN_LON, tile_width),
            ceil_to(self.top, MIN_LAT, tile_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_plain_bounds() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 5.0);
        assert_eq!(bounds.normalize(), bounds);
        assert!(!bounds.normalize().is_wrapping());
    }

    #[test]
    fn test_normalize_wrapping_bounds() {
        let bounds = Bounds::new(174.375, 0.0, -174.375, 5.625).normalize();
        assert!(bounds.is_wrapping());
        assert_eq!(bounds.left, 180.0 - 5.625);
        assert_eq!(bounds.right, -180.0 + 5.625);
        assert_eq!(bounds.width(), 11.25);
    }

    #[test]
    fn test_normalize_unwrapped_overflow_becomes_wrapping() {
        // 170..190 is the same interval as 170..-170
        let bounds = Bounds::new(170.0, 0.0, 190.0, 10.0).normalize();
        assert_eq!(bounds, Bounds::new(170.0, 0.0, -170.0, 10.0));
        assert!(bounds.is_wrapping());

        let bounds = Bounds::new(-190.0, 0.0, -170.0, 10.0).normalize();
        assert_eq!(bounds, Bounds::new(170.0, 0.0, -170.0, 10.0));
    }

    #[test]
    fn test_normalize_touching_antimeridian_is_not_wrapping() {
        let east = Bounds::new(170.0, 0.0, 180.0, 10.0).normalize();
        assert!(!east.is_wrapping());
        assert_eq!(east.right, 180.0);

        let west = Bounds::new(-180.0, 0.0, -170.0, 10.0).normalize();
        assert!(!west.is_wrapping());
        assert_eq!(west.left, -180.0);

        // Degenerate wraps that only touch the seam
        let left_on_seam = Bounds::new(180.0, 0.0, -170.0, 10.0).normalize();
        assert_eq!(left_on_seam, Bounds::new(-180.0, 0.0, -170.0, 10.0));

        let right_on_seam = Bounds::new(170.0, 0.0, -180.0, 10.0).normalize();
        assert_eq!(right_on_seam, Bounds::new(170.0, 0.0, 180.0, 10.0));
    }

    #[test]
    fn test_normalize_full_world() {
        let bounds = Bounds::new(-200.0, -100.0, 200.0, 100.0).normalize();
        assert_eq!(bounds, Bounds::world());
    }

    #[test]
    fn test_normalize_swaps_latitudes() {
        let bounds = Bounds::new(0.0, 10.0, 5.0, -10.0).normalize();
        assert_eq!(bounds.bottom, -10.0);
        assert_eq!(bounds.top, 10.0);
    }

    #[test]
    fn test_lon_intervals() {
        let plain: Vec<_> = Bounds::new(0.0, 0.0, 10.0, 5.0).lon_intervals().collect();
        assert_eq!(plain, vec![(0.0, 10.0)]);

        let wrapped: Vec<_> = Bounds::new(170.0, 0.0, -170.0, 5.0)
            .lon_intervals()
            .collect();
        assert_eq!(wrapped, vec![(170.0, 180.0), (-180.0, -170.0)]);
    }

    #[test]
    fn test_snap_to_grid() {
        let snapped = Bounds::new(0.0, 0.0, 10.0, 5.0).snap_to_grid(2.8125, 1.40625);
        assert_eq!(snapped, Bounds::new(0.0, 0.0, 11.25, 5.625));

        let snapped = Bounds::new(179.0, 0.0, -179.0, 5.625).snap_to_grid(5.625, 2.8125);
        assert_eq!(snapped.left, 180.0 - 5.625);
        assert_eq!(snapped.right, -180.0 + 5.625);
    }

    #[test]
    fn test_bounds_display_is_identity_encoding() {
        let bounds = Bounds::new(0.0, 0.0, 2.8125, 1.40625);
        assert_eq!(bounds.to_string(), "0,0,2.8125,1.40625");

        let bounds = Bounds::new(-180.0, 0.0, -174.375, 2.8125);
        assert_eq!(bounds.to_string(), "-180,0,-174.375,2.8125");
    }

    #[test]
    fn test_bounds_parse() {
        let bounds: Bounds = "174.375, 0, -174.375, 5.625".parse().unwrap();
        assert_eq!(bounds, Bounds::new(174.375, 0.0, -174.375, 5.625));

        assert!(matches!(
            "1,2,3".parse::<Bounds>(),
            Err(CoordError::InvalidBounds(_))
        ));
        assert!(matches!(
            "1,2,x,4".parse::<Bounds>(),
            Err(CoordError::InvalidNumber(_))
        ));
        assert!(matches!(
            "1,2,inf,4".parse::<Bounds>(),
            Err(CoordError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_view_parse_with_time() {
        let view: View = "1970-01-01T00:00:00,1970-01-01T00:00:00;0,0,10,5"
            .parse()
            .unwrap();
        assert_eq!(view.bounds, Bounds::new(0.0, 0.0, 10.0, 5.0));
        let time = view.time.expect("time range should be parsed");
        assert_eq!(time.start.timestamp(), 0);
        assert_eq!(time.end.timestamp(), 0);
    }

    #[test]
    fn test_view_parse_without_time() {
        let view: View = "0,0,5,2.5".parse().unwrap();
        assert_eq!(view.bounds, Bounds::new(0.0, 0.0, 5.0, 2.5));
        assert!(view.time.is_none());
    }

    #[test]
    fn test_view_parse_rejects_inverted_time() {
        let result = "1970-01-02T00:00:00,1970-01-01T00:00:00;0,0,10,5".parse::<View>();
        assert!(matches!(result, Err(CoordError::InvertedTimeRange { .. })));
    }

    #[test]
    fn test_view_display_roundtrips() {
        let text = "1970-01-01T00:00:00,1970-01-02T00:00:00;0,0,10,5";
        let view: View = text.parse().unwrap();
        assert_eq!(view.to_string(), text);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_normalized_longitudes_in_range(
                left in -540.0..540.0_f64,
                width in 0.001..359.0_f64,
                bottom in -90.0..0.0_f64,
                top in 0.0..90.0_f64,
            ) {
                let bounds = Bounds::new(left, bottom, left + width, top).normalize();

                prop_assert!((MIN_LON..=MAX_LON).contains(&bounds.left));
                prop_assert!((MIN_LON..=MAX_LON).contains(&bounds.right));
                prop_assert!(bounds.left != MAX_LON, "western edge must not sit on +180");
                prop_assert!(bounds.right != MIN_LON, "eastern edge must not sit on -180");
                prop_assert!(
                    (bounds.width() - width).abs() < 1e-9,
                    "width changed: {} -> {}", width, bounds.width()
                );
            }

            #[test]
            fn test_normalize_is_idempotent(
                left in -540.0..540.0_f64,
                width in 0.001..400.0_f64,
            ) {
                let once = Bounds::new(left, -10.0, left + width, 10.0).normalize();
                prop_assert_eq!(once.normalize(), once);
            }
        }
    }
}
