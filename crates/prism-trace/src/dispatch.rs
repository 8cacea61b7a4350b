//! Thread-group grid sizing for the kernel.

/// Edge length of the kernel's `@workgroup_size(8, 8, 1)`.
pub const WORKGROUP_SIZE: u32 = 8;

/// How a resolution that is not a multiple of [`WORKGROUP_SIZE`] maps to groups.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum DispatchRounding {
    /// Round up so every pixel is covered; the kernel bounds-checks the edge groups.
    #[default]
    Ceil,
    /// Integer division. Leaves up to 7 unrendered rows/columns at the edges; kept
    /// for output parity with kernels that do not bounds-check.
    Truncate,
}

/// Returns the `(x, y, z)` group counts covering a `width × height` target.
pub fn dispatch_grid(width: u32, height: u32, rounding: DispatchRounding) -> [u32; 3] {
    let groups = |n: u32| match rounding {
        DispatchRounding::Ceil => n.div_ceil(WORKGROUP_SIZE),
        DispatchRounding::Truncate => n / WORKGROUP_SIZE,
    };
    [groups(width), groups(height), 1]
}

/// True when a grid would launch no threads at all.
#[inline]
pub fn is_empty_grid(grid: [u32; 3]) -> bool {
    grid.contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn boundary_widths_with_ceil() {
        assert_eq!(dispatch_grid(8, 8, DispatchRounding::Ceil), [1, 1, 1]);
        assert_eq!(dispatch_grid(9, 8, DispatchRounding::Ceil), [2, 1, 1]);
        assert_eq!(dispatch_grid(1, 1, DispatchRounding::Ceil), [1, 1, 1]);
    }

    #[test]
    fn boundary_widths_with_truncate() {
        assert_eq!(dispatch_grid(8, 8, DispatchRounding::Truncate), [1, 1, 1]);
        assert_eq!(dispatch_grid(9, 8, DispatchRounding::Truncate), [1, 1, 1]);
        assert!(is_empty_grid(dispatch_grid(7, 64, DispatchRounding::Truncate)));
    }

    #[test]
    fn eight_hundred_by_six_hundred() {
        assert_eq!(dispatch_grid(800, 600, DispatchRounding::Ceil), [100, 75, 1]);
        assert_eq!(dispatch_grid(800, 600, DispatchRounding::Truncate), [100, 75, 1]);
        assert_eq!(dispatch_grid(800, 599, DispatchRounding::Ceil), [100, 75, 1]);
        assert_eq!(dispatch_grid(800, 599, DispatchRounding::Truncate), [100, 74, 1]);
    }

    #[quickcheck]
    fn ceil_covers_every_pixel_exactly_once_per_axis(w: u16, h: u16) -> bool {
        let (w, h) = (u32::from(w) + 1, u32::from(h) + 1);
        let [gx, gy, gz] = dispatch_grid(w, h, DispatchRounding::Ceil);
        gz == 1
            && gx * WORKGROUP_SIZE >= w
            && (gx - 1) * WORKGROUP_SIZE < w
            && gy * WORKGROUP_SIZE >= h
            && (gy - 1) * WORKGROUP_SIZE < h
    }

    #[quickcheck]
    fn truncate_never_exceeds_ceil(w: u16, h: u16) -> bool {
        let (w, h) = (u32::from(w), u32::from(h));
        let c = dispatch_grid(w, h, DispatchRounding::Ceil);
        let t = dispatch_grid(w, h, DispatchRounding::Truncate);
        t[0] <= c[0] && t[1] <= c[1] && c[0] - t[0] <= 1 && c[1] - t[1] <= 1
    }
}
