//! RAM initialization run by the reset handler before any Rust code touches a static.

use core::ptr;

/// Copies the initialized data image from flash to RAM, one word at a time.
///
/// # Safety
///
/// `start..end` must be writable, word-aligned RAM not in use, and `load` must point to at least
/// as many readable words.
pub unsafe fn init_data(start: *mut u32, end: *mut u32, load: *const u32) {
    let mut dst = start;
    let mut src = load;
    while dst < end {
        unsafe {
            ptr::write_volatile(dst, ptr::read(src));
            dst = dst.add(1);
            src = src.add(1);
        }
    }
}

/// Zeroes `start..end`.
///
/// # Safety
///
/// `start..end` must be writable, word-aligned RAM not in use.
pub unsafe fn zero_bss(start: *mut u32, end: *mut u32) {
    let mut dst = start;
    while dst < end {
        unsafe {
            ptr::write_volatile(dst, 0);
            dst = dst.add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_copied_exactly() {
        let load = [1u32, 2, 3, 4];
        let mut ram = [0xdead_beefu32; 6];

        let range = ram[1..5].as_mut_ptr_range();
        unsafe { init_data(range.start, range.end, load.as_ptr()) };

        assert_eq!(ram, [0xdead_beef, 1, 2, 3, 4, 0xdead_beef]);
    }

    #[test]
    fn bss_is_zeroed_exactly() {
        let mut ram = [0xffff_ffffu32; 5];

        let range = ram[1..4].as_mut_ptr_range();
        unsafe { zero_bss(range.start, range.end) };

        assert_eq!(ram, [0xffff_ffff, 0, 0, 0, 0xffff_ffff]);
    }

    #[test]
    fn empty_sections() {
        let mut ram = [7u32; 2];
        let start = ram.as_mut_ptr();
        unsafe {
            init_data(start, start, core::ptr::null());
            zero_bss(start, start);
        }
        assert_eq!(ram, [7, 7]);
    }
}
