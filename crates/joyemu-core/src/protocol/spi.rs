//! Emulated SPI flash contents.
//!
//! Only the regions the host reads during pairing are populated. Reads may
//! span adjacent regions; unknown addresses read as zero.

use super::constants::*;

#[rustfmt::skip]
const SERIAL_NUMBER: [u8; 0x10] = [0xFF; 0x10];

#[rustfmt::skip]
const IMU_FACTORY_CAL: [u8; 0x18] = [
    0xBE, 0xFF, 0x3E, 0x00, 0xF0, 0x01, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40,
    0xFE, 0xFF, 0xFE, 0xFF, 0x08, 0x00, 0xE7, 0x3B, 0xE7, 0x3B, 0xE7, 0x3B,
];

#[rustfmt::skip]
const STICK_FACTORY_CAL: [u8; 0x12] = [
    // Left: max above center, center, min below center
    0x00, 0x07, 0x70, 0x00, 0x08, 0x80, 0x00, 0x07, 0x70,
    // Right: center, min below center, max above center
    0x00, 0x08, 0x80, 0x00, 0x07, 0x70, 0x00, 0x07, 0x70,
];

#[rustfmt::skip]
const COLORS: [u8; 0x0D] = [
    0x32, 0x32, 0x32, // body
    0xFF, 0xFF, 0xFF, // buttons
    0x32, 0x32, 0x32, // left grip
    0xFF, 0xFF, 0xFF, // right grip
    0x03,
];

const SENSOR_PARAMS: [u8; 0x06] = [0x50, 0xFD, 0x00, 0x00, 0xC6, 0x0F];

#[rustfmt::skip]
const STICK_PARAMS: [u8; 0x12] = [
    0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54,
    0x41, 0x15, 0x54, 0xC7, 0x79, 0x9C, 0x33, 0x36, 0x63,
];

// 0xFF everywhere means "no user calibration".
const STICK_USER_CAL: [u8; 0x16] = [0xFF; 0x16];
const IMU_USER_CAL: [u8; 0x1A] = [0xFF; 0x1A];

const REGIONS: &[(u32, &[u8])] = &[
    (SPI_SERIAL_NUMBER, &SERIAL_NUMBER),
    (SPI_IMU_FACTORY_CAL, &IMU_FACTORY_CAL),
    (SPI_STICK_FACTORY_CAL, &STICK_FACTORY_CAL),
    (SPI_COLORS, &COLORS),
    (SPI_SENSOR_PARAMS, &SENSOR_PARAMS),
    (SPI_STICK_PARAMS, &STICK_PARAMS),
    (SPI_STICK_USER_CAL, &STICK_USER_CAL),
    (SPI_IMU_USER_CAL, &IMU_USER_CAL),
];

fn byte_at(address: u32) -> u8 {
    REGIONS
        .iter()
        .find_map(|(start, data)| {
            let offset = address.checked_sub(*start)? as usize;
            data.get(offset).copied()
        })
        .unwrap_or(0)
}

/// Read `len` bytes of flash starting at `address`, capped at [`SPI_READ_MAX`].
pub fn read_flash(address: u32, len: u8) -> Vec<u8> {
    let len = (len as usize).min(SPI_READ_MAX);
    (0..len as u32)
        .map(|i| byte_at(address.wrapping_add(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_colors() {
        let data = read_flash(SPI_COLORS, 0x0D);
        assert_eq!(data, COLORS);
    }

    #[test]
    fn test_read_spans_regions() {
        // The host reads sensor and stick parameters in one request.
        let data = read_flash(SPI_SENSOR_PARAMS, 0x18);
        assert_eq!(&data[..6], &SENSOR_PARAMS);
        assert_eq!(&data[6..], &STICK_PARAMS);
    }

    #[test]
    fn test_unknown_region_reads_zero() {
        assert_eq!(read_flash(0x1000, 4), vec![0; 4]);
    }

    #[test]
    fn test_read_is_capped() {
        assert_eq!(read_flash(SPI_STICK_USER_CAL, 0xFF).len(), SPI_READ_MAX);
    }
}
