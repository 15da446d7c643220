//! Builders for test images.

/// Minimal big-endian TIFF block holding only a GPS IFD
fn tiff_with_gps(latitude: f64, longitude: f64) -> Vec<u8> {
    let (lat_ref, lat_abs) = if latitude < 0.0 { (b'S', -latitude) } else { (b'N', latitude) };
    let (lon_ref, lon_abs) = if longitude < 0.0 { (b'W', -longitude) } else { (b'E', longitude) };

    const IFD0_OFFSET: u32 = 8;
    const GPS_IFD_OFFSET: u32 = IFD0_OFFSET + 2 + 12 + 4;
    const GPS_ENTRIES: u16 = 4;
    const LAT_DATA_OFFSET: u32 = GPS_IFD_OFFSET + 2 + 12 * GPS_ENTRIES as u32 + 4;
    const LON_DATA_OFFSET: u32 = LAT_DATA_OFFSET + 24;

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&42u16.to_be_bytes());
    tiff.extend_from_slice(&IFD0_OFFSET.to_be_bytes());

    // IFD0: a single GPSInfo pointer
    tiff.extend_from_slice(&1u16.to_be_bytes());
    push_entry(&mut tiff, 0x8825, 4, 1, &GPS_IFD_OFFSET.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());

    // GPS IFD
    tiff.extend_from_slice(&GPS_ENTRIES.to_be_bytes());
    push_entry(&mut tiff, 0x0001, 2, 2, &[lat_ref, 0, 0, 0]);
    push_entry(&mut tiff, 0x0002, 5, 3, &LAT_DATA_OFFSET.to_be_bytes());
    push_entry(&mut tiff, 0x0003, 2, 2, &[lon_ref, 0, 0, 0]);
    push_entry(&mut tiff, 0x0004, 5, 3, &LON_DATA_OFFSET.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());

    push_dms(&mut tiff, lat_abs);
    push_dms(&mut tiff, lon_abs);
    tiff
}

fn push_entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: &[u8; 4]) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&kind.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(value);
}

fn push_dms(buf: &mut Vec<u8>, value: f64) {
    let degrees = value.trunc();
    let minutes_full = (value - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;

    for (num, denom) in [
        (degrees as u32, 1u32),
        (minutes as u32, 1u32),
        ((seconds * 10_000.0).round() as u32, 10_000u32),
    ] {
        buf.extend_from_slice(&num.to_be_bytes());
        buf.extend_from_slice(&denom.to_be_bytes());
    }
}

/// JPEG whose APP1 segment carries the given GPS position
pub fn jpeg_with_gps(latitude: f64, longitude: f64) -> Vec<u8> {
    let tiff = tiff_with_gps(latitude, longitude);
    let segment_len = (2 + 6 + tiff.len()) as u16;

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// JPEG with a JFIF header and no EXIF block
pub fn jpeg_without_exif() -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    jpeg.extend_from_slice(b"JFIF\0");
    jpeg.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}
